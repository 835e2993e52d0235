//! # freelist-oracle - A Deterministic Shared-Heap Reference Allocator
//!
//! This crate replays a stream of connect/disconnect/read/allocate/free
//! instructions issued by several logical processes against one shared
//! memory region, and prints exactly what a correct first-fit shared heap
//! must print for them. Its output is the ground truth graders diff real
//! implementations against.
//!
//! ## Overview
//!
//! The region is carved into chunks, each free or used, kept in address
//! order. Allocation takes the first free chunk that fits, splitting off the
//! rest; freeing merges with free neighbours on both sides:
//!
//! ```text
//!   Region Layout (bytes):
//!
//!   ┌──────────────┬─────┬─────────┬─────┬───────┬──────────────┬─────────┐
//!   │ front_space  │ mid │ object  │ mid │ obj.  │     free     │ reserve │
//!   └──────────────┴─────┴─────────┴─────┴───────┴──────────────┴─────────┘
//!            ▲     ▲     ▲
//!            │     │     └── first reported offset == front_space
//!            │     └── chunk accounting starts here
//!            └── global header
//! ```
//!
//! Every chunk reserves `mid_space` header words in front of the payload.
//! The header of the first chunk overlaps the tail of `front_space`, so
//! reported offsets are `payload_word * WORD_SIZE + front_space - mid_space`.
//!
//! ## Crate Structure
//!
//! ```text
//!   freelist_oracle
//!   ├── align        - Word size and alignment helpers
//!   ├── chunk        - Index-linked chunk list
//!   ├── freelist     - First-fit allocator (split / coalesce)
//!   ├── objects      - Handle -> allocation table
//!   ├── store        - Backing words and the fill counter
//!   ├── config       - Padding, reserve and stream header validation
//!   ├── instruction  - Instruction records and text codec
//!   ├── interpreter  - Sequential replay and output lines
//!   ├── generator    - Weighted-random workload generation
//!   └── logging      - stderr tracing setup for the binaries
//! ```
//!
//! ## Quick Start
//!
//! ```rust
//! use freelist_oracle::{Config, Interpreter, parse_stream};
//!
//! let input = "2 4096 8\n0 0\n3 0 1 3\n2 1 1\n4 0 1\n";
//! let (header, instructions) = parse_stream(input).unwrap();
//!
//! let mut oracle = Interpreter::new(Config::new(64, 16).with_header(header)).unwrap();
//! let mut out = Vec::new();
//! oracle.run(instructions.into_iter().map(Ok), &mut out, None).unwrap();
//!
//! assert_eq!(
//!     String::from_utf8(out).unwrap(),
//!     "#0: Connected\n\
//!      #0: Allocated at offset 64: 0 1 2\n\
//!      #1: Read: 0 1 2\n\
//!      #0: Freed at offset: 64\n"
//! );
//! ```
//!
//! ## Errors
//!
//! Every error is fatal. A valid stream never triggers one; when one shows
//! up the stream, the generator or the configuration is wrong, and the
//! oracle stops rather than guess.
//!
//! ## Limitations
//!
//! - **Single-threaded only**: instructions are applied strictly in order
//! - **Word granularity**: no alignment beyond one machine word

pub mod align;
mod chunk;
pub mod config;
pub mod error;
pub mod freelist;
pub mod generator;
pub mod instruction;
pub mod interpreter;
pub mod logging;
mod objects;
mod store;

pub use chunk::{Chunk, ChunkList, Span};
pub use config::Config;
pub use error::{OracleError, Result};
pub use freelist::{FreeListAllocator, Fit, Placement};
pub use generator::Generator;
pub use instruction::{Instruction, Parser, StreamHeader, parse_stream};
pub use interpreter::{Interpreter, Output};
pub use objects::{Object, ObjectTable};
pub use store::{BackingStore, Counter};
