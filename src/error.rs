//! Error types for the oracle.
//!
//! Every variant is fatal: the oracle is ground truth, so any state it
//! cannot explain aborts the replay instead of being papered over.

use std::io;

use thiserror::Error;

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, OracleError>;

#[derive(Error, Debug)]
pub enum OracleError {
  // ===========================================================================
  // Allocator core
  // ===========================================================================
  /// No free chunk can hold the request plus its header.
  #[error("no suitable space for {size} words (+{mid_space} header words)")]
  OutOfSpace { size: usize, mid_space: usize },

  /// The first-fit chunk would leave a remainder of exactly one header,
  /// which implementations are free to resolve either way.
  #[error("ambiguous fit: chunk of {chunk_len} words at word {start} for {size} words")]
  AmbiguousFit {
    start: usize,
    chunk_len: usize,
    size: usize,
  },

  /// Strict fitting is on and the first-fit chunk would leave a remainder
  /// too small to hold a header.
  #[error("insufficient remainder: chunk of {chunk_len} words at word {start} for {size} words")]
  InsufficientRemainder {
    start: usize,
    chunk_len: usize,
    size: usize,
  },

  /// `free` found no chunk starting at the expected word.
  #[error("cannot find object at word {offset}")]
  ObjectNotFound { offset: usize },

  /// `free` found the chunk but it was already free.
  #[error("double free at word {offset}")]
  DoubleFree { offset: usize },

  /// An internal chunk list invariant does not hold.
  #[error("corrupt chunk list: {0}")]
  CorruptChunkList(String),

  // ===========================================================================
  // Handles and operands
  // ===========================================================================
  #[error("object {handle} is not allocated")]
  HandleNotAllocated { handle: usize },

  #[error("object {handle} is already allocated")]
  HandleAlreadyAllocated { handle: usize },

  #[error("object {handle} out of range (B = {limit})")]
  HandleOutOfRange { handle: usize, limit: usize },

  #[error("process {pid} out of range (P = {limit})")]
  ProcessOutOfRange { pid: usize, limit: usize },

  #[error("invalid allocation size {size} (must be in 1..={limit})")]
  InvalidSize { size: usize, limit: usize },

  // ===========================================================================
  // Configuration
  // ===========================================================================
  #[error("{name} = {value} is not word aligned")]
  Misaligned { name: &'static str, value: usize },

  #[error("mid space {mid_space} exceeds front space {front_space}")]
  MidSpaceExceedsFrontSpace { mid_space: usize, front_space: usize },

  #[error("region of {region_bytes} bytes is too small: {reason}")]
  RegionTooSmall {
    region_bytes: usize,
    reason: &'static str,
  },

  #[error("{name} must be positive")]
  ZeroCount { name: &'static str },

  // ===========================================================================
  // Workload generation
  // ===========================================================================
  #[error("generator: {0}")]
  Generator(String),

  // ===========================================================================
  // I/O
  // ===========================================================================
  #[error("parse error at token {token}: {cause}")]
  Parse { token: usize, cause: String },

  #[error(transparent)]
  Io(#[from] io::Error),
}
