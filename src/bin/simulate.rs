//! Replays an instruction stream from stdin and prints the oracle output.

use std::io::{self, BufWriter, Read, Write};

use anyhow::{Context, Result};
use clap::Parser;
use freelist_oracle::{Config, Interpreter, config::DEFAULT_RESERVE, instruction, logging};
use tracing::info;

/// Deterministic first-fit shared heap oracle.
#[derive(Parser)]
#[command(name = "simulate")]
#[command(version, about, long_about = None)]
struct Cli {
  /// Bytes of global header at the start of the region
  front_space: usize,

  /// Bytes of header in front of every object
  mid_space: usize,

  /// Dump the chunk layout before the instruction with this index
  #[arg(long)]
  dump_at: Option<usize>,

  /// Refuse placements that leave a free remainder shorter than one header
  #[arg(long)]
  strict_fit: bool,

  /// Bytes kept back at the end of the region
  #[arg(long, default_value_t = DEFAULT_RESERVE)]
  reserve: usize,

  /// Increase verbosity (-v, -vv, -vvv)
  #[arg(short, long, action = clap::ArgAction::Count)]
  verbose: u8,
}

fn main() -> Result<()> {
  let cli = Cli::parse();
  logging::init(cli.verbose)?;

  let mut input = String::new();
  io::stdin()
    .read_to_string(&mut input)
    .context("failed to read instruction stream")?;

  let mut parser = instruction::Parser::new(&input);
  let header = parser.header().context("failed to read stream header")?;

  let config = Config::new(cli.front_space, cli.mid_space)
    .with_header(header)
    .with_reserve(cli.reserve)
    .with_strict_fit(cli.strict_fit);
  let mut oracle = Interpreter::new(config).context("invalid configuration")?;

  info!(
    processes = header.processes,
    words = config.region_words(),
    objects = header.objects,
    "replaying"
  );

  let mut out = BufWriter::new(io::stdout().lock());
  let result = oracle.run(parser, &mut out, cli.dump_at);
  out.flush().context("failed to flush output")?;

  result.context("replay aborted")
}
