//! Generates a random instruction stream and its expected oracle output.

use std::{
  fs::File,
  io::{BufWriter, Write},
  path::{Path, PathBuf},
};

use anyhow::{Context, Result};
use clap::Parser;
use freelist_oracle::{
  Config, Generator, StreamHeader, config::DEFAULT_RESERVE, generator::random_header, logging,
};
use rand::{SeedableRng, rngs::StdRng};

/// Random test case generator for the shared heap oracle.
#[derive(Parser)]
#[command(name = "gen")]
#[command(version, about, long_about = None)]
struct Cli {
  /// Bytes of global header at the start of the region
  front_space: usize,

  /// Bytes of header in front of every object
  mid_space: usize,

  /// Number of random instructions between connecting and disconnecting
  num_instructions: usize,

  /// Seed for every random choice, including the stream header
  seed: u64,

  /// Where to write the instruction stream
  test_in: PathBuf,

  /// Where to write the expected output
  test_out: PathBuf,

  /// Only generate placements that leave no free remainder shorter than
  /// one header
  #[arg(long)]
  strict_fit: bool,

  /// Bytes kept back at the end of the region
  #[arg(long, default_value_t = DEFAULT_RESERVE)]
  reserve: usize,

  /// Override the process count
  #[arg(long)]
  processes: Option<usize>,

  /// Override the region size in bytes
  #[arg(long)]
  region_bytes: Option<usize>,

  /// Override the object count
  #[arg(long)]
  objects: Option<usize>,

  /// Increase verbosity (-v, -vv, -vvv)
  #[arg(short, long, action = clap::ArgAction::Count)]
  verbose: u8,
}

fn create(path: &Path) -> Result<BufWriter<File>> {
  let file = File::create(path).with_context(|| format!("failed to create {}", path.display()))?;
  Ok(BufWriter::new(file))
}

fn main() -> Result<()> {
  let cli = Cli::parse();
  logging::init(cli.verbose)?;

  let mut rng = StdRng::seed_from_u64(cli.seed);
  let drawn = random_header(&mut rng);
  let header = StreamHeader {
    processes: cli.processes.unwrap_or(drawn.processes),
    region_bytes: cli.region_bytes.unwrap_or(drawn.region_bytes),
    objects: cli.objects.unwrap_or(drawn.objects),
  };

  let config = Config::new(cli.front_space, cli.mid_space)
    .with_header(header)
    .with_reserve(cli.reserve)
    .with_strict_fit(cli.strict_fit);
  let mut generator = Generator::new(config, rng).context("invalid configuration")?;

  let mut test_in = create(&cli.test_in)?;
  let mut test_out = create(&cli.test_out)?;

  generator
    .write_case(cli.num_instructions, &mut test_in, &mut test_out)
    .context("generation aborted")?;

  test_in.flush().context("failed to flush test input")?;
  test_out.flush().context("failed to flush test output")?;

  Ok(())
}
