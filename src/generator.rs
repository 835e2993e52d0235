//! Weighted-random workload generation.
//!
//! The generator drives its own [`Interpreter`], so every instruction it
//! emits is legal for the state reached so far and the expected output is
//! produced alongside the stream.

use std::io::Write;

use rand::{
  Rng,
  distributions::{Distribution, WeightedIndex},
  rngs::StdRng,
};
use rand_distr::Poisson;
use tracing::{debug, info};

use crate::{
  config::Config,
  error::{OracleError, Result},
  instruction::{Instruction, StreamHeader},
  interpreter::{Interpreter, Output},
};

const READ_WEIGHT: usize = 3;
const ALLOCATE_WEIGHT: usize = 1;
const FREE_WEIGHT: usize = 1;

/// Size draws per step; only those the allocator accepts become candidates.
const SIZE_DRAWS: usize = 25;
const MEAN_SIZE: f64 = 16.0;

/// Draws a stream header the way test suites are sized: a handful of
/// processes, a region of whole pages and plenty of handles.
pub fn random_header(rng: &mut StdRng) -> StreamHeader {
  StreamHeader {
    processes: rng.gen_range(2..=10),
    region_bytes: rng.gen_range(1..=64) * 4096,
    objects: rng.gen_range(50_000..=100_000),
  }
}

/// An emitted instruction together with the oracle's line for it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Step {
  pub instruction: Instruction,
  pub output: Output,
}

pub struct Generator {
  interpreter: Interpreter,
  rng: StdRng,
  sizes: Poisson<f64>,
}

impl Generator {
  pub fn new(
    config: Config,
    rng: StdRng,
  ) -> Result<Self> {
    let sizes = Poisson::new(MEAN_SIZE).map_err(|err| OracleError::Generator(err.to_string()))?;

    Ok(Self {
      interpreter: Interpreter::new(config)?,
      rng,
      sizes,
    })
  }

  pub fn interpreter(&self) -> &Interpreter {
    &self.interpreter
  }

  fn random_pid(&mut self) -> usize {
    self.rng.gen_range(0..self.interpreter.config().processes)
  }

  fn draw_size(&mut self) -> usize {
    self.sizes.sample(&mut self.rng) as usize
  }

  /// Collects every instruction legal right now, with its weight.
  fn candidates(&mut self) -> Vec<(usize, Instruction)> {
    let mut out = Vec::new();

    let live: Vec<usize> = self
      .interpreter
      .objects()
      .live()
      .map(|(handle, _)| handle)
      .collect();

    for &handle in &live {
      let pid = self.random_pid();
      out.push((READ_WEIGHT, Instruction::Read { pid, handle }));
    }

    if let Some(handle) = self.interpreter.objects().first_free() {
      for _ in 0..SIZE_DRAWS {
        let size = self.draw_size();
        let pid = self.random_pid();
        let allocator = self.interpreter.allocator();

        if size != 0 && size <= allocator.total() && allocator.probe(size).is_ok() {
          out.push((ALLOCATE_WEIGHT, Instruction::Allocate { pid, handle, size }));
        }
      }
    }

    for &handle in &live {
      let pid = self.random_pid();
      out.push((FREE_WEIGHT, Instruction::Free { pid, handle }));
    }

    out
  }

  /// Picks one legal instruction by weight and applies it.
  pub fn step(&mut self) -> Result<Step> {
    let candidates = self.candidates();
    let weights = WeightedIndex::new(candidates.iter().map(|(weight, _)| *weight))
      .map_err(|err| OracleError::Generator(format!("no legal instruction: {err}")))?;

    let (_, instruction) = candidates[weights.sample(&mut self.rng)];
    self.apply(instruction)
  }

  fn apply(
    &mut self,
    instruction: Instruction,
  ) -> Result<Step> {
    let output = self.interpreter.apply(instruction)?;

    Ok(Step {
      instruction,
      output,
    })
  }

  /// Connects every process, runs `count` random steps, then disconnects
  /// every process.
  pub fn generate(
    &mut self,
    count: usize,
  ) -> Result<Vec<Step>> {
    let processes = self.interpreter.config().processes;
    let mut steps = Vec::with_capacity(count + 2 * processes);

    for pid in 0..processes {
      steps.push(self.apply(Instruction::Connect { pid })?);
    }
    for _ in 0..count {
      steps.push(self.step()?);
    }
    for pid in 0..processes {
      steps.push(self.apply(Instruction::Disconnect { pid })?);
    }

    debug!(
      live = self.interpreter.objects().live().count(),
      chunks = self.interpreter.allocator().chunks().len(),
      "generation finished"
    );

    Ok(steps)
  }

  /// Generates a test case, writing the instruction stream to `input` and
  /// the expected oracle output to `expected`.
  pub fn write_case<I, E>(
    &mut self,
    count: usize,
    input: &mut I,
    expected: &mut E,
  ) -> Result<()>
  where
    I: Write,
    E: Write,
  {
    let steps = self.generate(count)?;

    writeln!(input, "{}", self.interpreter.config().header())?;
    for step in &steps {
      writeln!(input, "{}", step.instruction)?;
      writeln!(expected, "{}", step.output)?;
    }

    info!(instructions = steps.len(), "wrote test case");
    Ok(())
  }
}

#[cfg(test)]
mod tests {
  use rand::SeedableRng;

  use super::*;
  use crate::align::Word;

  fn config(strict_fit: bool) -> Config {
    let header = StreamHeader {
      processes: 4,
      region_bytes: 4096,
      objects: 64,
    };
    Config::new(64, 16)
      .with_header(header)
      .with_strict_fit(strict_fit)
  }

  fn generator(
    strict_fit: bool,
    seed: u64,
  ) -> Generator {
    Generator::new(config(strict_fit), StdRng::seed_from_u64(seed)).unwrap()
  }

  #[test]
  fn test_random_header_ranges() {
    let mut rng = StdRng::seed_from_u64(7);

    for _ in 0..100 {
      let header = random_header(&mut rng);
      assert!((2..=10).contains(&header.processes));
      assert_eq!(header.region_bytes % 4096, 0);
      assert!((4096..=64 * 4096).contains(&header.region_bytes));
      assert!((50_000..=100_000).contains(&header.objects));
    }
  }

  #[test]
  fn test_invariants_hold_after_every_step() {
    for (seed, strict_fit) in [(1, false), (2, true), (3, false), (4, true)] {
      let mut generator = generator(strict_fit, seed);

      for _ in 0..2_000 {
        generator.step().unwrap();
        generator.interpreter().check().unwrap();
      }
    }
  }

  #[test]
  fn test_connects_first_and_disconnects_last() {
    let steps = generator(false, 11).generate(50).unwrap();

    let head: Vec<_> = steps[..4].iter().map(|s| s.output.to_string()).collect();
    assert_eq!(
      head,
      vec!["#0: Connected", "#1: Connected", "#2: Connected", "#3: Connected"]
    );
    assert_eq!(steps.last().unwrap().output.to_string(), "#3: Disconnected");
    assert_eq!(steps.len(), 58);
  }

  #[test]
  fn test_same_seed_same_case() {
    let mut first = (Vec::new(), Vec::new());
    let mut second = (Vec::new(), Vec::new());

    generator(true, 42)
      .write_case(500, &mut first.0, &mut first.1)
      .unwrap();
    generator(true, 42)
      .write_case(500, &mut second.0, &mut second.1)
      .unwrap();

    assert_eq!(first, second);
    assert!(first.0.starts_with(b"4 4096 64\n0 0\n"));
  }

  #[test]
  fn test_written_values_strictly_increase() {
    let steps = generator(false, 5).generate(1_000).unwrap();
    let mut last: Option<Word> = None;

    for step in steps {
      if let Output::Allocated { values, .. } = step.output {
        for value in values {
          assert!(last.is_none_or(|last| value > last));
          last = Some(value);
        }
      }
    }

    assert!(last.is_some());
  }
}
