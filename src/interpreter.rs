use std::{collections::HashMap, fmt, io::Write};

use tracing::debug;

use crate::{
  align::Word,
  config::Config,
  error::{OracleError, Result},
  freelist::FreeListAllocator,
  instruction::Instruction,
  objects::{Object, ObjectTable},
  store::{BackingStore, Counter},
};

/// One line of oracle output. The rendered text is what graders diff
/// against, byte for byte.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Output {
  Connected { pid: usize },
  Disconnected { pid: usize },
  Read { pid: usize, values: Vec<Word> },
  Allocated { pid: usize, offset: usize, values: Vec<Word> },
  Freed { pid: usize, offset: usize },
}

impl fmt::Display for Output {
  fn fmt(
    &self,
    f: &mut fmt::Formatter<'_>,
  ) -> fmt::Result {
    match self {
      Self::Connected { pid } => write!(f, "#{pid}: Connected"),
      Self::Disconnected { pid } => write!(f, "#{pid}: Disconnected"),
      Self::Read { pid, values } => {
        write!(f, "#{pid}: Read:")?;
        write_values(f, values)
      }
      Self::Allocated {
        pid,
        offset,
        values,
      } => {
        write!(f, "#{pid}: Allocated at offset {offset}:")?;
        write_values(f, values)
      }
      Self::Freed { pid, offset } => write!(f, "#{pid}: Freed at offset: {offset}"),
    }
  }
}

fn write_values(
  f: &mut fmt::Formatter<'_>,
  values: &[Word],
) -> fmt::Result {
  for value in values {
    write!(f, " {value}")?;
  }
  Ok(())
}

/// Sequential replay engine: applies instructions one at a time to the
/// allocator, the object table and the backing store.
pub struct Interpreter {
  config: Config,
  allocator: FreeListAllocator,
  objects: ObjectTable,
  store: BackingStore,
  counter: Counter,
}

impl Interpreter {
  /// Validates `config` and sets up an empty region.
  pub fn new(config: Config) -> Result<Self> {
    config.validate()?;

    let words = config.region_words();

    Ok(Self {
      allocator: FreeListAllocator::new(words, config.mid_words(), config.strict_fit),
      objects: ObjectTable::new(config.objects),
      store: BackingStore::new(words),
      counter: Counter::new(),
      config,
    })
  }

  pub fn config(&self) -> &Config {
    &self.config
  }

  pub fn allocator(&self) -> &FreeListAllocator {
    &self.allocator
  }

  pub fn objects(&self) -> &ObjectTable {
    &self.objects
  }

  /// Next value an allocation will write.
  pub fn counter(&self) -> Counter {
    self.counter
  }

  fn check_pid(
    &self,
    pid: usize,
  ) -> Result<()> {
    if pid >= self.config.processes {
      return Err(OracleError::ProcessOutOfRange {
        pid,
        limit: self.config.processes,
      });
    }
    Ok(())
  }

  /// Applies a single instruction and returns the line it produces.
  pub fn apply(
    &mut self,
    instruction: Instruction,
  ) -> Result<Output> {
    debug!(%instruction, "applying");
    self.check_pid(instruction.pid())?;

    let output = match instruction {
      Instruction::Connect { pid } => Output::Connected { pid },
      Instruction::Disconnect { pid } => Output::Disconnected { pid },
      Instruction::Read { pid, handle } => {
        let object = self.objects.get(handle)?;
        let values = self.store.read(object.offset..object.end())?.to_vec();

        Output::Read { pid, values }
      }
      Instruction::Allocate { pid, handle, size } => {
        self.objects.ensure_free(handle)?;

        let limit = self.allocator.total();
        if size == 0 || size > limit {
          return Err(OracleError::InvalidSize { size, limit });
        }

        let offset = self.allocator.allocate(size)?;
        let object = Object { offset, len: size };
        self.objects.insert(handle, object)?;
        let values = self
          .store
          .fill(object.offset..object.end(), &mut self.counter)?
          .to_vec();

        Output::Allocated {
          pid,
          offset: self.config.byte_offset(offset),
          values,
        }
      }
      Instruction::Free { pid, handle } => {
        let object = self.objects.get(handle)?;
        self.allocator.free(object.offset)?;
        self.objects.remove(handle)?;

        Output::Freed {
          pid,
          offset: self.config.byte_offset(object.offset),
        }
      }
    };

    Ok(output)
  }

  /// Applies every instruction in order, writing one line per instruction.
  /// When `dump_at` is set, the chunk layout is written right before the
  /// instruction with that index. Stops at the first error; everything
  /// before it has already been written.
  pub fn run<I, W>(
    &mut self,
    instructions: I,
    out: &mut W,
    dump_at: Option<usize>,
  ) -> Result<()>
  where
    I: IntoIterator<Item = Result<Instruction>>,
    W: Write,
  {
    for (index, instruction) in instructions.into_iter().enumerate() {
      if dump_at == Some(index) {
        self.dump_state(out)?;
      }

      let output = self.apply(instruction?)?;
      writeln!(out, "{output}")?;
    }

    Ok(())
  }

  /// Writes the chunk layout with byte bounds and owning handles.
  pub fn dump_state<W: Write>(
    &self,
    out: &mut W,
  ) -> Result<()> {
    writeln!(out, "Current state:")?;

    for span in self.allocator.chunks().iter() {
      write!(
        out,
        "[ {} --- {} ] ",
        self.config.byte_offset(span.start),
        self.config.byte_offset(span.end())
      )?;

      if !span.chunk.used {
        writeln!(out, "free")?;
        continue;
      }

      let payload = span.start + self.allocator.mid_space();
      let handle = self.objects.find_by_offset(payload).ok_or_else(|| {
        OracleError::CorruptChunkList(format!("used chunk at word {} has no owner", span.start))
      })?;
      writeln!(out, "used obj:{handle}")?;
    }

    Ok(())
  }

  /// Verifies the chunk list invariants and that live objects and used
  /// chunks correspond one to one.
  pub fn check(&self) -> Result<()> {
    self.allocator.check()?;

    let mid_space = self.allocator.mid_space();
    let payloads: HashMap<usize, usize> = self
      .allocator
      .chunks()
      .iter()
      .filter(|span| span.chunk.used)
      .map(|span| (span.start + mid_space, span.chunk.len - mid_space))
      .collect();

    let mut live = 0;
    for (handle, object) in self.objects.live() {
      live += 1;
      match payloads.get(&object.offset) {
        Some(&room) if object.len <= room => {}
        _ => {
          return Err(OracleError::CorruptChunkList(format!(
            "object {handle} at word {} has no matching chunk",
            object.offset
          )));
        }
      }
    }

    if live != payloads.len() {
      return Err(OracleError::CorruptChunkList(format!(
        "{} used chunks for {live} live objects",
        payloads.len()
      )));
    }

    Ok(())
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::{align::WORD_SIZE, chunk::Chunk, instruction::StreamHeader};

  fn interpreter(
    front_space: usize,
    mid_space: usize,
  ) -> Interpreter {
    let header = StreamHeader {
      processes: 3,
      region_bytes: 4096,
      objects: 8,
    };
    Interpreter::new(Config::new(front_space, mid_space).with_header(header)).unwrap()
  }

  fn render(output: Result<Output>) -> String {
    output.unwrap().to_string()
  }

  #[test]
  fn test_connect_and_disconnect_lines() {
    let mut it = interpreter(0, 0);

    assert_eq!(render(it.apply(Instruction::Connect { pid: 2 })), "#2: Connected");
    assert_eq!(
      render(it.apply(Instruction::Disconnect { pid: 0 })),
      "#0: Disconnected"
    );
    assert!(matches!(
      it.apply(Instruction::Connect { pid: 3 }),
      Err(OracleError::ProcessOutOfRange { pid: 3, limit: 3 })
    ));
  }

  #[test]
  fn test_first_allocation_lands_on_front_space() {
    let mut it = interpreter(8 * WORD_SIZE, 2 * WORD_SIZE);

    let line = render(it.apply(Instruction::Allocate {
      pid: 1,
      handle: 0,
      size: 3,
    }));
    assert_eq!(line, format!("#1: Allocated at offset {}: 0 1 2", 8 * WORD_SIZE));

    let line = render(it.apply(Instruction::Allocate {
      pid: 0,
      handle: 1,
      size: 2,
    }));
    assert_eq!(
      line,
      format!("#0: Allocated at offset {}: 3 4", 8 * WORD_SIZE + 5 * WORD_SIZE)
    );
  }

  #[test]
  fn test_read_reports_written_values() {
    let mut it = interpreter(0, 0);
    it.apply(Instruction::Allocate {
      pid: 0,
      handle: 5,
      size: 4,
    })
    .unwrap();

    assert_eq!(
      render(it.apply(Instruction::Read { pid: 1, handle: 5 })),
      "#1: Read: 0 1 2 3"
    );
    assert_eq!(it.counter().peek(), 4);
  }

  #[test]
  fn test_free_reports_offset_and_reuses_space() {
    let mut it = interpreter(2 * WORD_SIZE, WORD_SIZE);
    for (handle, size) in [(0, 4), (1, 4)] {
      it.apply(Instruction::Allocate {
        pid: 0,
        handle,
        size,
      })
      .unwrap();
    }

    assert_eq!(
      render(it.apply(Instruction::Free { pid: 2, handle: 0 })),
      format!("#2: Freed at offset: {}", 2 * WORD_SIZE)
    );

    let line = render(it.apply(Instruction::Allocate {
      pid: 0,
      handle: 0,
      size: 4,
    }));
    assert_eq!(
      line,
      format!("#0: Allocated at offset {}: 8 9 10 11", 2 * WORD_SIZE)
    );
    assert!(it.check().is_ok());
  }

  #[test]
  fn test_double_free_is_fatal() {
    let mut it = interpreter(0, 0);
    it.apply(Instruction::Allocate {
      pid: 0,
      handle: 1,
      size: 2,
    })
    .unwrap();
    it.apply(Instruction::Free { pid: 0, handle: 1 }).unwrap();

    assert!(matches!(
      it.apply(Instruction::Free { pid: 0, handle: 1 }),
      Err(OracleError::HandleNotAllocated { handle: 1 })
    ));
  }

  #[test]
  fn test_handle_state_violations() {
    let mut it = interpreter(0, 0);
    let alloc = Instruction::Allocate {
      pid: 0,
      handle: 1,
      size: 2,
    };
    it.apply(alloc).unwrap();

    assert!(matches!(
      it.apply(alloc),
      Err(OracleError::HandleAlreadyAllocated { handle: 1 })
    ));
    assert!(matches!(
      it.apply(Instruction::Read { pid: 0, handle: 2 }),
      Err(OracleError::HandleNotAllocated { handle: 2 })
    ));
    assert!(matches!(
      it.apply(Instruction::Read { pid: 0, handle: 8 }),
      Err(OracleError::HandleOutOfRange { handle: 8, .. })
    ));
  }

  #[test]
  fn test_invalid_sizes() {
    let mut it = interpreter(0, 0);
    let total = it.allocator().total();

    for size in [0, total + 1] {
      assert!(matches!(
        it.apply(Instruction::Allocate {
          pid: 0,
          handle: 0,
          size
        }),
        Err(OracleError::InvalidSize { .. })
      ));
    }
    assert_eq!(it.allocator().chunks().shape(), vec![Chunk::free(total)]);
  }

  #[test]
  fn test_dump_state() {
    let mut it = interpreter(4 * WORD_SIZE, WORD_SIZE);
    for (handle, size) in [(3, 2), (6, 1)] {
      it.apply(Instruction::Allocate {
        pid: 0,
        handle,
        size,
      })
      .unwrap();
    }
    it.apply(Instruction::Free { pid: 0, handle: 3 }).unwrap();

    let mut out = Vec::new();
    it.dump_state(&mut out).unwrap();

    let base = 3 * WORD_SIZE;
    let end = base + it.allocator().total() * WORD_SIZE;
    let expected = format!(
      "Current state:\n[ {} --- {} ] free\n[ {} --- {} ] used obj:6\n[ {} --- {end} ] free\n",
      base,
      base + 3 * WORD_SIZE,
      base + 3 * WORD_SIZE,
      base + 5 * WORD_SIZE,
      base + 5 * WORD_SIZE,
    );
    assert_eq!(String::from_utf8(out).unwrap(), expected);
  }

  #[test]
  fn test_run_dumps_before_requested_instruction() {
    let mut it = interpreter(0, 0);
    let instructions = [
      Instruction::Connect { pid: 0 },
      Instruction::Allocate {
        pid: 0,
        handle: 0,
        size: 1,
      },
    ];

    let mut out = Vec::new();
    it.run(instructions.into_iter().map(Ok), &mut out, Some(1))
      .unwrap();

    let text = String::from_utf8(out).unwrap();
    let lines: Vec<_> = text.lines().collect();
    assert_eq!(lines[0], "#0: Connected");
    assert_eq!(lines[1], "Current state:");
    assert!(lines[2].ends_with("] free"));
    assert_eq!(lines[3], "#0: Allocated at offset 0: 0");
  }

  #[test]
  fn test_run_keeps_output_before_error() {
    let mut it = interpreter(0, 0);
    let instructions = [
      Instruction::Connect { pid: 0 },
      Instruction::Free { pid: 0, handle: 0 },
      Instruction::Connect { pid: 1 },
    ];

    let mut out = Vec::new();
    let result = it.run(instructions.into_iter().map(Ok), &mut out, None);

    assert!(result.is_err());
    assert_eq!(String::from_utf8(out).unwrap(), "#0: Connected\n");
  }
}
