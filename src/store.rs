use std::ops::Range;

use crate::{
  align::Word,
  error::{OracleError, Result},
};

/// Flat word array standing in for the shared memory region.
pub struct BackingStore {
  words: Vec<Word>,
}

impl BackingStore {
  pub fn new(len: usize) -> Self {
    Self {
      words: vec![0; len],
    }
  }

  fn check_range(
    &self,
    range: &Range<usize>,
  ) -> Result<()> {
    if range.start > range.end || range.end > self.words.len() {
      return Err(OracleError::CorruptChunkList(format!(
        "object range {}..{} exceeds region of {} words",
        range.start,
        range.end,
        self.words.len()
      )));
    }

    Ok(())
  }

  /// Current contents of `range`.
  pub fn read(
    &self,
    range: Range<usize>,
  ) -> Result<&[Word]> {
    self.check_range(&range)?;

    Ok(&self.words[range])
  }

  /// Writes consecutive values drawn from `counter` into `range` and returns
  /// the written slice.
  pub fn fill(
    &mut self,
    range: Range<usize>,
    counter: &mut Counter,
  ) -> Result<&[Word]> {
    self.check_range(&range)?;

    let words = &mut self.words[range];
    for word in words.iter_mut() {
      *word = counter.next_value();
    }

    Ok(words)
  }
}

/// Run-wide source of strictly increasing fill values.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Counter {
  next: Word,
}

impl Counter {
  pub fn new() -> Self {
    Self::default()
  }

  /// Value the next write will use.
  pub fn peek(&self) -> Word {
    self.next
  }

  pub fn next_value(&mut self) -> Word {
    let value = self.next;
    self.next += 1;
    value
  }
}
