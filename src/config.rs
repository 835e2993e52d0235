//! Oracle configuration.
//!
//! Byte quantities come from the command line (`front_space`, `mid_space`,
//! `reserve`) and from the instruction stream header (region size, process
//! and object counts). Everything is validated once, before the first
//! instruction runs.

use crate::{
  align::{to_bytes, to_words},
  error::{OracleError, Result},
  instruction::StreamHeader,
  is_word_aligned,
};

/// Bytes kept back at the end of the region for later heap extensions.
pub const DEFAULT_RESERVE: usize = 256;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Config {
  /// Global header at the start of the region, in bytes.
  pub front_space: usize,
  /// Per-object header in front of every payload, in bytes.
  pub mid_space: usize,
  /// Tail allowance excluded from the chunk region, in bytes.
  pub reserve: usize,
  /// Refuse placements that would leave a free remainder shorter than one
  /// header.
  pub strict_fit: bool,
  /// Whole shared region, in bytes.
  pub region_bytes: usize,
  pub processes: usize,
  pub objects: usize,
}

impl Config {
  /// Creates a configuration with the given padding and an empty header.
  /// Call [`with_header`](Self::with_header) before validating.
  pub fn new(
    front_space: usize,
    mid_space: usize,
  ) -> Self {
    Self {
      front_space,
      mid_space,
      reserve: DEFAULT_RESERVE,
      strict_fit: false,
      region_bytes: 0,
      processes: 0,
      objects: 0,
    }
  }

  pub fn with_header(
    mut self,
    header: StreamHeader,
  ) -> Self {
    self.processes = header.processes;
    self.region_bytes = header.region_bytes;
    self.objects = header.objects;
    self
  }

  pub fn with_reserve(
    mut self,
    reserve: usize,
  ) -> Self {
    self.reserve = reserve;
    self
  }

  pub fn with_strict_fit(
    mut self,
    strict_fit: bool,
  ) -> Self {
    self.strict_fit = strict_fit;
    self
  }

  pub fn header(&self) -> StreamHeader {
    StreamHeader {
      processes: self.processes,
      region_bytes: self.region_bytes,
      objects: self.objects,
    }
  }

  pub fn validate(&self) -> Result<()> {
    for (name, value) in [
      ("front_space", self.front_space),
      ("mid_space", self.mid_space),
      ("region size", self.region_bytes),
      ("reserve", self.reserve),
    ] {
      if !is_word_aligned!(value) {
        return Err(OracleError::Misaligned { name, value });
      }
    }

    if self.mid_space > self.front_space {
      return Err(OracleError::MidSpaceExceedsFrontSpace {
        mid_space: self.mid_space,
        front_space: self.front_space,
      });
    }

    if self.region_bytes <= self.front_space {
      return Err(OracleError::RegionTooSmall {
        region_bytes: self.region_bytes,
        reason: "does not exceed the front space",
      });
    }

    if self.region_words() == 0 {
      return Err(OracleError::RegionTooSmall {
        region_bytes: self.region_bytes,
        reason: "no words left after front space and reserve",
      });
    }

    if self.processes == 0 {
      return Err(OracleError::ZeroCount { name: "process count" });
    }
    if self.objects == 0 {
      return Err(OracleError::ZeroCount { name: "object count" });
    }

    Ok(())
  }

  /// Byte address where chunk accounting starts. The first chunk's header
  /// occupies the tail of the front space, so the first payload lands on
  /// `front_space`.
  pub fn base(&self) -> usize {
    self.front_space.saturating_sub(self.mid_space)
  }

  /// Words available to the chunk list.
  pub fn region_words(&self) -> usize {
    self
      .base()
      .checked_add(self.reserve)
      .and_then(|kept| self.region_bytes.checked_sub(kept))
      .map_or(0, to_words)
  }

  pub fn mid_words(&self) -> usize {
    to_words(self.mid_space)
  }

  /// Byte offset reported for a word index into the chunk region.
  pub fn byte_offset(
    &self,
    word: usize,
  ) -> usize {
    to_bytes(word) + self.base()
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::align::WORD_SIZE;

  fn header(region_bytes: usize) -> StreamHeader {
    StreamHeader {
      processes: 2,
      region_bytes,
      objects: 4,
    }
  }

  #[test]
  fn test_region_words_excludes_front_and_reserve() {
    let config = Config::new(8 * WORD_SIZE, 2 * WORD_SIZE).with_header(header(4096));

    assert!(config.validate().is_ok());
    assert_eq!(config.base(), 6 * WORD_SIZE);
    assert_eq!(config.region_words(), (4096 - 6 * WORD_SIZE - 256) / WORD_SIZE);
    assert_eq!(config.mid_words(), 2);
  }

  #[test]
  fn test_first_payload_reports_front_space() {
    let config = Config::new(64, 16).with_header(header(4096));

    assert_eq!(config.byte_offset(config.mid_words()), 64);
  }

  #[test]
  fn test_rejects_misaligned_spaces() {
    let config = Config::new(WORD_SIZE + 1, 0).with_header(header(4096));
    assert!(matches!(
      config.validate(),
      Err(OracleError::Misaligned { name: "front_space", .. })
    ));

    let config = Config::new(4 * WORD_SIZE, 3).with_header(header(4096));
    assert!(matches!(
      config.validate(),
      Err(OracleError::Misaligned { name: "mid_space", .. })
    ));
  }

  #[test]
  fn test_rejects_misaligned_region_and_reserve() {
    let config = Config::new(64, 16).with_header(header(4096 + 1));
    assert!(matches!(
      config.validate(),
      Err(OracleError::Misaligned { name: "region size", .. })
    ));

    let config = Config::new(64, 16)
      .with_header(header(4096))
      .with_reserve(WORD_SIZE + 1);
    assert!(matches!(
      config.validate(),
      Err(OracleError::Misaligned { name: "reserve", .. })
    ));
  }

  #[test]
  fn test_rejects_reserve_larger_than_address_space() {
    let config = Config::new(64, 16)
      .with_header(header(4096))
      .with_reserve(usize::MAX - (WORD_SIZE - 1));

    assert_eq!(config.region_words(), 0);
    assert!(matches!(config.validate(), Err(OracleError::RegionTooSmall { .. })));
  }

  #[test]
  fn test_rejects_mid_space_larger_than_front_space() {
    let config = Config::new(WORD_SIZE, 2 * WORD_SIZE).with_header(header(4096));

    assert!(matches!(
      config.validate(),
      Err(OracleError::MidSpaceExceedsFrontSpace { .. })
    ));
  }

  #[test]
  fn test_rejects_small_regions() {
    let config = Config::new(64, 16).with_header(header(64));
    assert!(matches!(config.validate(), Err(OracleError::RegionTooSmall { .. })));

    let config = Config::new(64, 16).with_header(header(256));
    assert!(matches!(config.validate(), Err(OracleError::RegionTooSmall { .. })));

    let config = Config::new(64, 16).with_header(header(256)).with_reserve(0);
    assert!(config.validate().is_ok());
  }

  #[test]
  fn test_rejects_empty_counts() {
    let mut config = Config::new(64, 16).with_header(header(4096));
    config.processes = 0;

    assert!(matches!(config.validate(), Err(OracleError::ZeroCount { .. })));
  }
}
