use tracing::trace;

use crate::{
  chunk::{Chunk, ChunkList, Span},
  error::{OracleError, Result},
};

/// How a request occupies the chunk first-fit picked for it.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Fit {
  /// The chunk is exactly as long as the request plus its header.
  Exact,
  /// The chunk is split and `remainder` words stay free after it.
  Split { remainder: usize },
  /// The leftover is shorter than a header, so the whole chunk is handed
  /// out and `slack` words go unused until the object is freed.
  Absorb { slack: usize },
}

/// Where an allocation would land, as computed by [`FreeListAllocator::probe`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Placement {
  pub index: usize,
  /// First word of the chunk.
  pub start: usize,
  /// First payload word, past the header.
  pub payload: usize,
  pub fit: Fit,
}

/// First-fit allocator over a [`ChunkList`] with a fixed per-object header.
///
/// All quantities are words. Offsets handed out point past the `mid_space`
/// header words every chunk reserves in front of its payload.
///
/// ```text
///   ┌───────────┬──────────────────┬──────────────┬─────────────┐
///   │ mid_space │ payload (size)   │ free ...     │ used ...    │
///   └───────────┴──────────────────┴──────────────┴─────────────┘
///   ▲           ▲
///   chunk start returned offset
/// ```
pub struct FreeListAllocator {
  chunks: ChunkList,
  total: usize,
  mid_space: usize,
  strict_fit: bool,
}

impl FreeListAllocator {
  /// Creates an allocator over an empty region of `total` words.
  pub fn new(
    total: usize,
    mid_space: usize,
    strict_fit: bool,
  ) -> Self {
    Self::with_chunks(ChunkList::new(total), mid_space, strict_fit)
  }

  /// Creates an allocator over an existing chunk layout.
  pub fn with_chunks(
    chunks: ChunkList,
    mid_space: usize,
    strict_fit: bool,
  ) -> Self {
    let total = chunks.total();

    Self {
      chunks,
      total,
      mid_space,
      strict_fit,
    }
  }

  pub fn chunks(&self) -> &ChunkList {
    &self.chunks
  }

  pub fn total(&self) -> usize {
    self.total
  }

  pub fn mid_space(&self) -> usize {
    self.mid_space
  }

  fn find_free_chunk(
    &self,
    len: usize,
  ) -> Option<Span> {
    self
      .chunks
      .iter()
      .find(|span| !span.chunk.used && span.chunk.len >= len)
  }

  /// Computes where `size` words would be placed without touching any
  /// state. Fails exactly when [`allocate`](Self::allocate) would.
  pub fn probe(
    &self,
    size: usize,
  ) -> Result<Placement> {
    let need = size + self.mid_space;
    let span = self.find_free_chunk(need).ok_or(OracleError::OutOfSpace {
      size,
      mid_space: self.mid_space,
    })?;

    let remainder = span.chunk.len - need;
    let fit = if remainder == 0 {
      Fit::Exact
    } else if remainder == self.mid_space {
      return Err(OracleError::AmbiguousFit {
        start: span.start,
        chunk_len: span.chunk.len,
        size,
      });
    } else if remainder > self.mid_space {
      Fit::Split { remainder }
    } else if self.strict_fit {
      return Err(OracleError::InsufficientRemainder {
        start: span.start,
        chunk_len: span.chunk.len,
        size,
      });
    } else {
      Fit::Absorb { slack: remainder }
    };

    Ok(Placement {
      index: span.index,
      start: span.start,
      payload: span.start + self.mid_space,
      fit,
    })
  }

  /// Places `size` words in the first free chunk that can take them plus
  /// the header and returns the payload offset.
  pub fn allocate(
    &mut self,
    size: usize,
  ) -> Result<usize> {
    let placement = self.probe(size)?;

    if let Fit::Split { remainder } = placement.fit {
      let used = size + self.mid_space;
      self.chunks.get_mut(placement.index).len = used;
      self.chunks.insert_after(placement.index, Chunk::free(remainder));

      trace!(
        start = placement.start,
        used,
        remainder,
        "split chunk"
      );
    }

    self.chunks.get_mut(placement.index).used = true;

    Ok(placement.payload)
  }

  /// Releases the chunk whose payload starts at `offset`, merging it with a
  /// free predecessor first and then with a free successor.
  pub fn free(
    &mut self,
    offset: usize,
  ) -> Result<()> {
    let not_found = OracleError::ObjectNotFound { offset };
    let start = offset.checked_sub(self.mid_space).ok_or(not_found)?;

    let span = self
      .chunks
      .iter()
      .take_while(|span| span.start <= start)
      .find(|span| span.start == start)
      .ok_or(OracleError::ObjectNotFound { offset })?;

    if !span.chunk.used {
      return Err(OracleError::DoubleFree { offset });
    }

    let mut index = span.index;
    self.chunks.get_mut(index).used = false;

    if let Some(prev) = self.chunks.prev(index) {
      if !self.chunks.get(prev).used {
        let merged = self.chunks.remove(index);
        self.chunks.get_mut(prev).len += merged.len;
        index = prev;

        trace!(start, len = merged.len, "merged into predecessor");
      }
    }

    if let Some(next) = self.chunks.next(index) {
      if !self.chunks.get(next).used {
        let merged = self.chunks.remove(next);
        self.chunks.get_mut(index).len += merged.len;

        trace!(start, len = merged.len, "merged successor");
      }
    }

    Ok(())
  }

  /// Checks the chunk list invariants against the region size.
  pub fn check(&self) -> Result<()> {
    self.chunks.check(self.total)
  }
}
