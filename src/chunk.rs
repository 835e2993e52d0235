use std::iter::FusedIterator;

use crate::error::{OracleError, Result};

/// A contiguous run of words in the region, either handed out or free.
///
/// A used chunk's length includes its `mid_space` header words.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Chunk {
  pub len: usize,
  pub used: bool,
}

impl Chunk {
  pub const fn free(len: usize) -> Self {
    Self { len, used: false }
  }

  pub const fn used(len: usize) -> Self {
    Self { len, used: true }
  }
}

struct Node {
  chunk: Chunk,
  prev: Option<usize>,
  next: Option<usize>,
}

/// Ordered chunk sequence covering the whole region.
///
/// Nodes live in a vector and link to each other by index, so splitting and
/// merging are O(1) once the node is found and indices stay stable while a
/// caller holds them. Slots of removed nodes are recycled.
///
/// ```text
///   head
///    │
///    ▼
///   ┌────────┐    ┌────────┐    ┌────────┐
///   │ used:5 │ ◀▶ │ free:3 │ ◀▶ │ used:8 │ ─▶ None
///   └────────┘    └────────┘    └────────┘
///   word 0        word 5        word 8
/// ```
pub struct ChunkList {
  nodes: Vec<Node>,
  vacant: Vec<usize>,
  head: usize,
  count: usize,
}

impl ChunkList {
  /// Creates a list holding a single free chunk of `total` words.
  pub fn new(total: usize) -> Self {
    Self::from_chunks(&[Chunk::free(total)])
  }

  /// Builds a list with the given shape, in order. Empty input yields a
  /// single zero-length free chunk, which `check` rejects.
  pub fn from_chunks(chunks: &[Chunk]) -> Self {
    let mut list = Self {
      nodes: Vec::with_capacity(chunks.len().max(1)),
      vacant: Vec::new(),
      head: 0,
      count: 1,
    };

    let mut iter = chunks.iter().copied();
    list.nodes.push(Node {
      chunk: iter.next().unwrap_or(Chunk::free(0)),
      prev: None,
      next: None,
    });

    let mut last = list.head;
    for chunk in iter {
      last = list.insert_after(last, chunk);
    }

    list
  }

  pub fn head(&self) -> usize {
    self.head
  }

  /// Number of chunks in the list.
  pub fn len(&self) -> usize {
    self.count
  }

  pub fn is_empty(&self) -> bool {
    self.count == 0
  }

  pub fn get(
    &self,
    index: usize,
  ) -> &Chunk {
    &self.nodes[index].chunk
  }

  pub fn get_mut(
    &mut self,
    index: usize,
  ) -> &mut Chunk {
    &mut self.nodes[index].chunk
  }

  pub fn next(
    &self,
    index: usize,
  ) -> Option<usize> {
    self.nodes[index].next
  }

  pub fn prev(
    &self,
    index: usize,
  ) -> Option<usize> {
    self.nodes[index].prev
  }

  /// Inserts `chunk` right after the node at `index` and returns the index
  /// of the new node.
  pub fn insert_after(
    &mut self,
    index: usize,
    chunk: Chunk,
  ) -> usize {
    let next = self.nodes[index].next;
    let node = Node {
      chunk,
      prev: Some(index),
      next,
    };

    let new = match self.vacant.pop() {
      Some(slot) => {
        self.nodes[slot] = node;
        slot
      }
      None => {
        self.nodes.push(node);
        self.nodes.len() - 1
      }
    };

    self.nodes[index].next = Some(new);
    if let Some(next) = next {
      self.nodes[next].prev = Some(new);
    }

    self.count += 1;
    new
  }

  /// Unlinks the node at `index` and returns its chunk. The head is never
  /// removed while it has a successor to take its place.
  pub fn remove(
    &mut self,
    index: usize,
  ) -> Chunk {
    let Node { chunk, prev, next } = &self.nodes[index];
    let (chunk, prev, next) = (*chunk, *prev, *next);

    match prev {
      Some(prev) => self.nodes[prev].next = next,
      None => {
        if let Some(next) = next {
          self.head = next;
        }
      }
    }
    if let Some(next) = next {
      self.nodes[next].prev = prev;
    }

    self.nodes[index].prev = None;
    self.nodes[index].next = None;
    self.vacant.push(index);
    self.count -= 1;

    chunk
  }

  /// Walks the chunks from the head, yielding each with its start word.
  pub fn iter(&self) -> Iter<'_> {
    Iter {
      list: self,
      cursor: (!self.is_empty()).then_some(self.head),
      start: 0,
    }
  }

  /// Sum of all chunk lengths.
  pub fn total(&self) -> usize {
    self.iter().map(|span| span.chunk.len).sum()
  }

  /// Snapshot of the chunk sequence, handy for comparing states.
  pub fn shape(&self) -> Vec<Chunk> {
    self.iter().map(|span| span.chunk).collect()
  }

  /// Verifies that the chunks partition exactly `total` words, that no chunk
  /// is empty and that no two neighbours are both free.
  pub fn check(
    &self,
    total: usize,
  ) -> Result<()> {
    let mut sum = 0;
    let mut prev_free = false;

    for span in self.iter() {
      if span.chunk.len == 0 {
        return Err(OracleError::CorruptChunkList(format!(
          "empty chunk at word {}",
          span.start
        )));
      }
      if prev_free && !span.chunk.used {
        return Err(OracleError::CorruptChunkList(format!(
          "adjacent free chunks at word {}",
          span.start
        )));
      }
      prev_free = !span.chunk.used;
      sum += span.chunk.len;
    }

    if sum != total {
      return Err(OracleError::CorruptChunkList(format!(
        "chunks cover {sum} words, region has {total}"
      )));
    }

    Ok(())
  }
}

/// A chunk as seen during traversal.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Span {
  pub index: usize,
  pub start: usize,
  pub chunk: Chunk,
}

impl Span {
  pub fn end(&self) -> usize {
    self.start + self.chunk.len
  }
}

pub struct Iter<'a> {
  list: &'a ChunkList,
  cursor: Option<usize>,
  start: usize,
}

impl Iterator for Iter<'_> {
  type Item = Span;

  fn next(&mut self) -> Option<Span> {
    let index = self.cursor?;
    let chunk = *self.list.get(index);
    let span = Span {
      index,
      start: self.start,
      chunk,
    };

    self.start += chunk.len;
    self.cursor = self.list.next(index);

    Some(span)
  }
}

impl FusedIterator for Iter<'_> {}
