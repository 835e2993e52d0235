use std::mem;

/// One word of shared memory, the same width as the C `size_t` the graded
/// heap stores.
pub type Word = libc::size_t;

/// Size of a [`Word`] in bytes.
pub const WORD_SIZE: usize = mem::size_of::<Word>();

/// Checks whether the given byte count lies on a word boundary.
///
/// # Examples
///
/// ```rust
/// use freelist_oracle::{is_word_aligned, align::WORD_SIZE};
///
/// assert!(is_word_aligned!(WORD_SIZE * 3));
/// assert!(!is_word_aligned!(WORD_SIZE + 1));
/// ```
#[macro_export]
macro_rules! is_word_aligned {
  ($value:expr) => {
    ($value) & ($crate::align::WORD_SIZE - 1) == 0
  };
}

/// Converts a word-aligned byte count into words.
#[inline]
pub const fn to_words(bytes: usize) -> usize {
  bytes / WORD_SIZE
}

/// Converts a word count into bytes.
#[inline]
pub const fn to_bytes(words: usize) -> usize {
  words * WORD_SIZE
}
