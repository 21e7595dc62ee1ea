use std::{fmt, ptr, str::FromStr};

use crate::{block::Block, error::HeapError};

/// Strategy used to pick a free block for an incoming request.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SearchMode {
  /// Scan from the heap start, take the first block that fits.
  #[default]
  FirstFit,
  /// Resume from the block returned by the previous search, wrapping
  /// around to the start once the end of the list is reached.
  NextFit,
}

impl fmt::Display for SearchMode {
  fn fmt(
    &self,
    f: &mut fmt::Formatter<'_>,
  ) -> fmt::Result {
    match self {
      SearchMode::FirstFit => f.write_str("first-fit"),
      SearchMode::NextFit => f.write_str("next-fit"),
    }
  }
}

impl FromStr for SearchMode {
  type Err = HeapError;

  fn from_str(
    s: &str,
  ) -> Result<Self, Self::Err> {
    match s.trim().to_ascii_lowercase().replace('_', "-").as_str() {
      "first-fit" | "firstfit" | "first" => Ok(SearchMode::FirstFit),
      "next-fit" | "nextfit" | "next" => Ok(SearchMode::NextFit),
      other => Err(HeapError::Config(format!("unknown search mode `{other}`"))),
    }
  }
}

/// Walks the block list starting at `origin`, wrapping once to `head`
/// and stopping before `origin` is visited a second time.
pub(crate) struct Scan {
  head: *mut Block,
  origin: *mut Block,
  current: *mut Block,
  wrapped: bool,
}

impl Scan {
  /// # Safety
  ///
  /// `head` must be null or the first block of a well-formed list, and
  /// `origin` must be null or a member of that list.
  pub(crate) unsafe fn new(
    head: *mut Block,
    origin: *mut Block,
  ) -> Self {
    let origin = if origin.is_null() { head } else { origin };

    Self {
      head,
      origin,
      current: origin,
      wrapped: origin == head,
    }
  }
}

impl Iterator for Scan {
  type Item = *mut Block;

  fn next(
    &mut self,
  ) -> Option<Self::Item> {
    if self.current.is_null() {
      if self.wrapped {
        return None;
      }
      self.wrapped = true;
      self.current = self.head;
    }

    if self.wrapped && self.current == self.origin && self.origin != self.head {
      return None;
    }

    let block = self.current;
    // SAFETY: `Scan::new` requires every reachable node to be a live header.
    self.current = unsafe { (*block).next };
    Some(block)
  }
}

/// Returns the first free block of at least `size` bytes, or null.
///
/// # Safety
///
/// Same contract as [`Scan::new`].
pub(crate) unsafe fn first_fit(
  head: *mut Block,
  size: usize,
) -> *mut Block {
  unsafe {
    Scan::new(head, head)
      .find(|&block| Block::fits(block, size))
      .unwrap_or(ptr::null_mut())
  }
}

/// Like [`first_fit`] but scanning from `cursor`. The cursor is moved to
/// the result, which is null on a miss.
///
/// # Safety
///
/// Same contract as [`Scan::new`].
pub(crate) unsafe fn next_fit(
  head: *mut Block,
  cursor: &mut *mut Block,
  size: usize,
) -> *mut Block {
  unsafe {
    let found = Scan::new(head, *cursor)
      .find(|&block| Block::fits(block, size))
      .unwrap_or(ptr::null_mut());

    *cursor = found;
    found
  }
}
