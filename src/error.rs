use std::{fmt, io};

use thiserror::Error;

/// Heap operation result
pub type HeapResult<T> = Result<T, HeapError>;

/// Why a payload handle was rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandleFault {
  /// The heap holds no blocks.
  Uninitialized,
  /// The header would lie outside the heap's block range.
  OutOfBounds,
  /// The handle is not word aligned.
  Misaligned,
  /// No block header was found at the expected offset.
  BadMagic,
  /// The block is already free.
  AlreadyReleased,
}

impl fmt::Display for HandleFault {
  fn fmt(
    &self,
    f: &mut fmt::Formatter<'_>,
  ) -> fmt::Result {
    let reason = match self {
      HandleFault::Uninitialized => "heap is not initialized",
      HandleFault::OutOfBounds => "outside the heap",
      HandleFault::Misaligned => "not word aligned",
      HandleFault::BadMagic => "no block header at this address",
      HandleFault::AlreadyReleased => "block already released",
    };
    f.write_str(reason)
  }
}

/// Heap errors
#[derive(Error, Debug)]
pub enum HeapError {
  #[error("Out of memory: could not grow the heap by {requested} bytes")]
  OutOfMemory { requested: usize },

  #[error("Invalid handle 0x{address:x}: {reason}")]
  InvalidHandle { address: usize, reason: HandleFault },

  #[error("Allocation size must be positive")]
  ZeroSize,

  #[error("Failed to map a {size} byte arena: {source}")]
  Map {
    size: usize,
    #[source]
    source: io::Error,
  },

  #[error("Invalid configuration: {0}")]
  Config(String),
}

impl HeapError {
  pub(crate) fn invalid(
    address: usize,
    reason: HandleFault,
  ) -> Self {
    HeapError::InvalidHandle { address, reason }
  }

  pub fn is_out_of_memory(
    &self,
  ) -> bool {
    matches!(self, HeapError::OutOfMemory { .. })
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_messages() {
    let oom = HeapError::OutOfMemory { requested: 64 };
    assert!(oom.is_out_of_memory());
    assert_eq!(oom.to_string(), "Out of memory: could not grow the heap by 64 bytes");

    let invalid = HeapError::invalid(0x1000, HandleFault::AlreadyReleased);
    assert!(!invalid.is_out_of_memory());
    assert_eq!(invalid.to_string(), "Invalid handle 0x1000: block already released");
  }
}
