use std::fmt;

use crate::block::BlockInfo;

/// Occupancy snapshot of a heap.
///
/// Blocks are never split or merged, so `free_bytes` can be large while
/// `largest_free` stays small; `fragmentation` measures that gap.
#[derive(Debug, Default, Clone, Copy, PartialEq)]
pub struct HeapStats {
  pub blocks: usize,
  pub used_blocks: usize,
  pub free_blocks: usize,
  /// Payload bytes held by used blocks.
  pub used_bytes: usize,
  /// Payload bytes held by free blocks.
  pub free_bytes: usize,
  pub largest_free: usize,
  /// Bytes obtained from the heap source, headers included.
  pub reserved_bytes: usize,
}

impl HeapStats {
  pub(crate) fn collect(
    blocks: impl IntoIterator<Item = BlockInfo>,
    reserved_bytes: usize,
  ) -> Self {
    blocks.into_iter().fold(
      Self {
        reserved_bytes,
        ..Self::default()
      },
      |mut stats, block| {
        stats.blocks += 1;
        if block.used {
          stats.used_blocks += 1;
          stats.used_bytes += block.size;
        } else {
          stats.free_blocks += 1;
          stats.free_bytes += block.size;
          stats.largest_free = stats.largest_free.max(block.size);
        }
        stats
      },
    )
  }

  /// Share of free payload bytes that cannot be served by the largest free
  /// block, between `0.0` (none or one free block) and `1.0`.
  pub fn fragmentation(
    &self,
  ) -> f64 {
    if self.free_bytes == 0 {
      return 0.0;
    }
    1.0 - self.largest_free as f64 / self.free_bytes as f64
  }

  /// Reserved bytes spent on headers and alignment padding rather than
  /// payload.
  pub fn overhead_bytes(
    &self,
  ) -> usize {
    self
      .reserved_bytes
      .saturating_sub(self.used_bytes + self.free_bytes)
  }
}

impl fmt::Display for HeapStats {
  fn fmt(
    &self,
    f: &mut fmt::Formatter<'_>,
  ) -> fmt::Result {
    write!(
      f,
      "{} blocks ({} used, {} free), {} bytes used, {} bytes free, largest free {}, {} bytes reserved, fragmentation {:.2}",
      self.blocks,
      self.used_blocks,
      self.free_blocks,
      self.used_bytes,
      self.free_bytes,
      self.largest_free,
      self.reserved_bytes,
      self.fragmentation()
    )
  }
}
