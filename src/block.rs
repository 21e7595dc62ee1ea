use std::{
  mem,
  ptr::{self, NonNull},
};

use crate::align::WORD_SIZE;

/// Canary written into every header the heap creates.
pub(crate) const BLOCK_MAGIC: u32 = 0xB10C_4EAD;

/// Block header. The payload starts at `data` and extends `size` bytes
/// from there, so the first word of every payload lives inside the header.
#[repr(C)]
pub struct Block {
  pub size: usize,
  pub magic: u32,
  pub used: bool,
  pub next: *mut Block,
  #[allow(dead_code)]
  data: [usize; 1],
}

/// Distance from the start of a header to its payload.
pub const PAYLOAD_OFFSET: usize = mem::offset_of!(Block, data);

/// Size of a header including its inline payload word.
pub const HEADER_SIZE: usize = mem::size_of::<Block>();

/// Bytes the heap source must supply to host a header plus `payload_size`
/// bytes of payload. The inline word is not counted twice.
#[inline]
pub const fn total_block_size(
  payload_size: usize,
) -> usize {
  payload_size + HEADER_SIZE - WORD_SIZE
}

impl Block {
  /// Writes a fresh, used header at `address`.
  ///
  /// # Safety
  ///
  /// `address` must be word aligned and valid for writes of
  /// `total_block_size(size)` bytes.
  pub unsafe fn init(
    address: NonNull<u8>,
    size: usize,
  ) -> *mut Block {
    let block = address.as_ptr() as *mut Block;
    unsafe {
      ptr::addr_of_mut!((*block).size).write(size);
      ptr::addr_of_mut!((*block).magic).write(BLOCK_MAGIC);
      ptr::addr_of_mut!((*block).used).write(true);
      ptr::addr_of_mut!((*block).next).write(ptr::null_mut());
    }
    block
  }

  /// # Safety
  ///
  /// `block` must point to a header written by [`Block::init`].
  #[inline]
  pub unsafe fn fits(
    block: *const Block,
    size: usize,
  ) -> bool {
    unsafe { !(*block).used && (*block).size >= size }
  }
}

/// Maps a payload address back to its header.
#[inline]
pub fn header_of(
  payload: NonNull<u8>,
) -> *mut Block {
  payload.as_ptr().wrapping_sub(PAYLOAD_OFFSET) as *mut Block
}

/// Maps a header to its payload address.
#[inline]
pub fn payload_of(
  block: NonNull<Block>,
) -> NonNull<u8> {
  // SAFETY: offsetting a non-null header by the in-struct payload offset
  // stays inside the same allocation and cannot produce null.
  unsafe { NonNull::new_unchecked((block.as_ptr() as *mut u8).add(PAYLOAD_OFFSET)) }
}

/// Copy of a header's fields, detached from the heap memory.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockInfo {
  pub header: NonNull<Block>,
  pub size: usize,
  pub used: bool,
}

impl BlockInfo {
  /// # Safety
  ///
  /// `block` must point to an initialized header.
  pub(crate) unsafe fn read(
    block: NonNull<Block>,
  ) -> Self {
    let raw = block.as_ptr();
    unsafe {
      Self {
        header: block,
        size: (*raw).size,
        used: (*raw).used,
      }
    }
  }

  pub fn payload(
    &self,
  ) -> NonNull<u8> {
    payload_of(self.header)
  }

  pub fn address(
    &self,
  ) -> usize {
    self.header.as_ptr() as usize
  }

  /// Bytes this block occupies in the heap, header included.
  pub fn footprint(
    &self,
  ) -> usize {
    total_block_size(self.size)
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_layout_is_word_multiple() {
    assert_eq!(PAYLOAD_OFFSET % WORD_SIZE, 0);
    assert_eq!(HEADER_SIZE % WORD_SIZE, 0);
    assert_eq!(HEADER_SIZE, PAYLOAD_OFFSET + WORD_SIZE);
  }

  #[test]
  fn test_total_block_size_counts_inline_word_once() {
    assert_eq!(total_block_size(WORD_SIZE), HEADER_SIZE);
    assert_eq!(total_block_size(4 * WORD_SIZE), HEADER_SIZE + 3 * WORD_SIZE);
  }

  #[test]
  fn test_header_payload_round_trip() {
    let mut backing = [0usize; 8];
    let address = NonNull::new(backing.as_mut_ptr() as *mut u8).unwrap();

    let block = unsafe { Block::init(address, 2 * WORD_SIZE) };
    let header = NonNull::new(block).unwrap();

    let payload = payload_of(header);
    assert_eq!(payload.as_ptr() as usize - address.as_ptr() as usize, PAYLOAD_OFFSET);
    assert_eq!(header_of(payload), block);

    let info = unsafe { BlockInfo::read(header) };
    assert_eq!(info.size, 2 * WORD_SIZE);
    assert!(info.used);
    assert_eq!(info.payload(), payload);
    assert_eq!(info.footprint(), HEADER_SIZE + WORD_SIZE);
  }

  #[test]
  fn test_fits() {
    let mut backing = [0usize; 8];
    let address = NonNull::new(backing.as_mut_ptr() as *mut u8).unwrap();
    let block = unsafe { Block::init(address, 2 * WORD_SIZE) };

    unsafe {
      assert!(!Block::fits(block, WORD_SIZE));

      (*block).used = false;
      assert!(Block::fits(block, WORD_SIZE));
      assert!(Block::fits(block, 2 * WORD_SIZE));
      assert!(!Block::fits(block, 3 * WORD_SIZE));
    }
  }
}
