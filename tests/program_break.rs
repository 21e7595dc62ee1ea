/*!
 * Program Break Tests
 * Drives heaps on the real sbrk(2) break. Every test moves the break, so
 * they run serially and each one puts the break back where it found it.
 */

use std::ptr::NonNull;

use brkheap::{
  Heap, Sbrk, SearchMode,
  align::{WORD_SIZE, align},
  block::{PAYLOAD_OFFSET, total_block_size},
};
use pretty_assertions::assert_eq;
use serial_test::serial;

fn header_address(
  payload: NonNull<u8>,
) -> usize {
  payload.as_ptr() as usize - PAYLOAD_OFFSET
}

/// Moves the break back to `address` if nothing but this test touched it.
fn restore_break(
  expected: usize,
  address: usize,
) {
  if Sbrk::program_break() as usize == expected {
    assert_eq!(unsafe { libc::brk(address as *mut libc::c_void) }, 0);
  }
}

#[test]
#[serial]
fn test_heap_on_program_break() {
  let mut heap = Heap::new();
  heap.initialize(SearchMode::FirstFit);

  let first = heap.allocate(3).unwrap();
  let header = header_address(first);
  assert_eq!(header % WORD_SIZE, 0);
  assert!(Sbrk::program_break() as usize >= header + total_block_size(WORD_SIZE));

  unsafe {
    let value = first.cast::<u64>();
    value.write(0x1122_3344_5566_7788);
    assert_eq!(value.read(), 0x1122_3344_5566_7788);
  }

  let second = heap.allocate(8).unwrap();
  assert_ne!(first, second);
  assert!(second > first);

  heap.release(first).unwrap();
  let break_before_reuse = Sbrk::program_break();
  assert_eq!(heap.allocate(4).unwrap(), first);
  assert_eq!(Sbrk::program_break(), break_before_reuse);

  heap.reset();
  assert!(!heap.is_initialized());
  assert_eq!(Sbrk::program_break() as usize, header);

  assert_eq!(heap.allocate(3).unwrap(), first);
  heap.reset();
}

#[test]
#[serial]
fn test_reset_keeps_memory_obtained_by_other_code() {
  let mut heap = Heap::new();
  let first = heap.allocate(8).unwrap();
  let origin = header_address(first);

  let foreign = unsafe { libc::sbrk(4096) };
  assert_ne!(foreign, usize::MAX as *mut libc::c_void);
  let foreign_end = foreign as usize + 4096;

  let second = heap.allocate(8).unwrap();
  assert!(header_address(second) >= foreign_end);
  assert!(heap.source().is_shared());

  heap.reset();
  assert!(!heap.is_initialized());
  assert!(!heap.source().is_shared());
  assert!(Sbrk::program_break() as usize >= foreign_end);

  unsafe { foreign.cast::<u8>().write_bytes(0x5A, 4096) };

  // A fresh heap starts above the abandoned region and can be reset normally.
  let third = heap.allocate(8).unwrap();
  let fresh = header_address(third);
  assert!(fresh >= foreign_end);
  heap.reset();
  assert_eq!(Sbrk::program_break() as usize, fresh);

  restore_break(fresh, origin);
}

#[test]
#[serial]
fn test_alignment_padding_counts_as_reserved() {
  let origin = Sbrk::program_break() as usize;
  let nudge = if origin % WORD_SIZE == WORD_SIZE - 3 { 4 } else { 3 };
  assert_ne!(unsafe { libc::sbrk(nudge) }, usize::MAX as *mut libc::c_void);

  let unaligned = Sbrk::program_break() as usize;
  assert_ne!(unaligned % WORD_SIZE, 0);
  let padding = align(unaligned) - unaligned;

  let mut heap = Heap::new();
  let payload = heap.allocate(16).unwrap();
  let header = header_address(payload);

  assert_eq!(header, align(unaligned));
  assert_eq!(heap.reserved_bytes(), total_block_size(16) + padding);
  assert_eq!(heap.stats().overhead_bytes(), total_block_size(16) - 16 + padding);

  heap.reset();
  assert_eq!(heap.reserved_bytes(), 0);
  assert_eq!(Sbrk::program_break() as usize, header);

  restore_break(header, origin);
}
