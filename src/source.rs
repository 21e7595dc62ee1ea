use std::ptr::{self, NonNull};

use libc::{brk, c_void, intptr_t, sbrk};
use log::{debug, warn};

use crate::align::{WORD_SIZE, align};

/// Memory handed out by one [`HeapSource::extend`] call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Extension {
  /// Word-aligned start of the new memory.
  pub start: NonNull<u8>,
  /// Bytes the region actually grew by, alignment padding included.
  pub consumed: usize,
}

/// A contiguous region that can be extended at its end and rolled back,
/// in the manner of the program break.
///
/// # Safety
///
/// A successful [`extend`](HeapSource::extend) must return a word-aligned
/// start valid for reads and writes of the requested number of bytes,
/// strictly above every address it returned before, until a
/// [`rollback`](HeapSource::rollback) at or below it.
pub unsafe trait HeapSource {
  /// Grows the region by at least `bytes` and returns where the new memory
  /// starts, or `None` when the region cannot grow.
  fn extend(
    &mut self,
    bytes: usize,
  ) -> Option<Extension>;

  /// Moves the boundary back to `boundary`, returning `true` if the memory
  /// above it was handed back.
  ///
  /// # Safety
  ///
  /// `boundary` must have been returned by `extend`, and no memory above it
  /// may be used afterwards.
  unsafe fn rollback(
    &mut self,
    boundary: NonNull<u8>,
  ) -> bool;
}

/// Heap source backed by the process program break (`sbrk(2)`).
///
/// Other code in the process may move the break too. Once that happens
/// between two extensions, memory below the current end is no longer
/// exclusively ours and [`rollback`](HeapSource::rollback) refuses to run.
#[derive(Debug)]
pub struct Sbrk {
  end: *mut u8,
  foreign: bool,
}

impl Sbrk {
  pub const fn new() -> Self {
    Self {
      end: ptr::null_mut(),
      foreign: false,
    }
  }

  /// Whether something else moved the break since the region was started.
  pub fn is_shared(
    &self,
  ) -> bool {
    self.foreign
  }

  /// Current program break as reported by `sbrk(0)`.
  pub fn program_break() -> *mut u8 {
    unsafe { sbrk(0) as *mut u8 }
  }
}

impl Default for Sbrk {
  fn default() -> Self {
    Self::new()
  }
}

fn sbrk_failed(
  address: *mut c_void,
) -> bool {
  address == usize::MAX as *mut c_void
}

unsafe impl HeapSource for Sbrk {
  fn extend(
    &mut self,
    bytes: usize,
  ) -> Option<Extension> {
    let current = Self::program_break();
    if sbrk_failed(current as *mut c_void) {
      return None;
    }

    if !self.end.is_null() && current != self.end && !self.foreign {
      warn!(
        "program break moved from {:?} to {:?} by other code, heap memory is now interleaved",
        self.end, current
      );
      self.foreign = true;
    }

    // Other code may leave the break unaligned.
    let padding = align(current as usize) - current as usize;
    let total = bytes.checked_add(padding)?;
    if total > isize::MAX as usize {
      return None;
    }

    let previous = unsafe { sbrk(total as intptr_t) };
    if sbrk_failed(previous) {
      return None;
    }

    let previous = previous as *mut u8;
    self.end = previous.wrapping_add(total);

    debug_assert_eq!((previous as usize + padding) % WORD_SIZE, 0);
    NonNull::new(previous.wrapping_add(padding)).map(|start| Extension {
      start,
      consumed: total,
    })
  }

  unsafe fn rollback(
    &mut self,
    boundary: NonNull<u8>,
  ) -> bool {
    let current = Self::program_break();
    if self.foreign || current != self.end {
      warn!(
        "program break shared with other code (at {:?}, heap end {:?}), keeping memory",
        current, self.end
      );
      // The abandoned region stays put; the next extension starts afresh above it.
      self.end = ptr::null_mut();
      self.foreign = false;
      return false;
    }

    if unsafe { brk(boundary.as_ptr() as *mut c_void) } != 0 {
      warn!("brk({:?}) failed", boundary);
      return false;
    }

    debug!("program break rolled back from {:?} to {:?}", current, boundary);
    self.end = boundary.as_ptr();
    self.foreign = false;
    true
  }
}
