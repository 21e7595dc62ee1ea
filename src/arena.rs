use std::{io, ptr::NonNull};

use libc::{
  MAP_ANONYMOUS, MAP_FAILED, MAP_PRIVATE, PROT_READ, PROT_WRITE, _SC_PAGESIZE, c_void, mmap,
  munmap, sysconf,
};
use log::{debug, warn};

use crate::{
  align::checked_align_to,
  error::{HeapError, HeapResult},
  source::{Extension, HeapSource},
};

const FALLBACK_PAGE_SIZE: usize = 4096;

fn page_size() -> usize {
  match unsafe { sysconf(_SC_PAGESIZE) } {
    size if size > 0 => size as usize,
    _ => FALLBACK_PAGE_SIZE,
  }
}

/// A fixed-capacity region reserved up front with `mmap(2)`.
///
/// The arena hands out memory from its base upwards like a private program
/// break. Addresses are stable for the arena's lifetime, so two heaps built
/// on fresh arenas of the same base behave identically, and exhausting the
/// capacity is an ordinary, recoverable out-of-memory condition.
#[derive(Debug)]
pub struct Arena {
  base: NonNull<u8>,
  capacity: usize,
  brk: usize,
}

impl Arena {
  /// Maps at least `capacity` bytes, rounded up to whole pages.
  ///
  /// A capacity that cannot be rounded up to a page is reported as a
  /// failed mapping rather than wrapping around.
  pub fn new(
    capacity: usize,
  ) -> HeapResult<Self> {
    let Some(capacity) = checked_align_to(capacity.max(1), page_size()) else {
      return Err(HeapError::Map {
        size: capacity,
        source: io::Error::from(io::ErrorKind::OutOfMemory),
      });
    };

    let address = unsafe {
      mmap(
        std::ptr::null_mut(),
        capacity,
        PROT_READ | PROT_WRITE,
        MAP_PRIVATE | MAP_ANONYMOUS,
        -1,
        0,
      )
    };

    if address == MAP_FAILED {
      return Err(HeapError::Map {
        size: capacity,
        source: io::Error::last_os_error(),
      });
    }

    let base = NonNull::new(address as *mut u8).ok_or_else(|| HeapError::Map {
      size: capacity,
      source: io::Error::other("mmap returned null"),
    })?;

    debug!("mapped {} byte arena at {:?}", capacity, base);
    Ok(Self {
      base,
      capacity,
      brk: 0,
    })
  }

  pub fn base(
    &self,
  ) -> NonNull<u8> {
    self.base
  }

  pub fn capacity(
    &self,
  ) -> usize {
    self.capacity
  }

  /// Bytes handed out so far.
  pub fn used(
    &self,
  ) -> usize {
    self.brk
  }

  pub fn remaining(
    &self,
  ) -> usize {
    self.capacity - self.brk
  }
}

unsafe impl HeapSource for Arena {
  fn extend(
    &mut self,
    bytes: usize,
  ) -> Option<Extension> {
    if bytes > self.remaining() {
      return None;
    }

    // SAFETY: `brk <= capacity`, so the offset stays inside the mapping.
    let start = unsafe { self.base.add(self.brk) };
    self.brk += bytes;
    Some(Extension {
      start,
      consumed: bytes,
    })
  }

  unsafe fn rollback(
    &mut self,
    boundary: NonNull<u8>,
  ) -> bool {
    let offset = (boundary.as_ptr() as usize).wrapping_sub(self.base.as_ptr() as usize);
    if offset > self.brk {
      warn!("rollback to {:?} is outside the arena at {:?}", boundary, self.base);
      return false;
    }

    self.brk = offset;
    true
  }
}

impl Drop for Arena {
  fn drop(
    &mut self,
  ) {
    if unsafe { munmap(self.base.as_ptr() as *mut c_void, self.capacity) } != 0 {
      warn!(
        "munmap of arena at {:?} failed: {}",
        self.base,
        io::Error::last_os_error()
      );
    }
  }
}
