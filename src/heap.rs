use std::{
  marker::PhantomData,
  ptr::{self, NonNull},
};

use log::{debug, trace, warn};

use crate::{
  align::{WORD_SIZE, checked_align},
  block::{BLOCK_MAGIC, Block, BlockInfo, HEADER_SIZE, header_of, payload_of},
  config::HeapConfig,
  error::{HandleFault, HeapError, HeapResult},
  search::{self, SearchMode},
  source::{HeapSource, Sbrk},
  stats::HeapStats,
};

/// First-fit / next-fit heap over a list of blocks appended end to end in
/// memory obtained from a [`HeapSource`].
///
/// Blocks are never split or coalesced. A released block stays in the list
/// with its original size and is handed out again, whole, to any request
/// that fits inside it.
pub struct Heap<S: HeapSource = Sbrk> {
  source: S,
  start: *mut Block,
  top: *mut Block,
  cursor: *mut Block,
  mode: SearchMode,
  limit: Option<usize>,
  reserved: usize,
}

impl Heap<Sbrk> {
  /// First-fit heap on the process program break.
  pub fn new() -> Self {
    Self::with_source(Sbrk::new(), SearchMode::FirstFit)
  }
}

impl Default for Heap<Sbrk> {
  fn default() -> Self {
    Self::new()
  }
}

impl<S: HeapSource> Heap<S> {
  pub fn with_source(
    source: S,
    mode: SearchMode,
  ) -> Self {
    Self {
      source,
      start: ptr::null_mut(),
      top: ptr::null_mut(),
      cursor: ptr::null_mut(),
      mode,
      limit: None,
      reserved: 0,
    }
  }

  pub fn from_config(
    source: S,
    config: &HeapConfig,
  ) -> Self {
    let mut heap = Self::with_source(source, config.search_mode);
    heap.limit = config.limit;
    heap
  }

  /// Sets the search mode and resets the heap.
  pub fn initialize(
    &mut self,
    mode: SearchMode,
  ) {
    self.mode = mode;
    self.reset();
  }

  /// Hands every byte obtained so far back to the source and forgets all
  /// blocks. Does nothing on a heap that holds no blocks.
  pub fn reset(
    &mut self,
  ) {
    let Some(start) = NonNull::new(self.start) else {
      return;
    };

    // SAFETY: `start` is the first address `extend` returned, and every
    // handle into the heap is invalidated by clearing the list below.
    let released = unsafe { self.source.rollback(start.cast()) };
    debug!(
      "heap reset at {:?}, {} bytes {}",
      start,
      self.reserved,
      if released { "released" } else { "abandoned" }
    );

    self.start = ptr::null_mut();
    self.top = ptr::null_mut();
    self.cursor = ptr::null_mut();
    self.reserved = 0;
  }

  /// Allocates at least `size` bytes and returns the payload address,
  /// word aligned.
  pub fn allocate(
    &mut self,
    size: usize,
  ) -> HeapResult<NonNull<u8>> {
    if size == 0 {
      return Err(HeapError::ZeroSize);
    }

    let size = checked_align(size).ok_or(HeapError::OutOfMemory { requested: size })?;

    if let Some(block) = NonNull::new(self.find_block(size)) {
      // SAFETY: search results are live headers of this heap.
      unsafe { (*block.as_ptr()).used = true };
      let payload = payload_of(block);
      trace!("reused block {:?} for {} bytes, payload {:?}", block, size, payload);
      return Ok(payload);
    }

    let address = self.grow_heap(size)?;

    // SAFETY: `grow_heap` returned `total_block_size(size)` fresh bytes.
    let block = unsafe { Block::init(address, size) };

    if self.start.is_null() {
      self.start = block;
    }

    if !self.top.is_null() {
      // SAFETY: `top` is the live last header of the list.
      unsafe { (*self.top).next = block };
    }

    self.top = block;
    // Next-fit carries on from the block it just appended.
    self.cursor = block;

    // SAFETY: `Block::init` returns its non-null `address`.
    let payload = payload_of(unsafe { NonNull::new_unchecked(block) });
    trace!("new block {:?} for {} bytes, payload {:?}", block, size, payload);
    Ok(payload)
  }

  /// Marks the block owning `payload` free.
  ///
  /// The handle is checked before anything is written: it must be word
  /// aligned, resolve to a header inside the heap carrying the block
  /// canary, and belong to a used block.
  pub fn release(
    &mut self,
    payload: NonNull<u8>,
  ) -> HeapResult<()> {
    let block = self.resolve(payload)?.as_ptr();

    // SAFETY: `resolve` only returns live headers.
    unsafe {
      if !(*block).used {
        warn!("double release of {:?}", payload);
        return Err(HeapError::invalid(payload.as_ptr() as usize, HandleFault::AlreadyReleased));
      }
      (*block).used = false;
    }

    trace!("released block {:?}", block);
    Ok(())
  }

  /// Header fields of the block owning `payload`, with the same checks as
  /// [`release`](Self::release) apart from the used flag.
  pub fn header_of(
    &self,
    payload: NonNull<u8>,
  ) -> HeapResult<BlockInfo> {
    let block = self.resolve(payload)?;
    // SAFETY: `resolve` only returns live headers.
    Ok(unsafe { BlockInfo::read(block) })
  }

  /// Payload address of a block, the inverse of [`header_of`](Self::header_of).
  pub fn payload_of(
    &self,
    block: &BlockInfo,
  ) -> NonNull<u8> {
    block.payload()
  }

  /// Blocks in list order, which is also address order.
  pub fn blocks(
    &self,
  ) -> Blocks<'_> {
    Blocks {
      current: self.start,
      _heap: PhantomData,
    }
  }

  pub fn stats(
    &self,
  ) -> HeapStats {
    HeapStats::collect(self.blocks(), self.reserved)
  }

  pub fn mode(
    &self,
  ) -> SearchMode {
    self.mode
  }

  pub fn is_initialized(
    &self,
  ) -> bool {
    !self.start.is_null()
  }

  pub fn limit(
    &self,
  ) -> Option<usize> {
    self.limit
  }

  /// Bytes obtained from the source since the last reset, including any
  /// padding the source skipped to keep blocks word aligned.
  pub fn reserved_bytes(
    &self,
  ) -> usize {
    self.reserved
  }

  pub fn source(
    &self,
  ) -> &S {
    &self.source
  }

  fn find_block(
    &mut self,
    size: usize,
  ) -> *mut Block {
    // SAFETY: `start`, `top` and `cursor` are null or members of the list
    // this heap built.
    unsafe {
      match self.mode {
        SearchMode::FirstFit => search::first_fit(self.start, size),
        SearchMode::NextFit => search::next_fit(self.start, &mut self.cursor, size),
      }
    }
  }

  fn grow_heap(
    &mut self,
    size: usize,
  ) -> HeapResult<NonNull<u8>> {
    let bytes = size
      .checked_add(HEADER_SIZE - WORD_SIZE)
      .ok_or(HeapError::OutOfMemory { requested: size })?;

    if let Some(limit) = self.limit {
      if self.reserved.saturating_add(bytes) > limit {
        warn!(
          "growth by {} bytes would exceed the {} byte limit ({} reserved)",
          bytes, limit, self.reserved
        );
        return Err(HeapError::OutOfMemory { requested: bytes });
      }
    }

    let Some(extension) = self.source.extend(bytes) else {
      warn!("heap source refused to grow by {} bytes", bytes);
      return Err(HeapError::OutOfMemory { requested: bytes });
    };

    // Includes whatever the source skipped to align the block.
    self.reserved += extension.consumed;
    debug!(
      "heap grew by {} bytes at {:?} ({} consumed)",
      bytes, extension.start, extension.consumed
    );
    Ok(extension.start)
  }

  fn resolve(
    &self,
    payload: NonNull<u8>,
  ) -> HeapResult<NonNull<Block>> {
    let address = payload.as_ptr() as usize;
    let reject = |reason: HandleFault| -> HeapResult<NonNull<Block>> {
      warn!("rejected handle {:?}: {}", payload, reason);
      Err(HeapError::invalid(address, reason))
    };

    if self.start.is_null() {
      return reject(HandleFault::Uninitialized);
    }

    if address % WORD_SIZE != 0 {
      return reject(HandleFault::Misaligned);
    }

    let block = header_of(payload);
    if block < self.start || block > self.top {
      return reject(HandleFault::OutOfBounds);
    }

    // SAFETY: every word between `start` and `top` was obtained from the
    // source and is still mapped.
    if unsafe { ptr::addr_of!((*block).magic).read() } != BLOCK_MAGIC {
      return reject(HandleFault::BadMagic);
    }

    // SAFETY: `block >= start`, which is non-null.
    Ok(unsafe { NonNull::new_unchecked(block) })
  }
}

/// Iterator over a heap's blocks, see [`Heap::blocks`].
pub struct Blocks<'a> {
  current: *mut Block,
  _heap: PhantomData<&'a ()>,
}

impl Iterator for Blocks<'_> {
  type Item = BlockInfo;

  fn next(
    &mut self,
  ) -> Option<Self::Item> {
    let block = NonNull::new(self.current)?;
    // SAFETY: the borrow of the heap keeps the list alive and unchanged.
    let info = unsafe { BlockInfo::read(block) };
    self.current = unsafe { (*block.as_ptr()).next };
    Some(info)
  }
}
