//! # brkheap - A First-Fit / Next-Fit Heap on the Program Break
//!
//! This crate provides a small **free-list allocator** that grows a single
//! heap region with `sbrk(2)` and reuses released blocks before asking the
//! OS for more.
//!
//! ## Overview
//!
//! Every allocation becomes a block: a header followed by its payload.
//! Blocks are appended at the top of the heap and chained in the order
//! they were created:
//!
//! ```text
//!   Heap Layout:
//!
//!   ┌──────────────────────────────────────────────────────────────────────┐
//!   │                              HEAP MEMORY                             │
//!   │                                                                      │
//!   │   ┌────┬──────┬────┬──────────┬────┬────┬───────────────────────────┐│
//!   │   │ H1 │  P1  │ H2 │    P2    │ H3 │ P3 │        Unmapped           ││
//!   │   └────┴──────┴────┴──────────┴────┴────┴───────────────────────────┘│
//!   │   ▲  │        ▲  │             ▲        ▲                            │
//!   │ start└─ next ─┘  └─── next ────┘top     │                            │
//!   │                                      Program                        │
//!   │                                       Break                         │
//!   └──────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! An allocation first searches the list for a free block that is large
//! enough. Only when none exists is the break moved up to make room for a
//! new block.
//!
//! ## Crate Structure
//!
//! ```text
//!   brkheap
//!   ├── align      - Word alignment (align!, align_to!)
//!   ├── block      - Block header layout and header/payload arithmetic
//!   ├── search     - SearchMode, first-fit and next-fit
//!   ├── source     - HeapSource trait and the sbrk-backed source
//!   ├── arena      - mmap-backed fixed-capacity source
//!   ├── heap       - Heap: allocate, release, reset
//!   ├── stats      - HeapStats
//!   ├── config     - HeapConfig
//!   └── error      - HeapError
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use brkheap::{Heap, SearchMode};
//!
//! fn main() -> brkheap::HeapResult<()> {
//!     let mut heap = Heap::new();
//!     heap.initialize(SearchMode::FirstFit);
//!
//!     let ptr = heap.allocate(8)?.cast::<u64>();
//!     unsafe { ptr.write(42) };
//!
//!     heap.release(ptr.cast())?;
//!     heap.reset();
//!     Ok(())
//! }
//! ```
//!
//! ## Blocks
//!
//! ```text
//!   Single Block (64 bit):
//!   ┌───────────────────────────────┬────────────────────────────────┐
//!   │         Block Header          │           Payload              │
//!   │  ┌─────────────────────────┐  │                                │
//!   │  │ size:  N (word aligned) │  │  ┌──────────────────────────┐  │
//!   │  │ magic: 0xB10C4EAD       │  │  │ first word lives in the  │  │
//!   │  │ used:  true/false       │  │  │ header, N bytes usable   │  │
//!   │  │ next:  null/ptr         │  │  │                          │  │
//!   │  └─────────────────────────┘  │  └──────────────────────────┘  │
//!   │           24 bytes            │                                │
//!   └───────────────────────────────┴────────────────────────────────┘
//!                                   ▲
//!                                   └── Pointer returned to the caller
//! ```
//!
//! A block therefore costs `N + 24` bytes of heap on a 64 bit machine.
//!
//! ## Search Modes
//!
//! - [`SearchMode::FirstFit`] scans from the first block and takes the
//!   first free block that is large enough.
//! - [`SearchMode::NextFit`] resumes where the previous search stopped and
//!   wraps around to the start once.
//!
//! ## Limitations
//!
//! - **Single-threaded only**: `Heap` is neither `Send` nor `Sync`; wrap it
//!   in a lock to share it.
//! - **No splitting**: a large free block is handed out whole to a small
//!   request.
//! - **No coalescing**: adjacent free blocks are never merged, so free
//!   memory fragments over time. [`HeapStats::fragmentation`] measures it.
//! - **Unix-only**: requires `libc` (`sbrk`, `brk`, `mmap`).
//!
//! ## Safety
//!
//! Allocation and release are safe calls: handles are validated against
//! the heap bounds and a per-block canary before the heap writes through
//! them. Reading and writing the returned payload is up to the caller.
//! Sharing the program break with another allocator is tolerated while
//! growing; [`Heap::reset`] refuses to move the break back if anything
//! else moved it since the heap last grew.

pub mod align;
pub mod arena;
pub mod block;
pub mod config;
pub mod error;
mod heap;
pub mod search;
pub mod source;
mod stats;

pub use arena::Arena;
pub use block::BlockInfo;
pub use config::HeapConfig;
pub use error::{HandleFault, HeapError, HeapResult};
pub use heap::{Blocks, Heap};
pub use search::SearchMode;
pub use source::{Extension, HeapSource, Sbrk};
pub use stats::HeapStats;
