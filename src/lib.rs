//! # `pagecomb` - Page-Carving Compact Allocator
//!
//! A specialized allocator for memory-dense associative containers that
//! store many small, variable-length slot groups. A general-purpose
//! allocator spends headers, alignment padding and coalescing metadata on
//! every such group; `pagecomb` instead carves fixed-size pages into
//! contiguous runs of slots, keeping the overhead near one word per empty
//! bucket while still supporting fast grow/shrink/reallocate.
//!
//! ## How it works
//!
//! - **Pages**: each page is a slab of `64 * W` slots of `T` plus a bitmap
//!   (1 = busy), a free count, a scan cursor, and the longest known run of
//!   free slots.
//! - **Segment tree**: an implicit binary tree over the pages caches, per
//!   node, the maximum longest-free-run below it, so a request descends to
//!   a page with enough contiguous room in O(log P). The tree starts with
//!   two leaves, doubles when the root is exhausted, and collapses when the
//!   last page dies.
//! - **Saturated caching**: run lengths are only tracked exactly up to
//!   [`MAX_GROUP_SIZE`], which keeps the hot bitmap updates O(1). The same
//!   constant is the allocator's request ceiling (`max_size`), so every
//!   legal request can always be routed to a page whose cache says it
//!   fits, however churned that page is.
//! - **In-place reallocation**: `reallocate` first tries to extend a block
//!   into free neighbor slots (after it, then before it) and only falls
//!   back to a hinted allocate-copy-free.
//!
//! ## Sharing
//!
//! [`CombAlloc`] is a value-type handle over a reference-counted segment
//! tree: containers clone their allocator freely and every clone serves
//! and releases the same storage. The allocator is single-threaded by
//! contract and `!Send + !Sync` by construction.
//!
//! ## Example
//!
//! ```rust
//! use pagecomb::CombAlloc;
//!
//! // 64-slot pages of u64.
//! let alloc: CombAlloc<u64, 1> = CombAlloc::new();
//!
//! let p = alloc.allocate(8, None);
//! unsafe {
//!     p.as_ptr().write(42);
//!
//!     // Grows in place: nothing else occupies the page yet.
//!     let q = alloc.reallocate(Some(p), 8, 16).unwrap();
//!     assert_eq!(q, p);
//!     assert_eq!(*q.as_ptr(), 42);
//!
//!     alloc.deallocate(q, 16);
//! }
//! assert_eq!(alloc.stats().allocated_slots, 0);
//! ```

#![warn(missing_docs, clippy::all, clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::cast_possible_truncation, clippy::cast_possible_wrap)]

pub mod alloc;
pub mod collections;

pub use alloc::{AllocStats, CombAlloc, HeapAlloc, SlotAlloc, MAX_GROUP_SIZE};
pub use collections::FixedBitSet;

// Compile-time layout claims.
const _: () = {
    use core::mem;

    // The handle is a single shared pointer, with a niche.
    assert!(mem::size_of::<CombAlloc<u64>>() == mem::size_of::<usize>());
    assert!(mem::size_of::<Option<CombAlloc<u64>>>() == mem::size_of::<usize>());

    // The default page holds 2048 slots behind a 32-word bitmap.
    assert!(CombAlloc::<u64>::CAPACITY == 2048);
    assert!(FixedBitSet::<32>::BITS == 2048);
};
