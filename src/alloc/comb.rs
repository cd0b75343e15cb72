//! `CombAlloc` — the shared-owner handle over one segment tree.
//!
//! Containers copy their allocator on rehash and move, and every copy must
//! keep serving pointers from the same backing store, so the handle is a
//! value type holding a reference-counted tree. The allocator is strictly
//! single-threaded; `Rc`/`RefCell` keep it `!Send + !Sync` and turn any
//! reentrant use into a loud borrow failure instead of silent corruption.

use core::mem;
use core::ptr::{self, NonNull};
use std::cell::RefCell;
use std::rc::Rc;

use super::tree::SegTree;
use super::{AllocStats, HeapAlloc, SlotAlloc, MAX_GROUP_SIZE};

/// Compact allocator handle for small slot groups of `T`, packed into
/// `64 * W`-slot pages.
///
/// All clones of a handle share one segment tree. Equality compares tree
/// identity; dropping the last handle releases the tree, which must be
/// empty by then (checked in debug builds).
///
/// Pointers returned by [`CombAlloc::allocate`] stay valid until they are
/// deallocated, across any number of other operations on any handle.
pub struct CombAlloc<T, const W: usize = 32> {
    tree: Rc<RefCell<SegTree<T, W>>>,
}

impl<T, const W: usize> CombAlloc<T, W> {
    /// Slot capacity of one page.
    pub const CAPACITY: usize = 64 * W;

    const SLOT_IS_SIZED: () = assert!(
        mem::size_of::<T>() != 0,
        "CombAlloc does not support zero-sized slot types"
    );

    /// Creates an allocator with no pages.
    pub fn new() -> Self {
        let () = Self::SLOT_IS_SIZED;
        Self {
            tree: Rc::new(RefCell::new(SegTree::new())),
        }
    }

    /// Allocates `n` contiguous slots, preferring the page containing
    /// `hint` when it has room.
    ///
    /// `n` must be in `1..=max_size()`. Never returns null; exhaustion of
    /// the backing heap is fatal.
    pub fn allocate(&self, n: usize, hint: Option<NonNull<T>>) -> NonNull<T> {
        self.tree.borrow_mut().allocate(n, hint)
    }

    /// Releases `n` slots at `p`. Slot contents are not dropped.
    ///
    /// # Safety
    /// `p` must be a live allocation from this allocator's tree and `n`
    /// must be the block's current size.
    pub unsafe fn deallocate(&self, p: NonNull<T>, n: usize) {
        self.tree.borrow_mut().deallocate(p, n);
    }

    /// Tries to grow the block at `p` from `old_size` to `new_size` slots
    /// without moving its contents, after it when `prefer_after` allows,
    /// otherwise before it.
    ///
    /// Returns the block's (possibly lower) new pointer, or `None` when
    /// in-place growth is impossible — a normal outcome, not an error.
    /// On a leftward extension the old contents are *not* moved; that is
    /// the caller's job (see [`Self::reallocate`]).
    ///
    /// # Safety
    /// `p` must be a live allocation of exactly `old_size` slots, and
    /// `new_size > old_size`.
    pub unsafe fn extend(
        &self,
        p: NonNull<T>,
        old_size: usize,
        new_size: usize,
        prefer_after: bool,
    ) -> Option<NonNull<T>> {
        self.tree.borrow_mut().extend(p, old_size, new_size, prefer_after)
    }

    /// Releases the tail of the block at `p`, keeping the first
    /// `new_size` slots. Always succeeds and returns `p`.
    ///
    /// # Safety
    /// `p` must be a live allocation of exactly `old_size` slots, and
    /// `0 < new_size < old_size`.
    pub unsafe fn shrink(&self, p: NonNull<T>, old_size: usize, new_size: usize) -> NonNull<T> {
        self.tree.borrow_mut().shrink(p, old_size, new_size)
    }

    /// Resizes a block, moving its contents only when in-place growth
    /// fails.
    ///
    /// Policy: a null `p` allocates fresh; `new_size == old_size` returns
    /// `p`; `new_size == 0` deallocates; shrinking releases the tail in
    /// place; growth first tries [`Self::extend`] (sliding the contents
    /// down after a leftward extension) and falls back to a hinted
    /// allocate-copy-deallocate. Sizes are bounded by [`Self::max_size`].
    ///
    /// # Safety
    /// When `p` is `Some`, it must be a live allocation of exactly
    /// `old_size` slots whose first `old_size` slots are initialized (they
    /// are copied bytewise on a move).
    pub unsafe fn reallocate(
        &self,
        p: Option<NonNull<T>>,
        old_size: usize,
        new_size: usize,
    ) -> Option<NonNull<T>> {
        let Some(p) = p else {
            return Some(self.allocate(new_size, None));
        };

        if new_size <= old_size {
            if new_size == old_size {
                return Some(p);
            }
            if new_size == 0 {
                self.deallocate(p, old_size);
                return None;
            }
            return Some(self.shrink(p, old_size, new_size));
        }

        if let Some(q) = self.extend(p, old_size, new_size, true) {
            if q.as_ptr() < p.as_ptr() {
                // Leftward extension: slide the old contents down.
                ptr::copy(p.as_ptr(), q.as_ptr(), old_size);
            }
            return Some(q);
        }

        let q = self.allocate(new_size, Some(p));
        ptr::copy_nonoverlapping(p.as_ptr(), q.as_ptr(), old_size);
        self.deallocate(p, old_size);
        Some(q)
    }

    /// Largest slot count a single allocation may request: one group,
    /// [`MAX_GROUP_SIZE`].
    ///
    /// This is deliberately smaller than [`Self::CAPACITY`]: beyond the
    /// saturation ceiling a page's cached free-run length is only a loose
    /// "big enough" marker, so a larger request could not be routed back
    /// to a churned page with room and would strand its free space.
    pub fn max_size(&self) -> usize {
        MAX_GROUP_SIZE.min(Self::CAPACITY)
    }

    /// Snapshot of the tree's counters.
    pub fn stats(&self) -> AllocStats {
        self.tree.borrow().stats()
    }

    /// Checks every structural invariant of the tree; `true` when sound.
    pub fn validate(&self) -> bool {
        self.tree.borrow().validate()
    }
}

impl<T, const W: usize> Default for CombAlloc<T, W> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T, const W: usize> Clone for CombAlloc<T, W> {
    /// Clones share the backing tree.
    fn clone(&self) -> Self {
        Self {
            tree: Rc::clone(&self.tree),
        }
    }
}

impl<T, const W: usize> PartialEq for CombAlloc<T, W> {
    /// Handles are equal when they share a tree.
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.tree, &other.tree)
    }
}

impl<T, const W: usize> Eq for CombAlloc<T, W> {}

impl<T, const W: usize> std::fmt::Debug for CombAlloc<T, W> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CombAlloc")
            .field("tree", &Rc::as_ptr(&self.tree))
            .finish()
    }
}

impl<T, const W: usize> SlotAlloc<T> for CombAlloc<T, W> {
    type Rebind<U> = HeapAlloc<U>;

    fn allocate(&self, n: usize, hint: Option<NonNull<T>>) -> NonNull<T> {
        CombAlloc::allocate(self, n, hint)
    }

    unsafe fn deallocate(&self, p: NonNull<T>, n: usize) {
        CombAlloc::deallocate(self, p, n);
    }

    fn max_size(&self) -> usize {
        CombAlloc::max_size(self)
    }
}
