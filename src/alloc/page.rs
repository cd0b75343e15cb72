//! `Page` — one fixed-capacity slab of `64 * W` slots with a free bitmap.
//!
//! A page owns the raw slot storage and the bookkeeping needed to carve it
//! into variable-length runs: an occupancy bitmap (1 = busy), a free count,
//! a cursor for the next linear scan, and the start of the longest known
//! free run. Every mutating operation also maintains the owning segment's
//! cached `longest_free` value and reports the signed change, so the
//! segment tree above can be updated without re-measuring the page.

use core::mem::MaybeUninit;
use core::ptr::{self, NonNull};

use crate::collections::bit_set::FixedBitSet;

use super::MAX_GROUP_SIZE;

/// One slab of `64 * W` slots of `T`.
///
/// Pages are constructed in place at raw heap memory (see
/// [`Page::init`]); the slot storage is never initialized or dropped by the
/// allocator itself.
pub(crate) struct Page<T, const W: usize> {
    /// Occupancy: 1 = busy, 0 = free.
    bitmap: FixedBitSet<W>,
    num_free: usize,
    /// Where the next allocation scan starts.
    start_idx: usize,
    /// Start of the longest known free run; `None` when unknown.
    lzs_start: Option<usize>,
    items: [[MaybeUninit<T>; 64]; W],
}

impl<T, const W: usize> Page<T, W> {
    pub(crate) const CAPACITY: usize = 64 * W;

    const CAPACITY_FITS: () = assert!(64 * W <= u32::MAX as usize);

    /// Initializes the bookkeeping fields of a page at `page`.
    ///
    /// The slot storage is left uninitialized.
    ///
    /// # Safety
    /// `page` must be valid for writes of a whole `Page<T, W>`.
    pub(crate) unsafe fn init(page: NonNull<Self>) {
        let () = Self::CAPACITY_FITS;
        let p = page.as_ptr();
        ptr::addr_of_mut!((*p).bitmap).write(FixedBitSet::new());
        ptr::addr_of_mut!((*p).num_free).write(Self::CAPACITY);
        ptr::addr_of_mut!((*p).start_idx).write(0);
        ptr::addr_of_mut!((*p).lzs_start).write(Some(0));
    }

    /// Address of slot 0, the key under which this page is indexed.
    pub(crate) fn base_addr(&self) -> usize {
        self.items.as_ptr() as usize
    }

    fn slot_ptr(&mut self, idx: usize) -> NonNull<T> {
        debug_assert!(idx < Self::CAPACITY);
        unsafe { NonNull::new_unchecked(self.items.as_mut_ptr().cast::<T>().add(idx)) }
    }

    /// Allocates `n` contiguous slots. The caller must have checked
    /// `n <= lf` against this page's segment.
    pub(crate) fn allocate(&mut self, n: usize, lf: &mut u32) -> (NonNull<T>, isize) {
        debug_assert!(n >= 1 && n as u32 <= *lf);
        let start = self.bitmap.find_next_n(n, self.start_idx);
        debug_assert!(start.is_some(), "caller promised a free run of {n} slots");
        let start = unsafe { start.unwrap_unchecked() };
        debug_assert!(self.bitmap.none_in(start, start + n));

        let free_before = self.num_free;
        self.bitmap.set_range(start, start + n);
        self.start_idx = start + n;
        self.num_free -= n;

        let diff = if *lf as usize == free_before && self.lzs_start == Some(start) {
            // All free space was one run and the allocation came off its
            // head; the remainder stays exact.
            *lf -= n as u32;
            self.lzs_start = Some(start + n);
            -(n as isize)
        } else {
            self.refresh_longest_free(lf)
        };
        self.check_cache(*lf);
        (self.slot_ptr(start), diff)
    }

    /// Grows the busy run `[start, start + old_sz)` to `new_sz` slots in
    /// place, after it when `prefer_after` allows, otherwise before it
    /// (returning the shifted pointer). `None` when neither side has room.
    pub(crate) fn extend(
        &mut self,
        start: usize,
        old_sz: usize,
        new_sz: usize,
        prefer_after: bool,
        lf: &mut u32,
    ) -> Option<(NonNull<T>, isize)> {
        debug_assert!(new_sz > old_sz);
        debug_assert!(self.bitmap.all_in(start, start + old_sz));
        debug_assert!(self.lzs_start != Some(start) || *lf == 0);

        let add = new_sz - old_sz;
        if (*lf as usize) < add {
            return None;
        }

        let have_after = start + new_sz <= Self::CAPACITY
            && self.bitmap.none_in(start + old_sz, start + new_sz);
        if prefer_after && have_after {
            return Some(self.extend_after(start, old_sz, new_sz, lf));
        }

        let have_before = start >= add && self.bitmap.none_in(start - add, start);
        if have_before {
            self.bitmap.set_range(start - add, start);
            self.num_free -= add;
            let diff = if self.lzs_start.is_none()
                || *lf as usize >= MAX_GROUP_SIZE
                || self.lzs_start.map(|s| s + *lf as usize) == Some(start)
            {
                self.refresh_longest_free(lf)
            } else {
                0
            };
            self.check_cache(*lf);
            return Some((self.slot_ptr(start - add), diff));
        }

        if have_after {
            return Some(self.extend_after(start, old_sz, new_sz, lf));
        }
        None
    }

    fn extend_after(
        &mut self,
        start: usize,
        old_sz: usize,
        new_sz: usize,
        lf: &mut u32,
    ) -> (NonNull<T>, isize) {
        self.bitmap.set_range(start + old_sz, start + new_sz);
        self.num_free -= new_sz - old_sz;
        let diff = if self.lzs_start.is_none()
            || *lf as usize >= MAX_GROUP_SIZE
            || self.lzs_start == Some(start + old_sz)
        {
            self.refresh_longest_free(lf)
        } else {
            0
        };
        self.check_cache(*lf);
        (self.slot_ptr(start), diff)
    }

    /// Releases the tail `[start + new_sz, start + old_sz)` of a busy run.
    pub(crate) fn shrink(
        &mut self,
        start: usize,
        old_sz: usize,
        new_sz: usize,
        lf: &mut u32,
    ) -> (NonNull<T>, isize) {
        debug_assert!(new_sz > 0 && new_sz < old_sz);
        debug_assert!(self.bitmap.all_in(start, start + old_sz));

        self.bitmap.reset_range(start + new_sz, start + old_sz);
        self.num_free += old_sz - new_sz;
        // Only a cached run starting right after the block can have merged
        // with the freed tail.
        let diff = if (*lf as usize) < MAX_GROUP_SIZE && self.lzs_start == Some(start + old_sz) {
            self.refresh_longest_free(lf)
        } else {
            0
        };
        self.check_cache(*lf);
        (self.slot_ptr(start), diff)
    }

    /// Releases the busy run `[start, start + n)`.
    pub(crate) fn free(&mut self, start: usize, n: usize, lf: &mut u32) -> isize {
        debug_assert!(self.bitmap.all_in(start, start + n));

        self.bitmap.reset_range(start, start + n);
        self.num_free += n;

        let diff;
        if self.num_free == Self::CAPACITY {
            self.lzs_start = Some(0);
            diff = Self::CAPACITY as isize - *lf as isize;
            *lf = Self::CAPACITY as u32;
        } else if (*lf as usize) < MAX_GROUP_SIZE {
            // Cheap local widen around the freed range; adopt it when it
            // beats the cached run.
            let (new_lf, pos) = self.bitmap.zero_run_around(start, start + n);
            if new_lf > *lf as usize {
                diff = new_lf as isize - *lf as isize;
                *lf = new_lf as u32;
                self.lzs_start = Some(pos);
            } else {
                diff = 0;
            }
        } else {
            diff = 0;
        }
        self.check_cache(*lf);
        diff
    }

    /// Recomputes the longest free run, saturated at [`MAX_GROUP_SIZE`],
    /// writes it through `lf` and returns the signed change.
    fn refresh_longest_free(&mut self, lf: &mut u32) -> isize {
        let new_lf = self.measure_longest_free() as u32;
        let diff = new_lf as isize - *lf as isize;
        *lf = new_lf;
        diff
    }

    fn measure_longest_free(&mut self) -> usize {
        self.lzs_start = None;
        if self.num_free <= 1 {
            return self.num_free;
        }
        if self.bitmap.has_zero_word() {
            // A whole free word is already "big enough"; skip the run query.
            return MAX_GROUP_SIZE;
        }
        let (len, start) = self.bitmap.longest_zero_run(MAX_GROUP_SIZE);
        self.lzs_start = start;
        len
    }

    #[inline]
    fn check_cache(&self, lf: u32) {
        debug_assert!(lf as usize >= MAX_GROUP_SIZE || lf as usize <= self.num_free);
        if let Some(s) = self.lzs_start {
            debug_assert!(self.bitmap.none_in(s, s + lf as usize));
        }
    }

    pub(crate) fn num_allocated(&self) -> usize {
        self.bitmap.count_ones()
    }

    pub(crate) fn num_free(&self) -> usize {
        self.num_free
    }

    #[cfg(test)]
    pub(crate) fn counts_are_consistent(&self) -> bool {
        self.bitmap.count_ones() + self.num_free == Self::CAPACITY
    }
}
