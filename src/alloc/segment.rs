//! `Segment` — a tree slot owning at most one page.
//!
//! Leaf segments lazily materialize their page on the first allocation and
//! release it as soon as it is empty again. Internal tree nodes are also
//! segments; their page stays absent and only the cached `longest_free`
//! value is meaningful.

use core::ptr::NonNull;
use std::alloc::{alloc, dealloc, handle_alloc_error, Layout};

use super::page::Page;

pub(crate) struct Segment<T, const W: usize> {
    page: Option<NonNull<Page<T, W>>>,
    /// Longest free run of the owned page, saturated (see
    /// [`super::MAX_GROUP_SIZE`]); the full capacity while no page exists.
    longest_free: u32,
}

impl<T, const W: usize> Default for Segment<T, W> {
    fn default() -> Self {
        Self {
            page: None,
            longest_free: Self::CAPACITY as u32,
        }
    }
}

impl<T, const W: usize> Segment<T, W> {
    pub(crate) const CAPACITY: usize = 64 * W;

    #[inline]
    pub(crate) fn longest_free(&self) -> u32 {
        self.longest_free
    }

    #[inline]
    pub(crate) fn set_longest_free(&mut self, lf: u32) {
        self.longest_free = lf;
    }

    #[inline]
    pub(crate) fn has_page(&self) -> bool {
        self.page.is_some()
    }

    pub(crate) fn page(&self) -> Option<&Page<T, W>> {
        self.page.map(|p| unsafe { p.as_ref() })
    }

    /// Base address of the owned page, the key it is indexed under.
    pub(crate) fn page_base(&self) -> Option<usize> {
        self.page.map(|p| unsafe { p.as_ref() }.base_addr())
    }

    pub(crate) fn num_allocated(&self) -> usize {
        self.page.map_or(0, |p| unsafe { p.as_ref() }.num_allocated())
    }

    /// Allocates `n` slots, materializing the page on first use. `None`
    /// when the cached run is too short.
    pub(crate) fn allocate(&mut self, n: usize) -> Option<(NonNull<T>, isize)> {
        if n > self.longest_free as usize {
            return None;
        }
        let mut page = match self.page {
            Some(p) => p,
            None => {
                let p = Self::new_page();
                self.page = Some(p);
                p
            }
        };
        Some(unsafe { page.as_mut() }.allocate(n, &mut self.longest_free))
    }

    pub(crate) fn extend(
        &mut self,
        start: usize,
        old_sz: usize,
        new_sz: usize,
        prefer_after: bool,
    ) -> Option<(NonNull<T>, isize)> {
        debug_assert!(self.page.is_some(), "extend on a segment without a page");
        let mut page = unsafe { self.page.unwrap_unchecked() };
        unsafe { page.as_mut() }.extend(start, old_sz, new_sz, prefer_after, &mut self.longest_free)
    }

    pub(crate) fn shrink(
        &mut self,
        start: usize,
        old_sz: usize,
        new_sz: usize,
    ) -> (NonNull<T>, isize) {
        debug_assert!(self.page.is_some(), "shrink on a segment without a page");
        let mut page = unsafe { self.page.unwrap_unchecked() };
        unsafe { page.as_mut() }.shrink(start, old_sz, new_sz, &mut self.longest_free)
    }

    /// Frees `n` slots at `start`, releasing the page when it empties.
    pub(crate) fn free(&mut self, start: usize, n: usize) -> isize {
        debug_assert!(self.page.is_some(), "free on a segment without a page");
        let mut page = unsafe { self.page.unwrap_unchecked() };
        let diff = unsafe { page.as_mut() }.free(start, n, &mut self.longest_free);
        if unsafe { page.as_ref() }.num_free() == Self::CAPACITY {
            self.release_page();
        }
        diff
    }

    fn new_page() -> NonNull<Page<T, W>> {
        let layout = Layout::new::<Page<T, W>>();
        unsafe {
            let raw = alloc(layout).cast::<Page<T, W>>();
            let Some(page) = NonNull::new(raw) else {
                handle_alloc_error(layout);
            };
            Page::init(page);
            page
        }
    }

    fn release_page(&mut self) {
        if let Some(page) = self.page.take() {
            debug_assert_eq!(unsafe { page.as_ref() }.num_free(), Self::CAPACITY);
            unsafe { dealloc(page.as_ptr().cast(), Layout::new::<Page<T, W>>()) };
            self.longest_free = Self::CAPACITY as u32;
        }
    }
}

impl<T, const W: usize> Drop for Segment<T, W> {
    fn drop(&mut self) {
        self.release_page();
    }
}
