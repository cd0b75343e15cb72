//! `PageIndex` — ordered map from page base address to leaf index.
//!
//! Deallocation, extend and shrink only receive a pointer; this index maps
//! it back to the segment owning the enclosing page in O(log P). Entries
//! are non-owning: a page is indexed from the moment it materializes until
//! it empties, so every key is live by construction.

use std::collections::BTreeMap;

#[derive(Default)]
pub(crate) struct PageIndex {
    map: BTreeMap<usize, usize>,
}

impl PageIndex {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Registers the page starting at `base` as owned by leaf `leaf`.
    pub(crate) fn insert(&mut self, base: usize, leaf: usize) {
        let prev = self.map.insert(base, leaf);
        debug_assert!(prev.is_none(), "page base indexed twice");
    }

    pub(crate) fn remove(&mut self, base: usize) {
        let prev = self.map.remove(&base);
        debug_assert!(prev.is_some(), "removed a page that was never indexed");
    }

    pub(crate) fn clear(&mut self) {
        self.map.clear();
    }

    /// Last entry whose base is `<= addr`: the only page that can contain
    /// `addr`. The caller still has to bounds-check against the page size.
    pub(crate) fn lookup(&self, addr: usize) -> Option<(usize, usize)> {
        self.map.range(..=addr).next_back().map(|(&b, &l)| (b, l))
    }

    pub(crate) fn len(&self) -> usize {
        self.map.len()
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    pub(crate) fn iter(&self) -> impl Iterator<Item = (usize, usize)> + '_ {
        self.map.iter().map(|(&b, &l)| (b, l))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup_floors_to_page_base() {
        let mut idx = PageIndex::new();
        idx.insert(1000, 4);
        idx.insert(3000, 5);
        idx.insert(2000, 7);

        assert_eq!(idx.lookup(999), None);
        assert_eq!(idx.lookup(1000), Some((1000, 4)));
        assert_eq!(idx.lookup(1999), Some((1000, 4)));
        assert_eq!(idx.lookup(2500), Some((2000, 7)));
        assert_eq!(idx.lookup(usize::MAX), Some((3000, 5)));
    }

    #[test]
    fn test_insert_remove_roundtrip() {
        let mut idx = PageIndex::new();
        assert!(idx.is_empty());
        idx.insert(4096, 2);
        idx.insert(8192, 3);
        assert_eq!(idx.len(), 2);

        idx.remove(4096);
        assert_eq!(idx.lookup(5000), None);
        assert_eq!(idx.lookup(9000), Some((8192, 3)));

        idx.clear();
        assert!(idx.is_empty());
    }

    #[test]
    fn test_iter_is_ordered() {
        let mut idx = PageIndex::new();
        idx.insert(300, 1);
        idx.insert(100, 2);
        idx.insert(200, 3);
        let keys: Vec<usize> = idx.iter().map(|(b, _)| b).collect();
        assert_eq!(keys, vec![100, 200, 300]);
    }
}
