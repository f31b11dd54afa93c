//! # Free-Block Index
//!
//! An address-ordered, circular doubly linked list of free-block head
//! frames. The links are intrusive: they live in the `prev`/`next` fields of
//! the head frames' descriptors, expressed as table indices rather than
//! pointers. The single sentinel node is the [`FreeBlockIndex`] itself; the
//! pseudo-index [`FREE_LIST_SENTINEL`](crate::descriptor::FREE_LIST_SENTINEL)
//! marks links that point at it.
//!
//! The index also caches the total number of free frames, so exhaustion can
//! be ruled out in O(1) before any scan.
//!
//! All link operations are O(1); they take the [`FrameTable`] by reference
//! because the links live in the descriptors while the list head lives here.

use crate::descriptor::{FREE_LIST_SENTINEL, FrameTable};

/// The sentinel and bookkeeping of the free-block list.
///
/// # Invariants
/// Between calls into the allocator:
/// - traversal from the sentinel yields strictly ascending frame numbers,
/// - no two entries are address-adjacent (they would have been merged),
/// - `free_frames` equals the sum of all linked heads' run lengths.
pub struct FreeBlockIndex {
    /// First entry, or the sentinel value when the list is empty.
    head: usize,
    /// Last entry, or the sentinel value when the list is empty.
    tail: usize,
    /// Cached sum of the run lengths of all entries.
    free_frames: u64,
}

impl FreeBlockIndex {
    /// An empty index: the sentinel links to itself, nothing is free.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            head: FREE_LIST_SENTINEL,
            tail: FREE_LIST_SENTINEL,
            free_frames: 0,
        }
    }

    /// Total free frames across all entries; O(1).
    #[inline]
    #[must_use]
    pub const fn free_frames(&self) -> u64 {
        self.free_frames
    }

    #[inline]
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.head == FREE_LIST_SENTINEL
    }

    /// The lowest-address entry, if any.
    #[inline]
    #[must_use]
    pub const fn first(&self) -> Option<usize> {
        entry(self.head)
    }

    /// The highest-address entry, if any.
    #[inline]
    #[must_use]
    pub const fn last(&self) -> Option<usize> {
        entry(self.tail)
    }

    /// The entry after `index`, or `None` when `index` is the last.
    #[inline]
    #[must_use]
    pub fn next_entry(&self, table: &FrameTable, index: usize) -> Option<usize> {
        entry(table.descriptor(index).next)
    }

    /// The entry before `index`, or `None` when `index` is the first.
    #[inline]
    #[must_use]
    pub fn prev_entry(&self, table: &FrameTable, index: usize) -> Option<usize> {
        entry(table.descriptor(index).prev)
    }

    /// Link `index` immediately after `after`; `None` links at the front.
    ///
    /// The caller is responsible for picking a position that keeps the list
    /// address-ascending.
    pub(crate) fn insert_after(&mut self, table: &mut FrameTable, after: Option<usize>, index: usize) {
        let prev = after.unwrap_or(FREE_LIST_SENTINEL);
        let next = self.next_of(table, prev);
        {
            let d = table.descriptor_mut(index);
            d.prev = prev;
            d.next = next;
        }
        self.set_next(table, prev, index);
        self.set_prev(table, next, index);
    }

    /// Link `index` at the current tail of the list.
    pub(crate) fn push_back(&mut self, table: &mut FrameTable, index: usize) {
        let tail = entry(self.tail);
        self.insert_after(table, tail, index);
    }

    /// Unlink `index` from the list and reset its link fields.
    pub(crate) fn unlink(&mut self, table: &mut FrameTable, index: usize) {
        let (prev, next) = {
            let d = table.descriptor(index);
            (d.prev, d.next)
        };
        self.set_next(table, prev, next);
        self.set_prev(table, next, prev);
        let d = table.descriptor_mut(index);
        d.prev = FREE_LIST_SENTINEL;
        d.next = FREE_LIST_SENTINEL;
    }

    /// Account for `count` frames entering the free pool.
    pub(crate) const fn add_free(&mut self, count: u64) {
        self.free_frames += count;
    }

    /// Account for `count` frames leaving the free pool.
    pub(crate) const fn remove_free(&mut self, count: u64) {
        self.free_frames -= count;
    }

    fn next_of(&self, table: &FrameTable, index: usize) -> usize {
        if index == FREE_LIST_SENTINEL {
            self.head
        } else {
            table.descriptor(index).next
        }
    }

    fn set_next(&mut self, table: &mut FrameTable, index: usize, value: usize) {
        if index == FREE_LIST_SENTINEL {
            self.head = value;
        } else {
            table.descriptor_mut(index).next = value;
        }
    }

    fn set_prev(&mut self, table: &mut FrameTable, index: usize, value: usize) {
        if index == FREE_LIST_SENTINEL {
            self.tail = value;
        } else {
            table.descriptor_mut(index).prev = value;
        }
    }
}

impl Default for FreeBlockIndex {
    fn default() -> Self {
        Self::new()
    }
}

/// Map the sentinel pseudo-index to `None`.
#[inline]
const fn entry(index: usize) -> Option<usize> {
    if index == FREE_LIST_SENTINEL {
        None
    } else {
        Some(index)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn collect(index: &FreeBlockIndex, table: &FrameTable) -> Vec<usize> {
        let mut out = Vec::new();
        let mut cur = index.first();
        while let Some(i) = cur {
            out.push(i);
            cur = index.next_entry(table, i);
        }
        out
    }

    fn collect_rev(index: &FreeBlockIndex, table: &FrameTable) -> Vec<usize> {
        let mut out = Vec::new();
        let mut cur = index.last();
        while let Some(i) = cur {
            out.push(i);
            cur = index.prev_entry(table, i);
        }
        out
    }

    #[test]
    fn empty_index() {
        let index = FreeBlockIndex::new();
        assert!(index.is_empty());
        assert_eq!(index.first(), None);
        assert_eq!(index.last(), None);
        assert_eq!(index.free_frames(), 0);
    }

    #[test]
    fn push_back_preserves_order() {
        let mut table = FrameTable::new(16);
        let mut index = FreeBlockIndex::new();
        for i in [2, 5, 11] {
            index.push_back(&mut table, i);
        }
        assert_eq!(collect(&index, &table), [2, 5, 11]);
        assert_eq!(collect_rev(&index, &table), [11, 5, 2]);
    }

    #[test]
    fn insert_after_front_and_middle() {
        let mut table = FrameTable::new(16);
        let mut index = FreeBlockIndex::new();
        index.insert_after(&mut table, None, 8);
        index.insert_after(&mut table, None, 1);
        index.insert_after(&mut table, Some(1), 4);
        assert_eq!(collect(&index, &table), [1, 4, 8]);
        assert_eq!(collect_rev(&index, &table), [8, 4, 1]);
    }

    #[test]
    fn unlink_head_middle_tail() {
        let mut table = FrameTable::new(16);
        let mut index = FreeBlockIndex::new();
        for i in [1, 4, 8, 12] {
            index.push_back(&mut table, i);
        }

        index.unlink(&mut table, 4);
        assert_eq!(collect(&index, &table), [1, 8, 12]);

        index.unlink(&mut table, 1);
        assert_eq!(collect(&index, &table), [8, 12]);

        index.unlink(&mut table, 12);
        assert_eq!(collect(&index, &table), [8]);
        assert_eq!(collect_rev(&index, &table), [8]);

        index.unlink(&mut table, 8);
        assert!(index.is_empty());
    }

    #[test]
    fn frame_accounting() {
        let mut index = FreeBlockIndex::new();
        index.add_free(7);
        index.add_free(3);
        index.remove_free(4);
        assert_eq!(index.free_frames(), 6);
    }
}
