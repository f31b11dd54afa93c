//! # Frame Descriptor Table
//!
//! One [`FrameDescriptor`] per physical page frame, addressable by frame
//! number. The table is pure data: it exposes state predicates and
//! index↔address conversion, but no allocation logic. The free-block index
//! threads its intrusive links through the `prev`/`next` fields of the
//! descriptors of *head* frames.

use alloc::boxed::Box;
use alloc::vec;
use bitfield_struct::bitfield;
use kernel_addr::{Frame, FrameRange};

/// Pseudo-index standing in for the free list's sentinel node.
///
/// The sentinel itself is not a descriptor; its `prev`/`next` live in
/// [`FreeBlockIndex`](crate::FreeBlockIndex). Links pointing at the sentinel
/// carry this value instead of a table index.
pub(crate) const FREE_LIST_SENTINEL: usize = usize::MAX;

/// Per-frame state bits.
///
/// Two independent facets describe a frame:
/// - `reserved`: permanently excluded from the allocator (kernel image,
///   firmware ranges). Set for every frame at table construction, cleared
///   once when a usable region is seeded, never set again.
/// - `head`: the frame currently leads a free contiguous run. Only head
///   frames carry a valid run length and free-list membership.
#[bitfield(u8)]
pub struct FrameFlags {
    pub reserved: bool,
    pub head: bool,
    #[bits(6)]
    __: u8,
}

/// Descriptor of one physical page frame.
///
/// Descriptors live for the lifetime of the kernel inside the
/// [`FrameTable`]; they are never allocated or freed individually.
#[derive(Copy, Clone, Debug)]
pub struct FrameDescriptor {
    /// How many mappings point at this frame. Owned by higher-level mapping
    /// code; the allocator only zeroes it on transitions into and out of the
    /// free pool.
    pub(crate) ref_count: u32,
    /// State bits, see [`FrameFlags`].
    pub(crate) flags: FrameFlags,
    /// Number of contiguous free frames starting here. Valid only while
    /// `flags.head()` is set.
    pub(crate) run_length: usize,
    /// Free-list predecessor; [`FREE_LIST_SENTINEL`] when this head is the
    /// first entry. Meaningful only while `flags.head()` is set.
    pub(crate) prev: usize,
    /// Free-list successor; [`FREE_LIST_SENTINEL`] when this head is the
    /// last entry. Meaningful only while `flags.head()` is set.
    pub(crate) next: usize,
}

impl FrameDescriptor {
    /// The state every descriptor starts in: reserved, unlinked.
    const fn start_reserved() -> Self {
        Self {
            ref_count: 0,
            flags: FrameFlags::new().with_reserved(true),
            run_length: 0,
            prev: FREE_LIST_SENTINEL,
            next: FREE_LIST_SENTINEL,
        }
    }

    /// Whether the frame is permanently excluded from allocation.
    #[inline]
    #[must_use]
    pub const fn is_reserved(&self) -> bool {
        self.flags.reserved()
    }

    /// Whether the frame currently leads a free contiguous run.
    #[inline]
    #[must_use]
    pub const fn is_head(&self) -> bool {
        self.flags.head()
    }

    /// The length of the free run led by this frame; meaningless unless
    /// [`is_head`](Self::is_head) holds.
    #[inline]
    #[must_use]
    pub const fn run_length(&self) -> usize {
        self.run_length
    }

    #[inline]
    #[must_use]
    pub const fn reference_count(&self) -> u32 {
        self.ref_count
    }

    /// Set the mapping count. Owned by the paging layer; the allocator only
    /// zeroes it when a frame enters or leaves the free pool.
    #[inline]
    pub const fn set_reference_count(&mut self, count: u32) {
        self.ref_count = count;
    }

    /// Reset to a plain free non-head frame: flags cleared, no references.
    pub(crate) const fn reset(&mut self) {
        self.flags = FrameFlags::new();
        self.ref_count = 0;
        self.run_length = 0;
    }
}

/// The frame descriptor table, covering frames `[0, len)`.
///
/// Constructed once during bootstrap with every entry `reserved`; the
/// allocator strategy clears `reserved` when usable regions are seeded.
pub struct FrameTable {
    frames: Box<[FrameDescriptor]>,
}

impl FrameTable {
    /// A table for `frame_count` frames, all marked `reserved`.
    #[must_use]
    pub fn new(frame_count: usize) -> Self {
        // usize::MAX is the sentinel pseudo-index and must stay unused.
        assert!(frame_count < FREE_LIST_SENTINEL, "frame count out of range");
        Self {
            frames: vec![FrameDescriptor::start_reserved(); frame_count].into_boxed_slice(),
        }
    }

    /// Number of frames covered by the table.
    #[inline]
    #[must_use]
    pub const fn len(&self) -> usize {
        self.frames.len()
    }

    #[inline]
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    /// The table index of `frame`.
    ///
    /// # Panics
    /// Panics if the frame lies outside the table; out-of-range frames are a
    /// caller bug and fatal.
    #[inline]
    #[must_use]
    pub fn slot(&self, frame: Frame) -> usize {
        let Ok(index) = usize::try_from(frame.number()) else {
            panic!("frame {frame} outside the descriptor table");
        };
        assert!(
            index < self.frames.len(),
            "frame {frame} outside the descriptor table"
        );
        index
    }

    /// The frame at table index `index`.
    #[inline]
    #[must_use]
    pub fn frame(&self, index: usize) -> Frame {
        debug_assert!(index < self.frames.len());
        Frame::from_number(index as u64)
    }

    /// Whether the whole of `range` lies inside the table.
    #[inline]
    #[must_use]
    pub fn contains(&self, range: FrameRange) -> bool {
        range.end().number() <= self.frames.len() as u64
    }

    #[inline]
    #[must_use]
    pub fn descriptor(&self, index: usize) -> &FrameDescriptor {
        &self.frames[index]
    }

    #[inline]
    pub fn descriptor_mut(&mut self, index: usize) -> &mut FrameDescriptor {
        &mut self.frames[index]
    }

    /// Iterate over all descriptors in frame order.
    pub fn descriptors(&self) -> impl Iterator<Item = &FrameDescriptor> {
        self.frames.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kernel_addr::Frame;

    #[test]
    fn fresh_table_is_fully_reserved() {
        let table = FrameTable::new(8);
        assert_eq!(table.len(), 8);
        assert!(table.descriptors().all(FrameDescriptor::is_reserved));
        assert!(!table.descriptors().any(|d| d.is_head()));
    }

    #[test]
    fn slot_and_frame_are_inverse() {
        let table = FrameTable::new(16);
        let frame = Frame::from_number(7);
        assert_eq!(table.frame(table.slot(frame)), frame);
    }

    #[test]
    #[should_panic(expected = "outside the descriptor table")]
    fn out_of_range_slot_panics() {
        let table = FrameTable::new(4);
        let _ = table.slot(Frame::from_number(4));
    }

    #[test]
    fn range_containment() {
        let table = FrameTable::new(10);
        assert!(table.contains(FrameRange::new(Frame::from_number(0), 10)));
        assert!(table.contains(FrameRange::new(Frame::from_number(9), 1)));
        assert!(!table.contains(FrameRange::new(Frame::from_number(9), 2)));
    }

    #[test]
    fn reset_clears_state() {
        let mut d = FrameDescriptor::start_reserved();
        d.ref_count = 3;
        d.run_length = 5;
        d.reset();
        assert!(!d.is_reserved());
        assert!(!d.is_head());
        assert_eq!(d.reference_count(), 0);
        assert_eq!(d.run_length(), 0);
    }
}
