//! # First-Fit Frame Allocation
//!
//! The default allocation strategy: scan the address-ordered free-block
//! index from the lowest address and take the first block large enough.
//! Oversize blocks are split; released runs are merged with both neighbors.
//!
//! First fit deliberately ignores tighter-fitting blocks further up — the
//! scan stops at the first qualifying entry. That trades external
//! fragmentation for a simple, fast scan.

use crate::check::{CheckError, FreeListReport, verify};
use crate::descriptor::FrameTable;
use crate::index::FreeBlockIndex;
use crate::strategy::FrameAllocator;
use kernel_addr::{Frame, FrameRange};

/// The first-fit allocator: a [`FrameTable`] plus the [`FreeBlockIndex`]
/// threaded through it.
///
/// Frames cycle between reserved (never allocatable), free-head, free
/// non-head and allocated under [`seed_region`](FrameAllocator::seed_region),
/// [`allocate`](FrameAllocator::allocate) and
/// [`release`](FrameAllocator::release); see the state rules on each method.
pub struct FirstFitAllocator {
    table: FrameTable,
    index: FreeBlockIndex,
}

impl FirstFitAllocator {
    /// The descriptor table, for diagnostics and higher-level bookkeeping.
    #[inline]
    #[must_use]
    pub const fn table(&self) -> &FrameTable {
        &self.table
    }

    /// The free blocks currently in the index, in ascending address order.
    pub fn free_blocks(&self) -> FreeBlocks<'_> {
        FreeBlocks {
            allocator: self,
            cursor: self.index.first(),
        }
    }
}

impl FrameAllocator for FirstFitAllocator {
    fn name(&self) -> &'static str {
        "first-fit"
    }

    fn with_capacity(frame_count: usize) -> Self {
        Self {
            table: FrameTable::new(frame_count),
            index: FreeBlockIndex::new(),
        }
    }

    fn seed_region(&mut self, base: Frame, count: u64) {
        assert!(count > 0, "cannot seed an empty region");
        let run = FrameRange::new(base, count);
        assert!(
            self.table.contains(run),
            "seed region {run:?} exceeds the descriptor table"
        );

        let head = self.table.slot(base);
        let end = head + count as usize;
        for frame in head..end {
            let descriptor = self.table.descriptor_mut(frame);
            assert!(
                descriptor.is_reserved(),
                "seeding frame {frame} which is already in service"
            );
            descriptor.reset();
        }

        // The lowest frame becomes the head of one new free block covering
        // the whole region.
        let descriptor = self.table.descriptor_mut(head);
        descriptor.run_length = count as usize;
        descriptor.flags.set_head(true);

        // Regions arrive in ascending address order (caller contract), so
        // the new head belongs at the tail.
        self.index.push_back(&mut self.table, head);
        self.index.add_free(count);
    }

    fn allocate(&mut self, count: u64) -> Option<FrameRange> {
        assert!(count > 0, "cannot allocate zero frames");
        if count > self.index.free_frames() {
            return None;
        }
        let wanted = count as usize;

        // First fit: the lowest-address block that is large enough wins,
        // even if a later block would fit more tightly.
        let mut cursor = self.index.first();
        let chosen = loop {
            let head = cursor?;
            if self.table.descriptor(head).run_length() >= wanted {
                break head;
            }
            cursor = self.index.next_entry(&self.table, head);
        };

        let run = self.table.descriptor(chosen).run_length();
        if run > wanted {
            // Split: the remainder becomes a new head right after the
            // chosen entry, which keeps the index address-ordered since
            // `chosen + wanted` lies between `chosen` and its successor.
            let remainder = chosen + wanted;
            {
                let descriptor = self.table.descriptor_mut(remainder);
                descriptor.run_length = run - wanted;
                descriptor.flags.set_head(true);
            }
            self.index
                .insert_after(&mut self.table, Some(chosen), remainder);
        }

        self.index.unlink(&mut self.table, chosen);
        {
            let descriptor = self.table.descriptor_mut(chosen);
            descriptor.flags.set_head(false);
            descriptor.run_length = 0;
        }
        self.index.remove_free(count);

        Some(FrameRange::new(self.table.frame(chosen), count))
    }

    fn release(&mut self, range: FrameRange) {
        assert!(!range.is_empty(), "cannot release an empty range");
        assert!(
            self.table.contains(range),
            "released range {range:?} exceeds the descriptor table"
        );

        let base = self.table.slot(range.start());
        let len = range.count() as usize;
        for frame in base..base + len {
            let descriptor = self.table.descriptor_mut(frame);
            assert!(
                !descriptor.is_reserved(),
                "releasing reserved frame {frame}"
            );
            assert!(
                !descriptor.is_head(),
                "double release of frame {frame}"
            );
            descriptor.reset();
        }

        // The released run becomes a head; merging below may revoke that.
        {
            let descriptor = self.table.descriptor_mut(base);
            descriptor.run_length = len;
            descriptor.flags.set_head(true);
        }

        // Insertion point: after the last entry wholly below `base`, at the
        // front when no such entry exists.
        let mut after = None;
        let mut cursor = self.index.first();
        while let Some(head) = cursor {
            if head + self.table.descriptor(head).run_length() <= base {
                after = Some(head);
                cursor = self.index.next_entry(&self.table, head);
            } else {
                break;
            }
        }
        self.index.insert_after(&mut self.table, after, base);

        // Forward merge: absorb the successor if it starts exactly at the
        // end of the released run.
        if let Some(next) = self.index.next_entry(&self.table, base) {
            if base + self.table.descriptor(base).run_length() == next {
                let absorbed = self.table.descriptor(next).run_length();
                self.index.unlink(&mut self.table, next);
                {
                    let descriptor = self.table.descriptor_mut(next);
                    descriptor.flags.set_head(false);
                    descriptor.run_length = 0;
                }
                self.table.descriptor_mut(base).run_length += absorbed;
            }
        }

        // Backward merge: if the predecessor ends exactly at `base`, it
        // absorbs the whole run — including anything the forward merge just
        // added — and `base` stops being a head.
        if let Some(prev) = self.index.prev_entry(&self.table, base) {
            if prev + self.table.descriptor(prev).run_length() == base {
                let absorbed = self.table.descriptor(base).run_length();
                self.index.unlink(&mut self.table, base);
                {
                    let descriptor = self.table.descriptor_mut(base);
                    descriptor.flags.set_head(false);
                    descriptor.run_length = 0;
                }
                self.table.descriptor_mut(prev).run_length += absorbed;
            }
        }

        self.index.add_free(range.count());
    }

    fn free_frame_count(&self) -> u64 {
        self.index.free_frames()
    }

    fn self_check(&self) -> Result<FreeListReport, CheckError> {
        verify(&self.table, &self.index)
    }
}

/// Iterator over the free blocks of a [`FirstFitAllocator`], lowest address
/// first.
pub struct FreeBlocks<'a> {
    allocator: &'a FirstFitAllocator,
    cursor: Option<usize>,
}

impl Iterator for FreeBlocks<'_> {
    type Item = FrameRange;

    fn next(&mut self) -> Option<Self::Item> {
        let head = self.cursor?;
        let table = &self.allocator.table;
        self.cursor = self.allocator.index.next_entry(table, head);
        Some(FrameRange::new(
            table.frame(head),
            table.descriptor(head).run_length() as u64,
        ))
    }
}
