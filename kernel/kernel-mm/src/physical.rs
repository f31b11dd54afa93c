use alloc::vec::Vec;
use kernel_addr::{Frame, FrameRange, PageSize, PhysicalAddress, Size4K};
use kernel_frames::check::{CheckError, FreeListReport};
use kernel_frames::{FirstFitAllocator, FrameAllocator};
use kernel_info::boot::BootMemoryMap;
use kernel_info::memory::MAX_PHYS_BYTES;
use kernel_sync::SpinLock;
use log::{debug, info};

/// Why physical-memory bring-up failed. Both variants abort startup.
#[derive(Debug, thiserror::Error)]
pub enum PhysicalMemoryError {
    /// After clipping against the kernel image and the physical address
    /// limit, the boot memory map left nothing to allocate from.
    #[error("the boot memory map reports no usable frames")]
    NoUsableMemory,

    /// The freshly seeded allocator failed its invariant check; its core
    /// data structure is already inconsistent.
    #[error("frame allocator failed the boot-time consistency check: {0}")]
    Inconsistent(#[from] CheckError),
}

/// The kernel's physical memory manager.
///
/// Constructed once during bootstrap and handed to the memory-consuming
/// subsystems (page-table setup, kernel heap, address spaces). All calls are
/// serialized through an internal spin lock.
pub struct PhysicalMemory {
    allocator: SpinLock<FirstFitAllocator>,
}

impl PhysicalMemory {
    /// Bring up the frame allocator from the boot memory map.
    ///
    /// Usable ranges are clipped to `[kernel_end, MAX_PHYS_BYTES)` — the
    /// frames backing the kernel image stay reserved forever — aligned
    /// inward to frame boundaries, sorted ascending, coalesced where they
    /// touch or overlap, and seeded one by one. A final invariant-checker
    /// pass validates the result.
    ///
    /// # Errors
    /// [`PhysicalMemoryError::NoUsableMemory`] when nothing survives the
    /// clipping; [`PhysicalMemoryError::Inconsistent`] when the seeded free
    /// list fails validation.
    pub fn init(
        map: &BootMemoryMap,
        kernel_end: PhysicalAddress,
    ) -> Result<Self, PhysicalMemoryError> {
        let floor = kernel_end.align_up::<Size4K>();

        // Clip each usable range and convert to whole frames. The firmware
        // map is not guaranteed to be sorted; the seeding contract is.
        let mut regions: Vec<(u64, u64)> = Vec::new();
        for range in map.usable() {
            let start = PhysicalAddress::new(range.start().as_u64().max(floor.as_u64()))
                .align_up::<Size4K>();
            let end = PhysicalAddress::new(range.end().as_u64().min(MAX_PHYS_BYTES))
                .align_down::<Size4K>();
            if end > start {
                regions.push((
                    Frame::containing(start).number(),
                    Frame::containing(end).number(),
                ));
            }
        }
        regions.sort_unstable();
        if regions.is_empty() {
            return Err(PhysicalMemoryError::NoUsableMemory);
        }

        // Firmware maps may report usable ranges that touch or overlap once
        // clipped and aligned; the seeding contract wants disjoint blocks,
        // so fold those together before handing them over.
        let mut merged: Vec<(u64, u64)> = Vec::with_capacity(regions.len());
        for (start, end) in regions {
            match merged.last_mut() {
                Some((_, last_end)) if start <= *last_end => {
                    *last_end = (*last_end).max(end);
                }
                _ => merged.push((start, end)),
            }
        }
        let regions = merged;

        // The descriptor table covers everything up to the highest usable
        // frame; frames outside the seeded ranges stay reserved. The clip
        // against `MAX_PHYS_BYTES` keeps the count within `usize`.
        let frame_count = regions.iter().map(|&(_, end)| end).max().unwrap_or(0);
        let mut allocator = FirstFitAllocator::with_capacity(frame_count as usize);

        for &(start, end) in &regions {
            debug!(
                "seeding frames {start}..{end} ({} KiB)",
                (end - start) * Size4K::SIZE / 1024
            );
            allocator.seed_region(Frame::from_number(start), end - start);
        }

        let report = allocator.self_check()?;
        info!(
            "physical memory: {} free frames in {} blocks ({} KiB) via {}",
            report.free_frames,
            report.blocks,
            report.free_frames * Size4K::SIZE / 1024,
            allocator.name(),
        );

        Ok(Self {
            allocator: SpinLock::new(allocator),
        })
    }

    /// Allocate `count` contiguous frames; `None` means no block is large
    /// enough right now.
    #[must_use]
    pub fn allocate(&self, count: u64) -> Option<FrameRange> {
        self.allocator.with_lock(|a| a.allocate(count))
    }

    /// Return a range previously handed out by [`allocate`](Self::allocate).
    pub fn release(&self, range: FrameRange) {
        self.allocator.with_lock(|a| a.release(range));
    }

    /// Total free frames; O(1).
    #[must_use]
    pub fn free_frame_count(&self) -> u64 {
        self.allocator.with_lock(|a| a.free_frame_count())
    }

    /// Re-validate the allocator's structural invariants (diagnostics only).
    ///
    /// # Errors
    /// Returns the first violated invariant; the allocator must not be used
    /// further if this fails.
    pub fn verify(&self) -> Result<FreeListReport, CheckError> {
        self.allocator.with_lock(|a| a.self_check())
    }
}
