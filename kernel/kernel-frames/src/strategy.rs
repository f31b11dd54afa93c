//! # Allocator Strategy Interface
//!
//! The capability surface the kernel is built against. The first-fit
//! implementation in [`first_fit`](crate::first_fit) is the one specified
//! here; the trait exists so an alternate strategy (best-fit, buddy, …)
//! could be substituted without touching call sites.

use crate::check::{CheckError, FreeListReport};
use kernel_addr::{Frame, FrameRange};

/// A physical frame allocation strategy.
///
/// # Calling contract
/// The allocator is non-reentrant and owns no synchronization; the caller
/// serializes all calls (see `kernel-mm`). All operations complete or fail
/// synchronously.
pub trait FrameAllocator {
    /// Short strategy name for boot diagnostics.
    fn name(&self) -> &'static str;

    /// An allocator managing frames `[0, frame_count)`, all initially
    /// reserved. Usable ranges are handed over with
    /// [`seed_region`](Self::seed_region) before allocation begins.
    #[must_use]
    fn with_capacity(frame_count: usize) -> Self
    where
        Self: Sized;

    /// Hand a contiguous run of currently-reserved frames to the allocator.
    ///
    /// Called once per disjoint usable range during bootstrap, in strictly
    /// ascending base-address order. That ordering is a contract with the
    /// memory-discovery caller, not enforced here; seeding out of order
    /// breaks the index's address ordering.
    ///
    /// # Panics
    /// Panics if `count` is zero or any frame in the run is not reserved.
    fn seed_region(&mut self, base: Frame, count: u64);

    /// Allocate `count` contiguous frames.
    ///
    /// Returns `None` — with no state change — when no free block is large
    /// enough. Exhaustion is an expected outcome, not an error.
    ///
    /// # Panics
    /// Panics if `count` is zero.
    #[must_use]
    fn allocate(&mut self, count: u64) -> Option<FrameRange>;

    /// Return a range previously handed out by [`allocate`](Self::allocate).
    ///
    /// # Panics
    /// Panics if the range is empty, extends past the table, or contains a
    /// frame that is reserved or already free — double and foreign releases
    /// are programming errors and fatal.
    fn release(&mut self, range: FrameRange);

    /// Total free frames; O(1).
    #[must_use]
    fn free_frame_count(&self) -> u64;

    /// Re-derive the free-frame total from the index and validate the
    /// structural invariants. Diagnostic pass, not part of the steady-state
    /// allocation path.
    ///
    /// # Errors
    /// Returns the first violated invariant. A failed check means the
    /// allocator's bookkeeping is corrupt and it must not continue serving
    /// allocations.
    fn self_check(&self) -> Result<FreeListReport, CheckError>;
}
