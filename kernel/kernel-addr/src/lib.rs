//! # Physical Addresses and Page Frames
//!
//! Strongly typed wrappers for raw physical addresses and page frame numbers
//! used by the physical memory manager.
//!
//! ## Overview
//!
//! The allocation granularity of the kernel is a fixed-size page *frame*.
//! Rather than passing raw `u64` values around, this crate provides a small
//! set of zero-cost types that keep byte addresses and frame numbers apart at
//! compile time:
//!
//! | Type | Meaning |
//! |-------|----------|
//! | [`PhysicalAddress`] | A raw 64-bit physical byte address. |
//! | [`Frame`] | A physical frame number (address divided by the frame size). |
//! | [`FrameRange`] | A contiguous run of frames, `[start, start + count)`. |
//!
//! ## Page Sizes
//!
//! The frame size is a power-of-two constant fixed by the architecture; the
//! allocator itself is agnostic to its value beyond address arithmetic. The
//! [`PageSize`] marker trait carries [`SIZE`](PageSize::SIZE) and
//! [`SHIFT`](PageSize::SHIFT); [`Size4K`] is the base granularity.
//!
//! ## Typical Usage
//!
//! ```rust
//! # use kernel_addr::*;
//! let pa = PhysicalAddress::new(0x0030_1234);
//! let frame = Frame::containing(pa);
//! assert_eq!(frame.number(), 0x301);
//! assert_eq!(frame.base().as_u64(), 0x0030_1000);
//!
//! let run = FrameRange::new(frame, 3);
//! assert_eq!(run.end().number(), 0x304);
//! assert!(run.contains(Frame::from_number(0x302)));
//! ```

#![cfg_attr(not(any(test, doctest)), no_std)]

use core::fmt;
use core::hash::Hash;
use core::ops::{Add, AddAssign};

/// Sealed trait pattern to restrict `PageSize` impls to our markers.
mod sealed {
    pub trait Sealed {}
}

/// Marker trait for supported page sizes.
pub trait PageSize:
    sealed::Sealed + Clone + Copy + Eq + PartialEq + Ord + PartialOrd + Hash + fmt::Debug
{
    /// Page size in bytes (power of two).
    const SIZE: u64;
    /// log2(SIZE), i.e., number of low bits used for the in-page offset.
    const SHIFT: u32;

    fn as_str() -> &'static str;
}

/// 4 KiB page (4096 bytes); the frame granularity of the allocator.
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct Size4K;
impl sealed::Sealed for Size4K {}
impl PageSize for Size4K {
    const SIZE: u64 = 4096;
    const SHIFT: u32 = 12;

    fn as_str() -> &'static str {
        "4K"
    }
}

impl fmt::Debug for Size4K {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(Self::as_str())
    }
}

/// Physical memory address.
///
/// A thin `#[repr(transparent)]` wrapper around `u64` that carries intent and
/// prevents frame numbers and byte addresses from being mixed up.
///
/// ### Semantics
/// - Use [`PhysicalAddress::align_down`] / [`PhysicalAddress::align_up`] to
///   snap to a page boundary for a concrete [`PageSize`].
/// - Use [`Frame::containing`] to derive the frame that holds this address.
#[repr(transparent)]
#[derive(Copy, Clone, Default, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct PhysicalAddress(u64);

impl PhysicalAddress {
    #[inline]
    #[must_use]
    pub const fn zero() -> Self {
        Self::new(0)
    }

    #[inline]
    #[must_use]
    pub const fn new(v: u64) -> Self {
        Self(v)
    }

    #[inline]
    #[must_use]
    pub const fn as_u64(self) -> u64 {
        self.0
    }

    /// Align down to the page boundary `S`.
    #[inline]
    #[must_use]
    pub const fn align_down<S: PageSize>(self) -> Self {
        Self(self.0 & !(S::SIZE - 1))
    }

    /// Align up to the page boundary `S`, saturating at `u64::MAX & !(SIZE-1)`.
    #[inline]
    #[must_use]
    pub const fn align_up<S: PageSize>(self) -> Self {
        Self(self.0.saturating_add(S::SIZE - 1) & !(S::SIZE - 1))
    }

    /// Whether this address lies on a boundary of page size `S`.
    #[inline]
    #[must_use]
    pub const fn is_aligned<S: PageSize>(self) -> bool {
        self.0 & (S::SIZE - 1) == 0
    }
}

impl fmt::Debug for PhysicalAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PA(0x{:016X})", self.as_u64())
    }
}

impl fmt::Display for PhysicalAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:016X}", self.as_u64())
    }
}

impl From<u64> for PhysicalAddress {
    #[inline]
    fn from(v: u64) -> Self {
        Self::new(v)
    }
}

impl Add<u64> for PhysicalAddress {
    type Output = Self;
    #[inline]
    fn add(self, rhs: u64) -> Self::Output {
        Self(self.0 + rhs)
    }
}

impl AddAssign<u64> for PhysicalAddress {
    #[inline]
    fn add_assign(&mut self, rhs: u64) {
        self.0 += rhs;
    }
}

/// Physical frame number.
///
/// Frame `n` covers the physical bytes `[n * SIZE, (n + 1) * SIZE)` for the
/// base granularity [`Size4K`]. The frame number doubles as the index into
/// the kernel's frame descriptor table.
#[repr(transparent)]
#[derive(Copy, Clone, Default, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct Frame(u64);

impl Frame {
    #[inline]
    #[must_use]
    pub const fn from_number(n: u64) -> Self {
        Self(n)
    }

    /// The frame containing the given physical address (aligns down).
    #[inline]
    #[must_use]
    pub const fn containing(pa: PhysicalAddress) -> Self {
        Self(pa.as_u64() >> Size4K::SHIFT)
    }

    #[inline]
    #[must_use]
    pub const fn number(self) -> u64 {
        self.0
    }

    /// The base physical address of this frame.
    #[inline]
    #[must_use]
    pub const fn base(self) -> PhysicalAddress {
        PhysicalAddress::new(self.0 << Size4K::SHIFT)
    }

    /// The frame `count` frames above this one.
    #[inline]
    #[must_use]
    pub const fn add(self, count: u64) -> Self {
        Self(self.0 + count)
    }
}

impl fmt::Debug for Frame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Frame({})", self.0)
    }
}

impl fmt::Display for Frame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{} @ {}", self.0, self.base())
    }
}

impl From<PhysicalAddress> for Frame {
    #[inline]
    fn from(pa: PhysicalAddress) -> Self {
        Self::containing(pa)
    }
}

impl From<Frame> for PhysicalAddress {
    #[inline]
    fn from(frame: Frame) -> Self {
        frame.base()
    }
}

/// A contiguous run of physical frames, `[start, start + count)`.
///
/// This is the currency of the frame allocator: `allocate` hands one out,
/// `release` takes one back. An empty range (`count == 0`) is representable
/// but never produced by the allocator.
#[derive(Copy, Clone, Eq, PartialEq, Hash)]
pub struct FrameRange {
    start: Frame,
    count: u64,
}

impl FrameRange {
    #[inline]
    #[must_use]
    pub const fn new(start: Frame, count: u64) -> Self {
        Self { start, count }
    }

    #[inline]
    #[must_use]
    pub const fn start(self) -> Frame {
        self.start
    }

    /// One past the last frame of the run.
    #[inline]
    #[must_use]
    pub const fn end(self) -> Frame {
        Frame(self.start.0 + self.count)
    }

    #[inline]
    #[must_use]
    pub const fn count(self) -> u64 {
        self.count
    }

    #[inline]
    #[must_use]
    pub const fn is_empty(self) -> bool {
        self.count == 0
    }

    #[inline]
    #[must_use]
    pub const fn contains(self, frame: Frame) -> bool {
        frame.0 >= self.start.0 && frame.0 < self.start.0 + self.count
    }

    /// Iterate over the frames of the run in ascending order.
    pub fn iter(self) -> impl Iterator<Item = Frame> {
        (self.start.0..self.start.0 + self.count).map(Frame)
    }
}

impl fmt::Debug for FrameRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "FrameRange({}..{}, {} frames)",
            self.start.0,
            self.start.0 + self.count,
            self.count
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn address_alignment() {
        let a = PhysicalAddress::new(0x12345);
        assert_eq!(a.align_down::<Size4K>().as_u64(), 0x12000);
        assert_eq!(a.align_up::<Size4K>().as_u64(), 0x13000);
        assert!(!a.is_aligned::<Size4K>());
        assert!(a.align_down::<Size4K>().is_aligned::<Size4K>());
    }

    #[test]
    fn aligned_address_stays_put() {
        let a = PhysicalAddress::new(0x4_0000);
        assert_eq!(a.align_up::<Size4K>(), a);
        assert_eq!(a.align_down::<Size4K>(), a);
    }

    #[test]
    fn frame_address_round_trip() {
        let pa = PhysicalAddress::new(0x0030_1FFF);
        let frame = Frame::containing(pa);
        assert_eq!(frame.number(), 0x301);
        assert_eq!(frame.base().as_u64(), 0x0030_1000);
        assert_eq!(Frame::containing(frame.base()), frame);
    }

    #[test]
    fn range_bounds_and_membership() {
        let run = FrameRange::new(Frame::from_number(10), 4);
        assert_eq!(run.start().number(), 10);
        assert_eq!(run.end().number(), 14);
        assert!(run.contains(Frame::from_number(10)));
        assert!(run.contains(Frame::from_number(13)));
        assert!(!run.contains(Frame::from_number(14)));
        assert!(!run.contains(Frame::from_number(9)));
    }

    #[test]
    fn range_iteration() {
        let run = FrameRange::new(Frame::from_number(2), 3);
        let frames: Vec<u64> = run.iter().map(Frame::number).collect();
        assert_eq!(frames, [2, 3, 4]);
    }
}
