//! # Physical Memory Layout

use kernel_addr::{PageSize, Size4K};

/// The maximum amount of physical memory the kernel manages (896 MiB).
///
/// Physical memory above this limit is ignored: the frame descriptor table
/// is sized to cover `[0, MAX_PHYS_BYTES)` and usable ranges reported by the
/// boot stage are clipped against it.
///
/// # Kernel Build
/// Must agree with the remapped-physical-memory window in the linker script.
pub const MAX_PHYS_BYTES: u64 = 0x3800_0000;

/// The highest frame number the kernel manages (exclusive).
pub const MAX_PHYS_FRAMES: u64 = MAX_PHYS_BYTES >> Size4K::SHIFT;

const _: () = {
    assert!(MAX_PHYS_BYTES % Size4K::SIZE == 0);
    assert!(MAX_PHYS_FRAMES > 0);
};
