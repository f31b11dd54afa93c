//! # Boot-Time Memory Map
//!
//! The memory-discovery handover from the boot stage. By the time the kernel
//! entry point runs, the boot firmware has enumerated physical memory into a
//! BIOS-E820-style table of ranges; the kernel's memory subsystem consumes
//! the `Usable` entries to seed the frame allocator.
//!
//! Keep these `#[repr(C)]` and prefer fixed-size integers at the ABI
//! boundary; the table is read straight out of low memory where the firmware
//! probe left it.

use kernel_addr::PhysicalAddress;

/// Maximum number of entries in the boot memory map.
pub const BOOT_MEMORY_MAP_CAPACITY: usize = 20;

/// Classification of a physical memory range, as reported by the firmware
/// memory probe. We avoid Rust enums with payloads across the ABI boundary.
#[repr(u32)]
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum MemoryRangeKind {
    /// Memory available to the OS.
    Usable = 1,
    /// Not available (system ROM, memory-mapped devices, …).
    Reserved = 2,
    /// Usable by the OS after the ACPI tables have been read.
    AcpiReclaimable = 3,
    /// ACPI non-volatile storage; must be preserved across sleep states.
    AcpiNvs = 4,
}

/// One physical memory range reported by the firmware probe.
#[repr(C)]
#[derive(Copy, Clone, Debug)]
pub struct MemoryRange {
    /// Physical base address of the range in bytes.
    pub base: u64,
    /// Length of the range in bytes.
    pub length: u64,
    /// What the range may be used for.
    pub kind: MemoryRangeKind,
}

impl MemoryRange {
    #[inline]
    #[must_use]
    pub const fn start(&self) -> PhysicalAddress {
        PhysicalAddress::new(self.base)
    }

    /// One past the last byte of the range, saturating at the address limit.
    #[inline]
    #[must_use]
    pub const fn end(&self) -> PhysicalAddress {
        PhysicalAddress::new(self.base.saturating_add(self.length))
    }

    #[inline]
    #[must_use]
    pub const fn is_usable(&self) -> bool {
        matches!(self.kind, MemoryRangeKind::Usable)
    }
}

/// The boot memory map: a fixed-capacity table of [`MemoryRange`] entries.
///
/// Entries beyond [`len`](Self::len) are unspecified filler; use
/// [`ranges`](Self::ranges) or [`usable`](Self::usable) instead of indexing
/// the array directly.
#[repr(C)]
#[derive(Clone)]
pub struct BootMemoryMap {
    /// Number of valid entries in `ranges`.
    pub len: u32,
    /// The range table; only the first `len` entries are meaningful.
    pub ranges: [MemoryRange; BOOT_MEMORY_MAP_CAPACITY],
}

impl BootMemoryMap {
    /// An empty map; ranges are added with [`push`](Self::push).
    #[must_use]
    pub const fn empty() -> Self {
        const FILLER: MemoryRange = MemoryRange {
            base: 0,
            length: 0,
            kind: MemoryRangeKind::Reserved,
        };
        Self {
            len: 0,
            ranges: [FILLER; BOOT_MEMORY_MAP_CAPACITY],
        }
    }

    /// Append a range to the map.
    ///
    /// # Panics
    /// Panics if the map already holds [`BOOT_MEMORY_MAP_CAPACITY`] entries;
    /// the firmware probe never reports more.
    pub fn push(&mut self, range: MemoryRange) {
        let at = self.len as usize;
        assert!(at < BOOT_MEMORY_MAP_CAPACITY, "boot memory map overflow");
        self.ranges[at] = range;
        self.len += 1;
    }

    /// All valid entries, in the order the firmware reported them.
    pub fn ranges(&self) -> impl Iterator<Item = &MemoryRange> {
        self.ranges.iter().take(self.len as usize)
    }

    /// Only the entries available for general allocation.
    pub fn usable(&self) -> impl Iterator<Item = &MemoryRange> {
        self.ranges().filter(|r| r.is_usable())
    }
}

impl Default for BootMemoryMap {
    fn default() -> Self {
        Self::empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn usable(base: u64, length: u64) -> MemoryRange {
        MemoryRange {
            base,
            length,
            kind: MemoryRangeKind::Usable,
        }
    }

    #[test]
    fn empty_map_has_no_ranges() {
        let map = BootMemoryMap::empty();
        assert_eq!(map.ranges().count(), 0);
        assert_eq!(map.usable().count(), 0);
    }

    #[test]
    fn push_and_filter() {
        let mut map = BootMemoryMap::empty();
        map.push(usable(0x0, 0x9_F000));
        map.push(MemoryRange {
            base: 0x9_F000,
            length: 0x1000,
            kind: MemoryRangeKind::Reserved,
        });
        map.push(usable(0x10_0000, 0x700_0000));

        assert_eq!(map.ranges().count(), 3);
        let usable: Vec<u64> = map.usable().map(|r| r.base).collect();
        assert_eq!(usable, [0x0, 0x10_0000]);
    }

    #[test]
    fn range_endpoints() {
        let r = usable(0x10_0000, 0x2000);
        assert_eq!(r.start().as_u64(), 0x10_0000);
        assert_eq!(r.end().as_u64(), 0x10_2000);
        assert!(r.is_usable());
    }

    #[test]
    #[should_panic(expected = "boot memory map overflow")]
    fn overflowing_push_panics() {
        let mut map = BootMemoryMap::empty();
        for i in 0..=BOOT_MEMORY_MAP_CAPACITY {
            map.push(usable(i as u64 * 0x1000, 0x1000));
        }
    }
}
