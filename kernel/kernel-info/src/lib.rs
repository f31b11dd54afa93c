//! # Kernel Boot and Memory-Layout Information
//!
//! Shared definitions for the contract between the boot stage and the
//! kernel's memory subsystem: the memory map handed over at boot and the
//! fixed physical layout constants derived from the linker configuration.

#![cfg_attr(not(any(test, doctest)), no_std)]

pub mod boot;
pub mod memory;

pub use boot::{BOOT_MEMORY_MAP_CAPACITY, BootMemoryMap, MemoryRange, MemoryRangeKind};
pub use memory::MAX_PHYS_BYTES;
