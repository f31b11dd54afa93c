//! # Kernel Physical Memory Subsystem
//!
//! Owns the frame allocator instance for the rest of the kernel. During
//! bootstrap it consumes the boot memory map, hands the usable ranges to the
//! allocator in ascending address order (the seeding contract), and runs the
//! allocator's invariant checker — an inconsistent free list at this point
//! is fatal and aborts startup.
//!
//! The allocator itself is non-reentrant and owns no synchronization; this
//! crate provides the required mutual exclusion by wrapping it in a
//! [`SpinLock`](kernel_sync::SpinLock).

#![cfg_attr(not(any(test, doctest)), no_std)]

extern crate alloc;

mod physical;

pub use physical::{PhysicalMemory, PhysicalMemoryError};
