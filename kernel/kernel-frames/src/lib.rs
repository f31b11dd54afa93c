//! # Physical Frame Allocation
//!
//! This crate is the physical-memory frame allocator of the kernel: given
//! the usable memory regions discovered at boot, it tracks the allocation
//! state of every physical page frame and satisfies variable-length
//! contiguous-frame requests.
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────┐
//! │             Allocator Strategy (trait)              │
//! │    • seed_region / allocate / release / query       │
//! │    • first-fit is the one conforming implementation │
//! └─────────────────┬───────────────────────────────────┘
//!                   │
//! ┌─────────────────▼───────────────────────────────────┐
//! │                Free-Block Index                     │
//! │    • address-ordered circular doubly linked list    │
//! │    • intrusive index links in head descriptors      │
//! │    • cached total-free-frames counter               │
//! └─────────────────┬───────────────────────────────────┘
//!                   │
//! ┌─────────────────▼───────────────────────────────────┐
//! │             Frame Descriptor Table                  │
//! │    • one descriptor per physical frame              │
//! │    • reserved / head flags, run length, ref count   │
//! └─────────────────────────────────────────────────────┘
//! ```
//!
//! ## Core pieces
//!
//! - [`descriptor`]: the [`FrameTable`] of per-frame [`FrameDescriptor`]s —
//!   pure data, constructed once with every frame `reserved`.
//! - [`index`]: the [`FreeBlockIndex`], an address-ordered list holding
//!   exactly the head frames of all free contiguous runs. Adjacent free
//!   runs are always merged, so no two entries ever touch.
//! - [`first_fit`]: the [`FirstFitAllocator`] strategy — first qualifying
//!   block wins, oversize blocks split, released runs merge both ways.
//! - [`check`]: the invariant checker ([`verify`]) used as a boot-time
//!   validation pass.
//!
//! ## Error Model
//!
//! Running out of contiguous frames is an expected outcome: `allocate`
//! returns `None` and callers must handle it. Violating a documented
//! precondition (zero-length requests, double release, releasing reserved
//! frames) is a programming error in kernel code and panics — on bare metal
//! there is nothing below the allocator to recover to. Structural
//! corruption found by the checker is surfaced as [`CheckError`] and is
//! fatal at boot.
//!
//! ## Concurrency
//!
//! None here. The allocator is non-reentrant and not interrupt-safe; the
//! kernel's memory subsystem serializes access (see `kernel-mm`).

#![cfg_attr(not(any(test, doctest)), no_std)]

extern crate alloc;

pub mod check;
pub mod descriptor;
pub mod first_fit;
pub mod index;
pub mod strategy;

pub use check::{CheckError, FreeListReport, verify};
pub use descriptor::{FrameDescriptor, FrameFlags, FrameTable};
pub use first_fit::FirstFitAllocator;
pub use index::FreeBlockIndex;
pub use strategy::FrameAllocator;
