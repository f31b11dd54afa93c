//! # Invariant Checker
//!
//! A diagnostic pass that re-walks the free-block index, re-derives the
//! aggregate free-frame count and validates the structural invariants the
//! split/merge logic must preserve. Run at boot after seeding and from
//! tests; never on the allocate/release hot path.

use crate::descriptor::{FREE_LIST_SENTINEL, FrameTable};
use crate::index::FreeBlockIndex;

/// Aggregates derived by a successful [`verify`] walk.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct FreeListReport {
    /// Number of free blocks linked into the index.
    pub blocks: usize,
    /// Sum of the run lengths of all free blocks.
    pub free_frames: u64,
}

/// A violated structural invariant.
///
/// Any of these means the allocator's core data structure is inconsistent;
/// at boot this is fatal.
#[derive(Debug, Copy, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CheckError {
    #[error("cached free-frame count is {cached} but the index sums to {derived}")]
    CountMismatch { cached: u64, derived: u64 },

    #[error("block at frame {entry} does not ascend past its predecessor at frame {previous}")]
    OutOfOrder { entry: u64, previous: u64 },

    #[error("blocks meeting at frame {boundary} are adjacent and should have merged")]
    UnmergedNeighbors { boundary: u64 },

    #[error("frame {frame} is linked into the index without the head flag")]
    HeadFlagMissing { frame: u64 },

    #[error("reserved frame {frame} is linked into the free-block index")]
    ReservedInIndex { frame: u64 },

    #[error("block at frame {head} has zero length")]
    EmptyBlock { head: u64 },

    #[error("block at frame {head} extends past the end of the descriptor table")]
    RunOutOfBounds { head: u64 },

    #[error("frame {frame} inside the block at {head} is reserved or flagged as a head")]
    CorruptRun { head: u64, frame: u64 },

    #[error("backward link of frame {frame} does not return to its predecessor")]
    BrokenBackLink { frame: u64 },

    #[error("{flagged} descriptors carry the head flag but the index links {linked} entries")]
    StrayHeadFlags { flagged: usize, linked: usize },

    #[error("free list does not terminate; cycle detected at frame {frame}")]
    Cycle { frame: u64 },
}

/// Walk the free-block index and validate every structural invariant.
///
/// Checked, in walk order:
/// 1. every linked frame carries the head flag and is not reserved,
/// 2. every run is non-empty, in bounds, and covers only non-reserved,
///    non-head frames past its head,
/// 3. base addresses strictly ascend and neighbors are never adjacent,
/// 4. the backward links mirror the forward walk,
/// 5. the cached free-frame count equals the derived sum,
/// 6. the head flag appears on exactly the linked frames.
///
/// # Errors
/// Returns the first violation encountered.
pub fn verify(table: &FrameTable, index: &FreeBlockIndex) -> Result<FreeListReport, CheckError> {
    let mut blocks = 0_usize;
    let mut derived = 0_u64;
    let mut expected_prev = FREE_LIST_SENTINEL;
    let mut previous: Option<usize> = None;

    let mut cursor = index.first();
    while let Some(head) = cursor {
        // A walk visiting more entries than the table has frames can only
        // mean the links loop back on themselves.
        if blocks > table.len() {
            return Err(CheckError::Cycle { frame: head as u64 });
        }

        let descriptor = table.descriptor(head);
        if !descriptor.is_head() {
            return Err(CheckError::HeadFlagMissing { frame: head as u64 });
        }
        if descriptor.is_reserved() {
            return Err(CheckError::ReservedInIndex { frame: head as u64 });
        }
        if descriptor.prev != expected_prev {
            return Err(CheckError::BrokenBackLink { frame: head as u64 });
        }

        let run = descriptor.run_length();
        if run == 0 {
            return Err(CheckError::EmptyBlock { head: head as u64 });
        }
        let Some(run_end) = head.checked_add(run) else {
            return Err(CheckError::RunOutOfBounds { head: head as u64 });
        };
        if run_end > table.len() {
            return Err(CheckError::RunOutOfBounds { head: head as u64 });
        }
        for frame in head + 1..run_end {
            let inner = table.descriptor(frame);
            if inner.is_reserved() || inner.is_head() {
                return Err(CheckError::CorruptRun {
                    head: head as u64,
                    frame: frame as u64,
                });
            }
        }

        if let Some(prev_head) = previous {
            let prev_end = prev_head + table.descriptor(prev_head).run_length();
            if head < prev_end {
                return Err(CheckError::OutOfOrder {
                    entry: head as u64,
                    previous: prev_head as u64,
                });
            }
            if head == prev_end {
                return Err(CheckError::UnmergedNeighbors {
                    boundary: head as u64,
                });
            }
        }

        blocks += 1;
        derived += run as u64;
        previous = Some(head);
        expected_prev = head;
        cursor = index.next_entry(table, head);
    }

    if derived != index.free_frames() {
        return Err(CheckError::CountMismatch {
            cached: index.free_frames(),
            derived,
        });
    }

    // Head flags on frames the walk never reached would be stray heads; a
    // shortfall would mean a linked frame lost its flag mid-run (already
    // caught above, but the count closes the equivalence both ways).
    let flagged = table.descriptors().filter(|d| d.is_head()).count();
    if flagged != blocks {
        return Err(CheckError::StrayHeadFlags {
            flagged,
            linked: blocks,
        });
    }

    Ok(FreeListReport {
        blocks,
        free_frames: derived,
    })
}
