use kernel_addr::{Frame, FrameRange};
use kernel_frames::{FirstFitAllocator, FrameAllocator};

/// An allocator over `capacity` frames with `[seed_base, seed_base + seed)`
/// handed over as one usable region; everything else stays reserved.
fn seeded(capacity: usize, seed_base: u64, seed: u64) -> FirstFitAllocator {
    let mut allocator = FirstFitAllocator::with_capacity(capacity);
    allocator.seed_region(Frame::from_number(seed_base), seed);
    allocator.self_check().expect("freshly seeded state");
    allocator
}

fn blocks(allocator: &FirstFitAllocator) -> Vec<(u64, u64)> {
    allocator
        .free_blocks()
        .map(|b| (b.start().number(), b.count()))
        .collect()
}

#[test]
fn seeding_registers_one_block_per_region() {
    let mut allocator = FirstFitAllocator::with_capacity(16);
    allocator.seed_region(Frame::from_number(1), 3);
    allocator.seed_region(Frame::from_number(6), 5);
    allocator.seed_region(Frame::from_number(13), 2);

    assert_eq!(allocator.free_frame_count(), 10);
    assert_eq!(blocks(&allocator), [(1, 3), (6, 5), (13, 2)]);
    let report = allocator.self_check().expect("seeded state");
    assert_eq!(report.blocks, 3);
    assert_eq!(report.free_frames, 10);
}

#[test]
fn exhaustion_of_single_frames() {
    // Scenario: a three-frame region serves exactly three single-frame
    // requests, all distinct, and nothing more.
    let mut allocator = seeded(16, 4, 3);
    assert_eq!(allocator.free_frame_count(), 3);

    let a = allocator.allocate(1).expect("first frame");
    let b = allocator.allocate(1).expect("second frame");
    let c = allocator.allocate(1).expect("third frame");

    let mut starts = [a.start().number(), b.start().number(), c.start().number()];
    starts.sort_unstable();
    assert_eq!(starts, [4, 5, 6]);

    assert_eq!(allocator.allocate(1), None);
    assert_eq!(allocator.free_frame_count(), 0);
    allocator.self_check().expect("exhausted state");
}

#[test]
fn whole_block_round_trip() {
    // Scenario: taking a region whole and giving it back restores a single
    // index entry of the original length.
    let mut allocator = seeded(8, 0, 5);

    let run = allocator.allocate(5).expect("whole block");
    assert_eq!(run.start().number(), 0);
    assert_eq!(run.count(), 5);
    assert_eq!(allocator.free_frame_count(), 0);
    assert_eq!(blocks(&allocator), []);

    allocator.release(run);
    assert_eq!(allocator.free_frame_count(), 5);
    assert_eq!(blocks(&allocator), [(0, 5)]);
    allocator.self_check().expect("round-tripped state");
}

#[test]
fn partial_release_reopens_only_the_tail() {
    // Scenario: from a five-frame allocated block, hand back only the last
    // three frames; they form one block, and only requests of up to three
    // frames can be served.
    let mut allocator = seeded(8, 0, 5);
    let whole = allocator.allocate(5).expect("whole block");
    let base = whole.start().number();

    allocator.release(FrameRange::new(Frame::from_number(base + 2), 3));
    assert_eq!(blocks(&allocator), [(base + 2, 3)]);
    allocator.self_check().expect("tail released");

    assert_eq!(allocator.allocate(4), None);
    let tail = allocator.allocate(3).expect("tail fits exactly");
    assert_eq!(tail.start().number(), base + 2);
    assert_eq!(tail.count(), 3);
    assert_eq!(allocator.allocate(1), None);
}

#[test]
fn release_order_does_not_prevent_full_merge() {
    // Scenario: releasing frames B, B+2, B+1 (in that order) must collapse
    // into a single three-frame block at B.
    let mut allocator = seeded(8, 2, 3);
    let a = allocator.allocate(1).expect("frame B");
    let b = allocator.allocate(1).expect("frame B+1");
    let c = allocator.allocate(1).expect("frame B+2");
    assert_eq!(a.start().number(), 2);
    assert_eq!(b.start().number(), 3);
    assert_eq!(c.start().number(), 4);

    allocator.release(a);
    allocator.release(c);
    assert_eq!(blocks(&allocator), [(2, 1), (4, 1)]);

    allocator.release(b);
    assert_eq!(blocks(&allocator), [(2, 3)]);
    assert_eq!(allocator.free_frame_count(), 3);
    allocator.self_check().expect("fully merged state");
}

#[test]
fn first_fit_prefers_the_lower_block_over_a_tighter_one() {
    let mut allocator = seeded(16, 0, 10);
    let low = allocator.allocate(5).expect("low block");
    let _pin = allocator.allocate(3).expect("pin between the holes");
    assert_eq!(blocks(&allocator), [(8, 2)]);

    // Reopen the low five frames: two candidates now satisfy a two-frame
    // request, and the high one at 8 is the tighter fit.
    allocator.release(low);
    assert_eq!(blocks(&allocator), [(0, 5), (8, 2)]);

    let chosen = allocator.allocate(2).expect("two frames");
    assert_eq!(chosen.start().number(), 0, "first fit takes the lowest");
    assert_eq!(blocks(&allocator), [(2, 3), (8, 2)]);
    allocator.self_check().expect("post-split state");
}

#[test]
fn failed_allocation_mutates_nothing() {
    let mut allocator = seeded(16, 1, 6);
    let before = blocks(&allocator);

    assert_eq!(allocator.allocate(7), None, "more than the pool holds");
    assert_eq!(allocator.allocate(u64::MAX), None);

    assert_eq!(blocks(&allocator), before);
    assert_eq!(allocator.free_frame_count(), 6);
    allocator.self_check().expect("untouched state");
}

#[test]
fn gaps_between_regions_are_never_bridged() {
    let mut allocator = FirstFitAllocator::with_capacity(16);
    allocator.seed_region(Frame::from_number(0), 3);
    allocator.seed_region(Frame::from_number(5), 3);
    assert_eq!(allocator.free_frame_count(), 6);

    // Six frames are free but no four of them are contiguous.
    assert_eq!(allocator.allocate(4), None);
    let low = allocator.allocate(3).expect("low region");
    let high = allocator.allocate(3).expect("high region");
    assert_eq!(low.start().number(), 0);
    assert_eq!(high.start().number(), 5);

    // Releasing both does not merge across the reserved gap.
    allocator.release(low);
    allocator.release(high);
    assert_eq!(blocks(&allocator), [(0, 3), (5, 3)]);
    allocator.self_check().expect("regions restored");
}

#[test]
fn splitting_keeps_the_remainder_in_place() {
    let mut allocator = seeded(16, 2, 9);

    let first = allocator.allocate(4).expect("first cut");
    assert_eq!(first.start().number(), 2);
    assert_eq!(blocks(&allocator), [(6, 5)]);

    let second = allocator.allocate(2).expect("second cut");
    assert_eq!(second.start().number(), 6);
    assert_eq!(blocks(&allocator), [(8, 3)]);
    allocator.self_check().expect("twice-split state");
}

#[test]
fn interleaved_alloc_release_exercise() {
    // The historical consistency drill: split a five-frame block, give the
    // pieces back out of order, and watch the shape at every step.
    let mut allocator = seeded(8, 0, 5);

    let p0 = allocator.allocate(5).expect("whole region");
    allocator.release(FrameRange::new(Frame::from_number(2), 3));
    assert_eq!(allocator.allocate(4), None);
    let p1 = allocator.allocate(3).expect("the reopened tail");
    assert_eq!(p1.start().number(), 2);

    // Head frame alone, then the tail again: two separate blocks.
    allocator.release(FrameRange::new(p0.start(), 1));
    allocator.release(p1);
    assert_eq!(blocks(&allocator), [(0, 1), (2, 3)]);

    // The single low frame is the first fit for a one-frame request.
    let single = allocator.allocate(1).expect("single frame");
    assert_eq!(single.start().number(), 0);

    // Put it back, then carve two out of the bigger block.
    allocator.release(single);
    let pair = allocator.allocate(2).expect("two frames");
    assert_eq!(pair.start().number(), 2);

    // Return everything; the region must collapse to one block.
    allocator.release(pair);
    allocator.release(FrameRange::new(Frame::from_number(1), 1));
    assert_eq!(blocks(&allocator), [(0, 5)]);
    assert_eq!(allocator.free_frame_count(), 5);
    allocator.self_check().expect("fully restored region");
}

#[test]
fn counter_always_matches_the_index() {
    // Deterministic churn: a small LCG drives an alloc/release mix and the
    // cached counter must match the derived sum after every step.
    let mut allocator = seeded(64, 0, 64);
    let mut held: Vec<FrameRange> = Vec::new();
    let mut state = 0x2545_F491_4F6C_DD1D_u64;

    for _ in 0..200 {
        state = state.wrapping_mul(6_364_136_223_846_793_005).wrapping_add(1);
        let wanted = state % 7 + 1;
        if state & 1 == 0 || held.is_empty() {
            if let Some(run) = allocator.allocate(wanted) {
                held.push(run);
            }
        } else {
            let victim = held.swap_remove((state >> 8) as usize % held.len());
            allocator.release(victim);
        }

        let report = allocator.self_check().expect("invariants hold mid-churn");
        assert_eq!(report.free_frames, allocator.free_frame_count());
    }

    for run in held.drain(..) {
        allocator.release(run);
    }
    assert_eq!(blocks(&allocator), [(0, 64)]);
}

#[test]
fn works_through_the_strategy_interface() {
    // Callers bind to the trait, not the concrete strategy.
    fn drill<A: FrameAllocator>() -> A {
        let mut allocator = A::with_capacity(8);
        allocator.seed_region(Frame::from_number(0), 8);
        let run = allocator.allocate(3).expect("three frames");
        allocator.release(run);
        allocator
    }

    let allocator = drill::<FirstFitAllocator>();
    assert_eq!(allocator.name(), "first-fit");
    assert_eq!(allocator.free_frame_count(), 8);
    allocator.self_check().expect("post-drill state");
}

#[test]
#[should_panic(expected = "cannot allocate zero frames")]
fn zero_allocation_is_fatal() {
    let mut allocator = seeded(8, 0, 4);
    let _ = allocator.allocate(0);
}

#[test]
#[should_panic(expected = "cannot release an empty range")]
fn empty_release_is_fatal() {
    let mut allocator = seeded(8, 0, 4);
    allocator.release(FrameRange::new(Frame::from_number(0), 0));
}

#[test]
#[should_panic(expected = "double release")]
fn double_release_is_fatal() {
    let mut allocator = seeded(8, 0, 4);
    let run = allocator.allocate(2).expect("two frames");
    allocator.release(run);
    allocator.release(run);
}

#[test]
#[should_panic(expected = "releasing reserved frame")]
fn releasing_reserved_frames_is_fatal() {
    let mut allocator = seeded(8, 0, 4);
    allocator.release(FrameRange::new(Frame::from_number(6), 1));
}

#[test]
#[should_panic(expected = "already in service")]
fn seeding_the_same_region_twice_is_fatal() {
    let mut allocator = seeded(8, 0, 4);
    allocator.seed_region(Frame::from_number(0), 4);
}

#[test]
#[should_panic(expected = "cannot seed an empty region")]
fn seeding_an_empty_region_is_fatal() {
    let mut allocator = FirstFitAllocator::with_capacity(8);
    allocator.seed_region(Frame::from_number(0), 0);
}
