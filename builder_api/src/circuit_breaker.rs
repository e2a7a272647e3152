use itertools::Itertools as _;
use types::{
    consts::{GENESIS_SLOT, SLOTS_PER_EPOCH},
    nonstandard::ExecutionPayloadContext,
    primitives::Slot,
};

use crate::api::BuilderApiError;

/// Policy that forces local block production regardless of builder health.
pub trait BuilderCircuitBreaker: Send + Sync {
    fn check(&self, context: &ExecutionPayloadContext) -> Result<(), BuilderApiError>;

    fn is_engaged(&self, context: &ExecutionPayloadContext) -> bool {
        self.check(context).is_err()
    }
}

#[derive(Clone, Copy, Debug)]
pub struct NoopCircuitBreaker;

impl BuilderCircuitBreaker for NoopCircuitBreaker {
    fn check(&self, _context: &ExecutionPayloadContext) -> Result<(), BuilderApiError> {
        Ok(())
    }
}

/// Engages when too many slots before the proposal slot have no block.
#[derive(Clone, Copy, Debug)]
pub struct SkippedSlotsCircuitBreaker {
    max_skipped_slots: u64,
    max_skipped_slots_per_epoch: u64,
}

impl BuilderCircuitBreaker for SkippedSlotsCircuitBreaker {
    fn check(&self, context: &ExecutionPayloadContext) -> Result<(), BuilderApiError> {
        self.check_slots(context.slot(), context.recent_block_slots.iter().copied())
    }
}

impl SkippedSlotsCircuitBreaker {
    #[must_use]
    pub const fn new(max_skipped_slots: u64, max_skipped_slots_per_epoch: u64) -> Self {
        Self {
            max_skipped_slots,
            max_skipped_slots_per_epoch,
        }
    }

    /// `nonempty_slots` must be in descending order, starting with the head.
    #[expect(
        clippy::unnecessary_min_or_max,
        reason = "GENESIS_SLOT const might be adjusted independently."
    )]
    pub fn check_slots(
        &self,
        slot: Slot,
        nonempty_slots: impl IntoIterator<Item = Slot>,
    ) -> Result<(), BuilderApiError> {
        let mut nonempty_slots = nonempty_slots.into_iter().peekable();

        let end_slot = slot.saturating_sub(1).max(GENESIS_SLOT);
        let head_slot = nonempty_slots.peek().copied().unwrap_or(GENESIS_SLOT);

        // check for missed blocks from head
        let mut missing_blocks = end_slot.saturating_sub(head_slot);

        if missing_blocks > self.max_skipped_slots {
            return Err(BuilderApiError::ConsecutiveMissingBlocks { missing_blocks });
        }

        // check last rolling epoch for missed blocks
        let start_slot = end_slot.saturating_sub(SLOTS_PER_EPOCH).max(GENESIS_SLOT);

        missing_blocks += nonempty_slots
            .take_while(|slot| *slot > start_slot)
            .chain(core::iter::once(start_slot))
            .tuple_windows()
            .map(|(slot, parent_slot)| slot.abs_diff(parent_slot.max(start_slot)).saturating_sub(1))
            .sum::<u64>();

        if missing_blocks > self.max_skipped_slots_per_epoch {
            return Err(BuilderApiError::RollingEpochMissingBlocks { missing_blocks });
        }

        Ok(())
    }
}
