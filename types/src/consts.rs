use crate::primitives::Slot;

pub const GENESIS_SLOT: Slot = 0;
pub const MAX_BLOBS_PER_BLOCK: usize = 6;
pub const SLOTS_PER_EPOCH: u64 = 32;
