use std::sync::Arc;

use derive_more::{Constructor, Display, From};
use serde_with::{DeserializeFromStr, SerializeDisplay};
use strum::{AsRefStr, Display as StrumDisplay, EnumString};

use crate::{
    containers::ExecutionPayload,
    primitives::{
        ExecutionAddress, ExecutionBlockHash, PublicKeyBytes, Slot, UnixSeconds, Wei, H256, H64,
    },
};

#[derive(
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Default,
    Debug,
    AsRefStr,
    StrumDisplay,
    EnumString,
    DeserializeFromStr,
    SerializeDisplay,
)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum Phase {
    #[default]
    Bellatrix,
    Capella,
    Deneb,
    Electra,
}

impl Phase {
    /// Whether execution payloads of this phase carry withdrawals.
    #[must_use]
    pub fn has_withdrawals(self) -> bool {
        self >= Self::Capella
    }

    /// Whether blocks of this phase carry blob KZG commitments.
    #[must_use]
    pub fn has_blobs(self) -> bool {
        self >= Self::Deneb
    }

    #[must_use]
    pub fn has_execution_requests(self) -> bool {
        self >= Self::Electra
    }
}

/// Handle issued by the local execution engine for an in-progress payload build.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default, Debug, Display, From)]
#[display("{_0:?}")]
pub struct PayloadId(pub H64);

#[derive(Clone, Copy, PartialEq, Eq, Default, Debug)]
pub struct ForkChoiceState {
    pub slot: Slot,
    pub head_block_root: H256,
    pub head_block_hash: ExecutionBlockHash,
    pub safe_block_hash: ExecutionBlockHash,
    pub finalized_block_hash: ExecutionBlockHash,
}

#[derive(Clone, Copy, PartialEq, Eq, Default, Debug)]
pub struct PayloadBuildingAttributes {
    pub timestamp: UnixSeconds,
    pub prev_randao: H256,
    pub fee_recipient: ExecutionAddress,
    /// Absent when the proposer has not registered with the builder network.
    pub validator_registration_public_key: Option<PublicKeyBytes>,
}

/// Everything needed to produce the execution payload for a single slot.
///
/// The context is immutable once created and identifies exactly one slot.
/// `recent_block_slots` lists the slots of the most recent blocks on the chain being built upon,
/// most recent first. It feeds the skipped slots circuit breaker.
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct ExecutionPayloadContext {
    pub phase: Phase,
    pub payload_id: PayloadId,
    pub fork_choice_state: ForkChoiceState,
    pub payload_building_attributes: PayloadBuildingAttributes,
    pub recent_block_slots: Arc<[Slot]>,
}

impl ExecutionPayloadContext {
    #[must_use]
    pub const fn slot(&self) -> Slot {
        self.fork_choice_state.slot
    }

    /// Hash of the execution block the new payload builds on.
    #[must_use]
    pub const fn parent_hash(&self) -> ExecutionBlockHash {
        self.fork_choice_state.head_block_hash
    }

    #[must_use]
    pub const fn validator_registration_public_key(&self) -> Option<PublicKeyBytes> {
        self.payload_building_attributes
            .validator_registration_public_key
    }
}

#[derive(Clone, PartialEq, Eq, Debug, Constructor)]
pub struct ExecutionPayloadWithValue {
    pub execution_payload: Arc<ExecutionPayload>,
    pub value: Wei,
}
