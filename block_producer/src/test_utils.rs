use std::sync::Arc;

use anyhow::Result;
use builder_api::{
    BidValidator, MockBuilderClient, SkippedSlotsCircuitBreaker,
    DEFAULT_BUILDER_MAX_SKIPPED_SLOTS, DEFAULT_BUILDER_MAX_SKIPPED_SLOTS_PER_EPOCH,
};
use execution_engine::MockExecutionEngine;
use prometheus_metrics::Metrics;
use types::{
    containers::{
        BlindedBeaconBlock, BlobsBundle, BuilderBid, ExecutionPayload,
        ExecutionPayloadAndBlobsBundle, ExecutionRequests, SignedBlindedBeaconBlock,
        SignedBuilderBid, Withdrawal,
    },
    nonstandard::{
        ExecutionPayloadContext, ExecutionPayloadWithValue, ForkChoiceState,
        PayloadBuildingAttributes, PayloadId, Phase,
    },
    primitives::{
        ExecutionAddress, KzgCommitment, KzgProof, PublicKeyBytes, SignatureBytes, Slot, Wei,
        H256, H64,
    },
};

use crate::{
    execution_layer::{ExecutionLayer, Options},
    misc::PayloadSource,
};

pub type TestExecutionLayer = ExecutionLayer<MockExecutionEngine, MockBuilderClient>;

const GENESIS_TIME: u64 = 1_606_824_023;
const SECONDS_PER_SLOT: u64 = 12;

pub fn registration_public_key() -> PublicKeyBytes {
    PublicKeyBytes::repeat_byte(0xaa)
}

/// Context for `slot` building on a block in the previous slot.
pub fn context(slot: Slot, phase: Phase) -> ExecutionPayloadContext {
    ExecutionPayloadContext {
        phase,
        payload_id: PayloadId(H64::from_low_u64_be(slot)),
        fork_choice_state: ForkChoiceState {
            slot,
            head_block_root: H256::from_low_u64_be(slot - 1),
            head_block_hash: H256::repeat_byte(0x11),
            safe_block_hash: H256::repeat_byte(0x22),
            finalized_block_hash: H256::repeat_byte(0x33),
        },
        payload_building_attributes: PayloadBuildingAttributes {
            timestamp: GENESIS_TIME + slot * SECONDS_PER_SLOT,
            prev_randao: H256::repeat_byte(0x44),
            fee_recipient: ExecutionAddress::repeat_byte(0x55),
            validator_registration_public_key: Some(registration_public_key()),
        },
        recent_block_slots: Arc::new([slot - 1]),
    }
}

pub fn unregistered_context(slot: Slot, phase: Phase) -> ExecutionPayloadContext {
    let mut context = context(slot, phase);
    context
        .payload_building_attributes
        .validator_registration_public_key = None;
    context
}

/// Payload consistent with `context`. `block_hash_byte` tells apart payloads from different sources.
pub fn payload(context: &ExecutionPayloadContext, block_hash_byte: u8) -> Arc<ExecutionPayload> {
    Arc::new(ExecutionPayload {
        parent_hash: context.parent_hash(),
        fee_recipient: context.payload_building_attributes.fee_recipient,
        prev_randao: context.payload_building_attributes.prev_randao,
        block_number: context.slot(),
        gas_limit: 30_000_000,
        gas_used: 21_000,
        timestamp: context.payload_building_attributes.timestamp,
        base_fee_per_gas: Wei::from(7),
        block_hash: H256::repeat_byte(block_hash_byte),
        transactions: vec![vec![block_hash_byte; 4].into()],
        withdrawals: context.phase.has_withdrawals().then(|| {
            vec![Withdrawal {
                index: context.slot(),
                validator_index: 42,
                address: context.payload_building_attributes.fee_recipient,
                amount: 1_000_000,
            }]
        }),
        blob_gas_used: context.phase.has_blobs().then_some(131_072),
        excess_blob_gas: context.phase.has_blobs().then_some(0),
        ..ExecutionPayload::default()
    })
}

pub fn blobs_bundle(blob_count: usize) -> BlobsBundle {
    BlobsBundle {
        commitments: vec![KzgCommitment::repeat_byte(1); blob_count],
        proofs: vec![KzgProof::repeat_byte(2); blob_count],
        blobs: vec![vec![3_u8; 64].into(); blob_count],
    }
}

pub fn builder_bid(
    context: &ExecutionPayloadContext,
    execution_payload: &ExecutionPayload,
    value: u64,
) -> SignedBuilderBid {
    SignedBuilderBid {
        phase: context.phase,
        message: BuilderBid {
            header: Arc::new(execution_payload.to_header()),
            blob_kzg_commitments: context
                .phase
                .has_blobs()
                .then(|| vec![KzgCommitment::repeat_byte(9)]),
            execution_requests: context
                .phase
                .has_execution_requests()
                .then(ExecutionRequests::default),
            value: Wei::from(value),
            pubkey: PublicKeyBytes::repeat_byte(0xbb),
        },
        signature: SignatureBytes::zero(),
    }
}

pub fn signed_blinded_block(
    context: &ExecutionPayloadContext,
    execution_payload: &ExecutionPayload,
) -> SignedBlindedBeaconBlock {
    SignedBlindedBeaconBlock {
        phase: context.phase,
        message: BlindedBeaconBlock {
            slot: context.slot(),
            proposer_index: 42,
            parent_root: context.fork_choice_state.head_block_root,
            state_root: H256::repeat_byte(0x66),
            execution_payload_header: Arc::new(execution_payload.to_header()),
            blob_kzg_commitments: context.phase.has_blobs().then(Vec::new),
        },
        signature: SignatureBytes::zero(),
    }
}

/// Call-recording collaborators shared by the components under test.
pub struct Harness {
    pub execution_engine: Arc<MockExecutionEngine>,
    pub builder: Arc<MockBuilderClient>,
    pub metrics: Arc<Metrics>,
}

impl Harness {
    pub fn new() -> Result<Self> {
        Ok(Self {
            execution_engine: Arc::new(MockExecutionEngine::new()),
            builder: Arc::new(MockBuilderClient::default()),
            metrics: Arc::new(Metrics::new()?),
        })
    }

    pub fn execution_layer(&self, options: Options) -> TestExecutionLayer {
        ExecutionLayer::new(
            Arc::clone(&self.execution_engine),
            Some(Arc::clone(&self.builder)),
            Arc::new(SkippedSlotsCircuitBreaker::new(
                DEFAULT_BUILDER_MAX_SKIPPED_SLOTS,
                DEFAULT_BUILDER_MAX_SKIPPED_SLOTS_PER_EPOCH,
            )),
            Arc::new(BidValidator),
            Some(Arc::clone(&self.metrics)),
            options,
        )
    }

    pub fn execution_layer_without_builder(&self) -> TestExecutionLayer {
        ExecutionLayer::new(
            Arc::clone(&self.execution_engine),
            None,
            Arc::new(SkippedSlotsCircuitBreaker::new(
                DEFAULT_BUILDER_MAX_SKIPPED_SLOTS,
                DEFAULT_BUILDER_MAX_SKIPPED_SLOTS_PER_EPOCH,
            )),
            Arc::new(BidValidator),
            Some(Arc::clone(&self.metrics)),
            Options::default(),
        )
    }

    /// Makes the local engine serve a payload worth `value` for `context`.
    pub fn prepare_local_payload(
        &self,
        context: &ExecutionPayloadContext,
        value: u64,
    ) -> ExecutionPayloadWithValue {
        let local = ExecutionPayloadWithValue::new(payload(context, 0x0e), Wei::from(value));
        self.execution_engine
            .insert_payload(context.payload_id, local.clone());
        local
    }

    pub fn prepare_local_blobs_bundle(
        &self,
        context: &ExecutionPayloadContext,
        blob_count: usize,
    ) -> BlobsBundle {
        let blobs_bundle = blobs_bundle(blob_count);
        self.execution_engine
            .insert_blobs_bundle(context.payload_id, blobs_bundle.clone());
        blobs_bundle
    }

    /// Makes the builder bid `value` for `context` and reveal the matching payload.
    pub fn prepare_builder_bid(
        &self,
        context: &ExecutionPayloadContext,
        value: u64,
    ) -> ExecutionPayloadAndBlobsBundle {
        let execution_payload = payload(context, 0xb0);
        let slot = context.slot();

        self.builder
            .insert_header(slot, builder_bid(context, &execution_payload, value));

        let response = ExecutionPayloadAndBlobsBundle {
            execution_payload,
            blobs_bundle: context
                .phase
                .has_blobs()
                .then(|| Arc::new(blobs_bundle(1))),
        };

        self.builder.insert_payload(slot, response.clone());

        response
    }

    pub fn source_count(&self, source: PayloadSource) -> u64 {
        self.metrics.execution_payload_source_count(&[
            source.source_label(),
            source.fallback_reason_label(),
        ])
    }

    pub fn builder_interactions(&self) -> usize {
        self.builder.interaction_count()
    }

    pub fn local_payload_requests(&self) -> usize {
        self.execution_engine.get_payload_requests().len()
    }

    pub fn local_blobs_bundle_requests(&self) -> usize {
        self.execution_engine.get_blobs_bundle_requests().len()
    }
}
