use std::sync::Arc;

use anyhow::Result;
use builder_api::{AvailabilityChange, BuilderClient};
use execution_engine::ExecutionEngine;
use logging::SLOT_LOG_CONTEXT;
use prometheus_metrics::Metrics;
use tokio::task::JoinHandle;
use types::{
    containers::{
        ExecutionPayloadAndBlobsBundle, SignedBlindedBeaconBlock, SignedValidatorRegistrationV1,
    },
    nonstandard::ExecutionPayloadContext,
    primitives::Slot,
};

use crate::{
    execution_layer::ExecutionLayer,
    payload_result::{
        ready_shared, ExecutionPayloadFuture, ExecutionPayloadResult,
        BLOBS_BUNDLE_BUILDER_PLACEHOLDER,
    },
    payload_result_cache::PayloadResultCache,
};

/// Entry point for producing and revealing execution payloads.
///
/// Every production request goes through the result cache, so each slot triggers at most one
/// local payload request and at most one builder header request. Later requests for the same slot
/// receive the cached result regardless of the arguments they pass.
pub struct BlockProductionManager<E, B> {
    execution_layer: ExecutionLayer<E, B>,
    payload_results: PayloadResultCache,
}

impl<E: ExecutionEngine + 'static, B: BuilderClient + 'static> BlockProductionManager<E, B> {
    #[must_use]
    pub fn new(execution_layer: ExecutionLayer<E, B>, metrics: Option<Arc<Metrics>>) -> Self {
        Self {
            execution_layer,
            payload_results: PayloadResultCache::new(metrics),
        }
    }

    #[must_use]
    pub const fn execution_layer(&self) -> &ExecutionLayer<E, B> {
        &self.execution_layer
    }

    /// Starts production using the flow appropriate for `context.phase`.
    pub fn initiate_block_production(
        &self,
        context: ExecutionPayloadContext,
        builder_enabled: bool,
    ) -> Arc<ExecutionPayloadResult> {
        if context.phase.has_blobs() {
            self.initiate_payload_and_blobs_production(context, builder_enabled)
        } else {
            self.initiate_payload_production(context, builder_enabled)
        }
    }

    pub fn initiate_payload_production(
        &self,
        context: ExecutionPayloadContext,
        builder_enabled: bool,
    ) -> Arc<ExecutionPayloadResult> {
        self.payload_results.get_or_insert_with(context.slot(), || {
            let context = Arc::new(context);
            let payload = self.payload_future(&context, builder_enabled);

            ExecutionPayloadResult::new(context, payload, None)
        })
    }

    /// Like [`Self::initiate_payload_production`], but also provides a blobs bundle.
    ///
    /// When the builder flow is used, the bundle is [`BLOBS_BUNDLE_BUILDER_PLACEHOLDER`].
    /// The real one comes with the payload when the block is revealed.
    pub fn initiate_payload_and_blobs_production(
        &self,
        context: ExecutionPayloadContext,
        builder_enabled: bool,
    ) -> Arc<ExecutionPayloadResult> {
        self.payload_results.get_or_insert_with(context.slot(), || {
            let context = Arc::new(context);
            let payload = self.payload_future(&context, builder_enabled);

            let blobs_bundle = if builder_enabled {
                ready_shared(Arc::clone(&*BLOBS_BUNDLE_BUILDER_PLACEHOLDER))
            } else {
                self.execution_layer
                    .engine_get_blobs_bundle(Arc::clone(&context))
            };

            ExecutionPayloadResult::new(context, payload, Some(blobs_bundle))
        })
    }

    #[must_use]
    pub fn get_cached_result(&self, slot: Slot) -> Option<Arc<ExecutionPayloadResult>> {
        self.payload_results.get(slot)
    }

    pub async fn reveal_payload(
        &self,
        block: &SignedBlindedBeaconBlock,
    ) -> Result<ExecutionPayloadAndBlobsBundle> {
        let cached = self.payload_results.get(block.slot());

        self.execution_layer
            .builder_get_payload(block, cached.as_deref())
            .await
    }

    pub async fn register_validators(
        &self,
        registrations: &[SignedValidatorRegistrationV1],
    ) -> Result<()> {
        self.execution_layer
            .register_validators(registrations)
            .await
    }

    /// Evicts results that fell out of the retention window and probes the builder.
    pub fn on_slot(&self, slot: Slot) -> JoinHandle<Option<AvailabilityChange>> {
        SLOT_LOG_CONTEXT.set_slot(slot);

        self.payload_results.prune(slot);
        self.execution_layer.on_slot(slot)
    }

    fn payload_future(
        &self,
        context: &Arc<ExecutionPayloadContext>,
        builder_enabled: bool,
    ) -> ExecutionPayloadFuture {
        if builder_enabled {
            ExecutionPayloadFuture::Blinded(
                self.execution_layer
                    .builder_get_header(Arc::clone(context), false),
            )
        } else {
            ExecutionPayloadFuture::Unblinded(
                self.execution_layer
                    .engine_get_payload(Arc::clone(context)),
            )
        }
    }
}
