use std::sync::Arc;

use anyhow::{bail, ensure, Context as _, Result};
use builder_api::{
    AvailabilityChange, BuilderApi, BuilderAvailabilityTracker, BuilderBidValidator,
    BuilderCircuitBreaker, BuilderClient, BuilderConfig, NoopBidValidator, NoopCircuitBreaker,
};
use execution_engine::ExecutionEngine;
use logging::{debug_with_slot, error_with_slot, info_with_slot, warn_with_slot};
use prometheus_metrics::Metrics;
use reqwest::Client;
use tokio::task::JoinHandle;
use types::{
    consts::MAX_BLOBS_PER_BLOCK,
    containers::{
        BlobsBundle, ExecutionPayloadAndBlobsBundle, ExecutionPayloadHeader,
        SignedBlindedBeaconBlock, SignedValidatorRegistrationV1,
    },
    nonstandard::{ExecutionPayloadContext, ExecutionPayloadWithValue},
    primitives::{PublicKeyBytes, Slot, Wei},
};

use crate::{
    error::Error,
    misc::{FallbackReason, HeaderWithFallbackData, PayloadSource},
    payload_result::{spawn_shared, ExecutionPayloadFuture, ExecutionPayloadResult, SharedFuture},
};

pub const DEFAULT_BUILDER_BOOST_FACTOR: u64 = 100;

#[derive(Clone, Copy, Debug)]
pub struct Options {
    /// Percentage applied to builder bid values before comparing them to local payload values.
    pub builder_boost_factor: u64,
    pub blobs_bundle_validation: bool,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            builder_boost_factor: DEFAULT_BUILDER_BOOST_FACTOR,
            blobs_bundle_validation: true,
        }
    }
}

/// Chooses between the local execution engine and the builder for each slot.
pub struct ExecutionLayer<E, B> {
    execution_engine: Arc<E>,
    builder: Option<Arc<B>>,
    availability: Arc<BuilderAvailabilityTracker<Arc<B>>>,
    circuit_breaker: Arc<dyn BuilderCircuitBreaker>,
    bid_validator: Arc<dyn BuilderBidValidator>,
    metrics: Option<Arc<Metrics>>,
    options: Options,
}

impl<E, B> Clone for ExecutionLayer<E, B> {
    fn clone(&self) -> Self {
        Self {
            execution_engine: Arc::clone(&self.execution_engine),
            builder: self.builder.as_ref().map(Arc::clone),
            availability: Arc::clone(&self.availability),
            circuit_breaker: Arc::clone(&self.circuit_breaker),
            bid_validator: Arc::clone(&self.bid_validator),
            metrics: self.metrics.as_ref().map(Arc::clone),
            options: self.options,
        }
    }
}

impl<E: ExecutionEngine + 'static> ExecutionLayer<E, BuilderApi> {
    /// Connects to the builder at `builder_config.builder_api_url` if a config is given.
    #[must_use]
    pub fn with_builder_config(
        execution_engine: Arc<E>,
        builder_config: Option<BuilderConfig>,
        client: Client,
        metrics: Option<Arc<Metrics>>,
        options: Options,
    ) -> Self {
        let (circuit_breaker, bid_validator): (
            Arc<dyn BuilderCircuitBreaker>,
            Arc<dyn BuilderBidValidator>,
        ) = match builder_config.as_ref() {
            Some(config) => (config.circuit_breaker(), config.bid_validator()),
            None => (Arc::new(NoopCircuitBreaker), Arc::new(NoopBidValidator)),
        };

        let builder = builder_config
            .map(|config| Arc::new(BuilderApi::new(config, client, metrics.clone())));

        Self::new(
            execution_engine,
            builder,
            circuit_breaker,
            bid_validator,
            metrics,
            options,
        )
    }
}

impl<E: ExecutionEngine + 'static, B: BuilderClient + 'static> ExecutionLayer<E, B> {
    #[must_use]
    pub fn new(
        execution_engine: Arc<E>,
        builder: Option<Arc<B>>,
        circuit_breaker: Arc<dyn BuilderCircuitBreaker>,
        bid_validator: Arc<dyn BuilderBidValidator>,
        metrics: Option<Arc<Metrics>>,
        options: Options,
    ) -> Self {
        let availability = Arc::new(BuilderAvailabilityTracker::new(
            builder.clone(),
            metrics.clone(),
        ));

        Self {
            execution_engine,
            builder,
            availability,
            circuit_breaker,
            bid_validator,
            metrics,
            options,
        }
    }

    #[must_use]
    pub fn builder(&self) -> Option<&Arc<B>> {
        self.builder.as_ref()
    }

    #[must_use]
    pub fn availability(&self) -> &BuilderAvailabilityTracker<Arc<B>> {
        &self.availability
    }

    #[must_use]
    pub const fn options(&self) -> Options {
        self.options
    }

    /// Produces the header for a blinded block.
    ///
    /// The local payload is requested before anything else so it is ready if the builder cannot
    /// be used. The returned future completes only after every request it started has settled.
    #[must_use]
    pub fn builder_get_header(
        &self,
        context: Arc<ExecutionPayloadContext>,
        force_local: bool,
    ) -> SharedFuture<HeaderWithFallbackData> {
        let local = self.spawn_local_payload(&context);
        let execution_layer = self.clone();

        spawn_shared(async move {
            execution_layer
                .select_header(&context, local, force_local)
                .await
        })
    }

    /// Produces an unblinded payload using only the local execution engine.
    #[must_use]
    pub fn engine_get_payload(
        &self,
        context: Arc<ExecutionPayloadContext>,
    ) -> SharedFuture<ExecutionPayloadWithValue> {
        let execution_layer = self.clone();

        spawn_shared(async move {
            let local = execution_layer.local_payload(&context).await?;
            execution_layer.record_source(PayloadSource::LocalEngine);
            Ok(local)
        })
    }

    #[must_use]
    pub fn engine_get_blobs_bundle(
        &self,
        context: Arc<ExecutionPayloadContext>,
    ) -> SharedFuture<Arc<BlobsBundle>> {
        let execution_layer = self.clone();

        spawn_shared(async move { execution_layer.local_blobs_bundle(&context).await })
    }

    /// Returns the full payload for a signed blinded block.
    ///
    /// Payloads built locally are returned from `cached` without further requests.
    /// Payloads offered by the builder are requested from it and checked against the header it
    /// offered. Without a cached result the builder is the only remaining source.
    pub async fn builder_get_payload(
        &self,
        block: &SignedBlindedBeaconBlock,
        cached: Option<&ExecutionPayloadResult>,
    ) -> Result<ExecutionPayloadAndBlobsBundle> {
        let slot = block.slot();

        let Some(cached) = cached else {
            debug_with_slot!("no execution payload cached for slot {slot}, asking builder");

            let Some(builder) = self.builder.as_ref() else {
                bail!(Error::PayloadUnavailable { slot });
            };

            return builder
                .get_payload(block)
                .await
                .context(Error::PayloadUnavailable { slot });
        };

        match cached.payload() {
            ExecutionPayloadFuture::Blinded(header) => {
                let header = header.clone().await?;

                match header.fallback {
                    Some(fallback) => {
                        debug_with_slot!(
                            "revealing local execution payload for slot {slot} \
                             (fallback reason: {})",
                            fallback.reason,
                        );

                        Ok(ExecutionPayloadAndBlobsBundle {
                            execution_payload: fallback.execution_payload,
                            blobs_bundle: fallback.blobs_bundle,
                        })
                    }
                    None => self.reveal_builder_payload(block, &header.header).await,
                }
            }
            ExecutionPayloadFuture::Unblinded(local) => {
                let execution_payload = local.clone().await?.execution_payload;

                let blobs_bundle = match cached.blobs_bundle_future() {
                    Some(blobs_bundle) => Some(blobs_bundle.clone().await?),
                    None => None,
                };

                Ok(ExecutionPayloadAndBlobsBundle {
                    execution_payload,
                    blobs_bundle,
                })
            }
        }
    }

    pub async fn register_validators(
        &self,
        registrations: &[SignedValidatorRegistrationV1],
    ) -> Result<()> {
        let Some(builder) = self.builder.as_ref() else {
            bail!(Error::BuilderNotConfigured);
        };

        builder.register_validators(registrations).await
    }

    /// Probes the builder in the background. Does nothing if no builder is configured.
    pub fn on_slot(&self, slot: Slot) -> JoinHandle<Option<AvailabilityChange>> {
        let availability = Arc::clone(&self.availability);

        tokio::spawn(async move { availability.on_slot(slot).await })
    }

    async fn select_header(
        &self,
        context: &ExecutionPayloadContext,
        local: SharedFuture<ExecutionPayloadWithValue>,
        force_local: bool,
    ) -> Result<HeaderWithFallbackData> {
        let slot = context.slot();

        let (builder, public_key) = match self.builder_to_query(context, force_local) {
            Ok(builder_and_public_key) => builder_and_public_key,
            Err(reason) => {
                let local = local.await?;
                return self.fall_back(context, local, reason).await;
            }
        };

        let (builder_bid, local) = futures::join!(
            builder.get_header(slot, context.parent_hash(), public_key),
            local
        );

        let local = local?;

        let reason = match builder_bid {
            Ok(Some(builder_bid)) => match self.bid_validator.validate(&builder_bid, context) {
                Ok(()) => {
                    let builder_value = builder_bid.value();
                    let boosted_builder_value = self.boosted_value(builder_value);

                    if local.value <= boosted_builder_value {
                        let header = HeaderWithFallbackData::from_builder(builder_bid);
                        self.record_source(header.source());
                        return Ok(header);
                    }

                    info_with_slot!(
                        "using more profitable local payload for slot {slot}: \
                         local value: {}, builder value: {builder_value}, \
                         boosted builder value: {boosted_builder_value}",
                        local.value,
                    );

                    FallbackReason::LocalValueHigher
                }
                Err(error) => {
                    warn_with_slot!("builder bid for slot {slot} is invalid: {error}");
                    FallbackReason::BuilderError
                }
            },
            Ok(None) => {
                debug_with_slot!("builder has no bid for slot {slot}");
                FallbackReason::BuilderHeaderNotAvailable
            }
            Err(error) => {
                warn_with_slot!(
                    "failed to get execution payload header from builder for slot {slot}: \
                     {error:#}",
                );
                FallbackReason::BuilderError
            }
        };

        self.fall_back(context, local, reason).await
    }

    fn builder_to_query(
        &self,
        context: &ExecutionPayloadContext,
        force_local: bool,
    ) -> Result<(&Arc<B>, PublicKeyBytes), FallbackReason> {
        if force_local {
            return Err(FallbackReason::Forced);
        }

        let Some(builder) = self.builder.as_ref() else {
            return Err(FallbackReason::BuilderNotAvailable);
        };

        let Some(public_key) = context.validator_registration_public_key() else {
            return Err(FallbackReason::ValidatorNotRegistered);
        };

        if let Err(error) = self.circuit_breaker.check(context) {
            info_with_slot!(
                "builder circuit breaker engaged for slot {}: {error}",
                context.slot(),
            );

            return Err(FallbackReason::Forced);
        }

        if !self.availability.is_available() {
            return Err(FallbackReason::BuilderNotAvailable);
        }

        Ok((builder, public_key))
    }

    async fn fall_back(
        &self,
        context: &ExecutionPayloadContext,
        local: ExecutionPayloadWithValue,
        reason: FallbackReason,
    ) -> Result<HeaderWithFallbackData> {
        debug_with_slot!(
            "using local execution payload for slot {} (fallback reason: {reason})",
            context.slot(),
        );

        let blobs_bundle = if context.phase.has_blobs() {
            Some(self.local_blobs_bundle(context).await?)
        } else {
            None
        };

        let header = HeaderWithFallbackData::from_fallback(local, blobs_bundle, reason);

        self.record_source(header.source());

        Ok(header)
    }

    async fn reveal_builder_payload(
        &self,
        block: &SignedBlindedBeaconBlock,
        offered_header: &ExecutionPayloadHeader,
    ) -> Result<ExecutionPayloadAndBlobsBundle> {
        let Some(builder) = self.builder.as_ref() else {
            bail!(Error::BuilderNotConfigured);
        };

        let response = builder.get_payload(block).await?;

        let header_root = offered_header.root();
        let payload_root = response.execution_payload.header_root();

        ensure!(
            header_root == payload_root,
            Error::RevealedPayloadMismatch {
                header_root,
                payload_root,
            },
        );

        Ok(response)
    }

    fn spawn_local_payload(
        &self,
        context: &Arc<ExecutionPayloadContext>,
    ) -> SharedFuture<ExecutionPayloadWithValue> {
        let execution_layer = self.clone();
        let context = Arc::clone(context);

        spawn_shared(async move { execution_layer.local_payload(&context).await })
    }

    async fn local_payload(
        &self,
        context: &ExecutionPayloadContext,
    ) -> Result<ExecutionPayloadWithValue> {
        let _timer = self
            .metrics
            .as_ref()
            .map(|metrics| metrics.local_execution_payload_times.start_timer());

        self.execution_engine
            .get_payload(context.payload_id, context.phase)
            .await
            .inspect_err(|error| {
                error_with_slot!(
                    "local execution engine failed to produce payload for slot {}: {error:#}",
                    context.slot(),
                );
            })
    }

    async fn local_blobs_bundle(
        &self,
        context: &ExecutionPayloadContext,
    ) -> Result<Arc<BlobsBundle>> {
        let _timer = self
            .metrics
            .as_ref()
            .map(|metrics| metrics.local_blobs_bundle_times.start_timer());

        let blobs_bundle = self
            .execution_engine
            .get_blobs_bundle(context.payload_id, context.phase)
            .await
            .inspect_err(|error| {
                error_with_slot!(
                    "local execution engine failed to produce blobs bundle for slot {}: {error:#}",
                    context.slot(),
                );
            })?;

        if self.options.blobs_bundle_validation {
            validate_blobs_bundle(&blobs_bundle)?;
        }

        Ok(Arc::new(blobs_bundle))
    }

    fn boosted_value(&self, builder_value: Wei) -> Wei {
        builder_value.saturating_mul(Wei::from(self.options.builder_boost_factor))
            / Wei::from(DEFAULT_BUILDER_BOOST_FACTOR)
    }

    fn record_source(&self, source: PayloadSource) {
        if let Some(metrics) = self.metrics.as_ref() {
            metrics.register_execution_payload_source(&[
                source.source_label(),
                source.fallback_reason_label(),
            ]);
        }
    }
}

fn validate_blobs_bundle(blobs_bundle: &BlobsBundle) -> Result<()> {
    let BlobsBundle {
        commitments,
        proofs,
        blobs,
    } = blobs_bundle;

    ensure!(
        commitments.len() == proofs.len() && proofs.len() == blobs.len(),
        Error::InvalidBlobsBundle {
            commitments: commitments.len(),
            proofs: proofs.len(),
            blobs: blobs.len(),
        },
    );

    ensure!(
        blobs.len() <= MAX_BLOBS_PER_BLOCK,
        Error::TooManyBlobs { count: blobs.len() },
    );

    Ok(())
}
