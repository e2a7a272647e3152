use anyhow::Result;
use prometheus::{histogram_opts, opts, Histogram, IntCounterVec, IntGauge};
use tracing::warn;

#[derive(Debug)]
pub struct Metrics {
    // Interop metrics
    // Name and labels are shared with other consensus clients' dashboards.
    pub execution_payload_source: IntCounterVec,

    // Payload source arbitration
    pub payload_result_cache_size: IntGauge,

    // Local execution engine
    pub local_execution_payload_times: Histogram,
    pub local_blobs_bundle_times: Histogram,

    // Builder API
    pub builder_available: IntGauge,
    pub builder_status_times: Histogram,
    pub builder_register_validator_times: Histogram,
    pub builder_get_execution_payload_header_times: Histogram,
    pub builder_post_blinded_block_times: Histogram,
}

impl Metrics {
    pub fn new() -> Result<Self> {
        Ok(Self {
            // Interop metrics
            execution_payload_source: IntCounterVec::new(
                opts!(
                    "execution_payload_source",
                    "Number of execution payloads produced by source and fallback reason"
                ),
                &["source", "fallback_reason"],
            )?,

            // Payload source arbitration
            payload_result_cache_size: IntGauge::new(
                "PAYLOAD_RESULT_CACHE_SIZE",
                "Number of slots with cached execution payload results",
            )?,

            // Local execution engine
            local_execution_payload_times: Histogram::with_opts(histogram_opts!(
                "LOCAL_EXECUTION_PAYLOAD_TIMES",
                "Local execution payload times",
            ))?,

            local_blobs_bundle_times: Histogram::with_opts(histogram_opts!(
                "LOCAL_BLOBS_BUNDLE_TIMES",
                "Local blobs bundle times",
            ))?,

            // Builder API
            builder_available: IntGauge::new(
                "BUILDER_AVAILABLE",
                "Whether the builder responded to the latest status probe",
            )?,

            builder_status_times: Histogram::with_opts(histogram_opts!(
                "BUILDER_STATUS_TIMES",
                "Builder status times",
            ))?,

            builder_register_validator_times: Histogram::with_opts(histogram_opts!(
                "BUILDER_REGISTER_VALIDATORS_TIMES",
                "Builder register validators times",
            ))?,

            builder_get_execution_payload_header_times: Histogram::with_opts(histogram_opts!(
                "BUILDER_GET_EXECUTION_PAYLOAD_HEADER_TIMES",
                "Builder get execution payload header times",
            ))?,

            builder_post_blinded_block_times: Histogram::with_opts(histogram_opts!(
                "BUILDER_POST_BLINDED_BLOCK_TIMES",
                "Builder post blinded block times",
            ))?,
        })
    }

    pub fn register_with_default_metrics(&self) -> Result<()> {
        let default_registry = prometheus::default_registry();

        default_registry.register(Box::new(self.execution_payload_source.clone()))?;
        default_registry.register(Box::new(self.payload_result_cache_size.clone()))?;
        default_registry.register(Box::new(self.local_execution_payload_times.clone()))?;
        default_registry.register(Box::new(self.local_blobs_bundle_times.clone()))?;
        default_registry.register(Box::new(self.builder_available.clone()))?;
        default_registry.register(Box::new(self.builder_status_times.clone()))?;
        default_registry.register(Box::new(self.builder_register_validator_times.clone()))?;
        default_registry.register(Box::new(
            self.builder_get_execution_payload_header_times.clone(),
        ))?;
        default_registry.register(Box::new(self.builder_post_blinded_block_times.clone()))?;

        Ok(())
    }

    // Payload source arbitration
    pub fn register_execution_payload_source(&self, labels: &[&str]) {
        match self
            .execution_payload_source
            .get_metric_with_label_values(labels)
        {
            Ok(counter) => counter.inc(),
            Err(error) => {
                warn!("unable to register execution payload source for {labels:?}: {error:?}")
            }
        }
    }

    #[must_use]
    pub fn execution_payload_source_count(&self, labels: &[&str]) -> u64 {
        self.execution_payload_source
            .get_metric_with_label_values(labels)
            .map(|counter| counter.get())
            .unwrap_or_default()
    }

    pub fn set_payload_result_cache_size(&self, size: usize) {
        self.payload_result_cache_size
            .set(i64::try_from(size).unwrap_or(i64::MAX));
    }

    #[must_use]
    pub fn payload_result_cache_size(&self) -> i64 {
        self.payload_result_cache_size.get()
    }

    // Builder API
    pub fn set_builder_available(&self, available: bool) {
        self.builder_available.set(available.into());
    }

    #[must_use]
    pub fn builder_available(&self) -> bool {
        self.builder_available.get() != 0
    }
}
