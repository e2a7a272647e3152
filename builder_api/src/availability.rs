use core::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use arc_swap::ArcSwapOption;
use logging::{info_with_slot, trace_with_slot, warn_with_slot};
use prometheus_metrics::Metrics;
use types::primitives::Slot;

use crate::client::BuilderClient;

#[derive(Clone, PartialEq, Eq, Debug)]
pub enum AvailabilityChange {
    Offline { reason: String },
    BackOnline,
}

/// Last known builder health, refreshed once per slot.
///
/// Without a builder the tracker never probes and reports the builder as unavailable.
pub struct BuilderAvailabilityTracker<B> {
    builder: Option<B>,
    available: AtomicBool,
    last_failure: ArcSwapOption<String>,
    metrics: Option<Arc<Metrics>>,
}

impl<B: BuilderClient> BuilderAvailabilityTracker<B> {
    #[must_use]
    pub fn new(builder: Option<B>, metrics: Option<Arc<Metrics>>) -> Self {
        let available = builder.is_some();

        if let Some(metrics) = metrics.as_ref() {
            metrics.set_builder_available(available);
        }

        Self {
            builder,
            available: AtomicBool::new(available),
            last_failure: ArcSwapOption::empty(),
            metrics,
        }
    }

    #[must_use]
    pub fn is_available(&self) -> bool {
        self.available.load(Ordering::Acquire)
    }

    #[must_use]
    pub fn last_failure(&self) -> Option<Arc<String>> {
        self.last_failure.load_full()
    }

    /// Probes the builder and returns the change in availability, if any.
    pub async fn on_slot(&self, slot: Slot) -> Option<AvailabilityChange> {
        let builder = self.builder.as_ref()?;

        trace_with_slot!("probing builder status at slot {slot}");

        match builder.status().await {
            Ok(()) => {
                self.last_failure.store(None);
                self.update(true).then(|| {
                    info_with_slot!("builder is back online");
                    AvailabilityChange::BackOnline
                })
            }
            Err(error) => {
                let reason = format!("{error:#}");

                self.last_failure.store(Some(Arc::new(reason.clone())));
                self.update(false).then(|| {
                    warn_with_slot!("builder is offline: {reason}");
                    AvailabilityChange::Offline { reason }
                })
            }
        }
    }

    fn update(&self, available: bool) -> bool {
        if let Some(metrics) = self.metrics.as_ref() {
            metrics.set_builder_available(available);
        }

        self.available.swap(available, Ordering::AcqRel) != available
    }
}
