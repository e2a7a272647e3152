use std::sync::Arc;

use dashmap::{mapref::entry::Entry, DashMap};
use prometheus_metrics::Metrics;
use types::primitives::Slot;

use crate::payload_result::ExecutionPayloadResult;

/// Number of slots before the current one whose results are kept.
pub const PAYLOAD_RESULT_CACHE_RETENTION_SLOTS: u64 = 2;

/// Production results keyed by slot.
///
/// An entry is inserted fully formed while its shard is locked, so readers either see no entry
/// or a complete one. Pruning on slot ticks is the only way entries are removed.
#[derive(Default)]
pub struct PayloadResultCache {
    results: DashMap<Slot, Arc<ExecutionPayloadResult>>,
    metrics: Option<Arc<Metrics>>,
}

impl PayloadResultCache {
    #[must_use]
    pub fn new(metrics: Option<Arc<Metrics>>) -> Self {
        Self {
            results: DashMap::new(),
            metrics,
        }
    }

    /// Returns the result cached for `slot`, calling `produce` only if there is none.
    ///
    /// `produce` runs with the entry locked and must not access the cache.
    pub fn get_or_insert_with(
        &self,
        slot: Slot,
        produce: impl FnOnce() -> ExecutionPayloadResult,
    ) -> Arc<ExecutionPayloadResult> {
        let result = match self.results.entry(slot) {
            Entry::Occupied(occupied) => return Arc::clone(occupied.get()),
            Entry::Vacant(vacant) => Arc::clone(vacant.insert(Arc::new(produce())).value()),
        };

        self.update_size_metric();

        result
    }

    #[must_use]
    pub fn get(&self, slot: Slot) -> Option<Arc<ExecutionPayloadResult>> {
        self.results.get(&slot).map(|entry| Arc::clone(entry.value()))
    }

    pub fn prune(&self, current_slot: Slot) {
        let oldest_retained_slot =
            current_slot.saturating_sub(PAYLOAD_RESULT_CACHE_RETENTION_SLOTS);

        self.results.retain(|slot, _| *slot >= oldest_retained_slot);

        self.update_size_metric();
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.results.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }

    fn update_size_metric(&self) {
        if let Some(metrics) = self.metrics.as_ref() {
            metrics.set_payload_result_cache_size(self.results.len());
        }
    }
}

#[cfg(test)]
mod tests {
    use anyhow::Result;
    use types::{
        nonstandard::{
            ExecutionPayloadContext, ExecutionPayloadWithValue, ForkChoiceState,
            PayloadBuildingAttributes, PayloadId, Phase,
        },
        primitives::Wei,
    };

    use crate::payload_result::{ready_shared, ExecutionPayloadFuture};

    use super::*;

    fn result(slot: Slot) -> ExecutionPayloadResult {
        let context = ExecutionPayloadContext {
            phase: Phase::default(),
            payload_id: PayloadId::default(),
            fork_choice_state: ForkChoiceState {
                slot,
                ..ForkChoiceState::default()
            },
            payload_building_attributes: PayloadBuildingAttributes::default(),
            recent_block_slots: Arc::new([]),
        };

        let payload = ready_shared(ExecutionPayloadWithValue::new(
            Arc::default(),
            Wei::zero(),
        ));

        ExecutionPayloadResult::new(
            Arc::new(context),
            ExecutionPayloadFuture::Unblinded(payload),
            None,
        )
    }

    #[test]
    fn second_insert_for_slot_returns_existing_result() {
        let cache = PayloadResultCache::default();

        let first = cache.get_or_insert_with(5, || result(5));
        let second = cache.get_or_insert_with(5, || panic!("slot 5 is already cached"));

        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn get_returns_nothing_for_unknown_slot() {
        let cache = PayloadResultCache::default();

        cache.get_or_insert_with(5, || result(5));

        assert!(cache.get(5).is_some());
        assert!(cache.get(6).is_none());
    }

    #[test]
    fn prune_keeps_retention_window() -> Result<()> {
        let metrics = Arc::new(Metrics::new()?);
        let cache = PayloadResultCache::new(Some(Arc::clone(&metrics)));

        for slot in 1..=4 {
            cache.get_or_insert_with(slot, || result(slot));
        }

        assert_eq!(metrics.payload_result_cache_size(), 4);

        cache.prune(5);

        assert!(cache.get(1).is_none());
        assert!(cache.get(2).is_none());
        assert!(cache.get(3).is_some());
        assert!(cache.get(4).is_some());
        assert_eq!(metrics.payload_result_cache_size(), 2);

        Ok(())
    }

    #[test]
    fn prune_near_genesis_keeps_everything() {
        let cache = PayloadResultCache::default();

        cache.get_or_insert_with(0, || result(0));
        cache.get_or_insert_with(1, || result(1));
        cache.prune(1);

        assert_eq!(cache.len(), 2);
        assert!(!cache.is_empty());
    }
}
