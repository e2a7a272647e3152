use std::sync::Arc;

use reqwest::Url;

use crate::{
    bid_validator::{BidValidator, BuilderBidValidator, NoopBidValidator},
    circuit_breaker::{BuilderCircuitBreaker, NoopCircuitBreaker, SkippedSlotsCircuitBreaker},
};

pub const DEFAULT_BUILDER_MAX_SKIPPED_SLOTS_PER_EPOCH: u64 = 5;
pub const DEFAULT_BUILDER_MAX_SKIPPED_SLOTS: u64 = 3;

#[expect(clippy::struct_field_names)]
#[derive(Clone, Debug)]
pub struct Config {
    pub builder_api_url: Url,
    pub builder_disable_checks: bool,
    pub builder_disable_bid_validation: bool,
    pub builder_max_skipped_slots_per_epoch: u64,
    pub builder_max_skipped_slots: u64,
}

impl Config {
    #[must_use]
    pub const fn new(builder_api_url: Url) -> Self {
        Self {
            builder_api_url,
            builder_disable_checks: false,
            builder_disable_bid_validation: false,
            builder_max_skipped_slots_per_epoch: DEFAULT_BUILDER_MAX_SKIPPED_SLOTS_PER_EPOCH,
            builder_max_skipped_slots: DEFAULT_BUILDER_MAX_SKIPPED_SLOTS,
        }
    }

    #[must_use]
    pub fn circuit_breaker(&self) -> Arc<dyn BuilderCircuitBreaker> {
        if self.builder_disable_checks {
            return Arc::new(NoopCircuitBreaker);
        }

        Arc::new(SkippedSlotsCircuitBreaker::new(
            self.builder_max_skipped_slots,
            self.builder_max_skipped_slots_per_epoch,
        ))
    }

    #[must_use]
    pub fn bid_validator(&self) -> Arc<dyn BuilderBidValidator> {
        if self.builder_disable_bid_validation {
            return Arc::new(NoopBidValidator);
        }

        Arc::new(BidValidator)
    }
}
