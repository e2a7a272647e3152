pub use crate::{
    api::{Api as BuilderApi, BuilderApiError},
    availability::{AvailabilityChange, BuilderAvailabilityTracker},
    bid_validator::{BidValidationError, BidValidator, BuilderBidValidator, NoopBidValidator},
    circuit_breaker::{BuilderCircuitBreaker, NoopCircuitBreaker, SkippedSlotsCircuitBreaker},
    client::BuilderClient,
    config::{
        Config as BuilderConfig, DEFAULT_BUILDER_MAX_SKIPPED_SLOTS,
        DEFAULT_BUILDER_MAX_SKIPPED_SLOTS_PER_EPOCH,
    },
    mock::{GetHeaderRequest, MockBuilderClient, MockBuilderError},
};

pub mod combined;
pub mod consts;

mod api;
mod availability;
mod bid_validator;
mod circuit_breaker;
mod client;
mod config;
mod mock;
