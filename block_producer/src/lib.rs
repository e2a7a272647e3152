pub use crate::{
    block_production_manager::BlockProductionManager,
    error::Error,
    execution_layer::{ExecutionLayer, Options, DEFAULT_BUILDER_BOOST_FACTOR},
    misc::{FallbackData, FallbackReason, HeaderWithFallbackData, PayloadSource},
    payload_result::{
        is_blobs_bundle_placeholder, ready_shared, spawn_shared, ExecutionPayloadFuture,
        ExecutionPayloadResult, SharedError, SharedFuture, BLOBS_BUNDLE_BUILDER_PLACEHOLDER,
    },
    payload_result_cache::{PayloadResultCache, PAYLOAD_RESULT_CACHE_RETENTION_SLOTS},
};

mod block_production_manager;
mod error;
mod execution_layer;
mod misc;
mod payload_result;
mod payload_result_cache;

#[cfg(test)]
mod test_utils;
