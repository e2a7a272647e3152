#![expect(clippy::module_name_repetitions)]

use std::{collections::HashMap, sync::Arc};

use anyhow::{bail, Result};
use async_trait::async_trait;
use parking_lot::Mutex;
use thiserror::Error;
use types::{
    containers::BlobsBundle,
    nonstandard::{ExecutionPayloadWithValue, PayloadId, Phase},
};

/// Local execution engine as seen by block production.
///
/// The build itself is requested when the payload ID is issued (through a fork choice update that
/// carries payload attributes). Implementations only retrieve the results of that build.
#[async_trait]
pub trait ExecutionEngine: Send + Sync {
    /// [`engine_getPayload`](https://github.com/ethereum/execution-apis/blob/9707339bc8222f6d43b3bf0a7a91623f7ce52213/src/engine/cancun.md#engine_getpayloadv3)
    async fn get_payload(
        &self,
        payload_id: PayloadId,
        phase: Phase,
    ) -> Result<ExecutionPayloadWithValue>;

    /// Blobs bundle built alongside the payload identified by `payload_id`.
    async fn get_blobs_bundle(&self, payload_id: PayloadId, phase: Phase) -> Result<BlobsBundle>;
}

#[async_trait]
impl<E: ExecutionEngine + ?Sized> ExecutionEngine for Arc<E> {
    async fn get_payload(
        &self,
        payload_id: PayloadId,
        phase: Phase,
    ) -> Result<ExecutionPayloadWithValue> {
        self.as_ref().get_payload(payload_id, phase).await
    }

    async fn get_blobs_bundle(&self, payload_id: PayloadId, phase: Phase) -> Result<BlobsBundle> {
        self.as_ref().get_blobs_bundle(payload_id, phase).await
    }
}

#[derive(Clone, Copy, Debug)]
pub struct NullExecutionEngine;

#[async_trait]
impl ExecutionEngine for NullExecutionEngine {
    async fn get_payload(
        &self,
        _payload_id: PayloadId,
        _phase: Phase,
    ) -> Result<ExecutionPayloadWithValue> {
        bail!(Error::NoExecutionEngine)
    }

    async fn get_blobs_bundle(&self, _payload_id: PayloadId, _phase: Phase) -> Result<BlobsBundle> {
        bail!(Error::NoExecutionEngine)
    }
}

/// Execution engine that serves preloaded payloads and records every request it receives.
#[derive(Default)]
pub struct MockExecutionEngine {
    payloads: Mutex<HashMap<PayloadId, ExecutionPayloadWithValue>>,
    blobs_bundles: Mutex<HashMap<PayloadId, BlobsBundle>>,
    get_payload_requests: Mutex<Vec<PayloadId>>,
    get_blobs_bundle_requests: Mutex<Vec<PayloadId>>,
}

#[async_trait]
impl ExecutionEngine for MockExecutionEngine {
    async fn get_payload(
        &self,
        payload_id: PayloadId,
        _phase: Phase,
    ) -> Result<ExecutionPayloadWithValue> {
        self.get_payload_requests.lock().push(payload_id);

        match self.payloads.lock().get(&payload_id) {
            Some(payload_with_value) => Ok(payload_with_value.clone()),
            None => bail!(Error::UnknownPayloadId { payload_id }),
        }
    }

    async fn get_blobs_bundle(&self, payload_id: PayloadId, _phase: Phase) -> Result<BlobsBundle> {
        self.get_blobs_bundle_requests.lock().push(payload_id);

        match self.blobs_bundles.lock().get(&payload_id) {
            Some(blobs_bundle) => Ok(blobs_bundle.clone()),
            None => bail!(Error::UnknownPayloadId { payload_id }),
        }
    }
}

impl MockExecutionEngine {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert_payload(
        &self,
        payload_id: PayloadId,
        payload_with_value: ExecutionPayloadWithValue,
    ) {
        self.payloads.lock().insert(payload_id, payload_with_value);
    }

    pub fn insert_blobs_bundle(&self, payload_id: PayloadId, blobs_bundle: BlobsBundle) {
        self.blobs_bundles.lock().insert(payload_id, blobs_bundle);
    }

    #[must_use]
    pub fn get_payload_requests(&self) -> Vec<PayloadId> {
        self.get_payload_requests.lock().clone()
    }

    #[must_use]
    pub fn get_blobs_bundle_requests(&self) -> Vec<PayloadId> {
        self.get_blobs_bundle_requests.lock().clone()
    }
}

#[derive(Debug, Error)]
pub enum Error {
    #[error("no execution engine configured")]
    NoExecutionEngine,
    #[error("execution engine has no build for payload ID {payload_id}")]
    UnknownPayloadId { payload_id: PayloadId },
}
