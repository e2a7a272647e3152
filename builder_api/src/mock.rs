use std::collections::HashMap;

use anyhow::{anyhow, bail, Result};
use async_trait::async_trait;
use parking_lot::Mutex;
use thiserror::Error;
use types::{
    containers::{
        ExecutionPayloadAndBlobsBundle, SignedBlindedBeaconBlock, SignedBuilderBid,
        SignedValidatorRegistrationV1,
    },
    primitives::{ExecutionBlockHash, PublicKeyBytes, Slot},
};

use crate::client::BuilderClient;

#[derive(Clone, PartialEq, Eq, Debug)]
pub struct GetHeaderRequest {
    pub slot: Slot,
    pub parent_hash: ExecutionBlockHash,
    pub pubkey: PublicKeyBytes,
}

/// Builder that answers from preloaded responses and records every request it receives.
///
/// Slots without a preloaded header get no bid. Slots without a preloaded payload fail with
/// [`MockBuilderError::UnknownBlindedBlock`].
#[derive(Default)]
pub struct MockBuilderClient {
    status_failure: Mutex<Option<String>>,
    headers: Mutex<HashMap<Slot, Result<SignedBuilderBid, String>>>,
    payloads: Mutex<HashMap<Slot, ExecutionPayloadAndBlobsBundle>>,
    status_requests: Mutex<usize>,
    register_validators_requests: Mutex<usize>,
    registrations: Mutex<Vec<SignedValidatorRegistrationV1>>,
    get_header_requests: Mutex<Vec<GetHeaderRequest>>,
    get_payload_requests: Mutex<Vec<Slot>>,
}

#[async_trait]
impl BuilderClient for MockBuilderClient {
    async fn status(&self) -> Result<()> {
        *self.status_requests.lock() += 1;

        match self.status_failure.lock().clone() {
            Some(message) => Err(anyhow!(message)),
            None => Ok(()),
        }
    }

    async fn register_validators(
        &self,
        registrations: &[SignedValidatorRegistrationV1],
    ) -> Result<()> {
        *self.register_validators_requests.lock() += 1;
        self.registrations.lock().extend_from_slice(registrations);
        Ok(())
    }

    async fn get_header(
        &self,
        slot: Slot,
        parent_hash: ExecutionBlockHash,
        pubkey: PublicKeyBytes,
    ) -> Result<Option<SignedBuilderBid>> {
        self.get_header_requests.lock().push(GetHeaderRequest {
            slot,
            parent_hash,
            pubkey,
        });

        match self.headers.lock().get(&slot).cloned() {
            Some(Ok(builder_bid)) => Ok(Some(builder_bid)),
            Some(Err(message)) => Err(anyhow!(message)),
            None => Ok(None),
        }
    }

    async fn get_payload(
        &self,
        block: &SignedBlindedBeaconBlock,
    ) -> Result<ExecutionPayloadAndBlobsBundle> {
        let slot = block.slot();

        self.get_payload_requests.lock().push(slot);

        match self.payloads.lock().get(&slot).cloned() {
            Some(response) => Ok(response),
            None => bail!(MockBuilderError::UnknownBlindedBlock { slot }),
        }
    }
}

impl MockBuilderClient {
    pub fn set_status_failure(&self, message: Option<&str>) {
        *self.status_failure.lock() = message.map(ToOwned::to_owned);
    }

    pub fn insert_header(&self, slot: Slot, builder_bid: SignedBuilderBid) {
        self.headers.lock().insert(slot, Ok(builder_bid));
    }

    pub fn fail_header(&self, slot: Slot, message: &str) {
        self.headers.lock().insert(slot, Err(message.to_owned()));
    }

    pub fn insert_payload(&self, slot: Slot, response: ExecutionPayloadAndBlobsBundle) {
        self.payloads.lock().insert(slot, response);
    }

    #[must_use]
    pub fn status_request_count(&self) -> usize {
        *self.status_requests.lock()
    }

    #[must_use]
    pub fn registrations(&self) -> Vec<SignedValidatorRegistrationV1> {
        self.registrations.lock().clone()
    }

    #[must_use]
    pub fn get_header_requests(&self) -> Vec<GetHeaderRequest> {
        self.get_header_requests.lock().clone()
    }

    #[must_use]
    pub fn get_payload_requests(&self) -> Vec<Slot> {
        self.get_payload_requests.lock().clone()
    }

    /// Number of requests other than status probes.
    #[must_use]
    pub fn interaction_count(&self) -> usize {
        *self.register_validators_requests.lock()
            + self.get_header_requests.lock().len()
            + self.get_payload_requests.lock().len()
    }
}

#[derive(Debug, Error)]
pub enum MockBuilderError {
    #[error("builder has no payload for blinded block at slot {slot}")]
    UnknownBlindedBlock { slot: Slot },
}
