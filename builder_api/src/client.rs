use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use types::{
    containers::{
        ExecutionPayloadAndBlobsBundle, SignedBlindedBeaconBlock, SignedBuilderBid,
        SignedValidatorRegistrationV1,
    },
    primitives::{ExecutionBlockHash, PublicKeyBytes, Slot},
};

/// Transport used to talk to a builder relay.
///
/// Every call may fail or time out. Callers treat failures as ordinary builder errors.
#[async_trait]
pub trait BuilderClient: Send + Sync {
    /// [`status`](https://ethereum.github.io/builder-specs/#/Builder/status)
    async fn status(&self) -> Result<()>;

    /// [`registerValidator`](https://ethereum.github.io/builder-specs/#/Builder/registerValidator)
    async fn register_validators(
        &self,
        registrations: &[SignedValidatorRegistrationV1],
    ) -> Result<()>;

    /// [`getHeader`](https://ethereum.github.io/builder-specs/#/Builder/getHeader)
    ///
    /// Returns `None` if the builder has no bid for the slot.
    async fn get_header(
        &self,
        slot: Slot,
        parent_hash: ExecutionBlockHash,
        pubkey: PublicKeyBytes,
    ) -> Result<Option<SignedBuilderBid>>;

    /// [`submitBlindedBlock`](https://ethereum.github.io/builder-specs/#/Builder/submitBlindedBlock)
    async fn get_payload(
        &self,
        block: &SignedBlindedBeaconBlock,
    ) -> Result<ExecutionPayloadAndBlobsBundle>;
}

#[async_trait]
impl<B: BuilderClient + ?Sized> BuilderClient for Arc<B> {
    async fn status(&self) -> Result<()> {
        self.as_ref().status().await
    }

    async fn register_validators(
        &self,
        registrations: &[SignedValidatorRegistrationV1],
    ) -> Result<()> {
        self.as_ref().register_validators(registrations).await
    }

    async fn get_header(
        &self,
        slot: Slot,
        parent_hash: ExecutionBlockHash,
        pubkey: PublicKeyBytes,
    ) -> Result<Option<SignedBuilderBid>> {
        self.as_ref().get_header(slot, parent_hash, pubkey).await
    }

    async fn get_payload(
        &self,
        block: &SignedBlindedBeaconBlock,
    ) -> Result<ExecutionPayloadAndBlobsBundle> {
        self.as_ref().get_payload(block).await
    }
}
