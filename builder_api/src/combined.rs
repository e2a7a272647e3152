use std::sync::Arc;

use serde::Deserialize;
use types::{
    containers::{ExecutionPayload, ExecutionPayloadAndBlobsBundle, SignedBuilderBid},
    nonstandard::Phase,
};

#[derive(Debug, Deserialize)]
#[serde(
    deny_unknown_fields,
    rename_all = "lowercase",
    tag = "version",
    content = "data"
)]
pub enum SignedBuilderBidResponse {
    Bellatrix(SignedBuilderBid),
    Capella(SignedBuilderBid),
    Deneb(SignedBuilderBid),
    Electra(SignedBuilderBid),
}

impl SignedBuilderBidResponse {
    #[must_use]
    pub const fn phase(&self) -> Phase {
        match self {
            Self::Bellatrix(_) => Phase::Bellatrix,
            Self::Capella(_) => Phase::Capella,
            Self::Deneb(_) => Phase::Deneb,
            Self::Electra(_) => Phase::Electra,
        }
    }
}

impl From<SignedBuilderBidResponse> for SignedBuilderBid {
    fn from(response: SignedBuilderBidResponse) -> Self {
        let phase = response.phase();

        let (SignedBuilderBidResponse::Bellatrix(builder_bid)
        | SignedBuilderBidResponse::Capella(builder_bid)
        | SignedBuilderBidResponse::Deneb(builder_bid)
        | SignedBuilderBidResponse::Electra(builder_bid)) = response;

        Self {
            phase,
            ..builder_bid
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(
    deny_unknown_fields,
    rename_all = "lowercase",
    tag = "version",
    content = "data"
)]
pub enum ExecutionPayloadResponse {
    Bellatrix(ExecutionPayload),
    Capella(ExecutionPayload),
    Deneb(ExecutionPayloadAndBlobsBundle),
    Electra(ExecutionPayloadAndBlobsBundle),
}

impl ExecutionPayloadResponse {
    #[must_use]
    pub const fn phase(&self) -> Phase {
        match self {
            Self::Bellatrix(_) => Phase::Bellatrix,
            Self::Capella(_) => Phase::Capella,
            Self::Deneb(_) => Phase::Deneb,
            Self::Electra(_) => Phase::Electra,
        }
    }
}

impl From<ExecutionPayloadResponse> for ExecutionPayloadAndBlobsBundle {
    fn from(response: ExecutionPayloadResponse) -> Self {
        match response {
            ExecutionPayloadResponse::Bellatrix(execution_payload)
            | ExecutionPayloadResponse::Capella(execution_payload) => {
                Arc::new(execution_payload).into()
            }
            ExecutionPayloadResponse::Deneb(payload_with_blobs_bundle)
            | ExecutionPayloadResponse::Electra(payload_with_blobs_bundle) => {
                payload_with_blobs_bundle
            }
        }
    }
}
