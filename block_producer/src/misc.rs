use std::sync::Arc;

use strum::{Display, IntoStaticStr};
use types::{
    containers::{BlobsBundle, ExecutionPayload, ExecutionPayloadHeader, SignedBuilderBid},
    nonstandard::ExecutionPayloadWithValue,
    primitives::{KzgCommitment, Wei},
};

/// Why a blinded production round ended with a locally built payload.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Display, IntoStaticStr)]
#[strum(serialize_all = "snake_case")]
pub enum FallbackReason {
    BuilderNotAvailable,
    BuilderHeaderNotAvailable,
    BuilderError,
    ValidatorNotRegistered,
    LocalValueHigher,
    Forced,
}

/// Where the execution payload for a slot came from.
///
/// A fallback reason can only be attached to [`PayloadSource::BuilderWithLocalFallback`],
/// so a builder payload with a fallback reason cannot be expressed.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum PayloadSource {
    LocalEngine,
    Builder,
    BuilderWithLocalFallback(FallbackReason),
}

impl PayloadSource {
    #[must_use]
    pub const fn fallback_reason(self) -> Option<FallbackReason> {
        match self {
            Self::BuilderWithLocalFallback(reason) => Some(reason),
            Self::LocalEngine | Self::Builder => None,
        }
    }

    #[must_use]
    pub const fn source_label(self) -> &'static str {
        match self {
            Self::LocalEngine => "local_engine",
            Self::Builder => "builder",
            Self::BuilderWithLocalFallback(_) => "builder_with_local_fallback",
        }
    }

    #[must_use]
    pub fn fallback_reason_label(self) -> &'static str {
        self.fallback_reason().map_or("none", Into::into)
    }
}

/// Locally built payload used in place of a builder bid.
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct FallbackData {
    pub execution_payload: Arc<ExecutionPayload>,
    /// Present from the first phase with blobs onward.
    pub blobs_bundle: Option<Arc<BlobsBundle>>,
    pub reason: FallbackReason,
}

/// Header chosen for a blinded block along with the local payload it was built from, if any.
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct HeaderWithFallbackData {
    pub header: Arc<ExecutionPayloadHeader>,
    pub blob_kzg_commitments: Option<Vec<KzgCommitment>>,
    pub value: Wei,
    pub fallback: Option<FallbackData>,
}

impl HeaderWithFallbackData {
    #[must_use]
    pub fn from_builder(builder_bid: SignedBuilderBid) -> Self {
        let message = builder_bid.message;

        Self {
            header: message.header,
            blob_kzg_commitments: message.blob_kzg_commitments,
            value: message.value,
            fallback: None,
        }
    }

    #[must_use]
    pub fn from_fallback(
        local: ExecutionPayloadWithValue,
        blobs_bundle: Option<Arc<BlobsBundle>>,
        reason: FallbackReason,
    ) -> Self {
        let ExecutionPayloadWithValue {
            execution_payload,
            value,
        } = local;

        Self {
            header: Arc::new(execution_payload.to_header()),
            blob_kzg_commitments: blobs_bundle
                .as_ref()
                .map(|blobs_bundle| blobs_bundle.commitments.clone()),
            value,
            fallback: Some(FallbackData {
                execution_payload,
                blobs_bundle,
                reason,
            }),
        }
    }

    #[must_use]
    pub fn source(&self) -> PayloadSource {
        match self.fallback.as_ref() {
            Some(fallback) => PayloadSource::BuilderWithLocalFallback(fallback.reason),
            None => PayloadSource::Builder,
        }
    }
}
