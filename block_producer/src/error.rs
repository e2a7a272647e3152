use thiserror::Error;
use types::primitives::{Slot, H256};

#[derive(Debug, Error)]
pub enum Error {
    #[error("no execution payload available for slot {slot}")]
    PayloadUnavailable { slot: Slot },
    #[error("builder is not configured")]
    BuilderNotConfigured,
    #[error(
        "payload revealed by builder does not match header it offered \
         (header root: {header_root:?}, payload root: {payload_root:?})"
    )]
    RevealedPayloadMismatch { header_root: H256, payload_root: H256 },
    #[error(
        "blobs bundle has mismatched lengths \
         (commitments: {commitments}, proofs: {proofs}, blobs: {blobs})"
    )]
    InvalidBlobsBundle {
        commitments: usize,
        proofs: usize,
        blobs: usize,
    },
    #[error("blobs bundle contains too many blobs: {count}")]
    TooManyBlobs { count: usize },
}
