use thiserror::Error;
use types::{
    consts::MAX_BLOBS_PER_BLOCK,
    containers::SignedBuilderBid,
    nonstandard::{ExecutionPayloadContext, Phase},
    primitives::{ExecutionBlockHash, UnixSeconds, H256},
};

/// Checks a bid returned by the builder before it is trusted.
pub trait BuilderBidValidator: Send + Sync {
    fn validate(
        &self,
        builder_bid: &SignedBuilderBid,
        context: &ExecutionPayloadContext,
    ) -> Result<(), BidValidationError>;
}

/// Accepts every bid. Used when bid validation is disabled.
#[derive(Clone, Copy, Debug)]
pub struct NoopBidValidator;

impl BuilderBidValidator for NoopBidValidator {
    fn validate(
        &self,
        _builder_bid: &SignedBuilderBid,
        _context: &ExecutionPayloadContext,
    ) -> Result<(), BidValidationError> {
        Ok(())
    }
}

#[derive(Clone, Copy, Debug)]
pub struct BidValidator;

impl BuilderBidValidator for BidValidator {
    fn validate(
        &self,
        builder_bid: &SignedBuilderBid,
        context: &ExecutionPayloadContext,
    ) -> Result<(), BidValidationError> {
        let header = builder_bid.header();
        let attributes = &context.payload_building_attributes;

        if builder_bid.phase() != context.phase {
            return Err(BidValidationError::PhaseMismatch {
                expected: context.phase,
                actual: builder_bid.phase(),
            });
        }

        if header.parent_hash != context.parent_hash() {
            return Err(BidValidationError::ParentHashMismatch {
                expected: context.parent_hash(),
                actual: header.parent_hash,
            });
        }

        if header.timestamp != attributes.timestamp {
            return Err(BidValidationError::TimestampMismatch {
                expected: attributes.timestamp,
                actual: header.timestamp,
            });
        }

        if header.prev_randao != attributes.prev_randao {
            return Err(BidValidationError::PrevRandaoMismatch {
                expected: attributes.prev_randao,
                actual: header.prev_randao,
            });
        }

        if !header.matches_phase(context.phase) {
            return Err(BidValidationError::HeaderFieldsMismatch {
                phase: context.phase,
            });
        }

        match (
            context.phase.has_blobs(),
            builder_bid.message.blob_kzg_commitments.as_ref(),
        ) {
            (true, None) => {
                return Err(BidValidationError::MissingBlobKzgCommitments {
                    phase: context.phase,
                })
            }
            (false, Some(_)) => {
                return Err(BidValidationError::UnexpectedBlobKzgCommitments {
                    phase: context.phase,
                })
            }
            (true, Some(commitments)) if commitments.len() > MAX_BLOBS_PER_BLOCK => {
                return Err(BidValidationError::TooManyBlobKzgCommitments {
                    count: commitments.len(),
                })
            }
            _ => {}
        }

        match (
            context.phase.has_execution_requests(),
            builder_bid.message.execution_requests.is_some(),
        ) {
            (true, false) => Err(BidValidationError::MissingExecutionRequests {
                phase: context.phase,
            }),
            (false, true) => Err(BidValidationError::UnexpectedExecutionRequests {
                phase: context.phase,
            }),
            _ => Ok(()),
        }
    }
}

#[derive(Clone, PartialEq, Eq, Debug, Error)]
pub enum BidValidationError {
    #[error("bid is for {actual} but block is being produced for {expected}")]
    PhaseMismatch { expected: Phase, actual: Phase },
    #[error("bid parent hash {actual:?} does not match requested parent hash {expected:?}")]
    ParentHashMismatch {
        expected: ExecutionBlockHash,
        actual: ExecutionBlockHash,
    },
    #[error("bid timestamp {actual} does not match requested timestamp {expected}")]
    TimestampMismatch {
        expected: UnixSeconds,
        actual: UnixSeconds,
    },
    #[error("bid prev_randao {actual:?} does not match requested prev_randao {expected:?}")]
    PrevRandaoMismatch { expected: H256, actual: H256 },
    #[error("bid header does not have the fields of a {phase} header")]
    HeaderFieldsMismatch { phase: Phase },
    #[error("{phase} bid is missing blob KZG commitments")]
    MissingBlobKzgCommitments { phase: Phase },
    #[error("{phase} bid must not contain blob KZG commitments")]
    UnexpectedBlobKzgCommitments { phase: Phase },
    #[error("bid contains too many blob KZG commitments: {count}")]
    TooManyBlobKzgCommitments { count: usize },
    #[error("{phase} bid is missing execution requests")]
    MissingExecutionRequests { phase: Phase },
    #[error("{phase} bid must not contain execution requests")]
    UnexpectedExecutionRequests { phase: Phase },
}
