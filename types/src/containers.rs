use std::sync::Arc;

use derive_more::From;
use serde::{Deserialize, Serialize};
use sha2::{Digest as _, Sha256};

use crate::{
    nonstandard::Phase,
    primitives::{
        DepositIndex, ExecutionAddress, ExecutionBlockHash, ExecutionBlockNumber, Gas, Gwei,
        KzgCommitment, KzgProof, PublicKeyBytes, SignatureBytes, Slot, UnixSeconds,
        ValidatorIndex, Wei, WithdrawalIndex, H256,
    },
};

#[derive(Clone, PartialEq, Eq, Default, Debug, From, Deserialize, Serialize)]
#[serde(transparent)]
pub struct Transaction(#[serde(with = "serde_utils::prefixed_hex_or_bytes_vec")] Vec<u8>);

impl AsRef<[u8]> for Transaction {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

#[derive(Clone, PartialEq, Eq, Default, Debug, From, Deserialize, Serialize)]
#[serde(transparent)]
pub struct Blob(#[serde(with = "serde_utils::prefixed_hex_or_bytes_vec")] Vec<u8>);

impl AsRef<[u8]> for Blob {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

#[derive(Clone, PartialEq, Eq, Default, Debug, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ExecutionPayload {
    pub parent_hash: ExecutionBlockHash,
    pub fee_recipient: ExecutionAddress,
    pub state_root: H256,
    pub receipts_root: H256,
    pub prev_randao: H256,
    #[serde(with = "serde_utils::string_or_native")]
    pub block_number: ExecutionBlockNumber,
    #[serde(with = "serde_utils::string_or_native")]
    pub gas_limit: Gas,
    #[serde(with = "serde_utils::string_or_native")]
    pub gas_used: Gas,
    #[serde(with = "serde_utils::string_or_native")]
    pub timestamp: UnixSeconds,
    #[serde(with = "serde_utils::prefixed_hex_or_bytes_vec")]
    pub extra_data: Vec<u8>,
    #[serde(with = "serde_utils::uint256_as_decimal_string")]
    pub base_fee_per_gas: Wei,
    pub block_hash: ExecutionBlockHash,
    pub transactions: Vec<Transaction>,
    /// Present from Capella onward.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub withdrawals: Option<Vec<Withdrawal>>,
    /// Present from Deneb onward, as is `excess_blob_gas`.
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        with = "serde_utils::string_or_native_option"
    )]
    pub blob_gas_used: Option<Gas>,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        with = "serde_utils::string_or_native_option"
    )]
    pub excess_blob_gas: Option<Gas>,
}

impl ExecutionPayload {
    #[must_use]
    pub fn transactions_root(&self) -> H256 {
        let mut hasher = Sha256::new();

        for transaction in &self.transactions {
            hasher.update(Sha256::digest(transaction));
        }

        H256(hasher.finalize().into())
    }

    #[must_use]
    pub fn withdrawals_root(&self) -> Option<H256> {
        let withdrawals = self.withdrawals.as_ref()?;
        let mut hasher = Sha256::new();

        for withdrawal in withdrawals {
            hasher.update(withdrawal.index.to_le_bytes());
            hasher.update(withdrawal.validator_index.to_le_bytes());
            hasher.update(withdrawal.address);
            hasher.update(withdrawal.amount.to_le_bytes());
        }

        Some(H256(hasher.finalize().into()))
    }

    /// Whether the fields introduced after Bellatrix are present exactly when `phase` has them.
    #[must_use]
    pub fn matches_phase(&self, phase: Phase) -> bool {
        self.withdrawals.is_some() == phase.has_withdrawals()
            && self.blob_gas_used.is_some() == phase.has_blobs()
            && self.excess_blob_gas.is_some() == phase.has_blobs()
    }

    #[must_use]
    pub fn to_header(&self) -> ExecutionPayloadHeader {
        let Self {
            parent_hash,
            fee_recipient,
            state_root,
            receipts_root,
            prev_randao,
            block_number,
            gas_limit,
            gas_used,
            timestamp,
            ref extra_data,
            base_fee_per_gas,
            block_hash,
            transactions: _,
            withdrawals: _,
            blob_gas_used,
            excess_blob_gas,
        } = *self;

        ExecutionPayloadHeader {
            parent_hash,
            fee_recipient,
            state_root,
            receipts_root,
            prev_randao,
            block_number,
            gas_limit,
            gas_used,
            timestamp,
            extra_data: extra_data.clone(),
            base_fee_per_gas,
            block_hash,
            transactions_root: self.transactions_root(),
            withdrawals_root: self.withdrawals_root(),
            blob_gas_used,
            excess_blob_gas,
        }
    }

    /// Root of the header this payload commits to.
    #[must_use]
    pub fn header_root(&self) -> H256 {
        self.to_header().root()
    }
}

#[derive(Clone, PartialEq, Eq, Default, Debug, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ExecutionPayloadHeader {
    pub parent_hash: ExecutionBlockHash,
    pub fee_recipient: ExecutionAddress,
    pub state_root: H256,
    pub receipts_root: H256,
    pub prev_randao: H256,
    #[serde(with = "serde_utils::string_or_native")]
    pub block_number: ExecutionBlockNumber,
    #[serde(with = "serde_utils::string_or_native")]
    pub gas_limit: Gas,
    #[serde(with = "serde_utils::string_or_native")]
    pub gas_used: Gas,
    #[serde(with = "serde_utils::string_or_native")]
    pub timestamp: UnixSeconds,
    #[serde(with = "serde_utils::prefixed_hex_or_bytes_vec")]
    pub extra_data: Vec<u8>,
    #[serde(with = "serde_utils::uint256_as_decimal_string")]
    pub base_fee_per_gas: Wei,
    pub block_hash: ExecutionBlockHash,
    pub transactions_root: H256,
    /// Present from Capella onward.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub withdrawals_root: Option<H256>,
    /// Present from Deneb onward, as is `excess_blob_gas`.
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        with = "serde_utils::string_or_native_option"
    )]
    pub blob_gas_used: Option<Gas>,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        with = "serde_utils::string_or_native_option"
    )]
    pub excess_blob_gas: Option<Gas>,
}

impl ExecutionPayloadHeader {
    /// SHA-256 digest over every header field in declaration order.
    ///
    /// Integers are little-endian. `extra_data` is prefixed with its length so that
    /// adjacent fields cannot be shifted into it. Optional fields are prefixed with a presence byte.
    #[must_use]
    pub fn root(&self) -> H256 {
        let mut base_fee_per_gas = [0; 32];
        self.base_fee_per_gas.to_little_endian(&mut base_fee_per_gas);

        let extra_data_length = u64::try_from(self.extra_data.len()).unwrap_or(u64::MAX);

        let hasher = Sha256::new()
            .chain_update(self.parent_hash)
            .chain_update(self.fee_recipient)
            .chain_update(self.state_root)
            .chain_update(self.receipts_root)
            .chain_update(self.prev_randao)
            .chain_update(self.block_number.to_le_bytes())
            .chain_update(self.gas_limit.to_le_bytes())
            .chain_update(self.gas_used.to_le_bytes())
            .chain_update(self.timestamp.to_le_bytes())
            .chain_update(extra_data_length.to_le_bytes())
            .chain_update(&self.extra_data)
            .chain_update(base_fee_per_gas)
            .chain_update(self.block_hash)
            .chain_update(self.transactions_root);

        let hasher = chain_optional(hasher, self.withdrawals_root);
        let hasher = chain_optional(hasher, self.blob_gas_used.map(u64::to_le_bytes));
        let hasher = chain_optional(hasher, self.excess_blob_gas.map(u64::to_le_bytes));

        H256(hasher.finalize().into())
    }

    /// Whether the fields introduced after Bellatrix are present exactly when `phase` has them.
    #[must_use]
    pub fn matches_phase(&self, phase: Phase) -> bool {
        self.withdrawals_root.is_some() == phase.has_withdrawals()
            && self.blob_gas_used.is_some() == phase.has_blobs()
            && self.excess_blob_gas.is_some() == phase.has_blobs()
    }
}

fn chain_optional(hasher: Sha256, value: Option<impl AsRef<[u8]>>) -> Sha256 {
    match value {
        Some(value) => hasher.chain_update([1_u8]).chain_update(value),
        None => hasher.chain_update([0_u8]),
    }
}

#[derive(Clone, Copy, PartialEq, Eq, Default, Debug, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct Withdrawal {
    #[serde(with = "serde_utils::string_or_native")]
    pub index: WithdrawalIndex,
    #[serde(with = "serde_utils::string_or_native")]
    pub validator_index: ValidatorIndex,
    pub address: ExecutionAddress,
    #[serde(with = "serde_utils::string_or_native")]
    pub amount: Gwei,
}

#[derive(Clone, PartialEq, Eq, Default, Debug, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct BlobsBundle {
    pub commitments: Vec<KzgCommitment>,
    pub proofs: Vec<KzgProof>,
    pub blobs: Vec<Blob>,
}

/// Requests to the consensus layer made by transactions in the payload. Present from Electra onward.
#[derive(Clone, PartialEq, Eq, Default, Debug, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ExecutionRequests {
    pub deposits: Vec<DepositRequest>,
    pub withdrawals: Vec<WithdrawalRequest>,
    pub consolidations: Vec<ConsolidationRequest>,
}

#[derive(Clone, Copy, PartialEq, Eq, Debug, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct DepositRequest {
    pub pubkey: PublicKeyBytes,
    pub withdrawal_credentials: H256,
    #[serde(with = "serde_utils::string_or_native")]
    pub amount: Gwei,
    pub signature: SignatureBytes,
    #[serde(with = "serde_utils::string_or_native")]
    pub index: DepositIndex,
}

#[derive(Clone, Copy, PartialEq, Eq, Debug, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct WithdrawalRequest {
    pub source_address: ExecutionAddress,
    pub validator_pubkey: PublicKeyBytes,
    #[serde(with = "serde_utils::string_or_native")]
    pub amount: Gwei,
}

#[derive(Clone, Copy, PartialEq, Eq, Debug, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ConsolidationRequest {
    pub source_address: ExecutionAddress,
    pub source_pubkey: PublicKeyBytes,
    pub target_pubkey: PublicKeyBytes,
}

#[derive(Clone, PartialEq, Eq, Debug, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct BuilderBid {
    pub header: Arc<ExecutionPayloadHeader>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub blob_kzg_commitments: Option<Vec<KzgCommitment>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub execution_requests: Option<ExecutionRequests>,
    #[serde(with = "serde_utils::uint256_as_decimal_string")]
    pub value: Wei,
    pub pubkey: PublicKeyBytes,
}

#[derive(Clone, PartialEq, Eq, Debug, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct SignedBuilderBid {
    #[serde(skip)]
    pub phase: Phase,
    pub message: BuilderBid,
    pub signature: SignatureBytes,
}

impl SignedBuilderBid {
    #[must_use]
    pub const fn phase(&self) -> Phase {
        self.phase
    }

    #[must_use]
    pub fn value(&self) -> Wei {
        self.message.value
    }

    #[must_use]
    pub fn header(&self) -> &Arc<ExecutionPayloadHeader> {
        &self.message.header
    }
}

#[derive(Clone, PartialEq, Eq, Debug, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct BlindedBeaconBlock {
    #[serde(with = "serde_utils::string_or_native")]
    pub slot: Slot,
    #[serde(with = "serde_utils::string_or_native")]
    pub proposer_index: ValidatorIndex,
    pub parent_root: H256,
    pub state_root: H256,
    pub execution_payload_header: Arc<ExecutionPayloadHeader>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub blob_kzg_commitments: Option<Vec<KzgCommitment>>,
}

#[derive(Clone, PartialEq, Eq, Debug, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct SignedBlindedBeaconBlock {
    #[serde(skip)]
    pub phase: Phase,
    pub message: BlindedBeaconBlock,
    pub signature: SignatureBytes,
}

impl SignedBlindedBeaconBlock {
    #[must_use]
    pub const fn phase(&self) -> Phase {
        self.phase
    }

    #[must_use]
    pub const fn slot(&self) -> Slot {
        self.message.slot
    }

    #[must_use]
    pub fn execution_payload_header(&self) -> &ExecutionPayloadHeader {
        &self.message.execution_payload_header
    }
}

#[derive(Clone, Copy, PartialEq, Eq, Debug, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ValidatorRegistrationV1 {
    pub fee_recipient: ExecutionAddress,
    #[serde(with = "serde_utils::string_or_native")]
    pub gas_limit: Gas,
    #[serde(with = "serde_utils::string_or_native")]
    pub timestamp: UnixSeconds,
    pub pubkey: PublicKeyBytes,
}

#[derive(Clone, Copy, PartialEq, Eq, Debug, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct SignedValidatorRegistrationV1 {
    pub message: ValidatorRegistrationV1,
    pub signature: SignatureBytes,
}

/// Full payload returned by a reveal, with the blobs bundle the builder attached to it.
#[derive(Clone, PartialEq, Eq, Debug, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ExecutionPayloadAndBlobsBundle {
    pub execution_payload: Arc<ExecutionPayload>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub blobs_bundle: Option<Arc<BlobsBundle>>,
}

impl From<Arc<ExecutionPayload>> for ExecutionPayloadAndBlobsBundle {
    fn from(execution_payload: Arc<ExecutionPayload>) -> Self {
        Self {
            execution_payload,
            blobs_bundle: None,
        }
    }
}
