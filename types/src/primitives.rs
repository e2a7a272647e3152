use derive_more::AsRef;
use fixed_hash::construct_fixed_hash;
use impl_serde::impl_fixed_hash_serde;

pub use ethereum_types::{H160, H256, H64, U256};

pub type DepositIndex = u64;
pub type ExecutionAddress = H160;
pub type ExecutionBlockHash = H256;
pub type ExecutionBlockNumber = u64;
pub type Gas = u64;
pub type Gwei = u64;
pub type KzgCommitment = H384;
pub type KzgProof = H384;
pub type PublicKeyBytes = H384;
pub type SignatureBytes = H768;
pub type Slot = u64;
pub type UnixSeconds = u64;
pub type ValidatorIndex = u64;
pub type Wei = U256;
pub type WithdrawalIndex = u64;

construct_fixed_hash! {
    #[derive(AsRef)]
    pub struct H384(48);
}

construct_fixed_hash! {
    #[derive(AsRef)]
    pub struct H768(96);
}

impl_fixed_hash_serde!(H384, 48);
impl_fixed_hash_serde!(H768, 96);

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn h384_serializes_as_prefixed_hex() -> Result<(), serde_json::Error> {
        let pubkey = H384::repeat_byte(0xab);
        let json = serde_json::to_value(pubkey)?;

        assert_eq!(json, json!(format!("0x{}", "ab".repeat(48))));
        assert_eq!(serde_json::from_value::<H384>(json)?, pubkey);

        Ok(())
    }

    #[test]
    fn h768_rejects_wrong_length() {
        serde_json::from_value::<H768>(json!("0x00")).expect_err("96 bytes are required");
    }
}
