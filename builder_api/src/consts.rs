use core::time::Duration;

pub const DATE_MS_HEADER: &str = "Date-Milliseconds";
pub const ETH_CONSENSUS_VERSION: &str = "eth-consensus-version";

pub const STATUS_REQUEST_TIMEOUT: Duration = Duration::from_secs(1);
pub const HEADER_REQUEST_TIMEOUT: Duration = Duration::from_secs(1);
pub const BLINDED_BLOCKS_REQUEST_TIMEOUT: Duration = Duration::from_secs(3);
pub const VALIDATORS_REQUEST_TIMEOUT: Duration = Duration::from_secs(6);
