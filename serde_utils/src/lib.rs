pub mod prefixed_hex_or_bytes_vec;
pub mod string_or_native;
pub mod string_or_native_option;
pub mod uint256_as_decimal_string;

mod shared;
