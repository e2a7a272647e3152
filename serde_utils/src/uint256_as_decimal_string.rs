// `ethereum_types::U256` implements `Display` in decimal but parses hexadecimal in `FromStr`,
// so `string_or_native` cannot be used for it. Builder bid values and base fees are decimal.

use core::fmt::{Formatter, Result as FmtResult};

use ethereum_types::U256;
use serde::{
    de::{Error, Visitor},
    Deserialize as _, Deserializer, Serializer,
};

pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<U256, D::Error> {
    struct DecimalVisitor;

    impl Visitor<'_> for DecimalVisitor {
        type Value = U256;

        fn expecting(&self, formatter: &mut Formatter) -> FmtResult {
            formatter.write_str("a decimal string or integer")
        }

        fn visit_str<E: Error>(self, string: &str) -> Result<Self::Value, E> {
            U256::from_dec_str(string).map_err(|error| E::custom(format!("{error:?}")))
        }

        fn visit_u64<E: Error>(self, value: u64) -> Result<Self::Value, E> {
            Ok(value.into())
        }
    }

    if deserializer.is_human_readable() {
        deserializer.deserialize_any(DecimalVisitor)
    } else {
        U256::deserialize(deserializer)
    }
}

pub fn serialize<S: Serializer>(value: &U256, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.collect_str(value)
}
