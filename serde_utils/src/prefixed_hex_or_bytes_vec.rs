use core::fmt::{Formatter, Result as FmtResult};

use serde::{
    de::{Error, Visitor},
    Deserializer, Serializer,
};

use crate::shared;

pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
    struct VecVisitor {
        human_readable: bool,
    }

    impl Visitor<'_> for VecVisitor {
        type Value = Vec<u8>;

        fn expecting(&self, formatter: &mut Formatter) -> FmtResult {
            formatter.write_str(shared::expecting_prefixed_hex_or_bytes(self.human_readable))
        }

        fn visit_byte_buf<E>(self, bytes: Vec<u8>) -> Result<Self::Value, E> {
            Ok(bytes)
        }

        fn visit_bytes<E>(self, bytes: &[u8]) -> Result<Self::Value, E> {
            Ok(bytes.to_owned())
        }

        fn visit_str<E: Error>(self, string: &str) -> Result<Self::Value, E> {
            let digits = shared::strip_hex_prefix(string)?;
            const_hex::decode(digits).map_err(E::custom)
        }
    }

    let human_readable = deserializer.is_human_readable();
    let visitor = VecVisitor { human_readable };

    if human_readable {
        deserializer.deserialize_str(visitor)
    } else {
        deserializer.deserialize_byte_buf(visitor)
    }
}

pub fn serialize<S: Serializer>(bytes: impl AsRef<[u8]>, serializer: S) -> Result<S::Ok, S::Error> {
    if serializer.is_human_readable() {
        serializer.serialize_str(const_hex::encode_prefixed(bytes).as_str())
    } else {
        serializer.serialize_bytes(bytes.as_ref())
    }
}
