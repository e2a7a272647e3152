// The Builder API represents slots, gas amounts, timestamps and other integers as decimal strings.
// Values are still accepted as native JSON numbers because some builders and relays send them that
// way. Formats that are not human readable keep the native representation.
//
// `serde_with::rust::display_fromstr` interacts poorly with `#[serde(untagged)]` and
// `serde_aux::field_attributes::deserialize_number_from_string` relies on `deserialize_any`,
// so neither is used here.

use core::{
    fmt::{Display, Formatter, Result as FmtResult},
    marker::PhantomData,
    str::FromStr,
};

use serde::{
    de::{Error, IntoDeserializer as _, Visitor},
    Deserialize, Deserializer, Serialize, Serializer,
};

pub fn deserialize<'de, T, D>(deserializer: D) -> Result<T, D::Error>
where
    T: Deserialize<'de> + FromStr<Err: Display>,
    D: Deserializer<'de>,
{
    struct AnyVisitor<T>(PhantomData<T>);

    impl<'de, T: Deserialize<'de> + FromStr<Err: Display>> Visitor<'de> for AnyVisitor<T> {
        type Value = T;

        fn expecting(&self, formatter: &mut Formatter) -> FmtResult {
            formatter.write_str("a string or integer")
        }

        fn visit_str<E: Error>(self, string: &str) -> Result<Self::Value, E> {
            string.parse().map_err(E::custom)
        }

        fn visit_u64<E: Error>(self, value: u64) -> Result<Self::Value, E> {
            T::deserialize(value.into_deserializer())
        }
    }

    if deserializer.is_human_readable() {
        deserializer.deserialize_any(AnyVisitor(PhantomData))
    } else {
        T::deserialize(deserializer)
    }
}

pub fn serialize<S: Serializer>(
    value: impl Serialize + Display,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    if serializer.is_human_readable() {
        serializer.collect_str(&value)
    } else {
        value.serialize(serializer)
    }
}

#[cfg(test)]
mod tests {
    use serde::{Deserialize, Serialize};
    use serde_json::{json, Result};
    use test_case::test_case;

    #[derive(PartialEq, Eq, Debug, Deserialize, Serialize)]
    struct Slot {
        #[serde(with = "super")]
        slot: u64,
    }

    #[test_case(json!({ "slot": "42" }) ; "decimal string")]
    #[test_case(json!({ "slot": 42 }) ; "native number")]
    fn deserializes_strings_and_numbers(value: serde_json::Value) -> Result<()> {
        assert_eq!(serde_json::from_value::<Slot>(value)?, Slot { slot: 42 });
        Ok(())
    }

    #[test]
    fn serializes_to_decimal_string() -> Result<()> {
        assert_eq!(serde_json::to_value(Slot { slot: 7 })?, json!({ "slot": "7" }));
        Ok(())
    }

    #[test]
    fn rejects_hexadecimal_strings() {
        serde_json::from_value::<Slot>(json!({ "slot": "0x2a" }))
            .expect_err("hexadecimal quantities are not part of the Builder API");
    }
}
