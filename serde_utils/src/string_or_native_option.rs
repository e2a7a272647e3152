// Same encoding as `string_or_native` for fields that only exist in some phases.
// Combine with `#[serde(default, skip_serializing_if = "Option::is_none")]`.

use core::{fmt::Display, str::FromStr};

use serde::{Deserialize, Deserializer, Serialize, Serializer};

struct StringOrNative<T>(T);

impl<'de, T: Deserialize<'de> + FromStr<Err: Display>> Deserialize<'de> for StringOrNative<T> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        crate::string_or_native::deserialize(deserializer).map(Self)
    }
}

pub fn deserialize<'de, T, D>(deserializer: D) -> Result<Option<T>, D::Error>
where
    T: Deserialize<'de> + FromStr<Err: Display>,
    D: Deserializer<'de>,
{
    let value = Option::<StringOrNative<T>>::deserialize(deserializer)?;
    Ok(value.map(|StringOrNative(value)| value))
}

pub fn serialize<T, S>(value: &Option<T>, serializer: S) -> Result<S::Ok, S::Error>
where
    T: Serialize + Display,
    S: Serializer,
{
    match value {
        Some(value) => crate::string_or_native::serialize(value, serializer),
        None => serializer.serialize_none(),
    }
}

#[cfg(test)]
mod tests {
    use serde::{Deserialize, Serialize};
    use serde_json::{json, Result};
    use test_case::test_case;

    #[derive(PartialEq, Eq, Debug, Deserialize, Serialize)]
    struct Gas {
        #[serde(
            default,
            skip_serializing_if = "Option::is_none",
            with = "crate::string_or_native_option"
        )]
        blob_gas_used: Option<u64>,
    }

    #[test_case(json!({ "blob_gas_used": "131072" }) => Some(131_072); "decimal string")]
    #[test_case(json!({ "blob_gas_used": 131_072 }) => Some(131_072); "native number")]
    #[test_case(json!({}) => None; "absent")]
    fn deserializes_optional_field(value: serde_json::Value) -> Option<u64> {
        serde_json::from_value::<Gas>(value)
            .expect("value should be valid")
            .blob_gas_used
    }

    #[test]
    fn serializes_present_field_as_decimal_string() -> Result<()> {
        let present = Gas {
            blob_gas_used: Some(7),
        };
        let absent = Gas {
            blob_gas_used: None,
        };

        assert_eq!(serde_json::to_value(present)?, json!({ "blob_gas_used": "7" }));
        assert_eq!(serde_json::to_value(absent)?, json!({}));

        Ok(())
    }
}
