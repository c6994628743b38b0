//! Lenient field decoders for backend JSON.
//!
//! The backend is not consistent about scalar types: ids arrive as numbers or
//! strings, prices as numbers or as text like `"45.00 EUR"`, counters
//! sometimes as floats. These helpers accept every shape seen on the wire.

use crate::domain::money::parse_price;
use serde::{Deserialize, Deserializer};
use serde_json::Value;

fn value_to_string(value: Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        other => Some(other.to_string()),
    }
}

/// Scalar text for enums decoded with `#[serde(from = "wire::WireText")]`.
/// Numbers are stringified, null becomes empty.
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(from = "Value")]
pub struct WireText(pub String);

impl From<Value> for WireText {
    fn from(value: Value) -> Self {
        WireText(value_to_string(value).unwrap_or_default())
    }
}

/// Number or string, rendered as a string. Missing / null becomes empty.
pub fn string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(value_to_string(value).unwrap_or_default())
}

/// Optional number-or-string. Empty strings count as absent.
pub fn opt_string_or_number<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(value_to_string(value).filter(|s| !s.is_empty()))
}

/// Price given as a JSON number or as formatted text.
pub fn opt_price<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => parse_price(&s),
        _ => None,
    })
}

fn value_to_u64(value: Value) -> Option<u64> {
    match value {
        Value::Number(n) => n
            .as_u64()
            .or_else(|| n.as_f64().filter(|f| *f >= 0.0).map(|f| f.round() as u64)),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// Integer counter that may be sent as a float or a numeric string.
pub fn lenient_u64<'de, D>(deserializer: D) -> Result<u64, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(value_to_u64(value).unwrap_or(0))
}

/// Optional integer counter: absent, null or unreadable values are `None`.
pub fn opt_u32<'de, D>(deserializer: D) -> Result<Option<u32>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(value_to_u64(value).map(|v| u32::try_from(v).unwrap_or(u32::MAX)))
}

/// Boolean that may also be `"true"`/`"false"` or `0`/`1`.
pub fn lenient_bool<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(match value {
        Value::Bool(b) => b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => matches!(s.trim().to_ascii_lowercase().as_str(), "true" | "1" | "yes"),
        _ => false,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Deserialize)]
    struct Sample {
        #[serde(default, deserialize_with = "string_or_number")]
        id: String,
        #[serde(default, deserialize_with = "opt_price")]
        price: Option<f64>,
        #[serde(default, deserialize_with = "lenient_u64")]
        count: u64,
        #[serde(default, deserialize_with = "lenient_bool")]
        flag: bool,
    }

    #[test]
    fn accepts_mixed_scalar_shapes() {
        let p: Sample =
            serde_json::from_str(r#"{"id": 17, "price": "45.00 EUR", "count": 3.0, "flag": "true"}"#)
                .unwrap();
        assert_eq!(p.id, "17");
        assert_eq!(p.price, Some(45.0));
        assert_eq!(p.count, 3);
        assert!(p.flag);
    }

    #[test]
    fn wire_text_accepts_null_and_numbers() {
        let texts: Vec<WireText> = serde_json::from_str(r#"[null, 3, "info"]"#).unwrap();
        assert_eq!(texts, [WireText(String::new()), WireText("3".into()), WireText("info".into())]);
    }

    #[test]
    fn missing_and_null_fields_fall_back() {
        let p: Sample = serde_json::from_str(r#"{"price": null}"#).unwrap();
        assert_eq!(p.id, "");
        assert_eq!(p.price, None);
        assert_eq!(p.count, 0);
        assert!(!p.flag);
    }
}
