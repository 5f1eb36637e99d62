//! Lenient deserialization of form-like input.
//!
//! Numeric and boolean fields are accepted either as JSON values or as
//! strings, and blank strings are treated as absent values.

use std::str::FromStr;

use serde::{de::Error as _, Deserialize, Deserializer};

/// Raw scalar value of a lenient field.
#[derive(Deserialize)]
#[serde(untagged)]
enum Scalar {
    /// Boolean value.
    Bool(bool),

    /// Integer value.
    Int(i64),

    /// Floating point value.
    Float(f64),

    /// String value.
    Text(String),
}

/// Deserializes an optional blank-aware [`Scalar`].
fn scalar<'de, D>(deserializer: D) -> Result<Option<Scalar>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<Scalar>::deserialize(deserializer)?.filter(
        |s| !matches!(s, Scalar::Text(t) if t.trim().is_empty()),
    ))
}

/// Parses the trimmed `text` into a `T`, reporting the `what` on failure.
fn parse<T: FromStr, E: serde::de::Error>(
    text: &str,
    what: &str,
) -> Result<T, E> {
    let text = text.trim();
    text.parse()
        .map_err(|_| E::custom(format!("`{text}` is not a valid {what}")))
}

/// Deserializes an optional integer, rounding fractional values.
///
/// # Errors
///
/// If the value is neither a number nor a numeric string.
#[expect(
    clippy::cast_possible_truncation,
    reason = "input is rounded and saturated"
)]
pub fn int<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    match scalar(deserializer)? {
        None => Ok(None),
        Some(Scalar::Int(v)) => Ok(Some(v)),
        Some(Scalar::Float(v)) => Ok(Some(v.round() as i64)),
        Some(Scalar::Text(t)) => parse::<i64, _>(&t, "integer")
            .or_else(|_: D::Error| {
                parse::<f64, D::Error>(&t, "number").map(|v| v.round() as i64)
            })
            .map(Some),
        Some(Scalar::Bool(_)) => Err(D::Error::custom("expected a number")),
    }
}

/// Deserializes an optional floating point number.
///
/// # Errors
///
/// If the value is neither a number nor a numeric string.
#[expect(clippy::cast_precision_loss, reason = "areas are small")]
pub fn float<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    match scalar(deserializer)? {
        None => Ok(None),
        Some(Scalar::Int(v)) => Ok(Some(v as f64)),
        Some(Scalar::Float(v)) => Ok(Some(v)),
        Some(Scalar::Text(t)) => parse(&t, "number").map(Some),
        Some(Scalar::Bool(_)) => Err(D::Error::custom("expected a number")),
    }
}

/// Deserializes an optional integer fitting into [`i32`].
///
/// # Errors
///
/// If the value is not an integer in the [`i32`] range.
pub fn int32<'de, D>(deserializer: D) -> Result<Option<i32>, D::Error>
where
    D: Deserializer<'de>,
{
    int(deserializer)?
        .map(i32::try_from)
        .transpose()
        .map_err(D::Error::custom)
}

/// Deserializes an optional boolean.
///
/// # Errors
///
/// If the value is neither a boolean nor a `true`/`false` string.
pub fn boolean<'de, D>(deserializer: D) -> Result<Option<bool>, D::Error>
where
    D: Deserializer<'de>,
{
    match scalar(deserializer)? {
        None => Ok(None),
        Some(Scalar::Bool(v)) => Ok(Some(v)),
        Some(Scalar::Text(t)) => {
            parse(&t.to_ascii_lowercase(), "boolean").map(Some)
        }
        Some(Scalar::Int(_) | Scalar::Float(_)) => {
            Err(D::Error::custom("expected a boolean"))
        }
    }
}

/// Deserializes an optional string, treating blank ones as absent.
///
/// # Errors
///
/// If the value is not a string.
pub fn text<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?
        .map(|s| s.trim().to_owned())
        .filter(|s| !s.is_empty()))
}

#[cfg(test)]
mod spec {
    use serde::Deserialize;
    use serde_json::json;

    #[derive(Debug, Default, Deserialize, PartialEq)]
    #[serde(default)]
    struct Input {
        #[serde(deserialize_with = "super::int")]
        fee: Option<i64>,
        #[serde(deserialize_with = "super::float")]
        area: Option<f64>,
        #[serde(deserialize_with = "super::boolean")]
        pets: Option<bool>,
        #[serde(deserialize_with = "super::text")]
        layout: Option<String>,
    }

    fn input(value: serde_json::Value) -> Input {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn blank_strings_are_absent() {
        assert_eq!(
            input(json!({"fee": "", "area": "  ", "pets": "", "layout": ""})),
            Input::default(),
        );
        assert_eq!(input(json!({"fee": null})), Input::default());
    }

    #[test]
    fn accepts_numbers_and_numeric_strings() {
        let parsed = input(json!({
            "fee": "12000",
            "area": "35.5",
            "pets": "true",
            "layout": " 1LDK ",
        }));
        assert_eq!(parsed.fee, Some(12_000));
        assert_eq!(parsed.area, Some(35.5));
        assert_eq!(parsed.pets, Some(true));
        assert_eq!(parsed.layout.as_deref(), Some("1LDK"));

        let parsed = input(json!({"fee": 0, "area": 40}));
        assert_eq!(parsed.fee, Some(0));
        assert_eq!(parsed.area, Some(40.0));

        assert_eq!(input(json!({"fee": "1500.6"})).fee, Some(1501));
    }

    #[test]
    fn rejects_garbage() {
        let parse = serde_json::from_value::<Input>;
        assert!(parse(json!({"fee": "lots"})).is_err());
        assert!(parse(json!({"pets": 3})).is_err());
    }

    #[test]
    fn keeps_negative_values_for_validation() {
        assert_eq!(input(json!({"fee": -5})).fee, Some(-5));
    }
}
