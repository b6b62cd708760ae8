//! Decoding of materialized rows into caller types.
//!
//! Rows decode through serde. A row with a single column may also decode
//! straight from that column's value, so `Vec<i64>` or `Option<String>`
//! work for single-column result sets. Scalars are the first column of the
//! first row; a missing or NULL scalar decodes as the type's default.

use crate::models::JsonRow;
use serde::de::DeserializeOwned;
use serde_json::Value as JsonValue;

/// Decode one row into `T`.
pub fn decode_row<T: DeserializeOwned>(row: JsonRow) -> Result<T, String> {
    let single_column = row.len() == 1;
    let value = JsonValue::Object(row);

    match T::deserialize(&value) {
        Ok(v) => Ok(v),
        Err(e) if single_column => {
            let column = value
                .as_object()
                .and_then(|m| m.values().next())
                .unwrap_or(&JsonValue::Null);
            T::deserialize(column).map_err(|_| e.to_string())
        }
        Err(e) => Err(e.to_string()),
    }
}

/// Decode every row of a result set, preserving order.
pub fn decode_rows<T: DeserializeOwned>(rows: Vec<JsonRow>) -> Result<Vec<T>, String> {
    rows.into_iter().map(decode_row).collect()
}

/// Decode an optional row; absence is not an error.
pub fn decode_optional<T: DeserializeOwned>(row: Option<JsonRow>) -> Result<Option<T>, String> {
    row.map(decode_row).transpose()
}

/// First column of a row, if any.
pub fn first_column(row: Option<JsonRow>) -> Option<JsonValue> {
    row.and_then(|row| row.into_iter().next())
        .map(|(_, value)| value)
}

/// Decode a scalar into `T`, with NULL or absence giving `T::default()`.
///
/// Text that is not itself a valid `T` is tried once more as a JSON literal,
/// which covers DECIMAL columns (carried as text) decoding into numbers.
pub fn decode_scalar<T: DeserializeOwned + Default>(value: Option<JsonValue>) -> Result<T, String> {
    let value = match value {
        None | Some(JsonValue::Null) => return Ok(T::default()),
        Some(v) => v,
    };

    match T::deserialize(&value) {
        Ok(v) => Ok(v),
        Err(e) => match &value {
            JsonValue::String(s) => serde_json::from_str::<T>(s.trim()).map_err(|_| e.to_string()),
            _ => Err(e.to_string()),
        },
    }
}

/// Decode a scalar as an integer. NULL or absence gives zero.
pub fn scalar_to_i64(value: Option<JsonValue>) -> Result<i64, String> {
    match value {
        None | Some(JsonValue::Null) => Ok(0),
        Some(JsonValue::Bool(b)) => Ok(i64::from(b)),
        Some(JsonValue::Number(n)) => number_to_i64(&n),
        Some(JsonValue::String(s)) => {
            let s = s.trim();
            if let Ok(v) = s.parse::<i64>() {
                return Ok(v);
            }
            match s.parse::<f64>() {
                Ok(f) => float_to_i64(f),
                Err(_) => Err(format!("'{}' is not an integer", s)),
            }
        }
        Some(other) => Err(format!("expected an integer scalar, got {}", other)),
    }
}

fn number_to_i64(n: &serde_json::Number) -> Result<i64, String> {
    if let Some(v) = n.as_i64() {
        return Ok(v);
    }
    if n.is_u64() {
        return Err(format!("{} does not fit in a 64-bit signed integer", n));
    }
    n.as_f64()
        .ok_or_else(|| format!("{} is not an integer", n))
        .and_then(float_to_i64)
}

fn float_to_i64(f: f64) -> Result<i64, String> {
    // i64::MAX as f64 rounds up to 2^63, which does not fit
    if f.fract() == 0.0 && f >= i64::MIN as f64 && f < i64::MAX as f64 {
        Ok(f as i64)
    } else {
        Err(format!("{} is not an integer", f))
    }
}
