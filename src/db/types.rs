//! MySQL row materialization.
//!
//! Rows are turned into JSON maps before they are decoded into caller
//! types. Conversion uses a two-phase approach:
//! 1. `TypeCategory` classifies column types into logical categories
//! 2. Per-category decoders extract the value
//!
//! A column that cannot be read is a decode failure, never a silent null.

use crate::error::{DalError, DalResult};
use crate::models::JsonRow;
use serde_json::Value as JsonValue;
use sqlx::mysql::{MySqlRow, MySqlTypeInfo, MySqlValueRef};
use sqlx::{Column, Decode, Row, Type, TypeInfo, ValueRef};

// =============================================================================
// Type Classification
// =============================================================================

/// Logical category for database column types.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypeCategory {
    Integer,
    Unsigned,
    Float,
    Decimal,
    Boolean,
    Date,
    Time,
    DateTime,
    Timestamp,
    Binary,
    Json,
    Text,
}

/// Classify a MySQL type name into a logical category.
pub fn categorize_type(type_name: &str) -> TypeCategory {
    let lower = type_name.to_lowercase();

    // Decimal first, "numeric" would otherwise never match anything else
    if lower.contains("decimal") || lower.contains("numeric") {
        return TypeCategory::Decimal;
    }

    if lower == "boolean" || lower == "bool" {
        return TypeCategory::Boolean;
    }

    if lower.contains("int") {
        if lower.contains("unsigned") {
            return TypeCategory::Unsigned;
        }
        return TypeCategory::Integer;
    }

    if lower.contains("float") || lower.contains("double") || lower == "real" {
        return TypeCategory::Float;
    }

    match lower.as_str() {
        "date" => return TypeCategory::Date,
        "time" => return TypeCategory::Time,
        "datetime" => return TypeCategory::DateTime,
        "timestamp" => return TypeCategory::Timestamp,
        "json" => return TypeCategory::Json,
        _ => {}
    }

    if lower.contains("blob") || lower.contains("binary") || lower == "bit" {
        return TypeCategory::Binary;
    }

    TypeCategory::Text
}

// =============================================================================
// Decimal Type Support
// =============================================================================

/// Raw DECIMAL value as text, preserving the database representation.
#[derive(Debug)]
pub struct RawDecimal(pub String);

impl Type<sqlx::MySql> for RawDecimal {
    fn type_info() -> MySqlTypeInfo {
        <String as Type<sqlx::MySql>>::type_info()
    }

    fn compatible(ty: &MySqlTypeInfo) -> bool {
        let name = ty.name().to_lowercase();
        name.contains("decimal") || name.contains("numeric")
    }
}

impl<'r> Decode<'r, sqlx::MySql> for RawDecimal {
    fn decode(value: MySqlValueRef<'r>) -> Result<Self, sqlx::error::BoxDynError> {
        let s = <&str as Decode<sqlx::MySql>>::decode(value)?;
        Ok(RawDecimal(s.to_string()))
    }
}

/// Binary data is carried as base64 text.
pub fn encode_binary_value(bytes: &[u8]) -> JsonValue {
    use base64::{Engine as _, engine::general_purpose::STANDARD};
    JsonValue::String(STANDARD.encode(bytes))
}

// =============================================================================
// Row to JSON
// =============================================================================

/// Conversion of driver rows into [`JsonRow`]s.
pub trait RowToJson {
    fn to_json_row(&self) -> DalResult<JsonRow>;
}

impl RowToJson for MySqlRow {
    fn to_json_row(&self) -> DalResult<JsonRow> {
        let mut map = JsonRow::with_capacity(self.columns().len());
        for (idx, col) in self.columns().iter().enumerate() {
            let category = categorize_type(col.type_info().name());
            let value = decode_column(self, idx, category).map_err(|e| {
                DalError::decode(
                    "",
                    0,
                    format!("column '{}' ({}): {}", col.name(), col.type_info().name(), e),
                )
            })?;
            map.insert(col.name().to_string(), value);
        }
        Ok(map)
    }
}

fn decode_column(
    row: &MySqlRow,
    idx: usize,
    category: TypeCategory,
) -> Result<JsonValue, sqlx::Error> {
    if row.try_get_raw(idx)?.is_null() {
        return Ok(JsonValue::Null);
    }

    let value = match category {
        TypeCategory::Decimal => JsonValue::String(row.try_get::<RawDecimal, _>(idx)?.0),
        TypeCategory::Integer => JsonValue::Number(row.try_get::<i64, _>(idx)?.into()),
        TypeCategory::Unsigned => JsonValue::Number(row.try_get::<u64, _>(idx)?.into()),
        TypeCategory::Boolean => JsonValue::Bool(row.try_get::<bool, _>(idx)?),
        TypeCategory::Float => {
            let v = match row.try_get::<f64, _>(idx) {
                Ok(v) => v,
                Err(_) => row.try_get::<f32, _>(idx)? as f64,
            };
            serde_json::Number::from_f64(v)
                .map(JsonValue::Number)
                .unwrap_or_else(|| JsonValue::String(v.to_string()))
        }
        TypeCategory::Date => {
            JsonValue::String(row.try_get::<chrono::NaiveDate, _>(idx)?.to_string())
        }
        TypeCategory::Time => {
            JsonValue::String(row.try_get::<chrono::NaiveTime, _>(idx)?.to_string())
        }
        TypeCategory::DateTime => JsonValue::String(
            row.try_get::<chrono::NaiveDateTime, _>(idx)?
                .format("%Y-%m-%dT%H:%M:%S%.f")
                .to_string(),
        ),
        TypeCategory::Timestamp => JsonValue::String(
            row.try_get::<chrono::DateTime<chrono::Utc>, _>(idx)?
                .to_rfc3339(),
        ),
        TypeCategory::Binary => encode_binary_value(&row.try_get::<Vec<u8>, _>(idx)?),
        TypeCategory::Json => row.try_get::<JsonValue, _>(idx)?,
        TypeCategory::Text => match row.try_get::<String, _>(idx) {
            Ok(v) => JsonValue::String(v),
            // Columns declared as text with a binary collation arrive as bytes
            Err(_) => {
                let bytes = row.try_get::<Vec<u8>, _>(idx)?;
                match String::from_utf8(bytes) {
                    Ok(s) => JsonValue::String(s),
                    Err(e) => encode_binary_value(e.as_bytes()),
                }
            }
        },
    };
    Ok(value)
}
