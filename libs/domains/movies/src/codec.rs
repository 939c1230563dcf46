//! Conversion between raw string fields, typed values and CQL values
//!
//! Raw input only exists at the boundary (CSV files, feeds); everything past
//! [`decode`] works with [`FieldValue`].

use scylla::value::{CqlTimestamp, CqlValue};
use std::fmt;

use crate::error::CodecError;
use crate::schema::{Column, ColumnType, TableSchema};

/// A typed column value
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Int(i32),
    Float(f32),
    Text(String),
    /// Milliseconds since the Unix epoch
    Timestamp(i64),
}

impl FieldValue {
    pub fn column_type(&self) -> ColumnType {
        match self {
            FieldValue::Int(_) => ColumnType::Int,
            FieldValue::Float(_) => ColumnType::Float,
            FieldValue::Text(_) => ColumnType::Text,
            FieldValue::Timestamp(_) => ColumnType::Timestamp,
        }
    }

    pub fn as_int(&self) -> Option<i32> {
        match self {
            FieldValue::Int(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_float(&self) -> Option<f32> {
        match self {
            FieldValue::Float(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            FieldValue::Text(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_timestamp(&self) -> Option<i64> {
        match self {
            FieldValue::Timestamp(v) => Some(*v),
            _ => None,
        }
    }
}

/// Renders the raw form that [`decode`] accepts back
impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldValue::Int(v) => write!(f, "{}", v),
            FieldValue::Float(v) => write!(f, "{}", v),
            FieldValue::Text(v) => f.write_str(v),
            FieldValue::Timestamp(v) => write!(f, "{}", v),
        }
    }
}

impl From<FieldValue> for CqlValue {
    fn from(value: FieldValue) -> Self {
        match value {
            FieldValue::Int(v) => CqlValue::Int(v),
            FieldValue::Float(v) => CqlValue::Float(v),
            FieldValue::Text(v) => CqlValue::Text(v),
            FieldValue::Timestamp(v) => CqlValue::Timestamp(CqlTimestamp(v)),
        }
    }
}

/// Parse one raw field as `kind`
pub fn parse_field(kind: ColumnType, raw: &str) -> Option<FieldValue> {
    match kind {
        ColumnType::Int => raw.parse().ok().map(FieldValue::Int),
        ColumnType::Float => raw.parse().ok().map(FieldValue::Float),
        ColumnType::Text => Some(FieldValue::Text(raw.to_string())),
        ColumnType::Timestamp => raw.parse().ok().map(FieldValue::Timestamp),
    }
}

fn parse_columns<S: AsRef<str>>(
    columns: &[&Column],
    fields: &[S],
) -> Result<Vec<FieldValue>, CodecError> {
    if fields.len() != columns.len() {
        return Err(CodecError::FieldCount {
            expected: columns.len(),
            actual: fields.len(),
        });
    }

    columns
        .iter()
        .zip(fields)
        .enumerate()
        .map(|(index, (column, raw))| {
            let raw = raw.as_ref();
            parse_field(column.kind, raw).ok_or_else(|| CodecError::InvalidField {
                index,
                column: column.name,
                expected: column.kind,
                value: raw.to_string(),
            })
        })
        .collect()
}

/// Decode positional string fields into typed values following the schema's column order
///
/// # Example
/// ```
/// use domain_movies::codec::{decode, FieldValue};
/// use domain_movies::Table;
///
/// let values = decode(
///     Table::WatchHistory.schema(),
///     &["7", "42", "1609459200000", "15", "Inception"],
/// )
/// .unwrap();
/// assert_eq!(values[3], FieldValue::Int(15));
/// ```
pub fn decode<S: AsRef<str>>(
    schema: &TableSchema,
    fields: &[S],
) -> Result<Vec<FieldValue>, CodecError> {
    let columns: Vec<&Column> = schema.columns.iter().collect();
    parse_columns(&columns, fields)
}

/// Decode raw primary-key fields (partition then clustering columns)
pub fn decode_key<S: AsRef<str>>(
    schema: &TableSchema,
    fields: &[S],
) -> Result<Vec<FieldValue>, CodecError> {
    let columns: Vec<&Column> = schema.primary_key().collect();
    parse_columns(&columns, fields)
}

/// Check that typed key values line up with the schema's primary key
pub fn validate_key(schema: &TableSchema, key: &[FieldValue]) -> Result<(), CodecError> {
    let columns: Vec<&Column> = schema.primary_key().collect();
    if key.len() != columns.len() {
        return Err(CodecError::FieldCount {
            expected: columns.len(),
            actual: key.len(),
        });
    }

    for (index, (column, value)) in columns.iter().zip(key).enumerate() {
        if value.column_type() != column.kind {
            return Err(CodecError::InvalidField {
                index,
                column: column.name,
                expected: column.kind,
                value: value.to_string(),
            });
        }
    }
    Ok(())
}

/// Pick the primary-key values out of a full decoded row
pub fn key_of(schema: &TableSchema, row: &[FieldValue]) -> Vec<FieldValue> {
    schema
        .primary_key_positions()
        .into_iter()
        .filter_map(|pos| row.get(pos).cloned())
        .collect()
}

/// Convert a stored row (schema column order) back into typed values
pub fn from_cql_row(
    schema: &TableSchema,
    columns: Vec<Option<CqlValue>>,
) -> Result<Vec<FieldValue>, CodecError> {
    if columns.len() != schema.columns.len() {
        return Err(CodecError::FieldCount {
            expected: schema.columns.len(),
            actual: columns.len(),
        });
    }

    schema
        .columns
        .iter()
        .zip(columns)
        .map(|(column, value)| match (column.kind, value) {
            (ColumnType::Int, Some(CqlValue::Int(v))) => Ok(FieldValue::Int(v)),
            (ColumnType::Float, Some(CqlValue::Float(v))) => Ok(FieldValue::Float(v)),
            (ColumnType::Text, Some(CqlValue::Text(v) | CqlValue::Ascii(v))) => {
                Ok(FieldValue::Text(v))
            }
            (ColumnType::Timestamp, Some(CqlValue::Timestamp(CqlTimestamp(v)))) => {
                Ok(FieldValue::Timestamp(v))
            }
            (_, other) => Err(CodecError::UnexpectedValue {
                column: column.name,
                found: format!("{:?}", other),
            }),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::Table;

    #[test]
    fn test_decode_watch_history() {
        let values = decode(
            Table::WatchHistory.schema(),
            &["7", "42", "1609459200000", "15", "Inception"],
        )
        .unwrap();

        assert_eq!(
            values,
            vec![
                FieldValue::Int(7),
                FieldValue::Int(42),
                FieldValue::Timestamp(1_609_459_200_000),
                FieldValue::Int(15),
                FieldValue::Text("Inception".to_string()),
            ]
        );
    }

    #[test]
    fn test_decode_customer_rating_float() {
        let values = decode(
            Table::CustomerRating.schema(),
            &["3", "99", "Heat", "Ann", "4.5"],
        )
        .unwrap();
        assert_eq!(values[4], FieldValue::Float(4.5));
    }

    #[test]
    fn test_decode_movies_genre_text_first() {
        let values = decode(
            Table::MoviesGenre.schema(),
            &["Drama", "1994", "278", "142", "The Shawshank Redemption"],
        )
        .unwrap();
        assert_eq!(values[0].as_text(), Some("Drama"));
        assert_eq!(values[1].as_int(), Some(1994));
    }

    #[test]
    fn test_decode_wrong_field_count() {
        let err = decode(Table::WatchHistory.schema(), &["7", "42", "15"]).unwrap_err();
        assert_eq!(
            err,
            CodecError::FieldCount {
                expected: 5,
                actual: 3
            }
        );
    }

    #[test]
    fn test_decode_reports_failing_field() {
        let err = decode(
            Table::CustomerQueue.schema(),
            &["7", "yesterday", "Ann", "42", "Alien"],
        )
        .unwrap_err();

        assert_eq!(
            err,
            CodecError::InvalidField {
                index: 1,
                column: "queued_at",
                expected: ColumnType::Timestamp,
                value: "yesterday".to_string(),
            }
        );
    }

    #[test]
    fn test_decode_int_overflow_rejected() {
        let err = decode(
            Table::WatchHistory.schema(),
            &["4294967296", "42", "0", "15", "Inception"],
        )
        .unwrap_err();
        assert!(matches!(err, CodecError::InvalidField { index: 0, .. }));
    }

    #[test]
    fn test_text_fields_taken_verbatim() {
        let values = decode(
            Table::WatchHistory.schema(),
            &["7", "42", "0", "0", " O'Brother, Where Art Thou? "],
        )
        .unwrap();
        assert_eq!(values[4].as_text(), Some(" O'Brother, Where Art Thou? "));
    }

    #[test]
    fn test_display_is_decodable() {
        let schema = Table::CustomerRating.schema();
        let values = decode(schema, &["3", "99", "Heat", "Ann", "4.25"]).unwrap();
        let raw: Vec<String> = values.iter().map(|v| v.to_string()).collect();
        assert_eq!(decode(schema, &raw).unwrap(), values);
    }

    #[test]
    fn test_decode_key_and_key_of_agree() {
        let schema = Table::MoviesGenre.schema();
        let row = decode(schema, &["Drama", "1994", "278", "142", "Shawshank"]).unwrap();
        let key = decode_key(schema, &["Drama", "1994", "278"]).unwrap();
        assert_eq!(key_of(schema, &row), key);
        assert!(validate_key(schema, &key).is_ok());
    }

    #[test]
    fn test_validate_key_type_mismatch() {
        let schema = Table::WatchHistory.schema();
        let err = validate_key(
            schema,
            &[FieldValue::Int(7), FieldValue::Text("42".to_string())],
        )
        .unwrap_err();
        assert!(matches!(err, CodecError::InvalidField { index: 1, column: "movie_id", .. }));
    }

    #[test]
    fn test_from_cql_row_round_trip() {
        let schema = Table::WatchHistory.schema();
        let values = decode(schema, &["7", "42", "1609459200000", "15", "Inception"]).unwrap();
        let stored: Vec<Option<CqlValue>> =
            values.iter().cloned().map(|v| Some(CqlValue::from(v))).collect();

        assert_eq!(from_cql_row(schema, stored).unwrap(), values);
    }

    #[test]
    fn test_from_cql_row_null_column() {
        let schema = Table::WatchHistory.schema();
        let stored = vec![
            Some(CqlValue::Int(7)),
            Some(CqlValue::Int(42)),
            None,
            Some(CqlValue::Int(15)),
            Some(CqlValue::Text("Inception".to_string())),
        ];
        let err = from_cql_row(schema, stored).unwrap_err();
        assert!(matches!(err, CodecError::UnexpectedValue { column: "watched_at", .. }));
    }
}
