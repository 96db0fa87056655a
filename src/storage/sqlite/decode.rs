//! Row decoding.
//!
//! Each column is decoded by its [`ColumnType`]. Stored NULLs decode to the
//! empty-string placeholder whatever the column type. A cell that cannot be
//! read as its type is logged as [`Error::Decode`] and left out of the row;
//! the remaining columns are still decoded.

use super::ColumnType;
use crate::models::DateCodec;
use crate::{Error, Result, Row, Value};
use rusqlite::Statement;
use rusqlite::types::ValueRef;

/// Name and resolved category of one result column.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnSpec {
    /// Column name as reported by the engine.
    pub name: String,
    /// Category resolved from the declared type.
    pub column_type: ColumnType,
}

/// Resolves the result columns of a prepared statement.
#[must_use]
pub fn column_specs(stmt: &Statement<'_>) -> Vec<ColumnSpec> {
    stmt.columns()
        .into_iter()
        .map(|column| ColumnSpec {
            name: column.name().to_string(),
            column_type: ColumnType::resolve(column.decl_type()),
        })
        .collect()
}

/// Decodes one result row.
#[must_use]
pub fn decode_row(row: &rusqlite::Row<'_>, specs: &[ColumnSpec]) -> Row {
    let mut decoded = Row::with_capacity(specs.len());
    for (index, spec) in specs.iter().enumerate() {
        let outcome = row
            .get_ref(index)
            .map_err(|e| decode_error(&spec.name, e.to_string()))
            .and_then(|cell| decode_cell(&spec.name, spec.column_type, cell));
        match outcome {
            Ok(value) => decoded.insert(spec.name.clone(), value),
            Err(e) => tracing::error!(error = %e, "Omitting column from row"),
        }
    }
    decoded
}

/// Decodes a single cell as `column_type`.
///
/// # Errors
///
/// Returns [`Error::Decode`] if the cell cannot be read as the resolved type:
/// invalid UTF-8 in a text or date column, or date text that is not
/// `yyyy-MM-dd HH:mm:ss`.
///
/// Numeric columns never fail. Text and blobs are read up to their longest
/// numeric prefix, and a cell with no such prefix reads as zero.
pub fn decode_cell(column: &str, column_type: ColumnType, cell: ValueRef<'_>) -> Result<Value> {
    if matches!(cell, ValueRef::Null) {
        return Ok(Value::Text(String::new()));
    }

    let column_type = match column_type {
        ColumnType::Unknown => ColumnType::from_storage(cell.data_type()),
        other => other,
    };

    match column_type {
        ColumnType::Integer => Ok(Value::Int64(integer_of(cell))),
        ColumnType::Real => Ok(Value::Double(real_of(cell))),
        ColumnType::Text | ColumnType::Unknown => text_of(column, cell).map(Value::Text),
        ColumnType::Blob => Ok(Value::Blob(bytes_of(cell))),
        ColumnType::Null => Ok(Value::Text(String::new())),
        ColumnType::Date => {
            let text = text_of(column, cell)?;
            if !DateCodec::looks_like_timestamp(&text) {
                return Err(decode_error(column, format!("'{text}' is not a date")));
            }
            DateCodec::parse(&text)
                .map(Value::Timestamp)
                .ok_or_else(|| decode_error(column, format!("'{text}' does not match the date format")))
        },
    }
}

fn decode_error(column: &str, cause: String) -> Error {
    Error::Decode {
        column: column.to_string(),
        cause,
    }
}

#[allow(clippy::cast_possible_truncation)]
fn integer_of(cell: ValueRef<'_>) -> i64 {
    match cell {
        ValueRef::Integer(i) => i,
        ValueRef::Real(f) => f as i64,
        ValueRef::Text(bytes) | ValueRef::Blob(bytes) => leading_integer(bytes),
        ValueRef::Null => 0,
    }
}

#[allow(clippy::cast_precision_loss)]
fn real_of(cell: ValueRef<'_>) -> f64 {
    match cell {
        ValueRef::Integer(i) => i as f64,
        ValueRef::Real(f) => f,
        ValueRef::Text(bytes) | ValueRef::Blob(bytes) => leading_real(bytes),
        ValueRef::Null => 0.0,
    }
}

fn skip_whitespace(bytes: &[u8]) -> &[u8] {
    let start = bytes
        .iter()
        .position(|b| !b.is_ascii_whitespace())
        .unwrap_or(bytes.len());
    &bytes[start..]
}

/// Value of the longest signed decimal prefix, saturating at the `i64`
/// bounds. Text without leading digits is 0.
fn leading_integer(bytes: &[u8]) -> i64 {
    let bytes = skip_whitespace(bytes);
    let (negative, digits) = match bytes.first() {
        Some(b'-') => (true, &bytes[1..]),
        Some(b'+') => (false, &bytes[1..]),
        _ => (false, bytes),
    };
    let mut value: i64 = 0;
    for digit in digits.iter().take_while(|b| b.is_ascii_digit()) {
        let digit = i64::from(digit - b'0');
        value = if negative {
            value.saturating_mul(10).saturating_sub(digit)
        } else {
            value.saturating_mul(10).saturating_add(digit)
        };
    }
    value
}

/// Value of the longest decimal floating-point prefix. Text without a
/// numeric prefix is 0.
fn leading_real(bytes: &[u8]) -> f64 {
    let bytes = skip_whitespace(bytes);
    let digits_from = |at: usize| {
        bytes[at.min(bytes.len())..]
            .iter()
            .take_while(|b| b.is_ascii_digit())
            .count()
    };

    let mut end = usize::from(matches!(bytes.first(), Some(b'+' | b'-')));
    let integer_digits = digits_from(end);
    end += integer_digits;
    let mut fraction_digits = 0;
    if bytes.get(end) == Some(&b'.') {
        fraction_digits = digits_from(end + 1);
        if integer_digits + fraction_digits > 0 {
            end += 1 + fraction_digits;
        }
    }
    if integer_digits + fraction_digits == 0 {
        return 0.0;
    }
    if matches!(bytes.get(end), Some(b'e' | b'E')) {
        let sign = usize::from(matches!(bytes.get(end + 1), Some(b'+' | b'-')));
        let exponent_digits = digits_from(end + 1 + sign);
        if exponent_digits > 0 {
            end += 1 + sign + exponent_digits;
        }
    }

    std::str::from_utf8(&bytes[..end])
        .ok()
        .and_then(|text| text.parse::<f64>().ok())
        .unwrap_or(0.0)
}

fn text_of(column: &str, cell: ValueRef<'_>) -> Result<String> {
    match cell {
        ValueRef::Text(bytes) | ValueRef::Blob(bytes) => std::str::from_utf8(bytes)
            .map(ToString::to_string)
            .map_err(|e| decode_error(column, e.to_string())),
        ValueRef::Integer(i) => Ok(i.to_string()),
        ValueRef::Real(f) => Ok(f.to_string()),
        ValueRef::Null => Ok(String::new()),
    }
}

fn bytes_of(cell: ValueRef<'_>) -> Vec<u8> {
    match cell {
        ValueRef::Text(bytes) | ValueRef::Blob(bytes) => bytes.to_vec(),
        ValueRef::Integer(i) => i.to_string().into_bytes(),
        ValueRef::Real(f) => f.to_string().into_bytes(),
        ValueRef::Null => Vec::new(),
    }
}
