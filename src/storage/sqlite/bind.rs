//! Parameter binding.

use crate::models::DateCodec;
use crate::{Error, Value};
use rusqlite::Statement;
use rusqlite::types::{ToSql, ToSqlOutput, Value as SqlValue, ValueRef};

impl ToSql for Value {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(match self {
            Self::Null => ToSqlOutput::Owned(SqlValue::Null),
            Self::Bool(b) => ToSqlOutput::Owned(SqlValue::Integer(i64::from(*b))),
            Self::Int(i) => ToSqlOutput::Owned(SqlValue::Integer(i64::from(*i))),
            Self::Int64(i) => ToSqlOutput::Owned(SqlValue::Integer(*i)),
            Self::Float(f) => ToSqlOutput::Owned(SqlValue::Real(f64::from(*f))),
            Self::Double(f) => ToSqlOutput::Owned(SqlValue::Real(*f)),
            Self::Text(s) => ToSqlOutput::Borrowed(ValueRef::Text(s.as_bytes())),
            Self::Blob(b) => ToSqlOutput::Borrowed(ValueRef::Blob(b)),
            Self::Timestamp(t) => ToSqlOutput::Owned(SqlValue::Text(DateCodec::format(t))),
        })
    }
}

/// Binds `params` to `?1, ?2, ...` in order.
///
/// Binding is best-effort: a parameter the engine rejects is logged as a
/// [`Error::Bind`] and skipped, leaving its placeholder NULL, and the
/// remaining parameters are still bound. A count mismatch with the
/// statement's placeholders is logged as a warning.
///
/// Returns the number of parameters that failed to bind.
pub fn bind_parameters(stmt: &mut Statement<'_>, params: &[Value]) -> usize {
    let expected = stmt.parameter_count();
    if expected != params.len() {
        tracing::warn!(
            expected,
            provided = params.len(),
            "Parameter count does not match statement placeholders"
        );
    }

    let mut failures = 0;
    for (offset, value) in params.iter().enumerate() {
        let index = offset + 1;
        if let Err(e) = stmt.raw_bind_parameter(index, value) {
            let err = Error::Bind {
                index,
                cause: e.to_string(),
            };
            tracing::error!(error = %err, value_type = value.type_name(), "Skipping parameter");
            failures += 1;
        }
    }
    failures
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use rusqlite::Connection;

    fn bound_value(value: &Value) -> SqlValue {
        let conn = Connection::open_in_memory().unwrap();
        let mut stmt = conn.prepare("select ?1").unwrap();
        assert_eq!(bind_parameters(&mut stmt, std::slice::from_ref(value)), 0);
        let mut rows = stmt.raw_query();
        let row = rows.next().unwrap().unwrap();
        row.get::<_, SqlValue>(0).unwrap()
    }

    #[test]
    fn test_bool_binds_as_integer() {
        assert_eq!(bound_value(&Value::Bool(true)), SqlValue::Integer(1));
        assert_eq!(bound_value(&Value::Bool(false)), SqlValue::Integer(0));
    }

    #[test]
    fn test_float_widens_to_double() {
        assert_eq!(bound_value(&Value::Float(0.5)), SqlValue::Real(0.5));
    }

    #[test]
    fn test_timestamp_binds_as_text() {
        let ts = Utc.with_ymd_and_hms(2021, 12, 31, 18, 30, 0).unwrap();
        assert_eq!(
            bound_value(&Value::Timestamp(ts)),
            SqlValue::Text("2021-12-31 18:30:00".to_string())
        );
    }

    #[test]
    fn test_null_and_blob() {
        assert_eq!(bound_value(&Value::Null), SqlValue::Null);
        assert_eq!(
            bound_value(&Value::Blob(vec![0, 255])),
            SqlValue::Blob(vec![0, 255])
        );
    }

    #[test]
    fn test_excess_parameter_is_skipped() {
        let conn = Connection::open_in_memory().unwrap();
        let mut stmt = conn.prepare("select ?1").unwrap();
        let failures = bind_parameters(&mut stmt, &[Value::Int(1), Value::Int(2)]);
        assert_eq!(failures, 1);

        let mut rows = stmt.raw_query();
        let row = rows.next().unwrap().unwrap();
        assert_eq!(row.get::<_, i64>(0).unwrap(), 1);
    }
}
