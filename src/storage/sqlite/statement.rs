//! Single-statement lifecycle.
//!
//! A statement is prepared, bound, stepped and finalized inside one call;
//! the prepared handle never outlives it.

use super::{bind_parameters, column_specs, decode_row};
use crate::{Error, Result, Row, Value};
use rusqlite::{Connection, Statement};

fn prepare<'conn>(conn: &'conn Connection, sql: &str) -> Result<Statement<'conn>> {
    conn.prepare(sql).map_err(|e| Error::Prepare {
        sql: sql.to_string(),
        code: e.sqlite_error_code(),
        cause: e.to_string(),
    })
}

fn step_error(sql: &str, e: &rusqlite::Error) -> Error {
    Error::Step {
        sql: sql.to_string(),
        code: e.sqlite_error_code(),
        cause: e.to_string(),
    }
}

/// Prepares, binds and steps a statement once, expecting completion.
///
/// # Errors
///
/// Returns [`Error::Prepare`] for malformed SQL and [`Error::Step`] if the
/// engine fails or the statement produces a row.
pub fn execute_statement(conn: &Connection, sql: &str, params: &[Value]) -> Result<()> {
    let mut stmt = prepare(conn, sql)?;
    bind_parameters(&mut stmt, params);
    stmt.raw_execute()
        .map(|_| ())
        .map_err(|e| step_error(sql, &e))
}

/// Prepares, binds and steps a statement while rows are available,
/// appending each decoded row to `rows`.
///
/// Rows decoded before a step failure stay in `rows`.
///
/// # Errors
///
/// Returns [`Error::Prepare`] for malformed SQL and [`Error::Step`] if
/// stepping fails.
pub fn query_statement(
    conn: &Connection,
    sql: &str,
    params: &[Value],
    rows: &mut Vec<Row>,
) -> Result<usize> {
    let mut stmt = prepare(conn, sql)?;
    let specs = column_specs(&stmt);
    bind_parameters(&mut stmt, params);

    let mut cursor = stmt.raw_query();
    let mut count = 0;
    loop {
        match cursor.next() {
            Ok(Some(row)) => {
                rows.push(decode_row(row, &specs));
                count += 1;
            },
            Ok(None) => return Ok(count),
            Err(e) => return Err(step_error(sql, &e)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn conn() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch("create table t (id integer primary key, name text)")
            .unwrap();
        conn
    }

    #[test]
    fn test_execute_and_query() {
        let conn = conn();
        execute_statement(
            &conn,
            "insert into t (id, name) values (?, ?)",
            &[Value::Int(1), Value::from("a")],
        )
        .unwrap();

        let mut rows = Vec::new();
        let count = query_statement(&conn, "select * from t where id = ?", &[Value::Int(1)], &mut rows)
            .unwrap();
        assert_eq!(count, 1);
        assert_eq!(rows[0].get("name"), Some(&Value::from("a")));
    }

    #[test]
    fn test_malformed_sql_is_prepare_error() {
        let conn = conn();
        let result = execute_statement(&conn, "insert into nowhere values (1)", &[]);
        assert!(matches!(result, Err(Error::Prepare { .. })));

        let mut rows = Vec::new();
        let result = query_statement(&conn, "selec * from t", &[], &mut rows);
        assert!(matches!(result, Err(Error::Prepare { .. })));
        assert!(rows.is_empty());
    }

    #[test]
    fn test_constraint_violation_is_step_error() {
        let conn = conn();
        execute_statement(&conn, "insert into t (id) values (1)", &[]).unwrap();
        let result = execute_statement(&conn, "insert into t (id) values (1)", &[]);
        match result {
            Err(Error::Step { code, .. }) => {
                assert_eq!(code, Some(rusqlite::ErrorCode::ConstraintViolation));
            },
            other => unreachable!("expected step error, got {other:?}"),
        }
    }

    #[test]
    fn test_execute_rejects_row_producing_statement() {
        let conn = conn();
        let result = execute_statement(&conn, "select 1", &[]);
        assert!(matches!(result, Err(Error::Step { .. })));
    }
}
