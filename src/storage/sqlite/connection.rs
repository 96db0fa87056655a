//! Connection lifecycle for the shared `SQLite` handle.
//!
//! This module opens the handle in read-write, full-mutex mode, applies the
//! configured pragmas, recovers poisoned locks, and closes the handle with a
//! single busy retry.

use crate::config::AccessConfig;
use crate::{Error, Result};
use rusqlite::{Connection, ErrorCode, OpenFlags};
use std::path::Path;
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

/// Helper to acquire mutex lock with poison recovery.
///
/// If the mutex is poisoned (due to a panic in a previous critical section),
/// we recover the inner value and log a warning. The connection state is
/// owned by the engine, so a panic on our side does not invalidate it.
///
/// # Examples
///
/// ```ignore
/// use std::sync::Mutex;
/// use sqlaccess::storage::sqlite::acquire_lock;
///
/// let mutex = Mutex::new(Some(connection));
/// let guard = acquire_lock(&mutex);
/// ```
pub fn acquire_lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    match mutex.lock() {
        Ok(guard) => guard,
        Err(poisoned) => {
            tracing::warn!("SQLite mutex was poisoned, recovering");
            metrics::counter!("sqlite_mutex_poison_recovery_total").increment(1);
            poisoned.into_inner()
        },
    }
}

/// Opens the database file in read-write, full-mutex mode.
///
/// The engine only creates the file when `create_if_missing` is set; the
/// parent directory is created in that case too.
///
/// # Errors
///
/// Returns [`Error::Connection`] if the directory cannot be created or the
/// engine refuses the file. A handle the engine allocated for a failed open
/// is released before returning.
pub fn open_connection(path: &Path, create_if_missing: bool) -> Result<Connection> {
    let mut flags = OpenFlags::SQLITE_OPEN_READ_WRITE
        | OpenFlags::SQLITE_OPEN_FULL_MUTEX
        | OpenFlags::SQLITE_OPEN_URI;
    if create_if_missing {
        flags |= OpenFlags::SQLITE_OPEN_CREATE;
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| Error::Connection {
                path: path.display().to_string(),
                cause: e.to_string(),
            })?;
        }
    }

    Connection::open_with_flags(path, flags).map_err(|e| {
        tracing::error!(path = %path.display(), error = %e, "Failed to open database");
        Error::Connection {
            path: path.display().to_string(),
            cause: e.to_string(),
        }
    })
}

/// Applies the configured busy timeout and foreign key enforcement.
///
/// Failures are logged and otherwise ignored; a connection without these
/// settings is still usable.
pub fn configure_connection(conn: &Connection, config: &AccessConfig) {
    if let Err(e) = conn.busy_timeout(Duration::from_millis(u64::from(config.busy_timeout_ms))) {
        tracing::warn!(error = %e, "Failed to set busy timeout");
    }
    if let Some(enable) = config.foreign_keys {
        if let Err(e) = conn.pragma_update(None, "foreign_keys", enable) {
            tracing::warn!(error = %e, enable, "Failed to set foreign_keys pragma");
        }
    }
}

/// Runs a transaction-control directive, ignoring its outcome.
///
/// `COMMIT` with no open transaction is an engine error; callers issue these
/// directives unconditionally, so failures are only traced.
pub fn directive(conn: &Connection, sql: &str) {
    if let Err(e) = conn.execute_batch(sql) {
        tracing::trace!(directive = sql, error = %e, "Directive had no effect");
    }
}

/// Closes the handle, finalizing cached statements and retrying once if
/// the engine reports busy.
///
/// The handle is consumed either way; if the retry also fails it is released
/// on drop.
pub fn close_connection(conn: Connection) {
    let Err((conn, e)) = conn.close() else {
        tracing::debug!("Database closed");
        return;
    };

    if e.sqlite_error_code() != Some(ErrorCode::DatabaseBusy) {
        tracing::error!(error = %e, "Database close failed");
        return;
    }

    tracing::warn!("Database busy on close, finalizing statements");
    conn.flush_prepared_statement_cache();
    match conn.close() {
        Ok(()) => tracing::debug!("Database closed after finalizing statements"),
        Err((_conn, e)) => tracing::error!(error = %e, "Database still busy on close"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;
    use tempfile::TempDir;

    #[test]
    fn test_acquire_lock_concurrent() {
        let mutex = Arc::new(Mutex::new(0));
        let mut handles = vec![];

        for _ in 0..10 {
            let mutex_clone = Arc::clone(&mutex);
            handles.push(thread::spawn(move || {
                let mut guard = acquire_lock(&mutex_clone);
                *guard += 1;
            }));
        }

        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(*acquire_lock(&mutex), 10);
    }

    #[test]
    fn test_acquire_lock_recovers_poison() {
        let mutex = Arc::new(Mutex::new(7));
        let clone = Arc::clone(&mutex);
        let _ = thread::spawn(move || {
            let _guard = clone.lock().unwrap();
            std::panic::panic_any("poison");
        })
        .join();

        assert!(mutex.is_poisoned());
        assert_eq!(*acquire_lock(&mutex), 7);
    }

    #[test]
    fn test_open_missing_file_without_create_fails() {
        let dir = TempDir::new().unwrap();
        let result = open_connection(&dir.path().join("absent.db"), false);
        assert!(matches!(result, Err(Error::Connection { .. })));
    }

    #[test]
    fn test_open_creates_when_allowed() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("sub").join("new.db");
        let conn = open_connection(&path, true).unwrap();
        conn.execute_batch("create table t (id integer)").unwrap();
        close_connection(conn);
        assert!(path.exists());
    }

    #[test]
    fn test_configure_connection() {
        let conn = Connection::open_in_memory().unwrap();
        let config = AccessConfig {
            foreign_keys: Some(true),
            busy_timeout_ms: 1234,
            ..AccessConfig::default()
        };
        configure_connection(&conn, &config);

        let busy_timeout: i32 = conn
            .pragma_query_value(None, "busy_timeout", |row| row.get(0))
            .unwrap();
        assert_eq!(busy_timeout, 1234);
        let foreign_keys: i32 = conn
            .pragma_query_value(None, "foreign_keys", |row| row.get(0))
            .unwrap();
        assert_eq!(foreign_keys, 1);
    }

    #[test]
    fn test_directive_without_transaction_is_harmless() {
        let conn = Connection::open_in_memory().unwrap();
        directive(&conn, "COMMIT TRANSACTION");
        directive(&conn, "BEGIN EXCLUSIVE TRANSACTION");
        directive(&conn, "COMMIT TRANSACTION");
        assert!(conn.is_autocommit());
    }
}
