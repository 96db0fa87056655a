//! Execution gateway.
//!
//! The [`Gateway`] owns the single database connection and two serial
//! lanes. Every statement runs on a lane's worker thread while holding the
//! connection mutex for the whole call, so statements from the two lanes
//! never interleave inside one call.
//!
//! Statement failures are recovered here: the plain methods log the failure
//! and report it as `false` or an empty (or partial) row list, while the
//! `try_*` methods hand the [`Error`] back. Either way, an engine-reported
//! corruption publishes [`DatabaseEvent::Corrupted`] on the event bus.
//!
//! # Examples
//!
//! ```rust,ignore
//! use sqlaccess::{AccessConfig, Gateway, TransactionUnit, Value};
//!
//! let gateway = Gateway::new(AccessConfig::load_default())?;
//! gateway.open(true)?;
//! gateway.execute("insert into notes (id, body) values (?, ?)", &[1.into(), "hi".into()]);
//!
//! let batch = vec![
//!     TransactionUnit::new("delete from notes where id = ?", vec![1.into()]),
//!     TransactionUnit::new("insert into notes (id) values (?)", vec![2.into()]),
//! ];
//! gateway.background().execute_batch(&batch, true);
//! ```

mod lane;

pub use lane::Lane;

use crate::config::AccessConfig;
use crate::models::DatabaseEvent;
use crate::observability::{EventBus, global_event_bus};
use crate::storage::sqlite::{
    acquire_lock, close_connection, configure_connection, directive, execute_statement,
    open_connection, query_statement, record_operation_metrics,
};
use crate::storage::{FileStore, LocalFileStore};
use crate::{Error, Result, Row, TransactionUnit, Value};
use lane::SerialQueue;
use rusqlite::Connection;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Instant;
use tokio::sync::broadcast;

const BEGIN: &str = "BEGIN EXCLUSIVE TRANSACTION";
const COMMIT: &str = "COMMIT TRANSACTION";
const ROLLBACK: &str = "ROLLBACK TRANSACTION";

/// State shared by both lanes.
struct Shared {
    conn: Mutex<Option<Connection>>,
    rollback_on_error: AtomicBool,
    events: EventBus,
}

impl Shared {
    fn execute(&self, lane: Lane, sql: &str, params: &[Value]) -> Result<()> {
        let start = Instant::now();
        let result = {
            let guard = acquire_lock(&self.conn);
            guard.as_ref().ok_or(Error::NotOpen).and_then(|conn| {
                let result = execute_statement(conn, sql, params);
                directive(conn, COMMIT);
                result
            })
        };
        self.finish(lane, "execute", start, &result);
        result
    }

    fn query(&self, lane: Lane, sql: &str, params: &[Value], rows: &mut Vec<Row>) -> Result<()> {
        let start = Instant::now();
        let result = {
            let guard = acquire_lock(&self.conn);
            guard.as_ref().ok_or(Error::NotOpen).and_then(|conn| {
                let result = query_statement(conn, sql, params, rows).map(|_| ());
                directive(conn, COMMIT);
                result
            })
        };
        self.finish(lane, "query", start, &result);
        result
    }

    /// Runs each unit in its own exclusive transaction.
    ///
    /// A failed unit is reported, rolled back if requested, and the loop
    /// moves on. The result is the last unit's.
    fn batch(
        &self,
        lane: Lane,
        batch: &[TransactionUnit],
        rollback_on_error: bool,
        mut rows: Option<&mut Vec<Row>>,
    ) -> Result<()> {
        let start = Instant::now();
        let operation = if rows.is_some() {
            "query_batch"
        } else {
            "execute_batch"
        };

        let result = {
            let guard = acquire_lock(&self.conn);
            match guard.as_ref() {
                None => Err(Error::NotOpen),
                Some(conn) => {
                    let mut last = Ok(());
                    for (index, unit) in batch.iter().enumerate() {
                        directive(conn, BEGIN);
                        let outcome = match rows.as_deref_mut() {
                            Some(rows) => query_statement(conn, &unit.sql, &unit.params, rows)
                                .map(|_| ()),
                            None => execute_statement(conn, &unit.sql, &unit.params),
                        }
                        .map_err(|e| Error::TransactionUnit {
                            index,
                            source: Box::new(e),
                        });
                        if let Err(e) = &outcome {
                            self.report(lane, operation, e);
                            if rollback_on_error {
                                directive(conn, ROLLBACK);
                            }
                        }
                        directive(conn, COMMIT);
                        last = outcome;
                    }
                    last
                },
            }
        };

        let status = if result.is_ok() { "success" } else { "error" };
        record_operation_metrics(lane.as_str(), operation, start, status);
        if let Err(e @ Error::NotOpen) = &result {
            self.report(lane, operation, e);
        }
        result
    }

    fn finish(&self, lane: Lane, operation: &'static str, start: Instant, result: &Result<()>) {
        match result {
            Ok(()) => record_operation_metrics(lane.as_str(), operation, start, "success"),
            Err(e) => {
                record_operation_metrics(lane.as_str(), operation, start, "error");
                self.report(lane, operation, e);
            },
        }
    }

    /// Logs a statement failure and publishes corruption.
    fn report(&self, lane: Lane, operation: &'static str, error: &Error) {
        tracing::error!(lane = %lane, operation, error = %error, "Statement failed");
        if error.is_corruption() {
            tracing::error!(lane = %lane, operation, "Database corruption detected");
            metrics::counter!("gateway_corruption_events_total").increment(1);
            self.events.publish(DatabaseEvent::Corrupted);
        }
    }
}

/// Execution gateway over one embedded database connection.
pub struct Gateway {
    shared: Arc<Shared>,
    config: Mutex<AccessConfig>,
    files: Arc<dyn FileStore>,
    foreground: SerialQueue,
    background: SerialQueue,
}

impl Gateway {
    /// Creates a closed gateway backed by the local filesystem and the
    /// process-wide event bus.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Unavailable`] if a lane's worker thread cannot start.
    pub fn new(config: AccessConfig) -> Result<Self> {
        Self::with_parts(
            config,
            Arc::new(LocalFileStore::new()),
            global_event_bus().clone(),
        )
    }

    /// Creates a closed gateway with explicit collaborators.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Unavailable`] if a lane's worker thread cannot start.
    pub fn with_parts(
        config: AccessConfig,
        files: Arc<dyn FileStore>,
        events: EventBus,
    ) -> Result<Self> {
        let shared = Arc::new(Shared {
            conn: Mutex::new(None),
            rollback_on_error: AtomicBool::new(config.rollback_on_error),
            events,
        });
        Ok(Self {
            shared,
            config: Mutex::new(config),
            files,
            foreground: SerialQueue::spawn(Lane::Foreground)?,
            background: SerialQueue::spawn(Lane::Background)?,
        })
    }

    /// Opens the database. A no-op success when already open.
    ///
    /// When the database file is absent and `copy_seed_file` is set, the
    /// bundled template of the same name is copied from the seed directory
    /// first.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Connection`] if the seed copy or the open fails.
    pub fn open(&self, copy_seed_file: bool) -> Result<()> {
        let mut guard = acquire_lock(&self.shared.conn);
        if guard.is_some() {
            return Ok(());
        }

        let config = acquire_lock(&self.config).clone();
        let path = config.database_path();
        if copy_seed_file && !self.files.file_exists(&path) {
            self.copy_seed(&config, &path)?;
        }

        let conn = open_connection(&path, config.create_if_missing)?;
        configure_connection(&conn, &config);
        *guard = Some(conn);
        drop(guard);

        tracing::debug!(path = %path.display(), "Database opened");
        self.shared.events.publish(DatabaseEvent::Opened {
            path: path.display().to_string(),
        });
        Ok(())
    }

    fn copy_seed(&self, config: &AccessConfig, path: &Path) -> Result<()> {
        let connection_error = |cause: String| {
            tracing::error!(path = %path.display(), cause, "Failed to seed database");
            Error::Connection {
                path: path.display().to_string(),
                cause,
            }
        };

        let Some(seed_dir) = config.seed_dir.as_ref() else {
            return Err(connection_error("no seed directory configured".to_string()));
        };
        let seed = seed_dir.join(&config.database_name);
        self.files
            .copy_file(&seed, path)
            .map_err(|e| connection_error(e.to_string()))?;
        tracing::debug!(seed = %seed.display(), "Seeded database from template");
        Ok(())
    }

    /// Closes the database. Closing a closed gateway does nothing.
    pub fn close(&self) {
        let conn = acquire_lock(&self.shared.conn).take();
        if let Some(conn) = conn {
            close_connection(conn);
            self.shared.events.publish(DatabaseEvent::Closed);
        }
    }

    /// Returns true while a connection is open.
    #[must_use]
    pub fn is_open(&self) -> bool {
        acquire_lock(&self.shared.conn).is_some()
    }

    /// Returns a handle running operations on `lane`.
    #[must_use]
    pub fn lane(&self, lane: Lane) -> LaneHandle<'_> {
        let queue = match lane {
            Lane::Foreground => &self.foreground,
            Lane::Background => &self.background,
        };
        LaneHandle {
            lane,
            queue,
            shared: &self.shared,
        }
    }

    /// Returns a handle running operations on the foreground lane.
    #[must_use]
    pub fn foreground(&self) -> LaneHandle<'_> {
        self.lane(Lane::Foreground)
    }

    /// Returns a handle running operations on the background lane.
    #[must_use]
    pub fn background(&self) -> LaneHandle<'_> {
        self.lane(Lane::Background)
    }

    /// Executes one statement on the foreground lane.
    pub fn execute(&self, sql: &str, params: &[Value]) -> bool {
        self.foreground().execute(sql, params)
    }

    /// Executes one statement on the foreground lane.
    ///
    /// # Errors
    ///
    /// Returns the prepare or step failure, or [`Error::NotOpen`].
    pub fn try_execute(&self, sql: &str, params: &[Value]) -> Result<()> {
        self.foreground().try_execute(sql, params)
    }

    /// Runs a query on the foreground lane.
    #[must_use]
    pub fn query(&self, sql: &str, params: &[Value]) -> Vec<Row> {
        self.foreground().query(sql, params)
    }

    /// Runs a query on the foreground lane.
    ///
    /// # Errors
    ///
    /// Returns the prepare or step failure, or [`Error::NotOpen`].
    pub fn try_query(&self, sql: &str, params: &[Value]) -> Result<Vec<Row>> {
        self.foreground().try_query(sql, params)
    }

    /// Executes a transaction batch on the foreground lane.
    pub fn execute_batch(&self, batch: &[TransactionUnit], rollback_on_error: bool) -> bool {
        self.foreground().execute_batch(batch, rollback_on_error)
    }

    /// Executes a transaction batch on the foreground lane.
    ///
    /// # Errors
    ///
    /// Returns the last unit's failure, or [`Error::NotOpen`].
    pub fn try_execute_batch(
        &self,
        batch: &[TransactionUnit],
        rollback_on_error: bool,
    ) -> Result<()> {
        self.foreground().try_execute_batch(batch, rollback_on_error)
    }

    /// Runs a query batch on the foreground lane.
    #[must_use]
    pub fn query_batch(&self, batch: &[TransactionUnit], rollback_on_error: bool) -> Vec<Row> {
        self.foreground().query_batch(batch, rollback_on_error)
    }

    /// Runs a query batch on the foreground lane.
    ///
    /// # Errors
    ///
    /// Returns the last unit's failure, or [`Error::NotOpen`].
    pub fn try_query_batch(
        &self,
        batch: &[TransactionUnit],
        rollback_on_error: bool,
    ) -> Result<Vec<Row>> {
        self.foreground().try_query_batch(batch, rollback_on_error)
    }

    /// Returns the rollback preference for batches.
    #[must_use]
    pub fn rollback_on_error(&self) -> bool {
        self.shared.rollback_on_error.load(Ordering::SeqCst)
    }

    /// Sets the rollback preference for batches.
    pub fn set_rollback_on_error(&self, enable: bool) {
        self.shared.rollback_on_error.store(enable, Ordering::SeqCst);
    }

    /// Turns foreign key enforcement on or off for the open connection.
    ///
    /// Returns false if the database is closed or the engine rejects the
    /// pragma.
    pub fn set_foreign_keys(&self, enable: bool) -> bool {
        let guard = acquire_lock(&self.shared.conn);
        let Some(conn) = guard.as_ref() else {
            tracing::error!(error = %Error::NotOpen, "Cannot set foreign keys");
            return false;
        };
        match conn.pragma_update(None, "foreign_keys", enable) {
            Ok(()) => true,
            Err(e) => {
                tracing::error!(enable, error = %e, "Failed to set foreign keys");
                false
            },
        }
    }

    /// Returns the event bus corruption and lifecycle events go to.
    #[must_use]
    pub fn events(&self) -> &EventBus {
        &self.shared.events
    }

    /// Subscribes to the gateway's events.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<DatabaseEvent> {
        self.shared.events.subscribe()
    }

    /// Returns the version string of the linked `SQLite` library.
    #[must_use]
    pub fn engine_version() -> &'static str {
        rusqlite::version()
    }

    /// Returns the database file name.
    #[must_use]
    pub fn database_name(&self) -> String {
        acquire_lock(&self.config).database_name.clone()
    }

    /// Sets the database file name. Takes effect on the next open.
    pub fn set_database_name(&self, name: impl Into<String>) {
        acquire_lock(&self.config).database_name = name.into();
    }

    /// Returns the full path of the live database file.
    #[must_use]
    pub fn database_path(&self) -> PathBuf {
        acquire_lock(&self.config).database_path()
    }

    fn resolve(&self, name: impl AsRef<Path>) -> PathBuf {
        acquire_lock(&self.config).data_dir.join(name)
    }

    /// Returns true if `name` exists in the data directory.
    #[must_use]
    pub fn file_exists(&self, name: impl AsRef<Path>) -> bool {
        self.files.file_exists(&self.resolve(name))
    }

    /// Removes `name` from the data directory.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Io`] if the file cannot be removed.
    pub fn remove_file(&self, name: impl AsRef<Path>) -> Result<()> {
        self.files.remove_file(&self.resolve(name))
    }

    /// Copies `from` to `to`, both relative to the data directory unless
    /// absolute.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Io`] if the copy fails.
    pub fn copy_file(&self, from: impl AsRef<Path>, to: impl AsRef<Path>) -> Result<()> {
        self.files.copy_file(&self.resolve(from), &self.resolve(to))
    }

    /// Replaces `target` with `replacement` in the data directory.
    ///
    /// # Errors
    ///
    /// Returns the failing step's [`Error::Io`].
    pub fn replace_file(
        &self,
        target: impl AsRef<Path>,
        replacement: impl AsRef<Path>,
    ) -> Result<()> {
        self.files
            .replace_file(&self.resolve(target), &self.resolve(replacement))
    }
}

impl Drop for Gateway {
    fn drop(&mut self) {
        self.foreground.shutdown();
        self.background.shutdown();
        self.close();
    }
}

/// Runs gateway operations on one serial lane.
pub struct LaneHandle<'g> {
    lane: Lane,
    queue: &'g SerialQueue,
    shared: &'g Arc<Shared>,
}

impl LaneHandle<'_> {
    /// Returns the lane this handle runs on.
    #[must_use]
    pub const fn lane(&self) -> Lane {
        self.lane
    }

    /// Executes one statement, expecting it to complete without rows.
    ///
    /// Returns false on failure; the cause is logged.
    pub fn execute(&self, sql: &str, params: &[Value]) -> bool {
        self.try_execute(sql, params).is_ok()
    }

    /// Executes one statement, expecting it to complete without rows.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Prepare`] or [`Error::Step`] from the statement,
    /// [`Error::NotOpen`] or [`Error::Unavailable`].
    pub fn try_execute(&self, sql: &str, params: &[Value]) -> Result<()> {
        let shared = Arc::clone(self.shared);
        let lane = self.lane;
        let sql = sql.to_string();
        let params = params.to_vec();
        self.queue
            .run(move || shared.execute(lane, &sql, &params))?
    }

    /// Runs a query, returning every row decoded before any failure.
    #[must_use]
    pub fn query(&self, sql: &str, params: &[Value]) -> Vec<Row> {
        self.run_query(sql, params).0
    }

    /// Runs a query.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Prepare`] or [`Error::Step`] from the statement,
    /// [`Error::NotOpen`] or [`Error::Unavailable`].
    pub fn try_query(&self, sql: &str, params: &[Value]) -> Result<Vec<Row>> {
        let (rows, result) = self.run_query(sql, params);
        result.map(|()| rows)
    }

    fn run_query(&self, sql: &str, params: &[Value]) -> (Vec<Row>, Result<()>) {
        let shared = Arc::clone(self.shared);
        let lane = self.lane;
        let sql = sql.to_string();
        let params = params.to_vec();
        self.queue
            .run(move || {
                let mut rows = Vec::new();
                let result = shared.query(lane, &sql, &params, &mut rows);
                (rows, result)
            })
            .unwrap_or_else(|e| (Vec::new(), Err(e)))
    }

    /// Executes each unit in its own exclusive transaction.
    ///
    /// Returns the last unit's success; an empty batch succeeds.
    pub fn execute_batch(&self, batch: &[TransactionUnit], rollback_on_error: bool) -> bool {
        self.try_execute_batch(batch, rollback_on_error).is_ok()
    }

    /// Executes each unit in its own exclusive transaction.
    ///
    /// # Errors
    ///
    /// Returns the last unit's failure as [`Error::TransactionUnit`],
    /// [`Error::NotOpen`] or [`Error::Unavailable`].
    pub fn try_execute_batch(
        &self,
        batch: &[TransactionUnit],
        rollback_on_error: bool,
    ) -> Result<()> {
        let shared = Arc::clone(self.shared);
        let lane = self.lane;
        let batch = batch.to_vec();
        self.queue
            .run(move || shared.batch(lane, &batch, rollback_on_error, None))?
    }

    /// Runs each unit as a query in its own exclusive transaction and
    /// concatenates the rows.
    #[must_use]
    pub fn query_batch(&self, batch: &[TransactionUnit], rollback_on_error: bool) -> Vec<Row> {
        self.run_query_batch(batch, rollback_on_error).0
    }

    /// Runs each unit as a query in its own exclusive transaction.
    ///
    /// # Errors
    ///
    /// Returns the last unit's failure as [`Error::TransactionUnit`],
    /// [`Error::NotOpen`] or [`Error::Unavailable`].
    pub fn try_query_batch(
        &self,
        batch: &[TransactionUnit],
        rollback_on_error: bool,
    ) -> Result<Vec<Row>> {
        let (rows, result) = self.run_query_batch(batch, rollback_on_error);
        result.map(|()| rows)
    }

    fn run_query_batch(
        &self,
        batch: &[TransactionUnit],
        rollback_on_error: bool,
    ) -> (Vec<Row>, Result<()>) {
        let shared = Arc::clone(self.shared);
        let lane = self.lane;
        let batch = batch.to_vec();
        self.queue
            .run(move || {
                let mut rows = Vec::new();
                let result = shared.batch(lane, &batch, rollback_on_error, Some(&mut rows));
                (rows, result)
            })
            .unwrap_or_else(|e| (Vec::new(), Err(e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn gateway(dir: &TempDir) -> Gateway {
        let config = AccessConfig::new()
            .with_data_dir(dir.path())
            .with_database_name("test.db")
            .with_create_if_missing(true);
        Gateway::with_parts(config, Arc::new(LocalFileStore::new()), EventBus::new(8)).unwrap()
    }

    #[test]
    fn test_statements_require_open() {
        let dir = TempDir::new().unwrap();
        let gateway = gateway(&dir);
        assert!(!gateway.is_open());
        assert!(matches!(gateway.try_execute("select 1", &[]), Err(Error::NotOpen)));
        assert!(gateway.query("select 1", &[]).is_empty());
        assert!(!gateway.execute_batch(&[], false));
    }

    #[test]
    fn test_report_publishes_corruption() {
        let dir = TempDir::new().unwrap();
        let gateway = gateway(&dir);
        let mut events = gateway.subscribe();

        let corrupt = Error::TransactionUnit {
            index: 0,
            source: Box::new(Error::Step {
                sql: "insert".to_string(),
                code: Some(rusqlite::ErrorCode::DatabaseCorrupt),
                cause: "database disk image is malformed".to_string(),
            }),
        };
        gateway.shared.report(Lane::Background, "execute_batch", &corrupt);
        assert_eq!(events.try_recv().unwrap(), DatabaseEvent::Corrupted);

        gateway.shared.report(Lane::Foreground, "execute", &Error::NotOpen);
        assert!(events.try_recv().is_err());
    }

    #[test]
    fn test_open_close_publish_lifecycle_events() {
        let dir = TempDir::new().unwrap();
        let gateway = gateway(&dir);
        let mut events = gateway.subscribe();

        gateway.open(false).unwrap();
        gateway.open(false).unwrap();
        gateway.close();
        gateway.close();

        assert!(matches!(events.try_recv().unwrap(), DatabaseEvent::Opened { .. }));
        assert_eq!(events.try_recv().unwrap(), DatabaseEvent::Closed);
        assert!(events.try_recv().is_err());
    }

    #[test]
    fn test_set_foreign_keys() {
        let dir = TempDir::new().unwrap();
        let gateway = gateway(&dir);
        assert!(!gateway.set_foreign_keys(true));

        gateway.open(false).unwrap();
        assert!(gateway.set_foreign_keys(true));
        let rows = gateway.query("pragma foreign_keys", &[]);
        assert_eq!(rows[0].get("foreign_keys"), Some(&Value::Int64(1)));
    }

    #[test]
    fn test_rollback_preference_seeded_from_config() {
        let dir = TempDir::new().unwrap();
        let config = AccessConfig::new()
            .with_data_dir(dir.path())
            .with_rollback_on_error(true);
        let gateway =
            Gateway::with_parts(config, Arc::new(LocalFileStore::new()), EventBus::new(8))
                .unwrap();
        assert!(gateway.rollback_on_error());
        gateway.set_rollback_on_error(false);
        assert!(!gateway.rollback_on_error());
    }

    #[test]
    fn test_database_name_applies_on_next_open() {
        let dir = TempDir::new().unwrap();
        let gateway = gateway(&dir);
        gateway.open(false).unwrap();
        gateway.set_database_name("other.db");
        assert_eq!(gateway.database_name(), "other.db");
        assert!(!gateway.file_exists("other.db"));

        gateway.close();
        gateway.open(false).unwrap();
        assert!(gateway.file_exists("other.db"));
        assert_eq!(gateway.database_path(), dir.path().join("other.db"));
    }

    #[test]
    fn test_engine_version() {
        assert!(Gateway::engine_version().starts_with('3'));
    }
}
