//! # sqlaccess
//!
//! A thread-confined access layer over a single embedded `SQLite` database.
//!
//! sqlaccess funnels every statement through one of two serial execution
//! lanes, binds caller-built [`Value`] parameters positionally, decodes result
//! rows by declared column type, and derives INSERT/UPDATE statements from
//! records that list their own fields.
//!
//! ## Features
//!
//! - Idempotent open with optional seeding from a bundled template database
//! - Foreground and background serial lanes over one shared connection
//! - Per-unit transaction batches with optional rollback on failure
//! - Declared-type aware row decoding (including `DATE`/`DATETIME` columns)
//! - Corruption notifications over a broadcast [`EventBus`]
//! - Statement generation from any type implementing [`Record`]
//!
//! ## Example
//!
//! ```rust,ignore
//! use sqlaccess::{AccessConfig, Gateway, Value};
//!
//! let gateway = Gateway::new(AccessConfig::load_default())?;
//! gateway.open(true)?;
//! gateway.execute("insert into notes (id, body) values (?, ?)", &[Value::from(1), "hi".into()]);
//! let rows = gateway.query("select * from notes", &[]);
//! ```

#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
#![warn(missing_docs)]
#![forbid(unsafe_code)]
#![allow(clippy::multiple_crate_versions)]

use thiserror::Error as ThisError;

pub mod config;
pub mod gateway;
pub mod models;
pub mod observability;
pub mod record;
pub mod storage;

pub use config::AccessConfig;
pub use gateway::{Gateway, Lane, LaneHandle};
pub use models::{DatabaseEvent, DateCodec, Row, TransactionBatch, TransactionUnit, Value};
pub use observability::EventBus;
pub use record::{Record, RecordDescriptor, StatementGenerator};
pub use storage::{FileStore, LocalFileStore};

/// Error type for sqlaccess operations.
///
/// # Error Variant Triggers
///
/// | Variant | Raised When |
/// |---------|-------------|
/// | `Connection` | Seed copy fails, the engine cannot open the file |
/// | `NotOpen` | A statement is issued before `open` or after `close` |
/// | `Prepare` | The engine rejects the SQL text or cannot read the schema |
/// | `Bind` | The engine rejects a positional parameter |
/// | `Step` | The engine fails while executing a prepared statement |
/// | `TransactionUnit` | One unit of a batch failed |
/// | `Decode` | A cell cannot be read as its resolved column type |
/// | `Config` | A configuration file cannot be read or parsed |
/// | `Io` | A file collaborator operation fails |
/// | `Unavailable` | An execution lane's worker thread has stopped |
#[derive(Debug, ThisError)]
pub enum Error {
    /// The database could not be opened or seeded.
    #[error("connection to '{path}' failed: {cause}")]
    Connection {
        /// Database path the open was attempted against.
        path: String,
        /// The underlying cause.
        cause: String,
    },

    /// No connection is open.
    #[error("database is not open")]
    NotOpen,

    /// The SQL text could not be compiled.
    #[error("prepare failed: {cause} (sql: {sql})")]
    Prepare {
        /// The rejected statement text.
        sql: String,
        /// Primary engine error code, when the engine reported one.
        code: Option<rusqlite::ErrorCode>,
        /// The underlying cause.
        cause: String,
    },

    /// A parameter could not be bound.
    #[error("bind of parameter {index} failed: {cause}")]
    Bind {
        /// One-based placeholder index.
        index: usize,
        /// The underlying cause.
        cause: String,
    },

    /// The engine rejected execution.
    #[error("step failed: {cause} (sql: {sql})")]
    Step {
        /// The statement text.
        sql: String,
        /// Primary engine error code, when the engine reported one.
        code: Option<rusqlite::ErrorCode>,
        /// The underlying cause.
        cause: String,
    },

    /// One unit of a transaction batch failed.
    #[error("transaction unit {index} failed: {source}")]
    TransactionUnit {
        /// Zero-based position of the unit in its batch.
        index: usize,
        /// The failure of the unit.
        #[source]
        source: Box<Error>,
    },

    /// A stored value could not be decoded.
    #[error("decode of column '{column}' failed: {cause}")]
    Decode {
        /// Column name.
        column: String,
        /// The underlying cause.
        cause: String,
    },

    /// Configuration could not be loaded.
    #[error("config '{operation}' failed: {cause}")]
    Config {
        /// The configuration step that failed.
        operation: String,
        /// The underlying cause.
        cause: String,
    },

    /// A file operation failed.
    #[error("file operation '{operation}' failed: {cause}")]
    Io {
        /// The file operation that failed.
        operation: String,
        /// The underlying cause.
        cause: String,
    },

    /// An execution lane cannot accept work.
    #[error("execution lane '{lane}' is unavailable")]
    Unavailable {
        /// Lane name.
        lane: String,
    },
}

impl Error {
    /// Returns true when the engine reported that the database file is corrupt.
    #[must_use]
    pub fn is_corruption(&self) -> bool {
        match self {
            Self::Prepare { code, .. } | Self::Step { code, .. } => {
                *code == Some(rusqlite::ErrorCode::DatabaseCorrupt)
            },
            Self::TransactionUnit { source, .. } => source.is_corruption(),
            _ => false,
        }
    }
}

/// Result type alias for sqlaccess operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Returns the current Unix timestamp in seconds.
///
/// Falls back to 0 if the system clock is before the Unix epoch.
///
/// # Examples
///
/// ```rust
/// use sqlaccess::current_timestamp;
///
/// assert!(current_timestamp() > 0);
/// ```
#[must_use]
pub fn current_timestamp() -> u64 {
    use std::time::{SystemTime, UNIX_EPOCH};
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}
