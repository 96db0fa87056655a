//! `SQLite` plumbing shared by both execution lanes.
//!
//! ## Module Structure
//!
//! - [`connection`]: open/close, lock acquisition, connection pragmas
//! - [`column_type`]: declared-type to [`ColumnType`] resolution
//! - [`bind`]: [`Value`](crate::Value) to engine parameter binding
//! - [`decode`]: engine cell to [`Value`](crate::Value) decoding
//! - [`statement`]: prepare, bind, step and finalize within one call
//! - [`metrics`]: per-operation counters and latency histograms

mod bind;
mod column_type;
mod connection;
mod decode;
mod metrics;
mod statement;

pub use bind::bind_parameters;
pub use column_type::ColumnType;
pub use connection::{
    acquire_lock, close_connection, configure_connection, directive, open_connection,
};
pub use decode::{ColumnSpec, column_specs, decode_cell, decode_row};
pub use metrics::record_operation_metrics;
pub use statement::{execute_statement, query_statement};
