//! Data models for sqlaccess.
//!
//! This module contains the value types that cross the gateway boundary:
//! positional parameters, decoded rows, transaction units and the fixed
//! timestamp codec.

mod events;
mod row;
mod timestamp;
mod transaction;
mod value;

pub use events::DatabaseEvent;
pub use row::Row;
pub use timestamp::{DATE_FORMAT, DateCodec};
pub use transaction::{TransactionBatch, TransactionUnit};
pub use value::Value;
