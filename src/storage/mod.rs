//! Storage layer.
//!
//! - [`files`]: the database-file collaborator (exists, copy, remove, move)
//! - [`sqlite`]: connection handling, column type resolution, the value
//!   codec and the single-statement lifecycle

// Allow significant_drop_tightening - connection guards are held for a whole call.
#![allow(clippy::significant_drop_tightening)]
// Allow match_same_arms for explicit storage-class handling.
#![allow(clippy::match_same_arms)]

pub mod files;
pub mod sqlite;

pub use files::{FileStore, LocalFileStore};
