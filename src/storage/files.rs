//! Database file placement.
//!
//! The gateway never touches the filesystem directly: seeding the live
//! database from a bundled template and replacing it wholesale go through a
//! [`FileStore`]. [`LocalFileStore`] is the `std::fs` implementation.
//!
//! # Examples
//!
//! ```rust,ignore
//! use sqlaccess::storage::{FileStore, LocalFileStore};
//!
//! let files = LocalFileStore::new();
//! if !files.file_exists(&live) {
//!     files.copy_file(&template, &live)?;
//! }
//! ```

use crate::{Error, Result};
use std::path::Path;

/// Synchronous file operations on the application's private storage.
pub trait FileStore: Send + Sync {
    /// Returns true if a file exists at `path`.
    fn file_exists(&self, path: &Path) -> bool;

    /// Copies `from` to `to`, creating the destination directory if needed.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Io`] if the copy fails.
    fn copy_file(&self, from: &Path, to: &Path) -> Result<()>;

    /// Removes the file at `path`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Io`] if the file cannot be removed.
    fn remove_file(&self, path: &Path) -> Result<()>;

    /// Moves `from` to `to`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Io`] if the move fails.
    fn move_file(&self, from: &Path, to: &Path) -> Result<()>;

    /// Replaces `target` with `replacement`: removes the target, moves the
    /// replacement into its place and checks the result exists.
    ///
    /// # Errors
    ///
    /// Returns the first failing step's error, or [`Error::Io`] if the
    /// target is missing afterwards.
    fn replace_file(&self, target: &Path, replacement: &Path) -> Result<()> {
        self.remove_file(target)?;
        self.move_file(replacement, target)?;
        if self.file_exists(target) {
            Ok(())
        } else {
            Err(Error::Io {
                operation: "replace_file".to_string(),
                cause: format!("{} missing after replace", target.display()),
            })
        }
    }
}

/// [`FileStore`] backed by the local filesystem.
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalFileStore;

impl LocalFileStore {
    /// Creates a local file store.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

fn io_error(operation: &str, path: &Path, e: &std::io::Error) -> Error {
    Error::Io {
        operation: operation.to_string(),
        cause: format!("{}: {e}", path.display()),
    }
}

impl FileStore for LocalFileStore {
    fn file_exists(&self, path: &Path) -> bool {
        path.is_file()
    }

    fn copy_file(&self, from: &Path, to: &Path) -> Result<()> {
        if let Some(parent) = to.parent() {
            std::fs::create_dir_all(parent).map_err(|e| io_error("create_dir", parent, &e))?;
        }
        std::fs::copy(from, to).map_err(|e| io_error("copy_file", from, &e))?;
        tracing::debug!(from = %from.display(), to = %to.display(), "Copied file");
        Ok(())
    }

    fn remove_file(&self, path: &Path) -> Result<()> {
        std::fs::remove_file(path).map_err(|e| io_error("remove_file", path, &e))
    }

    fn move_file(&self, from: &Path, to: &Path) -> Result<()> {
        std::fs::rename(from, to).map_err(|e| io_error("move_file", from, &e))
    }
}
