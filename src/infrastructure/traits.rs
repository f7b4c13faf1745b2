//! I/O boundary traits for testability
//!
//! These traits abstract persistence and file access, allowing services
//! to be tested with in-memory implementations.

use std::io;
use std::path::Path;

use crate::domain::ObjectId;
use crate::infrastructure::store::{Record, Table};
use crate::infrastructure::InfraResult;

/// Filesystem abstraction for testability.
pub trait FileSystem: Send + Sync {
    /// Read file contents to string.
    fn read_to_string(&self, path: &Path) -> io::Result<String>;

    /// Write string content to file.
    fn write(&self, path: &Path, content: &str) -> io::Result<()>;

    /// Check if path exists.
    fn exists(&self, path: &Path) -> bool;

    /// Rename/move a file.
    fn rename(&self, from: &Path, to: &Path) -> io::Result<()>;

    /// Create directory and all parent directories.
    fn create_dir_all(&self, path: &Path) -> io::Result<()>;

    /// Create parent directories if needed.
    fn ensure_parent(&self, path: &Path) -> io::Result<()>;
}

/// Persistent storage of events, clusters and subclones.
///
/// Identifiers are positive and unique per table; `0` means unassigned.
pub trait ObjectStore: Send + Sync {
    /// Create the backing storage of `table`. Idempotent.
    fn create_schema(&self, table: Table) -> InfraResult<()>;

    /// Store `record` under `id`, or under a fresh id when `id` is 0.
    /// Returns the id the record is stored under.
    fn save(&self, id: ObjectId, record: Record) -> InfraResult<ObjectId>;

    fn load(&self, table: Table, id: ObjectId) -> InfraResult<Option<Record>>;

    /// Drop a row; returns whether it existed.
    fn remove(&self, table: Table, id: ObjectId) -> InfraResult<bool>;

    /// Ids of all rows of `table`, ascending.
    fn ids(&self, table: Table) -> InfraResult<Vec<ObjectId>>;

    /// Open a transaction. Transactions nest; changes become durable when the
    /// outermost one commits.
    fn begin(&self) -> InfraResult<()>;

    /// Close the innermost transaction, keeping its changes.
    fn commit(&self) -> InfraResult<()>;

    /// Close the innermost transaction, discarding its changes.
    fn rollback(&self) -> InfraResult<()>;

    /// Ids of the rows of `table` belonging to `parent`, ascending.
    ///
    /// Subclones belong to their parent subclone, clusters to their
    /// subclone, and events to the cluster listing them.
    fn children_of(&self, table: Table, parent: ObjectId) -> InfraResult<Vec<ObjectId>>;
}

// ============================================================
// REAL IMPLEMENTATIONS
// ============================================================

/// Real filesystem implementation.
#[derive(Debug, Default)]
pub struct RealFileSystem;

impl FileSystem for RealFileSystem {
    fn read_to_string(&self, path: &Path) -> io::Result<String> {
        std::fs::read_to_string(path)
    }

    fn write(&self, path: &Path, content: &str) -> io::Result<()> {
        std::fs::write(path, content)
    }

    fn exists(&self, path: &Path) -> bool {
        path.exists()
    }

    fn rename(&self, from: &Path, to: &Path) -> io::Result<()> {
        std::fs::rename(from, to)
    }

    fn create_dir_all(&self, path: &Path) -> io::Result<()> {
        std::fs::create_dir_all(path)
    }

    fn ensure_parent(&self, path: &Path) -> io::Result<()> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                self.create_dir_all(parent)?;
            }
        }
        Ok(())
    }
}
