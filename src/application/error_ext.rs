//! Error conversion helpers for store writes
//!
//! Provides an extension trait to tag failed writes with what was being saved.

use crate::application::{ApplicationError, ApplicationResult};
use crate::domain::ObjectId;
use crate::infrastructure::InfraResult;

/// Extension trait for converting `InfraResult` to `ApplicationResult` on save paths.
pub trait SaveResultExt<T> {
    /// Turn a store failure into [`ApplicationError::SaveFailed`].
    ///
    /// # Example
    /// ```ignore
    /// store.save(id, record).save_context("subclone", id)?;
    /// ```
    fn save_context(self, kind: &str, id: ObjectId) -> ApplicationResult<T>;
}

impl<T> SaveResultExt<T> for InfraResult<T> {
    fn save_context(self, kind: &str, id: ObjectId) -> ApplicationResult<T> {
        self.map_err(|e| ApplicationError::SaveFailed {
            context: format!("{} {}", kind, id),
            source: e,
        })
    }
}
