use std::sync::{Mutex, MutexGuard};

use tracing::instrument;

use super::{Journal, Record, Table};
use crate::domain::ObjectId;
use crate::infrastructure::traits::ObjectStore;
use crate::infrastructure::{InfraError, InfraResult};

/// Volatile store, for tests and one-shot comparisons.
#[derive(Debug, Default)]
pub struct InMemoryStore {
    journal: Mutex<Journal>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store with all tables already created.
    pub fn with_schema() -> Self {
        let store = Self::new();
        if let Ok(mut journal) = store.journal.lock() {
            for table in Table::ALL {
                journal.tables.create_schema(table);
            }
        }
        store
    }

    fn lock(&self) -> InfraResult<MutexGuard<'_, Journal>> {
        self.journal
            .lock()
            .map_err(|e| InfraError::store(format!("store lock poisoned: {}", e)))
    }
}

impl ObjectStore for InMemoryStore {
    fn create_schema(&self, table: Table) -> InfraResult<()> {
        self.lock()?.tables.create_schema(table);
        Ok(())
    }

    #[instrument(level = "trace", skip(self, record))]
    fn save(&self, id: ObjectId, record: Record) -> InfraResult<ObjectId> {
        self.lock()?.tables.save(id, record)
    }

    #[instrument(level = "trace", skip(self))]
    fn load(&self, table: Table, id: ObjectId) -> InfraResult<Option<Record>> {
        self.lock()?.tables.load(table, id)
    }

    fn remove(&self, table: Table, id: ObjectId) -> InfraResult<bool> {
        self.lock()?.tables.remove(table, id)
    }

    fn ids(&self, table: Table) -> InfraResult<Vec<ObjectId>> {
        self.lock()?.tables.ids(table)
    }

    fn begin(&self) -> InfraResult<()> {
        self.lock()?.begin();
        Ok(())
    }

    fn commit(&self) -> InfraResult<()> {
        self.lock()?.commit().map(|_| ())
    }

    fn rollback(&self) -> InfraResult<()> {
        self.lock()?.rollback()
    }

    #[instrument(level = "trace", skip(self))]
    fn children_of(&self, table: Table, parent: ObjectId) -> InfraResult<Vec<ObjectId>> {
        self.lock()?.tables.children_of(table, parent)
    }
}
