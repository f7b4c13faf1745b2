//! Object stores: an in-memory store and a TOML file-backed store.
//!
//! Both keep their rows in [`Tables`] behind a [`Journal`] of open
//! transactions. The file store writes the tables back to disk after every
//! change made outside a transaction, and once when the outermost
//! transaction commits.

mod file;
mod memory;
mod record;

use std::collections::{BTreeMap, BTreeSet};

use crate::domain::ObjectId;
use crate::infrastructure::{InfraError, InfraResult};

pub use file::TomlFileStore;
pub use memory::InMemoryStore;
pub use record::{ClusterRecord, EventRecord, Record, SubcloneRecord, Table};

/// Rows of all three tables plus the set of created tables.
#[derive(Debug, Default, Clone, PartialEq)]
struct Tables {
    schema: BTreeSet<Table>,
    events: BTreeMap<ObjectId, EventRecord>,
    clusters: BTreeMap<ObjectId, ClusterRecord>,
    subclones: BTreeMap<ObjectId, SubcloneRecord>,
}

impl Tables {
    fn ensure(&self, table: Table) -> InfraResult<()> {
        if self.schema.contains(&table) {
            Ok(())
        } else {
            Err(InfraError::SchemaMissing(table))
        }
    }

    fn create_schema(&mut self, table: Table) {
        self.schema.insert(table);
    }

    fn save(&mut self, id: ObjectId, record: Record) -> InfraResult<ObjectId> {
        let table = record.table();
        self.ensure(table)?;
        if id < 0 {
            return Err(InfraError::store(format!("invalid id {} for table {}", id, table)));
        }

        let id = if id == 0 { self.next_id(table) } else { id };
        match record {
            Record::Event(row) => {
                self.events.insert(id, row);
            }
            Record::Cluster(row) => {
                self.clusters.insert(id, row);
            }
            Record::Subclone(row) => {
                self.subclones.insert(id, row);
            }
        }
        Ok(id)
    }

    fn next_id(&self, table: Table) -> ObjectId {
        let last = match table {
            Table::Events => self.events.keys().next_back(),
            Table::Clusters => self.clusters.keys().next_back(),
            Table::Subclones => self.subclones.keys().next_back(),
        };
        last.map_or(1, |id| id + 1)
    }

    fn load(&self, table: Table, id: ObjectId) -> InfraResult<Option<Record>> {
        self.ensure(table)?;
        let record = match table {
            Table::Events => self.events.get(&id).cloned().map(Record::Event),
            Table::Clusters => self.clusters.get(&id).cloned().map(Record::Cluster),
            Table::Subclones => self.subclones.get(&id).cloned().map(Record::Subclone),
        };
        Ok(record)
    }

    fn remove(&mut self, table: Table, id: ObjectId) -> InfraResult<bool> {
        self.ensure(table)?;
        let removed = match table {
            Table::Events => self.events.remove(&id).is_some(),
            Table::Clusters => self.clusters.remove(&id).is_some(),
            Table::Subclones => self.subclones.remove(&id).is_some(),
        };
        Ok(removed)
    }

    fn ids(&self, table: Table) -> InfraResult<Vec<ObjectId>> {
        self.ensure(table)?;
        let ids = match table {
            Table::Events => self.events.keys().copied().collect(),
            Table::Clusters => self.clusters.keys().copied().collect(),
            Table::Subclones => self.subclones.keys().copied().collect(),
        };
        Ok(ids)
    }

    fn children_of(&self, table: Table, parent: ObjectId) -> InfraResult<Vec<ObjectId>> {
        self.ensure(table)?;
        let ids = match table {
            Table::Subclones => self
                .subclones
                .iter()
                .filter(|(_, row)| row.parent_id == Some(parent))
                .map(|(id, _)| *id)
                .collect(),
            Table::Clusters => self
                .clusters
                .iter()
                .filter(|(_, row)| row.subclone_id == parent)
                .map(|(id, _)| *id)
                .collect(),
            Table::Events => {
                self.ensure(Table::Clusters)?;
                let mut ids = self
                    .clusters
                    .get(&parent)
                    .map(|row| row.event_ids.clone())
                    .unwrap_or_default();
                ids.sort_unstable();
                ids.dedup();
                ids
            }
        };
        Ok(ids)
    }
}

/// Current tables plus a snapshot per open transaction, innermost last.
#[derive(Debug, Default)]
struct Journal {
    tables: Tables,
    open: Vec<Tables>,
}

impl Journal {
    fn new(tables: Tables) -> Self {
        Self {
            tables,
            open: Vec::new(),
        }
    }

    fn in_transaction(&self) -> bool {
        !self.open.is_empty()
    }

    fn begin(&mut self) {
        self.open.push(self.tables.clone());
    }

    /// Close the innermost transaction, keeping its changes. Returns the
    /// state before the outermost transaction once that one closes.
    fn commit(&mut self) -> InfraResult<Option<Tables>> {
        let snapshot = self
            .open
            .pop()
            .ok_or_else(|| InfraError::store("commit without an open transaction"))?;
        Ok(if self.open.is_empty() { Some(snapshot) } else { None })
    }

    /// Close the innermost transaction, discarding its changes.
    fn rollback(&mut self) -> InfraResult<()> {
        self.tables = self
            .open
            .pop()
            .ok_or_else(|| InfraError::store("rollback without an open transaction"))?;
        Ok(())
    }
}
