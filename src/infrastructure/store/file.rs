use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};

use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use super::{ClusterRecord, EventRecord, Journal, Record, SubcloneRecord, Table, Tables};
use crate::domain::ObjectId;
use crate::infrastructure::traits::{FileSystem, ObjectStore};
use crate::infrastructure::{InfraError, InfraResult};

#[derive(Debug, Serialize, Deserialize)]
struct Row<T> {
    id: ObjectId,
    data: T,
}

/// On-disk layout: one array of tables per object table.
#[derive(Debug, Default, Serialize, Deserialize)]
struct StoreFile {
    #[serde(default)]
    schema: Vec<Table>,
    #[serde(default)]
    events: Vec<Row<EventRecord>>,
    #[serde(default)]
    clusters: Vec<Row<ClusterRecord>>,
    #[serde(default)]
    subclones: Vec<Row<SubcloneRecord>>,
}

fn rows<T: Clone>(table: &std::collections::BTreeMap<ObjectId, T>) -> Vec<Row<T>> {
    table
        .iter()
        .map(|(id, data)| Row {
            id: *id,
            data: data.clone(),
        })
        .collect()
}

impl From<&Tables> for StoreFile {
    fn from(tables: &Tables) -> Self {
        Self {
            schema: tables.schema.iter().copied().collect(),
            events: rows(&tables.events),
            clusters: rows(&tables.clusters),
            subclones: rows(&tables.subclones),
        }
    }
}

impl From<StoreFile> for Tables {
    fn from(file: StoreFile) -> Self {
        Self {
            schema: file.schema.into_iter().collect(),
            events: file.events.into_iter().map(|row| (row.id, row.data)).collect(),
            clusters: file.clusters.into_iter().map(|row| (row.id, row.data)).collect(),
            subclones: file.subclones.into_iter().map(|row| (row.id, row.data)).collect(),
        }
    }
}

/// Store persisted as a single TOML document.
///
/// The whole document is held in memory and rewritten after every change
/// made outside a transaction, via a temporary file renamed over the store
/// file. Inside a transaction nothing is written until the outermost commit.
pub struct TomlFileStore {
    path: PathBuf,
    fs: Arc<dyn FileSystem>,
    journal: Mutex<Journal>,
}

impl TomlFileStore {
    /// Open the store at `path`; a missing file is an empty store.
    #[instrument(level = "debug", skip(fs))]
    pub fn open(path: &Path, fs: Arc<dyn FileSystem>) -> InfraResult<Self> {
        let tables = if fs.exists(path) {
            let content = fs
                .read_to_string(path)
                .map_err(|e| InfraError::io(format!("read {}", path.display()), e))?;
            let file: StoreFile = toml::from_str(&content)
                .map_err(|e| InfraError::serialization(format!("parse {}", path.display()), e))?;
            Tables::from(file)
        } else {
            debug!("no store at {}, starting empty", path.display());
            Tables::default()
        };

        Ok(Self {
            path: path.to_path_buf(),
            fs,
            journal: Mutex::new(Journal::new(tables)),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn lock(&self) -> InfraResult<MutexGuard<'_, Journal>> {
        self.journal
            .lock()
            .map_err(|e| InfraError::store(format!("store lock poisoned: {}", e)))
    }

    /// Write the tables unless a transaction is still open.
    fn persist(&self, journal: &Journal) -> InfraResult<()> {
        if journal.in_transaction() {
            return Ok(());
        }
        self.flush(&journal.tables)
    }

    fn flush(&self, tables: &Tables) -> InfraResult<()> {
        let content = toml::to_string(&StoreFile::from(tables))
            .map_err(|e| InfraError::serialization(format!("write {}", self.path.display()), e))?;

        let tmp = self.path.with_extension("toml.tmp");
        self.fs
            .ensure_parent(&self.path)
            .map_err(|e| InfraError::io(format!("create parent of {}", self.path.display()), e))?;
        self.fs
            .write(&tmp, &content)
            .map_err(|e| InfraError::io(format!("write {}", tmp.display()), e))?;
        self.fs
            .rename(&tmp, &self.path)
            .map_err(|e| InfraError::io(format!("replace {}", self.path.display()), e))
    }
}

impl ObjectStore for TomlFileStore {
    fn create_schema(&self, table: Table) -> InfraResult<()> {
        let mut journal = self.lock()?;
        if journal.tables.schema.contains(&table) {
            return Ok(());
        }
        journal.tables.create_schema(table);
        self.persist(&journal)
    }

    #[instrument(level = "trace", skip(self, record))]
    fn save(&self, id: ObjectId, record: Record) -> InfraResult<ObjectId> {
        let mut journal = self.lock()?;
        let id = journal.tables.save(id, record)?;
        self.persist(&journal)?;
        Ok(id)
    }

    #[instrument(level = "trace", skip(self))]
    fn load(&self, table: Table, id: ObjectId) -> InfraResult<Option<Record>> {
        self.lock()?.tables.load(table, id)
    }

    fn remove(&self, table: Table, id: ObjectId) -> InfraResult<bool> {
        let mut journal = self.lock()?;
        let removed = journal.tables.remove(table, id)?;
        if removed {
            self.persist(&journal)?;
        }
        Ok(removed)
    }

    fn ids(&self, table: Table) -> InfraResult<Vec<ObjectId>> {
        self.lock()?.tables.ids(table)
    }

    fn begin(&self) -> InfraResult<()> {
        self.lock()?.begin();
        Ok(())
    }

    #[instrument(level = "debug", skip(self))]
    fn commit(&self) -> InfraResult<()> {
        let mut journal = self.lock()?;
        if let Some(before) = journal.commit()? {
            // A failed write leaves memory matching the file
            if let Err(e) = self.flush(&journal.tables) {
                journal.tables = before;
                return Err(e);
            }
        }
        Ok(())
    }

    fn rollback(&self) -> InfraResult<()> {
        self.lock()?.rollback()
    }

    #[instrument(level = "trace", skip(self))]
    fn children_of(&self, table: Table, parent: ObjectId) -> InfraResult<Vec<ObjectId>> {
        self.lock()?.tables.children_of(table, parent)
    }
}
