//! Tests for the object stores

use std::error::Error;
use std::fs;
use std::io;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use rstest::rstest;
use tempfile::TempDir;

use clonemerge::domain::EventKind;
use clonemerge::infrastructure::store::{ClusterRecord, EventRecord, Record, SubcloneRecord, Table};
use clonemerge::infrastructure::{
    FileSystem, InMemoryStore, InfraError, ObjectStore, RealFileSystem, TomlFileStore,
};

#[derive(Debug, Clone, Copy)]
enum Backend {
    Memory,
    File,
}

fn open(backend: Backend, dir: &TempDir) -> Arc<dyn ObjectStore> {
    match backend {
        Backend::Memory => Arc::new(InMemoryStore::new()),
        Backend::File => Arc::new(
            TomlFileStore::open(&dir.path().join("store.toml"), Arc::new(RealFileSystem)).unwrap(),
        ),
    }
}

fn subclone(parent_id: Option<i64>) -> Record {
    Record::Subclone(SubcloneRecord {
        fraction: 0.25,
        parent_id,
    })
}

fn event(chrom: i32) -> Record {
    Record::Event(EventRecord {
        kind: EventKind::CopyNumberVariant,
        chrom,
        position: 1_000,
        length: 500,
        frequency: 0.4,
    })
}

#[rstest]
fn given_missing_schema_when_saving_then_errors(#[values(Backend::Memory, Backend::File)] backend: Backend) {
    // Arrange
    let dir = TempDir::new().unwrap();
    let store = open(backend, &dir);

    // Act
    let result = store.save(0, subclone(None));

    // Assert
    assert!(matches!(result, Err(InfraError::SchemaMissing(Table::Subclones))));
}

#[rstest]
fn given_schema_when_saving_with_zero_id_then_assigns_fresh_ids(
    #[values(Backend::Memory, Backend::File)] backend: Backend,
) {
    // Arrange
    let dir = TempDir::new().unwrap();
    let store = open(backend, &dir);
    store.create_schema(Table::Subclones).unwrap();
    store.create_schema(Table::Subclones).unwrap();

    // Act
    let root = store.save(0, subclone(None)).unwrap();
    let child = store.save(0, subclone(Some(root))).unwrap();

    // Assert
    assert_eq!((root, child), (1, 2));
    assert_eq!(store.load(Table::Subclones, child).unwrap(), Some(subclone(Some(1))));
    assert_eq!(store.load(Table::Subclones, 42).unwrap(), None);
}

#[rstest]
fn given_existing_id_when_saving_then_overwrites(#[values(Backend::Memory, Backend::File)] backend: Backend) {
    // Arrange
    let dir = TempDir::new().unwrap();
    let store = open(backend, &dir);
    store.create_schema(Table::Events).unwrap();
    let id = store.save(0, event(1)).unwrap();

    // Act
    let same = store.save(id, event(2)).unwrap();

    // Assert
    assert_eq!(same, id);
    assert_eq!(store.load(Table::Events, id).unwrap(), Some(event(2)));
}

#[rstest]
fn given_related_rows_when_listing_children_then_follows_each_table(
    #[values(Backend::Memory, Backend::File)] backend: Backend,
) {
    // Arrange
    let dir = TempDir::new().unwrap();
    let store = open(backend, &dir);
    for table in Table::ALL {
        store.create_schema(table).unwrap();
    }
    let root = store.save(0, subclone(None)).unwrap();
    let left = store.save(0, subclone(Some(root))).unwrap();
    let right = store.save(0, subclone(Some(root))).unwrap();
    let e1 = store.save(0, event(1)).unwrap();
    let e2 = store.save(0, event(2)).unwrap();
    let cluster = store
        .save(
            0,
            Record::Cluster(ClusterRecord {
                cell_fraction: 0.4,
                subclone_id: left,
                event_ids: vec![e2, e1],
            }),
        )
        .unwrap();

    // Act / Assert
    assert_eq!(store.children_of(Table::Subclones, root).unwrap(), vec![left, right]);
    assert!(store.children_of(Table::Subclones, left).unwrap().is_empty());
    assert_eq!(store.children_of(Table::Clusters, left).unwrap(), vec![cluster]);
    assert_eq!(store.children_of(Table::Events, cluster).unwrap(), vec![e1, e2]);
}

#[rstest]
fn given_row_when_removing_then_gone(#[values(Backend::Memory, Backend::File)] backend: Backend) {
    let dir = TempDir::new().unwrap();
    let store = open(backend, &dir);
    store.create_schema(Table::Events).unwrap();
    let id = store.save(0, event(1)).unwrap();

    assert!(store.remove(Table::Events, id).unwrap());
    assert!(!store.remove(Table::Events, id).unwrap());
    assert_eq!(store.load(Table::Events, id).unwrap(), None);
}

#[test]
fn given_file_store_when_reopening_then_rows_survive() {
    // Arrange
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("nested").join("store.toml");
    {
        let store = TomlFileStore::open(&path, Arc::new(RealFileSystem)).unwrap();
        store.create_schema(Table::Subclones).unwrap();
        store.save(0, subclone(None)).unwrap();
        store.save(0, subclone(Some(1))).unwrap();
    }

    // Act
    let reopened = TomlFileStore::open(&path, Arc::new(RealFileSystem)).unwrap();

    // Assert
    assert!(path.exists());
    assert_eq!(reopened.load(Table::Subclones, 1).unwrap(), Some(subclone(None)));
    assert_eq!(reopened.children_of(Table::Subclones, 1).unwrap(), vec![2]);
    assert_eq!(reopened.save(0, subclone(Some(1))).unwrap(), 3);
}

#[test]
fn given_corrupt_store_file_when_opening_then_serialization_error() {
    // Arrange
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("store.toml");
    fs::write(&path, "schema = [\"subclones\"\n").unwrap();

    // Act
    let result = TomlFileStore::open(&path, Arc::new(RealFileSystem));

    // Assert
    let Err(error) = result else {
        panic!("corrupt store file was accepted");
    };
    assert!(matches!(error, InfraError::Serialization { .. }));
    assert!(error.source().is_some());
}

#[rstest]
fn given_open_transaction_when_rolling_back_then_changes_are_discarded(
    #[values(Backend::Memory, Backend::File)] backend: Backend,
) {
    // Arrange
    let dir = TempDir::new().unwrap();
    let store = open(backend, &dir);
    store.create_schema(Table::Subclones).unwrap();
    let kept = store.save(0, subclone(None)).unwrap();

    // Act
    store.begin().unwrap();
    store.save(0, subclone(Some(kept))).unwrap();
    store.save(kept, subclone(Some(99))).unwrap();
    store.rollback().unwrap();

    // Assert
    assert_eq!(store.ids(Table::Subclones).unwrap(), vec![kept]);
    assert_eq!(store.load(Table::Subclones, kept).unwrap(), Some(subclone(None)));
}

#[rstest]
fn given_nested_transactions_when_committing_then_changes_are_kept(
    #[values(Backend::Memory, Backend::File)] backend: Backend,
) {
    // Arrange
    let dir = TempDir::new().unwrap();
    let store = open(backend, &dir);
    store.create_schema(Table::Events).unwrap();

    // Act
    store.begin().unwrap();
    store.save(0, event(1)).unwrap();
    store.begin().unwrap();
    store.save(0, event(2)).unwrap();
    store.commit().unwrap();
    store.commit().unwrap();

    // Assert
    assert_eq!(store.ids(Table::Events).unwrap(), vec![1, 2]);
    assert!(matches!(store.commit(), Err(InfraError::Store { .. })));
}

/// Real file system that counts writes.
#[derive(Default)]
struct CountingFileSystem {
    writes: AtomicUsize,
}

impl FileSystem for CountingFileSystem {
    fn read_to_string(&self, path: &Path) -> io::Result<String> {
        RealFileSystem.read_to_string(path)
    }

    fn write(&self, path: &Path, content: &str) -> io::Result<()> {
        self.writes.fetch_add(1, Ordering::SeqCst);
        RealFileSystem.write(path, content)
    }

    fn exists(&self, path: &Path) -> bool {
        RealFileSystem.exists(path)
    }

    fn rename(&self, from: &Path, to: &Path) -> io::Result<()> {
        RealFileSystem.rename(from, to)
    }

    fn create_dir_all(&self, path: &Path) -> io::Result<()> {
        RealFileSystem.create_dir_all(path)
    }

    fn ensure_parent(&self, path: &Path) -> io::Result<()> {
        RealFileSystem.ensure_parent(path)
    }
}

#[test]
fn given_file_store_transaction_when_saving_many_rows_then_writes_once_on_commit() {
    // Arrange
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("store.toml");
    let counter = Arc::new(CountingFileSystem::default());
    let store = TomlFileStore::open(&path, counter.clone()).unwrap();
    store.create_schema(Table::Subclones).unwrap();
    let before = counter.writes.load(Ordering::SeqCst);

    // Act
    store.begin().unwrap();
    let root = store.save(0, subclone(None)).unwrap();
    for _ in 0..10 {
        store.save(0, subclone(Some(root))).unwrap();
    }
    let during = counter.writes.load(Ordering::SeqCst);
    store.commit().unwrap();

    // Assert
    assert_eq!(during, before);
    assert_eq!(counter.writes.load(Ordering::SeqCst), before + 1);
    let reopened = TomlFileStore::open(&path, Arc::new(RealFileSystem)).unwrap();
    assert_eq!(reopened.children_of(Table::Subclones, root).unwrap().len(), 10);
}
