//! Service container for dependency injection
//!
//! Wires up all services with their dependencies.

use std::sync::Arc;

use crate::application::services::{ArchiveService, ComparisonService};
use crate::application::ApplicationResult;
use crate::config::Settings;
use crate::infrastructure::traits::{FileSystem, ObjectStore, RealFileSystem};
use crate::infrastructure::TomlFileStore;

/// Container holding all application services.
pub struct ServiceContainer {
    /// Application settings
    pub settings: Arc<Settings>,

    /// Filesystem abstraction
    pub fs: Arc<dyn FileSystem>,

    /// Object store backing the archive
    pub store: Arc<dyn ObjectStore>,

    pub archive: Arc<ArchiveService>,
    pub comparison: ComparisonService,
}

impl ServiceContainer {
    /// Create a service container backed by the TOML store at `settings.store_path`.
    pub fn new(settings: Settings) -> ApplicationResult<Self> {
        let fs: Arc<dyn FileSystem> = Arc::new(RealFileSystem);
        let store = TomlFileStore::open(&settings.store_path, Arc::clone(&fs))?;
        Self::with_deps(settings, fs, Arc::new(store))
    }

    /// Create a service container with custom dependencies (for testing).
    ///
    /// Creates the store schema if it is missing.
    pub fn with_deps(
        settings: Settings,
        fs: Arc<dyn FileSystem>,
        store: Arc<dyn ObjectStore>,
    ) -> ApplicationResult<Self> {
        let settings = Arc::new(settings);

        let archive = Arc::new(ArchiveService::new(Arc::clone(&store)));
        archive.create_schema()?;
        let comparison =
            ComparisonService::new(Arc::clone(&archive), settings.merge.boundary_resolution);

        Ok(Self {
            settings,
            fs,
            store,
            archive,
            comparison,
        })
    }
}
