//! Infrastructure layer: storage implementations and DI container
//!
//! This layer implements the I/O boundary traits and wires up services.

pub mod di;
pub mod error;
pub mod store;
pub mod traits;

pub use error::{InfraError, InfraResult};
pub use store::{InMemoryStore, TomlFileStore};
pub use traits::{FileSystem, ObjectStore, RealFileSystem};
