//! Application services
//!
//! Concrete service implementations that orchestrate domain logic.
//! Services depend on the I/O boundary traits (ObjectStore)
//! but are themselves concrete structs, not traits.

mod archive;
mod comparison;

pub use archive::ArchiveService;
pub use comparison::ComparisonService;
