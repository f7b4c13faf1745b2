//! Domain-level errors (no external dependencies)

use thiserror::Error;

use crate::domain::ObjectId;

/// Domain errors represent violations of the subclone tree invariants.
/// These are independent of infrastructure concerns.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DomainError {
    #[error("cycle detected in subclone hierarchy at subclone {0}")]
    CycleDetected(ObjectId),

    #[error("tree already has a root; cannot add second root subclone {0}")]
    MultipleRoots(ObjectId),

    #[error("no root subclone found among {0} subclones")]
    MissingRoot(usize),

    #[error("subclone {0} registered twice")]
    DuplicateSubclone(ObjectId),

    #[error("subclone node not found in tree")]
    NodeNotFound,

    #[error("parent subclone {parent} of subclone {child} not found")]
    ParentNotFound { child: ObjectId, parent: ObjectId },

    #[error("invalid fraction {fraction} for subclone {id}: must lie in [0, 1]")]
    InvalidFraction { id: ObjectId, fraction: f64 },
}

/// Result type for tree operations.
pub type TreeResult<T> = Result<T, DomainError>;
