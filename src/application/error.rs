//! Application-level errors (wraps domain and infrastructure errors)

use thiserror::Error;

use crate::domain::{DomainError, ObjectId};
use crate::infrastructure::InfraError;

/// Application errors wrap lower-layer errors and add use-case context.
#[derive(Error, Debug)]
pub enum ApplicationError {
    #[error("{0}")]
    Domain(#[from] DomainError),

    #[error("{0}")]
    Infra(#[from] InfraError),

    #[error("{kind} {id} not found")]
    NotFound { kind: &'static str, id: ObjectId },

    #[error("config error: {message}")]
    Config { message: String },

    #[error("save failed: {context}")]
    SaveFailed {
        context: String,
        #[source]
        source: InfraError,
    },
}

/// Result type for application layer operations.
pub type ApplicationResult<T> = Result<T, ApplicationError>;
