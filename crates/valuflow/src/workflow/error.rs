//! Workflow error types.

use thiserror::Error;

use super::{JobStatus, Role};
use crate::db::DatabaseError;

/// Errors from job store and workflow operations.
#[derive(Error, Debug)]
pub enum WorkflowError {
    /// The referenced job or notification does not exist.
    #[error("Not found: {0}")]
    NotFound(String),

    /// A required field is missing or invalid.
    #[error("Validation failed: {0}")]
    ValidationFailed(String),

    /// The actor's role is not authorized to act on the job's current state.
    #[error("Role '{role}' is not authorized to act on a job in state '{status}'")]
    Forbidden { role: Role, status: JobStatus },

    /// The requested status is not a legal successor of the current status.
    #[error("Illegal transition from '{from}' to '{to}'")]
    IllegalTransition { from: JobStatus, to: JobStatus },

    /// Optimistic-concurrency check failed.
    #[error("Conflict: expected version {expected}, job is at version {actual}")]
    Conflict { expected: i64, actual: i64 },

    /// Underlying storage error.
    #[error("Database error: {0}")]
    Database(#[from] DatabaseError),
}
