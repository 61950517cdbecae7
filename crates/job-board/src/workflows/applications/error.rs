use super::access::AccessError;
use super::domain::{ApplicationId, JobId};
use super::repository::RepositoryError;

/// Failure of a single review-desk operation.
///
/// Validation variants are returned synchronously to the caller; nothing is
/// retried.
#[derive(Debug, thiserror::Error)]
pub enum WorkflowError {
    #[error("application {0} not found")]
    NotFound(ApplicationId),
    #[error("'{0}' is not a recognized application status")]
    InvalidStatus(String),
    #[error("note text cannot be empty")]
    EmptyNote,
    #[error("not allowed: {0}")]
    Unauthorized(#[from] AccessError),
    #[error("invalid application: {0}")]
    InvalidSubmission(String),
    #[error("job {0} does not exist")]
    UnknownJob(JobId),
    #[error("export failed: {0}")]
    Export(String),
    #[error(transparent)]
    Repository(RepositoryError),
}

impl WorkflowError {
    /// Map a repository failure, turning `NotFound` into the id-carrying variant.
    pub(crate) fn from_repository(id: ApplicationId, error: RepositoryError) -> Self {
        match error {
            RepositoryError::NotFound => WorkflowError::NotFound(id),
            other => WorkflowError::Repository(other),
        }
    }
}

impl From<RepositoryError> for WorkflowError {
    fn from(value: RepositoryError) -> Self {
        Self::Repository(value)
    }
}
