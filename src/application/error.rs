use crate::infrastructure::error::InfraError;
use thiserror::Error;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StudyError {
    #[error("not authenticated")]
    NotAuthenticated,
    #[error("study data is not loaded yet")]
    NotReady,
    #[error("subject not found: {0}")]
    SubjectNotFound(String),
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error("remote write failed: {0}")]
    RemoteWriteFailed(String),
    #[error("remote read failed: {0}")]
    RemoteReadFailed(String),
    #[error("internal error: {0}")]
    Internal(String),
}

impl StudyError {
    pub fn remote_write(error: &InfraError) -> Self {
        match error {
            InfraError::Lock(message) => Self::Internal(message.clone()),
            other => Self::RemoteWriteFailed(other.to_string()),
        }
    }

    pub fn remote_read(error: &InfraError) -> Self {
        match error {
            InfraError::Lock(message) => Self::Internal(message.clone()),
            other => Self::RemoteReadFailed(other.to_string()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    NotAuthenticated,
    NotReady,
}

impl SkipReason {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::NotAuthenticated => "not_authenticated",
            Self::NotReady => "not_ready",
        }
    }
}

impl From<SkipReason> for StudyError {
    fn from(reason: SkipReason) -> Self {
        match reason {
            SkipReason::NotAuthenticated => Self::NotAuthenticated,
            SkipReason::NotReady => Self::NotReady,
        }
    }
}

/// Result of a mutation that is allowed to be a silent no-op.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MutationOutcome {
    Applied,
    Unchanged,
    Skipped(SkipReason),
}

impl MutationOutcome {
    pub fn is_applied(self) -> bool {
        matches!(self, Self::Applied)
    }
}
