use thiserror::Error;

// Precondition failures are returned synchronously and never partially
// mutate state; Internal wraps persistence / event stream errors.
#[derive(Debug, Error)]
pub enum OrchestratorError {
    #[error("validation failed: {0}")]
    Validation(String),

    #[error("operation not valid for current status: {0}")]
    InvalidState(String),

    #[error("dependency not in required state: {0}")]
    PrecursorNotReady(String),

    #[error("model version not released: {0}")]
    NotReleased(String),

    #[error("deployment already in flight: {0}")]
    AlreadyDeploying(String),

    #[error("retry limit exceeded: {0}")]
    RetryLimitExceeded(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("transient infrastructure failure: {0}")]
    TransientInfra(String),

    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl OrchestratorError {
    pub fn code(&self) -> &'static str {
        match self {
            OrchestratorError::Validation(_) => "validation_error",
            OrchestratorError::InvalidState(_) => "invalid_state",
            OrchestratorError::PrecursorNotReady(_) => "precursor_not_ready",
            OrchestratorError::NotReleased(_) => "not_released",
            OrchestratorError::AlreadyDeploying(_) => "already_deploying",
            OrchestratorError::RetryLimitExceeded(_) => "retry_limit_exceeded",
            OrchestratorError::NotFound(_) => "not_found",
            OrchestratorError::TransientInfra(_) => "transient_infra",
            OrchestratorError::Internal(_) => "internal",
        }
    }
}
