use std::time::Duration;

use esscale_policy::PolicyError;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, DomainError>;

#[derive(Error, Debug)]
pub enum DomainError {
    #[error("domain not found: {0}")]
    DomainNotFound(String),

    #[error("collaborator unavailable: {0}")]
    CollaboratorUnavailable(String),

    #[error("no {metric} datapoints in the last {}s", .window.as_secs())]
    NoDatapoints { metric: String, window: Duration },

    #[error("invalid endpoint: {0}")]
    InvalidEndpoint(String),

    #[error("invalid domain id: {0}")]
    InvalidDomainId(String),

    #[error("configuration update failed: {0}")]
    UpdateFailed(String),

    #[error(transparent)]
    Policy(#[from] PolicyError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl DomainError {
    pub fn domain_not_found(name: impl Into<String>) -> Self {
        Self::DomainNotFound(name.into())
    }

    pub fn unavailable(msg: impl Into<String>) -> Self {
        Self::CollaboratorUnavailable(msg.into())
    }

    pub fn update_failed(msg: impl Into<String>) -> Self {
        Self::UpdateFailed(msg.into())
    }

    /// Whether retrying the same call could succeed.
    ///
    /// Policy and lookup failures are deterministic; only transport-level
    /// trouble is worth another attempt.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            Self::CollaboratorUnavailable(_) | Self::NoDatapoints { .. } | Self::Io(_)
        )
    }
}
