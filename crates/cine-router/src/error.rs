//! Router error types.

use thiserror::Error;

pub type RouterResult<T> = Result<T, RouterError>;

/// Errors from provider routing.
#[derive(Debug, Error)]
pub enum RouterError {
    /// Neither the requested provider nor a fallback is usable.
    #[error("No AI provider available")]
    ProviderUnavailable,

    /// A cloud provider call failed; eligible for local fallback.
    #[error("Cloud provider call failed: {0}")]
    CloudCallFailed(String),

    /// The provider never left its processing state before the deadline.
    #[error("Cloud provider processing deadline exceeded after {0} seconds")]
    PollDeadlineExceeded(u64),

    /// A local model call failed.
    #[error("Local model call failed: {0}")]
    LocalCallFailed(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl RouterError {
    pub fn cloud_call_failed(msg: impl Into<String>) -> Self {
        Self::CloudCallFailed(msg.into())
    }

    pub fn local_call_failed(msg: impl Into<String>) -> Self {
        Self::LocalCallFailed(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    /// Whether this failure should trigger the fallback cascade.
    ///
    /// Deadline overrun is treated exactly like any other cloud call
    /// failure so fallback semantics stay uniform.
    pub fn is_cloud_call_failure(&self) -> bool {
        matches!(
            self,
            Self::CloudCallFailed(_) | Self::PollDeadlineExceeded(_)
        )
    }
}
