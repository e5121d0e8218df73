//! Top-level error type reported at the command boundary.

use crate::config::ConfigError;
use crate::llm::LlmError;
use crate::normalize::ValidationError;
use crate::output::PersistenceError;
use crate::resolver::ResolveError;
use crate::sources::SourceError;

/// Everything a command can fail with.
///
/// Only [`AgentError::Configuration`] is fatal; the interactive loop reports
/// every other variant and reads the next command.
#[derive(Debug, thiserror::Error)]
pub enum AgentError {
    #[error("Configuration error: {0}")]
    Configuration(#[from] ConfigError),

    /// The language model failed or answered with something unusable
    #[error("Model error: {0}")]
    RemoteService(ResolveError),

    /// An external API failed; the fetch was aborted
    #[error("{service} error: {source}")]
    Upstream {
        service: &'static str,
        #[source]
        source: SourceError,
    },

    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("Could not save results: {0}")]
    Persistence(#[from] PersistenceError),

    #[error("Command cancelled")]
    Cancelled,
}

impl AgentError {
    /// Wrap a service failure, keeping cancellation distinct
    pub fn upstream(service: &'static str, source: SourceError) -> Self {
        match source {
            SourceError::Cancelled => AgentError::Cancelled,
            source => AgentError::Upstream { service, source },
        }
    }

    /// Whether the process should stop
    pub fn is_fatal(&self) -> bool {
        matches!(self, AgentError::Configuration(_))
    }

    /// HTTP status of an upstream failure
    pub fn status(&self) -> Option<u16> {
        match self {
            AgentError::Upstream { source, .. } => source.status(),
            _ => None,
        }
    }
}

impl From<ResolveError> for AgentError {
    fn from(err: ResolveError) -> Self {
        match err {
            ResolveError::Cancelled => AgentError::Cancelled,
            err => AgentError::RemoteService(err),
        }
    }
}

impl From<LlmError> for AgentError {
    fn from(err: LlmError) -> Self {
        AgentError::RemoteService(ResolveError::Model(err))
    }
}

pub type Result<T> = std::result::Result<T, AgentError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cancellation_is_not_upstream() {
        assert!(matches!(
            AgentError::upstream("NCBI", SourceError::Cancelled),
            AgentError::Cancelled
        ));
    }

    #[test]
    fn test_upstream_keeps_status() {
        let err = AgentError::upstream(
            "Web of Science",
            SourceError::Status {
                status: 401,
                message: "Unauthorized".into(),
            },
        );
        assert_eq!(err.status(), Some(401));
        assert_eq!(err.to_string(), "Web of Science error: HTTP 401: Unauthorized");
        assert!(!err.is_fatal());
    }

    #[test]
    fn test_cancelled_resolution_is_cancellation() {
        let err: AgentError = ResolveError::Cancelled.into();
        assert!(matches!(err, AgentError::Cancelled));
        let err: AgentError = ResolveError::UnknownTool("x".into()).into();
        assert!(matches!(err, AgentError::RemoteService(_)));
    }

    #[test]
    fn test_only_configuration_is_fatal() {
        let err: AgentError = ConfigError::Missing(vec!["NCBI_EMAIL"]).into();
        assert!(err.is_fatal());
        let err: AgentError = LlmError::Request("timeout".into()).into();
        assert!(!err.is_fatal());
    }
}
