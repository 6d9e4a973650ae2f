//! Error types for the lifecycle orchestrator.
//!
//! Hook, bind and close failures keep the collaborator's error as their
//! `source` and display its message unchanged, so callers see exactly what
//! the hook or host reported.

use thiserror::Error;

use crate::host::MountError;
use crate::lifecycle::Phase;

/// Boxed error returned by hooks, probes and the host server.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Errors surfaced by [`LifecycleServer`](crate::LifecycleServer) operations.
#[derive(Debug, Error)]
pub enum ServerError {
    /// Neither the instance nor the `listen` call supplied a port.
    #[error("Missing port number")]
    MissingPort,

    /// `listen` was called while a handle is still held.
    #[error("Server is already running")]
    AlreadyRunning,

    /// A beforeConfig, beforeInit or afterListen hook failed.
    #[error("{source}")]
    Hook { phase: Phase, source: BoxError },

    /// The host server refused a middleware handler.
    #[error(transparent)]
    Mount(#[from] MountError),

    /// At least one server test failed and `reject_on_error` was set.
    #[error("Some server tests failed, see log for details")]
    TestsFailed,

    /// The test runner itself broke (a probe task panicked or was cancelled).
    #[error("Test runner fault: {0}")]
    TestRunner(String),

    /// The host server could not bind the port.
    #[error("{source}")]
    Bind { port: u16, source: BoxError },

    /// The host server failed to close the listening handle.
    #[error("{source}")]
    Close { source: BoxError },

    /// `close` was called without a listening handle.
    #[error("Server is not running.")]
    NotRunning,
}

impl ServerError {
    /// Phase whose hook produced this error, if it is a hook failure.
    pub fn phase(&self) -> Option<Phase> {
        match self {
            ServerError::Hook { phase, .. } => Some(*phase),
            _ => None,
        }
    }

    /// Hand back the hook's original error, or `self` for any other variant.
    pub fn into_hook_error(self) -> Result<BoxError, ServerError> {
        match self {
            ServerError::Hook { source, .. } => Ok(source),
            other => Err(other),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as _;

    #[test]
    fn test_fixed_messages() {
        assert_eq!(ServerError::MissingPort.to_string(), "Missing port number");
        assert_eq!(ServerError::NotRunning.to_string(), "Server is not running.");
        assert_eq!(
            ServerError::TestsFailed.to_string(),
            "Some server tests failed, see log for details"
        );
    }

    #[test]
    fn test_hook_error_is_passed_through() {
        let err = ServerError::Hook {
            phase: Phase::BeforeInit,
            source: "error before init".into(),
        };
        assert_eq!(err.to_string(), "error before init");
        assert_eq!(err.phase(), Some(Phase::BeforeInit));
        assert!(err.source().is_some());

        let original = err.into_hook_error().expect("hook variant");
        assert_eq!(original.to_string(), "error before init");
    }

    #[test]
    fn test_into_hook_error_keeps_other_variants() {
        let err = ServerError::NotRunning.into_hook_error().unwrap_err();
        assert!(matches!(err, ServerError::NotRunning));
    }
}
