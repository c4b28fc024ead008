use std::time::Duration;

use thiserror::Error;

use crate::{ParseError, UserError};

/// Rejected client configuration.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("no SDK key configured and {env_var} is not set")]
    MissingSdkKey { env_var: &'static str },

    #[error("host must not be empty")]
    EmptyHost,

    #[error("no transport configured and the `http` feature is disabled")]
    NoTransport,

    #[error("{name} of {actual:?} is below the minimum of {minimum:?}")]
    TimeoutTooShort {
        name: &'static str,
        actual: Duration,
        minimum: Duration,
    },
}

/// Outcome of waiting on the readiness gate when it did not open.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ReadyError {
    #[error("client was not ready within {0:?}")]
    Timeout(Duration),

    #[error("wait for readiness was interrupted by close")]
    Interrupted,
}

/// A fetch that failed before a status code was available.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("request failed: {0}")]
    Request(String),

    #[error("failed to read response body: {0}")]
    Body(String),
}

/// Errors surfaced by the client's fallible entry points.
#[derive(Debug, Error)]
pub enum FlagwiseError {
    #[error("flag key must not be empty")]
    EmptyFlagKey,

    #[error("the client must be started from within a Tokio runtime")]
    NoRuntime,

    #[error(transparent)]
    User(#[from] UserError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Ready(#[from] ReadyError),

    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error(transparent)]
    Transport(#[from] TransportError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_messages() {
        let err = ConfigError::MissingSdkKey {
            env_var: "FLAGWISE_SDK_KEY",
        };
        assert_eq!(
            err.to_string(),
            "no SDK key configured and FLAGWISE_SDK_KEY is not set"
        );
        let err = ConfigError::TimeoutTooShort {
            name: "read timeout",
            actual: Duration::from_millis(500),
            minimum: Duration::from_secs(1),
        };
        assert_eq!(
            err.to_string(),
            "read timeout of 500ms is below the minimum of 1s"
        );
    }

    #[test]
    fn ready_messages() {
        assert_eq!(
            ReadyError::Timeout(Duration::from_secs(3)).to_string(),
            "client was not ready within 3s"
        );
        assert_eq!(
            ReadyError::Interrupted.to_string(),
            "wait for readiness was interrupted by close"
        );
    }

    #[test]
    fn unified_error_is_transparent() {
        let err: FlagwiseError = UserError::EmptyId.into();
        assert_eq!(err.to_string(), "user identity must not be empty");
        let err: FlagwiseError = ReadyError::Interrupted.into();
        assert!(matches!(err, FlagwiseError::Ready(ReadyError::Interrupted)));
    }
}
