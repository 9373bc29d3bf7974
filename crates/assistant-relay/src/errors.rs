use crate::service::RunStatus;

/// Errors returned by an `AssistantService` implementation.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ServiceError {
    /// Service answered with an application-level failure (HTTP status, auth, etc.).
    #[error("assistant service error: {message}")]
    Api {
        message: String,
        status_code: Option<u16>,
    },
    /// The service could not be reached or the response body could not be read.
    #[error("assistant service transport error: {message}")]
    Transport { message: String },
    /// The service answered with a shape this crate does not understand.
    #[error("assistant service protocol error: {message}")]
    Protocol { message: String },
}

impl ServiceError {
    /// Creates an application-level error.
    pub fn api(message: impl Into<String>, status_code: Option<u16>) -> Self {
        Self::Api {
            message: message.into(),
            status_code,
        }
    }

    /// Creates a transport-level error.
    pub fn transport(message: impl Into<String>) -> Self {
        Self::Transport {
            message: message.into(),
        }
    }

    /// Creates a protocol-level error.
    pub fn protocol(message: impl Into<String>) -> Self {
        Self::Protocol {
            message: message.into(),
        }
    }

    /// Returns the human-readable message for this error.
    pub fn message(&self) -> &str {
        match self {
            Self::Api { message, .. }
            | Self::Transport { message }
            | Self::Protocol { message } => message,
        }
    }
}

/// A run that stopped without completing successfully.
///
/// This is a value, not a crash: the producer turns it into a single `error`
/// frame so the client can render it inline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum RunFailure {
    /// The service reported a failure terminal state.
    #[error("{0}")]
    Terminal(RunStatus),
    /// The wait policy ran out of attempts while the run was still pending.
    #[error("timed out after {attempts} status checks")]
    TimedOut { attempts: u32 },
}

impl RunFailure {
    /// Detail string carried by the `error` frame.
    pub fn detail(&self) -> String {
        self.to_string()
    }
}

/// Errors raised while encoding or decoding frames.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FrameError {
    /// The stream ended while a record was still incomplete.
    #[error("truncated frame: stream ended with {pending} undecoded bytes")]
    Truncated { pending: usize },
    /// The record's type code is not one this protocol defines.
    #[error("unknown frame type code {code:?}")]
    UnknownKind { code: String },
    /// The record could not be parsed for its declared kind.
    #[error("malformed frame: {message}")]
    Malformed { message: String },
    /// Serializing a frame payload failed.
    #[error("failed to encode frame: {message}")]
    Encode { message: String },
}

impl FrameError {
    pub(crate) fn malformed(message: impl Into<String>) -> Self {
        Self::Malformed {
            message: message.into(),
        }
    }
}

/// Top-level error type for the relay API.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RelayError {
    /// Invalid or missing configuration. Fatal, never retried.
    #[error("config error: {0}")]
    Config(String),
    /// Invalid submission input.
    #[error("validation error: {0}")]
    Validation(String),
    /// The assistant service call failed.
    #[error(transparent)]
    Service(#[from] ServiceError),
    /// The run reached a failure terminal state or the wait policy gave up.
    #[error("run failed: {0}")]
    RunFailed(RunFailure),
    /// A frame could not be encoded or decoded.
    #[error(transparent)]
    Frame(#[from] FrameError),
    /// The byte stream between relay and client failed.
    #[error("transport error: {0}")]
    Transport(String),
    /// The receiving side of a frame stream went away.
    #[error("frame stream receiver disconnected")]
    Disconnected,
}

impl From<RunFailure> for RelayError {
    fn from(value: RunFailure) -> Self {
        RelayError::RunFailed(value)
    }
}

impl RelayError {
    /// Text placed in an `error` frame when this error ends a started stream.
    ///
    /// Run failures carry only the bare detail (for example `failed`) so clients
    /// see the terminal status itself.
    pub fn frame_detail(&self) -> String {
        match self {
            RelayError::RunFailed(failure) => failure.detail(),
            other => other.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn run_failure_detail_is_bare_status() {
        assert_eq!(RunFailure::Terminal(RunStatus::Failed).detail(), "failed");
        assert_eq!(
            RunFailure::Terminal(RunStatus::Cancelling).detail(),
            "cancelling"
        );
        assert_eq!(
            RunFailure::TimedOut { attempts: 3 }.detail(),
            "timed out after 3 status checks"
        );
    }

    #[test]
    fn frame_detail_unwraps_run_failures_only() {
        let failed = RelayError::from(RunFailure::Terminal(RunStatus::Expired));
        assert_eq!(failed.frame_detail(), "expired");

        let transport = RelayError::from(ServiceError::transport("connection reset"));
        assert_eq!(
            transport.frame_detail(),
            "assistant service transport error: connection reset"
        );
    }
}
