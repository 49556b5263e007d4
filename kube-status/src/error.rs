//! Error types for the status service and its dependency probes

use http::StatusCode;
use thiserror::Error;

/// Result type alias using the crate error
pub type Result<T> = std::result::Result<T, Error>;

/// Error returned by a local health or readiness check
///
/// Checks are user code, so any error type is accepted; only its
/// `Display` text ends up in the reported [`Status`](crate::status::Status).
pub type CheckError = Box<dyn std::error::Error + Send + Sync>;

/// Main error type for the crate
///
/// Large error variants are boxed to reduce stack size
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration could not be loaded or extracted
    #[error("Configuration error: {0}")]
    Config(Box<figment::Error>),

    /// Service construction was attempted with an invalid setup
    #[error("Validation error: {0}")]
    Validation(String),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// `Service::start` was called on an instance that has already been started
    #[error("kube-status service may only be started once")]
    AlreadyStarted,

    /// The serving loop has terminated (or never started)
    #[error("{0}")]
    Fatal(#[from] ServeError),

    /// The service started, but probing its own health endpoint failed
    #[error("self check failed: {0}")]
    SelfCheck(#[from] ProbeError),
}

impl From<figment::Error> for Error {
    fn from(err: figment::Error) -> Self {
        Error::Config(Box::new(err))
    }
}

/// Reason the serving loop is not (or no longer) running
///
/// Latched into the service's fatal state, so it is cheap to clone and
/// compare.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ServeError {
    /// Sentinel held between construction and `start`
    #[error("kube-status service has not been started yet")]
    NotStarted,

    /// The listener could not be bound
    #[error("failed to bind {addr}: {message}")]
    Bind {
        /// Address the loop attempted to bind
        addr: String,
        /// Underlying I/O error text
        message: String,
    },

    /// The server returned an error while serving
    #[error("serving loop failed: {0}")]
    Serve(String),

    /// The serving loop shut down cleanly
    #[error("serving loop stopped")]
    Stopped,

    /// The serving loop panicked; the panic was captured
    #[error("recovered from panic: {0}")]
    Panic(String),
}

/// Failure probing a single dependency address
#[derive(Debug, Error)]
pub enum ProbeError {
    /// The configured address is not a valid URL
    #[error("invalid address {address:?}: {source}")]
    InvalidUrl {
        /// Address as configured
        address: String,
        /// Parse failure
        #[source]
        source: url::ParseError,
    },

    /// Connecting, sending or receiving failed
    #[error("{0}")]
    Transport(#[from] reqwest::Error),

    /// The remote answered with a non-2xx status
    ///
    /// `message` is the remote status message, when the body decoded.
    #[error("{}", format_status(.status, .message.as_deref()))]
    Status {
        /// HTTP status of the response
        status: StatusCode,
        /// Message of the decoded remote status, if any
        message: Option<String>,
    },
}

impl ProbeError {
    /// Whether the remote reported a dependency cycle
    pub fn is_loop_detected(&self) -> bool {
        matches!(self, ProbeError::Status { status, .. } if *status == StatusCode::LOOP_DETECTED)
    }
}

fn format_status(status: &StatusCode, message: Option<&str>) -> String {
    match message {
        Some(message) if !message.is_empty() => format!("{}: {}", status, message),
        _ => status.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_error_display() {
        let err = ProbeError::Status {
            status: StatusCode::SERVICE_UNAVAILABLE,
            message: Some("some_error".to_string()),
        };
        assert_eq!(err.to_string(), "503 Service Unavailable: some_error");

        let err = ProbeError::Status {
            status: StatusCode::IM_A_TEAPOT,
            message: None,
        };
        assert_eq!(err.to_string(), "418 I'm a teapot");
    }

    #[test]
    fn test_empty_remote_message_is_not_appended() {
        let err = ProbeError::Status {
            status: StatusCode::BAD_GATEWAY,
            message: Some(String::new()),
        };
        assert_eq!(err.to_string(), "502 Bad Gateway");
    }

    #[test]
    fn test_loop_detected() {
        let err = ProbeError::Status {
            status: StatusCode::LOOP_DETECTED,
            message: None,
        };
        assert!(err.is_loop_detected());

        let err = ProbeError::Status {
            status: StatusCode::SERVICE_UNAVAILABLE,
            message: None,
        };
        assert!(!err.is_loop_detected());
    }

    #[test]
    fn test_fatal_error_display_passthrough() {
        let err: Error = ServeError::NotStarted.into();
        assert_eq!(
            err.to_string(),
            "kube-status service has not been started yet"
        );
    }
}
