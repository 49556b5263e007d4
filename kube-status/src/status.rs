//! The status record returned by every endpoint

use chrono::{DateTime, Utc};
use http::StatusCode;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

use crate::ids::InstanceId;

/// Message carried by every successful status
pub const OK_MESSAGE: &str = "OK";

/// Result of a single health or readiness check
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Status {
    /// HTTP status code: 200, 503, or 508 when a dependency cycle was detected
    pub code: u16,

    /// Either `OK` or the error message
    pub message: String,

    /// `true` only for code 200
    pub success: bool,

    /// Nanoseconds since the epoch at which the service was started
    pub started: i64,

    /// Human readable time elapsed since `started`
    pub uptime: String,

    /// Instance UUID of the reporting service
    pub uuid: String,
}

impl Status {
    /// Build a status for `id`, failing with `error` when present
    ///
    /// This is the only constructor; `success`, `code` and `message` are
    /// always consistent with each other. A service that has not been
    /// started yet reports `started = 0` and zero uptime.
    pub fn new<E: fmt::Display>(
        id: &InstanceId,
        started: Option<DateTime<Utc>>,
        error: Option<E>,
    ) -> Self {
        let (started, uptime) = match started {
            Some(started) => (
                started.timestamp_nanos_opt().unwrap_or_default(),
                (Utc::now() - started).to_std().unwrap_or_default(),
            ),
            None => (0, Duration::ZERO),
        };

        let (code, message) = match error {
            None => (StatusCode::OK, OK_MESSAGE.to_string()),
            Some(err) => (StatusCode::SERVICE_UNAVAILABLE, err.to_string()),
        };

        Self {
            code: code.as_u16(),
            message,
            success: code == StatusCode::OK,
            started,
            uptime: format_uptime(uptime),
            uuid: id.to_string(),
        }
    }

    /// Shorthand for a successful status
    pub fn ok(id: &InstanceId, started: Option<DateTime<Utc>>) -> Self {
        Self::new(id, started, None::<&str>)
    }

    /// Replace the failure code, keeping the message
    ///
    /// Successful statuses are returned untouched.
    pub(crate) fn with_failure_code(mut self, code: StatusCode) -> Self {
        if !self.success {
            self.code = code.as_u16();
        }
        self
    }

    /// The code as an HTTP status, falling back to 500 for garbage
    pub fn status_code(&self) -> StatusCode {
        StatusCode::from_u16(self.code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
    }
}

/// Format a duration the way uptimes are reported, e.g. `1h2m3.5s`
///
/// Durations under a second use the largest fitting unit of `ms`, `µs`
/// or `ns`; zero is `0s`.
pub fn format_uptime(duration: Duration) -> String {
    const MICRO: u128 = 1_000;
    const MILLI: u128 = 1_000_000;
    const SECOND: u128 = 1_000_000_000;

    let nanos = duration.as_nanos();
    if nanos == 0 {
        return "0s".to_string();
    }
    if nanos < MICRO {
        return format!("{}ns", nanos);
    }
    if nanos < MILLI {
        return format!("{}µs", fraction(nanos, MICRO, 3));
    }
    if nanos < SECOND {
        return format!("{}ms", fraction(nanos, MILLI, 6));
    }

    let secs = duration.as_secs();
    let hours = secs / 3600;
    let minutes = (secs % 3600) / 60;
    let seconds = fraction(nanos % (60 * SECOND), SECOND, 9);

    if hours > 0 {
        format!("{}h{}m{}s", hours, minutes, seconds)
    } else if minutes > 0 {
        format!("{}m{}s", minutes, seconds)
    } else {
        format!("{}s", seconds)
    }
}

fn fraction(value: u128, unit: u128, digits: usize) -> String {
    let whole = value / unit;
    let rem = value % unit;
    if rem == 0 {
        return whole.to_string();
    }
    let frac = format!("{:0width$}", rem, width = digits);
    format!("{}.{}", whole, frac.trim_end_matches('0'))
}
