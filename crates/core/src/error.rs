// SPDX-FileCopyrightText: © 2025 StreamKit Contributors
//
// SPDX-License-Identifier: MPL-2.0

//! Structured error types for provider adapters.
//!
//! Every failure the core can produce is a variant of [`CcApiError`]. The core never
//! substitutes placeholder media for an error; that decision belongs to the caller
//! (see `ccapi_nodes::fallback`).

use thiserror::Error;

/// Main error type for provider calls and media transcoding.
#[derive(Debug, Error)]
pub enum CcApiError {
    /// No credential was found in the argument, the environment, or the credentials file.
    ///
    /// User-correctable: the message names every place that was searched.
    #[error("Missing credential: {0}")]
    MissingCredential(String),

    /// The provider rejected the job at submission time.
    ///
    /// `body` carries the raw response so the caller can diagnose the rejection.
    #[error("Submission rejected (status {status}): {body}")]
    Submission { status: u16, body: String },

    /// The remote job ran and reported failure.
    #[error("Task {task_id} failed: {reason}")]
    TaskFailed { task_id: String, reason: String },

    /// The polling budget ran out before the task reached a terminal state.
    ///
    /// Distinct from [`CcApiError::TaskFailed`] so callers can suggest raising `max_attempts`.
    /// `last_error` holds the transient error seen on the final attempt, if any.
    #[error(
        "Task {task_id} did not finish after {attempts} polling attempts{}",
        cause_suffix(.last_error)
    )]
    TaskTimeout { task_id: String, attempts: u32, last_error: Option<String> },

    /// The task reached SUCCEEDED but the response carried no usable media URL.
    #[error("Task {task_id} succeeded but the provider returned no result")]
    ResultMissing { task_id: String },

    /// Audio bytes could not be interpreted with the requested sample format.
    #[error("Malformed audio: {0}")]
    MalformedAudio(String),

    /// Audio duration is outside the range a provider accepts.
    #[error("Audio duration {duration_secs:.2}s is outside the range [{min_secs}s, {max_secs}s]")]
    DurationOutOfRange { duration_secs: f64, min_secs: f64, max_secs: f64 },

    /// No dimensions satisfy the provider's pixel-count and aspect-ratio bounds.
    #[error("No conforming size: {0}")]
    NoConformingSize(String),

    /// Image encoding or decoding failure.
    #[error("Image error: {0}")]
    Image(String),

    /// Audio container encoding or decoding failure.
    #[error("Codec error: {0}")]
    Codec(String),

    /// Transport-level failure (connection refused, timeout, TLS).
    #[error("Network error: {0}")]
    Network(String),

    /// HTTP 200 whose body carries a provider-level error code (`base_resp.status_code`).
    #[error("Provider error {code}: {message}")]
    Provider { code: i64, message: String },

    /// Non-success HTTP status outside of job submission.
    #[error("HTTP {status}: {body}")]
    Http { status: u16, body: String },

    /// A provider response did not have the expected shape.
    #[error("Parse error: {0}")]
    Parse(String),

    /// Invalid arguments or configuration.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// I/O error (temporary files, credentials file).
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

fn cause_suffix(last_error: &Option<String>) -> String {
    last_error.as_ref().map(|e| format!(" (last error: {e})")).unwrap_or_default()
}

impl CcApiError {
    /// Returns true for failures a polling loop may absorb and retry on the next interval.
    pub const fn is_transient(&self) -> bool {
        matches!(self, Self::Network(_) | Self::Http { .. } | Self::Parse(_))
    }
}

impl From<serde_json::Error> for CcApiError {
    fn from(err: serde_json::Error) -> Self {
        Self::Parse(err.to_string())
    }
}

/// Convenience type alias for Results using `CcApiError`.
pub type Result<T> = std::result::Result<T, CcApiError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = CcApiError::Submission { status: 400, body: "{\"error\":\"bad\"}".to_string() };
        assert_eq!(err.to_string(), "Submission rejected (status 400): {\"error\":\"bad\"}");

        let err =
            CcApiError::TaskFailed { task_id: "abc".to_string(), reason: "nsfw".to_string() };
        assert_eq!(err.to_string(), "Task abc failed: nsfw");
    }

    #[test]
    fn test_timeout_display_includes_cause() {
        let err = CcApiError::TaskTimeout {
            task_id: "abc".to_string(),
            attempts: 3,
            last_error: Some("Network error: reset".to_string()),
        };
        assert_eq!(
            err.to_string(),
            "Task abc did not finish after 3 polling attempts (last error: Network error: reset)"
        );

        let err =
            CcApiError::TaskTimeout { task_id: "abc".to_string(), attempts: 3, last_error: None };
        assert_eq!(err.to_string(), "Task abc did not finish after 3 polling attempts");
    }

    #[test]
    fn test_transient_classification() {
        assert!(CcApiError::Network("reset".to_string()).is_transient());
        assert!(CcApiError::Http { status: 502, body: String::new() }.is_transient());
        assert!(CcApiError::Parse("missing task".to_string()).is_transient());
        assert!(!CcApiError::ResultMissing { task_id: "a".to_string() }.is_transient());
        assert!(!CcApiError::Provider { code: 1004, message: "auth".to_string() }.is_transient());
        assert!(!CcApiError::MissingCredential("PPIO_API_KEY".to_string()).is_transient());
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "File not found");
        let err: CcApiError = io_err.into();
        assert!(err.to_string().contains("I/O error"));
        assert!(err.to_string().contains("File not found"));
    }
}
