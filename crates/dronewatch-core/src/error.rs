//! Error types
//!
//! Every failure the engine can see is one of three kinds: the backend could
//! not be reached or answered with a non-success status, the backend answered
//! with a body we could not parse, or a locally edited value failed
//! validation. Command failures wrap these with the command that produced them
//! so the status line reads naturally ("Start failed: ...").

use thiserror::Error;

/// Failure talking to the detection backend
///
/// `Display` is the bare operator-facing message, with no prefix.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RemoteError {
    /// Request never produced a response (connection refused, DNS, ...)
    #[error("{0}")]
    Transport(String),

    /// Backend answered with a non-success status
    #[error("{message}")]
    Http { status: u16, message: String },

    /// Backend answered with a body that is not the expected JSON
    #[error("{detail}")]
    Parse { detail: String },
}

impl RemoteError {
    /// Build an error for a non-success response
    ///
    /// Prefers a string `detail` field from a JSON body, then the raw body
    /// text, then a generic `HTTP <status>`.
    pub fn from_response(status: u16, body: &str) -> Self {
        RemoteError::Http {
            status,
            message: error_message(status, body),
        }
    }

    /// HTTP status code, if the backend answered at all
    pub fn status(&self) -> Option<u16> {
        match self {
            RemoteError::Http { status, .. } => Some(*status),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for RemoteError {
    fn from(error: reqwest::Error) -> Self {
        RemoteError::Transport(error.to_string())
    }
}

fn error_message(status: u16, body: &str) -> String {
    let detail = serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|value| {
            value
                .get("detail")
                .and_then(|d| d.as_str())
                .filter(|d| !d.is_empty())
                .map(str::to_string)
        });

    if let Some(detail) = detail {
        return detail;
    }

    if !body.is_empty() {
        return body.to_string();
    }

    format!("HTTP {}", status)
}

/// Threshold draft rejected before it was sent
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ValidationError {
    #[error("Threshold must be a number")]
    NotFinite,

    #[error("Threshold must be between 0 and 1 (got {0})")]
    OutOfRange(f64),
}

/// Applying the threshold failed, either locally or remotely
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SettingsError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Remote(#[from] RemoteError),
}

/// A user command failed
///
/// The `Display` form is what ends up in the dashboard's error line.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ActionError {
    #[error("Start failed: {0}")]
    Start(#[source] RemoteError),

    #[error("Stop failed: {0}")]
    Stop(#[source] RemoteError),

    #[error("Settings failed: {0}")]
    Settings(#[source] SettingsError),

    #[error("{0}")]
    Refresh(#[source] RemoteError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_message_prefers_detail() {
        let err = RemoteError::from_response(409, r#"{"detail":"worker not running"}"#);
        assert_eq!(err.to_string(), "worker not running");
        assert_eq!(err.status(), Some(409));
    }

    #[test]
    fn test_message_falls_back_to_raw_text() {
        let err = RemoteError::from_response(502, "Bad Gateway");
        assert_eq!(err.to_string(), "Bad Gateway");

        // JSON without a detail field is still shown verbatim
        let err = RemoteError::from_response(500, r#"{"error":"boom"}"#);
        assert_eq!(err.to_string(), r#"{"error":"boom"}"#);
    }

    #[test]
    fn test_message_falls_back_to_status() {
        let err = RemoteError::from_response(503, "");
        assert_eq!(err.to_string(), "HTTP 503");
    }

    #[test]
    fn test_non_string_detail_is_ignored() {
        let body = r#"{"detail":[{"loc":["body"],"msg":"field required"}]}"#;
        let err = RemoteError::from_response(422, body);
        assert_eq!(err.to_string(), body);
    }

    #[test]
    fn test_action_error_display() {
        let err = ActionError::Start(RemoteError::Transport("connection refused".into()));
        assert_eq!(err.to_string(), "Start failed: connection refused");

        let err = ActionError::Settings(ValidationError::NotFinite.into());
        assert_eq!(err.to_string(), "Settings failed: Threshold must be a number");

        let err = ActionError::Refresh(RemoteError::Parse {
            detail: "<html>".into(),
        });
        assert_eq!(err.to_string(), "<html>");
    }
}
