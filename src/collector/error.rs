use serde::Deserialize;

/// Text shown for any failure to reach the collector. The underlying
/// error is logged, never displayed.
pub const TRANSPORT_MESSAGE: &str = "Unable to reach the monitoring collector";

/// Errors from the collector seam.
#[derive(Debug, thiserror::Error)]
pub enum CollectorError {
    /// Input rejected locally, before any request was sent.
    #[error("{0}")]
    Validation(String),

    /// The HTTP request itself failed (connect, timeout, body read).
    #[error("collector request failed: {0}")]
    Transport(#[from] reqwest::Error),

    /// Non-2xx response without a structured error body.
    #[error("Request failed with status code {status}")]
    Status { status: u16 },

    /// The collector answered and reported a failure of its own.
    #[error("{message}")]
    Backend { status: u16, message: String },

    /// The response does not honor the collector contract.
    #[error("collector returned an inconsistent response: {0}")]
    Contract(String),
}

#[derive(Deserialize)]
struct ErrorBody {
    error: String,
}

impl CollectorError {
    /// Message fit for the user: backend and validation text verbatim,
    /// transport failures reduced to a generic description.
    pub fn user_message(&self) -> String {
        match self {
            CollectorError::Transport(_) => TRANSPORT_MESSAGE.to_string(),
            other => other.to_string(),
        }
    }

    /// Map a non-2xx response, preferring the `{"error": ...}` body field.
    pub fn from_response(status: u16, body: &str) -> Self {
        match serde_json::from_str::<ErrorBody>(body) {
            Ok(ErrorBody { error }) if !error.trim().is_empty() => CollectorError::Backend {
                status,
                message: error,
            },
            _ => CollectorError::Status { status },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_structured_error_preferred() {
        let err = CollectorError::from_response(
            400,
            r#"{"error":"ORA-00942: table or view does not exist"}"#,
        );
        assert!(matches!(err, CollectorError::Backend { status: 400, .. }));
        assert_eq!(err.user_message(), "ORA-00942: table or view does not exist");
    }

    #[test]
    fn test_unstructured_body_falls_back() {
        let err = CollectorError::from_response(502, "<html>Bad Gateway</html>");
        assert!(matches!(err, CollectorError::Status { status: 502 }));
        assert_eq!(err.user_message(), "Request failed with status code 502");
    }

    #[test]
    fn test_blank_error_field_falls_back() {
        let err = CollectorError::from_response(500, r#"{"error":"  "}"#);
        assert!(matches!(err, CollectorError::Status { status: 500 }));
    }

    #[test]
    fn test_validation_verbatim() {
        let err = CollectorError::Validation("Please enter a SQL query".into());
        assert_eq!(err.user_message(), "Please enter a SQL query");
    }
}
