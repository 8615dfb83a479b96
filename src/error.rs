use thiserror::Error;

pub type Result<T> = std::result::Result<T, CardError>;

#[derive(Debug, Error)]
pub enum CardError {
    /// Missing or invalid setup. Fatal at construction time.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// The request never produced an HTTP response (connect, DNS, TLS, body read).
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    /// Non-success status. `body` is the raw response text and is not assumed to be JSON.
    #[error("Backend error ({status}): {body}")]
    Backend { status: u16, body: String },

    #[error("Failed to decode backend response: {0}")]
    Decode(#[from] serde_json::Error),

    /// Rejected client-side before any request was sent.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Render error: {0}")]
    Render(#[from] askama::Error),
}

impl CardError {
    pub fn backend(status: u16, body: impl Into<String>) -> Self {
        CardError::Backend {
            status,
            body: body.into(),
        }
    }

    /// Diagnostic text of a backend rejection, if this is one.
    #[cfg(test)]
    pub fn backend_body(&self) -> Option<&str> {
        match self {
            CardError::Backend { body, .. } => Some(body),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backend_error_keeps_body_text() {
        let err = CardError::backend(422, "invalid downtrend_multiplier");
        assert_eq!(err.backend_body(), Some("invalid downtrend_multiplier"));
        assert_eq!(
            err.to_string(),
            "Backend error (422): invalid downtrend_multiplier"
        );
    }

    #[test]
    fn test_non_backend_errors_have_no_body() {
        let err = CardError::Configuration("Set backend_url in card config".to_string());
        assert!(err.backend_body().is_none());
    }
}
