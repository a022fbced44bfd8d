use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DigestError {
    #[error("login failed: {0}")]
    Auth(String),

    #[error("mail transport error: {0}")]
    Transport(String),

    #[error("render error: {0}")]
    Render(String),

    #[error("ocr error: {0}")]
    Ocr(String),

    #[error("summarization unavailable: {0}")]
    Summarization(String),

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("io error: {0}")]
    Io(String),

    #[error("internal error: {0}")]
    Internal(String),
}

impl DigestError {
    pub fn auth(msg: impl Into<String>) -> Self {
        Self::Auth(msg.into())
    }

    pub fn transport(msg: impl Into<String>) -> Self {
        Self::Transport(msg.into())
    }

    pub fn render(msg: impl Into<String>) -> Self {
        Self::Render(msg.into())
    }

    pub fn ocr(msg: impl Into<String>) -> Self {
        Self::Ocr(msg.into())
    }

    pub fn summarization(msg: impl Into<String>) -> Self {
        Self::Summarization(msg.into())
    }

    pub fn invalid_input(msg: impl Into<String>) -> Self {
        Self::InvalidInput(msg.into())
    }

    pub fn io(msg: impl Into<String>) -> Self {
        Self::Io(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    /// Errors that abort a whole batch rather than a single message.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            Self::Auth(_) | Self::Transport(_) | Self::InvalidInput(_)
        )
    }
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub code: &'static str,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suggestion: Option<&'static str>,
    pub retryable: bool,
}

impl From<&DigestError> for ErrorResponse {
    fn from(err: &DigestError) -> Self {
        let (code, suggestion, retryable) = match err {
            DigestError::Auth(_) => (
                "AUTH_ERROR",
                Some("Check your email and app password (DIGEST_EMAIL / DIGEST_APP_PASSWORD)"),
                false,
            ),
            DigestError::Transport(_) => (
                "TRANSPORT_ERROR",
                Some("Check the IMAP host and your network connection, then try again"),
                true,
            ),
            DigestError::Render(_) => (
                "RENDER_ERROR",
                Some("Set DIGEST_CHROME_BIN to a headless-capable browser"),
                false,
            ),
            DigestError::Ocr(_) => (
                "OCR_ERROR",
                Some("Set DIGEST_TESSERACT_BIN to an installed tesseract binary"),
                false,
            ),
            DigestError::Summarization(_) => ("SUMMARIZATION_ERROR", None, true),
            DigestError::InvalidInput(_) => ("INVALID_INPUT", None, false),
            DigestError::Io(_) => ("IO_ERROR", None, false),
            DigestError::Internal(_) => ("INTERNAL_ERROR", Some("Unexpected error"), true),
        };
        Self {
            code,
            message: err.to_string(),
            suggestion,
            retryable,
        }
    }
}

impl ErrorResponse {
    pub fn to_compact(&self) -> String {
        let mut parts = vec![format!("[{}] {}", self.code, self.message)];
        if let Some(s) = self.suggestion {
            parts.push(format!("Suggestion: {s}"));
        }
        if self.retryable {
            parts.push("(retryable)".to_string());
        }
        parts.join(" | ")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn auth_error_is_terminal_and_not_retryable() {
        let err = DigestError::auth("bad credentials");
        assert!(err.is_terminal());

        let resp = ErrorResponse::from(&err);
        assert_eq!(resp.code, "AUTH_ERROR");
        assert!(!resp.retryable);
        assert_eq!(resp.message, "login failed: bad credentials");
    }

    #[test]
    fn summarization_error_is_absorbed_not_terminal() {
        assert!(!DigestError::summarization("model offline").is_terminal());
        assert!(!DigestError::render("no browser").is_terminal());
    }

    #[test]
    fn compact_form_carries_cause_and_hint() {
        let resp = ErrorResponse::from(&DigestError::transport("connection reset"));
        let line = resp.to_compact();
        assert!(line.starts_with("[TRANSPORT_ERROR] mail transport error: connection reset"));
        assert!(line.contains("Suggestion:"));
        assert!(line.ends_with("(retryable)"));
    }

    #[test]
    fn response_skips_missing_suggestion() {
        let resp = ErrorResponse::from(&DigestError::invalid_input("count must be >= 1"));
        let json = serde_json::to_string(&resp).unwrap_or_default();
        assert!(!json.contains("suggestion"));
    }
}
