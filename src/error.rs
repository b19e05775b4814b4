use std::time::Duration;

use thiserror::Error;

use crate::html::collapse_whitespace;

/// Detail reported when a failed renewal page carries no readable message.
pub const NO_ERROR_MESSAGE: &str = "no error message found in response";

/// Longest body excerpt carried into error messages and logs, in characters.
pub const BODY_EXCERPT_CHARS: usize = 200;

/// Everything that can go wrong while renewing a VPS.
#[derive(Debug, Error)]
pub enum RenewError {
    /// Missing or empty credentials and options.
    #[error("configuration error: {0}")]
    Config(String),

    #[error("failed to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// Transport failure (DNS, TLS, connection reset, ...).
    #[error("request to {url} failed: {message}")]
    Network { url: String, message: String },

    #[error("request to {url} timed out after {timeout:?}")]
    Timeout { url: String, timeout: Duration },

    #[error("unexpected status code: {status}, body: {}", body_excerpt(.body))]
    UnexpectedStatus { status: u16, body: String },

    #[error("failed to parse {context}: {message}")]
    Parse {
        context: &'static str,
        message: String,
    },

    #[error("CSRF token not found in response")]
    TokenNotFound,

    #[error("VPS renewal failed: {0}")]
    RenewalFailed(String),
}

pub type Result<T> = std::result::Result<T, RenewError>;

/// Response body squeezed onto one line and cut to [`BODY_EXCERPT_CHARS`].
pub fn body_excerpt(body: &str) -> String {
    let text = collapse_whitespace(body);
    if text.is_empty() {
        return "(empty)".to_string();
    }
    match text.char_indices().nth(BODY_EXCERPT_CHARS) {
        Some((cut, _)) => format!("{}...", &text[..cut]),
        None => text,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_renewal_failed_message() {
        let err = RenewError::RenewalFailed("This is an error".to_string());
        assert_eq!(err.to_string(), "VPS renewal failed: This is an error");

        let err = RenewError::RenewalFailed(NO_ERROR_MESSAGE.to_string());
        assert_eq!(
            err.to_string(),
            "VPS renewal failed: no error message found in response"
        );
    }

    #[test]
    fn test_unexpected_status_shows_body() {
        let err = RenewError::UnexpectedStatus {
            status: 403,
            body: "<main>\n  セッションが無効です\n</main>".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "unexpected status code: 403, body: <main> セッションが無効です </main>"
        );

        let err = RenewError::UnexpectedStatus {
            status: 302,
            body: String::new(),
        };
        assert_eq!(err.to_string(), "unexpected status code: 302, body: (empty)");
    }

    #[test]
    fn test_body_excerpt_truncates_on_char_boundary() {
        let body = "無".repeat(BODY_EXCERPT_CHARS + 50);
        let excerpt = body_excerpt(&body);
        assert!(excerpt.ends_with("..."));
        assert_eq!(excerpt.chars().count(), BODY_EXCERPT_CHARS + 3);

        assert_eq!(body_excerpt("short"), "short");
    }
}
