use thiserror::Error;

/// Synthetic status for a request that never produced a response.
pub const TRANSPORT_FAILURE_STATUS: u16 = 0;

/// Synthetic status for a request that exceeded its timeout.
pub const TIMEOUT_STATUS: u16 = 408;

/// Maximum length for error response bodies in error messages
const MAX_ERROR_BODY_LENGTH: usize = 500;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CoreError {
    #[error("Authentication required - no credential on record")]
    AuthenticationRequired,

    #[error("Token refresh failed: {cause}")]
    TokenRefreshFailed { cause: String },

    #[error("Upstream request failed with status {status}: {}", truncate_body(.body))]
    UpstreamRequestFailed { status: u16, body: String },

    #[error("Failed to persist credentials: {0}")]
    Persistence(String),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

impl CoreError {
    /// Build the upstream failure for a non-success status, keeping the body verbatim.
    pub fn from_status(status: reqwest::StatusCode, body: String) -> Self {
        CoreError::UpstreamRequestFailed {
            status: status.as_u16(),
            body,
        }
    }

    /// Classify a request that failed before a response arrived.
    pub fn from_transport(err: &reqwest::Error) -> Self {
        let status = if err.is_timeout() {
            TIMEOUT_STATUS
        } else {
            TRANSPORT_FAILURE_STATUS
        };
        CoreError::UpstreamRequestFailed {
            status,
            body: err.to_string(),
        }
    }

    pub fn timeout(after: std::time::Duration) -> Self {
        CoreError::UpstreamRequestFailed {
            status: TIMEOUT_STATUS,
            body: format!("request timed out after {}ms", after.as_millis()),
        }
    }

    /// True when the operator has to go through the authorization flow again.
    pub fn is_reauthorization_required(&self) -> bool {
        matches!(
            self,
            CoreError::AuthenticationRequired | CoreError::TokenRefreshFailed { .. }
        )
    }
}

/// Truncate a response body to avoid logging excessive data
fn truncate_body(body: &str) -> String {
    if body.len() <= MAX_ERROR_BODY_LENGTH {
        return body.to_string();
    }
    let mut end = MAX_ERROR_BODY_LENGTH;
    while !body.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}... (truncated, {} total bytes)", &body[..end], body.len())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_short_body_is_displayed_verbatim() {
        let err = CoreError::UpstreamRequestFailed {
            status: 403,
            body: r#"{"message":"Not enough permissions"}"#.to_string(),
        };
        assert_eq!(
            err.to_string(),
            r#"Upstream request failed with status 403: {"message":"Not enough permissions"}"#
        );
    }

    #[test]
    fn test_long_body_is_truncated_in_display_only() {
        let body = "é".repeat(400);
        let err = CoreError::UpstreamRequestFailed {
            status: 500,
            body: body.clone(),
        };
        let display = err.to_string();
        assert!(display.contains("(truncated, 800 total bytes)"));
        match err {
            CoreError::UpstreamRequestFailed { body: kept, .. } => assert_eq!(kept, body),
            other => panic!("unexpected variant: {other:?}"),
        }
    }

    #[test]
    fn test_reauthorization_classification() {
        assert!(CoreError::AuthenticationRequired.is_reauthorization_required());
        assert!(CoreError::TokenRefreshFailed {
            cause: "invalid_grant".into()
        }
        .is_reauthorization_required());
        assert!(!CoreError::Persistence("disk full".into()).is_reauthorization_required());
        assert!(!CoreError::timeout(std::time::Duration::from_secs(1)).is_reauthorization_required());
    }

    #[test]
    fn test_timeout_uses_synthetic_status() {
        match CoreError::timeout(std::time::Duration::from_millis(250)) {
            CoreError::UpstreamRequestFailed { status, body } => {
                assert_eq!(status, TIMEOUT_STATUS);
                assert_eq!(body, "request timed out after 250ms");
            }
            other => panic!("unexpected variant: {other:?}"),
        }
    }
}
