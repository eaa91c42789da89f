use thiserror::Error;

/// Why a refresh-token exchange did not produce a new access token.
///
/// Cloned out to every request that was queued behind the exchange.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RefreshError {
    #[error("No refresh token available")]
    NoRefreshToken,

    #[error("Refresh token rejected: {0}")]
    Rejected(String),

    #[error("Token refresh failed: {0}")]
    Failed(String),

    #[error("Token refresh abandoned before it completed")]
    Abandoned,
}

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Authentication rejected: {0}")]
    AuthRejected(String),

    #[error("Unauthorized - token may be expired")]
    Unauthorized,

    #[error("Session expired, please log in again: {0}")]
    SessionExpired(#[source] RefreshError),

    #[error("Access denied: {0}")]
    AccessDenied(String),

    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Invalid request: {0}")]
    BadRequest(String),

    #[error("Rate limited - please wait before retrying")]
    RateLimited,

    #[error("Server error: {0}")]
    ServerError(String),

    #[error("Network error: {0}")]
    NetworkError(#[from] reqwest::Error),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Failed to encode request body: {0}")]
    Encode(#[from] serde_json::Error),

    #[error("Session storage error: {0}")]
    Storage(String),
}

/// Maximum length for error response bodies in error messages
const MAX_ERROR_BODY_LENGTH: usize = 500;

impl ApiError {
    /// Truncate a response body to avoid logging excessive data
    fn truncate_body(body: &str) -> String {
        if body.len() <= MAX_ERROR_BODY_LENGTH {
            body.to_string()
        } else {
            let mut end = MAX_ERROR_BODY_LENGTH;
            while !body.is_char_boundary(end) {
                end -= 1;
            }
            format!("{}... (truncated, {} total bytes)", &body[..end], body.len())
        }
    }

    /// Human-readable message from an error body.
    ///
    /// The server answers errors with `{"detail": "..."}`, or a list of
    /// `{"msg": "..."}` objects for validation failures. Anything else is
    /// returned as (truncated) raw text.
    pub fn detail_message(body: &str) -> String {
        if let Ok(value) = serde_json::from_str::<serde_json::Value>(body) {
            match value.get("detail") {
                Some(serde_json::Value::String(detail)) => return Self::truncate_body(detail),
                Some(serde_json::Value::Array(items)) => {
                    let messages: Vec<&str> = items
                        .iter()
                        .filter_map(|item| item.get("msg").and_then(|m| m.as_str()))
                        .collect();
                    if !messages.is_empty() {
                        return Self::truncate_body(&messages.join("; "));
                    }
                }
                _ => {}
            }
        }
        Self::truncate_body(body)
    }

    pub fn from_status(status: reqwest::StatusCode, body: &str) -> Self {
        let detail = Self::detail_message(body);
        match status.as_u16() {
            400 | 409 | 422 => ApiError::BadRequest(detail),
            401 => ApiError::Unauthorized,
            403 => ApiError::AccessDenied(detail),
            404 => ApiError::NotFound(detail),
            429 => ApiError::RateLimited,
            500..=599 => ApiError::ServerError(detail),
            _ => ApiError::InvalidResponse(format!("Status {}: {}", status, detail)),
        }
    }

    /// Error for a failed call to `/auth/login`, `/auth/register` or `/auth/refresh`.
    /// Any client error there means the credentials themselves were refused.
    pub fn from_auth_status(status: reqwest::StatusCode, body: &str) -> Self {
        if status.is_client_error() && status.as_u16() != 429 {
            ApiError::AuthRejected(Self::detail_message(body))
        } else {
            Self::from_status(status, body)
        }
    }

    /// True when the caller should send the user back to the login flow.
    pub fn is_session_lost(&self) -> bool {
        matches!(self, ApiError::Unauthorized | ApiError::SessionExpired(_))
    }
}
