use thiserror::Error;

/// Vendor login error id for a wrong username or password
const ERROR_ID_INVALID_CREDENTIALS: i64 = 9;

/// Vendor login error id for an account locked after too many attempts
const ERROR_ID_ACCOUNT_LOCKED: i64 = 241;

/// Failures that mean the caller must (re-)authenticate before the next call.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AuthError {
    #[error("Username and password are required")]
    EmptyCredentials,

    #[error("Invalid username or password")]
    InvalidCredentials,

    #[error("Account is locked")]
    AccountLocked,

    #[error("Session token is invalid or expired")]
    SessionExpired,

    #[error("Login rejected (status {status}): {message}")]
    Rejected { status: u16, message: String },
}

#[derive(Error, Debug)]
pub enum ApiError {
    #[error(transparent)]
    Auth(#[from] AuthError),

    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Rate limited - please wait before retrying")]
    RateLimited,

    #[error("Server error: {0}")]
    ServerError(String),

    #[error("Network error: {0}")]
    NetworkError(#[from] reqwest::Error),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

pub type ApiResult<T> = std::result::Result<T, ApiError>;

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

    /// Classify a failed response from an authenticated endpoint.
    pub fn from_status(status: reqwest::StatusCode, body: &str) -> Self {
        let truncated = Self::truncate_body(body);
        match status.as_u16() {
            401 | 403 => ApiError::Auth(AuthError::SessionExpired),
            404 => ApiError::NotFound(truncated),
            429 => ApiError::RateLimited,
            500..=599 => ApiError::ServerError(truncated),
            _ => ApiError::InvalidResponse(format!("Status {}: {}", status, truncated)),
        }
    }

    /// Classify a failed response from the login endpoint.
    ///
    /// The vendor reports the reason in an `errorId` field of the JSON body.
    pub fn from_login_status(status: reqwest::StatusCode, body: &str) -> Self {
        let error_id = serde_json::from_str::<serde_json::Value>(body)
            .ok()
            .and_then(|v| v.get("errorId").and_then(|id| id.as_i64()));

        match (status.as_u16(), error_id) {
            (_, Some(ERROR_ID_INVALID_CREDENTIALS)) => AuthError::InvalidCredentials.into(),
            (_, Some(ERROR_ID_ACCOUNT_LOCKED)) => AuthError::AccountLocked.into(),
            (401, _) => AuthError::InvalidCredentials.into(),
            (code @ 400..=499, _) if code != 404 && code != 429 => AuthError::Rejected {
                status: code,
                message: Self::truncate_body(body),
            }
            .into(),
            _ => Self::from_status(status, body),
        }
    }

    /// The authentication failure behind this error, if any.
    pub fn auth_error(&self) -> Option<&AuthError> {
        match self {
            ApiError::Auth(e) => Some(e),
            _ => None,
        }
    }

    pub fn is_auth(&self) -> bool {
        self.auth_error().is_some()
    }
}
