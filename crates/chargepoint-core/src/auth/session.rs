use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Session token issued by the vendor at login.
///
/// The value is sent as the `coulomb_sess` cookie; the user id is required
/// by the device endpoints.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionToken {
    value: String,
    user_id: i64,
    issued_at: DateTime<Utc>,
}

impl SessionToken {
    pub fn new(value: impl Into<String>, user_id: i64) -> Self {
        Self {
            value: value.into(),
            user_id,
            issued_at: Utc::now(),
        }
    }

    pub fn value(&self) -> &str {
        &self.value
    }

    pub fn user_id(&self) -> i64 {
        self.user_id
    }

    pub fn issued_at(&self) -> DateTime<Utc> {
        self.issued_at
    }
}

impl fmt::Debug for SessionToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionToken")
            .field("value", &"<redacted>")
            .field("user_id", &self.user_id)
            .field("issued_at", &self.issued_at)
            .finish()
    }
}

/// Holds at most one session token.
#[derive(Debug, Default)]
pub struct Session {
    token: Option<SessionToken>,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start from a token the host saved from an earlier run
    pub fn with_token(token: SessionToken) -> Self {
        Self { token: Some(token) }
    }

    /// Replace the held token
    pub fn update(&mut self, token: SessionToken) {
        self.token = Some(token);
    }

    /// Drop the held token so the next use re-authenticates
    pub fn invalidate(&mut self) -> Option<SessionToken> {
        self.token.take()
    }

    pub fn token(&self) -> Option<&SessionToken> {
        self.token.as_ref()
    }

    pub fn is_valid(&self) -> bool {
        self.token.is_some()
    }
}
