use std::fmt;

use serde::{Deserialize, Serialize};

use crate::api::AuthError;

/// Username and password for the vendor account.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl Credentials {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }

    /// Reject blank usernames or passwords before anything goes over the wire.
    pub fn validate(&self) -> Result<(), AuthError> {
        if self.username.trim().is_empty() || self.password.is_empty() {
            return Err(AuthError::EmptyCredentials);
        }
        Ok(())
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate() {
        assert!(Credentials::new("user@example.com", "pw").validate().is_ok());
        assert_eq!(
            Credentials::new("", "pw").validate(),
            Err(AuthError::EmptyCredentials)
        );
        assert_eq!(
            Credentials::new("   ", "pw").validate(),
            Err(AuthError::EmptyCredentials)
        );
        assert_eq!(
            Credentials::new("user@example.com", "").validate(),
            Err(AuthError::EmptyCredentials)
        );
    }

    #[test]
    fn test_debug_redacts_password() {
        let debug = format!("{:?}", Credentials::new("user@example.com", "hunter2"));
        assert!(debug.contains("user@example.com"));
        assert!(!debug.contains("hunter2"));
    }
}
