//! Token validation port.

/// Token validation errors
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("Missing credentials")]
    MissingCredentials,

    #[error("Invalid token: {0}")]
    InvalidToken(String),

    #[error("Invalid user id: {0}")]
    InvalidUserId(String),
}

/// Resolves a bearer token to the authenticated user id.
#[cfg_attr(test, mockall::automock)]
pub trait TokenValidator: Send + Sync {
    fn validate(&self, token: &str) -> Result<i64, AuthError>;
}
