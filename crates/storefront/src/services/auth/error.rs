//! Authentication error types.

use thiserror::Error;

use crate::db::RepositoryError;

/// Errors that can occur during authentication operations.
#[derive(Debug, Error)]
pub enum AuthError {
    /// Invalid email format.
    #[error("invalid email: {0}")]
    InvalidEmail(#[from] bazaar_core::EmailError),

    /// Invalid credentials (wrong password or user not found).
    #[error("invalid credentials")]
    InvalidCredentials,

    /// User already exists.
    #[error("user already exists")]
    UserAlreadyExists,

    /// Password too weak or invalid.
    #[error("password validation failed: {0}")]
    WeakPassword(String),

    /// Password and confirmation differ.
    #[error("passwords do not match")]
    PasswordMismatch,

    /// Repository/database error.
    #[error("database error: {0}")]
    Repository(#[from] RepositoryError),

    /// Password hashing error.
    #[error("password hashing error")]
    PasswordHash,
}

impl AuthError {
    /// Message safe to show on the login or signup form.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::InvalidEmail(_) => "Please enter a valid email address.".to_owned(),
            Self::InvalidCredentials => "Invalid email or password.".to_owned(),
            Self::UserAlreadyExists => "An account with this email already exists.".to_owned(),
            Self::WeakPassword(reason) => format!("Password too weak: {reason}."),
            Self::PasswordMismatch => "Passwords do not match.".to_owned(),
            Self::Repository(_) | Self::PasswordHash => {
                "Something went wrong. Please try again.".to_owned()
            }
        }
    }
}
