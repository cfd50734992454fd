use thiserror::Error;

use crate::domain::{CredentialError, Rejection};

#[derive(Error, Debug, Clone, PartialEq)]
pub enum LedgerError {
    #[error("Invalid operation: {0}")]
    InvalidOperation(#[from] Rejection),

    #[error("Account not found: {0}")]
    AccountNotFound(String),

    #[error("User not found: {0}")]
    UserNotFound(String),

    #[error("User already exists: {0}")]
    UserAlreadyExists(String),

    #[error("Invalid username: {0}")]
    InvalidUsername(String),

    #[error("Invalid password: {0}")]
    InvalidPassword(String),

    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("Not logged in")]
    NotLoggedIn,

    #[error("Credential storage error: {0}")]
    Credential(String),
}

impl LedgerError {
    /// The rejection behind an `InvalidOperation`, if that's what this is
    pub fn rejection(&self) -> Option<&Rejection> {
        match self {
            LedgerError::InvalidOperation(rejection) => Some(rejection),
            _ => None,
        }
    }
}

impl From<CredentialError> for LedgerError {
    fn from(err: CredentialError) -> Self {
        match err {
            CredentialError::EmptyUsername
            | CredentialError::UsernameTooShort(_)
            | CredentialError::UsernameInvalidCharacters(_) => {
                LedgerError::InvalidUsername(err.to_string())
            }
            CredentialError::PasswordTooShort => LedgerError::InvalidPassword(err.to_string()),
            CredentialError::Hashing(msg) => LedgerError::Credential(msg),
        }
    }
}
