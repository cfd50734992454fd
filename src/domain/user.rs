use argon2::Argon2;
use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use chrono::{DateTime, Utc};
use rand_core::OsRng;

pub const MIN_USERNAME_LEN: usize = 3;
pub const MIN_PASSWORD_LEN: usize = 4;

/// A ledger user. Only a salted Argon2 hash of the password is kept.
#[derive(Debug, Clone)]
pub struct User {
    username: String,
    password_hash: String,
    created_at: DateTime<Utc>,
    last_login: Option<DateTime<Utc>>,
}

impl User {
    pub fn new(username: impl Into<String>, password: &str) -> Result<Self, CredentialError> {
        let username = username.into();
        validate_username(&username)?;
        validate_password(password)?;

        Ok(Self {
            username,
            password_hash: hash_password(password)?,
            created_at: Utc::now(),
            last_login: None,
        })
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn last_login(&self) -> Option<DateTime<Utc>> {
        self.last_login
    }

    pub fn verify_password(&self, password: &str) -> bool {
        match PasswordHash::new(&self.password_hash) {
            Ok(parsed) => Argon2::default()
                .verify_password(password.as_bytes(), &parsed)
                .is_ok(),
            Err(_) => false,
        }
    }

    pub fn update_password(&mut self, new_password: &str) -> Result<(), CredentialError> {
        validate_password(new_password)?;
        self.password_hash = hash_password(new_password)?;
        Ok(())
    }

    pub fn record_login(&mut self) {
        self.last_login = Some(Utc::now());
    }
}

impl std::fmt::Display for User {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "User[{}] created {}",
            self.username,
            self.created_at.format("%Y-%m-%d %H:%M:%S")
        )
    }
}

fn hash_password(password: &str) -> Result<String, CredentialError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| CredentialError::Hashing(e.to_string()))
}

/// Usernames are at least three characters of ASCII letters, digits or `_`.
pub fn validate_username(username: &str) -> Result<(), CredentialError> {
    if username.trim().is_empty() {
        return Err(CredentialError::EmptyUsername);
    }
    if username.chars().count() < MIN_USERNAME_LEN {
        return Err(CredentialError::UsernameTooShort(username.to_string()));
    }
    if !username
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '_')
    {
        return Err(CredentialError::UsernameInvalidCharacters(
            username.to_string(),
        ));
    }
    Ok(())
}

pub fn validate_password(password: &str) -> Result<(), CredentialError> {
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(CredentialError::PasswordTooShort);
    }
    Ok(())
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CredentialError {
    EmptyUsername,
    UsernameTooShort(String),
    UsernameInvalidCharacters(String),
    PasswordTooShort,
    Hashing(String),
}

impl std::fmt::Display for CredentialError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CredentialError::EmptyUsername => write!(f, "username cannot be empty"),
            CredentialError::UsernameTooShort(name) => write!(
                f,
                "username '{}' must be at least {} characters",
                name, MIN_USERNAME_LEN
            ),
            CredentialError::UsernameInvalidCharacters(name) => write!(
                f,
                "username '{}' may only contain letters, digits and underscores",
                name
            ),
            CredentialError::PasswordTooShort => write!(
                f,
                "password must be at least {} characters",
                MIN_PASSWORD_LEN
            ),
            CredentialError::Hashing(msg) => write!(f, "password hashing failed: {}", msg),
        }
    }
}

impl std::error::Error for CredentialError {}
