//! User domain types.
//!
//! Users are global principals: they are not owned by any tenant and gain
//! tenant or company access exclusively through grants.

use std::str::FromStr;

use kirana_core::{AppError, AppResult};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique identifier for a user record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct UserId(Uuid);

impl UserId {
    /// Creates a new random user identifier.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Creates a user identifier from an existing UUID value.
    #[must_use]
    pub fn from_uuid(value: Uuid) -> Self {
        Self(value)
    }

    /// Returns the underlying UUID value.
    #[must_use]
    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl Default for UserId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for UserId {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(formatter, "{}", self.0)
    }
}

/// Validated email address.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EmailAddress(String);

impl EmailAddress {
    /// Creates a validated email address.
    ///
    /// Performs structural validation only: non-empty, exactly one `@`,
    /// non-empty local part, domain with at least one `.`. Stored lowercase.
    pub fn new(value: impl Into<String>) -> AppResult<Self> {
        let value = value.into();
        let trimmed = value.trim().to_lowercase();

        if trimmed.is_empty() {
            return Err(AppError::Validation(
                "email address must not be empty".to_owned(),
            ));
        }

        let parts: Vec<&str> = trimmed.splitn(2, '@').collect();
        if parts.len() != 2 {
            return Err(AppError::Validation(
                "email address must contain exactly one '@'".to_owned(),
            ));
        }

        let local = parts[0];
        let domain = parts[1];

        if local.is_empty() {
            return Err(AppError::Validation(
                "email local part must not be empty".to_owned(),
            ));
        }

        if domain.is_empty() || !domain.contains('.') || domain.contains('@') {
            return Err(AppError::Validation(format!(
                "email domain '{domain}' is not valid"
            )));
        }

        Ok(Self(trimmed))
    }

    /// Returns the underlying string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl FromStr for EmailAddress {
    type Err = AppError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Self::new(value)
    }
}

/// A global principal identified by email.
///
/// The credential hash is opaque here; password verification belongs to the
/// authentication layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    id: UserId,
    email: EmailAddress,
    password_hash: String,
    is_active: bool,
}

impl User {
    /// Creates a new active user.
    #[must_use]
    pub fn new(email: EmailAddress, password_hash: impl Into<String>) -> Self {
        Self {
            id: UserId::new(),
            email,
            password_hash: password_hash.into(),
            is_active: true,
        }
    }

    /// Rebuilds a user from already-persisted parts.
    #[must_use]
    pub fn from_parts(
        id: UserId,
        email: EmailAddress,
        password_hash: impl Into<String>,
        is_active: bool,
    ) -> Self {
        Self {
            id,
            email,
            password_hash: password_hash.into(),
            is_active,
        }
    }

    /// Returns the user identifier.
    #[must_use]
    pub fn id(&self) -> UserId {
        self.id
    }

    /// Returns the email address.
    #[must_use]
    pub fn email(&self) -> &EmailAddress {
        &self.email
    }

    /// Returns the opaque credential hash.
    #[must_use]
    pub fn password_hash(&self) -> &str {
        self.password_hash.as_str()
    }

    /// Returns whether the user may act as a principal.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.is_active
    }

    /// Deactivates the user. One-way; reactivation is not modeled.
    pub fn deactivate(&mut self) {
        self.is_active = false;
    }
}
