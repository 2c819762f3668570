use kirana_core::{AppError, AppResult, NonEmptyString, TenantId};
use serde::{Deserialize, Serialize};

/// Maximum length for a tenant subdomain label.
pub const SUBDOMAIN_MAX_LENGTH: usize = 63;

/// Validated tenant subdomain label.
///
/// Lowercase ASCII alphanumerics with interior hyphens, as a single DNS
/// label. Stored lowercase regardless of input casing.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Subdomain(String);

impl Subdomain {
    /// Creates a validated subdomain label.
    pub fn new(value: impl Into<String>) -> AppResult<Self> {
        let value = value.into().trim().to_lowercase();

        if value.is_empty() {
            return Err(AppError::Validation(
                "subdomain must not be empty".to_owned(),
            ));
        }

        if value.len() > SUBDOMAIN_MAX_LENGTH {
            return Err(AppError::Validation(format!(
                "subdomain must be at most {SUBDOMAIN_MAX_LENGTH} characters"
            )));
        }

        if value.starts_with('-') || value.ends_with('-') {
            return Err(AppError::Validation(
                "subdomain must not start or end with a hyphen".to_owned(),
            ));
        }

        if !value.chars().all(|character| {
            character.is_ascii_lowercase() || character.is_ascii_digit() || character == '-'
        }) {
            return Err(AppError::Validation(format!(
                "subdomain '{value}' contains characters outside [a-z0-9-]"
            )));
        }

        Ok(Self(value))
    }

    /// Returns the underlying label.
    #[must_use]
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

/// Top-level billing and subscription unit owning zero or more companies.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tenant {
    id: TenantId,
    name: NonEmptyString,
    subdomain: Subdomain,
}

impl Tenant {
    /// Creates a new tenant with validated fields and a fresh identifier.
    pub fn new(name: impl Into<String>, subdomain: impl Into<String>) -> AppResult<Self> {
        Ok(Self {
            id: TenantId::new(),
            name: NonEmptyString::new(name)?,
            subdomain: Subdomain::new(subdomain)?,
        })
    }

    /// Rebuilds a tenant from already-persisted parts.
    #[must_use]
    pub fn from_parts(id: TenantId, name: NonEmptyString, subdomain: Subdomain) -> Self {
        Self {
            id,
            name,
            subdomain,
        }
    }

    /// Returns the tenant identifier.
    #[must_use]
    pub fn id(&self) -> TenantId {
        self.id
    }

    /// Returns the display name.
    #[must_use]
    pub fn name(&self) -> &NonEmptyString {
        &self.name
    }

    /// Returns the subdomain label.
    #[must_use]
    pub fn subdomain(&self) -> &Subdomain {
        &self.subdomain
    }

    /// Replaces the display name. Identity is immutable; only the name moves.
    pub fn rename(&mut self, name: impl Into<String>) -> AppResult<()> {
        self.name = NonEmptyString::new(name)?;
        Ok(())
    }
}
