use std::str::FromStr;

use kirana_core::{AppError, AppResult, CompanyId, NonEmptyString, TenantId};
use serde::{Deserialize, Serialize};

/// Indonesian legal entity forms supported for a company.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LegalEntityType {
    /// Perseroan Terbatas (limited liability company).
    Pt,
    /// Commanditaire Vennootschap (limited partnership).
    Cv,
    /// Usaha Dagang (sole trading business).
    Ud,
    /// Cooperative.
    Koperasi,
    /// Individual proprietorship.
    Perorangan,
}

impl LegalEntityType {
    /// Returns a stable storage value for this entity type.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pt => "pt",
            Self::Cv => "cv",
            Self::Ud => "ud",
            Self::Koperasi => "koperasi",
            Self::Perorangan => "perorangan",
        }
    }
}

impl FromStr for LegalEntityType {
    type Err = AppError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "pt" => Ok(Self::Pt),
            "cv" => Ok(Self::Cv),
            "ud" => Ok(Self::Ud),
            "koperasi" => Ok(Self::Koperasi),
            "perorangan" => Ok(Self::Perorangan),
            _ => Err(AppError::Validation(format!(
                "unknown legal entity type '{value}'"
            ))),
        }
    }
}

/// A legal entity belonging to exactly one tenant.
///
/// Companies own all transactional and master data. The owning tenant is
/// fixed at creation; renaming is allowed, re-parenting is not an operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Company {
    id: CompanyId,
    tenant_id: TenantId,
    legal_name: NonEmptyString,
    entity_type: LegalEntityType,
}

impl Company {
    /// Creates a new company under the given tenant.
    pub fn new(
        tenant_id: TenantId,
        legal_name: impl Into<String>,
        entity_type: LegalEntityType,
    ) -> AppResult<Self> {
        Ok(Self {
            id: CompanyId::new(),
            tenant_id,
            legal_name: NonEmptyString::new(legal_name)?,
            entity_type,
        })
    }

    /// Rebuilds a company from already-persisted parts.
    #[must_use]
    pub fn from_parts(
        id: CompanyId,
        tenant_id: TenantId,
        legal_name: NonEmptyString,
        entity_type: LegalEntityType,
    ) -> Self {
        Self {
            id,
            tenant_id,
            legal_name,
            entity_type,
        }
    }

    /// Returns the company identifier.
    #[must_use]
    pub fn id(&self) -> CompanyId {
        self.id
    }

    /// Returns the owning tenant identifier.
    #[must_use]
    pub fn tenant_id(&self) -> TenantId {
        self.tenant_id
    }

    /// Returns the legal name.
    #[must_use]
    pub fn legal_name(&self) -> &NonEmptyString {
        &self.legal_name
    }

    /// Returns the legal entity form.
    #[must_use]
    pub fn entity_type(&self) -> LegalEntityType {
        self.entity_type
    }

    /// Replaces the legal name. The owning tenant never changes.
    pub fn rename(&mut self, legal_name: impl Into<String>) -> AppResult<()> {
        self.legal_name = NonEmptyString::new(legal_name)?;
        Ok(())
    }
}
