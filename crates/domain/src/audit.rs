use serde::{Deserialize, Serialize};

/// Stable audit actions emitted by application use-cases.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditAction {
    /// Emitted when a tenant is provisioned with its initial owner grant.
    TenantProvisioned,
    /// Emitted when a company is created under a tenant.
    CompanyCreated,
    /// Emitted when a company legal name changes.
    CompanyRenamed,
    /// Emitted when a company grant is created.
    GrantCreated,
    /// Emitted when a grant of either tier is revoked.
    GrantRevoked,
}

impl AuditAction {
    /// Returns a stable storage value for this action.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::TenantProvisioned => "tenant.provisioned",
            Self::CompanyCreated => "company.created",
            Self::CompanyRenamed => "company.renamed",
            Self::GrantCreated => "grant.created",
            Self::GrantRevoked => "grant.revoked",
        }
    }
}
