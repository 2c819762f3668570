//! The two-tier grant model.
//!
//! Tier 1 associates a user with a whole tenant, tier 2 with one specific
//! company. Each tier carries its own role enumeration, so an invalid
//! (tier, role) combination is unrepresentable.

use std::str::FromStr;

use kirana_core::{AppError, CompanyId, TenantId};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::company::Company;
use crate::user::UserId;

/// Unique identifier for a grant record of either tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GrantId(Uuid);

impl GrantId {
    /// Creates a new random grant identifier.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Creates a grant identifier from an existing UUID value.
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

impl Default for GrantId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for GrantId {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(formatter, "{}", self.0)
    }
}

/// Roles assignable at tenant scope.
///
/// Tenant roles carry implicit operational rights over every company in the
/// tenant and are never downgraded to a company role.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TenantRole {
    /// Tenant owner, assigned at sign-up.
    Owner,
    /// Delegated tenant administrator.
    TenantAdmin,
}

impl TenantRole {
    /// Returns a stable storage value for this role.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Owner => "owner",
            Self::TenantAdmin => "tenant_admin",
        }
    }

    /// Returns all tenant-scope roles.
    #[must_use]
    pub fn all() -> &'static [Self] {
        const ALL: &[TenantRole] = &[TenantRole::Owner, TenantRole::TenantAdmin];

        ALL
    }
}

impl FromStr for TenantRole {
    type Err = AppError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "owner" => Ok(Self::Owner),
            "tenant_admin" => Ok(Self::TenantAdmin),
            _ => Err(AppError::InvalidRole(format!(
                "unknown tenant role value '{value}'"
            ))),
        }
    }
}

/// Roles assignable at company scope.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CompanyRole {
    /// Full operational rights within one company.
    Admin,
    /// Finance documents and postings.
    Finance,
    /// Sales orders and customer records.
    Sales,
    /// Inventory and deliveries.
    Warehouse,
    /// Read-mostly general staff.
    Staff,
}

impl CompanyRole {
    /// Returns a stable storage value for this role.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Admin => "admin",
            Self::Finance => "finance",
            Self::Sales => "sales",
            Self::Warehouse => "warehouse",
            Self::Staff => "staff",
        }
    }

    /// Returns all company-scope roles.
    #[must_use]
    pub fn all() -> &'static [Self] {
        const ALL: &[CompanyRole] = &[
            CompanyRole::Admin,
            CompanyRole::Finance,
            CompanyRole::Sales,
            CompanyRole::Warehouse,
            CompanyRole::Staff,
        ];

        ALL
    }
}

impl FromStr for CompanyRole {
    type Err = AppError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "admin" => Ok(Self::Admin),
            "finance" => Ok(Self::Finance),
            "sales" => Ok(Self::Sales),
            "warehouse" => Ok(Self::Warehouse),
            "staff" => Ok(Self::Staff),
            _ => Err(AppError::InvalidRole(format!(
                "unknown company role value '{value}'"
            ))),
        }
    }
}

/// The tier a grant was resolved from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GrantTier {
    /// Tenant-wide grant covering every company in the tenant.
    Tenant,
    /// Grant scoped to one company.
    Company,
}

impl GrantTier {
    /// Returns a stable storage value for this tier.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Tenant => "tenant",
            Self::Company => "company",
        }
    }
}

/// A role tagged with the tier it belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GrantRole {
    /// A tenant-scope role.
    Tenant(TenantRole),
    /// A company-scope role.
    Company(CompanyRole),
}

impl GrantRole {
    /// Returns the tier this role belongs to.
    #[must_use]
    pub fn tier(&self) -> GrantTier {
        match self {
            Self::Tenant(_) => GrantTier::Tenant,
            Self::Company(_) => GrantTier::Company,
        }
    }

    /// Returns a stable storage value for this role.
    ///
    /// Tenant and company role values never collide, so the union parses
    /// back unambiguously.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Tenant(role) => role.as_str(),
            Self::Company(role) => role.as_str(),
        }
    }
}

impl FromStr for GrantRole {
    type Err = AppError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        if let Ok(role) = TenantRole::from_str(value) {
            return Ok(Self::Tenant(role));
        }

        if let Ok(role) = CompanyRole::from_str(value) {
            return Ok(Self::Company(role));
        }

        Err(AppError::InvalidRole(format!(
            "unknown role value '{value}'"
        )))
    }
}

/// Tier-1 grant: a user holding a tenant role over a whole tenant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TenantGrant {
    /// Stable grant identifier.
    pub id: GrantId,
    /// Tenant the grant covers.
    pub tenant_id: TenantId,
    /// Grantee.
    pub user_id: UserId,
    /// Tenant-scope role.
    pub role: TenantRole,
    /// Active flag; revocation flips this, rows are never deleted.
    pub is_active: bool,
}

impl TenantGrant {
    /// Creates a new active tenant grant.
    #[must_use]
    pub fn new(tenant_id: TenantId, user_id: UserId, role: TenantRole) -> Self {
        Self {
            id: GrantId::new(),
            tenant_id,
            user_id,
            role,
            is_active: true,
        }
    }
}

/// Tier-2 grant: a user holding a company role over one specific company.
///
/// The owning tenant is denormalized onto the grant for lookup efficiency
/// and must always equal the tenant of the named company.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompanyGrant {
    /// Stable grant identifier.
    pub id: GrantId,
    /// Tenant owning the company, copied from the company at creation.
    pub tenant_id: TenantId,
    /// Company the grant covers.
    pub company_id: CompanyId,
    /// Grantee.
    pub user_id: UserId,
    /// Company-scope role.
    pub role: CompanyRole,
    /// Active flag; revocation flips this, rows are never deleted.
    pub is_active: bool,
}

impl CompanyGrant {
    /// Creates a new active company grant for the given company.
    ///
    /// Copying the tenant from the company keeps the denormalized reference
    /// consistent; there is no constructor that accepts a free tenant id.
    #[must_use]
    pub fn for_company(company: &Company, user_id: UserId, role: CompanyRole) -> Self {
        Self {
            id: GrantId::new(),
            tenant_id: company.tenant_id(),
            company_id: company.id(),
            user_id,
            role,
            is_active: true,
        }
    }
}

/// A grant of either tier, for tier-agnostic lookup and revocation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Grant {
    /// Tier-1 tenant grant.
    Tenant(TenantGrant),
    /// Tier-2 company grant.
    Company(CompanyGrant),
}

impl Grant {
    /// Returns the grant identifier.
    #[must_use]
    pub fn id(&self) -> GrantId {
        match self {
            Self::Tenant(grant) => grant.id,
            Self::Company(grant) => grant.id,
        }
    }

    /// Returns the tenant the grant belongs to.
    #[must_use]
    pub fn tenant_id(&self) -> TenantId {
        match self {
            Self::Tenant(grant) => grant.tenant_id,
            Self::Company(grant) => grant.tenant_id,
        }
    }

    /// Returns the grantee.
    #[must_use]
    pub fn user_id(&self) -> UserId {
        match self {
            Self::Tenant(grant) => grant.user_id,
            Self::Company(grant) => grant.user_id,
        }
    }

    /// Returns whether the grant is still active.
    #[must_use]
    pub fn is_active(&self) -> bool {
        match self {
            Self::Tenant(grant) => grant.is_active,
            Self::Company(grant) => grant.is_active,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use kirana_core::TenantId;

    use crate::company::{Company, LegalEntityType};
    use crate::user::UserId;

    use super::{CompanyGrant, CompanyRole, GrantRole, GrantTier, TenantRole};

    #[test]
    fn grant_role_roundtrips_all_storage_values() {
        for role in TenantRole::all() {
            assert_eq!(
                GrantRole::from_str(role.as_str()).ok(),
                Some(GrantRole::Tenant(*role))
            );
        }
        for role in CompanyRole::all() {
            assert_eq!(
                GrantRole::from_str(role.as_str()).ok(),
                Some(GrantRole::Company(*role))
            );
        }
    }

    #[test]
    fn tenant_and_company_role_values_never_collide() {
        for tenant_role in TenantRole::all() {
            assert!(CompanyRole::from_str(tenant_role.as_str()).is_err());
        }
        for company_role in CompanyRole::all() {
            assert!(TenantRole::from_str(company_role.as_str()).is_err());
        }
    }

    #[test]
    fn grant_role_reports_its_tier() {
        assert_eq!(
            GrantRole::Tenant(TenantRole::Owner).tier(),
            GrantTier::Tenant
        );
        assert_eq!(
            GrantRole::Company(CompanyRole::Finance).tier(),
            GrantTier::Company
        );
    }

    #[test]
    fn company_grant_copies_tenant_from_company() {
        let tenant_id = TenantId::new();
        let company = match Company::new(tenant_id, "PT Sumber Rejeki", LegalEntityType::Pt) {
            Ok(company) => company,
            Err(error) => panic!("company should be valid: {error}"),
        };
        let grant = CompanyGrant::for_company(&company, UserId::new(), CompanyRole::Warehouse);
        assert_eq!(grant.tenant_id, tenant_id);
        assert_eq!(grant.company_id, company.id());
        assert!(grant.is_active);
    }

    mod properties {
        use std::str::FromStr;

        use proptest::prelude::*;

        use super::super::GrantRole;

        const KNOWN_ROLE_VALUES: &[&str] = &[
            "owner",
            "tenant_admin",
            "admin",
            "finance",
            "sales",
            "warehouse",
            "staff",
        ];

        proptest! {
            #[test]
            fn only_known_values_parse(value in "\\PC{0,24}") {
                let parsed = GrantRole::from_str(value.as_str());
                prop_assert_eq!(
                    parsed.is_ok(),
                    KNOWN_ROLE_VALUES.contains(&value.as_str())
                );
            }

            #[test]
            fn parsed_roles_roundtrip(value in proptest::sample::select(KNOWN_ROLE_VALUES)) {
                let parsed = GrantRole::from_str(value);
                prop_assert!(parsed.is_ok());
                if let Ok(role) = parsed {
                    prop_assert_eq!(role.as_str(), value);
                }
            }
        }
    }
}
