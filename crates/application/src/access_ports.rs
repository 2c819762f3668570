use async_trait::async_trait;
use kirana_core::{AppResult, CompanyId, TenantId};
use kirana_domain::{Company, CompanyGrant, Grant, GrantId, TenantGrant, User, UserId};

/// Grant row projection for administrative listings.
///
/// Revoked rows are included: the who-had-access-when history lives in
/// retained rows, not in a separate log.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct GrantView {
    /// Stable grant identifier.
    pub grant_id: String,
    /// Grantee email.
    pub user_email: String,
    /// Stable role value.
    pub role: String,
    /// Whether the grant still resolves.
    pub is_active: bool,
    /// Grant timestamp in RFC3339.
    pub granted_at: String,
    /// Revocation timestamp in RFC3339, if revoked.
    pub revoked_at: Option<String>,
}

/// Repository port for tenant, company, and user lookups.
#[async_trait]
pub trait DirectoryRepository: Send + Sync {
    /// Finds a user by identifier.
    async fn find_user(&self, user_id: UserId) -> AppResult<Option<User>>;

    /// Finds a company by identifier.
    async fn find_company(&self, company_id: CompanyId) -> AppResult<Option<Company>>;

    /// Lists every company currently belonging to a tenant.
    async fn list_company_ids_for_tenant(&self, tenant_id: TenantId)
    -> AppResult<Vec<CompanyId>>;
}

/// Repository port for grant lookups and writes.
#[async_trait]
pub trait GrantRepository: Send + Sync {
    /// Finds the active tenant grant of a user for one tenant, if any.
    async fn find_active_tenant_grant(
        &self,
        user_id: UserId,
        tenant_id: TenantId,
    ) -> AppResult<Option<TenantGrant>>;

    /// Finds the active company grant of a user for one company, if any.
    async fn find_active_company_grant(
        &self,
        user_id: UserId,
        company_id: CompanyId,
    ) -> AppResult<Option<CompanyGrant>>;

    /// Lists every active tenant grant held by a user.
    async fn list_active_tenant_grants(&self, user_id: UserId) -> AppResult<Vec<TenantGrant>>;

    /// Lists every active company grant held by a user.
    async fn list_active_company_grants(&self, user_id: UserId) -> AppResult<Vec<CompanyGrant>>;

    /// Persists a new tenant grant.
    async fn insert_tenant_grant(&self, grant: TenantGrant) -> AppResult<TenantGrant>;

    /// Persists a new company grant.
    ///
    /// Must be atomic with respect to the active-duplicate check: when an
    /// active grant for the same (user, company) pair already exists the
    /// insert fails with `AppError::DuplicateGrant`, and under concurrent
    /// inserts at most one may succeed. The storage-level uniqueness guard
    /// is authoritative; callers may pre-check only as an optimization.
    async fn insert_company_grant(&self, grant: CompanyGrant) -> AppResult<CompanyGrant>;

    /// Finds a grant of either tier by identifier.
    async fn find_grant(&self, grant_id: GrantId) -> AppResult<Option<Grant>>;

    /// Marks a grant inactive. A no-op for already-inactive grants; rows
    /// are never deleted.
    async fn deactivate_grant(&self, grant_id: GrantId) -> AppResult<()>;

    /// Lists all company grants (active and revoked) for one company.
    async fn list_grants_for_company(&self, company_id: CompanyId) -> AppResult<Vec<GrantView>>;
}
