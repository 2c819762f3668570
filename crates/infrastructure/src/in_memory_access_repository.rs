use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::Mutex;

use kirana_application::{
    AuditEvent, AuditRepository, DirectoryRepository, GrantRepository, GrantView,
    OnboardingRepository,
};
use kirana_core::{AppError, AppResult, CompanyId, NonEmptyString, TenantId};
use kirana_domain::{
    Company, CompanyGrant, Grant, GrantId, Tenant, TenantGrant, User, UserId,
};

#[derive(Debug, Default)]
struct State {
    users: HashMap<UserId, User>,
    tenants: HashMap<TenantId, Tenant>,
    companies: HashMap<CompanyId, Company>,
    tenant_grants: Vec<TenantGrant>,
    company_grants: Vec<StoredCompanyGrant>,
    audit_events: Vec<AuditEvent>,
}

#[derive(Debug, Clone)]
struct StoredCompanyGrant {
    grant: CompanyGrant,
    created_at: DateTime<Utc>,
    revoked_at: Option<DateTime<Utc>>,
}

/// In-memory implementation of every access-core port.
///
/// All state sits behind one mutex, so the duplicate-grant check and the
/// insert are a single critical section, mirroring the database's unique
/// index under concurrency. Used by tests and local development.
#[derive(Debug, Default)]
pub struct InMemoryAccessRepository {
    state: Mutex<State>,
}

impl InMemoryAccessRepository {
    /// Creates an empty in-memory repository.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the audit events appended so far.
    pub async fn audit_events(&self) -> Vec<AuditEvent> {
        self.state.lock().await.audit_events.clone()
    }
}

#[async_trait]
impl DirectoryRepository for InMemoryAccessRepository {
    async fn find_user(&self, user_id: UserId) -> AppResult<Option<User>> {
        Ok(self.state.lock().await.users.get(&user_id).cloned())
    }

    async fn find_company(&self, company_id: CompanyId) -> AppResult<Option<Company>> {
        Ok(self.state.lock().await.companies.get(&company_id).cloned())
    }

    async fn list_company_ids_for_tenant(
        &self,
        tenant_id: TenantId,
    ) -> AppResult<Vec<CompanyId>> {
        Ok(self
            .state
            .lock()
            .await
            .companies
            .values()
            .filter(|company| company.tenant_id() == tenant_id)
            .map(Company::id)
            .collect())
    }
}

#[async_trait]
impl OnboardingRepository for InMemoryAccessRepository {
    async fn insert_user(&self, user: User) -> AppResult<User> {
        let mut state = self.state.lock().await;

        if state
            .users
            .values()
            .any(|existing| existing.email() == user.email())
        {
            return Err(AppError::Conflict(format!(
                "email '{}' is already registered",
                user.email().as_str()
            )));
        }

        state.users.insert(user.id(), user.clone());
        Ok(user)
    }

    async fn insert_tenant(&self, tenant: Tenant) -> AppResult<Tenant> {
        let mut state = self.state.lock().await;

        if state
            .tenants
            .values()
            .any(|existing| existing.subdomain() == tenant.subdomain())
        {
            return Err(AppError::Conflict(format!(
                "subdomain '{}' is already taken",
                tenant.subdomain().as_str()
            )));
        }

        state.tenants.insert(tenant.id(), tenant.clone());
        Ok(tenant)
    }

    async fn insert_company(&self, company: Company) -> AppResult<Company> {
        let mut state = self.state.lock().await;

        if !state.tenants.contains_key(&company.tenant_id()) {
            return Err(AppError::NotFound(format!(
                "tenant '{}' was not found",
                company.tenant_id()
            )));
        }

        if state.companies.values().any(|existing| {
            existing.tenant_id() == company.tenant_id()
                && existing.legal_name() == company.legal_name()
        }) {
            return Err(AppError::Conflict(format!(
                "company '{}' already exists in tenant '{}'",
                company.legal_name(),
                company.tenant_id()
            )));
        }

        state.companies.insert(company.id(), company.clone());
        Ok(company)
    }

    async fn update_company_name(
        &self,
        company_id: CompanyId,
        legal_name: NonEmptyString,
    ) -> AppResult<()> {
        let mut state = self.state.lock().await;

        let duplicate = state.companies.values().any(|existing| {
            existing.id() != company_id && existing.legal_name() == &legal_name
        });
        if duplicate {
            return Err(AppError::Conflict(format!(
                "legal name '{legal_name}' is already used"
            )));
        }

        let company = state.companies.get_mut(&company_id).ok_or_else(|| {
            AppError::NotFound(format!("company '{company_id}' was not found"))
        })?;
        company.rename(legal_name.as_str())
    }
}

#[async_trait]
impl GrantRepository for InMemoryAccessRepository {
    async fn find_active_tenant_grant(
        &self,
        user_id: UserId,
        tenant_id: TenantId,
    ) -> AppResult<Option<TenantGrant>> {
        Ok(self
            .state
            .lock()
            .await
            .tenant_grants
            .iter()
            .find(|grant| {
                grant.user_id == user_id && grant.tenant_id == tenant_id && grant.is_active
            })
            .cloned())
    }

    async fn find_active_company_grant(
        &self,
        user_id: UserId,
        company_id: CompanyId,
    ) -> AppResult<Option<CompanyGrant>> {
        Ok(self
            .state
            .lock()
            .await
            .company_grants
            .iter()
            .find(|stored| {
                stored.grant.user_id == user_id
                    && stored.grant.company_id == company_id
                    && stored.grant.is_active
            })
            .map(|stored| stored.grant.clone()))
    }

    async fn list_active_tenant_grants(&self, user_id: UserId) -> AppResult<Vec<TenantGrant>> {
        Ok(self
            .state
            .lock()
            .await
            .tenant_grants
            .iter()
            .filter(|grant| grant.user_id == user_id && grant.is_active)
            .cloned()
            .collect())
    }

    async fn list_active_company_grants(&self, user_id: UserId) -> AppResult<Vec<CompanyGrant>> {
        Ok(self
            .state
            .lock()
            .await
            .company_grants
            .iter()
            .filter(|stored| stored.grant.user_id == user_id && stored.grant.is_active)
            .map(|stored| stored.grant.clone())
            .collect())
    }

    async fn insert_tenant_grant(&self, grant: TenantGrant) -> AppResult<TenantGrant> {
        let mut state = self.state.lock().await;

        if state.tenant_grants.iter().any(|existing| {
            existing.user_id == grant.user_id
                && existing.tenant_id == grant.tenant_id
                && existing.is_active
        }) {
            return Err(AppError::DuplicateGrant(format!(
                "user '{}' already holds an active grant for tenant '{}'",
                grant.user_id, grant.tenant_id
            )));
        }

        state.tenant_grants.push(grant.clone());
        Ok(grant)
    }

    async fn insert_company_grant(&self, grant: CompanyGrant) -> AppResult<CompanyGrant> {
        let mut state = self.state.lock().await;

        let owning_tenant = state
            .companies
            .get(&grant.company_id)
            .map(Company::tenant_id)
            .ok_or_else(|| {
                AppError::NotFound(format!("company '{}' was not found", grant.company_id))
            })?;

        if owning_tenant != grant.tenant_id {
            return Err(AppError::Internal(format!(
                "grant tenant '{}' does not match company tenant '{owning_tenant}'",
                grant.tenant_id
            )));
        }

        // Check and insert under the same lock, like the database's
        // partial unique index.
        if state.company_grants.iter().any(|stored| {
            stored.grant.user_id == grant.user_id
                && stored.grant.company_id == grant.company_id
                && stored.grant.is_active
        }) {
            return Err(AppError::DuplicateGrant(format!(
                "user '{}' already holds an active grant for company '{}'",
                grant.user_id, grant.company_id
            )));
        }

        state.company_grants.push(StoredCompanyGrant {
            grant: grant.clone(),
            created_at: Utc::now(),
            revoked_at: None,
        });
        Ok(grant)
    }

    async fn find_grant(&self, grant_id: GrantId) -> AppResult<Option<Grant>> {
        let state = self.state.lock().await;

        if let Some(grant) = state.tenant_grants.iter().find(|grant| grant.id == grant_id) {
            return Ok(Some(Grant::Tenant(grant.clone())));
        }

        Ok(state
            .company_grants
            .iter()
            .find(|stored| stored.grant.id == grant_id)
            .map(|stored| Grant::Company(stored.grant.clone())))
    }

    async fn deactivate_grant(&self, grant_id: GrantId) -> AppResult<()> {
        let mut state = self.state.lock().await;
        let now = Utc::now();

        for grant in state.tenant_grants.iter_mut() {
            if grant.id == grant_id && grant.is_active {
                grant.is_active = false;
            }
        }
        for stored in state.company_grants.iter_mut() {
            if stored.grant.id == grant_id && stored.grant.is_active {
                stored.grant.is_active = false;
                stored.revoked_at = Some(now);
            }
        }

        Ok(())
    }

    async fn list_grants_for_company(&self, company_id: CompanyId) -> AppResult<Vec<GrantView>> {
        let state = self.state.lock().await;

        Ok(state
            .company_grants
            .iter()
            .filter(|stored| stored.grant.company_id == company_id)
            .map(|stored| GrantView {
                grant_id: stored.grant.id.to_string(),
                user_email: state
                    .users
                    .get(&stored.grant.user_id)
                    .map(|user| user.email().as_str().to_owned())
                    .unwrap_or_default(),
                role: stored.grant.role.as_str().to_owned(),
                is_active: stored.grant.is_active,
                granted_at: stored.created_at.to_rfc3339(),
                revoked_at: stored.revoked_at.map(|value| value.to_rfc3339()),
            })
            .collect())
    }
}

#[async_trait]
impl AuditRepository for InMemoryAccessRepository {
    async fn append_event(&self, event: AuditEvent) -> AppResult<()> {
        self.state.lock().await.audit_events.push(event);
        Ok(())
    }
}
