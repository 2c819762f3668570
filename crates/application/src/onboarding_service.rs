use std::sync::Arc;

use async_trait::async_trait;
use kirana_core::{AppError, AppResult, CompanyId, NonEmptyString, TenantId};
use kirana_domain::{
    AuditAction, Company, EmailAddress, LegalEntityType, Tenant, TenantGrant, TenantRole, User,
    UserId,
};

use crate::{AccessScopeService, AuditEvent, AuditRepository, DirectoryRepository, GrantRepository};

/// Repository port for tenant, company, and user writes.
#[async_trait]
pub trait OnboardingRepository: Send + Sync {
    /// Persists a new user. Duplicate emails fail with `Conflict`.
    async fn insert_user(&self, user: User) -> AppResult<User>;

    /// Persists a new tenant. Duplicate subdomains fail with `Conflict`.
    async fn insert_tenant(&self, tenant: Tenant) -> AppResult<Tenant>;

    /// Persists a new company. A duplicate legal name within the tenant
    /// fails with `Conflict`.
    async fn insert_company(&self, company: Company) -> AppResult<Company>;

    /// Replaces a company's legal name. The owning tenant never changes.
    async fn update_company_name(
        &self,
        company_id: CompanyId,
        legal_name: NonEmptyString,
    ) -> AppResult<()>;
}

/// Application service for sign-up and tenant/company onboarding.
#[derive(Clone)]
pub struct OnboardingService {
    access: AccessScopeService,
    directory: Arc<dyn DirectoryRepository>,
    repository: Arc<dyn OnboardingRepository>,
    grants: Arc<dyn GrantRepository>,
    audit_repository: Arc<dyn AuditRepository>,
}

impl OnboardingService {
    /// Creates a new service from required dependencies.
    #[must_use]
    pub fn new(
        access: AccessScopeService,
        directory: Arc<dyn DirectoryRepository>,
        repository: Arc<dyn OnboardingRepository>,
        grants: Arc<dyn GrantRepository>,
        audit_repository: Arc<dyn AuditRepository>,
    ) -> Self {
        Self {
            access,
            directory,
            repository,
            grants,
            audit_repository,
        }
    }

    /// Registers a new global user.
    ///
    /// The credential hash arrives pre-computed; password handling belongs
    /// to the authentication layer.
    pub async fn register_user(
        &self,
        email: EmailAddress,
        password_hash: impl Into<String> + Send,
    ) -> AppResult<User> {
        self.repository
            .insert_user(User::new(email, password_hash))
            .await
    }

    /// Provisions a tenant at sign-up with its initial owner grant.
    pub async fn provision_tenant(
        &self,
        owner_id: UserId,
        name: impl Into<String> + Send,
        subdomain: impl Into<String> + Send,
    ) -> AppResult<(Tenant, TenantGrant)> {
        let owner = self
            .directory
            .find_user(owner_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("user '{owner_id}' was not found")))?;

        if !owner.is_active() {
            return Err(AppError::InactiveUser(format!(
                "user '{owner_id}' is deactivated"
            )));
        }

        let tenant = self.repository.insert_tenant(Tenant::new(name, subdomain)?).await?;
        let grant = self
            .grants
            .insert_tenant_grant(TenantGrant::new(tenant.id(), owner_id, TenantRole::Owner))
            .await?;

        self.audit_repository
            .append_event(AuditEvent {
                tenant_id: tenant.id(),
                company_id: None,
                actor: owner_id,
                action: AuditAction::TenantProvisioned,
                resource_id: tenant.id().to_string(),
                detail: Some(format!(
                    "provisioned tenant '{}' with owner '{owner_id}'",
                    tenant.subdomain().as_str()
                )),
            })
            .await?;

        Ok((tenant, grant))
    }

    /// Creates a company under a tenant.
    pub async fn create_company(
        &self,
        actor_id: UserId,
        tenant_id: TenantId,
        legal_name: impl Into<String> + Send,
        entity_type: LegalEntityType,
    ) -> AppResult<Company> {
        self.access
            .require_tenant_authority(actor_id, tenant_id)
            .await?;

        let company = self
            .repository
            .insert_company(Company::new(tenant_id, legal_name, entity_type)?)
            .await?;

        self.audit_repository
            .append_event(AuditEvent {
                tenant_id,
                company_id: Some(company.id()),
                actor: actor_id,
                action: AuditAction::CompanyCreated,
                resource_id: company.id().to_string(),
                detail: Some(format!("created company '{}'", company.legal_name())),
            })
            .await?;

        Ok(company)
    }

    /// Renames a company. Re-parenting does not exist as an operation.
    pub async fn rename_company(
        &self,
        actor_id: UserId,
        company_id: CompanyId,
        legal_name: impl Into<String> + Send,
    ) -> AppResult<()> {
        let company = self
            .directory
            .find_company(company_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("company '{company_id}' was not found")))?;

        self.access
            .require_tenant_authority(actor_id, company.tenant_id())
            .await?;

        let legal_name = NonEmptyString::new(legal_name)?;
        self.repository
            .update_company_name(company_id, legal_name.clone())
            .await?;

        self.audit_repository
            .append_event(AuditEvent {
                tenant_id: company.tenant_id(),
                company_id: Some(company_id),
                actor: actor_id,
                action: AuditAction::CompanyRenamed,
                resource_id: company_id.to_string(),
                detail: Some(format!(
                    "renamed company '{}' to '{legal_name}'",
                    company.legal_name()
                )),
            })
            .await
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::sync::Arc;

    use async_trait::async_trait;
    use kirana_core::{AppError, AppResult, CompanyId, NonEmptyString, TenantId};
    use kirana_domain::{
        Company, CompanyGrant, EmailAddress, Grant, GrantId, LegalEntityType, Tenant, TenantGrant,
        User, UserId,
    };
    use tokio::sync::Mutex;

    use crate::{
        AccessScopeService, AuditEvent, AuditRepository, DirectoryRepository, GrantRepository,
        GrantView,
    };

    use super::{OnboardingRepository, OnboardingService};

    /// One shared fake covering directory reads, onboarding writes, and
    /// grant storage, so tests observe writes through the same state they
    /// resolve against.
    #[derive(Default)]
    struct FakeStore {
        users: Mutex<HashMap<UserId, User>>,
        tenants: Mutex<HashMap<TenantId, Tenant>>,
        companies: Mutex<HashMap<CompanyId, Company>>,
        tenant_grants: Mutex<Vec<TenantGrant>>,
        company_grants: Mutex<Vec<CompanyGrant>>,
    }

    #[async_trait]
    impl DirectoryRepository for FakeStore {
        async fn find_user(&self, user_id: UserId) -> AppResult<Option<User>> {
            Ok(self.users.lock().await.get(&user_id).cloned())
        }

        async fn find_company(&self, company_id: CompanyId) -> AppResult<Option<Company>> {
            Ok(self.companies.lock().await.get(&company_id).cloned())
        }

        async fn list_company_ids_for_tenant(
            &self,
            tenant_id: TenantId,
        ) -> AppResult<Vec<CompanyId>> {
            Ok(self
                .companies
                .lock()
                .await
                .values()
                .filter(|company| company.tenant_id() == tenant_id)
                .map(Company::id)
                .collect())
        }
    }

    #[async_trait]
    impl OnboardingRepository for FakeStore {
        async fn insert_user(&self, user: User) -> AppResult<User> {
            let mut users = self.users.lock().await;
            if users.values().any(|existing| existing.email() == user.email()) {
                return Err(AppError::Conflict(format!(
                    "email '{}' is already registered",
                    user.email().as_str()
                )));
            }
            users.insert(user.id(), user.clone());
            Ok(user)
        }

        async fn insert_tenant(&self, tenant: Tenant) -> AppResult<Tenant> {
            let mut tenants = self.tenants.lock().await;
            if tenants
                .values()
                .any(|existing| existing.subdomain() == tenant.subdomain())
            {
                return Err(AppError::Conflict(format!(
                    "subdomain '{}' is already taken",
                    tenant.subdomain().as_str()
                )));
            }
            tenants.insert(tenant.id(), tenant.clone());
            Ok(tenant)
        }

        async fn insert_company(&self, company: Company) -> AppResult<Company> {
            let mut companies = self.companies.lock().await;
            if companies.values().any(|existing| {
                existing.tenant_id() == company.tenant_id()
                    && existing.legal_name() == company.legal_name()
            }) {
                return Err(AppError::Conflict(format!(
                    "company '{}' already exists in tenant '{}'",
                    company.legal_name(),
                    company.tenant_id()
                )));
            }
            companies.insert(company.id(), company.clone());
            Ok(company)
        }

        async fn update_company_name(
            &self,
            company_id: CompanyId,
            legal_name: NonEmptyString,
        ) -> AppResult<()> {
            let mut companies = self.companies.lock().await;
            let company = companies.get_mut(&company_id).ok_or_else(|| {
                AppError::NotFound(format!("company '{company_id}' was not found"))
            })?;
            company.rename(legal_name.as_str())?;
            Ok(())
        }
    }

    #[async_trait]
    impl GrantRepository for FakeStore {
        async fn find_active_tenant_grant(
            &self,
            user_id: UserId,
            tenant_id: TenantId,
        ) -> AppResult<Option<TenantGrant>> {
            Ok(self
                .tenant_grants
                .lock()
                .await
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
                .company_grants
                .lock()
                .await
                .iter()
                .find(|grant| {
                    grant.user_id == user_id && grant.company_id == company_id && grant.is_active
                })
                .cloned())
        }

        async fn list_active_tenant_grants(&self, user_id: UserId) -> AppResult<Vec<TenantGrant>> {
            Ok(self
                .tenant_grants
                .lock()
                .await
                .iter()
                .filter(|grant| grant.user_id == user_id && grant.is_active)
                .cloned()
                .collect())
        }

        async fn list_active_company_grants(
            &self,
            user_id: UserId,
        ) -> AppResult<Vec<CompanyGrant>> {
            Ok(self
                .company_grants
                .lock()
                .await
                .iter()
                .filter(|grant| grant.user_id == user_id && grant.is_active)
                .cloned()
                .collect())
        }

        async fn insert_tenant_grant(&self, grant: TenantGrant) -> AppResult<TenantGrant> {
            self.tenant_grants.lock().await.push(grant.clone());
            Ok(grant)
        }

        async fn insert_company_grant(&self, grant: CompanyGrant) -> AppResult<CompanyGrant> {
            self.company_grants.lock().await.push(grant.clone());
            Ok(grant)
        }

        async fn find_grant(&self, _grant_id: GrantId) -> AppResult<Option<Grant>> {
            Ok(None)
        }

        async fn deactivate_grant(&self, _grant_id: GrantId) -> AppResult<()> {
            Ok(())
        }

        async fn list_grants_for_company(
            &self,
            _company_id: CompanyId,
        ) -> AppResult<Vec<GrantView>> {
            Ok(Vec::new())
        }
    }

    #[derive(Default)]
    struct FakeAuditRepository {
        events: Mutex<Vec<AuditEvent>>,
    }

    #[async_trait]
    impl AuditRepository for FakeAuditRepository {
        async fn append_event(&self, event: AuditEvent) -> AppResult<()> {
            self.events.lock().await.push(event);
            Ok(())
        }
    }

    fn email(value: &str) -> EmailAddress {
        match EmailAddress::new(value) {
            Ok(email) => email,
            Err(error) => panic!("email should be valid: {error}"),
        }
    }

    fn service_over(store: Arc<FakeStore>) -> (OnboardingService, Arc<FakeAuditRepository>) {
        let audit = Arc::new(FakeAuditRepository::default());
        let access = AccessScopeService::new(store.clone(), store.clone());
        let service = OnboardingService::new(
            access,
            store.clone(),
            store.clone(),
            store,
            audit.clone(),
        );
        (service, audit)
    }

    #[tokio::test]
    async fn provisioning_creates_the_owner_grant() {
        let store = Arc::new(FakeStore::default());
        let (service, audit) = service_over(store.clone());

        let owner = match service.register_user(email("owner@example.com"), "hash").await {
            Ok(user) => user,
            Err(error) => panic!("registration should succeed: {error}"),
        };

        let provisioned = service
            .provision_tenant(owner.id(), "Mitra Jaya Group", "mitra-jaya")
            .await;
        let (tenant, grant) = match provisioned {
            Ok(pair) => pair,
            Err(error) => panic!("provisioning should succeed: {error}"),
        };

        assert_eq!(grant.tenant_id, tenant.id());
        assert_eq!(grant.user_id, owner.id());
        assert!(grant.is_active);
        assert_eq!(audit.events.lock().await.len(), 1);
    }

    #[tokio::test]
    async fn duplicate_email_is_a_conflict() {
        let store = Arc::new(FakeStore::default());
        let (service, _) = service_over(store);

        assert!(service.register_user(email("budi@example.com"), "hash").await.is_ok());
        let second = service.register_user(email("budi@example.com"), "hash").await;
        assert!(matches!(second, Err(AppError::Conflict(_))));
    }

    #[tokio::test]
    async fn creating_a_company_requires_tenant_authority() {
        let store = Arc::new(FakeStore::default());
        let (service, _) = service_over(store.clone());

        let owner = match service.register_user(email("owner@example.com"), "hash").await {
            Ok(user) => user,
            Err(error) => panic!("registration should succeed: {error}"),
        };
        let outsider = match service.register_user(email("outsider@example.com"), "hash").await {
            Ok(user) => user,
            Err(error) => panic!("registration should succeed: {error}"),
        };
        let (tenant, _) = match service
            .provision_tenant(owner.id(), "Mitra Jaya Group", "mitra-jaya")
            .await
        {
            Ok(pair) => pair,
            Err(error) => panic!("provisioning should succeed: {error}"),
        };

        let allowed = service
            .create_company(owner.id(), tenant.id(), "PT Sumber Rejeki", LegalEntityType::Pt)
            .await;
        assert!(allowed.is_ok());

        let denied = service
            .create_company(
                outsider.id(),
                tenant.id(),
                "PT Penyusup",
                LegalEntityType::Pt,
            )
            .await;
        assert!(matches!(denied, Err(AppError::AccessDenied(_))));
    }

    #[tokio::test]
    async fn duplicate_legal_name_within_tenant_is_a_conflict() {
        let store = Arc::new(FakeStore::default());
        let (service, _) = service_over(store.clone());

        let owner = match service.register_user(email("owner@example.com"), "hash").await {
            Ok(user) => user,
            Err(error) => panic!("registration should succeed: {error}"),
        };
        let (tenant, _) = match service
            .provision_tenant(owner.id(), "Mitra Jaya Group", "mitra-jaya")
            .await
        {
            Ok(pair) => pair,
            Err(error) => panic!("provisioning should succeed: {error}"),
        };

        let first = service
            .create_company(owner.id(), tenant.id(), "PT Sumber Rejeki", LegalEntityType::Pt)
            .await;
        assert!(first.is_ok());

        let second = service
            .create_company(owner.id(), tenant.id(), "PT Sumber Rejeki", LegalEntityType::Cv)
            .await;
        assert!(matches!(second, Err(AppError::Conflict(_))));
    }

    #[tokio::test]
    async fn rename_keeps_the_owning_tenant() {
        let store = Arc::new(FakeStore::default());
        let (service, audit) = service_over(store.clone());

        let owner = match service.register_user(email("owner@example.com"), "hash").await {
            Ok(user) => user,
            Err(error) => panic!("registration should succeed: {error}"),
        };
        let (tenant, _) = match service
            .provision_tenant(owner.id(), "Mitra Jaya Group", "mitra-jaya")
            .await
        {
            Ok(pair) => pair,
            Err(error) => panic!("provisioning should succeed: {error}"),
        };
        let company = match service
            .create_company(owner.id(), tenant.id(), "PT Sumber Rejeki", LegalEntityType::Pt)
            .await
        {
            Ok(company) => company,
            Err(error) => panic!("company creation should succeed: {error}"),
        };

        let renamed = service
            .rename_company(owner.id(), company.id(), "PT Sumber Rejeki Abadi")
            .await;
        assert!(renamed.is_ok());

        let stored = store.companies.lock().await.get(&company.id()).cloned();
        let stored = match stored {
            Some(company) => company,
            None => panic!("company should still exist"),
        };
        assert_eq!(stored.tenant_id(), tenant.id());
        assert_eq!(stored.legal_name().as_str(), "PT Sumber Rejeki Abadi");
        assert_eq!(audit.events.lock().await.len(), 3);
    }
}
