use std::collections::BTreeSet;
use std::sync::Arc;

use kirana_core::{AppError, AppResult, CompanyId, TenantId};
use kirana_domain::{GrantRole, GrantTier, TenantGrant, UserId};
use serde::Serialize;

use crate::{DirectoryRepository, GrantRepository};

/// Outcome of resolving a user against one company.
///
/// Denial is an `Ok` outcome; errors are reserved for unknown resources,
/// deactivated principals, and storage failures, so callers can keep
/// "no permission" and "unknown resource" externally distinguishable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessDecision {
    /// Access allowed under the given effective role.
    Granted(GrantRole),
    /// User holds no grant reaching the company.
    Denied,
}

impl AccessDecision {
    /// Returns whether access is allowed.
    #[must_use]
    pub fn is_allowed(&self) -> bool {
        matches!(self, Self::Granted(_))
    }

    /// Returns the effective role when access is allowed.
    #[must_use]
    pub fn role(&self) -> Option<GrantRole> {
        match self {
            Self::Granted(role) => Some(*role),
            Self::Denied => None,
        }
    }

    /// Returns the tier the access was resolved from, when allowed.
    #[must_use]
    pub fn tier(&self) -> Option<GrantTier> {
        self.role().map(|role| role.tier())
    }
}

/// The set of companies a user may access.
///
/// Every company-scoped query or write must intersect its filter with this
/// set; an empty predicate reaches no rows.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct ScopePredicate {
    company_ids: BTreeSet<CompanyId>,
}

impl ScopePredicate {
    /// Creates a predicate over the given companies.
    #[must_use]
    pub fn new(company_ids: BTreeSet<CompanyId>) -> Self {
        Self { company_ids }
    }

    /// Creates the empty predicate, matching no company.
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    /// Returns whether the predicate allows the company.
    #[must_use]
    pub fn contains(&self, company_id: CompanyId) -> bool {
        self.company_ids.contains(&company_id)
    }

    /// Returns whether the predicate matches no company.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.company_ids.is_empty()
    }

    /// Returns the number of allowed companies.
    #[must_use]
    pub fn len(&self) -> usize {
        self.company_ids.len()
    }

    /// Iterates the allowed companies in stable order.
    pub fn iter(&self) -> impl Iterator<Item = CompanyId> + '_ {
        self.company_ids.iter().copied()
    }
}

/// Application service resolving which companies a user may touch.
#[derive(Clone)]
pub struct AccessScopeService {
    directory: Arc<dyn DirectoryRepository>,
    grants: Arc<dyn GrantRepository>,
}

impl AccessScopeService {
    /// Creates a new service from repository implementations.
    #[must_use]
    pub fn new(directory: Arc<dyn DirectoryRepository>, grants: Arc<dyn GrantRepository>) -> Self {
        Self { directory, grants }
    }

    /// Resolves whether a user may access a company and under which role.
    ///
    /// A tenant grant on the company's tenant always wins and
    /// short-circuits the company-grant lookup, so a user never resolves to
    /// two conflicting effective roles. Pure read; mutates nothing.
    pub async fn resolve_access(
        &self,
        user_id: UserId,
        company_id: CompanyId,
    ) -> AppResult<AccessDecision> {
        let user = self
            .directory
            .find_user(user_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("user '{user_id}' was not found")))?;

        if !user.is_active() {
            return Err(AppError::InactiveUser(format!(
                "user '{user_id}' is deactivated"
            )));
        }

        let company = self
            .directory
            .find_company(company_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("company '{company_id}' was not found")))?;

        if let Some(grant) = self
            .grants
            .find_active_tenant_grant(user_id, company.tenant_id())
            .await?
        {
            return Ok(AccessDecision::Granted(GrantRole::Tenant(grant.role)));
        }

        if let Some(grant) = self
            .grants
            .find_active_company_grant(user_id, company_id)
            .await?
        {
            return Ok(AccessDecision::Granted(GrantRole::Company(grant.role)));
        }

        Ok(AccessDecision::Denied)
    }

    /// Resolves access and turns a clean denial into `AccessDenied`.
    ///
    /// Convenience surface for data-access callers that only proceed when
    /// allowed.
    pub async fn require_access(
        &self,
        user_id: UserId,
        company_id: CompanyId,
    ) -> AppResult<GrantRole> {
        match self.resolve_access(user_id, company_id).await? {
            AccessDecision::Granted(role) => Ok(role),
            AccessDecision::Denied => Err(AppError::AccessDenied(format!(
                "user '{user_id}' holds no grant for company '{company_id}'"
            ))),
        }
    }

    /// Requires an active tenant grant over the given tenant.
    ///
    /// Precondition shared by every grant-administration operation:
    /// company-level roles, including admin, never satisfy it.
    pub async fn require_tenant_authority(
        &self,
        user_id: UserId,
        tenant_id: TenantId,
    ) -> AppResult<TenantGrant> {
        let user = self
            .directory
            .find_user(user_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("user '{user_id}' was not found")))?;

        if !user.is_active() {
            return Err(AppError::InactiveUser(format!(
                "user '{user_id}' is deactivated"
            )));
        }

        self.grants
            .find_active_tenant_grant(user_id, tenant_id)
            .await?
            .ok_or_else(|| {
                AppError::AccessDenied(format!(
                    "user '{user_id}' holds no tenant-level grant over tenant '{tenant_id}'"
                ))
            })
    }

    /// Returns the set of companies the user may access.
    ///
    /// Fails closed: any resolution failure yields the empty predicate, so
    /// a mis-handled error upstream can never widen a query instead of
    /// narrowing it.
    pub async fn scope_predicate(&self, user_id: UserId) -> ScopePredicate {
        match self.collect_allowed_companies(user_id).await {
            Ok(predicate) => predicate,
            Err(_) => ScopePredicate::empty(),
        }
    }

    async fn collect_allowed_companies(&self, user_id: UserId) -> AppResult<ScopePredicate> {
        let user = self
            .directory
            .find_user(user_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("user '{user_id}' was not found")))?;

        if !user.is_active() {
            return Err(AppError::InactiveUser(format!(
                "user '{user_id}' is deactivated"
            )));
        }

        let mut company_ids = BTreeSet::new();

        for tenant_grant in self.grants.list_active_tenant_grants(user_id).await? {
            company_ids.extend(
                self.directory
                    .list_company_ids_for_tenant(tenant_grant.tenant_id)
                    .await?,
            );
        }

        for company_grant in self.grants.list_active_company_grants(user_id).await? {
            company_ids.insert(company_grant.company_id);
        }

        Ok(ScopePredicate::new(company_ids))
    }
}
