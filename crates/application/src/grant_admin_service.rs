use std::sync::Arc;

use kirana_core::{AppError, AppResult, CompanyId};
use kirana_domain::{AuditAction, CompanyGrant, Grant, GrantId, GrantRole, UserId};

use crate::{
    AccessScopeService, AuditEvent, AuditRepository, DirectoryRepository, GrantRepository,
    GrantView,
};

/// Application service for grant administration.
///
/// Every operation requires the grantor to hold a tenant-level grant over
/// the affected tenant. Company-level roles, including admin, cannot grant
/// or revoke; that keeps privilege-escalation chains out of a single
/// company.
#[derive(Clone)]
pub struct GrantAdminService {
    access: AccessScopeService,
    directory: Arc<dyn DirectoryRepository>,
    grants: Arc<dyn GrantRepository>,
    audit_repository: Arc<dyn AuditRepository>,
}

impl GrantAdminService {
    /// Creates a new service from required dependencies.
    #[must_use]
    pub fn new(
        access: AccessScopeService,
        directory: Arc<dyn DirectoryRepository>,
        grants: Arc<dyn GrantRepository>,
        audit_repository: Arc<dyn AuditRepository>,
    ) -> Self {
        Self {
            access,
            directory,
            grants,
            audit_repository,
        }
    }

    /// Grants a company-scope role to a user and emits an audit event.
    ///
    /// Changing a role is revoke-then-grant, never an overwrite; an
    /// existing active grant for the same (user, company) pair fails with
    /// `DuplicateGrant`.
    pub async fn grant_company_role(
        &self,
        grantor_id: UserId,
        target_user_id: UserId,
        company_id: CompanyId,
        role: GrantRole,
    ) -> AppResult<CompanyGrant> {
        let GrantRole::Company(company_role) = role else {
            return Err(AppError::InvalidRole(format!(
                "role '{}' is tenant-scoped and cannot be granted at company scope",
                role.as_str()
            )));
        };

        let company = self
            .directory
            .find_company(company_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("company '{company_id}' was not found")))?;

        self.access
            .require_tenant_authority(grantor_id, company.tenant_id())
            .await?;

        let target = self
            .directory
            .find_user(target_user_id)
            .await?
            .ok_or_else(|| {
                AppError::NotFound(format!("user '{target_user_id}' was not found"))
            })?;

        if !target.is_active() {
            return Err(AppError::InactiveUser(format!(
                "user '{target_user_id}' is deactivated and cannot receive grants"
            )));
        }

        // Early duplicate check for a friendly error; the repository's
        // uniqueness guard remains authoritative under concurrency.
        if self
            .grants
            .find_active_company_grant(target_user_id, company_id)
            .await?
            .is_some()
        {
            return Err(AppError::DuplicateGrant(format!(
                "user '{target_user_id}' already holds an active grant for company '{company_id}'"
            )));
        }

        let grant = self
            .grants
            .insert_company_grant(CompanyGrant::for_company(
                &company,
                target_user_id,
                company_role,
            ))
            .await?;

        self.audit_repository
            .append_event(AuditEvent {
                tenant_id: company.tenant_id(),
                company_id: Some(company_id),
                actor: grantor_id,
                action: AuditAction::GrantCreated,
                resource_id: grant.id.to_string(),
                detail: Some(format!(
                    "granted role '{}' to user '{target_user_id}' for company '{company_id}'",
                    grant.role.as_str()
                )),
            })
            .await?;

        Ok(grant)
    }

    /// Revokes a grant of either tier and emits an audit event.
    ///
    /// Revocation flips the active flag; the row stays behind for the
    /// access history. Revoking an already-inactive grant succeeds silently
    /// and emits nothing.
    pub async fn revoke_grant(&self, grantor_id: UserId, grant_id: GrantId) -> AppResult<()> {
        let grant = self
            .grants
            .find_grant(grant_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("grant '{grant_id}' was not found")))?;

        self.access
            .require_tenant_authority(grantor_id, grant.tenant_id())
            .await?;

        if !grant.is_active() {
            return Ok(());
        }

        self.grants.deactivate_grant(grant_id).await?;

        self.audit_repository
            .append_event(AuditEvent {
                tenant_id: grant.tenant_id(),
                company_id: match &grant {
                    Grant::Company(company_grant) => Some(company_grant.company_id),
                    Grant::Tenant(_) => None,
                },
                actor: grantor_id,
                action: AuditAction::GrantRevoked,
                resource_id: grant_id.to_string(),
                detail: Some(format!(
                    "revoked grant '{grant_id}' of user '{}'",
                    grant.user_id()
                )),
            })
            .await
    }

    /// Lists all grants for one company, revoked rows included.
    pub async fn list_company_grants(
        &self,
        actor_id: UserId,
        company_id: CompanyId,
    ) -> AppResult<Vec<GrantView>> {
        let company = self
            .directory
            .find_company(company_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("company '{company_id}' was not found")))?;

        self.access
            .require_tenant_authority(actor_id, company.tenant_id())
            .await?;

        self.grants.list_grants_for_company(company_id).await
    }
}
