use async_trait::async_trait;
use kirana_core::{AppResult, CompanyId, TenantId};
use kirana_domain::{AuditAction, UserId};

/// Audit event appended by administrative use-cases.
///
/// Pure access resolution never appends events; only state transitions do.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuditEvent {
    /// Tenant the event is scoped to.
    pub tenant_id: TenantId,
    /// Company the event concerns, when company-scoped.
    pub company_id: Option<CompanyId>,
    /// Acting user.
    pub actor: UserId,
    /// Stable action identifier.
    pub action: AuditAction,
    /// Identifier of the affected resource.
    pub resource_id: String,
    /// Optional human-readable detail.
    pub detail: Option<String>,
}

/// Append-only repository port for audit events.
#[async_trait]
pub trait AuditRepository: Send + Sync {
    /// Appends one event to the audit trail.
    async fn append_event(&self, event: AuditEvent) -> AppResult<()>;
}
