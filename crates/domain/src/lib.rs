//! Domain entities and invariants.

#![forbid(unsafe_code)]

mod audit;
mod company;
mod grant;
mod tenant;
mod user;

pub use audit::AuditAction;
pub use company::{Company, LegalEntityType};
pub use grant::{
    CompanyGrant, CompanyRole, Grant, GrantId, GrantRole, GrantTier, TenantGrant, TenantRole,
};
pub use tenant::{SUBDOMAIN_MAX_LENGTH, Subdomain, Tenant};
pub use user::{EmailAddress, User, UserId};
