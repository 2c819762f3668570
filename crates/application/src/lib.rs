//! Application services and ports.

#![forbid(unsafe_code)]

mod access_ports;
mod access_scope_service;
mod audit;
mod grant_admin_service;
mod onboarding_service;

pub use access_ports::{DirectoryRepository, GrantRepository, GrantView};
pub use access_scope_service::{AccessDecision, AccessScopeService, ScopePredicate};
pub use audit::{AuditEvent, AuditRepository};
pub use grant_admin_service::GrantAdminService;
pub use onboarding_service::{OnboardingRepository, OnboardingService};
