//! Infrastructure adapters for application ports.

#![forbid(unsafe_code)]

mod in_memory_access_repository;
mod postgres_audit_repository;
mod postgres_directory_repository;
mod postgres_grant_repository;

pub use in_memory_access_repository::InMemoryAccessRepository;
pub use postgres_audit_repository::PostgresAuditRepository;
pub use postgres_directory_repository::PostgresDirectoryRepository;
pub use postgres_grant_repository::PostgresGrantRepository;

/// Embedded schema migrations for the access store.
pub static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!("./migrations");
