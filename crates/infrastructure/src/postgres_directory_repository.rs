use async_trait::async_trait;
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use kirana_application::{DirectoryRepository, OnboardingRepository};
use kirana_core::{AppError, AppResult, CompanyId, NonEmptyString, TenantId};
use kirana_domain::{Company, EmailAddress, LegalEntityType, Tenant, User, UserId};

/// PostgreSQL-backed directory of users, tenants, and companies.
#[derive(Clone)]
pub struct PostgresDirectoryRepository {
    pool: PgPool,
}

impl PostgresDirectoryRepository {
    /// Creates a repository with the provided connection pool.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(Debug, FromRow)]
struct UserRow {
    id: Uuid,
    email: String,
    password_hash: String,
    is_active: bool,
}

impl UserRow {
    fn into_user(self) -> AppResult<User> {
        let email = EmailAddress::new(self.email)
            .map_err(|error| AppError::Internal(format!("stored email is invalid: {error}")))?;

        Ok(User::from_parts(
            UserId::from_uuid(self.id),
            email,
            self.password_hash,
            self.is_active,
        ))
    }
}

#[derive(Debug, FromRow)]
struct CompanyRow {
    id: Uuid,
    tenant_id: Uuid,
    legal_name: String,
    entity_type: String,
}

impl CompanyRow {
    fn into_company(self) -> AppResult<Company> {
        let legal_name = NonEmptyString::new(self.legal_name).map_err(|error| {
            AppError::Internal(format!("stored legal name is invalid: {error}"))
        })?;
        let entity_type = self.entity_type.parse::<LegalEntityType>().map_err(|error| {
            AppError::Internal(format!("stored entity type is invalid: {error}"))
        })?;

        Ok(Company::from_parts(
            CompanyId::from_uuid(self.id),
            TenantId::from_uuid(self.tenant_id),
            legal_name,
            entity_type,
        ))
    }
}

#[async_trait]
impl DirectoryRepository for PostgresDirectoryRepository {
    async fn find_user(&self, user_id: UserId) -> AppResult<Option<User>> {
        let row = sqlx::query_as::<_, UserRow>(
            r#"
            SELECT id, email, password_hash, is_active
            FROM users
            WHERE id = $1
            "#,
        )
        .bind(user_id.as_uuid())
        .fetch_optional(&self.pool)
        .await
        .map_err(|error| AppError::Internal(format!("failed to load user: {error}")))?;

        row.map(UserRow::into_user).transpose()
    }

    async fn find_company(&self, company_id: CompanyId) -> AppResult<Option<Company>> {
        let row = sqlx::query_as::<_, CompanyRow>(
            r#"
            SELECT id, tenant_id, legal_name, entity_type
            FROM companies
            WHERE id = $1
            "#,
        )
        .bind(company_id.as_uuid())
        .fetch_optional(&self.pool)
        .await
        .map_err(|error| AppError::Internal(format!("failed to load company: {error}")))?;

        row.map(CompanyRow::into_company).transpose()
    }

    async fn list_company_ids_for_tenant(
        &self,
        tenant_id: TenantId,
    ) -> AppResult<Vec<CompanyId>> {
        let ids = sqlx::query_scalar::<_, Uuid>(
            r#"
            SELECT id
            FROM companies
            WHERE tenant_id = $1
            ORDER BY id
            "#,
        )
        .bind(tenant_id.as_uuid())
        .fetch_all(&self.pool)
        .await
        .map_err(|error| {
            AppError::Internal(format!("failed to list tenant companies: {error}"))
        })?;

        Ok(ids.into_iter().map(CompanyId::from_uuid).collect())
    }
}

#[async_trait]
impl OnboardingRepository for PostgresDirectoryRepository {
    async fn insert_user(&self, user: User) -> AppResult<User> {
        sqlx::query(
            r#"
            INSERT INTO users (id, email, password_hash, is_active)
            VALUES ($1, $2, $3, $4)
            "#,
        )
        .bind(user.id().as_uuid())
        .bind(user.email().as_str())
        .bind(user.password_hash())
        .bind(user.is_active())
        .execute(&self.pool)
        .await
        .map_err(|error| {
            map_unique_conflict(
                error,
                format!("email '{}' is already registered", user.email().as_str()),
                "failed to insert user",
            )
        })?;

        tracing::debug!(user_id = %user.id(), "registered user");
        Ok(user)
    }

    async fn insert_tenant(&self, tenant: Tenant) -> AppResult<Tenant> {
        sqlx::query(
            r#"
            INSERT INTO tenants (id, name, subdomain)
            VALUES ($1, $2, $3)
            "#,
        )
        .bind(tenant.id().as_uuid())
        .bind(tenant.name().as_str())
        .bind(tenant.subdomain().as_str())
        .execute(&self.pool)
        .await
        .map_err(|error| {
            map_unique_conflict(
                error,
                format!(
                    "subdomain '{}' is already taken",
                    tenant.subdomain().as_str()
                ),
                "failed to insert tenant",
            )
        })?;

        tracing::debug!(tenant_id = %tenant.id(), "provisioned tenant");
        Ok(tenant)
    }

    async fn insert_company(&self, company: Company) -> AppResult<Company> {
        sqlx::query(
            r#"
            INSERT INTO companies (id, tenant_id, legal_name, entity_type)
            VALUES ($1, $2, $3, $4)
            "#,
        )
        .bind(company.id().as_uuid())
        .bind(company.tenant_id().as_uuid())
        .bind(company.legal_name().as_str())
        .bind(company.entity_type().as_str())
        .execute(&self.pool)
        .await
        .map_err(|error| {
            map_unique_conflict(
                error,
                format!(
                    "company '{}' already exists in tenant '{}'",
                    company.legal_name(),
                    company.tenant_id()
                ),
                "failed to insert company",
            )
        })?;

        tracing::debug!(company_id = %company.id(), tenant_id = %company.tenant_id(), "created company");
        Ok(company)
    }

    async fn update_company_name(
        &self,
        company_id: CompanyId,
        legal_name: NonEmptyString,
    ) -> AppResult<()> {
        let updated = sqlx::query(
            r#"
            UPDATE companies
            SET legal_name = $2, updated_at = now()
            WHERE id = $1
            "#,
        )
        .bind(company_id.as_uuid())
        .bind(legal_name.as_str())
        .execute(&self.pool)
        .await
        .map_err(|error| {
            map_unique_conflict(
                error,
                format!("legal name '{legal_name}' is already used in this tenant"),
                "failed to rename company",
            )
        })?;

        if updated.rows_affected() == 0 {
            return Err(AppError::NotFound(format!(
                "company '{company_id}' was not found"
            )));
        }

        Ok(())
    }
}

fn map_unique_conflict(error: sqlx::Error, conflict_message: String, context: &str) -> AppError {
    if let sqlx::Error::Database(database_error) = &error
        && database_error.code().as_deref() == Some("23505")
    {
        return AppError::Conflict(conflict_message);
    }

    AppError::Internal(format!("{context}: {error}"))
}
