use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use kirana_application::{GrantRepository, GrantView};
use kirana_core::{AppError, AppResult, CompanyId, TenantId};
use kirana_domain::{
    CompanyGrant, CompanyRole, Grant, GrantId, TenantGrant, TenantRole, UserId,
};

/// PostgreSQL-backed repository for both grant tiers.
///
/// The partial unique index on active `(user_id, company_id)` rows is the
/// authoritative duplicate guard; the service-level pre-check only exists
/// for a friendlier error on the common path.
#[derive(Clone)]
pub struct PostgresGrantRepository {
    pool: PgPool,
}

impl PostgresGrantRepository {
    /// Creates a repository with the provided connection pool.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(Debug, FromRow)]
struct TenantGrantRow {
    id: Uuid,
    tenant_id: Uuid,
    user_id: Uuid,
    role: String,
    is_active: bool,
}

impl TenantGrantRow {
    fn into_grant(self) -> AppResult<TenantGrant> {
        let role = self.role.parse::<TenantRole>().map_err(|error| {
            AppError::Internal(format!("stored tenant role is invalid: {error}"))
        })?;

        Ok(TenantGrant {
            id: GrantId::from_uuid(self.id),
            tenant_id: TenantId::from_uuid(self.tenant_id),
            user_id: UserId::from_uuid(self.user_id),
            role,
            is_active: self.is_active,
        })
    }
}

#[derive(Debug, FromRow)]
struct CompanyGrantRow {
    id: Uuid,
    tenant_id: Uuid,
    company_id: Uuid,
    user_id: Uuid,
    role: String,
    is_active: bool,
}

impl CompanyGrantRow {
    fn into_grant(self) -> AppResult<CompanyGrant> {
        let role = self.role.parse::<CompanyRole>().map_err(|error| {
            AppError::Internal(format!("stored company role is invalid: {error}"))
        })?;

        Ok(CompanyGrant {
            id: GrantId::from_uuid(self.id),
            tenant_id: TenantId::from_uuid(self.tenant_id),
            company_id: CompanyId::from_uuid(self.company_id),
            user_id: UserId::from_uuid(self.user_id),
            role,
            is_active: self.is_active,
        })
    }
}

#[derive(Debug, FromRow)]
struct GrantViewRow {
    id: Uuid,
    user_email: String,
    role: String,
    is_active: bool,
    created_at: DateTime<Utc>,
    revoked_at: Option<DateTime<Utc>>,
}

#[async_trait]
impl GrantRepository for PostgresGrantRepository {
    async fn find_active_tenant_grant(
        &self,
        user_id: UserId,
        tenant_id: TenantId,
    ) -> AppResult<Option<TenantGrant>> {
        let row = sqlx::query_as::<_, TenantGrantRow>(
            r#"
            SELECT id, tenant_id, user_id, role, is_active
            FROM tenant_grants
            WHERE user_id = $1 AND tenant_id = $2 AND is_active
            "#,
        )
        .bind(user_id.as_uuid())
        .bind(tenant_id.as_uuid())
        .fetch_optional(&self.pool)
        .await
        .map_err(|error| AppError::Internal(format!("failed to load tenant grant: {error}")))?;

        row.map(TenantGrantRow::into_grant).transpose()
    }

    async fn find_active_company_grant(
        &self,
        user_id: UserId,
        company_id: CompanyId,
    ) -> AppResult<Option<CompanyGrant>> {
        let row = sqlx::query_as::<_, CompanyGrantRow>(
            r#"
            SELECT id, tenant_id, company_id, user_id, role, is_active
            FROM company_grants
            WHERE user_id = $1 AND company_id = $2 AND is_active
            "#,
        )
        .bind(user_id.as_uuid())
        .bind(company_id.as_uuid())
        .fetch_optional(&self.pool)
        .await
        .map_err(|error| AppError::Internal(format!("failed to load company grant: {error}")))?;

        row.map(CompanyGrantRow::into_grant).transpose()
    }

    async fn list_active_tenant_grants(&self, user_id: UserId) -> AppResult<Vec<TenantGrant>> {
        let rows = sqlx::query_as::<_, TenantGrantRow>(
            r#"
            SELECT id, tenant_id, user_id, role, is_active
            FROM tenant_grants
            WHERE user_id = $1 AND is_active
            "#,
        )
        .bind(user_id.as_uuid())
        .fetch_all(&self.pool)
        .await
        .map_err(|error| {
            AppError::Internal(format!("failed to list tenant grants: {error}"))
        })?;

        rows.into_iter().map(TenantGrantRow::into_grant).collect()
    }

    async fn list_active_company_grants(&self, user_id: UserId) -> AppResult<Vec<CompanyGrant>> {
        let rows = sqlx::query_as::<_, CompanyGrantRow>(
            r#"
            SELECT id, tenant_id, company_id, user_id, role, is_active
            FROM company_grants
            WHERE user_id = $1 AND is_active
            "#,
        )
        .bind(user_id.as_uuid())
        .fetch_all(&self.pool)
        .await
        .map_err(|error| {
            AppError::Internal(format!("failed to list company grants: {error}"))
        })?;

        rows.into_iter().map(CompanyGrantRow::into_grant).collect()
    }

    async fn insert_tenant_grant(&self, grant: TenantGrant) -> AppResult<TenantGrant> {
        sqlx::query(
            r#"
            INSERT INTO tenant_grants (id, tenant_id, user_id, role, is_active)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(grant.id.as_uuid())
        .bind(grant.tenant_id.as_uuid())
        .bind(grant.user_id.as_uuid())
        .bind(grant.role.as_str())
        .bind(grant.is_active)
        .execute(&self.pool)
        .await
        .map_err(|error| map_duplicate_grant(error, grant.user_id, "tenant grant"))?;

        tracing::debug!(grant_id = %grant.id, tenant_id = %grant.tenant_id, "inserted tenant grant");
        Ok(grant)
    }

    async fn insert_company_grant(&self, grant: CompanyGrant) -> AppResult<CompanyGrant> {
        let mut transaction =
            self.pool.begin().await.map_err(|error| {
                AppError::Internal(format!("failed to begin transaction: {error}"))
            })?;

        // The denormalized tenant must match the company's current owner;
        // verify inside the same transaction as the insert.
        let owning_tenant = sqlx::query_scalar::<_, Uuid>(
            r#"
            SELECT tenant_id
            FROM companies
            WHERE id = $1
            "#,
        )
        .bind(grant.company_id.as_uuid())
        .fetch_optional(&mut *transaction)
        .await
        .map_err(|error| {
            AppError::Internal(format!("failed to resolve company tenant: {error}"))
        })?
        .ok_or_else(|| {
            AppError::NotFound(format!("company '{}' was not found", grant.company_id))
        })?;

        if owning_tenant != grant.tenant_id.as_uuid() {
            return Err(AppError::Internal(format!(
                "grant tenant '{}' does not match company tenant '{owning_tenant}'",
                grant.tenant_id
            )));
        }

        sqlx::query(
            r#"
            INSERT INTO company_grants (id, tenant_id, company_id, user_id, role, is_active)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(grant.id.as_uuid())
        .bind(grant.tenant_id.as_uuid())
        .bind(grant.company_id.as_uuid())
        .bind(grant.user_id.as_uuid())
        .bind(grant.role.as_str())
        .bind(grant.is_active)
        .execute(&mut *transaction)
        .await
        .map_err(|error| map_duplicate_grant(error, grant.user_id, "company grant"))?;

        transaction.commit().await.map_err(|error| {
            AppError::Internal(format!("failed to commit transaction: {error}"))
        })?;

        tracing::debug!(grant_id = %grant.id, company_id = %grant.company_id, "inserted company grant");
        Ok(grant)
    }

    async fn find_grant(&self, grant_id: GrantId) -> AppResult<Option<Grant>> {
        let tenant_row = sqlx::query_as::<_, TenantGrantRow>(
            r#"
            SELECT id, tenant_id, user_id, role, is_active
            FROM tenant_grants
            WHERE id = $1
            "#,
        )
        .bind(grant_id.as_uuid())
        .fetch_optional(&self.pool)
        .await
        .map_err(|error| AppError::Internal(format!("failed to load grant: {error}")))?;

        if let Some(row) = tenant_row {
            return Ok(Some(Grant::Tenant(row.into_grant()?)));
        }

        let company_row = sqlx::query_as::<_, CompanyGrantRow>(
            r#"
            SELECT id, tenant_id, company_id, user_id, role, is_active
            FROM company_grants
            WHERE id = $1
            "#,
        )
        .bind(grant_id.as_uuid())
        .fetch_optional(&self.pool)
        .await
        .map_err(|error| AppError::Internal(format!("failed to load grant: {error}")))?;

        company_row
            .map(|row| row.into_grant().map(Grant::Company))
            .transpose()
    }

    async fn deactivate_grant(&self, grant_id: GrantId) -> AppResult<()> {
        let tenant_rows = sqlx::query(
            r#"
            UPDATE tenant_grants
            SET is_active = FALSE, revoked_at = now()
            WHERE id = $1 AND is_active
            "#,
        )
        .bind(grant_id.as_uuid())
        .execute(&self.pool)
        .await
        .map_err(|error| AppError::Internal(format!("failed to revoke grant: {error}")))?;

        let company_rows = sqlx::query(
            r#"
            UPDATE company_grants
            SET is_active = FALSE, revoked_at = now()
            WHERE id = $1 AND is_active
            "#,
        )
        .bind(grant_id.as_uuid())
        .execute(&self.pool)
        .await
        .map_err(|error| AppError::Internal(format!("failed to revoke grant: {error}")))?;

        if tenant_rows.rows_affected() == 0 && company_rows.rows_affected() == 0 {
            tracing::debug!(grant_id = %grant_id, "revocation was a no-op");
        }

        Ok(())
    }

    async fn list_grants_for_company(&self, company_id: CompanyId) -> AppResult<Vec<GrantView>> {
        let rows = sqlx::query_as::<_, GrantViewRow>(
            r#"
            SELECT
                grants.id,
                users.email AS user_email,
                grants.role,
                grants.is_active,
                grants.created_at,
                grants.revoked_at
            FROM company_grants AS grants
            JOIN users ON users.id = grants.user_id
            WHERE grants.company_id = $1
            ORDER BY grants.created_at
            "#,
        )
        .bind(company_id.as_uuid())
        .fetch_all(&self.pool)
        .await
        .map_err(|error| {
            AppError::Internal(format!("failed to list company grants: {error}"))
        })?;

        Ok(rows
            .into_iter()
            .map(|row| GrantView {
                grant_id: row.id.to_string(),
                user_email: row.user_email,
                role: row.role,
                is_active: row.is_active,
                granted_at: row.created_at.to_rfc3339(),
                revoked_at: row.revoked_at.map(|value| value.to_rfc3339()),
            })
            .collect())
    }
}

fn map_duplicate_grant(error: sqlx::Error, user_id: UserId, tier: &str) -> AppError {
    if let sqlx::Error::Database(database_error) = &error
        && database_error.code().as_deref() == Some("23505")
    {
        return AppError::DuplicateGrant(format!(
            "user '{user_id}' already holds an active {tier} for this scope"
        ));
    }

    AppError::Internal(format!("failed to insert {tier}: {error}"))
}
