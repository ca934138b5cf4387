//! PostgreSQL Store Implementations

use chrono::{DateTime, Utc};
use platform::{EncodedSecret, HashAlgorithm, PasswordFormat};
use sqlx::PgPool;
use uuid::Uuid;

use crate::domain::entity::{credential::CredentialRecord, identity::Identity, role::Role};
use crate::domain::repository::{AttributeStore, IdentityStore};
use crate::error::IdentityResult;

/// PostgreSQL-backed identity + attribute store
#[derive(Clone)]
pub struct PgIdentityStore {
    pool: PgPool,
}

impl PgIdentityStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

const IDENTITY_COLUMNS: &str = r#"
    id,
    guid,
    email,
    username,
    active,
    deleted,
    is_system_account,
    system_name,
    failed_login_attempts,
    cannot_login_until,
    last_login_at,
    email_to_revalidate,
    must_re_login,
    created_at
"#;

impl IdentityStore for PgIdentityStore {
    async fn insert(&self, identity: &Identity) -> IdentityResult<Identity> {
        let row = sqlx::query_as::<_, IdentityRow>(
            r#"
            INSERT INTO identities (
                guid,
                email,
                username,
                active,
                deleted,
                is_system_account,
                system_name,
                failed_login_attempts,
                cannot_login_until,
                last_login_at,
                email_to_revalidate,
                must_re_login,
                created_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
            RETURNING
                id,
                guid,
                email,
                username,
                active,
                deleted,
                is_system_account,
                system_name,
                failed_login_attempts,
                cannot_login_until,
                last_login_at,
                email_to_revalidate,
                must_re_login,
                created_at
            "#,
        )
        .bind(identity.guid)
        .bind(&identity.email)
        .bind(&identity.username)
        .bind(identity.active)
        .bind(identity.deleted)
        .bind(identity.is_system_account)
        .bind(&identity.system_name)
        .bind(identity.failed_login_attempts)
        .bind(identity.cannot_login_until)
        .bind(identity.last_login_at)
        .bind(&identity.email_to_revalidate)
        .bind(identity.must_re_login)
        .bind(identity.created_at)
        .fetch_one(&self.pool)
        .await?;

        Ok(row.into_identity())
    }

    async fn update(&self, identity: &Identity) -> IdentityResult<()> {
        sqlx::query(
            r#"
            UPDATE identities SET
                email = $2,
                username = $3,
                active = $4,
                deleted = $5,
                is_system_account = $6,
                system_name = $7,
                failed_login_attempts = $8,
                cannot_login_until = $9,
                last_login_at = $10,
                email_to_revalidate = $11,
                must_re_login = $12
            WHERE id = $1
            "#,
        )
        .bind(identity.id)
        .bind(&identity.email)
        .bind(&identity.username)
        .bind(identity.active)
        .bind(identity.deleted)
        .bind(identity.is_system_account)
        .bind(&identity.system_name)
        .bind(identity.failed_login_attempts)
        .bind(identity.cannot_login_until)
        .bind(identity.last_login_at)
        .bind(&identity.email_to_revalidate)
        .bind(identity.must_re_login)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn find_by_id(&self, id: i64) -> IdentityResult<Option<Identity>> {
        let sql = format!("SELECT {IDENTITY_COLUMNS} FROM identities WHERE id = $1");
        let row = sqlx::query_as::<_, IdentityRow>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.map(IdentityRow::into_identity))
    }

    async fn find_by_guid(&self, guid: Uuid) -> IdentityResult<Option<Identity>> {
        let sql = format!("SELECT {IDENTITY_COLUMNS} FROM identities WHERE guid = $1");
        let row = sqlx::query_as::<_, IdentityRow>(&sql)
            .bind(guid)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.map(IdentityRow::into_identity))
    }

    async fn find_by_email(&self, email: &str) -> IdentityResult<Option<Identity>> {
        let sql = format!("SELECT {IDENTITY_COLUMNS} FROM identities WHERE lower(email) = lower($1)");
        let row = sqlx::query_as::<_, IdentityRow>(&sql)
            .bind(email)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.map(IdentityRow::into_identity))
    }

    async fn find_by_username(&self, username: &str) -> IdentityResult<Option<Identity>> {
        let sql = format!("SELECT {IDENTITY_COLUMNS} FROM identities WHERE username = $1");
        let row = sqlx::query_as::<_, IdentityRow>(&sql)
            .bind(username)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.map(IdentityRow::into_identity))
    }

    async fn find_by_system_name(&self, system_name: &str) -> IdentityResult<Option<Identity>> {
        let sql = format!("SELECT {IDENTITY_COLUMNS} FROM identities WHERE system_name = $1");
        let row = sqlx::query_as::<_, IdentityRow>(&sql)
            .bind(system_name)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.map(IdentityRow::into_identity))
    }

    async fn roles_of(&self, identity_id: i64) -> IdentityResult<Vec<Role>> {
        let rows = sqlx::query_as::<_, RoleRow>(
            r#"
            SELECT
                r.id,
                r.name,
                r.active,
                r.is_system_role,
                r.system_name,
                r.enforce_password_lifetime
            FROM identity_roles r
            JOIN identity_role_map m ON m.role_id = r.id
            WHERE m.identity_id = $1
            "#,
        )
        .bind(identity_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(RoleRow::into_role).collect())
    }

    async fn find_role_by_system_name(&self, system_name: &str) -> IdentityResult<Option<Role>> {
        let row = sqlx::query_as::<_, RoleRow>(
            r#"
            SELECT
                id,
                name,
                active,
                is_system_role,
                system_name,
                enforce_password_lifetime
            FROM identity_roles
            WHERE system_name = $1
            "#,
        )
        .bind(system_name)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(RoleRow::into_role))
    }

    async fn add_to_role(&self, identity_id: i64, role_id: i64) -> IdentityResult<()> {
        sqlx::query(
            r#"
            INSERT INTO identity_role_map (identity_id, role_id)
            VALUES ($1, $2)
            ON CONFLICT DO NOTHING
            "#,
        )
        .bind(identity_id)
        .bind(role_id)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn remove_from_role(&self, identity_id: i64, role_id: i64) -> IdentityResult<()> {
        sqlx::query("DELETE FROM identity_role_map WHERE identity_id = $1 AND role_id = $2")
            .bind(identity_id)
            .bind(role_id)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    async fn current_credential(
        &self,
        identity_id: i64,
    ) -> IdentityResult<Option<CredentialRecord>> {
        let row = sqlx::query_as::<_, CredentialRow>(
            r#"
            SELECT
                identity_id,
                format,
                secret,
                salt,
                algorithm,
                created_at
            FROM identity_credentials
            WHERE identity_id = $1
            ORDER BY created_at DESC, id DESC
            LIMIT 1
            "#,
        )
        .bind(identity_id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(CredentialRow::into_record).transpose()
    }

    async fn recent_credentials(
        &self,
        identity_id: i64,
        count: u32,
    ) -> IdentityResult<Vec<CredentialRecord>> {
        let rows = sqlx::query_as::<_, CredentialRow>(
            r#"
            SELECT
                identity_id,
                format,
                secret,
                salt,
                algorithm,
                created_at
            FROM identity_credentials
            WHERE identity_id = $1
            ORDER BY created_at DESC, id DESC
            LIMIT $2
            "#,
        )
        .bind(identity_id)
        .bind(i64::from(count))
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(CredentialRow::into_record).collect()
    }

    async fn insert_credential(&self, credential: &CredentialRecord) -> IdentityResult<()> {
        // Insert-only table: no UPDATE or DELETE statements exist for it
        sqlx::query(
            r#"
            INSERT INTO identity_credentials (
                identity_id,
                format,
                secret,
                salt,
                algorithm,
                created_at
            ) VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(credential.identity_id)
        .bind(credential.secret.format.id())
        .bind(&credential.secret.secret)
        .bind(&credential.secret.salt)
        .bind(credential.secret.algorithm.map(|a| a.to_string()))
        .bind(credential.created_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}

impl AttributeStore for PgIdentityStore {
    async fn get(&self, identity_id: i64, key: &str) -> IdentityResult<Option<String>> {
        let value: Option<(String,)> = sqlx::query_as(
            "SELECT value FROM identity_attributes WHERE identity_id = $1 AND key = $2",
        )
        .bind(identity_id)
        .bind(key)
        .fetch_optional(&self.pool)
        .await?;

        Ok(value.map(|(v,)| v))
    }

    async fn set(&self, identity_id: i64, key: &str, value: Option<&str>) -> IdentityResult<()> {
        match value {
            Some(value) => {
                sqlx::query(
                    r#"
                    INSERT INTO identity_attributes (identity_id, key, value)
                    VALUES ($1, $2, $3)
                    ON CONFLICT (identity_id, key) DO UPDATE SET value = EXCLUDED.value
                    "#,
                )
                .bind(identity_id)
                .bind(key)
                .bind(value)
                .execute(&self.pool)
                .await?;
            }
            None => {
                sqlx::query("DELETE FROM identity_attributes WHERE identity_id = $1 AND key = $2")
                    .bind(identity_id)
                    .bind(key)
                    .execute(&self.pool)
                    .await?;
            }
        }

        Ok(())
    }
}

// ============================================================================
// Row types
// ============================================================================

#[derive(sqlx::FromRow)]
struct IdentityRow {
    id: i64,
    guid: Uuid,
    email: String,
    username: Option<String>,
    active: bool,
    deleted: bool,
    is_system_account: bool,
    system_name: Option<String>,
    failed_login_attempts: i32,
    cannot_login_until: Option<DateTime<Utc>>,
    last_login_at: Option<DateTime<Utc>>,
    email_to_revalidate: Option<String>,
    must_re_login: bool,
    created_at: DateTime<Utc>,
}

impl IdentityRow {
    fn into_identity(self) -> Identity {
        Identity {
            id: self.id,
            guid: self.guid,
            email: self.email,
            username: self.username,
            active: self.active,
            deleted: self.deleted,
            is_system_account: self.is_system_account,
            system_name: self.system_name,
            failed_login_attempts: self.failed_login_attempts,
            cannot_login_until: self.cannot_login_until,
            last_login_at: self.last_login_at,
            email_to_revalidate: self.email_to_revalidate,
            must_re_login: self.must_re_login,
            created_at: self.created_at,
        }
    }
}

#[derive(sqlx::FromRow)]
struct RoleRow {
    id: i64,
    name: String,
    active: bool,
    is_system_role: bool,
    system_name: Option<String>,
    enforce_password_lifetime: bool,
}

impl RoleRow {
    fn into_role(self) -> Role {
        Role {
            id: self.id,
            name: self.name,
            active: self.active,
            is_system_role: self.is_system_role,
            system_name: self.system_name,
            enforce_password_lifetime: self.enforce_password_lifetime,
        }
    }
}

#[derive(sqlx::FromRow)]
struct CredentialRow {
    identity_id: i64,
    format: i32,
    secret: String,
    salt: Option<String>,
    algorithm: Option<String>,
    created_at: DateTime<Utc>,
}

impl CredentialRow {
    fn into_record(self) -> IdentityResult<CredentialRecord> {
        let format = PasswordFormat::from_id(self.format)?;
        let algorithm = self
            .algorithm
            .as_deref()
            .map(str::parse::<HashAlgorithm>)
            .transpose()?;

        Ok(CredentialRecord {
            identity_id: self.identity_id,
            secret: EncodedSecret {
                format,
                secret: self.secret,
                salt: self.salt,
                algorithm,
            },
            created_at: self.created_at,
        })
    }
}
