use std::str::FromStr;

use async_trait::async_trait;
use auth::PrincipalKind;
use auth::Role;
use chrono::DateTime;
use chrono::Utc;
use sqlx::PgPool;

use crate::identity::models::AccountUser;
use crate::identity::models::EmailAddress;
use crate::identity::models::NewAccountUser;
use crate::identity::models::Principal;
use crate::identity::models::StaffMechanic;
use crate::identity::ports::PrincipalRepository;
use crate::identity::ports::RepositoryError;

/// Postgres adapter over the two principal identity stores.
pub struct PostgresPrincipalRepository {
    pool: PgPool,
}

impl PostgresPrincipalRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(sqlx::FromRow)]
struct UserRow {
    id: i64,
    full_name: String,
    email: String,
    password_hash: String,
    role: String,
    is_active: bool,
    last_login: Option<DateTime<Utc>>,
}

#[derive(sqlx::FromRow)]
struct MechanicRow {
    id: i64,
    name: String,
    email: String,
    password_hash: String,
    role: String,
    position: String,
    is_active: bool,
}

const USER_COLUMNS: &str = "id, full_name, email, password_hash, role, is_active, last_login";
const MECHANIC_COLUMNS: &str = "id, name, email, password_hash, role, is_active, position";

fn map_sqlx_error(e: sqlx::Error) -> RepositoryError {
    match e {
        sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed | sqlx::Error::Io(_) => {
            RepositoryError::Unavailable(e.to_string())
        }
        other => RepositoryError::Database(other.to_string()),
    }
}

fn parse_role(raw: &str) -> Result<Role, RepositoryError> {
    Role::from_str(raw)
        .map_err(|_| RepositoryError::Database(format!("unexpected role {:?} in principal row", raw)))
}

fn parse_email(raw: String) -> Result<EmailAddress, RepositoryError> {
    EmailAddress::new(raw).map_err(|e| RepositoryError::Database(e.to_string()))
}

impl TryFrom<UserRow> for Principal {
    type Error = RepositoryError;

    fn try_from(row: UserRow) -> Result<Self, Self::Error> {
        Ok(Principal::AccountUser(AccountUser {
            id: row.id,
            full_name: row.full_name,
            email: parse_email(row.email)?,
            credential_hash: row.password_hash,
            role: parse_role(&row.role)?,
            is_active: row.is_active,
            last_login: row.last_login,
        }))
    }
}

impl TryFrom<MechanicRow> for Principal {
    type Error = RepositoryError;

    fn try_from(row: MechanicRow) -> Result<Self, Self::Error> {
        Ok(Principal::StaffMechanic(StaffMechanic {
            id: row.id,
            name: row.name,
            email: parse_email(row.email)?,
            credential_hash: row.password_hash,
            role: parse_role(&row.role)?,
            position: row.position,
            is_active: row.is_active,
        }))
    }
}

#[async_trait]
impl PrincipalRepository for PostgresPrincipalRepository {
    async fn find_by_id(
        &self,
        kind: PrincipalKind,
        id: i64,
    ) -> Result<Option<Principal>, RepositoryError> {
        match kind {
            PrincipalKind::User => {
                let row: Option<UserRow> = sqlx::query_as(&format!(
                    "SELECT {} FROM users WHERE id = $1",
                    USER_COLUMNS
                ))
                .bind(id)
                .fetch_optional(&self.pool)
                .await
                .map_err(map_sqlx_error)?;

                row.map(Principal::try_from).transpose()
            }
            PrincipalKind::Mechanic => {
                let row: Option<MechanicRow> = sqlx::query_as(&format!(
                    "SELECT {} FROM mechanics WHERE id = $1",
                    MECHANIC_COLUMNS
                ))
                .bind(id)
                .fetch_optional(&self.pool)
                .await
                .map_err(map_sqlx_error)?;

                row.map(Principal::try_from).transpose()
            }
        }
    }

    async fn find_by_email(
        &self,
        kind: PrincipalKind,
        email: &str,
    ) -> Result<Option<Principal>, RepositoryError> {
        match kind {
            PrincipalKind::User => {
                let row: Option<UserRow> = sqlx::query_as(&format!(
                    "SELECT {} FROM users WHERE email = $1",
                    USER_COLUMNS
                ))
                .bind(email)
                .fetch_optional(&self.pool)
                .await
                .map_err(map_sqlx_error)?;

                row.map(Principal::try_from).transpose()
            }
            PrincipalKind::Mechanic => {
                let row: Option<MechanicRow> = sqlx::query_as(&format!(
                    "SELECT {} FROM mechanics WHERE email = $1",
                    MECHANIC_COLUMNS
                ))
                .bind(email)
                .fetch_optional(&self.pool)
                .await
                .map_err(map_sqlx_error)?;

                row.map(Principal::try_from).transpose()
            }
        }
    }

    async fn update_credential_hash(
        &self,
        kind: PrincipalKind,
        id: i64,
        new_hash: &str,
    ) -> Result<(), RepositoryError> {
        let query = match kind {
            PrincipalKind::User => "UPDATE users SET password_hash = $2 WHERE id = $1",
            PrincipalKind::Mechanic => "UPDATE mechanics SET password_hash = $2 WHERE id = $1",
        };

        let result = sqlx::query(query)
            .bind(id)
            .bind(new_hash)
            .execute(&self.pool)
            .await
            .map_err(map_sqlx_error)?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::Database(format!(
                "no {} row with id {} to update",
                kind, id
            )));
        }

        Ok(())
    }

    async fn create_user(&self, new_user: NewAccountUser) -> Result<AccountUser, RepositoryError> {
        let row: UserRow = sqlx::query_as(&format!(
            "INSERT INTO users (full_name, email, password_hash, role, is_active) \
             VALUES ($1, $2, $3, $4, TRUE) RETURNING {}",
            USER_COLUMNS
        ))
        .bind(&new_user.full_name)
        .bind(new_user.email.as_str())
        .bind(&new_user.credential_hash)
        .bind(new_user.role.as_str())
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            if let sqlx::Error::Database(db_err) = &e {
                if db_err.is_unique_violation() {
                    return RepositoryError::EmailAlreadyExists(
                        new_user.email.as_str().to_string(),
                    );
                }
            }
            map_sqlx_error(e)
        })?;

        match Principal::try_from(row)? {
            Principal::AccountUser(user) => Ok(user),
            Principal::StaffMechanic(_) => {
                Err(RepositoryError::Database("users row resolved to a mechanic".to_string()))
            }
        }
    }

    async fn record_login(&self, kind: PrincipalKind, id: i64) -> Result<(), RepositoryError> {
        // The mechanics store has no last-login column.
        if kind != PrincipalKind::User {
            return Ok(());
        }

        sqlx::query("UPDATE users SET last_login = now() WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(map_sqlx_error)?;

        Ok(())
    }

    async fn admin_exists(&self) -> Result<bool, RepositoryError> {
        let exists: bool =
            sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM users WHERE role = 'admin')")
                .fetch_one(&self.pool)
                .await
                .map_err(map_sqlx_error)?;

        Ok(exists)
    }
}
