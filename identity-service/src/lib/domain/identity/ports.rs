use std::time::Duration;

use async_trait::async_trait;
use auth::PrincipalKind;
use thiserror::Error;

use crate::identity::models::AccountUser;
use crate::identity::models::NewAccountUser;
use crate::identity::models::Principal;

/// Error for principal persistence operations
#[derive(Debug, Clone, Error)]
pub enum RepositoryError {
    /// Transient transport fault (timeout, broken pool); callers may retry.
    #[error("Datastore unavailable: {0}")]
    Unavailable(String),

    #[error("Email already exists: {0}")]
    EmailAlreadyExists(String),

    #[error("Database error: {0}")]
    Database(String),
}

/// Persistence operations over the two principal identity stores.
///
/// The core only borrows resolved principals for the duration of a request;
/// the single mutation it performs is replacing a credential hash.
#[async_trait]
pub trait PrincipalRepository: Send + Sync + 'static {
    /// Retrieve a principal by identifier from the store `kind` selects.
    ///
    /// # Errors
    /// * `Unavailable` - datastore did not answer
    /// * `Database` - query failed
    async fn find_by_id(
        &self,
        kind: PrincipalKind,
        id: i64,
    ) -> Result<Option<Principal>, RepositoryError>;

    /// Retrieve a principal by (lowercased) email from the store `kind`
    /// selects.
    ///
    /// # Errors
    /// * `Unavailable` - datastore did not answer
    /// * `Database` - query failed
    async fn find_by_email(
        &self,
        kind: PrincipalKind,
        email: &str,
    ) -> Result<Option<Principal>, RepositoryError>;

    /// Replace the stored credential hash of an existing principal.
    ///
    /// # Errors
    /// * `Unavailable` - datastore did not answer
    /// * `Database` - update failed or the row no longer exists
    async fn update_credential_hash(
        &self,
        kind: PrincipalKind,
        id: i64,
        new_hash: &str,
    ) -> Result<(), RepositoryError>;

    /// Persist a new customer account.
    ///
    /// # Errors
    /// * `EmailAlreadyExists` - the email is already registered
    /// * `Unavailable` - datastore did not answer
    /// * `Database` - insert failed
    async fn create_user(&self, new_user: NewAccountUser) -> Result<AccountUser, RepositoryError>;

    /// Stamp the last successful login of a principal. Stores without a
    /// last-login column treat this as a no-op.
    async fn record_login(&self, kind: PrincipalKind, id: i64) -> Result<(), RepositoryError>;

    /// Whether any admin account exists (startup bootstrap check).
    async fn admin_exists(&self) -> Result<bool, RepositoryError>;
}

/// Error for ephemeral-store operations
#[derive(Debug, Clone, Error)]
pub enum StoreError {
    #[error("Ephemeral store unavailable: {0}")]
    Unavailable(String),
}

/// TTL-bounded keyed store shared by all request handlers.
///
/// Holds revocation markers, reset entries, and cached authorization
/// outcomes. Implementations must provide single-key atomicity and
/// read-your-writes consistency on the same key; no multi-key transactions
/// are required anywhere in the core.
#[async_trait]
pub trait EphemeralStore: Send + Sync + 'static {
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError>;

    /// Insert or overwrite a value that lapses after `ttl`.
    async fn set_with_ttl(&self, key: &str, value: &str, ttl: Duration)
        -> Result<(), StoreError>;

    /// Remove a key. Returns whether a live entry was removed.
    async fn delete(&self, key: &str) -> Result<bool, StoreError>;

    async fn exists(&self, key: &str) -> Result<bool, StoreError>;

    /// Atomically remove `key` only if its current value equals `expected`.
    /// Returns whether the entry was removed. This is the claim primitive
    /// the single-use reset flow relies on.
    async fn delete_if_matches(&self, key: &str, expected: &str) -> Result<bool, StoreError>;
}

/// Error for outbound mail operations
#[derive(Debug, Clone, Error)]
pub enum MailerError {
    #[error("Failed to send mail: {0}")]
    SendFailed(String),
}

/// Outbound notification delivery (external collaborator).
#[async_trait]
pub trait Mailer: Send + Sync + 'static {
    async fn send(&self, to: &str, subject: &str, body: &str) -> Result<(), MailerError>;
}
