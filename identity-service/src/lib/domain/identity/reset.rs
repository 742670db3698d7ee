use std::sync::Arc;
use std::time::Duration;

use auth::PasswordHasher;
use auth::PrincipalKind;
use auth::TokenCodec;
use auth::TokenKind;

use crate::identity::errors::AuthError;
use crate::identity::models::EmailAddress;
use crate::identity::ports::EphemeralStore;
use crate::identity::ports::Mailer;
use crate::identity::ports::PrincipalRepository;

/// Acknowledgement returned by `request` on every path. The text must be
/// byte-identical whether or not the email exists (user-enumeration defense).
pub const RESET_ACK: &str =
    "If an account with that email exists, a password reset email has been sent.";

const KEY_PREFIX: &str = "pwreset:";
const MAIL_SUBJECT: &str = "Password Reset Request";

/// Single-use password-reset lifecycle.
///
/// A reset entry moves `Issued -> Consumed` on a successful confirm or
/// `Issued -> Expired` when the store's TTL lapses. There is no transition
/// out of `Consumed`: a second confirm with the same token fails as if the
/// token had never existed.
pub struct ResetFlow<R, S, M>
where
    R: PrincipalRepository,
    S: EphemeralStore,
    M: Mailer,
{
    codec: Arc<TokenCodec>,
    hasher: PasswordHasher,
    repository: Arc<R>,
    store: Arc<S>,
    mailer: Arc<M>,
    reset_ttl: Duration,
    reset_link_base: String,
}

impl<R, S, M> ResetFlow<R, S, M>
where
    R: PrincipalRepository,
    S: EphemeralStore,
    M: Mailer,
{
    pub fn new(
        codec: Arc<TokenCodec>,
        repository: Arc<R>,
        store: Arc<S>,
        mailer: Arc<M>,
        reset_ttl: Duration,
        reset_link_base: String,
    ) -> Self {
        Self {
            codec,
            hasher: PasswordHasher::new(),
            repository,
            store,
            mailer,
            reset_ttl,
            reset_link_base,
        }
    }

    fn key(token: &str) -> String {
        format!("{}{}", KEY_PREFIX, token)
    }

    /// Issue a reset token for `email` and mail the reset link.
    ///
    /// Completes silently when the email is unknown; the caller returns
    /// [`RESET_ACK`] either way.
    ///
    /// # Errors
    /// * `ResolverUnavailable` / `Internal` - infrastructure faults only;
    ///   account existence is never surfaced
    pub async fn request(&self, email: &EmailAddress) -> Result<(), AuthError> {
        let principal = self
            .repository
            .find_by_email(PrincipalKind::User, email.as_str())
            .await?;

        let Some(principal) = principal else {
            tracing::info!("Password reset requested for an unknown email");
            return Ok(());
        };

        let ttl = chrono::Duration::from_std(self.reset_ttl)
            .map_err(|e| AuthError::Internal(e.to_string()))?;
        let token = self.codec.encode(&principal.issue_claims(TokenKind::Reset, ttl))?;

        // Entry TTL mirrors the token's own expiry window.
        self.store
            .set_with_ttl(&Self::key(&token), email.as_str(), self.reset_ttl)
            .await?;

        let link = format!("{}?token={}", self.reset_link_base, token);
        self.mailer
            .send(
                email.as_str(),
                MAIL_SUBJECT,
                &format!("To reset your password, click the following link: {}", link),
            )
            .await?;

        tracing::info!(principal_id = principal.id(), "Password reset token issued");
        Ok(())
    }

    /// Consume a reset token and replace the account's credential.
    ///
    /// The policy check runs first and does not burn the token. The entry is
    /// then claimed atomically (`delete_if_matches`) before the credential
    /// update, so of two racing confirms exactly one can reach the update.
    /// If persistence fails after the claim, the entry is re-inserted so the
    /// token stays usable for a retry.
    ///
    /// # Errors
    /// * `PasswordPolicyViolation` - the new password fails the policy
    /// * `ResetTokenInvalidOrExpired` - no live entry for the token, or the
    ///   claim was lost to a concurrent confirm
    /// * `PrincipalNotFound` - the account vanished since the request
    pub async fn confirm(&self, token: &str, new_password: &str) -> Result<(), AuthError> {
        auth::validate_policy(new_password)?;

        let key = Self::key(token);
        let email = self
            .store
            .get(&key)
            .await?
            .ok_or(AuthError::ResetTokenInvalidOrExpired)?;

        let principal = self
            .repository
            .find_by_email(PrincipalKind::User, &email)
            .await?
            .ok_or(AuthError::PrincipalNotFound)?;

        if !self.store.delete_if_matches(&key, &email).await? {
            return Err(AuthError::ResetTokenInvalidOrExpired);
        }

        let hasher = self.hasher;
        let password = new_password.to_string();
        let digest = tokio::task::spawn_blocking(move || hasher.hash(&password))
            .await
            .map_err(|e| AuthError::Internal(e.to_string()))??;

        if let Err(e) = self
            .repository
            .update_credential_hash(PrincipalKind::User, principal.id(), &digest)
            .await
        {
            // The entry is the recovery mechanism for a safe retry; put it
            // back before surfacing the failure.
            if let Err(restore) = self
                .store
                .set_with_ttl(&key, &email, self.reset_ttl)
                .await
            {
                tracing::error!(error = %restore, "Failed to restore reset entry after persistence failure");
            }
            return Err(e.into());
        }

        tracing::info!(principal_id = principal.id(), "Password reset completed");
        Ok(())
    }
}
