use std::sync::Arc;
use std::time::Duration as StdDuration;

use auth::Claims;
use auth::PasswordHasher;
use auth::PrincipalKind;
use auth::Role;
use auth::TokenCodec;
use auth::TokenKind;
use chrono::Duration;

use crate::identity::errors::AuthError;
use crate::identity::models::EmailAddress;
use crate::identity::models::NewAccountUser;
use crate::identity::models::Principal;
use crate::identity::models::RegisterCommand;
use crate::identity::models::TokenPair;
use crate::identity::ports::EphemeralStore;
use crate::identity::ports::Mailer;
use crate::identity::ports::PrincipalRepository;
use crate::identity::reset::ResetFlow;
use crate::identity::revocation::RevocationStore;

/// Token lifetime knobs, consumed from configuration.
#[derive(Debug, Clone)]
pub struct TokenPolicy {
    pub access_ttl: Duration,
    pub refresh_ttl: Duration,
    pub reset_ttl: StdDuration,
    /// Ceiling for denylist markers; must outlive the longest-lived token
    /// kind it protects.
    pub revocation_ttl: StdDuration,
}

/// The identity command surface: login, refresh, logout, registration,
/// password change, and the two password-reset commands.
///
/// Credential hashing and verification are CPU-bound by design and run on
/// the blocking worker pool so they never stall the async scheduler.
pub struct IdentityService<R, S, M>
where
    R: PrincipalRepository,
    S: EphemeralStore,
    M: Mailer,
{
    repository: Arc<R>,
    codec: Arc<TokenCodec>,
    hasher: PasswordHasher,
    revocation: RevocationStore<S>,
    reset: ResetFlow<R, S, M>,
    policy: TokenPolicy,
}

impl<R, S, M> IdentityService<R, S, M>
where
    R: PrincipalRepository,
    S: EphemeralStore,
    M: Mailer,
{
    pub fn new(
        repository: Arc<R>,
        store: Arc<S>,
        mailer: Arc<M>,
        codec: Arc<TokenCodec>,
        policy: TokenPolicy,
        reset_link_base: String,
    ) -> Self {
        let reset = ResetFlow::new(
            Arc::clone(&codec),
            Arc::clone(&repository),
            Arc::clone(&store),
            mailer,
            policy.reset_ttl,
            reset_link_base,
        );

        Self {
            repository,
            codec,
            hasher: PasswordHasher::new(),
            revocation: RevocationStore::new(store, policy.revocation_ttl),
            reset,
            policy,
        }
    }

    /// Register a new customer account. The role is always `customer`.
    ///
    /// # Errors
    /// * `PasswordPolicyViolation` - password fails the account policy
    /// * `EmailAlreadyExists` - the email is already registered
    pub async fn register(&self, command: RegisterCommand) -> Result<Principal, AuthError> {
        auth::validate_policy(&command.password)?;

        if self
            .repository
            .find_by_email(PrincipalKind::User, command.email.as_str())
            .await?
            .is_some()
        {
            return Err(AuthError::EmailAlreadyExists(
                command.email.as_str().to_string(),
            ));
        }

        let credential_hash = self.hash_off_scheduler(command.password).await?;
        let user = self
            .repository
            .create_user(NewAccountUser {
                full_name: command.full_name,
                email: command.email,
                credential_hash,
                role: Role::Customer,
            })
            .await?;

        tracing::info!(principal_id = user.id, "Customer account registered");
        Ok(Principal::AccountUser(user))
    }

    /// Authenticate by email and password and issue an access/refresh pair.
    ///
    /// The identifier is tried against the user store first, then the
    /// mechanics store. An unknown identifier and a wrong password surface
    /// as the same `AuthenticationFailed`.
    ///
    /// # Errors
    /// * `AuthenticationFailed` - unknown identifier or wrong password
    /// * `AccountInactive` - credentials are valid but the account is blocked
    pub async fn login(
        &self,
        email: &EmailAddress,
        password: &str,
    ) -> Result<(Principal, TokenPair), AuthError> {
        let principal = match self
            .repository
            .find_by_email(PrincipalKind::User, email.as_str())
            .await?
        {
            Some(principal) => Some(principal),
            None => {
                self.repository
                    .find_by_email(PrincipalKind::Mechanic, email.as_str())
                    .await?
            }
        };

        let Some(principal) = principal else {
            return Err(AuthError::AuthenticationFailed);
        };

        if !self
            .verify_off_scheduler(password.to_string(), principal.credential_hash().to_string())
            .await?
        {
            return Err(AuthError::AuthenticationFailed);
        }

        if !principal.is_active() {
            return Err(AuthError::AccountInactive);
        }

        let pair = self.issue_pair(&principal)?;

        if let Principal::AccountUser(user) = &principal {
            if let Err(e) = self
                .repository
                .record_login(PrincipalKind::User, user.id)
                .await
            {
                tracing::warn!(error = %e, principal_id = user.id, "Failed to stamp last login");
            }
        }

        tracing::info!(
            principal_id = principal.id(),
            kind = %principal.kind(),
            "Principal logged in"
        );
        Ok((principal, pair))
    }

    /// Exchange a refresh token for a new access token.
    ///
    /// The presented refresh token is returned unchanged alongside the fresh
    /// access token.
    ///
    /// # Errors
    /// * `TokenInvalid` / `TokenExpired` / `InvalidRole` - decode failures,
    ///   including a non-refresh token kind
    /// * `TokenRevoked` - the refresh token was revoked at logout
    /// * `PrincipalNotFound` - the subject was deleted since issuance
    /// * `AccountInactive` - the subject was blocked since issuance
    pub async fn refresh(&self, refresh_token: &str) -> Result<TokenPair, AuthError> {
        let claims = self.codec.decode(refresh_token)?;
        if claims.kind != TokenKind::Refresh {
            return Err(AuthError::TokenInvalid(format!(
                "{} token presented where a refresh token is required",
                claims.kind
            )));
        }

        if self.revocation.is_revoked(refresh_token).await? {
            return Err(AuthError::TokenRevoked);
        }

        let principal = self.resolve_subject(&claims).await?;
        if !principal.is_active() {
            return Err(AuthError::AccountInactive);
        }

        let access_token = self
            .codec
            .encode(&principal.issue_claims(TokenKind::Access, self.policy.access_ttl))?;

        tracing::info!(principal_id = principal.id(), "Access token refreshed");
        Ok(TokenPair {
            access_token,
            refresh_token: refresh_token.to_string(),
        })
    }

    /// Revoke the presented access or refresh token.
    ///
    /// # Errors
    /// * `TokenRevoked` - the token was already revoked
    /// * `TokenInvalid` / `TokenExpired` - the token never was, or no longer
    ///   is, valid
    pub async fn logout(&self, token: &str) -> Result<(), AuthError> {
        if self.revocation.is_revoked(token).await? {
            return Err(AuthError::TokenRevoked);
        }

        let claims = self.codec.decode(token)?;
        if claims.kind == TokenKind::Reset {
            return Err(AuthError::TokenInvalid(
                "reset tokens cannot be logged out".to_string(),
            ));
        }

        self.revocation.revoke(token).await?;
        tracing::info!(principal_id = claims.sub, "Token revoked");
        Ok(())
    }

    /// Replace a user's password (administrative command).
    ///
    /// # Errors
    /// * `PasswordPolicyViolation` - new password fails the policy
    /// * `PrincipalNotFound` - no user account with this email
    pub async fn change_password(
        &self,
        email: &EmailAddress,
        new_password: &str,
    ) -> Result<(), AuthError> {
        auth::validate_policy(new_password)?;

        let principal = self
            .repository
            .find_by_email(PrincipalKind::User, email.as_str())
            .await?
            .ok_or(AuthError::PrincipalNotFound)?;

        let digest = self.hash_off_scheduler(new_password.to_string()).await?;
        self.repository
            .update_credential_hash(PrincipalKind::User, principal.id(), &digest)
            .await?;

        tracing::info!(principal_id = principal.id(), "Password updated");
        Ok(())
    }

    /// Issue a single-use reset token and mail the reset link. Completes
    /// identically whether or not the email is registered.
    pub async fn request_password_reset(&self, email: &EmailAddress) -> Result<(), AuthError> {
        self.reset.request(email).await
    }

    /// Consume a reset token and set the new password. See
    /// [`ResetFlow::confirm`] for the single-use guarantees.
    pub async fn confirm_password_reset(
        &self,
        token: &str,
        new_password: &str,
    ) -> Result<(), AuthError> {
        self.reset.confirm(token, new_password).await
    }

    fn issue_pair(&self, principal: &Principal) -> Result<TokenPair, AuthError> {
        let access_token = self
            .codec
            .encode(&principal.issue_claims(TokenKind::Access, self.policy.access_ttl))?;
        let refresh_token = self
            .codec
            .encode(&principal.issue_claims(TokenKind::Refresh, self.policy.refresh_ttl))?;

        Ok(TokenPair {
            access_token,
            refresh_token,
        })
    }

    async fn resolve_subject(&self, claims: &Claims) -> Result<Principal, AuthError> {
        self.repository
            .find_by_id(claims.principal, claims.sub)
            .await?
            .ok_or(AuthError::PrincipalNotFound)
    }

    async fn hash_off_scheduler(&self, password: String) -> Result<String, AuthError> {
        let hasher = self.hasher;
        tokio::task::spawn_blocking(move || hasher.hash(&password))
            .await
            .map_err(|e| AuthError::Internal(e.to_string()))?
            .map_err(AuthError::from)
    }

    async fn verify_off_scheduler(
        &self,
        password: String,
        digest: String,
    ) -> Result<bool, AuthError> {
        let hasher = self.hasher;
        tokio::task::spawn_blocking(move || hasher.verify(&password, &digest))
            .await
            .map_err(|e| AuthError::Internal(e.to_string()))?
            .map_err(AuthError::from)
    }
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;
    use mockall::mock;
    use mockall::predicate::*;

    use super::*;
    use crate::identity::models::AccountUser;
    use crate::identity::models::StaffMechanic;
    use crate::identity::ports::MailerError;
    use crate::identity::ports::RepositoryError;
    use crate::outbound::stores::memory::InMemoryEphemeralStore;

    mock! {
        pub TestRepository {}

        #[async_trait]
        impl PrincipalRepository for TestRepository {
            async fn find_by_id(&self, kind: PrincipalKind, id: i64) -> Result<Option<Principal>, RepositoryError>;
            async fn find_by_email(&self, kind: PrincipalKind, email: &str) -> Result<Option<Principal>, RepositoryError>;
            async fn update_credential_hash(&self, kind: PrincipalKind, id: i64, new_hash: &str) -> Result<(), RepositoryError>;
            async fn create_user(&self, new_user: NewAccountUser) -> Result<AccountUser, RepositoryError>;
            async fn record_login(&self, kind: PrincipalKind, id: i64) -> Result<(), RepositoryError>;
            async fn admin_exists(&self) -> Result<bool, RepositoryError>;
        }
    }

    mock! {
        pub TestMailer {}

        #[async_trait]
        impl Mailer for TestMailer {
            async fn send(&self, to: &str, subject: &str, body: &str) -> Result<(), MailerError>;
        }
    }

    const SECRET: &[u8] = b"test_secret_key_at_least_32_bytes!";

    fn policy() -> TokenPolicy {
        TokenPolicy {
            access_ttl: Duration::minutes(30),
            refresh_ttl: Duration::days(7),
            reset_ttl: StdDuration::from_secs(900),
            revocation_ttl: StdDuration::from_secs(7 * 24 * 3600),
        }
    }

    fn service_with(
        repository: MockTestRepository,
    ) -> IdentityService<MockTestRepository, InMemoryEphemeralStore, MockTestMailer> {
        IdentityService::new(
            Arc::new(repository),
            Arc::new(InMemoryEphemeralStore::new()),
            Arc::new(MockTestMailer::new()),
            Arc::new(TokenCodec::new(SECRET)),
            policy(),
            "https://example.com/auth/reset-password".to_string(),
        )
    }

    fn email() -> EmailAddress {
        EmailAddress::new("olena@example.com".to_string()).unwrap()
    }

    fn user_with_password(password: &str, is_active: bool) -> Principal {
        let digest = PasswordHasher::new().hash(password).unwrap();
        Principal::AccountUser(AccountUser {
            id: 7,
            full_name: "Olena Kovalenko".to_string(),
            email: email(),
            credential_hash: digest,
            role: Role::Customer,
            is_active,
            last_login: None,
        })
    }

    fn mechanic_with_password(password: &str) -> Principal {
        let digest = PasswordHasher::new().hash(password).unwrap();
        Principal::StaffMechanic(StaffMechanic {
            id: 9,
            name: "Taras Bondar".to_string(),
            email: EmailAddress::new("taras@example.com".to_string()).unwrap(),
            credential_hash: digest,
            role: Role::Mechanic,
            position: "Senior mechanic".to_string(),
            is_active: true,
        })
    }

    #[tokio::test]
    async fn test_login_issues_access_and_refresh_pair() {
        let principal = user_with_password("Correct1!", true);
        let mut repository = MockTestRepository::new();
        {
            let principal = principal.clone();
            repository
                .expect_find_by_email()
                .with(eq(PrincipalKind::User), eq("olena@example.com"))
                .returning(move |_, _| Ok(Some(principal.clone())));
        }
        repository
            .expect_record_login()
            .with(eq(PrincipalKind::User), eq(7))
            .times(1)
            .returning(|_, _| Ok(()));

        let service = service_with(repository);
        let (logged_in, pair) = service.login(&email(), "Correct1!").await.unwrap();

        assert_eq!(logged_in.id(), 7);

        let codec = TokenCodec::new(SECRET);
        let access = codec.decode(&pair.access_token).unwrap();
        let refresh = codec.decode(&pair.refresh_token).unwrap();
        assert_eq!(access.kind, TokenKind::Access);
        assert_eq!(access.role, Role::Customer);
        assert_eq!(refresh.kind, TokenKind::Refresh);
        assert_eq!(refresh.sub, 7);
    }

    #[tokio::test]
    async fn test_login_wrong_password() {
        let principal = user_with_password("Correct1!", true);
        let mut repository = MockTestRepository::new();
        repository
            .expect_find_by_email()
            .returning(move |_, _| Ok(Some(principal.clone())));

        let service = service_with(repository);
        let result = service.login(&email(), "Wrong1!pass").await;

        assert!(matches!(result, Err(AuthError::AuthenticationFailed)));
    }

    #[tokio::test]
    async fn test_login_unknown_email_checks_both_stores() {
        let mut repository = MockTestRepository::new();
        repository
            .expect_find_by_email()
            .with(eq(PrincipalKind::User), eq("olena@example.com"))
            .times(1)
            .returning(|_, _| Ok(None));
        repository
            .expect_find_by_email()
            .with(eq(PrincipalKind::Mechanic), eq("olena@example.com"))
            .times(1)
            .returning(|_, _| Ok(None));

        let service = service_with(repository);
        let result = service.login(&email(), "Whatever1!").await;

        assert!(matches!(result, Err(AuthError::AuthenticationFailed)));
    }

    #[tokio::test]
    async fn test_login_mechanic_by_email() {
        let principal = mechanic_with_password("Wrench1!");
        let mut repository = MockTestRepository::new();
        repository
            .expect_find_by_email()
            .with(eq(PrincipalKind::User), eq("taras@example.com"))
            .returning(|_, _| Ok(None));
        repository
            .expect_find_by_email()
            .with(eq(PrincipalKind::Mechanic), eq("taras@example.com"))
            .returning(move |_, _| Ok(Some(principal.clone())));

        let service = service_with(repository);
        let mechanic_email = EmailAddress::new("taras@example.com".to_string()).unwrap();
        let (logged_in, pair) = service.login(&mechanic_email, "Wrench1!").await.unwrap();

        assert_eq!(logged_in.kind(), PrincipalKind::Mechanic);
        let claims = TokenCodec::new(SECRET).decode(&pair.access_token).unwrap();
        assert_eq!(claims.principal, PrincipalKind::Mechanic);
        assert_eq!(claims.role, Role::Mechanic);
    }

    #[tokio::test]
    async fn test_login_inactive_account() {
        let principal = user_with_password("Correct1!", false);
        let mut repository = MockTestRepository::new();
        repository
            .expect_find_by_email()
            .returning(move |_, _| Ok(Some(principal.clone())));

        let service = service_with(repository);
        let result = service.login(&email(), "Correct1!").await;

        assert!(matches!(result, Err(AuthError::AccountInactive)));
    }

    #[tokio::test]
    async fn test_refresh_rejects_access_token() {
        let principal = user_with_password("Correct1!", true);
        let codec = TokenCodec::new(SECRET);
        let access = codec
            .encode(&principal.issue_claims(TokenKind::Access, Duration::minutes(5)))
            .unwrap();

        let service = service_with(MockTestRepository::new());
        let result = service.refresh(&access).await;

        assert!(matches!(result, Err(AuthError::TokenInvalid(_))));
    }

    #[tokio::test]
    async fn test_refresh_issues_new_access_token() {
        let principal = user_with_password("Correct1!", true);
        let codec = TokenCodec::new(SECRET);
        let refresh = codec
            .encode(&principal.issue_claims(TokenKind::Refresh, Duration::days(7)))
            .unwrap();

        let mut repository = MockTestRepository::new();
        {
            let principal = principal.clone();
            repository
                .expect_find_by_id()
                .with(eq(PrincipalKind::User), eq(7))
                .returning(move |_, _| Ok(Some(principal.clone())));
        }

        let service = service_with(repository);
        let pair = service.refresh(&refresh).await.unwrap();

        assert_eq!(pair.refresh_token, refresh);
        let claims = codec.decode(&pair.access_token).unwrap();
        assert_eq!(claims.kind, TokenKind::Access);
        assert_eq!(claims.sub, 7);
    }

    #[tokio::test]
    async fn test_refresh_rejects_deleted_subject() {
        let principal = user_with_password("Correct1!", true);
        let codec = TokenCodec::new(SECRET);
        let refresh = codec
            .encode(&principal.issue_claims(TokenKind::Refresh, Duration::days(7)))
            .unwrap();

        let mut repository = MockTestRepository::new();
        repository.expect_find_by_id().returning(|_, _| Ok(None));

        let service = service_with(repository);
        let result = service.refresh(&refresh).await;

        assert!(matches!(result, Err(AuthError::PrincipalNotFound)));
    }

    #[tokio::test]
    async fn test_logout_revokes_and_second_logout_fails() {
        let principal = user_with_password("Correct1!", true);
        let codec = TokenCodec::new(SECRET);
        let token = codec
            .encode(&principal.issue_claims(TokenKind::Access, Duration::minutes(30)))
            .unwrap();

        let service = service_with(MockTestRepository::new());

        service.logout(&token).await.unwrap();

        let again = service.logout(&token).await;
        assert!(matches!(again, Err(AuthError::TokenRevoked)));
    }

    #[tokio::test]
    async fn test_logout_then_refresh_is_rejected() {
        let principal = user_with_password("Correct1!", true);
        let codec = TokenCodec::new(SECRET);
        let refresh = codec
            .encode(&principal.issue_claims(TokenKind::Refresh, Duration::days(7)))
            .unwrap();

        let service = service_with(MockTestRepository::new());

        service.logout(&refresh).await.unwrap();

        let result = service.refresh(&refresh).await;
        assert!(matches!(result, Err(AuthError::TokenRevoked)));
    }

    #[tokio::test]
    async fn test_register_forces_customer_role() {
        let mut repository = MockTestRepository::new();
        repository.expect_find_by_email().returning(|_, _| Ok(None));
        repository
            .expect_create_user()
            .withf(|new_user| new_user.role == Role::Customer)
            .times(1)
            .returning(|new_user| {
                Ok(AccountUser {
                    id: 11,
                    full_name: new_user.full_name,
                    email: new_user.email,
                    credential_hash: new_user.credential_hash,
                    role: new_user.role,
                    is_active: true,
                    last_login: None,
                })
            });

        let service = service_with(repository);
        let principal = service
            .register(RegisterCommand {
                full_name: "Olena Kovalenko".to_string(),
                email: email(),
                password: "Fresh1!pass".to_string(),
            })
            .await
            .unwrap();

        assert_eq!(principal.role(), Role::Customer);
    }

    #[tokio::test]
    async fn test_register_rejects_duplicate_email() {
        let principal = user_with_password("Correct1!", true);
        let mut repository = MockTestRepository::new();
        repository
            .expect_find_by_email()
            .returning(move |_, _| Ok(Some(principal.clone())));

        let service = service_with(repository);
        let result = service
            .register(RegisterCommand {
                full_name: "Olena Kovalenko".to_string(),
                email: email(),
                password: "Fresh1!pass".to_string(),
            })
            .await;

        assert!(matches!(result, Err(AuthError::EmailAlreadyExists(_))));
    }

    #[tokio::test]
    async fn test_register_rejects_weak_password() {
        let service = service_with(MockTestRepository::new());
        let result = service
            .register(RegisterCommand {
                full_name: "Olena Kovalenko".to_string(),
                email: email(),
                password: "weak".to_string(),
            })
            .await;

        assert!(matches!(result, Err(AuthError::PasswordPolicyViolation(_))));
    }

    #[tokio::test]
    async fn test_change_password_unknown_email() {
        let mut repository = MockTestRepository::new();
        repository.expect_find_by_email().returning(|_, _| Ok(None));

        let service = service_with(repository);
        let result = service.change_password(&email(), "Fresh1!pass").await;

        assert!(matches!(result, Err(AuthError::PrincipalNotFound)));
    }
}
