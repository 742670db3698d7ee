use std::collections::HashMap;
use std::sync::Arc;
use std::sync::Mutex;
use std::time::Duration as StdDuration;

use async_trait::async_trait;
use auth::PasswordHasher;
use auth::PrincipalKind;
use auth::Role;
use auth::TokenCodec;
use chrono::Duration;
use identity_service::identity::gate::RoleGate;
use identity_service::identity::models::AccountUser;
use identity_service::identity::models::EmailAddress;
use identity_service::identity::models::NewAccountUser;
use identity_service::identity::models::Principal;
use identity_service::identity::models::StaffMechanic;
use identity_service::identity::ports::Mailer;
use identity_service::identity::ports::MailerError;
use identity_service::identity::ports::PrincipalRepository;
use identity_service::identity::ports::RepositoryError;
use identity_service::identity::resolver::PrincipalResolver;
use identity_service::identity::revocation::RevocationStore;
use identity_service::identity::service::IdentityService;
use identity_service::identity::service::TokenPolicy;
use identity_service::outbound::stores::InMemoryEphemeralStore;

pub const SECRET: &[u8] = b"integration_secret_32_bytes_long!!";

/// Mutable in-memory stand-in for the persistence collaborator.
pub struct InMemoryPrincipalRepository {
    users: Mutex<HashMap<i64, AccountUser>>,
    mechanics: Mutex<HashMap<i64, StaffMechanic>>,
}

impl InMemoryPrincipalRepository {
    pub fn new() -> Self {
        Self {
            users: Mutex::new(HashMap::new()),
            mechanics: Mutex::new(HashMap::new()),
        }
    }

    pub fn insert_user(&self, user: AccountUser) {
        self.users.lock().unwrap().insert(user.id, user);
    }

    pub fn insert_mechanic(&self, mechanic: StaffMechanic) {
        self.mechanics.lock().unwrap().insert(mechanic.id, mechanic);
    }

    pub fn remove_user(&self, id: i64) {
        self.users.lock().unwrap().remove(&id);
    }

    pub fn set_user_active(&self, id: i64, is_active: bool) {
        if let Some(user) = self.users.lock().unwrap().get_mut(&id) {
            user.is_active = is_active;
        }
    }

    pub fn user(&self, id: i64) -> Option<AccountUser> {
        self.users.lock().unwrap().get(&id).cloned()
    }
}

#[async_trait]
impl PrincipalRepository for InMemoryPrincipalRepository {
    async fn find_by_id(
        &self,
        kind: PrincipalKind,
        id: i64,
    ) -> Result<Option<Principal>, RepositoryError> {
        match kind {
            PrincipalKind::User => Ok(self
                .users
                .lock()
                .unwrap()
                .get(&id)
                .cloned()
                .map(Principal::AccountUser)),
            PrincipalKind::Mechanic => Ok(self
                .mechanics
                .lock()
                .unwrap()
                .get(&id)
                .cloned()
                .map(Principal::StaffMechanic)),
        }
    }

    async fn find_by_email(
        &self,
        kind: PrincipalKind,
        email: &str,
    ) -> Result<Option<Principal>, RepositoryError> {
        match kind {
            PrincipalKind::User => Ok(self
                .users
                .lock()
                .unwrap()
                .values()
                .find(|u| u.email.as_str() == email)
                .cloned()
                .map(Principal::AccountUser)),
            PrincipalKind::Mechanic => Ok(self
                .mechanics
                .lock()
                .unwrap()
                .values()
                .find(|m| m.email.as_str() == email)
                .cloned()
                .map(Principal::StaffMechanic)),
        }
    }

    async fn update_credential_hash(
        &self,
        kind: PrincipalKind,
        id: i64,
        new_hash: &str,
    ) -> Result<(), RepositoryError> {
        match kind {
            PrincipalKind::User => {
                let mut users = self.users.lock().unwrap();
                let user = users
                    .get_mut(&id)
                    .ok_or_else(|| RepositoryError::Database("no user row".to_string()))?;
                user.credential_hash = new_hash.to_string();
            }
            PrincipalKind::Mechanic => {
                let mut mechanics = self.mechanics.lock().unwrap();
                let mechanic = mechanics
                    .get_mut(&id)
                    .ok_or_else(|| RepositoryError::Database("no mechanic row".to_string()))?;
                mechanic.credential_hash = new_hash.to_string();
            }
        }
        Ok(())
    }

    async fn create_user(&self, new_user: NewAccountUser) -> Result<AccountUser, RepositoryError> {
        let mut users = self.users.lock().unwrap();

        if users
            .values()
            .any(|u| u.email.as_str() == new_user.email.as_str())
        {
            return Err(RepositoryError::EmailAlreadyExists(
                new_user.email.as_str().to_string(),
            ));
        }

        let id = users.keys().max().copied().unwrap_or(0) + 1;
        let user = AccountUser {
            id,
            full_name: new_user.full_name,
            email: new_user.email,
            credential_hash: new_user.credential_hash,
            role: new_user.role,
            is_active: true,
            last_login: None,
        };
        users.insert(id, user.clone());
        Ok(user)
    }

    async fn record_login(&self, kind: PrincipalKind, id: i64) -> Result<(), RepositoryError> {
        if kind == PrincipalKind::User {
            if let Some(user) = self.users.lock().unwrap().get_mut(&id) {
                user.last_login = Some(chrono::Utc::now());
            }
        }
        Ok(())
    }

    async fn admin_exists(&self) -> Result<bool, RepositoryError> {
        Ok(self
            .users
            .lock()
            .unwrap()
            .values()
            .any(|u| u.role == Role::Admin))
    }
}

/// Mailer double that records what would have been delivered.
pub struct RecordingMailer {
    sent: Mutex<Vec<(String, String, String)>>,
}

impl RecordingMailer {
    pub fn new() -> Self {
        Self {
            sent: Mutex::new(Vec::new()),
        }
    }

    pub fn sent_count(&self) -> usize {
        self.sent.lock().unwrap().len()
    }

    pub fn last_body(&self) -> Option<String> {
        self.sent
            .lock()
            .unwrap()
            .last()
            .map(|(_, _, body)| body.clone())
    }
}

#[async_trait]
impl Mailer for RecordingMailer {
    async fn send(&self, to: &str, subject: &str, body: &str) -> Result<(), MailerError> {
        self.sent
            .lock()
            .unwrap()
            .push((to.to_string(), subject.to_string(), body.to_string()));
        Ok(())
    }
}

pub type TestService =
    IdentityService<InMemoryPrincipalRepository, InMemoryEphemeralStore, RecordingMailer>;
pub type TestGate = RoleGate<InMemoryPrincipalRepository, InMemoryEphemeralStore>;

/// Fully wired identity core over in-memory collaborators.
pub struct TestHarness {
    pub repository: Arc<InMemoryPrincipalRepository>,
    pub store: Arc<InMemoryEphemeralStore>,
    pub mailer: Arc<RecordingMailer>,
    pub service: TestService,
    pub gate: TestGate,
    pub codec: TokenCodec,
}

impl TestHarness {
    pub fn new() -> Self {
        Self::with_cache_ttl(StdDuration::from_secs(300))
    }

    pub fn with_cache_ttl(cache_ttl: StdDuration) -> Self {
        let repository = Arc::new(InMemoryPrincipalRepository::new());
        let store = Arc::new(InMemoryEphemeralStore::new());
        let mailer = Arc::new(RecordingMailer::new());
        let codec = Arc::new(TokenCodec::new(SECRET));

        let policy = TokenPolicy {
            access_ttl: Duration::minutes(30),
            refresh_ttl: Duration::days(7),
            reset_ttl: StdDuration::from_secs(900),
            revocation_ttl: StdDuration::from_secs(7 * 24 * 3600),
        };

        let service = IdentityService::new(
            Arc::clone(&repository),
            Arc::clone(&store),
            Arc::clone(&mailer),
            Arc::clone(&codec),
            policy.clone(),
            "https://example.com/auth/reset-password".to_string(),
        );

        let gate = RoleGate::new(
            Arc::clone(&codec),
            RevocationStore::new(Arc::clone(&store), policy.revocation_ttl),
            PrincipalResolver::new(Arc::clone(&repository), StdDuration::from_secs(1)),
            Arc::clone(&store),
            cache_ttl,
        );

        Self {
            repository,
            store,
            mailer,
            service,
            gate,
            codec: TokenCodec::new(SECRET),
        }
    }

    pub fn seed_user(&self, id: i64, email: &str, password: &str, role: Role) -> AccountUser {
        let user = AccountUser {
            id,
            full_name: format!("User {}", id),
            email: EmailAddress::new(email.to_string()).unwrap(),
            credential_hash: PasswordHasher::new().hash(password).unwrap(),
            role,
            is_active: true,
            last_login: None,
        };
        self.repository.insert_user(user.clone());
        user
    }

    pub fn seed_mechanic(&self, id: i64, email: &str, password: &str) -> StaffMechanic {
        let mechanic = StaffMechanic {
            id,
            name: format!("Mechanic {}", id),
            email: EmailAddress::new(email.to_string()).unwrap(),
            credential_hash: PasswordHasher::new().hash(password).unwrap(),
            role: Role::Mechanic,
            position: "Senior mechanic".to_string(),
            is_active: true,
        };
        self.repository.insert_mechanic(mechanic.clone());
        mechanic
    }

    pub fn email(raw: &str) -> EmailAddress {
        EmailAddress::new(raw.to_string()).unwrap()
    }

    /// Pull the reset token out of the last recorded mail body.
    pub fn mailed_reset_token(&self) -> String {
        let body = self.mailer.last_body().expect("no mail recorded");
        body.split("?token=")
            .nth(1)
            .expect("no token in mail body")
            .trim()
            .to_string()
    }
}
