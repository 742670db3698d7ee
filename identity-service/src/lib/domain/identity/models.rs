use std::fmt;
use std::str::FromStr;

use auth::Claims;
use auth::PrincipalKind;
use auth::Role;
use auth::TokenKind;
use chrono::DateTime;
use chrono::Duration;
use chrono::Utc;

use crate::identity::errors::EmailError;

/// An authenticated identity.
///
/// Polymorphic over the two identity stores. The discriminator written into
/// issued tokens comes from the variant tag, never from inspecting which
/// fields a value happens to carry.
#[derive(Debug, Clone)]
pub enum Principal {
    AccountUser(AccountUser),
    StaffMechanic(StaffMechanic),
}

/// A registered customer-facing account.
#[derive(Debug, Clone)]
pub struct AccountUser {
    pub id: i64,
    pub full_name: String,
    pub email: EmailAddress,
    pub credential_hash: String,
    pub role: Role,
    pub is_active: bool,
    pub last_login: Option<DateTime<Utc>>,
}

/// A service-staff account from the mechanics store.
#[derive(Debug, Clone)]
pub struct StaffMechanic {
    pub id: i64,
    pub name: String,
    pub email: EmailAddress,
    pub credential_hash: String,
    pub role: Role,
    pub position: String,
    pub is_active: bool,
}

impl Principal {
    pub fn id(&self) -> i64 {
        match self {
            Principal::AccountUser(u) => u.id,
            Principal::StaffMechanic(m) => m.id,
        }
    }

    pub fn kind(&self) -> PrincipalKind {
        match self {
            Principal::AccountUser(_) => PrincipalKind::User,
            Principal::StaffMechanic(_) => PrincipalKind::Mechanic,
        }
    }

    pub fn role(&self) -> Role {
        match self {
            Principal::AccountUser(u) => u.role,
            Principal::StaffMechanic(m) => m.role,
        }
    }

    pub fn display_name(&self) -> &str {
        match self {
            Principal::AccountUser(u) => &u.full_name,
            Principal::StaffMechanic(m) => &m.name,
        }
    }

    pub fn email(&self) -> &EmailAddress {
        match self {
            Principal::AccountUser(u) => &u.email,
            Principal::StaffMechanic(m) => &m.email,
        }
    }

    pub fn credential_hash(&self) -> &str {
        match self {
            Principal::AccountUser(u) => &u.credential_hash,
            Principal::StaffMechanic(m) => &m.credential_hash,
        }
    }

    pub fn is_active(&self) -> bool {
        match self {
            Principal::AccountUser(u) => u.is_active,
            Principal::StaffMechanic(m) => m.is_active,
        }
    }

    /// Build a claims set for this principal, expiring `ttl` from now.
    pub fn issue_claims(&self, kind: TokenKind, ttl: Duration) -> Claims {
        Claims::issue(
            self.id(),
            self.display_name(),
            self.kind(),
            self.role(),
            kind,
            ttl,
        )
    }
}

/// Email address value type.
///
/// Validated with an RFC 5322 compliant parser and normalized to lowercase,
/// so lookups are case-insensitive by construction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmailAddress(String);

impl EmailAddress {
    /// Create a new validated, lowercased email address.
    ///
    /// # Errors
    /// * `InvalidFormat` - input does not conform to RFC 5322
    pub fn new(email: String) -> Result<Self, EmailError> {
        email_address::EmailAddress::from_str(&email)
            .map(|_| EmailAddress(email.to_lowercase()))
            .map_err(|e| EmailError::InvalidFormat(e.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for EmailAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// A freshly issued access/refresh token pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
}

/// Command to register a new customer account.
///
/// The role is not part of the command; registration always produces a
/// customer.
#[derive(Debug)]
pub struct RegisterCommand {
    pub full_name: String,
    pub email: EmailAddress,
    pub password: String,
}

/// A user row to be inserted by the persistence collaborator.
#[derive(Debug, Clone)]
pub struct NewAccountUser {
    pub full_name: String,
    pub email: EmailAddress,
    pub credential_hash: String,
    pub role: Role,
}

#[cfg(test)]
mod tests {
    use super::*;

    pub fn sample_user() -> AccountUser {
        AccountUser {
            id: 1,
            full_name: "Olena Kovalenko".to_string(),
            email: EmailAddress::new("olena@example.com".to_string()).unwrap(),
            credential_hash: "digest".to_string(),
            role: Role::Customer,
            is_active: true,
            last_login: None,
        }
    }

    pub fn sample_mechanic() -> StaffMechanic {
        StaffMechanic {
            id: 9,
            name: "Taras Bondar".to_string(),
            email: EmailAddress::new("taras@example.com".to_string()).unwrap(),
            credential_hash: "digest".to_string(),
            role: Role::Mechanic,
            position: "Senior mechanic".to_string(),
            is_active: true,
        }
    }

    #[test]
    fn test_discriminator_follows_variant() {
        let user = Principal::AccountUser(sample_user());
        let mechanic = Principal::StaffMechanic(sample_mechanic());

        let user_claims = user.issue_claims(TokenKind::Access, Duration::minutes(5));
        let mechanic_claims = mechanic.issue_claims(TokenKind::Access, Duration::minutes(5));

        assert_eq!(user_claims.principal, PrincipalKind::User);
        assert_eq!(mechanic_claims.principal, PrincipalKind::Mechanic);
        assert_eq!(user_claims.role, Role::Customer);
        assert_eq!(mechanic_claims.role, Role::Mechanic);
    }

    #[test]
    fn test_email_is_lowercased() {
        let email = EmailAddress::new("Olena@Example.COM".to_string()).unwrap();
        assert_eq!(email.as_str(), "olena@example.com");
    }

    #[test]
    fn test_invalid_email_rejected() {
        assert!(EmailAddress::new("not-an-email".to_string()).is_err());
    }
}
