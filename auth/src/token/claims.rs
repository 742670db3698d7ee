use std::fmt;
use std::str::FromStr;

use chrono::Duration;
use chrono::Utc;
use serde::Deserialize;
use serde::Serialize;

/// Closed set of roles a principal can hold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Customer,
    Mechanic,
    Admin,
}

impl Role {
    pub const ALL: [Role; 3] = [Role::Customer, Role::Mechanic, Role::Admin];

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Customer => "customer",
            Role::Mechanic => "mechanic",
            Role::Admin => "admin",
        }
    }
}

impl FromStr for Role {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "customer" => Ok(Role::Customer),
            "mechanic" => Ok(Role::Mechanic),
            "admin" => Ok(Role::Admin),
            _ => Err(()),
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Discriminator for the identity store a subject lives in.
///
/// Written explicitly at encode time from the principal variant, never
/// inferred from which fields happen to be present.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PrincipalKind {
    User,
    Mechanic,
}

impl PrincipalKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            PrincipalKind::User => "user",
            PrincipalKind::Mechanic => "mechanic",
        }
    }
}

impl FromStr for PrincipalKind {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "user" => Ok(PrincipalKind::User),
            "mechanic" => Ok(PrincipalKind::Mechanic),
            _ => Err(()),
        }
    }
}

impl fmt::Display for PrincipalKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The three token kinds issued by the codec.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenKind {
    Access,
    Refresh,
    Reset,
}

impl TokenKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TokenKind::Access => "access",
            TokenKind::Refresh => "refresh",
            TokenKind::Reset => "reset",
        }
    }
}

impl FromStr for TokenKind {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "access" => Ok(TokenKind::Access),
            "refresh" => Ok(TokenKind::Refresh),
            "reset" => Ok(TokenKind::Reset),
            _ => Err(()),
        }
    }
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Decoded payload of a signed token.
///
/// `iat` and `exp` are absolute UTC Unix timestamps; `exp` is computed once
/// at issuance from the configured TTL, never carried as a relative offset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    /// Subject identifier within the principal's identity store.
    pub sub: i64,

    /// Display name of the subject.
    pub name: String,

    /// Identity store the subject belongs to.
    #[serde(rename = "ptype")]
    pub principal: PrincipalKind,

    /// Role held by the subject at issuance.
    pub role: Role,

    /// Token kind (access, refresh, or reset).
    pub kind: TokenKind,

    /// Issued at (Unix timestamp).
    pub iat: i64,

    /// Expiration time (Unix timestamp).
    pub exp: i64,
}

impl Claims {
    /// Build a claims set expiring `ttl` from now.
    pub fn issue(
        sub: i64,
        name: impl Into<String>,
        principal: PrincipalKind,
        role: Role,
        kind: TokenKind,
        ttl: Duration,
    ) -> Self {
        let now = Utc::now();

        Self {
            sub,
            name: name.into(),
            principal,
            role,
            kind,
            iat: now.timestamp(),
            exp: (now + ttl).timestamp(),
        }
    }

    /// Whether the claims are expired at `now` (a Unix timestamp).
    pub fn is_expired(&self, now: i64) -> bool {
        now >= self.exp
    }
}
