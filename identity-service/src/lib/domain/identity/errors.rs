use auth::PasswordError;
use auth::PolicyError;
use auth::TokenError;
use thiserror::Error;

use crate::identity::ports::MailerError;
use crate::identity::ports::RepositoryError;
use crate::identity::ports::StoreError;

/// Error for EmailAddress validation failures
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum EmailError {
    #[error("Invalid email format: {0}")]
    InvalidFormat(String),
}

/// Failure taxonomy of the identity core.
///
/// Every variant is a terminal, typed result surfaced to the caller
/// verbatim; transports map them onto status codes. The core performs no
/// retries; `ResolverUnavailable` is the only transient kind a caller may
/// reasonably retry.
#[derive(Debug, Clone, Error)]
pub enum AuthError {
    /// Wrong password or unknown identifier. The two are deliberately not
    /// distinguishable from the outside.
    #[error("Invalid email or password")]
    AuthenticationFailed,

    #[error("Account is blocked or inactive")]
    AccountInactive,

    #[error("Token is invalid: {0}")]
    TokenInvalid(String),

    #[error("Token has expired")]
    TokenExpired,

    #[error("Token has been revoked")]
    TokenRevoked,

    #[error("Role {0:?} is outside the allowed set")]
    InvalidRole(String),

    #[error("Access denied: insufficient role")]
    RoleForbidden,

    #[error("Principal not found")]
    PrincipalNotFound,

    #[error(transparent)]
    PasswordPolicyViolation(#[from] PolicyError),

    #[error("Invalid or expired reset token")]
    ResetTokenInvalidOrExpired,

    /// Transient: a collaborator did not answer in time.
    #[error("Principal resolution unavailable: {0}")]
    ResolverUnavailable(String),

    #[error("Email already registered: {0}")]
    EmailAlreadyExists(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<TokenError> for AuthError {
    fn from(err: TokenError) -> Self {
        match err {
            TokenError::Expired => AuthError::TokenExpired,
            TokenError::InvalidRole(role) => AuthError::InvalidRole(role),
            TokenError::Invalid(msg) => AuthError::TokenInvalid(msg),
            TokenError::EncodingFailed(msg) | TokenError::UnsupportedAlgorithm(msg) => {
                AuthError::Internal(msg)
            }
        }
    }
}

impl From<PasswordError> for AuthError {
    fn from(err: PasswordError) -> Self {
        AuthError::Internal(err.to_string())
    }
}

impl From<RepositoryError> for AuthError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::Unavailable(msg) => AuthError::ResolverUnavailable(msg),
            RepositoryError::EmailAlreadyExists(email) => AuthError::EmailAlreadyExists(email),
            RepositoryError::Database(msg) => AuthError::Internal(msg),
        }
    }
}

impl From<StoreError> for AuthError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Unavailable(msg) => AuthError::ResolverUnavailable(msg),
        }
    }
}

impl From<MailerError> for AuthError {
    fn from(err: MailerError) -> Self {
        AuthError::Internal(err.to_string())
    }
}
