//! Authentication primitives library
//!
//! Reusable, I/O-free building blocks for the identity service:
//! - Credential hashing (Argon2id) and the account password policy
//! - Signed bearer-token encoding and verification with typed claims
//!
//! The service crate composes these with its own stores and ports; nothing
//! here touches a database, clock configuration, or the network.
//!
//! # Examples
//!
//! ## Password hashing and policy
//! ```
//! use auth::{PasswordHasher, validate_policy};
//!
//! validate_policy("Abc12345!").unwrap();
//!
//! let hasher = PasswordHasher::new();
//! let digest = hasher.hash("Abc12345!").unwrap();
//! assert!(hasher.verify("Abc12345!", &digest).unwrap());
//! ```
//!
//! ## Tokens
//! ```
//! use auth::{Claims, PrincipalKind, Role, TokenCodec, TokenKind};
//!
//! let codec = TokenCodec::new(b"secret_key_at_least_32_bytes_long!");
//! let claims = Claims::issue(
//!     1,
//!     "Olena",
//!     PrincipalKind::User,
//!     Role::Customer,
//!     TokenKind::Access,
//!     chrono::Duration::minutes(30),
//! );
//! let token = codec.encode(&claims).unwrap();
//! assert_eq!(codec.decode(&token).unwrap(), claims);
//! ```

pub mod password;
pub mod token;

// Re-export commonly used items
pub use password::validate_policy;
pub use password::PasswordError;
pub use password::PasswordHasher;
pub use password::PolicyError;
pub use token::Claims;
pub use token::PrincipalKind;
pub use token::Role;
pub use token::TokenCodec;
pub use token::TokenError;
pub use token::TokenKind;
