pub mod claims;
pub mod codec;
pub mod errors;

pub use claims::Claims;
pub use claims::PrincipalKind;
pub use claims::Role;
pub use claims::TokenKind;
pub use codec::TokenCodec;
pub use errors::TokenError;
