use jsonwebtoken::decode;
use jsonwebtoken::encode;
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::Algorithm;
use jsonwebtoken::DecodingKey;
use jsonwebtoken::EncodingKey;
use jsonwebtoken::Header;
use jsonwebtoken::Validation;
use serde::Deserialize;

use super::claims::Claims;
use super::claims::PrincipalKind;
use super::claims::Role;
use super::claims::TokenKind;
use super::errors::TokenError;

/// Raw wire payload, deserialized only after the signature has been checked.
///
/// Role and the two discriminators stay strings here so that an out-of-enum
/// role can be reported as its own failure instead of a generic parse error.
#[derive(Debug, Deserialize)]
struct RawClaims {
    sub: i64,
    name: String,
    ptype: String,
    role: String,
    kind: String,
    iat: i64,
    exp: i64,
}

/// Signed-claims codec over the HMAC family of algorithms.
///
/// Encoding is deterministic for identical inputs apart from `iat`; decoding
/// verifies signature and structure before trusting any claim value,
/// including the token kind.
pub struct TokenCodec {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    algorithm: Algorithm,
}

impl TokenCodec {
    /// Create a codec signing with HS256.
    ///
    /// The secret should be at least 32 bytes and come from configuration,
    /// never from source.
    pub fn new(secret: &[u8]) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(secret),
            decoding_key: DecodingKey::from_secret(secret),
            algorithm: Algorithm::HS256,
        }
    }

    /// Create a codec with a configured HMAC algorithm.
    ///
    /// # Errors
    /// * `UnsupportedAlgorithm` - anything outside HS256/HS384/HS512
    pub fn with_algorithm(secret: &[u8], algorithm: Algorithm) -> Result<Self, TokenError> {
        if !matches!(
            algorithm,
            Algorithm::HS256 | Algorithm::HS384 | Algorithm::HS512
        ) {
            return Err(TokenError::UnsupportedAlgorithm(format!("{:?}", algorithm)));
        }

        Ok(Self {
            encoding_key: EncodingKey::from_secret(secret),
            decoding_key: DecodingKey::from_secret(secret),
            algorithm,
        })
    }

    /// Sign a claims set into a compact token string.
    ///
    /// # Errors
    /// * `EncodingFailed` - serialization or signing failed
    pub fn encode(&self, claims: &Claims) -> Result<String, TokenError> {
        let header = Header::new(self.algorithm);

        encode(&header, claims, &self.encoding_key)
            .map_err(|e| TokenError::EncodingFailed(e.to_string()))
    }

    /// Verify and decode a token string.
    ///
    /// # Errors
    /// * `Invalid` - signature verification fails or the structure is malformed
    /// * `Expired` - the expiry instant has passed
    /// * `InvalidRole` - the decoded role is outside the closed role set
    pub fn decode(&self, token: &str) -> Result<Claims, TokenError> {
        let mut validation = Validation::new(self.algorithm);
        // Expiry must cut over exactly at `exp`, without clock-skew grace.
        validation.leeway = 0;

        let raw = decode::<RawClaims>(token, &self.decoding_key, &validation)
            .map_err(|e| match e.kind() {
                ErrorKind::ExpiredSignature => TokenError::Expired,
                _ => TokenError::Invalid(e.to_string()),
            })?
            .claims;

        // `leeway = 0` rejects exp < now; the boundary instant itself is
        // also out.
        if chrono::Utc::now().timestamp() >= raw.exp {
            return Err(TokenError::Expired);
        }

        let role: Role = raw
            .role
            .parse()
            .map_err(|_| TokenError::InvalidRole(raw.role.clone()))?;
        let principal: PrincipalKind = raw
            .ptype
            .parse()
            .map_err(|_| TokenError::Invalid(format!("unknown principal type {:?}", raw.ptype)))?;
        let kind: TokenKind = raw
            .kind
            .parse()
            .map_err(|_| TokenError::Invalid(format!("unknown token kind {:?}", raw.kind)))?;

        Ok(Claims {
            sub: raw.sub,
            name: raw.name,
            principal,
            role,
            kind,
            iat: raw.iat,
            exp: raw.exp,
        })
    }
}
