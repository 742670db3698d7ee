use std::sync::Arc;
use std::time::Duration;

use auth::PrincipalKind;
use auth::Role;
use auth::TokenCodec;
use auth::TokenKind;
use chrono::Utc;
use serde::Deserialize;
use serde::Serialize;

use crate::identity::errors::AuthError;
use crate::identity::models::Principal;
use crate::identity::ports::EphemeralStore;
use crate::identity::ports::PrincipalRepository;
use crate::identity::resolver::PrincipalResolver;
use crate::identity::revocation::RevocationStore;

const CACHE_KEY_PREFIX: &str = "authz:";

/// Snapshot of a principal that passed the role gate.
///
/// Carried in request extensions by the HTTP layer and serialized into the
/// result cache. `exp` is the expiry instant of the token the snapshot was
/// derived from, so a cache hit can re-check expiry without decoding.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthorizedPrincipal {
    pub id: i64,
    pub kind: PrincipalKind,
    pub role: Role,
    pub name: String,
    pub exp: i64,
}

impl AuthorizedPrincipal {
    fn from_principal(principal: &Principal, exp: i64) -> Self {
        Self {
            id: principal.id(),
            kind: principal.kind(),
            role: principal.role(),
            name: principal.display_name().to_string(),
            exp,
        }
    }
}

/// Authorizes a bearer token against a required role set.
///
/// The pipeline order is fixed: decode (signature + expiry + structure),
/// then the revocation denylist, then principal resolution, then role
/// membership. Revocation strictly after decode and strictly before the role
/// is trusted; a replayed, stolen, but unexpired token is rejected once its
/// owner logs out.
///
/// Outcomes are cached per (role set, token) with a short TTL. A cache hit
/// never skips the token-level checks: the stored expiry is compared against
/// now and the denylist is always consulted. Only resolution and the role
/// re-check are skipped, so a principal deleted or deactivated after a
/// successful authorization may stay trusted for up to the cache TTL. The
/// cache is an optimization only; read or write failures fall back to the
/// full pipeline and never change outcomes.
pub struct RoleGate<R, S>
where
    R: PrincipalRepository,
    S: EphemeralStore,
{
    codec: Arc<TokenCodec>,
    revocation: RevocationStore<S>,
    resolver: PrincipalResolver<R>,
    cache: Arc<S>,
    cache_ttl: Duration,
}

impl<R, S> RoleGate<R, S>
where
    R: PrincipalRepository,
    S: EphemeralStore,
{
    pub fn new(
        codec: Arc<TokenCodec>,
        revocation: RevocationStore<S>,
        resolver: PrincipalResolver<R>,
        cache: Arc<S>,
        cache_ttl: Duration,
    ) -> Self {
        Self {
            codec,
            revocation,
            resolver,
            cache,
            cache_ttl,
        }
    }

    fn cache_key(allowed: &[Role], token: &str) -> String {
        let mut names: Vec<&str> = allowed.iter().map(Role::as_str).collect();
        names.sort_unstable();
        names.dedup();
        format!("{}{}:{}", CACHE_KEY_PREFIX, names.join("+"), token)
    }

    /// Authorize `token` against `allowed`, returning the principal snapshot.
    ///
    /// # Errors
    /// * `TokenInvalid` / `TokenExpired` / `InvalidRole` - decode failures
    /// * `TokenRevoked` - a live denylist marker exists for the token
    /// * `PrincipalNotFound` / `ResolverUnavailable` - resolution failures
    /// * `AccountInactive` - the principal is blocked
    /// * `RoleForbidden` - the principal's role is outside `allowed`
    pub async fn authorize(
        &self,
        token: &str,
        allowed: &[Role],
    ) -> Result<AuthorizedPrincipal, AuthError> {
        let key = Self::cache_key(allowed, token);

        if let Some(hit) = self.cached(&key).await {
            if Utc::now().timestamp() >= hit.exp {
                return Err(AuthError::TokenExpired);
            }
            if self.revocation.is_revoked(token).await? {
                return Err(AuthError::TokenRevoked);
            }
            return Ok(hit);
        }

        let claims = self.codec.decode(token)?;
        if claims.kind != TokenKind::Access {
            return Err(AuthError::TokenInvalid(format!(
                "{} token presented where an access token is required",
                claims.kind
            )));
        }

        if self.revocation.is_revoked(token).await? {
            return Err(AuthError::TokenRevoked);
        }

        let principal = self.resolver.resolve(&claims).await?;
        if !principal.is_active() {
            return Err(AuthError::AccountInactive);
        }

        if !allowed.contains(&principal.role()) {
            return Err(AuthError::RoleForbidden);
        }

        let authorized = AuthorizedPrincipal::from_principal(&principal, claims.exp);
        self.record(&key, &authorized).await;

        Ok(authorized)
    }

    async fn cached(&self, key: &str) -> Option<AuthorizedPrincipal> {
        match self.cache.get(key).await {
            Ok(Some(json)) => serde_json::from_str(&json).ok(),
            Ok(None) => None,
            Err(e) => {
                tracing::debug!(error = %e, "Role cache read failed; running full verification");
                None
            }
        }
    }

    async fn record(&self, key: &str, authorized: &AuthorizedPrincipal) {
        let json = match serde_json::to_string(authorized) {
            Ok(json) => json,
            Err(e) => {
                tracing::warn!(error = %e, "Failed to serialize authorization outcome");
                return;
            }
        };

        if let Err(e) = self.cache.set_with_ttl(key, &json, self.cache_ttl).await {
            tracing::warn!(error = %e, "Failed to record authorization outcome in cache");
        }
    }
}
