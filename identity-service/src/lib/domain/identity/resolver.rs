use std::sync::Arc;
use std::time::Duration;

use auth::Claims;

use crate::identity::errors::AuthError;
use crate::identity::models::Principal;
use crate::identity::ports::PrincipalRepository;

/// Maps a verified claims set back to a concrete principal.
///
/// Dispatches on the claims discriminator to the matching identity store.
/// Existence is checked on every resolution; a principal deleted since
/// token issuance loses access at the next request, not at token expiry.
pub struct PrincipalResolver<R: PrincipalRepository> {
    repository: Arc<R>,
    timeout: Duration,
}

impl<R: PrincipalRepository> PrincipalResolver<R> {
    pub fn new(repository: Arc<R>, timeout: Duration) -> Self {
        Self { repository, timeout }
    }

    /// Resolve the subject of `claims`.
    ///
    /// # Errors
    /// * `PrincipalNotFound` - the subject id no longer exists in its store
    /// * `ResolverUnavailable` - lookup timed out or the datastore did not
    ///   answer; distinct from not-found so callers can retry
    pub async fn resolve(&self, claims: &Claims) -> Result<Principal, AuthError> {
        let lookup = self.repository.find_by_id(claims.principal, claims.sub);

        tokio::time::timeout(self.timeout, lookup)
            .await
            .map_err(|_| {
                AuthError::ResolverUnavailable(format!(
                    "principal lookup timed out after {:?}",
                    self.timeout
                ))
            })?
            .map_err(AuthError::from)?
            .ok_or(AuthError::PrincipalNotFound)
    }
}

impl<R: PrincipalRepository> Clone for PrincipalResolver<R> {
    fn clone(&self) -> Self {
        Self {
            repository: Arc::clone(&self.repository),
            timeout: self.timeout,
        }
    }
}
