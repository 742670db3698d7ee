use axum::http::StatusCode;
use axum::Extension;
use serde::Serialize;

use super::ApiError;
use super::ApiSuccess;
use crate::identity::gate::AuthorizedPrincipal;

/// Return the principal the role gate resolved for this request.
pub async fn me(
    Extension(principal): Extension<AuthorizedPrincipal>,
) -> Result<ApiSuccess<MeData>, ApiError> {
    Ok(ApiSuccess::new(StatusCode::OK, MeData::from(&principal)))
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MeData {
    pub id: i64,
    pub name: String,
    pub kind: String,
    pub role: String,
}

impl From<&AuthorizedPrincipal> for MeData {
    fn from(principal: &AuthorizedPrincipal) -> Self {
        Self {
            id: principal.id,
            name: principal.name.clone(),
            kind: principal.kind.to_string(),
            role: principal.role.to_string(),
        }
    }
}
