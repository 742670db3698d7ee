use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use serde::Deserialize;
use serde::Serialize;

use super::ApiError;
use super::ApiSuccess;
use crate::identity::models::EmailAddress;
use crate::identity::models::Principal;
use crate::identity::models::RegisterCommand;
use crate::inbound::http::router::AppState;

pub async fn register(
    State(state): State<AppState>,
    Json(body): Json<RegisterRequestBody>,
) -> Result<ApiSuccess<RegisteredUserData>, ApiError> {
    let email = EmailAddress::new(body.email)
        .map_err(|e| ApiError::UnprocessableEntity(e.to_string()))?;

    let principal = state
        .identity_service
        .register(RegisterCommand {
            full_name: body.name,
            email,
            password: body.password,
        })
        .await
        .map_err(ApiError::from)?;

    Ok(ApiSuccess::new(
        StatusCode::CREATED,
        RegisteredUserData::from(&principal),
    ))
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct RegisterRequestBody {
    name: String,
    email: String,
    password: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RegisteredUserData {
    pub id: i64,
    pub name: String,
    pub email: String,
    pub role: String,
}

impl From<&Principal> for RegisteredUserData {
    fn from(principal: &Principal) -> Self {
        Self {
            id: principal.id(),
            name: principal.display_name().to_string(),
            email: principal.email().as_str().to_string(),
            role: principal.role().to_string(),
        }
    }
}
