use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use serde::Deserialize;
use serde::Serialize;

use super::ApiError;
use super::ApiSuccess;
use crate::identity::models::EmailAddress;
use crate::identity::reset::RESET_ACK;
use crate::inbound::http::router::AppState;

/// Request a password-reset link.
///
/// The response body is identical whether or not the email is registered.
pub async fn password_recovery(
    State(state): State<AppState>,
    Json(body): Json<PasswordRecoveryRequestBody>,
) -> Result<ApiSuccess<RecoveryAckData>, ApiError> {
    let email = EmailAddress::new(body.email)
        .map_err(|e| ApiError::UnprocessableEntity(e.to_string()))?;

    state
        .identity_service
        .request_password_reset(&email)
        .await
        .map_err(ApiError::from)?;

    Ok(ApiSuccess::new(
        StatusCode::OK,
        RecoveryAckData {
            message: RESET_ACK.to_string(),
        },
    ))
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct PasswordRecoveryRequestBody {
    email: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RecoveryAckData {
    pub message: String,
}
