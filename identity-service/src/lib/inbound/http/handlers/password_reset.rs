use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use serde::Deserialize;
use serde::Serialize;

use super::ApiError;
use super::ApiSuccess;
use crate::inbound::http::router::AppState;

pub async fn password_reset(
    State(state): State<AppState>,
    Json(body): Json<PasswordResetRequestBody>,
) -> Result<ApiSuccess<ResetAckData>, ApiError> {
    state
        .identity_service
        .confirm_password_reset(&body.token, &body.new_password)
        .await
        .map_err(ApiError::from)?;

    Ok(ApiSuccess::new(
        StatusCode::OK,
        ResetAckData {
            message: "Password has been reset successfully. Please log in again.".to_string(),
        },
    ))
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct PasswordResetRequestBody {
    token: String,
    new_password: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResetAckData {
    pub message: String,
}
