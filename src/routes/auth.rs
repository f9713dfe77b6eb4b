use axum::{extract::rejection::JsonRejection, extract::State, Json};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::{
    auth::{password, Actor},
    error::{AppError, AppResult},
    routes::envelope::{ok, Reply},
    state::AppState,
};

#[derive(Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginResponse {
    pub access_token: String,
    pub token_type: String,
    pub expires_in: i64,
    pub user: Actor,
}

pub async fn login(
    State(state): State<AppState>,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> AppResult<Reply<LoginResponse>> {
    let Json(payload) = payload?;

    let (user, password_hash) = state
        .directory
        .credentials(payload.email.trim())
        .await?
        .ok_or_else(AppError::unauthorized)?;

    let valid = password::verify_password(&payload.password, &password_hash)
        .map_err(|_| AppError::unauthorized())?;

    if !valid {
        return Err(AppError::unauthorized());
    }

    let access_token = state.jwt.generate_token(&user).map_err(AppError::from)?;
    info!(user_id = %user.id, user_type = %user.user_type, "user logged in");

    Ok(ok(LoginResponse {
        access_token,
        token_type: "Bearer".to_string(),
        expires_in: state.jwt.expiry_seconds(),
        user: Actor {
            user_id: user.id,
            email: user.email,
            name: user.name,
            user_type: user.user_type,
            company: user.company,
            verified: user.verified,
            is_approved: user.is_approved,
        },
    }))
}

pub async fn me(actor: Actor) -> Reply<Actor> {
    ok(actor)
}
