use axum::{extract::State, http::StatusCode, Json};

use crate::domain::{Principal, ProfilePatch, UserSummary};
use crate::error::Result;
use crate::http::{AppJson, AppState, BearerToken};
use crate::services::auth::{AuthSession, LoginRequest, RegisterRequest};

pub async fn register(State(s): State<AppState>, AppJson(r): AppJson<RegisterRequest>) -> Result<(StatusCode, Json<AuthSession>)> {
    Ok((StatusCode::CREATED, Json(s.services.auth.register(r).await?)))
}

pub async fn login(State(s): State<AppState>, AppJson(r): AppJson<LoginRequest>) -> Result<Json<AuthSession>> {
    Ok(Json(s.services.auth.login(r).await?))
}

pub async fn logout(State(s): State<AppState>, BearerToken(token): BearerToken) -> Result<StatusCode> {
    s.services.auth.logout(&token).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn me(State(s): State<AppState>, principal: Principal) -> Result<Json<UserSummary>> {
    Ok(Json(s.services.auth.me(&principal).await?))
}

pub async fn update_profile(State(s): State<AppState>, principal: Principal, AppJson(patch): AppJson<ProfilePatch>) -> Result<Json<UserSummary>> {
    Ok(Json(s.services.auth.update_profile(&principal, patch).await?))
}
