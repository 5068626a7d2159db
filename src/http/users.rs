use axum::{extract::State, http::StatusCode, Json};

use crate::domain::{UserId, UserPatch, UserSummary};
use crate::error::Result;
use crate::http::{AdminPrincipal, AppJson, AppPath, AppState};

pub async fn list_users(State(s): State<AppState>, AdminPrincipal(admin): AdminPrincipal) -> Result<Json<Vec<UserSummary>>> {
    Ok(Json(s.services.users.list(&admin).await?))
}

pub async fn update_user(
    State(s): State<AppState>,
    AdminPrincipal(admin): AdminPrincipal,
    AppPath(id): AppPath<UserId>,
    AppJson(patch): AppJson<UserPatch>,
) -> Result<Json<UserSummary>> {
    Ok(Json(s.services.users.update(&admin, id, patch).await?))
}

pub async fn delete_user(State(s): State<AppState>, AdminPrincipal(admin): AdminPrincipal, AppPath(id): AppPath<UserId>) -> Result<StatusCode> {
    s.services.users.delete(&admin, id).await?;
    Ok(StatusCode::NO_CONTENT)
}
