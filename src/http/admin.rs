use axum::{extract::State, Json};
use chrono::Utc;

use crate::domain::stats::AdminStats;
use crate::domain::UserId;
use crate::error::Result;
use crate::http::{AdminPrincipal, AppPath, AppState};
use crate::services::admin::Impersonation;

pub async fn stats(State(s): State<AppState>, AdminPrincipal(admin): AdminPrincipal) -> Result<Json<AdminStats>> {
    Ok(Json(s.services.admin.stats(&admin, Utc::now()).await?))
}

pub async fn impersonate(State(s): State<AppState>, AdminPrincipal(admin): AdminPrincipal, AppPath(id): AppPath<UserId>) -> Result<Json<Impersonation>> {
    Ok(Json(s.services.admin.impersonate(&admin, id).await?))
}
