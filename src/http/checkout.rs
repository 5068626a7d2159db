use axum::{extract::State, http::StatusCode, Json};

use crate::domain::{Order, Principal};
use crate::error::Result;
use crate::http::{AppJson, AppState};
use crate::services::CheckoutRequest;

pub async fn checkout(State(s): State<AppState>, principal: Principal, AppJson(r): AppJson<CheckoutRequest>) -> Result<(StatusCode, Json<Order>)> {
    Ok((StatusCode::CREATED, Json(s.services.checkout.checkout(&principal, r).await?)))
}
