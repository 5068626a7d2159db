use axum::{extract::State, http::StatusCode, Json};

use crate::domain::query::{OrderSortField, Page};
use crate::domain::{Order, OrderId, OrderPatch, Principal};
use crate::error::Result;
use crate::http::{AdminPrincipal, AppJson, AppPath, AppQuery, AppState, ListParams};
use crate::services::CreateOrderRequest;

pub async fn list_orders(State(s): State<AppState>, principal: Principal, AppQuery(p): AppQuery<ListParams>) -> Result<Json<Page<Order>>> {
    let sort = p.sort::<OrderSortField>()?;
    Ok(Json(s.services.orders.list_for_user(&principal, p.page_request(), sort).await?))
}

pub async fn create_order(State(s): State<AppState>, principal: Principal, AppJson(r): AppJson<CreateOrderRequest>) -> Result<(StatusCode, Json<Order>)> {
    Ok((StatusCode::CREATED, Json(s.services.orders.create(&principal, r).await?)))
}

pub async fn get_order(State(s): State<AppState>, principal: Principal, AppPath(id): AppPath<OrderId>) -> Result<Json<Order>> {
    Ok(Json(s.services.orders.get_by_id(&principal, id).await?))
}

pub async fn update_order(
    State(s): State<AppState>,
    AdminPrincipal(admin): AdminPrincipal,
    AppPath(id): AppPath<OrderId>,
    AppJson(patch): AppJson<OrderPatch>,
) -> Result<Json<Order>> {
    Ok(Json(s.services.orders.update_status(&admin, id, patch).await?))
}

pub async fn delete_order(State(s): State<AppState>, AdminPrincipal(admin): AdminPrincipal, AppPath(id): AppPath<OrderId>) -> Result<StatusCode> {
    s.services.orders.delete(&admin, id).await?;
    Ok(StatusCode::NO_CONTENT)
}
