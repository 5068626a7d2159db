use axum::{extract::State, http::StatusCode, Json};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::{Cart, CartItem, CartLine, Money, Principal, ProductId, UserId};
use crate::error::{AppError, Result};
use crate::http::{AppJson, AppPath, AppState};

/// Cart as returned to clients, with its subtotal at `price_at_add`.
#[derive(Debug, Serialize)]
pub struct CartView {
    pub user_id: UserId,
    pub items: Vec<CartItem>,
    pub subtotal: Money,
    pub revision: u64,
    pub updated_at: DateTime<Utc>,
}

impl TryFrom<Cart> for CartView {
    type Error = AppError;

    fn try_from(cart: Cart) -> Result<Self> {
        Ok(Self {
            user_id: cart.user_id(),
            subtotal: cart.subtotal()?,
            revision: cart.revision(),
            updated_at: cart.updated_at(),
            items: cart.items().to_vec(),
        })
    }
}

#[derive(Debug, Deserialize)]
pub struct SetCartRequest {
    pub items: Vec<CartLine>,
    /// Revision last read by the client; makes the write conditional.
    #[serde(default)]
    pub revision: Option<u64>,
}

#[derive(Debug, Deserialize)]
pub struct SetQuantityRequest {
    pub quantity: u32,
}

pub async fn get_cart(State(s): State<AppState>, principal: Principal) -> Result<Json<CartView>> {
    Ok(Json(CartView::try_from(s.services.carts.get(&principal).await?)?))
}

pub async fn set_cart(State(s): State<AppState>, principal: Principal, AppJson(r): AppJson<SetCartRequest>) -> Result<Json<CartView>> {
    Ok(Json(CartView::try_from(s.services.carts.set_items(&principal, r.items, r.revision).await?)?))
}

pub async fn clear_cart(State(s): State<AppState>, principal: Principal) -> Result<StatusCode> {
    s.services.carts.clear(&principal).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn add_item(State(s): State<AppState>, principal: Principal, AppPath(product_id): AppPath<ProductId>) -> Result<Json<CartView>> {
    Ok(Json(CartView::try_from(s.services.carts.add_one(&principal, product_id).await?)?))
}

pub async fn set_item_quantity(
    State(s): State<AppState>,
    principal: Principal,
    AppPath(product_id): AppPath<ProductId>,
    AppJson(r): AppJson<SetQuantityRequest>,
) -> Result<Json<CartView>> {
    Ok(Json(CartView::try_from(s.services.carts.set_quantity(&principal, product_id, r.quantity).await?)?))
}

pub async fn remove_item(State(s): State<AppState>, principal: Principal, AppPath(product_id): AppPath<ProductId>) -> Result<Json<CartView>> {
    Ok(Json(CartView::try_from(s.services.carts.remove(&principal, product_id).await?)?))
}
