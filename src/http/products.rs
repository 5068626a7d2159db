use axum::{extract::State, http::StatusCode, Json};

use crate::domain::query::{Page, ProductSortField};
use crate::domain::{Product, ProductDraft, ProductId, ProductPatch};
use crate::error::Result;
use crate::http::{AdminPrincipal, AppJson, AppPath, AppQuery, AppState, ListParams};

pub async fn list_products(State(s): State<AppState>, AppQuery(p): AppQuery<ListParams>) -> Result<Json<Page<Product>>> {
    let sort = p.sort::<ProductSortField>()?;
    Ok(Json(s.services.catalog.list_active(p.page_request(), sort).await?))
}

pub async fn get_product(State(s): State<AppState>, AppPath(id): AppPath<ProductId>) -> Result<Json<Product>> {
    Ok(Json(s.services.catalog.get(id).await?))
}

pub async fn create_product(
    State(s): State<AppState>,
    AdminPrincipal(admin): AdminPrincipal,
    AppJson(draft): AppJson<ProductDraft>,
) -> Result<(StatusCode, Json<Product>)> {
    Ok((StatusCode::CREATED, Json(s.services.catalog.create(&admin, draft).await?)))
}

pub async fn update_product(
    State(s): State<AppState>,
    AdminPrincipal(admin): AdminPrincipal,
    AppPath(id): AppPath<ProductId>,
    AppJson(patch): AppJson<ProductPatch>,
) -> Result<Json<Product>> {
    Ok(Json(s.services.catalog.update(&admin, id, patch).await?))
}

pub async fn delete_product(State(s): State<AppState>, AdminPrincipal(admin): AdminPrincipal, AppPath(id): AppPath<ProductId>) -> Result<StatusCode> {
    s.services.catalog.delete(&admin, id).await?;
    Ok(StatusCode::NO_CONTENT)
}
