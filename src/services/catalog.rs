//! Product catalog service

use std::sync::Arc;

use crate::domain::events::{DomainEvent, ProductEvent};
use crate::domain::query::{Page, PageRequest, ProductSortField, Sort};
use crate::domain::{Principal, Product, ProductDraft, ProductId, ProductPatch};
use crate::error::{AppError, Result};
use crate::messaging::EventPublisher;
use crate::services::require_admin;
use crate::store::{ProductRepository, Stores};

pub struct CatalogService {
    products: Arc<dyn ProductRepository>,
    events: EventPublisher,
}

impl CatalogService {
    pub fn new(stores: &Stores, events: EventPublisher) -> Self {
        Self { products: stores.products.clone(), events }
    }

    pub async fn list_active(&self, page: PageRequest, sort: Sort<ProductSortField>) -> Result<Page<Product>> {
        Ok(self.products.list_active(page, sort).await?)
    }

    pub async fn get(&self, id: ProductId) -> Result<Product> {
        self.products.find_by_id(id).await?.ok_or(AppError::NotFound("Product"))
    }

    pub async fn create(&self, principal: &Principal, draft: ProductDraft) -> Result<Product> {
        require_admin(principal)?;
        let product = Product::create(draft)?;
        self.products.insert(&product).await?;
        tracing::info!(product_id = %product.id, name = %product.name, "product created");
        self.events.publish(DomainEvent::Product(ProductEvent::Created { product_id: product.id, name: product.name.clone() })).await;
        Ok(product)
    }

    pub async fn update(&self, principal: &Principal, id: ProductId, patch: ProductPatch) -> Result<Product> {
        require_admin(principal)?;
        let mut product = self.get(id).await?;
        product.apply(patch)?;
        self.products.update(&product).await?;
        self.events.publish(DomainEvent::Product(ProductEvent::Updated { product_id: id })).await;
        Ok(product)
    }

    pub async fn delete(&self, principal: &Principal, id: ProductId) -> Result<()> {
        require_admin(principal)?;
        if !self.products.delete(id).await? { return Err(AppError::NotFound("Product")); }
        tracing::info!(product_id = %id, "product deleted");
        self.events.publish(DomainEvent::Product(ProductEvent::Deleted { product_id: id })).await;
        Ok(())
    }
}
