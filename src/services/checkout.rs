//! Checkout: turn the caller's cart into an order, then clear the cart.
//!
//! The order is the source of truth. Only the cart revision the order was
//! built from is cleared; edits made meanwhile survive. A cart that cannot be
//! cleared is left behind and emptied on the next cart read.

use serde::Deserialize;
use std::sync::Arc;

use crate::domain::checkout::Checkout;
use crate::domain::{Order, PaymentMethod, Principal, ShippingAddress};
use crate::error::{AppError, Result};
use crate::services::{CartService, OrderService};

const CLEAR_ATTEMPTS: u32 = 2;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CheckoutRequest {
    #[serde(default, alias = "shippingAddress")]
    pub shipping_address: ShippingAddress,
    #[serde(default, alias = "paymentMethod")]
    pub payment_method: PaymentMethod,
}

pub struct CheckoutService {
    carts: Arc<CartService>,
    orders: Arc<OrderService>,
}

impl CheckoutService {
    pub fn new(carts: Arc<CartService>, orders: Arc<OrderService>) -> Self {
        Self { carts, orders }
    }

    pub async fn checkout(&self, principal: &Principal, request: CheckoutRequest) -> Result<Order> {
        let mut flow = Checkout::new();
        let cart = self.carts.get(principal).await?;
        let frozen = flow.submit(&cart, request.shipping_address)?;
        tracing::info!(user_id = %principal.user_id, revision = frozen.revision, lines = frozen.lines.len(), state = flow.state().name(), "checkout submitted");

        let frozen_revision = frozen.revision;
        let lines = frozen.lines.iter().map(|(id, qty)| (*id, i64::from(*qty))).collect();
        let order = match self.orders.place(principal, lines, frozen.shipping_address, request.payment_method, Some(frozen.revision)).await {
            Ok(order) => order,
            Err(err) => {
                flow.fail(err.to_string())?;
                tracing::warn!(user_id = %principal.user_id, error = %err, state = flow.state().name(), "checkout failed, cart kept");
                return Err(err);
            }
        };

        self.clear_cart(principal, frozen_revision).await;
        flow.succeed(&order)?;
        tracing::info!(user_id = %principal.user_id, order_id = %order.id(), state = flow.state().name(), "checkout complete");
        Ok(order)
    }

    async fn clear_cart(&self, principal: &Principal, revision: u64) {
        for attempt in 1..=CLEAR_ATTEMPTS {
            match self.carts.clear_consumed(principal, revision).await {
                Ok(true) => return,
                Ok(false) | Err(AppError::Conflict(_)) => {
                    tracing::info!(user_id = %principal.user_id, revision, "cart changed during checkout, kept");
                    return;
                }
                Err(err) => tracing::warn!(user_id = %principal.user_id, attempt, error = %err, "cart clear failed"),
            }
        }
        tracing::warn!(user_id = %principal.user_id, "cart left in place, it will be discarded on next read");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::query::{OrderSortField, Page, PageRequest, Sort};
    use crate::domain::stats::{MonthlySales, StatusCount};
    use crate::domain::{Cart, CartLine, OrderId, Product, ProductDraft, ProductId, Role, UserId};
    use crate::messaging::EventPublisher;
    use crate::store::{CartRepository, MemoryStore, MockOrderRepository, OrderRepository, StoreError, StoreResult, Stores};
    use async_trait::async_trait;
    use chrono::{DateTime, Utc};
    use rust_decimal::Decimal;
    use std::sync::atomic::{AtomicU32, Ordering};

    /// Cart store whose first `failures` attempts to empty a cart fail.
    struct FlakyCarts {
        inner: MemoryStore,
        failures: AtomicU32,
    }

    #[async_trait]
    impl CartRepository for FlakyCarts {
        async fn find(&self, user_id: UserId) -> StoreResult<Option<Cart>> { CartRepository::find(&self.inner, user_id).await }
        async fn upsert(&self, cart: &Cart, expected: Option<u64>) -> StoreResult<()> {
            if cart.is_empty() && self.failures.fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1)).is_ok() {
                return Err(StoreError::Query("connection reset".into()));
            }
            self.inner.upsert(cart, expected).await
        }
    }

    /// Order store that lets another tab edit the cart while the order is written.
    struct EditDuringInsert {
        inner: MemoryStore,
        carts: Arc<CartService>,
        product: ProductId,
    }

    #[async_trait]
    impl OrderRepository for EditDuringInsert {
        async fn insert(&self, order: &Order) -> StoreResult<()> {
            let me = Principal::new(order.user_id(), Role::Customer);
            self.carts.add_one(&me, self.product).await.map_err(|e| StoreError::Query(e.to_string()))?;
            OrderRepository::insert(&self.inner, order).await
        }
        async fn update(&self, order: &Order) -> StoreResult<()> { OrderRepository::update(&self.inner, order).await }
        async fn find_by_id(&self, id: OrderId) -> StoreResult<Option<Order>> { OrderRepository::find_by_id(&self.inner, id).await }
        async fn list(&self, user_id: Option<UserId>, page: PageRequest, sort: Sort<OrderSortField>) -> StoreResult<Page<Order>> {
            OrderRepository::list(&self.inner, user_id, page, sort).await
        }
        async fn latest_for_user(&self, user_id: UserId) -> StoreResult<Option<Order>> { self.inner.latest_for_user(user_id).await }
        async fn delete(&self, id: OrderId) -> StoreResult<bool> { OrderRepository::delete(&self.inner, id).await }
        async fn count(&self) -> StoreResult<u64> { OrderRepository::count(&self.inner).await }
        async fn paid_revenue(&self) -> StoreResult<Decimal> { self.inner.paid_revenue().await }
        async fn monthly_paid_sales(&self, since: DateTime<Utc>) -> StoreResult<Vec<MonthlySales>> { self.inner.monthly_paid_sales(since).await }
        async fn status_breakdown(&self) -> StoreResult<Vec<StatusCount>> { self.inner.status_breakdown().await }
    }

    fn services(stores: &Stores) -> (Arc<CartService>, CheckoutService) {
        let carts = Arc::new(CartService::new(stores, EventPublisher::disabled()));
        let orders = Arc::new(OrderService::new(stores, EventPublisher::disabled()));
        (carts.clone(), CheckoutService::new(carts, orders))
    }

    async fn stock(stores: &Stores) -> Product {
        let product = Product::create(ProductDraft { name: "Tea".into(), price: Decimal::new(4, 0), stock: 10, ..Default::default() }).unwrap();
        stores.products.insert(&product).await.unwrap();
        product
    }

    fn request() -> CheckoutRequest {
        CheckoutRequest {
            shipping_address: ShippingAddress {
                full_name: "Grace Hopper".into(), street: "1 Navy Way".into(), city: "Arlington".into(), state: "VA".into(),
                postal_code: "22202".into(), country: "US".into(), phone: "555".into(),
            },
            payment_method: PaymentMethod::CashOnDelivery,
        }
    }

    fn customer() -> Principal { Principal::new(UserId::generate(), Role::Customer) }

    #[tokio::test]
    async fn test_checkout_creates_order_and_clears_cart() {
        let stores = Stores::in_memory();
        let (carts, checkout) = services(&stores);
        let tea = stock(&stores).await;
        let me = customer();
        let cart = carts.set_items(&me, vec![CartLine { product_id: tea.id, quantity: 3 }], None).await.unwrap();

        let order = checkout.checkout(&me, request()).await.unwrap();
        assert_eq!(order.total_amount().amount(), Decimal::new(12, 0));
        assert_eq!(order.cart_revision(), Some(cart.revision()));
        let stored = stores.carts.find(me.user_id).await.unwrap().unwrap();
        assert!(stored.is_empty());
        assert_eq!(stored.revision(), cart.revision() + 1);
    }

    #[tokio::test]
    async fn test_empty_cart_and_missing_address_are_rejected() {
        let stores = Stores::in_memory();
        let (carts, checkout) = services(&stores);
        let me = customer();
        assert!(matches!(checkout.checkout(&me, request()).await, Err(AppError::Validation(_))));

        let tea = stock(&stores).await;
        carts.add_one(&me, tea.id).await.unwrap();
        let mut no_phone = request();
        no_phone.shipping_address.phone.clear();
        assert!(matches!(checkout.checkout(&me, no_phone).await, Err(AppError::Validation(_))));
        assert_eq!(carts.get(&me).await.unwrap().quantity_of(&tea.id), Some(1));
    }

    #[tokio::test]
    async fn test_order_failure_leaves_cart_untouched() {
        let memory = Stores::in_memory();
        let tea = stock(&memory).await;
        let me = customer();

        let mut orders = MockOrderRepository::new();
        orders.expect_latest_for_user().returning(|_| Ok(None));
        orders.expect_insert().times(1).returning(|_| Err(StoreError::Query("disk full".into())));
        let stores = Stores { orders: Arc::new(orders), ..memory };
        let (carts, checkout) = services(&stores);
        carts.set_items(&me, vec![CartLine { product_id: tea.id, quantity: 2 }], None).await.unwrap();

        assert!(matches!(checkout.checkout(&me, request()).await, Err(AppError::Store(_))));
        let cart = stores.carts.find(me.user_id).await.unwrap().unwrap();
        assert_eq!(cart.quantity_of(&tea.id), Some(2));
    }

    #[tokio::test]
    async fn test_failed_clear_still_succeeds_and_reconciles() {
        let memory = Stores::in_memory();
        let flaky = Arc::new(FlakyCarts { inner: MemoryStore::default(), failures: AtomicU32::new(CLEAR_ATTEMPTS) });
        let stores = Stores { carts: flaky.clone(), ..memory };
        let (carts, checkout) = services(&stores);
        let tea = stock(&stores).await;
        let me = customer();
        carts.add_one(&me, tea.id).await.unwrap();

        let order = checkout.checkout(&me, request()).await.unwrap();
        assert!(!stores.carts.find(me.user_id).await.unwrap().unwrap().is_empty());
        assert_eq!(flaky.failures.load(Ordering::SeqCst), 0);

        assert!(carts.get(&me).await.unwrap().is_empty());
        assert!(stores.carts.find(me.user_id).await.unwrap().unwrap().is_empty());
        assert_eq!(stores.orders.find_by_id(order.id()).await.unwrap().unwrap().id(), order.id());
    }

    #[tokio::test]
    async fn test_edit_during_checkout_survives() {
        let memory = Stores::in_memory();
        let tea = stock(&memory).await;
        let me = customer();
        let editor = Arc::new(CartService::new(&memory, EventPublisher::disabled()));
        let orders = EditDuringInsert { inner: MemoryStore::default(), carts: editor, product: tea.id };
        let stores = Stores { orders: Arc::new(orders), ..memory };
        let (carts, checkout) = services(&stores);
        carts.set_items(&me, vec![CartLine { product_id: tea.id, quantity: 2 }], None).await.unwrap();

        let order = checkout.checkout(&me, request()).await.unwrap();
        assert_eq!(order.items()[0].quantity, 2);
        // the unit added mid-checkout is still there, on top of the ordered two
        assert_eq!(carts.get(&me).await.unwrap().quantity_of(&tea.id), Some(3));
    }
}
