//! Admin dashboard aggregation and impersonation

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use std::sync::Arc;

use crate::domain::stats::{trailing_year_start, AdminStats};
use crate::domain::{Principal, UserId, UserSummary};
use crate::error::{AppError, Result};
use crate::services::{require_admin, AuthService};
use crate::store::{OrderRepository, ProductRepository, Stores, UserRepository};

const IMPERSONATION_TTL_HOURS: i64 = 1;

#[derive(Debug, Clone, Serialize)]
pub struct Impersonation {
    pub token: String,
    pub expires_at: DateTime<Utc>,
    pub user: UserSummary,
}

pub struct AdminService {
    users: Arc<dyn UserRepository>,
    products: Arc<dyn ProductRepository>,
    orders: Arc<dyn OrderRepository>,
    auth: Arc<AuthService>,
}

impl AdminService {
    pub fn new(stores: &Stores, auth: Arc<AuthService>) -> Self {
        Self { users: stores.users.clone(), products: stores.products.clone(), orders: stores.orders.clone(), auth }
    }

    /// Dashboard counters. Revenue and the monthly series count paid orders
    /// only; the series covers the twelve months before `now`.
    pub async fn stats(&self, principal: &Principal, now: DateTime<Utc>) -> Result<AdminStats> {
        require_admin(principal)?;
        let (total_users, total_orders, total_products, total_revenue, monthly_sales, order_status_breakdown) = tokio::try_join!(
            self.users.count(),
            self.orders.count(),
            self.products.count(),
            self.orders.paid_revenue(),
            self.orders.monthly_paid_sales(trailing_year_start(now)),
            self.orders.status_breakdown(),
        )?;
        Ok(AdminStats { total_users, total_orders, total_products, total_revenue, monthly_sales, order_status_breakdown })
    }

    /// Mint a short-lived token that acts as `target`.
    pub async fn impersonate(&self, principal: &Principal, target: UserId) -> Result<Impersonation> {
        require_admin(principal)?;
        let user = self.users.find_by_id(target).await?.ok_or(AppError::NotFound("User"))?;
        if user.is_admin() {
            return Err(AppError::forbidden("admins cannot be impersonated"));
        }
        let issued = self.auth.issue_token(user.id, Some(principal.user_id), Duration::hours(IMPERSONATION_TTL_HOURS)).await?;
        tracing::warn!(admin_id = %principal.user_id, user_id = %user.id, "impersonation token issued");
        Ok(Impersonation { token: issued.token, expires_at: issued.expires_at, user: user.summary() })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{
        Email, Order, OrderLine, OrderPatch, OrderStatus, PaymentMethod, PaymentStatus, Product, ProductDraft, Role,
        ShippingAddress, User,
    };
    use crate::services::auth::test_settings;
    use chrono::TimeZone;
    use rust_decimal::Decimal;

    fn service(stores: &Stores) -> AdminService {
        AdminService::new(stores, Arc::new(AuthService::new(stores, test_settings())))
    }

    fn admin() -> Principal { Principal::new(UserId::generate(), Role::Admin) }

    async fn user(stores: &Stores, email: &str, role: Role) -> User {
        let user = User::register("Lee", "", Email::parse(email).unwrap(), "hash".into(), role).unwrap();
        stores.users.insert(&user).await.unwrap();
        user
    }

    fn order(user_id: UserId, cents: i64, paid: bool) -> Order {
        let product = Product::create(ProductDraft { name: "Desk".into(), price: Decimal::new(cents, 2), ..Default::default() }).unwrap();
        let line = OrderLine { product_id: product.id, name: product.name, quantity: 1, unit_price: product.price };
        let address = ShippingAddress {
            full_name: "L".into(), street: "S".into(), city: "C".into(), state: "T".into(),
            postal_code: "P".into(), country: "N".into(), phone: "0".into(),
        };
        let mut order = Order::place(user_id, vec![line], address, PaymentMethod::Card).unwrap();
        if paid {
            order.apply(&OrderPatch { status: Some(OrderStatus::Delivered), payment_status: Some(PaymentStatus::Paid) });
        }
        order
    }

    #[tokio::test]
    async fn test_stats_with_no_orders() {
        let stores = Stores::in_memory();
        user(&stores, "a@example.com", Role::Customer).await;
        let stats = service(&stores).stats(&admin(), Utc::now()).await.unwrap();
        assert_eq!(stats.total_users, 1);
        assert_eq!(stats.total_orders, 0);
        assert_eq!(stats.total_revenue, Decimal::ZERO);
        assert!(stats.monthly_sales.is_empty());
    }

    #[tokio::test]
    async fn test_revenue_counts_paid_orders_only() {
        let stores = Stores::in_memory();
        let buyer = user(&stores, "b@example.com", Role::Customer).await;
        stores.orders.insert(&order(buyer.id, 1000, true)).await.unwrap();
        stores.orders.insert(&order(buyer.id, 2500, true)).await.unwrap();
        stores.orders.insert(&order(buyer.id, 9900, false)).await.unwrap();

        let now = Utc::now();
        let stats = service(&stores).stats(&admin(), now).await.unwrap();
        assert_eq!(stats.total_orders, 3);
        assert_eq!(stats.total_revenue, Decimal::new(3500, 2));
        assert_eq!(stats.monthly_sales.len(), 1);
        assert_eq!(stats.monthly_sales[0].count, 2);
        assert_eq!(stats.monthly_sales[0].total, Decimal::new(3500, 2));

        let later = Utc.with_ymd_and_hms(2099, 1, 1, 0, 0, 0).unwrap();
        assert!(service(&stores).stats(&admin(), later).await.unwrap().monthly_sales.is_empty());
    }

    #[tokio::test]
    async fn test_impersonation() {
        let stores = Stores::in_memory();
        let boss = user(&stores, "boss@example.com", Role::Admin).await;
        let target = user(&stores, "c@example.com", Role::Customer).await;
        let acting = Principal::new(boss.id, Role::Admin);
        let admin_service = service(&stores);

        assert!(matches!(admin_service.impersonate(&acting, boss.id).await, Err(AppError::Forbidden(_))));
        assert!(matches!(admin_service.impersonate(&acting, UserId::generate()).await, Err(AppError::NotFound(_))));

        let grant = admin_service.impersonate(&acting, target.id).await.unwrap();
        let auth = AuthService::new(&stores, test_settings());
        let principal = auth.authenticate(&grant.token).await.unwrap();
        assert_eq!(principal.user_id, target.id);
        assert_eq!(principal.impersonator, Some(boss.id));
        assert!(!principal.is_admin());
        assert!(grant.expires_at <= Utc::now() + Duration::hours(1));
    }
}
