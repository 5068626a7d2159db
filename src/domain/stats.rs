//! Admin dashboard aggregates

use chrono::{DateTime, Datelike, Months, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use std::collections::BTreeMap;
use crate::domain::aggregates::OrderStatus;
use crate::domain::value_objects::ValueError;

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct AdminStats {
    pub total_users: u64,
    pub total_orders: u64,
    pub total_products: u64,
    pub total_revenue: Decimal,
    pub monthly_sales: Vec<MonthlySales>,
    pub order_status_breakdown: Vec<StatusCount>,
}

/// Paid revenue for one calendar month.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct MonthlySales {
    pub year: i32,
    pub month: u32,
    pub total: Decimal,
    pub count: u64,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct StatusCount {
    pub status: OrderStatus,
    pub count: u64,
}

/// Start of the trailing twelve-month window ending at `now`.
pub fn trailing_year_start(now: DateTime<Utc>) -> DateTime<Utc> {
    now.checked_sub_months(Months::new(12)).unwrap_or(DateTime::<Utc>::MIN_UTC)
}

/// Bucket `(created_at, total)` pairs by calendar year and month, ascending.
pub fn bucket_monthly<I>(sales: I) -> Result<Vec<MonthlySales>, ValueError>
where
    I: IntoIterator<Item = (DateTime<Utc>, Decimal)>,
{
    let mut buckets: BTreeMap<(i32, u32), (Decimal, u64)> = BTreeMap::new();
    for (at, amount) in sales {
        let entry = buckets.entry((at.year(), at.month())).or_insert((Decimal::ZERO, 0));
        entry.0 = entry.0.checked_add(amount).ok_or(ValueError::AmountOverflow)?;
        entry.1 += 1;
    }
    Ok(buckets
        .into_iter()
        .map(|((year, month), (total, count))| MonthlySales { year, month, total, count })
        .collect())
}
