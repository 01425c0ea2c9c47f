//! Read-only sales aggregation over PAID orders of a tenant.

use crate::{
    db::DbPool,
    entities::order::{self, OrderStatus},
    entities::{order_item, product},
    errors::ServiceError,
};
use chrono::{DateTime, Datelike, Duration, NaiveDate, Utc};
use rust_decimal::{Decimal, RoundingStrategy};
use sea_orm::{ColumnTrait, EntityTrait, JoinType, QueryFilter, QuerySelect, RelationTrait};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use tracing::instrument;
use uuid::Uuid;

pub const DAY_BUCKETS: usize = 30;
pub const MONTH_BUCKETS: usize = 12;
pub const TOP_PRODUCTS: usize = 10;
pub const TOP_PRODUCTS_WINDOW_DAYS: i64 = 30;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DailySales {
    pub date: NaiveDate,
    pub total_sales: Decimal,
    pub order_count: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MonthlySales {
    pub year: i32,
    pub month: u32,
    pub total_sales: Decimal,
    pub order_count: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TopProduct {
    pub product_id: Uuid,
    pub product_name: String,
    pub quantity_sold: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SalesSummary {
    pub total_orders: u64,
    pub total_sales: Decimal,
    pub average_order_value: Decimal,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderAnalytics {
    pub sales_by_day: Vec<DailySales>,
    pub sales_by_month: Vec<MonthlySales>,
    pub top_products: Vec<TopProduct>,
    pub summary: SalesSummary,
}

/// A PAID order reduced to what the aggregations need.
#[derive(Debug, Clone, Copy)]
pub struct Sale {
    pub created_at: DateTime<Utc>,
    pub total: Decimal,
}

/// One order line sold inside the top-products window.
#[derive(Debug, Clone)]
pub struct SoldLine {
    pub product_id: Uuid,
    pub product_name: String,
    pub quantity: i32,
}

/// Most recent `limit` days that had sales, newest first.
pub fn sales_by_day(sales: &[Sale], limit: usize) -> Vec<DailySales> {
    let mut buckets: BTreeMap<NaiveDate, (Decimal, u64)> = BTreeMap::new();
    for sale in sales {
        let bucket = buckets.entry(sale.created_at.date_naive()).or_default();
        bucket.0 += sale.total;
        bucket.1 += 1;
    }

    buckets
        .into_iter()
        .rev()
        .take(limit)
        .map(|(date, (total_sales, order_count))| DailySales {
            date,
            total_sales,
            order_count,
        })
        .collect()
}

/// Most recent `limit` months that had sales, newest first.
pub fn sales_by_month(sales: &[Sale], limit: usize) -> Vec<MonthlySales> {
    let mut buckets: BTreeMap<(i32, u32), (Decimal, u64)> = BTreeMap::new();
    for sale in sales {
        let key = (sale.created_at.year(), sale.created_at.month());
        let bucket = buckets.entry(key).or_default();
        bucket.0 += sale.total;
        bucket.1 += 1;
    }

    buckets
        .into_iter()
        .rev()
        .take(limit)
        .map(|((year, month), (total_sales, order_count))| MonthlySales {
            year,
            month,
            total_sales,
            order_count,
        })
        .collect()
}

/// Products by quantity sold, descending; ties broken by name.
pub fn top_products(lines: Vec<SoldLine>, limit: usize) -> Vec<TopProduct> {
    let mut totals: HashMap<Uuid, TopProduct> = HashMap::new();
    for line in lines {
        totals
            .entry(line.product_id)
            .or_insert_with(|| TopProduct {
                product_id: line.product_id,
                product_name: line.product_name,
                quantity_sold: 0,
            })
            .quantity_sold += i64::from(line.quantity);
    }

    let mut ranked: Vec<TopProduct> = totals.into_values().collect();
    ranked.sort_by(|a, b| {
        b.quantity_sold
            .cmp(&a.quantity_sold)
            .then_with(|| a.product_name.cmp(&b.product_name))
            .then_with(|| a.product_id.cmp(&b.product_id))
    });
    ranked.truncate(limit);
    ranked
}

pub fn summarize(sales: &[Sale]) -> SalesSummary {
    let total_orders = sales.len() as u64;
    let total_sales: Decimal = sales.iter().map(|s| s.total).sum();
    let average_order_value = if total_orders == 0 {
        Decimal::ZERO
    } else {
        (total_sales / Decimal::from(total_orders))
            .round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
    };

    SalesSummary {
        total_orders,
        total_sales,
        average_order_value,
    }
}

#[derive(Clone, Debug)]
pub struct AnalyticsService {
    db_pool: Arc<DbPool>,
}

impl AnalyticsService {
    pub fn new(db_pool: Arc<DbPool>) -> Self {
        Self { db_pool }
    }

    #[instrument(skip(self))]
    pub async fn order_analytics(&self, tenant_id: Uuid) -> Result<OrderAnalytics, ServiceError> {
        let db = &*self.db_pool;

        let sales: Vec<Sale> = order::Entity::find()
            .filter(order::Column::TenantId.eq(tenant_id))
            .filter(order::Column::Status.eq(OrderStatus::Paid))
            .all(db)
            .await?
            .into_iter()
            .map(|o| Sale {
                created_at: o.created_at,
                total: o.total,
            })
            .collect();

        let window_start = Utc::now() - Duration::days(TOP_PRODUCTS_WINDOW_DAYS);
        let lines: Vec<SoldLine> = order_item::Entity::find()
            .join(JoinType::InnerJoin, order_item::Relation::Order.def())
            .filter(order::Column::TenantId.eq(tenant_id))
            .filter(order::Column::Status.eq(OrderStatus::Paid))
            .filter(order::Column::CreatedAt.gte(window_start))
            .find_also_related(product::Entity)
            .all(db)
            .await?
            .into_iter()
            .map(|(item, product)| SoldLine {
                product_id: item.product_id,
                product_name: product.map(|p| p.name).unwrap_or_default(),
                quantity: item.quantity,
            })
            .collect();

        Ok(OrderAnalytics {
            sales_by_day: sales_by_day(&sales, DAY_BUCKETS),
            sales_by_month: sales_by_month(&sales, MONTH_BUCKETS),
            top_products: top_products(lines, TOP_PRODUCTS),
            summary: summarize(&sales),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use rust_decimal_macros::dec;

    fn sale(y: i32, m: u32, d: u32, total: Decimal) -> Sale {
        Sale {
            created_at: Utc.with_ymd_and_hms(y, m, d, 12, 0, 0).unwrap(),
            total,
        }
    }

    #[test]
    fn day_buckets_are_newest_first_and_limited() {
        let sales = vec![
            sale(2026, 10, 1, dec!(5.00)),
            sale(2026, 10, 3, dec!(2.50)),
            sale(2026, 10, 3, dec!(1.25)),
            sale(2026, 9, 30, dec!(9.00)),
        ];
        let days = sales_by_day(&sales, 2);
        assert_eq!(days.len(), 2);
        assert_eq!(days[0].date, NaiveDate::from_ymd_opt(2026, 10, 3).unwrap());
        assert_eq!(days[0].total_sales, dec!(3.75));
        assert_eq!(days[0].order_count, 2);
        assert_eq!(days[1].date, NaiveDate::from_ymd_opt(2026, 10, 1).unwrap());
    }

    #[test]
    fn month_buckets_cross_year_boundary() {
        let sales = vec![
            sale(2025, 12, 31, dec!(10.00)),
            sale(2026, 1, 2, dec!(4.00)),
            sale(2026, 1, 20, dec!(6.00)),
        ];
        let months = sales_by_month(&sales, 12);
        assert_eq!(
            months
                .iter()
                .map(|m| (m.year, m.month, m.total_sales, m.order_count))
                .collect::<Vec<_>>(),
            vec![(2026, 1, dec!(10.00), 2), (2025, 12, dec!(10.00), 1)]
        );
    }

    #[test]
    fn top_products_rank_by_quantity_then_name() {
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        let c = Uuid::new_v4();
        let line = |product_id, name: &str, quantity| SoldLine {
            product_id,
            product_name: name.to_string(),
            quantity,
        };
        let ranked = top_products(
            vec![
                line(a, "Bread", 2),
                line(b, "Apples", 3),
                line(c, "Milk", 1),
                line(a, "Bread", 1),
            ],
            2,
        );
        assert_eq!(ranked.len(), 2);
        assert_eq!(ranked[0].product_name, "Apples");
        assert_eq!(ranked[1].product_name, "Bread");
        assert_eq!(ranked[1].quantity_sold, 3);
    }

    #[test]
    fn summary_average_is_rounded_and_zero_when_empty() {
        let empty = summarize(&[]);
        assert_eq!(empty.total_orders, 0);
        assert_eq!(empty.average_order_value, Decimal::ZERO);

        let summary = summarize(&[
            sale(2026, 1, 1, dec!(10.00)),
            sale(2026, 1, 2, dec!(10.00)),
            sale(2026, 1, 3, dec!(10.01)),
        ]);
        assert_eq!(summary.total_orders, 3);
        assert_eq!(summary.total_sales, dec!(30.01));
        assert_eq!(summary.average_order_value, dec!(10.00));
    }
}
