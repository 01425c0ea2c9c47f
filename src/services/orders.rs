use crate::{
    db::{finish_transaction, with_deadline, DbPool},
    entities::order::{self, OrderStatus},
    entities::{order_item, product},
    errors::ServiceError,
    services::inventory::{find_live_product, InventoryLedger, StockLease, StockPolicy},
    services::money::{line_amount, validate_amount, MAX_AMOUNT},
    services::order_numbering::OrderNumberGenerator,
};
use chrono::{DateTime, Utc};
use metrics::{counter, histogram};
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseTransaction, EntityTrait, QueryFilter, QueryOrder, Set,
    TransactionTrait,
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{info, instrument, warn};
use uuid::Uuid;
use validator::Validate;

/// One cart line as submitted by the till.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct CartLine {
    pub product_id: Uuid,
    #[validate(range(min = 1, message = "Quantity must be positive"))]
    pub quantity: i32,
    #[validate(custom = "validate_amount")]
    pub unit_price: Decimal,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct NewOrder {
    pub lines: Vec<CartLine>,
    #[validate(length(min = 1, max = 64, message = "Payment method is required"))]
    pub payment_method: String,
    #[serde(default)]
    #[validate(custom = "validate_amount")]
    pub discount: Decimal,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderTotals {
    pub subtotal: Decimal,
    pub discount: Decimal,
    pub total: Decimal,
}

/// `subtotal = Σ unit_price × quantity`, `total = subtotal − discount`.
/// The discount is not clamped against the subtotal. A subtotal that does
/// not fit a money column is a validation error.
pub fn compute_totals(lines: &[CartLine], discount: Decimal) -> Result<OrderTotals, ServiceError> {
    let too_large = || ServiceError::ValidationError("Order subtotal is too large".to_string());

    let mut subtotal = Decimal::ZERO;
    for line in lines {
        let amount = line_amount(line.unit_price, line.quantity).ok_or_else(too_large)?;
        subtotal = subtotal.checked_add(amount).ok_or_else(too_large)?;
    }
    if subtotal > MAX_AMOUNT {
        return Err(too_large());
    }
    let total = subtotal.checked_sub(discount).ok_or_else(too_large)?;

    Ok(OrderTotals {
        subtotal,
        discount,
        total,
    })
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderLineDetails {
    pub id: Uuid,
    pub line_no: i32,
    pub product_id: Uuid,
    pub product_name: Option<String>,
    pub quantity: i32,
    pub unit_price: Decimal,
    pub line_total: Decimal,
}

impl OrderLineDetails {
    fn from_item(item: order_item::Model, product_name: Option<String>) -> Self {
        Self {
            line_total: item.line_total(),
            id: item.id,
            line_no: item.line_no,
            product_id: item.product_id,
            product_name,
            quantity: item.quantity,
            unit_price: item.unit_price,
        }
    }
}

/// An order joined with its lines and their product names.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderDetails {
    #[serde(flatten)]
    pub order: order::Model,
    pub items: Vec<OrderLineDetails>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderSummary {
    pub id: Uuid,
    pub order_number: String,
    pub total: Decimal,
    pub status: OrderStatus,
    pub payment_method: String,
    pub created_at: DateTime<Utc>,
}

impl From<order::Model> for OrderSummary {
    fn from(order: order::Model) -> Self {
        Self {
            id: order.id,
            order_number: order.order_number,
            total: order.total,
            status: order.status,
            payment_method: order.payment_method,
            created_at: order.created_at,
        }
    }
}

/// Places orders: header, lines and stock decrements commit together or
/// not at all.
#[derive(Clone, Debug)]
pub struct OrderService {
    db_pool: Arc<DbPool>,
    ledger: Arc<InventoryLedger>,
    numbers: OrderNumberGenerator,
    transaction_timeout: Duration,
}

impl OrderService {
    pub fn new(
        db_pool: Arc<DbPool>,
        ledger: Arc<InventoryLedger>,
        numbers: OrderNumberGenerator,
        transaction_timeout: Duration,
    ) -> Self {
        Self {
            db_pool,
            ledger,
            numbers,
            transaction_timeout,
        }
    }

    /// Creates a PAID order and decrements stock for every line, rejecting
    /// the whole order if any line cannot be served.
    #[instrument(skip(self, request), fields(tenant_id = %tenant_id, user_id = %user_id, lines = request.lines.len()))]
    pub async fn create_order(
        &self,
        tenant_id: Uuid,
        user_id: Uuid,
        request: NewOrder,
    ) -> Result<OrderDetails, ServiceError> {
        if request.lines.is_empty() {
            return Err(ServiceError::EmptyCart);
        }
        request.validate()?;
        for line in &request.lines {
            line.validate()?;
        }

        let totals = compute_totals(&request.lines, request.discount)?;
        let order_number = self.numbers.next()?;

        let started = Instant::now();
        let result = with_deadline(
            self.transaction_timeout,
            self.place_order(tenant_id, user_id, &request, totals, order_number),
        )
        .await;
        histogram!(
            "backoffice_orders.transaction_duration_ms",
            started.elapsed().as_secs_f64() * 1000.0
        );

        match &result {
            Ok(details) => {
                counter!("backoffice_orders.created", 1);
                info!(
                    order_id = %details.order.id,
                    order_number = %details.order.order_number,
                    total = %details.order.total,
                    "Order created"
                );
            }
            Err(err) => {
                counter!("backoffice_orders.failed", 1, "kind" => err.kind());
                warn!(error = %err, kind = err.kind(), "Order rejected; nothing was written");
            }
        }

        result
    }

    async fn place_order(
        &self,
        tenant_id: Uuid,
        user_id: Uuid,
        request: &NewOrder,
        totals: OrderTotals,
        order_number: String,
    ) -> Result<OrderDetails, ServiceError> {
        let lease = self
            .ledger
            .lock(request.lines.iter().map(|line| line.product_id))
            .await;
        let txn = self.db_pool.begin().await?;
        let result = self
            .write_order(&txn, &lease, tenant_id, user_id, request, totals, order_number)
            .await;
        finish_transaction(txn, result).await
    }

    #[allow(clippy::too_many_arguments)]
    async fn write_order(
        &self,
        txn: &DatabaseTransaction,
        lease: &StockLease,
        tenant_id: Uuid,
        user_id: Uuid,
        request: &NewOrder,
        totals: OrderTotals,
        order_number: String,
    ) -> Result<OrderDetails, ServiceError> {
        let now = Utc::now();
        self.ledger.lock_rows(txn, lease).await?;

        let order = order::ActiveModel {
            id: Set(Uuid::new_v4()),
            order_number: Set(order_number),
            tenant_id: Set(tenant_id),
            user_id: Set(user_id),
            subtotal: Set(totals.subtotal),
            discount: Set(totals.discount),
            total: Set(totals.total),
            payment_method: Set(request.payment_method.clone()),
            status: Set(OrderStatus::Paid),
            created_at: Set(now),
        }
        .insert(txn)
        .await?;

        // Items reference products, so every product is resolved first.
        let mut names: HashMap<Uuid, String> = HashMap::new();
        for line in &request.lines {
            if !names.contains_key(&line.product_id) {
                let product = find_live_product(txn, tenant_id, line.product_id).await?;
                names.insert(product.id, product.name);
            }
        }

        let items: Vec<order_item::Model> = request
            .lines
            .iter()
            .zip(1..)
            .map(|(line, line_no)| order_item::Model {
                id: Uuid::new_v4(),
                order_id: order.id,
                line_no,
                product_id: line.product_id,
                quantity: line.quantity,
                unit_price: line.unit_price,
                created_at: now,
            })
            .collect();

        order_item::Entity::insert_many(items.iter().map(|item| order_item::ActiveModel {
            id: Set(item.id),
            order_id: Set(item.order_id),
            line_no: Set(item.line_no),
            product_id: Set(item.product_id),
            quantity: Set(item.quantity),
            unit_price: Set(item.unit_price),
            created_at: Set(item.created_at),
        }))
        .exec_without_returning(txn)
        .await?;

        for line in &request.lines {
            self.ledger
                .adjust(
                    txn,
                    lease,
                    tenant_id,
                    line.product_id,
                    -line.quantity,
                    StockPolicy::RejectOnInsufficient,
                )
                .await?;
        }

        let items = items
            .into_iter()
            .map(|item| {
                let name = names.get(&item.product_id).cloned();
                OrderLineDetails::from_item(item, name)
            })
            .collect();

        Ok(OrderDetails { order, items })
    }

    /// Fetches one order of the tenant with its lines.
    #[instrument(skip(self))]
    pub async fn get_order(
        &self,
        tenant_id: Uuid,
        order_id: Uuid,
    ) -> Result<OrderDetails, ServiceError> {
        let db = &*self.db_pool;

        let order = order::Entity::find_by_id(order_id)
            .filter(order::Column::TenantId.eq(tenant_id))
            .one(db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Order {order_id} not found")))?;

        let items = order_item::Entity::find()
            .filter(order_item::Column::OrderId.eq(order.id))
            .order_by_asc(order_item::Column::LineNo)
            .find_also_related(product::Entity)
            .all(db)
            .await?
            .into_iter()
            .map(|(item, product)| OrderLineDetails::from_item(item, product.map(|p| p.name)))
            .collect();

        Ok(OrderDetails { order, items })
    }

    /// Order headers of the tenant, newest first.
    #[instrument(skip(self))]
    pub async fn list_orders(&self, tenant_id: Uuid) -> Result<Vec<OrderSummary>, ServiceError> {
        let orders = order::Entity::find()
            .filter(order::Column::TenantId.eq(tenant_id))
            .order_by_desc(order::Column::CreatedAt)
            .all(&*self.db_pool)
            .await?;

        Ok(orders.into_iter().map(OrderSummary::from).collect())
    }
}
