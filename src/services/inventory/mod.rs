//! Inventory ledger: the only writer of per-product stock.
//!
//! Every read-then-write of an inventory row happens while the caller holds a
//! [`StockLease`] covering the product and, on backends with row locks, after
//! a `SELECT ... FOR UPDATE` on that row inside the caller's transaction.

mod leases;

pub use leases::{StockLease, StockLocks};

use crate::db::{finish_transaction, with_deadline, DbPool};
use crate::entities::inventory;
use crate::entities::product::{self, ProductStatus};
use crate::errors::ServiceError;
use metrics::counter;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter, QueryOrder,
    QuerySelect, Set, TransactionTrait,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

/// What happens when a decrement would take stock below zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, strum::Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum StockPolicy {
    /// Fail with `InsufficientStock`. Used by order placement.
    RejectOnInsufficient,
    /// Clamp the result to zero and succeed. Used by pre-release transfers.
    FloorAtZero,
}

/// Outcome of a single ledger adjustment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockAdjustment {
    pub product_id: Uuid,
    pub previous_quantity: i32,
    pub new_quantity: i32,
    /// True when `FloorAtZero` absorbed part of the decrement.
    pub clamped: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockLevel {
    pub product_id: Uuid,
    pub product_name: String,
    pub product_code: String,
    pub status: ProductStatus,
    pub quantity: i32,
}

/// Computes the quantity that results from applying `delta` to `current`.
///
/// Returns the new quantity and whether it was clamped.
pub fn apply_delta(
    product_id: Uuid,
    current: i32,
    delta: i32,
    policy: StockPolicy,
) -> Result<(i32, bool), ServiceError> {
    let target = current.checked_add(delta).ok_or_else(|| {
        ServiceError::ValidationError(format!(
            "stock adjustment of {delta} overflows quantity {current}"
        ))
    })?;

    if target >= 0 {
        return Ok((target, false));
    }

    match policy {
        StockPolicy::RejectOnInsufficient => Err(ServiceError::InsufficientStock {
            product_id,
            requested: delta.saturating_neg(),
            available: current,
        }),
        StockPolicy::FloorAtZero => Ok((0, true)),
    }
}

#[derive(Clone, Debug)]
pub struct InventoryLedger {
    db: Arc<DbPool>,
    locks: StockLocks,
    transaction_timeout: Duration,
}

impl InventoryLedger {
    pub fn new(db: Arc<DbPool>, locks: StockLocks, transaction_timeout: Duration) -> Self {
        Self {
            db,
            locks,
            transaction_timeout,
        }
    }

    /// Takes exclusive leases on the given products. Must be called before
    /// the transaction that adjusts them is opened.
    pub async fn lock<I>(&self, product_ids: I) -> StockLease
    where
        I: IntoIterator<Item = Uuid>,
    {
        self.locks.acquire(product_ids).await
    }

    /// Locks every existing inventory row the lease covers with one
    /// `SELECT ... FOR UPDATE ORDER BY product_id`. Writers in other
    /// processes take row locks in the same order, so multi-line units of
    /// work cannot deadlock on each other. Must run before the first
    /// [`adjust`](Self::adjust) of the transaction.
    #[instrument(skip(self, conn, lease))]
    pub async fn lock_rows<C>(
        &self,
        conn: &C,
        lease: &StockLease,
    ) -> Result<Vec<inventory::Model>, ServiceError>
    where
        C: ConnectionTrait,
    {
        let rows = inventory::Entity::find()
            .filter(inventory::Column::ProductId.is_in(lease.product_ids().collect::<Vec<_>>()))
            .order_by_asc(inventory::Column::ProductId)
            .lock_exclusive()
            .all(conn)
            .await?;
        debug!(locked = rows.len(), "Inventory rows locked");
        Ok(rows)
    }

    /// Adds `delta` to the stock of `product_id` inside the caller's
    /// transaction, creating the inventory row at zero if it does not exist.
    #[instrument(skip(self, conn, lease), fields(tenant_id = %tenant_id, product_id = %product_id))]
    pub async fn adjust<C>(
        &self,
        conn: &C,
        lease: &StockLease,
        tenant_id: Uuid,
        product_id: Uuid,
        delta: i32,
        policy: StockPolicy,
    ) -> Result<StockAdjustment, ServiceError>
    where
        C: ConnectionTrait,
    {
        if !lease.covers(product_id) {
            return Err(ServiceError::InternalError(format!(
                "stock adjustment for product {product_id} attempted without a lease"
            )));
        }

        find_live_product(conn, tenant_id, product_id).await?;

        let existing = inventory::Entity::find()
            .filter(inventory::Column::ProductId.eq(product_id))
            .lock_exclusive()
            .one(conn)
            .await?;

        let previous_quantity = existing.as_ref().map_or(0, |row| row.quantity);
        let (new_quantity, clamped) = apply_delta(product_id, previous_quantity, delta, policy)
            .map_err(|err| {
                if let ServiceError::InsufficientStock { .. } = err {
                    counter!("backoffice_inventory.rejected_adjustments", 1);
                }
                err
            })?;

        match existing {
            Some(row) => {
                let mut active: inventory::ActiveModel = row.into();
                active.quantity = Set(new_quantity);
                active.update(conn).await?;
            }
            None => {
                debug!("Creating inventory row on first adjustment");
                inventory::ActiveModel {
                    id: Set(Uuid::new_v4()),
                    product_id: Set(product_id),
                    tenant_id: Set(tenant_id),
                    quantity: Set(new_quantity),
                    ..Default::default()
                }
                .insert(conn)
                .await?;
            }
        }

        counter!("backoffice_inventory.adjustments", 1, "policy" => policy.to_string());
        if clamped {
            counter!("backoffice_inventory.clamped_adjustments", 1);
            warn!(
                previous_quantity,
                delta, "Decrement exceeded stock on hand; quantity floored at zero"
            );
        }

        Ok(StockAdjustment {
            product_id,
            previous_quantity,
            new_quantity,
            clamped,
        })
    }

    /// Current stock of a product, 0 when no inventory row exists yet.
    pub async fn quantity<C>(
        &self,
        conn: &C,
        tenant_id: Uuid,
        product_id: Uuid,
    ) -> Result<i32, ServiceError>
    where
        C: ConnectionTrait,
    {
        find_live_product(conn, tenant_id, product_id).await?;

        let row = inventory::Entity::find()
            .filter(inventory::Column::ProductId.eq(product_id))
            .one(conn)
            .await?;

        Ok(row.map_or(0, |row| row.quantity))
    }

    /// Standalone adjustment used by the back-office inventory screen.
    #[instrument(skip(self), fields(tenant_id = %tenant_id, product_id = %product_id))]
    pub async fn restock(
        &self,
        tenant_id: Uuid,
        product_id: Uuid,
        delta: i32,
    ) -> Result<StockAdjustment, ServiceError> {
        if delta == 0 {
            return Err(ServiceError::ValidationError(
                "stock adjustment must be non-zero".to_string(),
            ));
        }

        let adjustment = with_deadline(self.transaction_timeout, async {
            let lease = self.lock([product_id]).await;
            let txn = self.db.begin().await?;
            let result = self
                .adjust(
                    &txn,
                    &lease,
                    tenant_id,
                    product_id,
                    delta,
                    StockPolicy::RejectOnInsufficient,
                )
                .await;
            finish_transaction(txn, result).await
        })
        .await?;

        info!(
            previous_quantity = adjustment.previous_quantity,
            new_quantity = adjustment.new_quantity,
            "Stock adjusted"
        );
        Ok(adjustment)
    }

    /// Every non-deleted product of the tenant with its stock, by name.
    #[instrument(skip(self))]
    pub async fn list_levels(&self, tenant_id: Uuid) -> Result<Vec<StockLevel>, ServiceError> {
        let rows = product::Entity::find()
            .filter(product::Column::TenantId.eq(tenant_id))
            .filter(product::Column::Status.ne(ProductStatus::Deleted))
            .order_by_asc(product::Column::Name)
            .find_also_related(inventory::Entity)
            .all(&*self.db)
            .await?;

        Ok(rows
            .into_iter()
            .map(|(product, stock)| StockLevel {
                product_id: product.id,
                product_name: product.name,
                product_code: product.product_code,
                status: product.status,
                quantity: stock.map_or(0, |row| row.quantity),
            })
            .collect())
    }
}

/// Loads a product owned by the tenant that has not been soft-deleted.
pub(crate) async fn find_live_product<C>(
    conn: &C,
    tenant_id: Uuid,
    product_id: Uuid,
) -> Result<product::Model, ServiceError>
where
    C: ConnectionTrait,
{
    product::Entity::find_by_id(product_id)
        .filter(product::Column::TenantId.eq(tenant_id))
        .one(conn)
        .await?
        .filter(|product| !product.is_deleted())
        .ok_or(ServiceError::ProductNotFound { product_id })
}
