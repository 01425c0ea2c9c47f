use crate::{
    db::{finish_transaction, with_deadline, DbPool},
    entities::pre_release::{self, PreReleaseStatus},
    entities::{pre_release_item, product},
    errors::ServiceError,
    services::inventory::{find_live_product, InventoryLedger, StockLease, StockPolicy},
};
use chrono::Utc;
use metrics::counter;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseTransaction, EntityTrait, QueryFilter, QueryOrder, Set,
    TransactionTrait,
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, instrument, warn};
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct TransferLine {
    pub product_id: Uuid,
    #[validate(range(min = 1, message = "Quantity must be positive"))]
    pub quantity: i32,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct NewPreRelease {
    pub store_id: Uuid,
    #[validate(length(max = 2000))]
    pub remarks: Option<String>,
    #[validate(length(max = 1024))]
    pub photo_url: Option<String>,
    pub lines: Vec<TransferLine>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PreReleaseLineDetails {
    pub id: Uuid,
    pub line_no: i32,
    pub product_id: Uuid,
    pub product_name: Option<String>,
    pub quantity: i32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PreReleaseDetails {
    #[serde(flatten)]
    pub pre_release: pre_release::Model,
    pub items: Vec<PreReleaseLineDetails>,
}

/// Records stock transfers out of central inventory.
///
/// Decrements use [`StockPolicy::FloorAtZero`]: a transfer larger than the
/// stock on hand succeeds and leaves the product at zero.
#[derive(Clone, Debug)]
pub struct PreReleaseService {
    db_pool: Arc<DbPool>,
    ledger: Arc<InventoryLedger>,
    transaction_timeout: Duration,
}

impl PreReleaseService {
    pub fn new(
        db_pool: Arc<DbPool>,
        ledger: Arc<InventoryLedger>,
        transaction_timeout: Duration,
    ) -> Self {
        Self {
            db_pool,
            ledger,
            transaction_timeout,
        }
    }

    /// Creates a PENDING transfer and returns its id.
    #[instrument(skip(self, request), fields(tenant_id = %tenant_id, user_id = %user_id, store_id = %request.store_id))]
    pub async fn create_pre_release(
        &self,
        tenant_id: Uuid,
        user_id: Uuid,
        request: NewPreRelease,
    ) -> Result<Uuid, ServiceError> {
        if request.lines.is_empty() {
            return Err(ServiceError::EmptyTransfer);
        }
        request.validate()?;
        for line in &request.lines {
            line.validate()?;
        }

        let result = with_deadline(self.transaction_timeout, async {
            let lease = self
                .ledger
                .lock(request.lines.iter().map(|line| line.product_id))
                .await;
            let txn = self.db_pool.begin().await?;
            let result = self
                .write_pre_release(&txn, &lease, tenant_id, user_id, &request)
                .await;
            finish_transaction(txn, result).await
        })
        .await;

        match &result {
            Ok(id) => {
                counter!("backoffice_pre_releases.created", 1);
                info!(pre_release_id = %id, "Pre-release created");
            }
            Err(err) => {
                counter!("backoffice_pre_releases.failed", 1, "kind" => err.kind());
                warn!(error = %err, "Pre-release rejected; nothing was written");
            }
        }

        result
    }

    async fn write_pre_release(
        &self,
        txn: &DatabaseTransaction,
        lease: &StockLease,
        tenant_id: Uuid,
        user_id: Uuid,
        request: &NewPreRelease,
    ) -> Result<Uuid, ServiceError> {
        self.ledger.lock_rows(txn, lease).await?;

        let header = pre_release::ActiveModel {
            id: Set(Uuid::new_v4()),
            tenant_id: Set(tenant_id),
            user_id: Set(user_id),
            store_id: Set(request.store_id),
            remarks: Set(request.remarks.clone()),
            photo_url: Set(request.photo_url.clone()),
            status: Set(PreReleaseStatus::Pending),
            created_at: Set(Utc::now()),
        }
        .insert(txn)
        .await?;

        for line in &request.lines {
            find_live_product(txn, tenant_id, line.product_id).await?;
        }

        let items = request
            .lines
            .iter()
            .zip(1..)
            .map(|(line, line_no)| pre_release_item::ActiveModel {
                id: Set(Uuid::new_v4()),
                pre_release_id: Set(header.id),
                line_no: Set(line_no),
                product_id: Set(line.product_id),
                quantity: Set(line.quantity),
            });
        pre_release_item::Entity::insert_many(items)
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
                    StockPolicy::FloorAtZero,
                )
                .await?;
        }

        Ok(header.id)
    }

    /// Transfers created by `user_id`, newest first, with product names.
    #[instrument(skip(self))]
    pub async fn list_mine(
        &self,
        tenant_id: Uuid,
        user_id: Uuid,
    ) -> Result<Vec<PreReleaseDetails>, ServiceError> {
        let db = &*self.db_pool;

        let headers = pre_release::Entity::find()
            .filter(pre_release::Column::TenantId.eq(tenant_id))
            .filter(pre_release::Column::UserId.eq(user_id))
            .order_by_desc(pre_release::Column::CreatedAt)
            .all(db)
            .await?;

        if headers.is_empty() {
            return Ok(Vec::new());
        }

        let ids: Vec<Uuid> = headers.iter().map(|h| h.id).collect();
        let mut items_by_header: HashMap<Uuid, Vec<PreReleaseLineDetails>> = HashMap::new();
        for (item, product) in pre_release_item::Entity::find()
            .filter(pre_release_item::Column::PreReleaseId.is_in(ids))
            .order_by_asc(pre_release_item::Column::PreReleaseId)
            .order_by_asc(pre_release_item::Column::LineNo)
            .find_also_related(product::Entity)
            .all(db)
            .await?
        {
            items_by_header
                .entry(item.pre_release_id)
                .or_default()
                .push(PreReleaseLineDetails {
                    id: item.id,
                    line_no: item.line_no,
                    product_id: item.product_id,
                    product_name: product.map(|p| p.name),
                    quantity: item.quantity,
                });
        }

        Ok(headers
            .into_iter()
            .map(|pre_release| PreReleaseDetails {
                items: items_by_header.remove(&pre_release.id).unwrap_or_default(),
                pre_release,
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transfer_line_requires_positive_quantity() {
        let line = TransferLine {
            product_id: Uuid::new_v4(),
            quantity: 0,
        };
        assert!(line.validate().is_err());
    }

    #[test]
    fn optional_fields_may_be_omitted() {
        let request: NewPreRelease = serde_json::from_value(serde_json::json!({
            "store_id": Uuid::nil(),
            "lines": [{ "product_id": Uuid::nil(), "quantity": 2 }]
        }))
        .unwrap();
        assert!(request.remarks.is_none());
        assert!(request.validate().is_ok());
    }
}
