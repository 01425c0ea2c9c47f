use crate::{
    db::{finish_transaction, DbPool},
    entities::inventory,
    entities::product::{self, ProductStatus},
    errors::ServiceError,
    services::inventory::find_live_product,
    services::money::validate_amount,
};
use chrono::{NaiveDate, Utc};
use metrics::counter;
use rand::rngs::OsRng;
use rand::RngCore;
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseTransaction, EntityTrait, QueryFilter, QueryOrder, Set,
    TransactionTrait,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, instrument};
use uuid::Uuid;
use validator::Validate;

const CODE_FALLBACK_STEM: &str = "PRD";

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct NewProduct {
    #[validate(length(min = 1, max = 255, message = "Product name is required"))]
    pub name: String,
    pub description: Option<String>,
    #[validate(custom = "validate_amount")]
    pub price: Decimal,
    #[validate(length(max = 32))]
    pub unit_type: Option<String>,
    pub image_url: Option<String>,
    #[validate(range(min = 0))]
    pub initial_quantity: Option<i32>,
}

/// Partial update; absent fields are left untouched.
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
pub struct ProductUpdate {
    #[validate(length(min = 1, max = 255))]
    pub name: Option<String>,
    pub description: Option<String>,
    #[validate(custom = "validate_amount")]
    pub price: Option<Decimal>,
    #[validate(length(max = 32))]
    pub unit_type: Option<String>,
    pub image_url: Option<String>,
    pub status: Option<ProductStatus>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductWithStock {
    #[serde(flatten)]
    pub product: product::Model,
    pub stock: i32,
}

/// Human-readable product code: `{STEM}-{YYYYMMDD}-{6 hex}` where the stem
/// is the first three alphanumeric characters of the name.
pub fn product_code_for(name: &str, date: NaiveDate) -> Result<String, ServiceError> {
    let stem: String = name
        .chars()
        .filter(char::is_ascii_alphanumeric)
        .take(3)
        .collect::<String>()
        .to_ascii_uppercase();
    let stem = if stem.is_empty() {
        CODE_FALLBACK_STEM.to_string()
    } else {
        stem
    };

    let mut suffix = [0u8; 3];
    OsRng
        .try_fill_bytes(&mut suffix)
        .map_err(|e| ServiceError::InternalError(format!("random source unavailable: {e}")))?;

    Ok(format!(
        "{stem}-{}-{}",
        date.format("%Y%m%d"),
        hex::encode_upper(suffix)
    ))
}

/// Catalog management for back-office users.
#[derive(Clone, Debug)]
pub struct ProductService {
    db_pool: Arc<DbPool>,
}

impl ProductService {
    pub fn new(db_pool: Arc<DbPool>) -> Self {
        Self { db_pool }
    }

    #[instrument(skip(self, request), fields(tenant_id = %tenant_id, name = %request.name))]
    pub async fn create_product(
        &self,
        tenant_id: Uuid,
        request: NewProduct,
    ) -> Result<ProductWithStock, ServiceError> {
        request.validate()?;
        let product_code = product_code_for(&request.name, Utc::now().date_naive())?;

        let txn = self.db_pool.begin().await?;
        let result = insert_product(&txn, tenant_id, request, product_code).await;
        let created = finish_transaction(txn, result).await?;

        counter!("backoffice_products.created", 1);
        info!(product_id = %created.product.id, code = %created.product.product_code, "Product created");
        Ok(created)
    }

    #[instrument(skip(self, update), fields(tenant_id = %tenant_id, product_id = %product_id))]
    pub async fn update_product(
        &self,
        tenant_id: Uuid,
        product_id: Uuid,
        update: ProductUpdate,
    ) -> Result<product::Model, ServiceError> {
        update.validate()?;
        if update.status == Some(ProductStatus::Deleted) {
            return Err(ServiceError::ValidationError(
                "use the delete operation to remove a product".to_string(),
            ));
        }

        let db = &*self.db_pool;
        let existing = find_live_product(db, tenant_id, product_id).await?;

        let mut active: product::ActiveModel = existing.into();
        if let Some(name) = update.name {
            active.name = Set(name);
        }
        if let Some(description) = update.description {
            active.description = Set(Some(description));
        }
        if let Some(price) = update.price {
            active.price = Set(price);
        }
        if let Some(unit_type) = update.unit_type {
            active.unit_type = Set(Some(unit_type));
        }
        if let Some(image_url) = update.image_url {
            active.image_url = Set(Some(image_url));
        }
        if let Some(status) = update.status {
            active.status = Set(status);
        }

        Ok(active.update(db).await?)
    }

    /// Soft delete. Historical order and transfer lines keep pointing at
    /// the row.
    #[instrument(skip(self))]
    pub async fn delete_product(&self, tenant_id: Uuid, product_id: Uuid) -> Result<(), ServiceError> {
        let db = &*self.db_pool;
        let existing = find_live_product(db, tenant_id, product_id).await?;

        let mut active: product::ActiveModel = existing.into();
        active.status = Set(ProductStatus::Deleted);
        active.update(db).await?;

        counter!("backoffice_products.deleted", 1);
        Ok(())
    }

    /// Non-deleted products with stock, newest first.
    #[instrument(skip(self))]
    pub async fn list_products(&self, tenant_id: Uuid) -> Result<Vec<ProductWithStock>, ServiceError> {
        let rows = product::Entity::find()
            .filter(product::Column::TenantId.eq(tenant_id))
            .filter(product::Column::Status.ne(ProductStatus::Deleted))
            .order_by_desc(product::Column::CreatedAt)
            .find_also_related(inventory::Entity)
            .all(&*self.db_pool)
            .await?;

        Ok(rows.into_iter().map(with_stock).collect())
    }

    /// Sellable products for the till, by name. Out-of-stock products are
    /// listed with stock 0.
    #[instrument(skip(self))]
    pub async fn catalog(&self, tenant_id: Uuid) -> Result<Vec<ProductWithStock>, ServiceError> {
        let rows = product::Entity::find()
            .filter(product::Column::TenantId.eq(tenant_id))
            .filter(product::Column::Status.eq(ProductStatus::Active))
            .order_by_asc(product::Column::Name)
            .find_also_related(inventory::Entity)
            .all(&*self.db_pool)
            .await?;

        Ok(rows.into_iter().map(with_stock).collect())
    }
}

fn with_stock((product, stock): (product::Model, Option<inventory::Model>)) -> ProductWithStock {
    ProductWithStock {
        product,
        stock: stock.map_or(0, |row| row.quantity),
    }
}

async fn insert_product(
    txn: &DatabaseTransaction,
    tenant_id: Uuid,
    request: NewProduct,
    product_code: String,
) -> Result<ProductWithStock, ServiceError> {
    let product = product::ActiveModel {
        id: Set(Uuid::new_v4()),
        tenant_id: Set(tenant_id),
        name: Set(request.name),
        description: Set(request.description),
        price: Set(request.price),
        unit_type: Set(request.unit_type),
        product_code: Set(product_code),
        image_url: Set(request.image_url),
        status: Set(ProductStatus::Active),
        ..Default::default()
    }
    .insert(txn)
    .await?;

    let stock = match request.initial_quantity {
        Some(quantity) => {
            inventory::ActiveModel {
                id: Set(Uuid::new_v4()),
                product_id: Set(product.id),
                tenant_id: Set(tenant_id),
                quantity: Set(quantity),
                ..Default::default()
            }
            .insert(txn)
            .await?
            .quantity
        }
        None => 0,
    };

    Ok(ProductWithStock { product, stock })
}
