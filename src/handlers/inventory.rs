use axum::{
    extract::{Path, State},
    Json,
};
use serde::Deserialize;
use uuid::Uuid;

use super::common::success_response;
use crate::{
    auth::AuthUser,
    services::inventory::{StockAdjustment, StockLevel},
    ApiResult, AppState,
};

#[derive(Debug, Deserialize)]
pub struct AdjustStockRequest {
    /// Positive to restock, negative to write stock off
    pub delta: i32,
}

pub async fn list_inventory(
    State(state): State<AppState>,
    auth_user: AuthUser,
) -> ApiResult<Vec<StockLevel>> {
    let tenant_id = auth_user.require_tenant()?;
    let levels = state.services.ledger.list_levels(tenant_id).await?;
    Ok(success_response(levels))
}

/// Manual stock correction. Never drives stock below zero.
pub async fn adjust_inventory(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Path(product_id): Path<Uuid>,
    Json(payload): Json<AdjustStockRequest>,
) -> ApiResult<StockAdjustment> {
    let tenant_id = auth_user.require_tenant()?;
    let adjustment = state
        .services
        .ledger
        .restock(tenant_id, product_id, payload.delta)
        .await?;
    Ok(success_response(adjustment))
}
