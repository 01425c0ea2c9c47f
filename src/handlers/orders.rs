use axum::{
    extract::{Path, State},
    Json,
};
use uuid::Uuid;

use super::common::{created_response, success_response, Created};
use crate::{
    auth::AuthUser,
    errors::ServiceError,
    services::orders::{NewOrder, OrderDetails, OrderSummary},
    ApiResult, AppState,
};

/// Places an order for the caller's tenant. Stock for every line is taken
/// in the same transaction; the order is rejected as a whole otherwise.
pub async fn create_order(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Json(payload): Json<NewOrder>,
) -> Result<Created<OrderDetails>, ServiceError> {
    let tenant_id = auth_user.require_tenant()?;
    let order = state
        .services
        .orders
        .create_order(tenant_id, auth_user.user_id, payload)
        .await?;

    Ok(created_response(order))
}

pub async fn list_orders(
    State(state): State<AppState>,
    auth_user: AuthUser,
) -> ApiResult<Vec<OrderSummary>> {
    let tenant_id = auth_user.require_tenant()?;
    let orders = state.services.orders.list_orders(tenant_id).await?;
    Ok(success_response(orders))
}

pub async fn get_order(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Path(order_id): Path<Uuid>,
) -> ApiResult<OrderDetails> {
    let tenant_id = auth_user.require_tenant()?;
    let order = state.services.orders.get_order(tenant_id, order_id).await?;
    Ok(success_response(order))
}
