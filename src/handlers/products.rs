use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use uuid::Uuid;

use super::common::{created_response, no_content_response, success_response, Created};
use crate::{
    auth::AuthUser,
    entities::product,
    errors::ServiceError,
    services::products::{NewProduct, ProductUpdate, ProductWithStock},
    ApiResult, AppState,
};

/// Sellable products for the point of sale.
pub async fn pos_catalog(
    State(state): State<AppState>,
    auth_user: AuthUser,
) -> ApiResult<Vec<ProductWithStock>> {
    let tenant_id = auth_user.require_tenant()?;
    let products = state.services.products.catalog(tenant_id).await?;
    Ok(success_response(products))
}

pub async fn list_products(
    State(state): State<AppState>,
    auth_user: AuthUser,
) -> ApiResult<Vec<ProductWithStock>> {
    let tenant_id = auth_user.require_tenant()?;
    let products = state.services.products.list_products(tenant_id).await?;
    Ok(success_response(products))
}

pub async fn create_product(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Json(payload): Json<NewProduct>,
) -> Result<Created<ProductWithStock>, ServiceError> {
    let tenant_id = auth_user.require_tenant()?;
    let product = state
        .services
        .products
        .create_product(tenant_id, payload)
        .await?;
    Ok(created_response(product))
}

pub async fn update_product(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Path(product_id): Path<Uuid>,
    Json(payload): Json<ProductUpdate>,
) -> ApiResult<product::Model> {
    let tenant_id = auth_user.require_tenant()?;
    let product = state
        .services
        .products
        .update_product(tenant_id, product_id, payload)
        .await?;
    Ok(success_response(product))
}

pub async fn delete_product(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Path(product_id): Path<Uuid>,
) -> Result<StatusCode, ServiceError> {
    let tenant_id = auth_user.require_tenant()?;
    state
        .services
        .products
        .delete_product(tenant_id, product_id)
        .await?;
    Ok(no_content_response())
}
