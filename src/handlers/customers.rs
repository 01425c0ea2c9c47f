use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use uuid::Uuid;

use super::common::{created_response, no_content_response, success_response, Created};
use crate::{
    auth::AuthUser,
    entities::customer,
    errors::ServiceError,
    services::customers::{
        CustomerCreated, CustomerStatusChange, CustomerStatusUpdated, CustomerUpdate, NewCustomer,
        ThemeUpdate,
    },
    ApiResult, AppState,
};

pub async fn list_customers(
    State(state): State<AppState>,
) -> ApiResult<Vec<customer::Model>> {
    let customers = state.services.customers.list_customers().await?;
    Ok(success_response(customers))
}

pub async fn get_customer(
    State(state): State<AppState>,
    Path(customer_id): Path<Uuid>,
) -> ApiResult<customer::Model> {
    let customer = state.services.customers.get_customer(customer_id).await?;
    Ok(success_response(customer))
}

pub async fn create_customer(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Json(payload): Json<NewCustomer>,
) -> Result<Created<CustomerCreated>, ServiceError> {
    let created = state
        .services
        .customers
        .create_customer(auth_user.user_id, payload)
        .await?;
    Ok(created_response(created))
}

pub async fn update_customer(
    State(state): State<AppState>,
    Path(customer_id): Path<Uuid>,
    Json(payload): Json<CustomerUpdate>,
) -> ApiResult<customer::Model> {
    let customer = state
        .services
        .customers
        .update_customer(customer_id, payload)
        .await?;
    Ok(success_response(customer))
}

pub async fn set_customer_status(
    State(state): State<AppState>,
    Path(customer_id): Path<Uuid>,
    Json(payload): Json<CustomerStatusChange>,
) -> ApiResult<CustomerStatusUpdated> {
    let updated = state
        .services
        .customers
        .set_status(customer_id, payload.status)
        .await?;
    Ok(success_response(updated))
}

pub async fn delete_customer(
    State(state): State<AppState>,
    Path(customer_id): Path<Uuid>,
) -> Result<StatusCode, ServiceError> {
    state.services.customers.delete_customer(customer_id).await?;
    Ok(no_content_response())
}

/// The caller's own customer record, for till branding.
pub async fn my_customer(
    State(state): State<AppState>,
    auth_user: AuthUser,
) -> ApiResult<customer::Model> {
    let tenant_id = auth_user.require_tenant()?;
    let customer = state.services.customers.get_customer(tenant_id).await?;
    Ok(success_response(customer))
}

pub async fn update_my_theme(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Json(payload): Json<ThemeUpdate>,
) -> ApiResult<customer::Model> {
    let tenant_id = auth_user.require_tenant()?;
    let customer = state
        .services
        .customers
        .update_theme(tenant_id, payload)
        .await?;
    Ok(success_response(customer))
}
