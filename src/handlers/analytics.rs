use axum::extract::State;

use super::common::success_response;
use crate::{auth::AuthUser, services::analytics::OrderAnalytics, ApiResult, AppState};

/// Sales by day and month, top products and totals for the caller's tenant.
pub async fn order_analytics(
    State(state): State<AppState>,
    auth_user: AuthUser,
) -> ApiResult<OrderAnalytics> {
    let tenant_id = auth_user.require_tenant()?;
    let analytics = state.services.analytics.order_analytics(tenant_id).await?;
    Ok(success_response(analytics))
}
