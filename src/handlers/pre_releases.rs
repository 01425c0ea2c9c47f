use axum::{extract::State, Json};
use serde::Serialize;
use uuid::Uuid;

use super::common::{created_response, success_response, Created};
use crate::{
    auth::AuthUser,
    errors::ServiceError,
    services::pre_releases::{NewPreRelease, PreReleaseDetails},
    ApiResult, AppState,
};

#[derive(Debug, Serialize)]
pub struct PreReleaseCreated {
    pub id: Uuid,
}

pub async fn create_pre_release(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Json(payload): Json<NewPreRelease>,
) -> Result<Created<PreReleaseCreated>, ServiceError> {
    let tenant_id = auth_user.require_tenant()?;
    let id = state
        .services
        .pre_releases
        .create_pre_release(tenant_id, auth_user.user_id, payload)
        .await?;

    Ok(created_response(PreReleaseCreated { id }))
}

/// Transfers created by the caller, newest first.
pub async fn list_my_pre_releases(
    State(state): State<AppState>,
    auth_user: AuthUser,
) -> ApiResult<Vec<PreReleaseDetails>> {
    let tenant_id = auth_user.require_tenant()?;
    let records = state
        .services
        .pre_releases
        .list_mine(tenant_id, auth_user.user_id)
        .await?;
    Ok(success_response(records))
}
