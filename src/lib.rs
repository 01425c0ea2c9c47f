//! Retail back-office library
//!
//! Multi-tenant catalog, inventory ledger, order placement and pre-release
//! stock transfers behind an axum REST API.
#![forbid(unsafe_code)]
#![deny(rust_2018_idioms)]
#![allow(elided_lifetimes_in_paths)]
#![warn(clippy::all, clippy::perf, clippy::dbg_macro)]

// Core modules
pub mod auth;
pub mod config;
pub mod db;
pub mod entities;
pub mod errors;
pub mod handlers;
pub mod middleware_helpers;
pub mod migrator;
pub mod services;
pub mod tracing;

use axum::{
    response::Json,
    routing::{get, patch, post, put},
    Router,
};
use chrono::Utc;
use http::HeaderValue;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::{compression::CompressionLayer, cors::CorsLayer, timeout::TimeoutLayer};

use crate::auth::{AuthRouterExt, AuthService, BACK_OFFICE_ROLES, PLATFORM_ROLES};
use crate::db::DbPool;

// App state definition
#[derive(Clone, Debug)]
pub struct AppState {
    pub db: Arc<DbPool>,
    pub config: config::AppConfig,
    pub services: handlers::AppServices,
}

impl AppState {
    pub fn new(db: Arc<DbPool>, config: config::AppConfig) -> Self {
        let services = handlers::AppServices::new(db.clone(), &config);
        Self {
            db,
            config,
            services,
        }
    }
}

// Common response wrappers
#[derive(Debug, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: Option<T>,
    pub message: Option<String>,
    pub errors: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub meta: Option<ResponseMeta>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ResponseMeta {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,
    pub timestamp: String,
}

impl ResponseMeta {
    fn capture() -> Self {
        Self {
            request_id: crate::tracing::current_request_id().map(|rid| rid.as_str().to_string()),
            timestamp: Utc::now().to_rfc3339(),
        }
    }
}

impl<T> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            message: None,
            errors: None,
            meta: Some(ResponseMeta::capture()),
        }
    }

    pub fn error(message: String) -> Self {
        Self {
            success: false,
            data: None,
            message: Some(message),
            errors: None,
            meta: Some(ResponseMeta::capture()),
        }
    }
}

/// Standard API result type for JSON responses
pub type ApiResult<T> = Result<Json<ApiResponse<T>>, errors::ServiceError>;

/// Routes mounted under `/api/v1`. Authentication routes are public. Every
/// other route requires a valid access token; catalog, inventory, analytics
/// and user management also require a back-office role, and customer
/// management requires a super admin.
pub fn api_v1_routes() -> Router<AppState> {
    let point_of_sale = Router::new()
        .route(
            "/orders",
            post(handlers::orders::create_order).get(handlers::orders::list_orders),
        )
        .route("/orders/:id", get(handlers::orders::get_order))
        .route(
            "/pre-releases",
            post(handlers::pre_releases::create_pre_release)
                .get(handlers::pre_releases::list_my_pre_releases),
        )
        .route("/pos/products", get(handlers::products::pos_catalog))
        .route("/customers/me", get(handlers::customers::my_customer))
        .with_auth();

    let back_office = Router::new()
        .route(
            "/orders/analytics",
            get(handlers::analytics::order_analytics),
        )
        .route(
            "/products",
            get(handlers::products::list_products).post(handlers::products::create_product),
        )
        .route(
            "/products/:id",
            put(handlers::products::update_product).delete(handlers::products::delete_product),
        )
        .route(
            "/products/:id/inventory",
            patch(handlers::inventory::adjust_inventory),
        )
        .route("/inventory", get(handlers::inventory::list_inventory))
        .route(
            "/customers/me/theme",
            patch(handlers::customers::update_my_theme),
        )
        .route(
            "/users",
            get(handlers::users::list_users).post(handlers::users::create_user),
        )
        .route(
            "/users/availability",
            get(handlers::users::check_availability),
        )
        .route(
            "/users/:id",
            put(handlers::users::update_user).delete(handlers::users::delete_user),
        )
        .route("/users/:id/status", put(handlers::users::set_user_status))
        .with_roles(BACK_OFFICE_ROLES);

    let platform = Router::new()
        .route(
            "/customers",
            get(handlers::customers::list_customers).post(handlers::customers::create_customer),
        )
        .route(
            "/customers/:id",
            get(handlers::customers::get_customer)
                .put(handlers::customers::update_customer)
                .delete(handlers::customers::delete_customer),
        )
        .route(
            "/customers/:id/status",
            put(handlers::customers::set_customer_status),
        )
        .with_roles(PLATFORM_ROLES);

    Router::new()
        .nest("/auth", auth::auth_routes())
        .merge(point_of_sale)
        .merge(back_office)
        .merge(platform)
}

fn cors_layer(config: &config::AppConfig) -> CorsLayer {
    let origins: Vec<HeaderValue> = config
        .cors_origins()
        .iter()
        .filter_map(|origin| HeaderValue::from_str(origin).ok())
        .collect();

    if origins.is_empty() {
        ::tracing::info!("Using permissive CORS because no origins were configured");
        CorsLayer::permissive()
    } else {
        CorsLayer::new()
            .allow_origin(origins)
            .allow_methods(tower_http::cors::Any)
            .allow_headers(tower_http::cors::Any)
    }
}

/// Full application router: health probes, the v1 API and the HTTP layers.
pub fn build_router(state: AppState, auth_service: Arc<AuthService>) -> Router {
    let request_timeout = state.config.request_timeout();
    let cors = cors_layer(&state.config);

    Router::new()
        .route("/", get(|| async { "retail-backoffice up" }))
        .nest("/health", handlers::health::health_routes())
        .nest("/api/v1", api_v1_routes())
        .layer(TimeoutLayer::new(request_timeout))
        // HTTP tracing layer for consistent request/response telemetry
        .layer(crate::tracing::configure_http_tracing())
        .layer(CompressionLayer::new())
        .layer(cors)
        // Inject AuthService into request extensions for auth middleware
        .layer(axum::middleware::from_fn_with_state(
            auth_service,
            |axum::extract::State(auth): axum::extract::State<Arc<AuthService>>,
             mut req: axum::extract::Request,
             next: axum::middleware::Next| async move {
                req.extensions_mut().insert(auth);
                next.run(req).await
            },
        ))
        // Ensure every request carries a request id for traceability
        .layer(axum::middleware::from_fn(
            middleware_helpers::request_id::request_id_middleware,
        ))
        .with_state(state)
}

#[cfg(test)]
mod response_tests {
    use super::*;
    use chrono::DateTime;

    #[tokio::test]
    async fn success_response_includes_request_metadata() {
        let response =
            crate::tracing::scope_request_id(crate::tracing::RequestId::new("meta-123"), async {
                ApiResponse::success("ok")
            })
            .await;

        let meta = response.meta.expect("metadata expected");
        assert_eq!(meta.request_id.as_deref(), Some("meta-123"));
        DateTime::parse_from_rfc3339(&meta.timestamp).expect("timestamp should parse");
    }

    #[tokio::test]
    async fn error_response_includes_request_metadata() {
        let response =
            crate::tracing::scope_request_id(crate::tracing::RequestId::new("meta-err"), async {
                ApiResponse::<()>::error("oops".into())
            })
            .await;

        let meta = response.meta.expect("metadata expected");
        assert_eq!(meta.request_id.as_deref(), Some("meta-err"));
        assert!(!meta.timestamp.is_empty());
    }
}
