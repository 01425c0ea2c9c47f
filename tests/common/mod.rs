#![allow(dead_code)]

use std::sync::Arc;

use axum::{
    body::{to_bytes, Body},
    http::{Method, Request},
    response::Response,
    Router,
};
use retail_backoffice::{
    auth::{AuthConfig, AuthService, LoginCredentials, LoginResponse, Role, TokenSubject},
    build_router,
    config::AppConfig,
    db,
    entities::product,
    services::customers::{CustomerCreated, NewCustomer, NewCustomerAdmin},
    services::products::NewProduct,
    services::users::{NewUser, UserProfile},
    AppState,
};
use rust_decimal::Decimal;
use sea_orm::{EntityTrait, PaginatorTrait};
use serde_json::Value;
use tempfile::TempDir;
use tower::ServiceExt;
use uuid::Uuid;

pub const TEST_JWT_SECRET: &str = "test_secret_key_for_testing_purposes_only_32chars";

/// Meets the default password policy.
pub const TEST_PASSWORD: &str = "Till!pass1";

/// Application state and router over a throwaway SQLite database.
pub struct TestApp {
    router: Router,
    pub state: AppState,
    pub auth_service: Arc<AuthService>,
    pub tenant_id: Uuid,
    pub admin_id: Uuid,
    pub cashier_id: Uuid,
    _db_dir: TempDir,
}

impl TestApp {
    pub async fn new() -> Self {
        Self::with_config(|_| {}).await
    }

    /// Builds the app after letting the caller adjust the configuration.
    pub async fn with_config(adjust: impl FnOnce(&mut AppConfig)) -> Self {
        let db_dir = tempfile::tempdir().expect("temp dir for test database");
        let db_path = db_dir.path().join("backoffice_test.db");

        let mut cfg = AppConfig::new(
            format!("sqlite://{}?mode=rwc", db_path.display()),
            TEST_JWT_SECRET.to_string(),
            "127.0.0.1".to_string(),
            18_080,
            "test".to_string(),
        );
        // One connection keeps SQLite writers strictly serialized.
        cfg.db_max_connections = 1;
        cfg.db_min_connections = 1;
        adjust(&mut cfg);

        let pool = db::establish_connection_from_app_config(&cfg)
            .await
            .expect("failed to create test database");
        db::run_migrations(&pool)
            .await
            .expect("failed to run migrations in tests");

        let pool = Arc::new(pool);
        let auth_service = Arc::new(AuthService::new(AuthConfig::from(&cfg), pool.clone()));
        let state = AppState::new(pool, cfg);
        let router = build_router(state.clone(), auth_service.clone());

        Self {
            router,
            state,
            auth_service,
            tenant_id: Uuid::new_v4(),
            admin_id: Uuid::new_v4(),
            cashier_id: Uuid::new_v4(),
            _db_dir: db_dir,
        }
    }

    pub fn router(&self) -> Router {
        self.router.clone()
    }

    pub fn token_for(&self, user_id: Uuid, tenant_id: Option<Uuid>, role: Role) -> String {
        self.auth_service
            .generate_token(&TokenSubject {
                user_id,
                tenant_id,
                role,
            })
            .expect("sign test token")
    }

    pub fn admin_token(&self) -> String {
        self.token_for(self.admin_id, Some(self.tenant_id), Role::Admin)
    }

    pub fn cashier_token(&self) -> String {
        self.token_for(self.cashier_id, Some(self.tenant_id), Role::Cashier)
    }

    /// Token for a platform operator, not bound to a tenant.
    pub fn super_admin_token(&self) -> String {
        self.token_for(self.admin_id, None, Role::SuperAdmin)
    }

    /// Creates an ACTIVE customer whose admin signs in with `username` and
    /// [`TEST_PASSWORD`].
    pub async fn seed_customer(&self, name: &str, username: &str) -> CustomerCreated {
        self.state
            .services
            .customers
            .create_customer(
                self.admin_id,
                NewCustomer {
                    name: name.to_string(),
                    system_type: "retail".to_string(),
                    theme: None,
                    logo_url: None,
                    admin: NewCustomerAdmin {
                        username: username.to_string(),
                        email: format!("{username}@shop.example"),
                        password: TEST_PASSWORD.to_string(),
                    },
                },
            )
            .await
            .expect("seed customer for tests")
    }

    /// Creates a cashier in the customer of `admin`, acting as that admin.
    pub async fn seed_cashier(&self, admin: &UserProfile, username: &str) -> UserProfile {
        let caller = self
            .auth_service
            .authenticate(&bearer_headers(&self.token_for(
                admin.id,
                admin.customer_id,
                admin.role,
            )))
            .expect("admin token authenticates");
        self.state
            .services
            .users
            .create_user(
                &caller,
                NewUser {
                    username: username.to_string(),
                    email: format!("{username}@shop.example"),
                    password: TEST_PASSWORD.to_string(),
                    role: Role::Cashier,
                    customer_id: None,
                },
            )
            .await
            .expect("seed cashier for tests")
    }

    pub async fn login(&self, username: &str) -> LoginResponse {
        self.auth_service
            .login(LoginCredentials {
                username: username.to_string(),
                password: TEST_PASSWORD.to_string(),
            })
            .await
            .expect("test login")
    }

    /// Send a request against the router with an optional bearer token.
    pub async fn request(
        &self,
        method: Method,
        uri: &str,
        body: Option<Value>,
        token: Option<&str>,
    ) -> Response {
        let mut builder = Request::builder().method(method).uri(uri);

        if let Some(tok) = token {
            builder = builder.header("authorization", format!("Bearer {}", tok));
        }

        let body = if let Some(json) = body {
            builder = builder.header("content-type", "application/json");
            Body::from(serde_json::to_vec(&json).expect("failed to serialize json request body"))
        } else {
            Body::empty()
        };

        let request = builder.body(body).expect("failed to build request");
        self.router
            .clone()
            .oneshot(request)
            .await
            .expect("router error during test request")
    }

    /// Creates an ACTIVE product for the default tenant.
    pub async fn seed_product(&self, name: &str, price: Decimal, stock: Option<i32>) -> product::Model {
        self.seed_product_for(self.tenant_id, name, price, stock).await
    }

    pub async fn seed_product_for(
        &self,
        tenant_id: Uuid,
        name: &str,
        price: Decimal,
        stock: Option<i32>,
    ) -> product::Model {
        self.state
            .services
            .products
            .create_product(
                tenant_id,
                NewProduct {
                    name: name.to_string(),
                    description: None,
                    price,
                    unit_type: Some("pcs".to_string()),
                    image_url: None,
                    initial_quantity: stock,
                },
            )
            .await
            .expect("seed product for tests")
            .product
    }

    pub async fn stock_of(&self, product_id: Uuid) -> i32 {
        self.state
            .services
            .ledger
            .quantity(&*self.state.db, self.tenant_id, product_id)
            .await
            .expect("read stock")
    }

    pub async fn count<E>(&self, _entity: E) -> u64
    where
        E: EntityTrait,
        E::Model: Send + Sync,
    {
        E::find().count(&*self.state.db).await.expect("count rows")
    }
}

pub async fn read_json(response: Response) -> Value {
    let bytes = to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("read response body");
    serde_json::from_slice(&bytes).expect("response body is json")
}

pub fn bearer_headers(token: &str) -> http::HeaderMap {
    let mut headers = http::HeaderMap::new();
    headers.insert(
        http::header::AUTHORIZATION,
        http::HeaderValue::from_str(&format!("Bearer {token}")).expect("valid header value"),
    );
    headers
}
