pub mod analytics;
pub mod common;
pub mod customers;
pub mod health;
pub mod inventory;
pub mod orders;
pub mod pre_releases;
pub mod products;
pub mod users;

use crate::auth::refresh_tokens::{DbRefreshTokenStore, RefreshTokenStore};
use crate::config::AppConfig;
use crate::db::DbPool;
use crate::services::{
    analytics::AnalyticsService,
    customers::CustomerService,
    inventory::{InventoryLedger, StockLocks},
    order_numbering::OrderNumberGenerator,
    orders::OrderService,
    pre_releases::PreReleaseService,
    products::ProductService,
    users::UserService,
};
use std::sync::Arc;

// Re-export AppState so handler modules can import it as crate::handlers::AppState
pub use crate::AppState;

/// Services layer that encapsulates business logic used by HTTP handlers
#[derive(Clone, Debug)]
pub struct AppServices {
    pub ledger: Arc<InventoryLedger>,
    pub orders: Arc<OrderService>,
    pub pre_releases: Arc<PreReleaseService>,
    pub products: Arc<ProductService>,
    pub analytics: Arc<AnalyticsService>,
    pub customers: Arc<CustomerService>,
    pub users: Arc<UserService>,
}

impl AppServices {
    /// Wires every service over one pool. Orders and pre-releases share the
    /// ledger, and with it the stock lease registry. Customers and users
    /// share the refresh-token store they revoke sessions through.
    pub fn new(db_pool: Arc<DbPool>, config: &AppConfig) -> Self {
        let transaction_timeout = config.transaction_timeout();

        let ledger = Arc::new(InventoryLedger::new(
            db_pool.clone(),
            StockLocks::new(),
            transaction_timeout,
        ));
        let orders = Arc::new(OrderService::new(
            db_pool.clone(),
            ledger.clone(),
            OrderNumberGenerator::new(config.order_number_prefix.clone()),
            transaction_timeout,
        ));
        let pre_releases = Arc::new(PreReleaseService::new(
            db_pool.clone(),
            ledger.clone(),
            transaction_timeout,
        ));
        let products = Arc::new(ProductService::new(db_pool.clone()));
        let analytics = Arc::new(AnalyticsService::new(db_pool.clone()));

        let refresh_tokens: Arc<dyn RefreshTokenStore> =
            Arc::new(DbRefreshTokenStore::new(db_pool.clone()));
        let customers = Arc::new(CustomerService::new(
            db_pool.clone(),
            refresh_tokens.clone(),
        ));
        let users = Arc::new(UserService::new(db_pool, refresh_tokens));

        Self {
            ledger,
            orders,
            pre_releases,
            products,
            analytics,
            customers,
            users,
        }
    }
}
