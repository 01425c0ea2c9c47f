// Stock ledger and the transactions built on it
pub mod inventory;
pub mod money;
pub mod order_numbering;
pub mod orders;
pub mod pre_releases;

// Catalog management
pub mod products;

// Analytics and Reporting
pub mod analytics;

// Tenants and their accounts
pub mod customers;
pub mod users;
