//! sea-orm entities for the back-office schema.
//!
//! `products`, `inventory` and `orders` carry the owning tenant directly;
//! line items inherit it through their parent record. A tenant is a
//! `customer`, and `users` belong to one unless they are super admins.

pub mod customer;
pub mod inventory;
pub mod order;
pub mod order_item;
pub mod pre_release;
pub mod pre_release_item;
pub mod product;
pub mod refresh_token;
pub mod user;

pub use customer::CustomerStatus;
pub use order::OrderStatus;
pub use pre_release::PreReleaseStatus;
pub use product::ProductStatus;
pub use user::UserStatus;
