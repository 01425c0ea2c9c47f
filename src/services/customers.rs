use crate::{
    auth::password::{hash_password, validate_password},
    auth::refresh_tokens::RefreshTokenStore,
    auth::Role,
    db::{finish_transaction, DbPool},
    entities::customer::{self, CustomerStatus, DEFAULT_THEME},
    entities::user::{self, UserStatus},
    errors::ServiceError,
    services::users::{ensure_unique, normalize_email, UserProfile},
};
use metrics::counter;
use sea_orm::{
    sea_query::Expr, ActiveModelTrait, ColumnTrait, DatabaseTransaction, EntityTrait, QueryFilter,
    QueryOrder, QuerySelect, Set, TransactionTrait,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, instrument};
use uuid::Uuid;
use validator::Validate;

/// First admin account created together with a customer.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct NewCustomerAdmin {
    #[validate(length(min = 3, max = 64, message = "Username must be 3-64 characters"))]
    pub username: String,
    #[validate(email(message = "Invalid email address"))]
    pub email: String,
    #[validate(custom = "validate_password")]
    pub password: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct NewCustomer {
    #[validate(length(min = 1, max = 255, message = "Customer name is required"))]
    pub name: String,
    #[validate(length(min = 1, max = 64, message = "System type is required"))]
    pub system_type: String,
    #[validate(length(min = 1, max = 32))]
    pub theme: Option<String>,
    #[validate(length(max = 1024))]
    pub logo_url: Option<String>,
    #[validate]
    pub admin: NewCustomerAdmin,
}

/// Partial update; absent fields are left untouched.
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
pub struct CustomerUpdate {
    #[validate(length(min = 1, max = 255))]
    pub name: Option<String>,
    #[validate(length(min = 1, max = 64))]
    pub system_type: Option<String>,
    #[validate(length(min = 1, max = 32))]
    pub theme: Option<String>,
    #[validate(length(max = 1024))]
    pub logo_url: Option<String>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct CustomerStatusChange {
    pub status: CustomerStatus,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct ThemeUpdate {
    #[validate(length(min = 1, max = 32, message = "Theme is required"))]
    pub theme: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomerCreated {
    #[serde(flatten)]
    pub customer: customer::Model,
    pub admin: UserProfile,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomerStatusUpdated {
    #[serde(flatten)]
    pub customer: customer::Model,
    pub users_updated: u64,
}

/// The user status that follows a customer status.
pub fn user_status_for(status: CustomerStatus) -> UserStatus {
    match status {
        CustomerStatus::Active => UserStatus::Active,
        CustomerStatus::Inactive => UserStatus::Inactive,
        CustomerStatus::Deleted => UserStatus::Deleted,
    }
}

/// Tenant management for super admins, plus the read and theme operations
/// a tenant performs on its own record.
#[derive(Clone, Debug)]
pub struct CustomerService {
    db_pool: Arc<DbPool>,
    refresh_tokens: Arc<dyn RefreshTokenStore>,
}

impl CustomerService {
    pub fn new(db_pool: Arc<DbPool>, refresh_tokens: Arc<dyn RefreshTokenStore>) -> Self {
        Self {
            db_pool,
            refresh_tokens,
        }
    }

    /// Customers that have not been deleted, by name.
    #[instrument(skip(self))]
    pub async fn list_customers(&self) -> Result<Vec<customer::Model>, ServiceError> {
        let customers = customer::Entity::find()
            .filter(customer::Column::Status.ne(CustomerStatus::Deleted))
            .order_by_asc(customer::Column::Name)
            .all(&*self.db_pool)
            .await?;
        Ok(customers)
    }

    #[instrument(skip(self))]
    pub async fn get_customer(&self, customer_id: Uuid) -> Result<customer::Model, ServiceError> {
        customer::Entity::find_by_id(customer_id)
            .one(&*self.db_pool)
            .await?
            .filter(|c| c.status != CustomerStatus::Deleted)
            .ok_or_else(|| ServiceError::NotFound(format!("Customer {customer_id} not found")))
    }

    /// Creates an ACTIVE customer and its first admin in one transaction.
    #[instrument(skip(self, request), fields(created_by = %created_by, name = %request.name))]
    pub async fn create_customer(
        &self,
        created_by: Uuid,
        request: NewCustomer,
    ) -> Result<CustomerCreated, ServiceError> {
        request.validate()?;
        let password_hash = hash_password(&request.admin.password)?;

        let txn = self.db_pool.begin().await?;
        let result = Self::write_customer(&txn, created_by, request, password_hash).await;
        let created = finish_transaction(txn, result).await?;

        counter!("backoffice_customers.created", 1);
        info!(
            customer_id = %created.customer.id,
            admin_id = %created.admin.id,
            "Customer created"
        );
        Ok(created)
    }

    async fn write_customer(
        txn: &DatabaseTransaction,
        created_by: Uuid,
        request: NewCustomer,
        password_hash: String,
    ) -> Result<CustomerCreated, ServiceError> {
        let username = request.admin.username.trim().to_string();
        let email = normalize_email(&request.admin.email);
        ensure_unique(txn, Some(&username), Some(&email), None).await?;

        let customer = customer::ActiveModel {
            id: Set(Uuid::new_v4()),
            name: Set(request.name.trim().to_string()),
            system_type: Set(request.system_type),
            status: Set(CustomerStatus::Active),
            theme: Set(request.theme.unwrap_or_else(|| DEFAULT_THEME.to_string())),
            logo_url: Set(request.logo_url),
            created_by: Set(Some(created_by)),
            ..Default::default()
        }
        .insert(txn)
        .await?;

        let admin = user::ActiveModel {
            id: Set(Uuid::new_v4()),
            customer_id: Set(Some(customer.id)),
            username: Set(username),
            email: Set(email),
            password_hash: Set(password_hash),
            role: Set(Role::Admin),
            status: Set(UserStatus::Active),
            created_by: Set(Some(created_by)),
            ..Default::default()
        }
        .insert(txn)
        .await?;

        Ok(CustomerCreated {
            customer,
            admin: admin.into(),
        })
    }

    #[instrument(skip(self, request))]
    pub async fn update_customer(
        &self,
        customer_id: Uuid,
        request: CustomerUpdate,
    ) -> Result<customer::Model, ServiceError> {
        request.validate()?;
        let existing = self.get_customer(customer_id).await?;

        let mut active: customer::ActiveModel = existing.into();
        if let Some(name) = request.name {
            active.name = Set(name.trim().to_string());
        }
        if let Some(system_type) = request.system_type {
            active.system_type = Set(system_type);
        }
        if let Some(theme) = request.theme {
            active.theme = Set(theme);
        }
        if let Some(logo_url) = request.logo_url {
            active.logo_url = Set(Some(logo_url));
        }

        let updated = active.update(&*self.db_pool).await?;
        info!(customer_id = %updated.id, "Customer updated");
        Ok(updated)
    }

    /// Sets the customer status and moves every non-deleted user of the
    /// customer to the matching status in the same transaction. Users of a
    /// customer that is no longer active lose their refresh tokens.
    #[instrument(skip(self))]
    pub async fn set_status(
        &self,
        customer_id: Uuid,
        status: CustomerStatus,
    ) -> Result<CustomerStatusUpdated, ServiceError> {
        let existing = self.get_customer(customer_id).await?;

        let txn = self.db_pool.begin().await?;
        let result = Self::write_status(&txn, existing, status).await;
        let (updated, user_ids) = finish_transaction(txn, result).await?;

        if status != CustomerStatus::Active {
            for user_id in &user_ids {
                self.refresh_tokens.revoke_all_for_user(*user_id).await?;
            }
        }

        counter!("backoffice_customers.status_changes", 1, "status" => format!("{status:?}"));
        info!(
            customer_id = %customer_id,
            status = ?status,
            users_updated = user_ids.len(),
            "Customer status changed"
        );
        Ok(CustomerStatusUpdated {
            customer: updated,
            users_updated: user_ids.len() as u64,
        })
    }

    async fn write_status(
        txn: &DatabaseTransaction,
        existing: customer::Model,
        status: CustomerStatus,
    ) -> Result<(customer::Model, Vec<Uuid>), ServiceError> {
        let customer_id = existing.id;
        let mut active: customer::ActiveModel = existing.into();
        active.status = Set(status);
        let updated = active.update(txn).await?;

        let user_ids: Vec<Uuid> = user::Entity::find()
            .select_only()
            .column(user::Column::Id)
            .filter(user::Column::CustomerId.eq(customer_id))
            .filter(user::Column::Status.ne(UserStatus::Deleted))
            .into_tuple()
            .all(txn)
            .await?;

        if !user_ids.is_empty() {
            user::Entity::update_many()
                .col_expr(user::Column::Status, Expr::value(user_status_for(status)))
                .col_expr(user::Column::UpdatedAt, Expr::value(chrono::Utc::now()))
                .filter(user::Column::Id.is_in(user_ids.iter().copied()))
                .exec(txn)
                .await?;
        }

        Ok((updated, user_ids))
    }

    /// Soft delete: the customer and its users move to DELETED.
    pub async fn delete_customer(&self, customer_id: Uuid) -> Result<(), ServiceError> {
        self.set_status(customer_id, CustomerStatus::Deleted).await?;
        Ok(())
    }

    /// Replaces the theme of the caller's own customer.
    #[instrument(skip(self, request))]
    pub async fn update_theme(
        &self,
        customer_id: Uuid,
        request: ThemeUpdate,
    ) -> Result<customer::Model, ServiceError> {
        request.validate()?;
        let existing = self.get_customer(customer_id).await?;

        let mut active: customer::ActiveModel = existing.into();
        active.theme = Set(request.theme);
        Ok(active.update(&*self.db_pool).await?)
    }
}
