use crate::{
    auth::password::{hash_password, validate_password},
    auth::refresh_tokens::RefreshTokenStore,
    auth::{AuthUser, Role},
    db::DbPool,
    entities::customer::{self, CustomerStatus},
    entities::user::{self, UserStatus},
    errors::ServiceError,
};
use chrono::{DateTime, Utc};
use metrics::counter;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, ConnectionTrait, EntityTrait, QueryFilter,
    QueryOrder, Set,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, instrument, warn};
use uuid::Uuid;
use validator::Validate;

/// Roles a tenant admin may create and manage.
const TENANT_MANAGED_ROLES: &[Role] = &[Role::Cashier];

/// Public view of a user; never carries the password hash.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub role: Role,
    pub status: UserStatus,
    pub customer_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}

impl From<user::Model> for UserProfile {
    fn from(user: user::Model) -> Self {
        Self {
            id: user.id,
            username: user.username,
            email: user.email,
            role: user.role,
            status: user.status,
            customer_id: user.customer_id,
            created_at: user.created_at,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct NewUser {
    #[validate(length(min = 3, max = 64, message = "Username must be 3-64 characters"))]
    pub username: String,
    #[validate(email(message = "Invalid email address"))]
    pub email: String,
    #[validate(custom = "validate_password")]
    pub password: String,
    pub role: Role,
    /// Only honoured for super admins; tenant admins create users in their
    /// own tenant.
    #[serde(default)]
    pub customer_id: Option<Uuid>,
}

/// Partial update; absent fields are left untouched.
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
pub struct UserUpdate {
    #[validate(length(min = 3, max = 64))]
    pub username: Option<String>,
    #[validate(email)]
    pub email: Option<String>,
    #[validate(custom = "validate_password")]
    pub password: Option<String>,
    pub role: Option<Role>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct UserStatusChange {
    pub status: UserStatus,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AvailabilityQuery {
    pub username: Option<String>,
    pub email: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Availability {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username_available: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email_available: Option<bool>,
}

pub(crate) fn normalize_email(email: &str) -> String {
    email.trim().to_ascii_lowercase()
}

/// Fails with `Conflict` when another user already holds the username or
/// email. `except` excludes the user being updated.
pub(crate) async fn ensure_unique<C>(
    conn: &C,
    username: Option<&str>,
    email: Option<&str>,
    except: Option<Uuid>,
) -> Result<(), ServiceError>
where
    C: ConnectionTrait,
{
    let mut matches = Condition::any();
    if let Some(username) = username {
        matches = matches.add(user::Column::Username.eq(username));
    }
    if let Some(email) = email {
        matches = matches.add(user::Column::Email.eq(email));
    }
    if matches.is_empty() {
        return Ok(());
    }

    let mut query = user::Entity::find().filter(matches);
    if let Some(id) = except {
        query = query.filter(user::Column::Id.ne(id));
    }

    match query.one(conn).await? {
        Some(existing) if Some(existing.username.as_str()) == username => Err(
            ServiceError::Conflict(format!("username '{}' is already taken", existing.username)),
        ),
        Some(existing) => Err(ServiceError::Conflict(format!(
            "email '{}' is already registered",
            existing.email
        ))),
        None => Ok(()),
    }
}

/// Manages back-office and till accounts.
///
/// Super admins see and manage every account. Tenant admins only see and
/// manage the cashiers of their own tenant.
#[derive(Clone, Debug)]
pub struct UserService {
    db_pool: Arc<DbPool>,
    refresh_tokens: Arc<dyn RefreshTokenStore>,
}

impl UserService {
    pub fn new(db_pool: Arc<DbPool>, refresh_tokens: Arc<dyn RefreshTokenStore>) -> Self {
        Self {
            db_pool,
            refresh_tokens,
        }
    }

    #[instrument(skip(self, caller), fields(caller_id = %caller.user_id, role = %caller.role))]
    pub async fn list_users(&self, caller: &AuthUser) -> Result<Vec<UserProfile>, ServiceError> {
        let mut query = user::Entity::find().filter(user::Column::Status.ne(UserStatus::Deleted));

        if caller.role != Role::SuperAdmin {
            let tenant_id = caller.require_tenant()?;
            query = query
                .filter(user::Column::CustomerId.eq(tenant_id))
                .filter(user::Column::Role.is_in(TENANT_MANAGED_ROLES.iter().copied()));
        }

        let users = query
            .order_by_asc(user::Column::Username)
            .all(&*self.db_pool)
            .await?;
        Ok(users.into_iter().map(UserProfile::from).collect())
    }

    #[instrument(skip(self, caller, request), fields(caller_id = %caller.user_id, username = %request.username))]
    pub async fn create_user(
        &self,
        caller: &AuthUser,
        request: NewUser,
    ) -> Result<UserProfile, ServiceError> {
        request.validate()?;

        let customer_id = match caller.role {
            Role::SuperAdmin => match (request.role, request.customer_id) {
                (Role::SuperAdmin, None) => None,
                (Role::SuperAdmin, Some(_)) => {
                    return Err(ServiceError::ValidationError(
                        "super admins are not bound to a customer".to_string(),
                    ))
                }
                (_, Some(customer_id)) => Some(customer_id),
                (_, None) => {
                    return Err(ServiceError::ValidationError(
                        "customer_id is required for tenant users".to_string(),
                    ))
                }
            },
            _ => {
                let tenant_id = caller.require_tenant()?;
                if !TENANT_MANAGED_ROLES.contains(&request.role) {
                    return Err(ServiceError::Forbidden(format!(
                        "cannot create {} accounts",
                        request.role
                    )));
                }
                if request.customer_id.is_some_and(|id| id != tenant_id) {
                    return Err(ServiceError::Forbidden(
                        "cannot create users for another customer".to_string(),
                    ));
                }
                Some(tenant_id)
            }
        };

        let db = &*self.db_pool;
        if let Some(customer_id) = customer_id {
            let customer = customer::Entity::find_by_id(customer_id)
                .one(db)
                .await?
                .filter(|c| c.status != CustomerStatus::Deleted)
                .ok_or_else(|| {
                    ServiceError::NotFound(format!("Customer {customer_id} not found"))
                })?;
            if !customer.is_active() {
                return Err(ServiceError::Conflict(format!(
                    "customer {customer_id} is not active"
                )));
            }
        }

        let username = request.username.trim().to_string();
        let email = normalize_email(&request.email);
        ensure_unique(db, Some(&username), Some(&email), None).await?;

        let user = user::ActiveModel {
            id: Set(Uuid::new_v4()),
            customer_id: Set(customer_id),
            username: Set(username),
            email: Set(email),
            password_hash: Set(hash_password(&request.password)?),
            role: Set(request.role),
            status: Set(UserStatus::Active),
            created_by: Set(Some(caller.user_id)),
            ..Default::default()
        }
        .insert(db)
        .await?;

        counter!("backoffice_users.created", 1, "role" => user.role.to_string());
        info!(user_id = %user.id, "User created");
        Ok(user.into())
    }

    #[instrument(skip(self, caller, request), fields(caller_id = %caller.user_id))]
    pub async fn update_user(
        &self,
        caller: &AuthUser,
        user_id: Uuid,
        request: UserUpdate,
    ) -> Result<UserProfile, ServiceError> {
        request.validate()?;
        let target = self.find_managed(caller, user_id).await?;

        if let Some(role) = request.role {
            let allowed = match caller.role {
                Role::SuperAdmin => (role == Role::SuperAdmin) == target.customer_id.is_none(),
                _ => TENANT_MANAGED_ROLES.contains(&role),
            };
            if !allowed {
                return Err(ServiceError::Forbidden(format!(
                    "cannot assign the {role} role to this user"
                )));
            }
        }

        let username = request.username.as_deref().map(str::trim);
        let email = request.email.as_deref().map(normalize_email);
        let db = &*self.db_pool;
        ensure_unique(db, username, email.as_deref(), Some(target.id)).await?;

        let mut active: user::ActiveModel = target.into();
        if let Some(username) = username {
            active.username = Set(username.to_string());
        }
        if let Some(email) = email {
            active.email = Set(email);
        }
        if let Some(password) = request.password.as_deref() {
            active.password_hash = Set(hash_password(password)?);
        }
        if let Some(role) = request.role {
            active.role = Set(role);
        }

        let updated = active.update(db).await?;
        if request.password.is_some() {
            self.refresh_tokens.revoke_all_for_user(updated.id).await?;
        }
        info!(user_id = %updated.id, "User updated");
        Ok(updated.into())
    }

    /// Activates or deactivates an account. Deactivation ends its sessions.
    #[instrument(skip(self, caller), fields(caller_id = %caller.user_id))]
    pub async fn set_status(
        &self,
        caller: &AuthUser,
        user_id: Uuid,
        status: UserStatus,
    ) -> Result<UserProfile, ServiceError> {
        if status == UserStatus::Deleted {
            return Err(ServiceError::ValidationError(
                "use the delete operation to remove a user".to_string(),
            ));
        }
        if user_id == caller.user_id {
            return Err(ServiceError::Forbidden(
                "cannot change the status of your own account".to_string(),
            ));
        }
        let target = self.find_managed(caller, user_id).await?;

        let mut active: user::ActiveModel = target.into();
        active.status = Set(status);
        let updated = active.update(&*self.db_pool).await?;

        if status != UserStatus::Active {
            let revoked = self.refresh_tokens.revoke_all_for_user(updated.id).await?;
            info!(user_id = %updated.id, revoked, "User deactivated");
        }
        Ok(updated.into())
    }

    /// Soft delete: the row stays so historical records keep their author.
    #[instrument(skip(self, caller), fields(caller_id = %caller.user_id))]
    pub async fn delete_user(&self, caller: &AuthUser, user_id: Uuid) -> Result<(), ServiceError> {
        if user_id == caller.user_id {
            return Err(ServiceError::Forbidden(
                "cannot delete your own account".to_string(),
            ));
        }
        let target = self.find_managed(caller, user_id).await?;

        let mut active: user::ActiveModel = target.into();
        active.status = Set(UserStatus::Deleted);
        let deleted = active.update(&*self.db_pool).await?;
        self.refresh_tokens.revoke_all_for_user(deleted.id).await?;

        counter!("backoffice_users.deleted", 1);
        info!(user_id = %deleted.id, "User deleted");
        Ok(())
    }

    /// Whether the username and/or email are still free.
    pub async fn availability(
        &self,
        query: AvailabilityQuery,
    ) -> Result<Availability, ServiceError> {
        let db = &*self.db_pool;
        let mut availability = Availability::default();

        if let Some(username) = query.username.as_deref().map(str::trim) {
            let taken = user::Entity::find()
                .filter(user::Column::Username.eq(username))
                .one(db)
                .await?
                .is_some();
            availability.username_available = Some(!taken);
        }
        if let Some(email) = query.email.as_deref().map(normalize_email) {
            let taken = user::Entity::find()
                .filter(user::Column::Email.eq(email))
                .one(db)
                .await?
                .is_some();
            availability.email_available = Some(!taken);
        }

        Ok(availability)
    }

    /// Creates the platform operator account when no super admin exists.
    /// Returns whether an account was created.
    #[instrument(skip(self, email, password))]
    pub async fn bootstrap_super_admin(
        &self,
        username: &str,
        email: &str,
        password: &str,
    ) -> Result<bool, ServiceError> {
        let db = &*self.db_pool;
        let existing = user::Entity::find()
            .filter(user::Column::Role.eq(Role::SuperAdmin))
            .filter(user::Column::Status.ne(UserStatus::Deleted))
            .one(db)
            .await?;
        if existing.is_some() {
            return Ok(false);
        }

        if let Err(err) = validate_password(password) {
            warn!(rule = %err.code, "Bootstrap super admin password does not meet the policy");
        }
        let email = normalize_email(email);
        ensure_unique(db, Some(username), Some(&email), None).await?;

        let user = user::ActiveModel {
            id: Set(Uuid::new_v4()),
            customer_id: Set(None),
            username: Set(username.to_string()),
            email: Set(email),
            password_hash: Set(hash_password(password)?),
            role: Set(Role::SuperAdmin),
            status: Set(UserStatus::Active),
            created_by: Set(None),
            ..Default::default()
        }
        .insert(db)
        .await?;

        info!(user_id = %user.id, "Bootstrap super admin created");
        Ok(true)
    }

    /// Loads a non-deleted user the caller may manage. Tenant admins get
    /// `Forbidden` for users of other tenants and for non-cashier accounts.
    async fn find_managed(
        &self,
        caller: &AuthUser,
        user_id: Uuid,
    ) -> Result<user::Model, ServiceError> {
        let target = user::Entity::find_by_id(user_id)
            .one(&*self.db_pool)
            .await?
            .filter(|u| u.status != UserStatus::Deleted)
            .ok_or_else(|| ServiceError::NotFound(format!("User {user_id} not found")))?;

        if caller.role == Role::SuperAdmin {
            return Ok(target);
        }

        let tenant_id = caller.require_tenant()?;
        if target.customer_id != Some(tenant_id) {
            return Err(ServiceError::Forbidden(
                "user belongs to another customer".to_string(),
            ));
        }
        if !TENANT_MANAGED_ROLES.contains(&target.role) {
            return Err(ServiceError::Forbidden(format!(
                "cannot manage {} accounts",
                target.role
            )));
        }
        Ok(target)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn new_user(password: &str, email: &str) -> NewUser {
        NewUser {
            username: "till-01".to_string(),
            email: email.to_string(),
            password: password.to_string(),
            role: Role::Cashier,
            customer_id: None,
        }
    }

    #[test]
    fn new_user_requires_email_and_strong_password() {
        assert!(new_user("Till!001", "till@example.com").validate().is_ok());
        assert!(new_user("Till!001", "not-an-email").validate().is_err());
        assert!(new_user("till001", "till@example.com").validate().is_err());
    }

    #[test]
    fn partial_update_validates_only_present_fields() {
        assert!(UserUpdate::default().validate().is_ok());

        let update = UserUpdate {
            password: Some("weak".to_string()),
            ..UserUpdate::default()
        };
        assert!(update.validate().is_err());
    }

    #[test]
    fn emails_are_compared_case_insensitively() {
        assert_eq!(normalize_email("  Till@Example.COM "), "till@example.com");
    }

    #[test]
    fn profile_never_serializes_a_password_hash() {
        let now = Utc::now();
        let profile = UserProfile::from(user::Model {
            id: Uuid::new_v4(),
            customer_id: Some(Uuid::new_v4()),
            username: "till-01".to_string(),
            email: "till@example.com".to_string(),
            password_hash: "$argon2id$secret".to_string(),
            role: Role::Cashier,
            status: UserStatus::Active,
            created_by: None,
            created_at: now,
            updated_at: now,
        });
        let json = serde_json::to_string(&profile).unwrap();
        assert!(!json.contains("argon2"));
        assert!(json.contains("\"role\":\"cashier\""));
    }
}
