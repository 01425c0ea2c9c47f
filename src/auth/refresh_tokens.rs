//! Persistence of issued refresh tokens.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sea_orm::{sea_query::Expr, ActiveModelTrait, ColumnTrait, EntityTrait, QueryFilter, Set};
use std::fmt;
use std::sync::Arc;
use uuid::Uuid;

use crate::db::DbPool;
use crate::entities::refresh_token;
use crate::errors::ServiceError;

/// An issued refresh token, identified by its `jti`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RefreshTokenRecord {
    pub token_id: String,
    pub user_id: Uuid,
    pub expires_at: DateTime<Utc>,
}

/// Storage for refresh tokens. A token is usable while it is stored,
/// unrevoked and unexpired.
#[async_trait]
pub trait RefreshTokenStore: Send + Sync + fmt::Debug {
    async fn save(&self, record: RefreshTokenRecord) -> Result<(), ServiceError>;

    /// The record for `token_id` if it is still usable.
    async fn find_active(
        &self,
        token_id: &str,
    ) -> Result<Option<RefreshTokenRecord>, ServiceError>;

    /// Returns whether a usable token was revoked.
    async fn revoke(&self, token_id: &str) -> Result<bool, ServiceError>;

    /// Revokes every token of the user and returns how many were usable.
    async fn revoke_all_for_user(&self, user_id: Uuid) -> Result<u64, ServiceError>;
}

/// [`RefreshTokenStore`] over the `refresh_tokens` table.
#[derive(Debug, Clone)]
pub struct DbRefreshTokenStore {
    db: Arc<DbPool>,
}

impl DbRefreshTokenStore {
    pub fn new(db: Arc<DbPool>) -> Self {
        Self { db }
    }
}

#[async_trait]
impl RefreshTokenStore for DbRefreshTokenStore {
    async fn save(&self, record: RefreshTokenRecord) -> Result<(), ServiceError> {
        refresh_token::ActiveModel {
            id: Set(Uuid::new_v4()),
            user_id: Set(record.user_id),
            token_id: Set(record.token_id),
            created_at: Set(Utc::now()),
            expires_at: Set(record.expires_at),
            revoked: Set(false),
        }
        .insert(&*self.db)
        .await?;
        Ok(())
    }

    async fn find_active(
        &self,
        token_id: &str,
    ) -> Result<Option<RefreshTokenRecord>, ServiceError> {
        let row = refresh_token::Entity::find()
            .filter(refresh_token::Column::TokenId.eq(token_id))
            .filter(refresh_token::Column::Revoked.eq(false))
            .filter(refresh_token::Column::ExpiresAt.gt(Utc::now()))
            .one(&*self.db)
            .await?;

        Ok(row.map(|row| RefreshTokenRecord {
            token_id: row.token_id,
            user_id: row.user_id,
            expires_at: row.expires_at,
        }))
    }

    async fn revoke(&self, token_id: &str) -> Result<bool, ServiceError> {
        let result = refresh_token::Entity::update_many()
            .col_expr(refresh_token::Column::Revoked, Expr::value(true))
            .filter(refresh_token::Column::TokenId.eq(token_id))
            .filter(refresh_token::Column::Revoked.eq(false))
            .exec(&*self.db)
            .await?;
        Ok(result.rows_affected > 0)
    }

    async fn revoke_all_for_user(&self, user_id: Uuid) -> Result<u64, ServiceError> {
        let result = refresh_token::Entity::update_many()
            .col_expr(refresh_token::Column::Revoked, Expr::value(true))
            .filter(refresh_token::Column::UserId.eq(user_id))
            .filter(refresh_token::Column::Revoked.eq(false))
            .exec(&*self.db)
            .await?;
        Ok(result.rows_affected)
    }
}
