/*!
 * # Authentication and Authorization
 *
 * Username/password login against the `users` table, HS256 access and
 * refresh tokens, refresh-token rotation and revocation, and the request
 * side: turning a bearer token into an [`AuthUser`] carrying the caller's
 * id, tenant and role, and gating routes by role.
 */

pub mod password;
pub mod refresh_tokens;

use axum::{
    extract::{DefaultBodyLimit, Extension, FromRequestParts, Request, State},
    http::{header, request::Parts, HeaderMap, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    routing::post,
    Json, Router,
};
use chrono::{DateTime, Duration as ChronoDuration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use metrics::counter;
use sea_orm::{sea_query::StringLen, ColumnTrait, DbErr, DeriveActiveEnum, EntityTrait, EnumIter, QueryFilter};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;
use strum::{Display, EnumString};
use thiserror::Error;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use crate::db::DbPool;
use crate::entities::{customer, user};
use crate::errors::ServiceError;
use crate::services::users::UserProfile;
use crate::ApiResponse;
use refresh_tokens::{DbRefreshTokenStore, RefreshTokenRecord, RefreshTokenStore};

const DEFAULT_REFRESH_TOKEN_EXPIRATION: Duration = Duration::from_secs(7 * 24 * 60 * 60);

/// Account roles. Super admins manage tenants and are not bound to one.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    EnumIter,
    DeriveActiveEnum,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Role {
    #[sea_orm(string_value = "superadmin")]
    SuperAdmin,
    #[sea_orm(string_value = "admin")]
    Admin,
    #[sea_orm(string_value = "cashier")]
    Cashier,
}

/// Roles allowed on catalog, inventory, analytics and user endpoints.
pub const BACK_OFFICE_ROLES: &[Role] = &[Role::SuperAdmin, Role::Admin];

/// Roles allowed on customer (tenant) management endpoints.
pub const PLATFORM_ROLES: &[Role] = &[Role::SuperAdmin];

/// What a signed token may be used for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenKind {
    Access,
    Refresh,
}

/// Claim structure shared by access and refresh tokens
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub tenant_id: Option<String>,
    pub role: String,
    pub kind: TokenKind,
    pub jti: String,
    pub iat: i64,
    pub exp: i64,
    pub nbf: i64,
    pub iss: String,
    pub aud: String,
}

/// Authenticated caller, inserted into request extensions by [`auth_middleware`]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthUser {
    pub user_id: Uuid,
    pub tenant_id: Option<Uuid>,
    pub role: Role,
    pub token_id: String,
}

impl AuthUser {
    pub fn has_any_role(&self, roles: &[Role]) -> bool {
        roles.contains(&self.role)
    }

    /// Tenant the caller acts for. Every tenant-scoped operation requires one.
    pub fn require_tenant(&self) -> Result<Uuid, ServiceError> {
        self.tenant_id.ok_or_else(|| {
            ServiceError::Forbidden("caller is not bound to a tenant".to_string())
        })
    }
}

#[axum::async_trait]
impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
{
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AuthUser>()
            .cloned()
            .ok_or(AuthError::MissingAuth)
    }
}

impl TryFrom<Claims> for AuthUser {
    type Error = AuthError;

    fn try_from(claims: Claims) -> Result<Self, Self::Error> {
        let user_id = Uuid::parse_str(&claims.sub).map_err(|_| AuthError::InvalidToken)?;
        let tenant_id = claims
            .tenant_id
            .as_deref()
            .map(Uuid::parse_str)
            .transpose()
            .map_err(|_| AuthError::InvalidToken)?;
        let role = Role::from_str(&claims.role).map_err(|_| AuthError::InvalidToken)?;

        Ok(Self {
            user_id,
            tenant_id,
            role,
            token_id: claims.jti,
        })
    }
}

/// Authentication configuration
#[derive(Clone, Debug)]
pub struct AuthConfig {
    pub jwt_secret: String,
    pub jwt_issuer: String,
    pub jwt_audience: String,
    pub access_token_expiration: Duration,
    pub refresh_token_expiration: Duration,
}

impl AuthConfig {
    pub fn new(
        jwt_secret: String,
        jwt_issuer: String,
        jwt_audience: String,
        access_token_expiration: Duration,
    ) -> Self {
        Self {
            jwt_secret,
            jwt_issuer,
            jwt_audience,
            access_token_expiration,
            refresh_token_expiration: DEFAULT_REFRESH_TOKEN_EXPIRATION,
        }
    }

    pub fn with_refresh_token_expiration(mut self, expiration: Duration) -> Self {
        self.refresh_token_expiration = expiration;
        self
    }
}

impl From<&crate::config::AppConfig> for AuthConfig {
    fn from(cfg: &crate::config::AppConfig) -> Self {
        Self::new(
            cfg.jwt_secret.clone(),
            cfg.jwt_issuer.clone(),
            cfg.jwt_audience.clone(),
            cfg.jwt_expiration(),
        )
        .with_refresh_token_expiration(cfg.jwt_refresh_expiration())
    }
}

/// Subject of a newly issued token.
#[derive(Debug, Clone)]
pub struct TokenSubject {
    pub user_id: Uuid,
    pub tenant_id: Option<Uuid>,
    pub role: Role,
}

impl From<&user::Model> for TokenSubject {
    fn from(user: &user::Model) -> Self {
        Self {
            user_id: user.id,
            tenant_id: user.customer_id,
            role: user.role,
        }
    }
}

/// Access and refresh token issued together
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
    pub token_type: String,
    pub expires_in: i64,
    pub refresh_expires_in: i64,
}

/// Login credentials
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginCredentials {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginResponse {
    #[serde(flatten)]
    pub tokens: TokenPair,
    pub user: UserProfile,
}

/// Refresh and logout request body
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RefreshTokenRequest {
    pub refresh_token: String,
}

struct SignedToken {
    token: String,
    jti: String,
    expires_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct AuthService {
    config: AuthConfig,
    db: Arc<DbPool>,
    refresh_tokens: Arc<dyn RefreshTokenStore>,
}

impl AuthService {
    /// Service whose refresh tokens live in the `refresh_tokens` table.
    pub fn new(config: AuthConfig, db: Arc<DbPool>) -> Self {
        let refresh_tokens = Arc::new(DbRefreshTokenStore::new(db.clone()));
        Self::with_refresh_token_store(config, db, refresh_tokens)
    }

    pub fn with_refresh_token_store(
        config: AuthConfig,
        db: Arc<DbPool>,
        refresh_tokens: Arc<dyn RefreshTokenStore>,
    ) -> Self {
        Self {
            config,
            db,
            refresh_tokens,
        }
    }

    fn sign(
        &self,
        subject: &TokenSubject,
        kind: TokenKind,
        lifetime: Duration,
    ) -> Result<SignedToken, AuthError> {
        let now = Utc::now();
        let expires_at = now
            + ChronoDuration::from_std(lifetime)
                .map_err(|_| AuthError::TokenCreation("invalid token lifetime".to_string()))?;
        let jti = Uuid::new_v4().to_string();

        let claims = Claims {
            sub: subject.user_id.to_string(),
            tenant_id: subject.tenant_id.map(|id| id.to_string()),
            role: subject.role.to_string(),
            kind,
            jti: jti.clone(),
            iat: now.timestamp(),
            exp: expires_at.timestamp(),
            nbf: now.timestamp(),
            iss: self.config.jwt_issuer.clone(),
            aud: self.config.jwt_audience.clone(),
        };

        let token = encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(self.config.jwt_secret.as_bytes()),
        )
        .map_err(|e| AuthError::TokenCreation(e.to_string()))?;

        Ok(SignedToken {
            token,
            jti,
            expires_at,
        })
    }

    /// Signs an access token for `subject` without a refresh token.
    pub fn generate_token(&self, subject: &TokenSubject) -> Result<String, AuthError> {
        self.sign(subject, TokenKind::Access, self.config.access_token_expiration)
            .map(|signed| signed.token)
    }

    /// Signs an access/refresh pair and stores the refresh token.
    pub async fn issue_tokens(&self, subject: &TokenSubject) -> Result<TokenPair, AuthError> {
        let access = self.sign(subject, TokenKind::Access, self.config.access_token_expiration)?;
        let refresh = self.sign(
            subject,
            TokenKind::Refresh,
            self.config.refresh_token_expiration,
        )?;

        self.refresh_tokens
            .save(RefreshTokenRecord {
                token_id: refresh.jti,
                user_id: subject.user_id,
                expires_at: refresh.expires_at,
            })
            .await?;

        Ok(TokenPair {
            access_token: access.token,
            refresh_token: refresh.token,
            token_type: "Bearer".to_string(),
            expires_in: self.config.access_token_expiration.as_secs() as i64,
            refresh_expires_in: self.config.refresh_token_expiration.as_secs() as i64,
        })
    }

    /// Checks the password, then the account and its customer, and issues
    /// a token pair.
    #[instrument(skip(self, credentials), fields(username = %credentials.username))]
    pub async fn login(&self, credentials: LoginCredentials) -> Result<LoginResponse, AuthError> {
        let username = credentials.username.trim();
        if username.is_empty() || credentials.password.is_empty() {
            return Err(AuthError::MissingCredentials);
        }

        let account = user::Entity::find()
            .filter(user::Column::Username.eq(username))
            .one(&*self.db)
            .await?;
        let account = match account {
            Some(account) if password::verify_password(&credentials.password, &account.password_hash) => {
                account
            }
            _ => {
                counter!("backoffice_auth.login_failures", 1, "reason" => "invalid_credentials");
                warn!("Login rejected: invalid credentials");
                return Err(AuthError::InvalidCredentials);
            }
        };

        if let Err(err) = self.ensure_can_sign_in(&account).await {
            counter!("backoffice_auth.login_failures", 1, "reason" => "account_disabled");
            warn!(user_id = %account.id, error = %err, "Login rejected");
            return Err(err);
        }

        let tokens = self.issue_tokens(&TokenSubject::from(&account)).await?;
        counter!("backoffice_auth.logins", 1, "role" => account.role.to_string());
        info!(user_id = %account.id, role = %account.role, "User signed in");

        Ok(LoginResponse {
            tokens,
            user: account.into(),
        })
    }

    /// Exchanges a stored refresh token for a new pair and revokes the old
    /// one. A refresh token can be used once.
    #[instrument(skip(self, token))]
    pub async fn refresh(&self, token: &str) -> Result<TokenPair, AuthError> {
        let claims = self.validate_token(token)?;
        if claims.kind != TokenKind::Refresh {
            return Err(AuthError::InvalidToken);
        }

        let record = self
            .refresh_tokens
            .find_active(&claims.jti)
            .await?
            .ok_or(AuthError::TokenRevoked)?;

        let account = user::Entity::find_by_id(record.user_id)
            .one(&*self.db)
            .await?
            .ok_or(AuthError::InvalidToken)?;
        self.ensure_can_sign_in(&account).await?;

        // Losing this race to a concurrent refresh of the same token fails.
        if !self.refresh_tokens.revoke(&claims.jti).await? {
            return Err(AuthError::TokenRevoked);
        }

        let tokens = self.issue_tokens(&TokenSubject::from(&account)).await?;
        debug!(user_id = %account.id, "Refresh token rotated");
        Ok(tokens)
    }

    /// Revokes a refresh token. An already expired token is accepted.
    #[instrument(skip(self, token))]
    pub async fn logout(&self, token: &str) -> Result<(), AuthError> {
        match self.validate_token(token) {
            Ok(claims) if claims.kind == TokenKind::Refresh => {
                let revoked = self.refresh_tokens.revoke(&claims.jti).await?;
                info!(subject = %claims.sub, revoked, "User signed out");
                Ok(())
            }
            Ok(_) => Err(AuthError::InvalidToken),
            Err(AuthError::TokenExpired) => Ok(()),
            Err(err) => Err(err),
        }
    }

    /// Active user whose customer, if any, is active too.
    async fn ensure_can_sign_in(&self, account: &user::Model) -> Result<(), AuthError> {
        if !account.is_active() {
            return Err(AuthError::AccountDisabled(
                "account is inactive or deleted".to_string(),
            ));
        }
        if account.role == Role::SuperAdmin {
            return Ok(());
        }

        let customer_id = account.customer_id.ok_or_else(|| {
            AuthError::AccountDisabled("account is not linked to a customer".to_string())
        })?;
        let customer = customer::Entity::find_by_id(customer_id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| AuthError::AccountDisabled("customer not found".to_string()))?;
        if !customer.is_active() {
            return Err(AuthError::AccountDisabled(
                "customer account is not active".to_string(),
            ));
        }
        Ok(())
    }

    /// Verifies signature, expiry, issuer and audience.
    pub fn validate_token(&self, token: &str) -> Result<Claims, AuthError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_issuer(&[self.config.jwt_issuer.as_str()]);
        validation.set_audience(&[self.config.jwt_audience.as_str()]);
        validation.validate_nbf = true;

        decode::<Claims>(
            token,
            &DecodingKey::from_secret(self.config.jwt_secret.as_bytes()),
            &validation,
        )
        .map(|data| data.claims)
        .map_err(|e| match e.kind() {
            jsonwebtoken::errors::ErrorKind::ExpiredSignature => AuthError::TokenExpired,
            _ => {
                debug!(error = %e, "token rejected");
                AuthError::InvalidToken
            }
        })
    }

    pub fn authenticate(&self, headers: &HeaderMap) -> Result<AuthUser, AuthError> {
        let value = headers
            .get(header::AUTHORIZATION)
            .ok_or(AuthError::MissingToken)?
            .to_str()
            .map_err(|_| AuthError::InvalidToken)?;
        let token = value
            .strip_prefix("Bearer ")
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .ok_or(AuthError::MissingToken)?;

        let claims = self.validate_token(token)?;
        if claims.kind != TokenKind::Access {
            return Err(AuthError::InvalidToken);
        }
        claims.try_into()
    }
}

/// Authentication error types
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Missing authentication")]
    MissingAuth,

    #[error("Missing token")]
    MissingToken,

    #[error("Invalid token")]
    InvalidToken,

    #[error("Token has expired")]
    TokenExpired,

    #[error("Token creation failed: {0}")]
    TokenCreation(String),

    #[error("Insufficient permissions")]
    InsufficientPermissions,

    #[error("Username and password are required")]
    MissingCredentials,

    #[error("Invalid username or password")]
    InvalidCredentials,

    #[error("Account disabled: {0}")]
    AccountDisabled(String),

    #[error("Refresh token has been revoked")]
    TokenRevoked,

    #[error("Authentication backend error: {0}")]
    Internal(String),
}

impl From<ServiceError> for AuthError {
    fn from(err: ServiceError) -> Self {
        Self::Internal(err.to_string())
    }
}

impl From<DbErr> for AuthError {
    fn from(err: DbErr) -> Self {
        Self::Internal(err.to_string())
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let (status, code) = match &self {
            Self::MissingAuth => (StatusCode::UNAUTHORIZED, "AUTH_MISSING"),
            Self::MissingToken => (StatusCode::UNAUTHORIZED, "AUTH_MISSING_TOKEN"),
            Self::InvalidToken => (StatusCode::UNAUTHORIZED, "AUTH_INVALID_TOKEN"),
            Self::TokenExpired => (StatusCode::UNAUTHORIZED, "AUTH_TOKEN_EXPIRED"),
            Self::InsufficientPermissions => (StatusCode::FORBIDDEN, "AUTH_FORBIDDEN"),
            Self::MissingCredentials => (StatusCode::BAD_REQUEST, "AUTH_MISSING_CREDENTIALS"),
            Self::InvalidCredentials => (StatusCode::UNAUTHORIZED, "AUTH_INVALID_CREDENTIALS"),
            Self::AccountDisabled(_) => (StatusCode::FORBIDDEN, "AUTH_ACCOUNT_DISABLED"),
            Self::TokenRevoked => (StatusCode::UNAUTHORIZED, "AUTH_TOKEN_REVOKED"),
            Self::TokenCreation(_) | Self::Internal(_) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "AUTH_INTERNAL")
            }
        };

        let message = match &self {
            Self::TokenCreation(detail) | Self::Internal(detail) => {
                ::tracing::error!(error = %detail, "Authentication failed internally");
                "Authentication is temporarily unavailable".to_string()
            }
            _ => self.to_string(),
        };

        let body = Json(serde_json::json!({
            "error": {
                "code": code,
                "message": message,
            }
        }));

        (status, body).into_response()
    }
}

/// Authentication middleware that extracts and validates the bearer token
pub async fn auth_middleware(mut request: Request, next: Next) -> Response {
    let auth_service = match request.extensions().get::<Arc<AuthService>>() {
        Some(service) => service.clone(),
        None => {
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Authentication service not available",
            )
                .into_response();
        }
    };

    match auth_service.authenticate(request.headers()) {
        Ok(user) => {
            request.extensions_mut().insert(user);
            next.run(request).await
        }
        Err(e) => e.into_response(),
    }
}

/// Rejects callers whose role is not in the allowed set
pub async fn role_middleware(
    State(allowed): State<&'static [Role]>,
    request: Request,
    next: Next,
) -> Result<Response, AuthError> {
    let user = request
        .extensions()
        .get::<AuthUser>()
        .ok_or(AuthError::MissingAuth)?;

    if !user.has_any_role(allowed) {
        return Err(AuthError::InsufficientPermissions);
    }

    Ok(next.run(request).await)
}

/// Extension methods for Router to add auth middleware
pub trait AuthRouterExt {
    fn with_auth(self) -> Self;
    fn with_roles(self, roles: &'static [Role]) -> Self;
}

impl<S> AuthRouterExt for axum::Router<S>
where
    S: Clone + Send + Sync + 'static,
{
    fn with_auth(self) -> Self {
        self.layer(axum::middleware::from_fn(auth_middleware))
    }

    fn with_roles(self, roles: &'static [Role]) -> Self {
        self.layer(axum::middleware::from_fn_with_state(roles, role_middleware))
            .with_auth()
    }
}

/// Public authentication routes, nested under `/api/v1/auth`.
pub fn auth_routes<S>() -> Router<S>
where
    S: Clone + Send + Sync + 'static,
{
    Router::new()
        .route("/login", post(login_handler))
        .route("/refresh", post(refresh_token_handler))
        .route("/logout", post(logout_handler))
        .layer(DefaultBodyLimit::max(1024 * 64))
}

/// Login handler
pub async fn login_handler(
    Extension(auth_service): Extension<Arc<AuthService>>,
    Json(credentials): Json<LoginCredentials>,
) -> Result<Json<ApiResponse<LoginResponse>>, AuthError> {
    let response = auth_service.login(credentials).await?;
    Ok(Json(ApiResponse::success(response)))
}

/// Refresh token handler
pub async fn refresh_token_handler(
    Extension(auth_service): Extension<Arc<AuthService>>,
    Json(request): Json<RefreshTokenRequest>,
) -> Result<Json<ApiResponse<TokenPair>>, AuthError> {
    let tokens = auth_service.refresh(&request.refresh_token).await?;
    Ok(Json(ApiResponse::success(tokens)))
}

/// Logout handler
pub async fn logout_handler(
    Extension(auth_service): Extension<Arc<AuthService>>,
    Json(request): Json<RefreshTokenRequest>,
) -> Result<StatusCode, AuthError> {
    auth_service.logout(&request.refresh_token).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn offline(config: AuthConfig) -> AuthService {
        AuthService::new(config, Arc::new(DbPool::default()))
    }

    fn service() -> AuthService {
        offline(AuthConfig::new(
            "unit-test-secret-unit-test-secret-0123".to_string(),
            "retail-auth".to_string(),
            "retail-backoffice".to_string(),
            Duration::from_secs(300),
        ))
    }

    fn bearer(token: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::AUTHORIZATION,
            HeaderValue::from_str(&format!("Bearer {}", token)).unwrap(),
        );
        headers
    }

    #[test]
    fn issued_token_round_trips_into_auth_user() {
        let auth = service();
        let subject = TokenSubject {
            user_id: Uuid::new_v4(),
            tenant_id: Some(Uuid::new_v4()),
            role: Role::Cashier,
        };
        let token = auth.generate_token(&subject).unwrap();

        let user = auth.authenticate(&bearer(&token)).unwrap();
        assert_eq!(user.user_id, subject.user_id);
        assert_eq!(user.tenant_id, subject.tenant_id);
        assert_eq!(user.role, Role::Cashier);
        assert!(user.require_tenant().is_ok());
    }

    #[test]
    fn token_from_other_audience_is_rejected() {
        let issuer = offline(AuthConfig::new(
            "unit-test-secret-unit-test-secret-0123".to_string(),
            "retail-auth".to_string(),
            "someone-else".to_string(),
            Duration::from_secs(300),
        ));
        let token = issuer
            .generate_token(&TokenSubject {
                user_id: Uuid::new_v4(),
                tenant_id: None,
                role: Role::Admin,
            })
            .unwrap();

        assert!(matches!(
            service().authenticate(&bearer(&token)),
            Err(AuthError::InvalidToken)
        ));
    }

    #[test]
    fn missing_header_is_reported() {
        assert!(matches!(
            service().authenticate(&HeaderMap::new()),
            Err(AuthError::MissingToken)
        ));
    }

    #[test]
    fn super_admin_without_tenant_cannot_act_on_tenant_data() {
        let user = AuthUser {
            user_id: Uuid::new_v4(),
            tenant_id: None,
            role: Role::SuperAdmin,
            token_id: "t".into(),
        };
        assert!(user.has_any_role(BACK_OFFICE_ROLES));
        assert!(matches!(
            user.require_tenant(),
            Err(ServiceError::Forbidden(_))
        ));
    }

    #[test]
    fn roles_use_lowercase_names() {
        assert_eq!(Role::SuperAdmin.to_string(), "superadmin");
        assert_eq!(Role::from_str("cashier").unwrap(), Role::Cashier);
    }

    #[test]
    fn refresh_tokens_are_not_accepted_as_access_tokens() {
        let auth = service();
        let subject = TokenSubject {
            user_id: Uuid::new_v4(),
            tenant_id: Some(Uuid::new_v4()),
            role: Role::Admin,
        };
        let refresh = auth
            .sign(&subject, TokenKind::Refresh, Duration::from_secs(60))
            .unwrap();

        assert_eq!(auth.validate_token(&refresh.token).unwrap().kind, TokenKind::Refresh);
        assert!(matches!(
            auth.authenticate(&bearer(&refresh.token)),
            Err(AuthError::InvalidToken)
        ));
    }

    #[tokio::test]
    async fn access_token_cannot_be_used_to_refresh_or_log_out() {
        let auth = service();
        let access = auth
            .generate_token(&TokenSubject {
                user_id: Uuid::new_v4(),
                tenant_id: None,
                role: Role::SuperAdmin,
            })
            .unwrap();

        assert!(matches!(auth.refresh(&access).await, Err(AuthError::InvalidToken)));
        assert!(matches!(auth.logout(&access).await, Err(AuthError::InvalidToken)));
    }

    #[test]
    fn internal_failures_do_not_leak_details() {
        let response = AuthError::Internal("connection refused".into()).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(AuthError::AccountDisabled("x".into()).into_response().status(), StatusCode::FORBIDDEN);
        assert_eq!(AuthError::MissingCredentials.into_response().status(), StatusCode::BAD_REQUEST);
    }
}
