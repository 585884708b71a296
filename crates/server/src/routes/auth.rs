//! Request authentication and role guards for the admin surface.
//!
//! `require_bearer_token` resolves the caller into an [`Actor`] request
//! extension; the role guards only read that extension.

use axum::extract::{Request, State};
use axum::http::header::AUTHORIZATION;
use axum::middleware::Next;
use axum::response::Response;
use axum_extra::extract::cookie::CookieJar;
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use sea_orm::{DatabaseConnection, EntityTrait};
use serde::{Deserialize, Serialize};
use tracing::warn;
use uuid::Uuid;

use models::user;
use service::{Actor, ProvisioningService};

use crate::errors::JsonApiError;

pub const AUTH_COOKIE: &str = "auth_token";

#[derive(Clone)]
pub struct ServerAuthConfig {
    pub jwt_secret: String,
}

#[derive(Clone)]
pub struct ServerState {
    pub db: DatabaseConnection,
    pub auth: ServerAuthConfig,
    pub provisioning: ProvisioningService,
}

/// HS256 claims; `sub` is the account id.
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub exp: usize,
}

fn bearer_token(req: &Request) -> Result<Option<String>, JsonApiError> {
    if let Some(header) = req.headers().get(AUTHORIZATION) {
        let value = header.to_str().map_err(|_| JsonApiError::unauthorized("Invalid Authorization header"))?;
        return match value.strip_prefix("Bearer ") {
            Some(token) if !token.trim().is_empty() => Ok(Some(token.trim().to_string())),
            _ => Err(JsonApiError::unauthorized("Invalid Authorization header")),
        };
    }
    // fall back to the session cookie
    let jar = CookieJar::from_headers(req.headers());
    Ok(jar.get(AUTH_COOKIE).map(|c| c.value().to_string()).filter(|t| !t.is_empty()))
}

/// Verify the bearer token and attach the calling account as an [`Actor`].
pub async fn require_bearer_token(
    State(state): State<ServerState>,
    mut req: Request,
    next: Next,
) -> Result<Response, JsonApiError> {
    let path = req.uri().path().to_string();
    let token = bearer_token(&req)?.ok_or_else(|| {
        warn!(path = %path, "missing bearer token");
        JsonApiError::unauthorized("Please login first")
    })?;

    let key = DecodingKey::from_secret(state.auth.jwt_secret.as_bytes());
    let validation = Validation::new(Algorithm::HS256);
    let claims = decode::<Claims>(&token, &key, &validation)
        .map_err(|e| {
            warn!(path = %path, err = %e, "token validation failed");
            JsonApiError::unauthorized("Invalid token")
        })?
        .claims;
    let user_id = Uuid::parse_str(&claims.sub).map_err(|_| JsonApiError::unauthorized("Invalid token"))?;

    let account = user::Entity::find_by_id(user_id)
        .one(&state.db)
        .await
        .map_err(|e| JsonApiError::from(service::ServiceError::from(e)))?
        .ok_or_else(|| JsonApiError::unauthorized("Please login first"))?;
    if account.is_disabled {
        return Err(JsonApiError::forbidden("Your account has been disabled"));
    }

    req.extensions_mut().insert(Actor {
        id: account.id,
        username: account.username,
        admin_type: account.admin_type,
    });
    Ok(next.run(req).await)
}

fn actor(req: &Request) -> Result<&Actor, JsonApiError> {
    req.extensions().get::<Actor>().ok_or_else(|| JsonApiError::unauthorized("Please login first"))
}

pub async fn require_admin(req: Request, next: Next) -> Result<Response, JsonApiError> {
    if !actor(&req)?.admin_type.is_admin_role() {
        return Err(JsonApiError::forbidden("Admin permission required"));
    }
    Ok(next.run(req).await)
}

pub async fn require_super_admin(req: Request, next: Next) -> Result<Response, JsonApiError> {
    if !actor(&req)?.is_super_admin() {
        return Err(JsonApiError::forbidden("Super admin permission required"));
    }
    Ok(next.run(req).await)
}
