use std::{
    collections::BTreeSet,
    time::{SystemTime, UNIX_EPOCH},
};

use axum::{
    extract::{FromRef, FromRequestParts},
    http::{header, request::Parts},
};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    config::{AppConfig, Env},
    error::AppError,
    lifecycle::Actor,
    models::{Post, RoleName, User},
    repository::RepositoryState,
};

/// Claims
///
/// Payload of the session token issued at login and validated on every
/// authenticated request.
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    /// Subject (sub): the user's id.
    pub sub: Uuid,
    /// Expiration time, seconds since the epoch.
    pub exp: usize,
    /// Issued-at time, seconds since the epoch.
    pub iat: usize,
}

/// issue_token
///
/// Signs an HS256 session token for `user_id` valid for `config.jwt_ttl_seconds`.
pub fn issue_token(user_id: Uuid, config: &AppConfig) -> Result<String, AppError> {
    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_err(|e| AppError::Internal(e.to_string()))?
        .as_secs();

    let claims = Claims {
        sub: user_id,
        iat: now as usize,
        exp: (now + config.jwt_ttl_seconds) as usize,
    };

    let key = EncodingKey::from_secret(config.jwt_secret.as_bytes());
    Ok(encode(&Header::default(), &claims, &key)?)
}

/// AuthUser
///
/// The resolved identity of an authenticated request: who the caller is and
/// which roles they hold right now (re-read from the store on every request).
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub id: Uuid,
    pub username: String,
    pub roles: BTreeSet<RoleName>,
}

impl AuthUser {
    pub fn is_admin(&self) -> bool {
        self.roles.contains(&RoleName::Admin)
    }

    pub fn owns(&self, post: &Post) -> bool {
        post.created_by == self.id
    }

    /// The caller as seen by the lifecycle rules for `post`.
    pub fn actor_for(&self, post: &Post) -> Actor {
        Actor {
            is_admin: self.is_admin(),
            is_owner: self.owns(post),
        }
    }
}

impl From<User> for AuthUser {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            username: user.username,
            roles: user.roles,
        }
    }
}

/// AuthUser Extractor Implementation
///
/// Makes `AuthUser` usable as a handler argument. The process:
/// 1. Reuse an identity already resolved by the auth middleware for this request.
/// 2. Local Bypass: in `Env::Local`, accept a known user id in the `x-user-id` header.
/// 3. Bearer token extraction and JWT validation.
/// 4. Store lookup, so deleted users lose access even with a valid token.
///
/// Rejection: `AppError::Unauthorized` (401) on any failure.
impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
    RepositoryState: FromRef<S>,
    AppConfig: FromRef<S>,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        // 1. Already resolved by the route-level middleware.
        if let Some(user) = parts.extensions.get::<AuthUser>() {
            return Ok(user.clone());
        }

        let repo = RepositoryState::from_ref(state);
        let config = AppConfig::from_ref(state);

        // 2. Local Development Bypass Check
        if config.env == Env::Local {
            let bypass_id = parts
                .headers
                .get("x-user-id")
                .and_then(|value| value.to_str().ok())
                .and_then(|raw| Uuid::parse_str(raw).ok());

            if let Some(user_id) = bypass_id {
                if let Some(user) = repo.find_user(user_id).await? {
                    return Ok(user.into());
                }
            }
        }

        // 3. Token Extraction & Validation
        let token = parts
            .headers
            .get(header::AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.strip_prefix("Bearer "))
            .ok_or_else(|| AppError::Unauthorized("Authentication required".into()))?;

        let decoding_key = DecodingKey::from_secret(config.jwt_secret.as_bytes());
        let mut validation = Validation::default();
        validation.validate_exp = true;

        let token_data = decode::<Claims>(token, &decoding_key, &validation).map_err(|e| {
            tracing::debug!("Rejected bearer token: {:?}", e.kind());
            AppError::Unauthorized("Invalid or expired token".into())
        })?;

        // 4. Database Lookup (Final Verification)
        let user = repo
            .find_user(token_data.claims.sub)
            .await?
            .ok_or_else(|| AppError::Unauthorized("Invalid or expired token".into()))?;

        Ok(user.into())
    }
}
