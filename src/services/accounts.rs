use std::collections::BTreeSet;

use tokio::task;

use crate::{
    auth::{AuthUser, issue_token},
    config::{AdminSeed, AppConfig, PasswordConfig},
    error::AppError,
    models::{LoginRequest, LoginResponse, NewUser, RegisterRequest, RoleName, User, UserView},
    password::{PasswordError, hash_password, verify_password},
    repository::Repository,
};

const INVALID_CREDENTIALS: &str = "Invalid username or password";

/// Service for registration, login and account lookup.
pub struct AccountService<'a> {
    repo: &'a dyn Repository,
    config: &'a AppConfig,
}

/// Argon2 is CPU-bound; keep it off the async workers.
async fn hash_blocking(password: String, config: PasswordConfig) -> Result<String, AppError> {
    let hashed = task::spawn_blocking(move || hash_password(&password, &config))
        .await
        .map_err(|e| AppError::Internal(e.to_string()))??;
    Ok(hashed)
}

async fn verify_blocking(password: String, hash: String) -> Result<(), PasswordError> {
    task::spawn_blocking(move || verify_password(&password, &hash))
        .await
        .map_err(|e| PasswordError::Hash(e.to_string()))?
}

impl<'a> AccountService<'a> {
    pub fn new(repo: &'a dyn Repository, config: &'a AppConfig) -> Self {
        Self { repo, config }
    }

    /// Register a new account holding the USER role.
    ///
    /// The pre-checks give the friendly message; the unique constraints in
    /// the store still catch a registration that races past them.
    pub async fn register(&self, request: RegisterRequest) -> Result<UserView, AppError> {
        if self.repo.username_exists(&request.username).await? {
            return Err(AppError::Conflict("Username already exists".into()));
        }
        if self.repo.email_exists(&request.email).await? {
            return Err(AppError::Conflict("Email already exists".into()));
        }

        let user = self
            .create(
                request.username,
                request.email,
                request.password,
                BTreeSet::from([RoleName::User]),
            )
            .await?;

        tracing::info!(user_id = %user.id, username = %user.username, "User registered");
        Ok(UserView::from(&user))
    }

    /// Check credentials and issue a session token.
    ///
    /// Unknown usernames and wrong passwords produce the same error.
    pub async fn login(&self, request: LoginRequest) -> Result<LoginResponse, AppError> {
        let Some(user) = self.repo.find_user_by_username(&request.username).await? else {
            tracing::warn!(username = %request.username, "Login failed: unknown username");
            return Err(AppError::Unauthorized(INVALID_CREDENTIALS.into()));
        };

        if let Err(e) = verify_blocking(request.password, user.password_hash.clone()).await {
            if matches!(e, PasswordError::Mismatch) {
                tracing::warn!(username = %user.username, "Login failed: wrong password");
            }
            return Err(e.into());
        }

        let token = issue_token(user.id, self.config)?;
        tracing::info!(user_id = %user.id, "User logged in");

        Ok(LoginResponse {
            user: UserView::from(&user),
            token,
            token_type: "Bearer".into(),
            expires_in: self.config.jwt_ttl_seconds,
        })
    }

    /// The caller's own account.
    pub async fn me(&self, actor: &AuthUser) -> Result<UserView, AppError> {
        let user = self
            .repo
            .find_user(actor.id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("User not found with id: {}", actor.id)))?;
        Ok(UserView::from(&user))
    }

    /// Create the configured administrator unless the username is taken.
    ///
    /// Returns `true` when a new account was created.
    pub async fn ensure_admin(&self, seed: &AdminSeed) -> Result<bool, AppError> {
        if self.repo.username_exists(&seed.username).await? {
            tracing::debug!(username = %seed.username, "Bootstrap admin already present");
            return Ok(false);
        }

        let user = self
            .create(
                seed.username.clone(),
                seed.email.clone(),
                seed.password.clone(),
                BTreeSet::from([RoleName::Admin, RoleName::User]),
            )
            .await?;

        tracing::info!(user_id = %user.id, username = %user.username, "Bootstrap admin created");
        Ok(true)
    }

    async fn create(
        &self,
        username: String,
        email: String,
        password: String,
        roles: BTreeSet<RoleName>,
    ) -> Result<User, AppError> {
        let password_hash = hash_blocking(password, self.config.password).await?;
        let user = self
            .repo
            .create_user(NewUser {
                username,
                email,
                password_hash,
                roles,
            })
            .await?;
        Ok(user)
    }
}
