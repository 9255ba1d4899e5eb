use app_database::UserStore;
use app_error::{AppError, AppResult, ValidationError};
use app_models::{Claims, LoginInput, NewUser, RegisterInput, User};
use async_trait::async_trait;
use std::sync::Arc;
use tracing::{error, info, warn};

use crate::{JwtService, password};

const MIN_PASSWORD_LENGTH: usize = 6;

/// Trait defining the authentication service interface
#[async_trait]
pub trait AuthServiceTrait: Send + Sync {
    /// Register a new user
    async fn register(&self, input: RegisterInput) -> AppResult<User>;

    /// Exchange credentials for a session token
    async fn login(&self, input: LoginInput) -> AppResult<String>;

    fn validate_token(&self, token: &str) -> AppResult<Claims>;

    async fn get_user_by_id(&self, user_id: i64) -> AppResult<User>;

    async fn get_user_by_username(&self, username: &str) -> AppResult<User>;

    /// Get the JWT service
    fn jwt_service(&self) -> Arc<JwtService>;
}

/// Implementation of the authentication service
pub struct AuthService {
    users: Arc<dyn UserStore>,
    jwt_service: Arc<JwtService>,
}

impl AuthService {
    pub fn new(users: Arc<dyn UserStore>, jwt_service: Arc<JwtService>) -> Self {
        Self { users, jwt_service }
    }
}

async fn hash_blocking(password: String) -> AppResult<String> {
    tokio::task::spawn_blocking(move || password::hash_password(&password))
        .await
        .map_err(|e| AppError::HashingError(e.to_string()))?
}

async fn verify_blocking(password_hash: String, password: String) -> AppResult<bool> {
    tokio::task::spawn_blocking(move || password::verify_password(&password_hash, &password))
        .await
        .map_err(|e| AppError::ServerError(anyhow::anyhow!("password check aborted: {}", e)))
}

#[async_trait]
impl AuthServiceTrait for AuthService {
    fn jwt_service(&self) -> Arc<JwtService> {
        Arc::clone(&self.jwt_service)
    }

    async fn register(&self, input: RegisterInput) -> AppResult<User> {
        let username = input.username.trim().to_string();

        if username.is_empty() {
            return Err(ValidationError::UsernameRequired.into());
        }
        // Counted in characters, not bytes
        if input.password.chars().count() < MIN_PASSWORD_LENGTH {
            return Err(ValidationError::PasswordTooShort.into());
        }

        let password_hash = hash_blocking(input.password).await?;

        let user = self
            .users
            .create(NewUser {
                username,
                password_hash,
            })
            .await?;

        info!(user_id = user.id, username = %user.username, "User registered");
        Ok(user)
    }

    async fn login(&self, input: LoginInput) -> AppResult<String> {
        let username = input.username.trim();
        if username.is_empty() || input.password.is_empty() {
            return Err(AppError::InvalidCredentials);
        }

        let user = match self.users.find_by_username(username).await {
            Ok(user) => user,
            Err(AppError::UserNotFound) => {
                warn!("Login attempt for unknown username");
                return Err(AppError::InvalidCredentials);
            }
            Err(e) => return Err(e),
        };

        if !verify_blocking(user.password_hash.clone(), input.password).await? {
            warn!(user_id = user.id, "Login attempt with wrong password");
            return Err(AppError::InvalidCredentials);
        }

        if user.id <= 0 {
            error!(user_id = user.id, "Stored user has a non-positive id");
            return Err(AppError::ServerError(anyhow::anyhow!(
                "user record '{}' has invalid id {}",
                user.username,
                user.id
            )));
        }

        let token = self.jwt_service.issue(user.id, &user.username)?;

        info!(user_id = user.id, "User logged in");
        Ok(token)
    }

    fn validate_token(&self, token: &str) -> AppResult<Claims> {
        self.jwt_service.validate(token)
    }

    async fn get_user_by_id(&self, user_id: i64) -> AppResult<User> {
        self.users.find_by_id(user_id).await
    }

    async fn get_user_by_username(&self, username: &str) -> AppResult<User> {
        self.users.find_by_username(username).await
    }
}
