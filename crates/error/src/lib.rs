pub mod middleware_handling;

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

/// Field-level rule violations on user and item input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("username is required")]
    UsernameRequired,
    #[error("password must be at least 6 characters")]
    PasswordTooShort,
    #[error("code is required")]
    CodeRequired,
    #[error("title is required")]
    TitleRequired,
    #[error("description is required")]
    DescriptionRequired,
    #[error("price must be greater than zero")]
    InvalidPrice,
    #[error("stock cannot be negative")]
    InvalidStock,
}

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    ConfigError(anyhow::Error),
    #[error("Database error: {0:#}")]
    DatabaseError(anyhow::Error),
    #[error("Server error: {0:#}")]
    ServerError(anyhow::Error),
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error("Invalid input: {0}")]
    InputError(String),
    #[error("user with this username already exists")]
    DuplicateUsername,
    #[error("item with this code already exists")]
    DuplicateCode,
    #[error("user not found")]
    UserNotFound,
    #[error("item not found")]
    ItemNotFound,
    #[error("invalid username or password")]
    InvalidCredentials,
    #[error("invalid or expired token")]
    InvalidToken,
    #[error("authorization header missing or malformed")]
    MissingToken,
    #[error("Failed to hash password: {0}")]
    HashingError(String),
    #[error("Failed to sign token: {0}")]
    SigningError(String),
}

impl AppError {
    pub fn input(message: impl Into<String>) -> Self {
        Self::InputError(message.into())
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::Validation(_) | Self::InputError(_) => StatusCode::BAD_REQUEST,
            Self::UserNotFound | Self::ItemNotFound => StatusCode::NOT_FOUND,
            Self::DuplicateUsername | Self::DuplicateCode => StatusCode::CONFLICT,
            Self::InvalidCredentials | Self::InvalidToken | Self::MissingToken => {
                StatusCode::UNAUTHORIZED
            }
            Self::ConfigError(_)
            | Self::DatabaseError(_)
            | Self::ServerError(_)
            | Self::HashingError(_)
            | Self::SigningError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Stable machine-readable code placed in every error body.
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::Validation(_) => "VALIDATION_ERROR",
            Self::InputError(_) => "INVALID_INPUT",
            Self::DuplicateUsername | Self::DuplicateCode => "DUPLICATE",
            Self::UserNotFound | Self::ItemNotFound => "NOT_FOUND",
            Self::InvalidCredentials => "INVALID_CREDENTIALS",
            Self::InvalidToken | Self::MissingToken => "INVALID_TOKEN",
            Self::ConfigError(_) => "CONFIG_ERROR",
            Self::DatabaseError(_) => "DB_ERROR",
            Self::HashingError(_) | Self::SigningError(_) | Self::ServerError(_) => "SERVER_ERROR",
        }
    }
}

impl From<anyhow::Error> for AppError {
    fn from(error: anyhow::Error) -> Self {
        Self::ServerError(error)
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub status: u16,
    pub code: String,
    pub timestamp: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_id: Option<String>,
}

impl ErrorResponse {
    pub fn new(status: StatusCode, code: &str, error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            status: status.as_u16(),
            code: code.to_string(),
            timestamp: Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true),
            error_id: None,
        }
    }

    pub fn with_error_id(mut self, error_id: impl Into<String>) -> Self {
        self.error_id = Some(error_id.into());
        self
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let error_code = self.error_code();

        // Internal details stay in the log
        let message = if status.is_server_error() {
            tracing::error!(error_code, status_code = status.as_u16(), error = %self, "Request failed");
            "internal server error".to_string()
        } else {
            tracing::warn!(error_code, status_code = status.as_u16(), error = %self, "Request rejected");
            self.to_string()
        };

        (status, Json(ErrorResponse::new(status, error_code, message))).into_response()
    }
}

pub type AppResult<T> = Result<T, AppError>;

// Extension trait to wrap foreign errors with specific context
pub trait AppErrorExt<T> {
    fn config_err(self) -> AppResult<T>;
    fn db_err(self) -> AppResult<T>;
    fn server_err(self) -> AppResult<T>;
}

impl<T, E> AppErrorExt<T> for Result<T, E>
where
    E: Into<anyhow::Error>,
{
    fn config_err(self) -> AppResult<T> {
        self.map_err(|e| AppError::ConfigError(e.into()))
    }

    fn db_err(self) -> AppResult<T> {
        self.map_err(|e| AppError::DatabaseError(e.into()))
    }

    fn server_err(self) -> AppResult<T> {
        self.map_err(|e| AppError::ServerError(e.into()))
    }
}
