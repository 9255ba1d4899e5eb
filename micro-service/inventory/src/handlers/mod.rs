pub mod auth;
pub mod health;
pub mod items;

use app_error::AppError;

// Extractor rejections are client errors, reported in the usual error body
pub(crate) fn bad_request(rejection: impl std::fmt::Display) -> AppError {
    AppError::input(rejection.to_string())
}
