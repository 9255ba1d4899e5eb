use app_config::JwtConfig;
use app_error::{AppError, AppResult};
use app_models::Claims;
use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use tracing::{debug, warn};

/// Tokens shorter than this are rejected without being parsed.
const MIN_TOKEN_LENGTH: usize = 10;

/// Issues and verifies HS256 session tokens with a fixed one hour lifetime.
pub struct JwtService {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
    has_secret: bool,
}

impl JwtService {
    pub const TOKEN_LIFETIME_HOURS: i64 = 1;

    pub fn new(secret: &[u8]) -> Self {
        // Only HS256 is accepted, whatever the token header claims
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;

        Self {
            encoding_key: EncodingKey::from_secret(secret),
            decoding_key: DecodingKey::from_secret(secret),
            validation,
            has_secret: !secret.is_empty(),
        }
    }

    pub fn issue(&self, user_id: i64, username: &str) -> AppResult<String> {
        self.issue_at(user_id, username, Utc::now())
    }

    /// Issue a token as if it had been signed at `issued_at`.
    pub fn issue_at(
        &self,
        user_id: i64,
        username: &str,
        issued_at: DateTime<Utc>,
    ) -> AppResult<String> {
        if !self.has_secret {
            return Err(AppError::SigningError("signing key is not configured".into()));
        }

        let claims = Claims {
            user_id,
            username: username.to_string(),
            iat: issued_at.timestamp(),
            exp: (issued_at + Duration::hours(Self::TOKEN_LIFETIME_HOURS)).timestamp(),
        };

        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(|e| AppError::SigningError(e.to_string()))
    }

    pub fn validate(&self, token: &str) -> AppResult<Claims> {
        if token.len() < MIN_TOKEN_LENGTH {
            return Err(AppError::InvalidToken);
        }

        let token_data = decode::<Claims>(token, &self.decoding_key, &self.validation)
            .map_err(|e| {
                warn!("Token validation failed: {}", e);
                AppError::InvalidToken
            })?;

        debug!(user_id = token_data.claims.user_id, "Token validated");
        Ok(token_data.claims)
    }
}

impl From<&JwtConfig> for JwtService {
    fn from(config: &JwtConfig) -> Self {
        Self::new(&config.secret)
    }
}
