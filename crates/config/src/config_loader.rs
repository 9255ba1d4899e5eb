use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::{fmt, fs, path::Path, str::FromStr};
use tracing::{debug, info, warn};

use app_error::{AppError, AppErrorExt, AppResult};

const EMBEDDED_CONFIG: &str = include_str!("../res/app-config.json");
const DEFAULT_JWT_SECRET: &str = "your-default-jwt-secret-for-development";

/// Complete application configuration loaded from JSON file
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct AppConfig {
    pub environment: String,
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub security: SecurityConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub request_timeout_secs: u64,
    pub shutdown_timeout_secs: u64,
    pub body_limit: usize,
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    Surrealdb,
    Memory,
}

impl StorageBackend {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Surrealdb => "surrealdb",
            Self::Memory => "memory",
        }
    }
}

impl fmt::Display for StorageBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StorageBackend {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "surrealdb" => Ok(Self::Surrealdb),
            "memory" => Ok(Self::Memory),
            other => Err(AppError::ConfigError(anyhow::anyhow!(
                "unknown storage backend '{}'",
                other
            ))),
        }
    }
}

#[derive(Serialize, Deserialize, Clone)]
pub struct DatabaseConfig {
    pub backend: StorageBackend,
    pub endpoint: String,
    pub username: String,
    pub password: String,
    pub namespace: String,
    pub database: String,
    pub connect_timeout_secs: u64,
}

// Don't accidentally log credentials
impl fmt::Debug for DatabaseConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DatabaseConfig")
            .field("backend", &self.backend)
            .field("endpoint", &self.endpoint)
            .field("username", &self.username)
            .field("password", &"[REDACTED]")
            .field("namespace", &self.namespace)
            .field("database", &self.database)
            .field("connect_timeout_secs", &self.connect_timeout_secs)
            .finish()
    }
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct SecurityConfig {
    pub jwt: JwtSettings,
    pub cors: CorsConfig,
}

#[derive(Serialize, Deserialize, Clone)]
pub struct JwtSettings {
    pub secret: String,
}

impl fmt::Debug for JwtSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JwtSettings")
            .field("secret", &"[REDACTED]")
            .finish()
    }
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct CorsConfig {
    pub allowed_origins: Vec<String>,
    pub allowed_methods: Vec<String>,
    pub allowed_headers: Vec<String>,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct LoggingConfig {
    pub level: String,
    pub format: String,
}

impl AppConfig {
    /// Load configuration from a JSON file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        let config: AppConfig = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse config file {}", path.display()))?;
        debug!("Configuration loaded from file");
        Ok(config)
    }

    /// Load configuration from `APP_CONFIG_PATH` (or the embedded defaults),
    /// apply environment overrides and validate the result.
    pub fn load() -> AppResult<Self> {
        dotenv::dotenv().ok();

        let mut config = match std::env::var("APP_CONFIG_PATH") {
            Ok(path) => Self::from_file(&path).config_err()?,
            Err(_) => Self::embedded(),
        };

        config.apply_overrides(|key| std::env::var(key).ok())?;
        info!("Loaded configuration for environment: {}", config.environment);

        config.validate()?;
        Ok(config)
    }

    fn embedded() -> Self {
        match serde_json::from_str::<AppConfig>(EMBEDDED_CONFIG) {
            Ok(conf) => conf,
            Err(e) => {
                warn!(
                    "Failed to parse embedded config: {}. Using default configuration.",
                    e
                );
                Self::default()
            }
        }
    }

    /// Overlay values from the process environment (or any other lookup).
    pub fn apply_overrides<F>(&mut self, lookup: F) -> AppResult<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(environment) = lookup("APP_ENV") {
            self.environment = environment;
        }
        if let Some(host) = lookup("SERVER_HOST") {
            self.server.host = host;
        }
        if let Some(port) = lookup("SERVER_PORT") {
            self.server.port = port
                .trim()
                .parse()
                .with_context(|| format!("SERVER_PORT '{}' is not a valid port", port))
                .config_err()?;
        }
        if let Some(backend) = lookup("DB_BACKEND") {
            self.database.backend = backend.parse()?;
        }
        if let Some(endpoint) = lookup("DB_ENDPOINT") {
            self.database.endpoint = endpoint;
        }
        if let Some(username) = lookup("DB_USERNAME") {
            self.database.username = username;
        }
        if let Some(password) = lookup("DB_PASSWORD") {
            self.database.password = password;
        }
        if let Some(namespace) = lookup("DB_NAMESPACE") {
            self.database.namespace = namespace;
        }
        if let Some(database) = lookup("DB_NAME") {
            self.database.database = database;
        }
        if let Some(secret) = lookup("JWT_SECRET") {
            self.security.jwt.secret = secret;
        }
        if let Some(level) = lookup("LOG_LEVEL") {
            self.logging.level = level;
        }
        Ok(())
    }

    pub fn is_production(&self) -> bool {
        self.environment == "production"
    }

    /// Validate the configuration
    pub fn validate(&self) -> AppResult<()> {
        let mut errors = Vec::new();
        let is_production = self.is_production();

        if self.server.host.trim().is_empty() {
            errors.push("Server host cannot be empty".to_string());
        }

        if self.server.port == 0 {
            errors.push("Server port cannot be 0".to_string());
        }

        if self.server.request_timeout_secs == 0 {
            errors.push("Request timeout must be greater than 0".to_string());
        }

        if self.server.shutdown_timeout_secs == 0 {
            errors.push("Shutdown timeout must be greater than 0".to_string());
        }

        if self.server.body_limit == 0 {
            errors.push("Body limit must be greater than 0".to_string());
        }

        if self.database.backend == StorageBackend::Surrealdb {
            self.validate_database_config(is_production, &mut errors);
        }

        let secret = &self.security.jwt.secret;
        if secret.is_empty() {
            errors.push("JWT secret cannot be empty".to_string());
        } else if is_production && (secret.len() < 32 || secret == DEFAULT_JWT_SECRET) {
            errors.push("JWT secret is not secure for production use".to_string());
        } else if secret == DEFAULT_JWT_SECRET {
            warn!("Using the default JWT secret (NOT SAFE FOR PRODUCTION)");
        }

        if !matches!(self.logging.format.as_str(), "json" | "pretty") {
            errors.push(format!(
                "Unknown log format '{}', expected 'json' or 'pretty'",
                self.logging.format
            ));
        }

        if !errors.is_empty() {
            return Err(AppError::ConfigError(anyhow::anyhow!(
                "Invalid configuration: {}",
                errors.join(", ")
            )));
        }
        Ok(())
    }

    fn validate_database_config(&self, is_production: bool, errors: &mut Vec<String>) {
        let db_config = &self.database;

        if db_config.endpoint.trim().is_empty() {
            errors.push("Database endpoint cannot be empty".to_string());
        } else if is_production
            && !db_config.endpoint.starts_with("wss://")
            && !db_config.endpoint.starts_with("mem")
        {
            errors.push(
                "Database should use a secure 'wss://' connection in production".to_string(),
            );
        }

        if db_config.namespace.trim().is_empty() {
            errors.push("Database namespace cannot be empty".to_string());
        }

        if db_config.database.trim().is_empty() {
            errors.push("Database name cannot be empty".to_string());
        }

        if db_config.connect_timeout_secs == 0 {
            errors.push("Database connect timeout must be greater than 0".to_string());
        }

        if is_production && (db_config.username == "root" || db_config.password == "root") {
            errors.push("Using default 'root' database credentials in production is insecure".to_string());
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            environment: "development".to_string(),
            server: ServerConfig {
                host: "0.0.0.0".to_string(),
                port: 8080,
                request_timeout_secs: 30,
                shutdown_timeout_secs: 30,
                body_limit: 1048576, // 1MB
            },
            database: DatabaseConfig {
                backend: StorageBackend::Surrealdb,
                endpoint: "ws://localhost:8000".to_string(),
                username: "root".to_string(),
                password: "root".to_string(),
                namespace: "inventory".to_string(),
                database: "inventory".to_string(),
                connect_timeout_secs: 5,
            },
            security: SecurityConfig {
                jwt: JwtSettings {
                    secret: DEFAULT_JWT_SECRET.to_string(),
                },
                cors: CorsConfig {
                    allowed_origins: vec!["*".to_string()],
                    allowed_methods: ["GET", "POST", "PUT", "DELETE", "OPTIONS"]
                        .into_iter()
                        .map(String::from)
                        .collect(),
                    allowed_headers: vec!["Content-Type".to_string(), "Authorization".to_string()],
                },
            },
            logging: LoggingConfig {
                level: "info".to_string(),
                format: "pretty".to_string(),
            },
        }
    }
}
