mod config_loader;
pub use config_loader::*;

use std::fmt;

/// Listener address derived from [`AppConfig`].
#[derive(Debug, Clone)]
pub struct Server {
    pub port: u16,
    pub address: String,
}

impl Server {
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.address, self.port)
    }
}

/// Signing material handed to the token issuer at construction.
#[derive(Clone)]
pub struct JwtConfig {
    pub secret: Vec<u8>,
}

impl fmt::Debug for JwtConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JwtConfig")
            .field("secret_len", &self.secret.len())
            .finish()
    }
}

impl From<&AppConfig> for Server {
    fn from(config: &AppConfig) -> Self {
        Self {
            port: config.server.port,
            address: config.server.host.clone(),
        }
    }
}

impl From<&AppConfig> for JwtConfig {
    fn from(config: &AppConfig) -> Self {
        Self {
            secret: config.security.jwt.secret.clone().into_bytes(),
        }
    }
}
