pub mod jwt;
pub mod password;
pub mod service;

pub use jwt::JwtService;
pub use password::{hash_password, verify_password};
pub use service::{AuthService, AuthServiceTrait};
