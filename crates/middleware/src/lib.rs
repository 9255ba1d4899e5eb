pub mod api_middleware;

pub use api_middleware::{
    bearer_token, extract_client_id, get_client_ip, jwt_auth_middleware, logging_middleware,
    security_headers_middleware,
};
