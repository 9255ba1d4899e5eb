pub mod handlers;
pub mod routes;
pub mod service;
pub mod state;

#[cfg(test)]
mod tests;

pub use routes::create_routes;
pub use service::ItemService;
pub use state::AppState;
