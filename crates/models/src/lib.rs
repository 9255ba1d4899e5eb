pub mod auth;
pub mod item;
pub mod user;

pub use auth::{Actor, Claims};
pub use item::{Item, ItemInput, ItemPage, ItemStatus, ListResponse, NewItem};
pub use user::{LoginInput, NewUser, RegisterInput, RegisteredUser, TokenResponse, User};
