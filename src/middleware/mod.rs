pub mod auth;
pub mod failure;

pub use auth::{AuthMiddleware, AuthUser};
