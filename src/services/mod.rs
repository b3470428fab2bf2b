pub mod auth;
pub mod database;
pub mod file;
pub mod media;
pub mod user;
