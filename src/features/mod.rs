pub mod auth;
pub mod files;
pub mod memory;
pub mod queries;
pub mod users;
