//! Per-user file storage with versioning and key/value metadata.

pub mod dtos;
pub mod handlers;
pub mod models;
pub mod routes;
pub mod services;

pub use routes::routes;
pub use services::{FileService, MetadataService};
