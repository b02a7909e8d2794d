mod file_service;
mod metadata_service;

pub use file_service::{FileContent, FileService};
pub use metadata_service::{validate_metadata, MetadataService};
