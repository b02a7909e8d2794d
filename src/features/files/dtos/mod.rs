mod file_dto;
mod metadata_dto;

pub use file_dto::*;
pub use metadata_dto::*;
