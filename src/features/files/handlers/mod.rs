pub mod file_handler;
pub mod metadata_handler;
pub mod version_handler;

pub use file_handler::*;
pub use metadata_handler::*;
pub use version_handler::*;
