mod file;
mod file_metadata;
mod file_version;

pub use file::File;
pub use file_metadata::FileMetadata;
pub use file_version::FileVersion;
