//! Reference documents fed to the assistant alongside memory.
//!
//! Sources, merged and ordered by name:
//! - the shared references directory,
//! - the user's own `references/` directory under their memory dir,
//! - uploads the user tagged with `reference = "true"`.
//!
//! Only plain-text formats are read; anything else is skipped.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use tokio::fs;
use tracing::{debug, info, warn};

use crate::features::files::services::FileContent;

const SUPPORTED_EXTENSIONS: &[&str] = &[
    "txt", "md", "py", "html", "json", "csv", "rs", "toml", "yaml", "yml",
];

const TRUNCATION_MARKER: &str = "\n... [content truncated due to length]";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReferenceDocument {
    pub name: String,
    pub content: String,
}

pub struct ReferenceReader {
    global_dir: PathBuf,
    char_limit: usize,
}

impl ReferenceReader {
    pub fn new(global_dir: impl Into<PathBuf>, char_limit: usize) -> Self {
        Self {
            global_dir: global_dir.into(),
            char_limit,
        }
    }

    /// Every readable reference for a user, sorted by name
    pub async fn collect(
        &self,
        user_references_dir: &Path,
        uploads: Vec<FileContent>,
    ) -> Vec<ReferenceDocument> {
        let mut documents = self.read_global().await;
        documents.extend(self.read_dir(user_references_dir).await);
        documents.extend(
            uploads
                .into_iter()
                .filter_map(|upload| self.from_bytes(&upload.filename, upload.bytes)),
        );

        documents.sort_by(|a, b| a.name.cmp(&b.name));

        let total_chars: usize = documents.iter().map(|d| d.content.chars().count()).sum();
        info!(
            files = documents.len(),
            total_chars, "Collected reference documents"
        );
        documents
    }

    /// Shared directory; created when missing
    async fn read_global(&self) -> Vec<ReferenceDocument> {
        if let Err(e) = fs::metadata(&self.global_dir).await {
            if e.kind() == ErrorKind::NotFound {
                warn!(dir = %self.global_dir.display(), "References directory does not exist, creating it");
                if let Err(e) = fs::create_dir_all(&self.global_dir).await {
                    warn!("Failed to create references directory: {}", e);
                }
                return Vec::new();
            }
        }
        self.read_dir(&self.global_dir).await
    }

    /// Supported files directly inside `dir`; a missing dir yields nothing
    pub async fn read_dir(&self, dir: &Path) -> Vec<ReferenceDocument> {
        let mut entries = match fs::read_dir(dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Vec::new(),
            Err(e) => {
                warn!(dir = %dir.display(), "Error accessing references directory: {}", e);
                return Vec::new();
            }
        };

        let mut documents = Vec::new();
        loop {
            let entry = match entries.next_entry().await {
                Ok(Some(entry)) => entry,
                Ok(None) => break,
                Err(e) => {
                    warn!(dir = %dir.display(), "Error listing references: {}", e);
                    break;
                }
            };

            let path = entry.path();
            let is_file = entry.file_type().await.map(|t| t.is_file()).unwrap_or(false);
            if !is_file {
                debug!(path = %path.display(), "Skipping non-file item");
                continue;
            }

            let name = entry.file_name().to_string_lossy().into_owned();
            if !is_supported(&name) {
                debug!(name, "Skipping unsupported file type");
                continue;
            }

            match fs::read(&path).await {
                Ok(bytes) => documents.extend(self.from_bytes(&name, bytes)),
                Err(e) => warn!(name, "Error reading reference file: {}", e),
            }
        }
        documents
    }

    fn from_bytes(&self, name: &str, bytes: Vec<u8>) -> Option<ReferenceDocument> {
        if !is_supported(name) {
            debug!(name, "Skipping unsupported file type");
            return None;
        }

        let content = match String::from_utf8(bytes) {
            Ok(content) => content,
            Err(_) => {
                warn!(name, "Skipping reference that is not valid UTF-8");
                return None;
            }
        };
        if content.is_empty() {
            return None;
        }

        Some(ReferenceDocument {
            name: name.to_string(),
            content: truncate(content, self.char_limit, name),
        })
    }
}

fn is_supported(name: &str) -> bool {
    Path::new(name)
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| SUPPORTED_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()))
        .unwrap_or(false)
}

fn truncate(content: String, limit: usize, name: &str) -> String {
    let total = content.chars().count();
    if total <= limit {
        return content;
    }

    warn!(name, from = total, to = limit, "Truncating reference content");
    let mut truncated: String = content.chars().take(limit).collect();
    truncated.push_str(TRUNCATION_MARKER);
    truncated
}
