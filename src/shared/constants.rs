/// Default page size for pagination
pub const DEFAULT_PAGE_SIZE: i64 = 10;

/// Maximum page size allowed
pub const MAX_PAGE_SIZE: i64 = 100;

// =============================================================================
// ROLE CONSTANTS
// =============================================================================

/// Regular account - owns files, memory and queries
pub const ROLE_USER: &str = "user";

/// Administrator - can change other accounts' quotas and roles
pub const ROLE_ADMIN: &str = "admin";

pub const VALID_ROLES: &[&str] = &[ROLE_USER, ROLE_ADMIN];

// =============================================================================
// FILE METADATA
// =============================================================================

/// Metadata key marking an upload as a reference document for the assistant
pub const REFERENCE_METADATA_KEY: &str = "reference";

pub const MAX_METADATA_VALUE_LEN: usize = 4096;

// =============================================================================
// COMPLETION DEFAULTS
// =============================================================================

pub const DEFAULT_MAX_TOKENS: u32 = 1024;
pub const DEFAULT_TEMPERATURE: f32 = 0.7;

pub const SUMMARY_MAX_TOKENS: u32 = 100;
pub const SUMMARY_TEMPERATURE: f32 = 0.5;

/// Stored in place of a summary when the summarisation call fails
pub const SUMMARY_FALLBACK: &str = "Error generating summary.";
