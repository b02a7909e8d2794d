use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    /// Regex for validating username fields
    /// Must start with letter or underscore and contain only alphanumeric characters and underscores
    /// - Valid: "john_doe", "user123", "_admin", "JohnDoe"
    /// - Invalid: "123user", "-user", "user-name", "user name"
    pub static ref USERNAME_REGEX: Regex = Regex::new(r"^[a-zA-Z_][a-zA-Z0-9_]*$").unwrap();

    /// Regex for file metadata keys
    /// - Valid: "reference", "course.id", "tag-1", "Owner_Note"
    /// - Invalid: "", "has space", "a/b", keys over 64 chars
    pub static ref METADATA_KEY_REGEX: Regex = Regex::new(r"^[A-Za-z0-9_.\-]{1,64}$").unwrap();
}

/// Reduce a client-supplied filename to a safe single path component.
///
/// Returns `None` for names that are empty or resolve to `.`/`..`.
pub fn sanitize_filename(raw: &str) -> Option<String> {
    let last = raw
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or("")
        .trim()
        .trim_matches(char::from(0));

    if last.is_empty() || last == "." || last == ".." {
        return None;
    }
    Some(last.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_username_regex() {
        assert!(USERNAME_REGEX.is_match("john_doe"));
        assert!(USERNAME_REGEX.is_match("_admin"));
        assert!(USERNAME_REGEX.is_match("testuser_1a2b3c4d"));
        assert!(!USERNAME_REGEX.is_match("123user"));
        assert!(!USERNAME_REGEX.is_match("user-name"));
        assert!(!USERNAME_REGEX.is_match("user name"));
        assert!(!USERNAME_REGEX.is_match(""));
    }

    #[test]
    fn test_metadata_key_regex() {
        assert!(METADATA_KEY_REGEX.is_match("reference"));
        assert!(METADATA_KEY_REGEX.is_match("course.id"));
        assert!(METADATA_KEY_REGEX.is_match("tag-1"));
        assert!(!METADATA_KEY_REGEX.is_match(""));
        assert!(!METADATA_KEY_REGEX.is_match("has space"));
        assert!(!METADATA_KEY_REGEX.is_match("a/b"));
        assert!(!METADATA_KEY_REGEX.is_match(&"k".repeat(65)));
    }

    #[test]
    fn test_sanitize_filename_strips_directories() {
        assert_eq!(sanitize_filename("notes.txt").as_deref(), Some("notes.txt"));
        assert_eq!(
            sanitize_filename("../../etc/passwd").as_deref(),
            Some("passwd")
        );
        assert_eq!(
            sanitize_filename("C:\\Users\\me\\report.pdf").as_deref(),
            Some("report.pdf")
        );
        assert_eq!(
            sanitize_filename("Screenshot 2025.png").as_deref(),
            Some("Screenshot 2025.png")
        );
    }

    #[test]
    fn test_sanitize_filename_rejects_empty_and_dots() {
        assert!(sanitize_filename("").is_none());
        assert!(sanitize_filename("dir/").is_none());
        assert!(sanitize_filename("..").is_none());
        assert!(sanitize_filename("a/.").is_none());
    }
}
