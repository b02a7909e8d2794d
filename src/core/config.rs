use std::env;
use std::path::PathBuf;
use std::time::Duration;

use jsonwebtoken::Algorithm;

#[derive(Debug, Clone)]
pub struct Config {
    pub app: AppConfig,
    pub database: DatabaseConfig,
    pub auth: AuthConfig,
    pub storage: StorageConfig,
    pub memory: MemoryConfig,
    pub completion: CompletionConfig,
    pub swagger: SwaggerConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub cors_allowed_origins: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub min_connections: u32,
    pub acquire_timeout_secs: u64,
    pub idle_timeout_secs: u64,
    pub max_lifetime_secs: u64,
}

#[derive(Clone, Debug)]
pub struct AuthConfig {
    pub jwt_secret: String,
    pub algorithm: Algorithm,
    pub access_token_ttl: Duration,
}

/// Where uploaded file bytes live
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageBackend {
    /// Bytes written under `assets_dir/{user_id}/`
    Disk,
    /// Bytes kept in the `content` columns
    Database,
}

#[derive(Debug, Clone)]
pub struct StorageConfig {
    pub backend: StorageBackend,
    pub assets_dir: PathBuf,
    /// Per-user upload ceiling assigned at registration
    pub default_max_upload_size: i64,
    /// Hard cap on any request body, applied to the upload route
    pub max_request_body_size: usize,
}

#[derive(Debug, Clone)]
pub struct MemoryConfig {
    pub memory_dir: PathBuf,
    pub references_dir: PathBuf,
    pub reference_char_limit: usize,
    pub reference_prompt_chars: usize,
    pub recent_conversations: usize,
    pub max_conversations: usize,
}

#[derive(Debug, Clone)]
pub struct CompletionConfig {
    pub api_key: Option<String>,
    pub base_url: String,
    pub default_model: String,
    pub timeout: Duration,
}

#[derive(Debug, Clone)]
pub struct SwaggerConfig {
    pub username: Option<String>,
    pub password: Option<String>,
    pub title: String,
    pub version: String,
    pub description: String,
}

#[derive(Debug, Clone)]
pub struct LoggingConfig {
    /// When set, a daily rolling JSON log is written here in addition to stdout
    pub log_dir: Option<PathBuf>,
}

impl Config {
    pub fn from_env() -> Result<Self, String> {
        if let Err(e) = dotenvy::dotenv() {
            if !e.to_string().contains("not found") {
                eprintln!("Warning: Error loading .env file: {}", e);
            }
        }

        Ok(Config {
            app: AppConfig::from_env()?,
            database: DatabaseConfig::from_env()?,
            auth: AuthConfig::from_env()?,
            storage: StorageConfig::from_env()?,
            memory: MemoryConfig::from_env()?,
            completion: CompletionConfig::from_env()?,
            swagger: SwaggerConfig::from_env()?,
            logging: LoggingConfig::from_env(),
        })
    }
}

/// Parse an optional numeric env var, falling back to `default`
fn parse_env<T: std::str::FromStr>(name: &str, default: T) -> Result<T, String> {
    match env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse::<T>()
            .map_err(|_| format!("{} must be a valid number", name)),
        Err(_) => Ok(default),
    }
}

fn read_only_fs() -> bool {
    env::var("READ_ONLY_FS")
        .map(|v| matches!(v.to_lowercase().as_str(), "1" | "true" | "yes"))
        .unwrap_or(false)
}

impl AppConfig {
    pub fn from_env() -> Result<Self, String> {
        let host = env::var("HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
        let port = env::var("PORT")
            .unwrap_or_else(|_| "7050".to_string())
            .parse::<u16>()
            .map_err(|e| format!("Invalid PORT: {}", e))?;

        let cors_allowed_origins = env::var("CORS_ALLOWED_ORIGINS")
            .unwrap_or_else(|_| "*".to_string())
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        Ok(Self {
            host,
            port,
            cors_allowed_origins,
        })
    }

    pub fn server_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl DatabaseConfig {
    const DEFAULT_MAX_CONNECTIONS: u32 = 10;
    const DEFAULT_MIN_CONNECTIONS: u32 = 1;
    const DEFAULT_ACQUIRE_TIMEOUT_SECS: u64 = 5;
    const DEFAULT_IDLE_TIMEOUT_SECS: u64 = 600; // 10 minutes
    const DEFAULT_MAX_LIFETIME_SECS: u64 = 1800; // 30 minutes

    pub fn from_env() -> Result<Self, String> {
        let url = env::var("DATABASE_URL").map_err(|_| "DATABASE_URL must be set".to_string())?;

        Ok(Self {
            url,
            max_connections: parse_env("DB_MAX_CONNECTIONS", Self::DEFAULT_MAX_CONNECTIONS)?,
            min_connections: parse_env("DB_MIN_CONNECTIONS", Self::DEFAULT_MIN_CONNECTIONS)?,
            acquire_timeout_secs: parse_env(
                "DB_ACQUIRE_TIMEOUT_SECS",
                Self::DEFAULT_ACQUIRE_TIMEOUT_SECS,
            )?,
            idle_timeout_secs: parse_env("DB_IDLE_TIMEOUT_SECS", Self::DEFAULT_IDLE_TIMEOUT_SECS)?,
            max_lifetime_secs: parse_env("DB_MAX_LIFETIME_SECS", Self::DEFAULT_MAX_LIFETIME_SECS)?,
        })
    }
}

impl AuthConfig {
    const DEFAULT_ACCESS_TOKEN_EXPIRE_MINUTES: u64 = 60;

    pub fn from_env() -> Result<Self, String> {
        let jwt_secret = env::var("JWT_SECRET")
            .ok()
            .filter(|s| !s.is_empty())
            .ok_or_else(|| "JWT_SECRET environment variable is required".to_string())?;

        let algorithm = parse_hmac_algorithm(
            &env::var("JWT_ALGORITHM").unwrap_or_else(|_| "HS256".to_string()),
        )?;

        let minutes = parse_env(
            "ACCESS_TOKEN_EXPIRE_MINUTES",
            Self::DEFAULT_ACCESS_TOKEN_EXPIRE_MINUTES,
        )?;

        Ok(Self {
            jwt_secret,
            algorithm,
            access_token_ttl: Duration::from_secs(minutes * 60),
        })
    }
}

/// Only shared-secret algorithms make sense for locally issued tokens
pub fn parse_hmac_algorithm(raw: &str) -> Result<Algorithm, String> {
    match raw.trim().to_uppercase().as_str() {
        "HS256" => Ok(Algorithm::HS256),
        "HS384" => Ok(Algorithm::HS384),
        "HS512" => Ok(Algorithm::HS512),
        other => Err(format!(
            "JWT_ALGORITHM must be one of HS256, HS384, HS512 (got {})",
            other
        )),
    }
}

impl StorageConfig {
    const DEFAULT_MAX_UPLOAD_SIZE: i64 = 524_288_000; // 500MB
    const MULTIPART_OVERHEAD: usize = 1024 * 1024;

    pub fn from_env() -> Result<Self, String> {
        let backend = match env::var("STORAGE_BACKEND")
            .unwrap_or_else(|_| "disk".to_string())
            .to_lowercase()
            .as_str()
        {
            "disk" => StorageBackend::Disk,
            "database" | "db" => StorageBackend::Database,
            other => {
                return Err(format!(
                    "STORAGE_BACKEND must be 'disk' or 'database' (got {})",
                    other
                ))
            }
        };

        let assets_dir = if read_only_fs() {
            PathBuf::from("/tmp/assets")
        } else {
            PathBuf::from(env::var("ASSETS_DIR").unwrap_or_else(|_| "assets".to_string()))
        };

        let default_max_upload_size =
            parse_env("DEFAULT_MAX_UPLOAD_SIZE", Self::DEFAULT_MAX_UPLOAD_SIZE)?;
        if default_max_upload_size <= 0 {
            return Err("DEFAULT_MAX_UPLOAD_SIZE must be positive".to_string());
        }

        let max_request_body_size = parse_env(
            "MAX_REQUEST_BODY_SIZE",
            default_max_upload_size as usize + Self::MULTIPART_OVERHEAD,
        )?;

        Ok(Self {
            backend,
            assets_dir,
            default_max_upload_size,
            max_request_body_size,
        })
    }
}

impl MemoryConfig {
    const DEFAULT_REFERENCE_CHAR_LIMIT: usize = 12_000;
    const DEFAULT_REFERENCE_PROMPT_CHARS: usize = 500;
    const DEFAULT_RECENT_CONVERSATIONS: usize = 10;
    const DEFAULT_MAX_CONVERSATIONS: usize = 100;

    pub fn from_env() -> Result<Self, String> {
        let (memory_dir, references_dir) = if read_only_fs() {
            (
                PathBuf::from("/tmp/data/memory"),
                PathBuf::from("/tmp/data/references"),
            )
        } else {
            (
                PathBuf::from(env::var("MEMORY_DIR").unwrap_or_else(|_| "data/memory".to_string())),
                PathBuf::from(
                    env::var("REFERENCES_DIR").unwrap_or_else(|_| "data/references".to_string()),
                ),
            )
        };

        let max_conversations =
            parse_env("MEMORY_MAX_CONVERSATIONS", Self::DEFAULT_MAX_CONVERSATIONS)?;
        if max_conversations == 0 {
            return Err("MEMORY_MAX_CONVERSATIONS must be at least 1".to_string());
        }

        Ok(Self {
            memory_dir,
            references_dir,
            reference_char_limit: parse_env(
                "REFERENCE_CHAR_LIMIT",
                Self::DEFAULT_REFERENCE_CHAR_LIMIT,
            )?,
            reference_prompt_chars: parse_env(
                "REFERENCE_PROMPT_CHARS",
                Self::DEFAULT_REFERENCE_PROMPT_CHARS,
            )?,
            recent_conversations: parse_env(
                "MEMORY_RECENT_CONVERSATIONS",
                Self::DEFAULT_RECENT_CONVERSATIONS,
            )?,
            max_conversations,
        })
    }
}

impl CompletionConfig {
    const DEFAULT_TIMEOUT_SECS: u64 = 60;

    pub fn from_env() -> Result<Self, String> {
        let api_key = env::var("OPENAI_API_KEY").ok().filter(|s| !s.is_empty());
        let base_url =
            env::var("OPENAI_BASE_URL").unwrap_or_else(|_| "https://api.openai.com/v1".to_string());
        let default_model =
            env::var("OPENAI_MODEL").unwrap_or_else(|_| "gpt-3.5-turbo".to_string());
        let timeout_secs = parse_env("OPENAI_TIMEOUT_SECS", Self::DEFAULT_TIMEOUT_SECS)?;

        Ok(Self {
            api_key,
            base_url,
            default_model,
            timeout: Duration::from_secs(timeout_secs),
        })
    }
}

impl SwaggerConfig {
    pub fn from_env() -> Result<Self, String> {
        let username = env::var("SWAGGER_USERNAME").ok().filter(|s| !s.is_empty());
        let password = env::var("SWAGGER_PASSWORD").ok().filter(|s| !s.is_empty());
        let title = env::var("SWAGGER_TITLE").unwrap_or_else(|_| "Thoth API".to_string());
        let version = env::var("SWAGGER_VERSION").unwrap_or_else(|_| "0.1.0".to_string());
        let description = env::var("SWAGGER_DESCRIPTION").unwrap_or_else(|_| {
            "File storage and memory-aware assistant API".to_string()
        });

        Ok(Self {
            username,
            password,
            title,
            version,
            description,
        })
    }

    /// Returns credentials in "username:password" format if auth is enabled
    pub fn credentials(&self) -> Option<String> {
        match (&self.username, &self.password) {
            (Some(user), Some(pass)) => Some(format!("{}:{}", user, pass)),
            _ => None,
        }
    }
}

impl LoggingConfig {
    pub fn from_env() -> Self {
        let log_dir = if read_only_fs() {
            None
        } else {
            env::var("LOG_DIR")
                .ok()
                .filter(|s| !s.is_empty())
                .map(PathBuf::from)
        };
        Self { log_dir }
    }
}
