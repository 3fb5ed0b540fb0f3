//! Configuration System
//!
//! Handles loading configuration from files and environment variables.
//! Supports TOML config files and environment variable overrides.

use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Main configuration structure
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub backend: BackendConfig,

    #[serde(default)]
    pub realtime: RealtimeConfig,

    #[serde(default)]
    pub auth: AuthConfig,

    #[serde(default)]
    pub signup: SignUpConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

/// HTTP server configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    #[serde(default)]
    pub cors_origins: Vec<String>,

    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    3000
}

fn default_request_timeout() -> u64 {
    30
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            cors_origins: Vec::new(),
            request_timeout_secs: default_request_timeout(),
        }
    }
}

/// Which backend client implementation to construct
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    /// Hosted platform over HTTP and websocket
    Rest,
    /// In-process platform, nothing persists across restarts
    #[default]
    Memory,
}

impl std::str::FromStr for BackendKind {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "rest" => Ok(BackendKind::Rest),
            "memory" => Ok(BackendKind::Memory),
            other => Err(ConfigError::Invalid(format!("unknown backend kind '{}'", other))),
        }
    }
}

/// Backend platform configuration
#[derive(Debug, Clone, Deserialize)]
pub struct BackendConfig {
    #[serde(default)]
    pub kind: BackendKind,

    #[serde(default = "default_backend_url")]
    pub url: String,

    #[serde(default)]
    pub anon_key: String,

    #[serde(default = "default_backend_timeout")]
    pub request_timeout_ms: u64,
}

fn default_backend_url() -> String {
    "http://localhost:54321".to_string()
}

fn default_backend_timeout() -> u64 {
    10_000
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            kind: BackendKind::default(),
            url: default_backend_url(),
            anon_key: String::new(),
            request_timeout_ms: default_backend_timeout(),
        }
    }
}

/// Live memo feed configuration
#[derive(Debug, Clone, Deserialize)]
pub struct RealtimeConfig {
    #[serde(default = "default_heartbeat")]
    pub heartbeat_interval_secs: u64,

    #[serde(default = "default_max_connections")]
    pub max_connections: usize,
}

fn default_heartbeat() -> u64 {
    30
}

fn default_max_connections() -> usize {
    1000
}

impl Default for RealtimeConfig {
    fn default() -> Self {
        Self {
            heartbeat_interval_secs: default_heartbeat(),
            max_connections: default_max_connections(),
        }
    }
}

/// Auth redirect and session cookie configuration
#[derive(Debug, Clone, Deserialize)]
pub struct AuthConfig {
    #[serde(default = "default_landing_path")]
    pub landing_path: String,

    #[serde(default = "default_signup_path")]
    pub signup_path: String,

    #[serde(default = "default_session_cookie")]
    pub session_cookie: String,

    /// Mark the session cookie `Secure`; turn off for plain-http development
    #[serde(default = "default_secure_cookie")]
    pub secure_cookie: bool,
}

fn default_landing_path() -> String {
    "/home".to_string()
}

fn default_signup_path() -> String {
    "/signup".to_string()
}

fn default_session_cookie() -> String {
    "memopad-access-token".to_string()
}

fn default_secure_cookie() -> bool {
    true
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            landing_path: default_landing_path(),
            signup_path: default_signup_path(),
            session_cookie: default_session_cookie(),
            secure_cookie: default_secure_cookie(),
        }
    }
}

/// Sign-up profile configuration
#[derive(Debug, Clone, Deserialize)]
pub struct SignUpConfig {
    #[serde(default = "default_hash_cost")]
    pub hash_cost: u32,

    #[serde(default = "default_store_hash")]
    pub store_password_hash: bool,
}

fn default_hash_cost() -> u32 {
    10
}

fn default_store_hash() -> bool {
    true
}

impl Default for SignUpConfig {
    fn default() -> Self {
        Self {
            hash_cost: default_hash_cost(),
            store_password_hash: default_store_hash(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,

    #[serde(default = "default_log_format")]
    pub format: String,

    pub file: Option<String>,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
            file: None,
        }
    }
}

impl Config {
    /// Load configuration from a file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.to_path_buf(),
            error: e.to_string(),
        })?;

        let config: Config = toml::from_str(&content).map_err(|e| ConfigError::Parse {
            path: path.to_path_buf(),
            error: e.to_string(),
        })?;

        Ok(config)
    }

    /// Load configuration from environment variables only
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = Config::default();
        config.apply_env_overrides()?;
        Ok(config)
    }

    /// Load configuration with environment variable overrides
    pub fn load_with_env(path: &Path) -> Result<Self, ConfigError> {
        let mut config = Self::load(path)?;
        config.apply_env_overrides()?;
        Ok(config)
    }

    /// Load from default locations or environment.
    ///
    /// A config file that exists but cannot be read or parsed is an error,
    /// never a silent fallback to defaults.
    pub fn load_default() -> Result<Self, ConfigError> {
        let config_paths: Vec<PathBuf> = [
            dirs::config_dir().map(|p| p.join("memopad").join("config.toml")),
            Some(PathBuf::from("/etc/memopad/config.toml")),
            Some(PathBuf::from("./memopad.toml")),
        ]
        .into_iter()
        .flatten()
        .collect();

        Self::load_first(&config_paths)
    }

    /// Load the first existing file of `paths`, or fall back to the environment
    fn load_first(paths: &[PathBuf]) -> Result<Self, ConfigError> {
        match paths.iter().find(|path| path.exists()) {
            Some(path) => {
                let config = Self::load_with_env(path)?;
                tracing::info!("Loaded config from {:?}", path);
                Ok(config)
            }
            None => {
                tracing::info!("Using default config with environment overrides");
                Self::from_env()
            }
        }
    }

    /// Apply environment variable overrides to an existing config
    fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        // Server overrides
        if let Ok(host) = std::env::var("MEMOPAD_HOST") {
            self.server.host = host;
        }
        if let Ok(port) = std::env::var("MEMOPAD_PORT") {
            if let Ok(p) = port.parse() {
                self.server.port = p;
            }
        }

        // Backend overrides
        if let Ok(kind) = std::env::var("MEMOPAD_BACKEND_KIND") {
            self.backend.kind = kind
                .parse()
                .map_err(|e| ConfigError::Invalid(format!("MEMOPAD_BACKEND_KIND: {}", e)))?;
        }
        if let Ok(url) = std::env::var("MEMOPAD_BACKEND_URL") {
            self.backend.url = url;
        }
        if let Ok(key) = std::env::var("MEMOPAD_BACKEND_KEY") {
            self.backend.anon_key = key;
        }

        // Logging overrides
        if let Ok(level) = std::env::var("MEMOPAD_LOG_LEVEL") {
            self.logging.level = level;
        }
        if let Ok(format) = std::env::var("MEMOPAD_LOG_FORMAT") {
            self.logging.format = format;
        }

        Ok(())
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path:?}: {error}")]
    Io { path: PathBuf, error: String },

    #[error("Failed to parse config file {path:?}: {error}")]
    Parse { path: PathBuf, error: String },

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Generate a default config file content
pub fn generate_default_config() -> String {
    r#"# Memopad Configuration
#
# Environment variables override these settings:
# - MEMOPAD_HOST
# - MEMOPAD_PORT
# - MEMOPAD_BACKEND_KIND
# - MEMOPAD_BACKEND_URL
# - MEMOPAD_BACKEND_KEY
# - MEMOPAD_LOG_LEVEL
# - MEMOPAD_LOG_FORMAT

[server]
# HTTP server host
host = "0.0.0.0"

# HTTP server port
port = 3000

# Allowed CORS origins (empty = allow any)
cors_origins = []

# Request timeout in seconds
request_timeout_secs = 30

[backend]
# Backend client: "rest" for the hosted platform, "memory" for local development
kind = "memory"

# Hosted platform project URL
url = "http://localhost:54321"

# Public (anon) API key of the project
anon_key = ""

# Per-request timeout (ms)
request_timeout_ms = 10000

[realtime]
# Heartbeat interval for the realtime socket (seconds)
heartbeat_interval_secs = 30

# Maximum concurrent live memo connections
max_connections = 1000

[auth]
# Where the auth callback sends the browser after a successful exchange
landing_path = "/home"

# Where the session guard sends visitors without a session
signup_path = "/signup"

# Name of the cookie carrying the access token
session_cookie = "memopad-access-token"

# Send the session cookie only over https (disable for plain-http development)
secure_cookie = true

[signup]
# bcrypt cost for the profile password hash
hash_cost = 10

# Store a locally computed password hash in the users table.
# The platform keeps its own credential; this copy is never read back.
store_password_hash = true

[logging]
# Log level: trace, debug, info, warn, error
level = "info"

# Log format: pretty (for development) or json (for production)
format = "pretty"

# Optional log file path
# file = "/var/log/memopad/memopad.log"
"#
    .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.server.port, 3000);
        assert_eq!(config.backend.kind, BackendKind::Memory);
        assert_eq!(config.auth.landing_path, "/home");
        assert_eq!(config.auth.signup_path, "/signup");
        assert_eq!(config.signup.hash_cost, 10);
        assert!(config.signup.store_password_hash);
    }

    #[test]
    fn test_generated_config_parses() {
        let config: Config = toml::from_str(&generate_default_config()).unwrap();
        assert_eq!(config.server.port, 3000);
        assert_eq!(config.realtime.heartbeat_interval_secs, 30);
        assert_eq!(config.auth.session_cookie, "memopad-access-token");
        assert_eq!(config.logging.format, "pretty");
    }

    #[test]
    fn test_load_partial_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "[backend]\nkind = \"rest\"\nurl = \"https://project.example.co\"\n\n[signup]\nstore_password_hash = false"
        )
        .unwrap();

        let config = Config::load(file.path()).unwrap();
        assert_eq!(config.backend.kind, BackendKind::Rest);
        assert_eq!(config.backend.url, "https://project.example.co");
        assert!(!config.signup.store_password_hash);
        assert_eq!(config.signup.hash_cost, 10);
        assert_eq!(config.server.port, 3000);
    }

    #[test]
    fn test_load_missing_file() {
        let err = Config::load(Path::new("/definitely/not/here.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }

    #[test]
    fn test_malformed_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let broken = dir.path().join("memopad.toml");
        std::fs::write(&broken, "[backend\nkind = ").unwrap();

        let err = Config::load_first(&[dir.path().join("missing.toml"), broken]).unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
    }

    #[test]
    fn test_load_first_picks_existing_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("memopad.toml");
        std::fs::write(&path, "[auth]\nsecure_cookie = false\n").unwrap();

        let config = Config::load_first(&[dir.path().join("missing.toml"), path]).unwrap();
        assert!(!config.auth.secure_cookie);
        assert!(Config::default().auth.secure_cookie);
    }

    #[test]
    fn test_backend_kind_from_str() {
        assert_eq!("REST".parse::<BackendKind>().unwrap(), BackendKind::Rest);
        assert_eq!("memory".parse::<BackendKind>().unwrap(), BackendKind::Memory);
        assert!("sqlite".parse::<BackendKind>().is_err());
    }
}
