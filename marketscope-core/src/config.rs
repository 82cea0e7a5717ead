use std::env;

pub const DEFAULT_REQUEST_DELAY_SECS: f64 = 1.0;
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_MAX_RETRIES: u32 = 3;
pub const DEFAULT_DB_PATH: &str = "~/.config/marketscope/marketscope.db";
pub const DEFAULT_SNAPSHOT_DIR: &str = "data/raw";

/// Runtime configuration, read from the environment with sensible defaults.
/// A missing or malformed variable falls back to its default; configuration
/// never hard-fails the process.
#[derive(Debug, Clone)]
pub struct Config {
    /// Seconds of spacing between outbound requests (REQUEST_DELAY).
    pub request_delay_secs: f64,
    /// HTTP transport timeout in seconds (TIMEOUT).
    pub timeout_secs: u64,
    /// Declared for orchestrators; the fetch loop itself never retries
    /// (MAX_RETRIES).
    pub max_retries: u32,
    /// Database location (DB_PATH).
    pub db_path: String,
    /// Where raw fetch snapshots land (SNAPSHOT_DIR).
    pub snapshot_dir: String,
    /// When true, traffic figures are synthesized (SIMILARWEB_STUB_MODE).
    pub traffic_stub_mode: bool,
    /// Credential for the live traffic provider (SIMILARWEB_API_KEY).
    pub similarweb_api_key: Option<String>,
}

impl Config {
    pub fn from_env() -> Self {
        Self {
            request_delay_secs: env::var("REQUEST_DELAY")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(DEFAULT_REQUEST_DELAY_SECS),
            timeout_secs: env::var("TIMEOUT")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(DEFAULT_TIMEOUT_SECS),
            max_retries: env::var("MAX_RETRIES")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(DEFAULT_MAX_RETRIES),
            db_path: env::var("DB_PATH").unwrap_or_else(|_| DEFAULT_DB_PATH.to_string()),
            snapshot_dir: env::var("SNAPSHOT_DIR")
                .unwrap_or_else(|_| DEFAULT_SNAPSHOT_DIR.to_string()),
            traffic_stub_mode: env::var("SIMILARWEB_STUB_MODE")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(true),
            similarweb_api_key: env::var("SIMILARWEB_API_KEY")
                .ok()
                .filter(|v| !v.is_empty()),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            request_delay_secs: DEFAULT_REQUEST_DELAY_SECS,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            max_retries: DEFAULT_MAX_RETRIES,
            db_path: DEFAULT_DB_PATH.to_string(),
            snapshot_dir: DEFAULT_SNAPSHOT_DIR.to_string(),
            traffic_stub_mode: true,
            similarweb_api_key: None,
        }
    }
}
