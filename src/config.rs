//! Client configuration
//!
//! Values come from the process environment (after `.env` has been loaded by
//! [`crate::load_dotenv`]). Every field has a default so an empty environment
//! yields a working local setup.

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

pub const ENV_API_BASE: &str = "SAFEDRIVE_API_BASE";
pub const ENV_SCAN_ERROR_POLICY: &str = "SAFEDRIVE_SCAN_ERROR_POLICY";
pub const ENV_DOWNLOAD_DIR: &str = "SAFEDRIVE_DOWNLOAD_DIR";
pub const ENV_SESSION_COOKIE: &str = "SAFEDRIVE_SESSION_COOKIE";
pub const ENV_PROGRESS_TICK_MS: &str = "SAFEDRIVE_PROGRESS_TICK_MS";

const DEFAULT_API_BASE: &str = "http://localhost:5000";
const DEFAULT_PROGRESS_TICK_MS: u64 = 150;

/// What to do when the scan call itself fails
///
/// `FailOpen` treats the file as safe so a scanning outage never blocks the
/// user. That bypasses the protection entirely, which is why it is a named
/// policy rather than silent behavior.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScanErrorPolicy {
    /// Degrade to a synthetic safe result (zero zones, 95% confidence)
    #[default]
    FailOpen,
    /// Move the workflow to `Failed`
    FailClosed,
}

impl ScanErrorPolicy {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_lowercase().replace('-', "_").as_str() {
            "fail_open" | "open" => Some(Self::FailOpen),
            "fail_closed" | "closed" => Some(Self::FailClosed),
            _ => None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Backend base URL, no trailing slash
    pub api_base: String,

    pub scan_error_policy: ScanErrorPolicy,

    /// Where recovery material and restored files are saved
    pub download_dir: PathBuf,

    /// Pre-established session cookie (`name=value`), if the login flow hands one over
    pub session_cookie: Option<String>,

    /// Interval of the simulated scan progress ticker
    pub progress_tick: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_base: DEFAULT_API_BASE.to_string(),
            scan_error_policy: ScanErrorPolicy::default(),
            download_dir: default_download_dir(),
            session_cookie: None,
            progress_tick: Duration::from_millis(DEFAULT_PROGRESS_TICK_MS),
        }
    }
}

impl ClientConfig {
    /// Build from the process environment
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary key lookup (used by `from_env` and tests)
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(base) = non_empty(ENV_API_BASE) {
            config.api_base = base.trim().trim_end_matches('/').to_string();
        }

        if let Some(policy) = non_empty(ENV_SCAN_ERROR_POLICY) {
            config.scan_error_policy =
                ScanErrorPolicy::parse(&policy).ok_or_else(|| ConfigError::InvalidValue {
                    key: ENV_SCAN_ERROR_POLICY.to_string(),
                    value: policy.clone(),
                })?;
        }

        if let Some(dir) = non_empty(ENV_DOWNLOAD_DIR) {
            config.download_dir = PathBuf::from(dir);
        }

        config.session_cookie = non_empty(ENV_SESSION_COOKIE);

        if let Some(ms) = non_empty(ENV_PROGRESS_TICK_MS) {
            let parsed: u64 = ms.trim().parse().map_err(|_| ConfigError::InvalidValue {
                key: ENV_PROGRESS_TICK_MS.to_string(),
                value: ms.clone(),
            })?;
            if parsed == 0 {
                return Err(ConfigError::InvalidValue {
                    key: ENV_PROGRESS_TICK_MS.to_string(),
                    value: ms,
                });
            }
            config.progress_tick = Duration::from_millis(parsed);
        }

        Ok(config)
    }
}

fn default_download_dir() -> PathBuf {
    dirs::download_dir().unwrap_or_else(|| std::env::temp_dir().join("safedrive"))
}
