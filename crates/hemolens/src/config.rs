//! Service configuration.
//!
//! Configuration is immutable for the process lifetime: [`AppConfig`] is
//! built once at startup (normally via [`AppConfig::from_env`]) and passed
//! by reference into the pipeline and API constructors. There are no
//! ambient global lookups.

use std::path::PathBuf;
use std::time::Duration;

use crate::{HemolensError, Result};

/// Default model identifier used when `HEMOLENS_MODEL` is not set.
pub const DEFAULT_MODEL: &str = "gemini-1.5-flash";

/// Default wall-clock budget for one pipeline invocation.
pub const DEFAULT_TIMEOUT_SECS: u64 = 25;

/// Default directory for uploaded reports.
pub const DEFAULT_UPLOAD_DIR: &str = "data";

const DEFAULT_MAX_UPLOAD_SIZE_MB: usize = 50;

/// Immutable service configuration, constructed once at startup.
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Model identifier sent to the provider.
    pub model: String,
    /// Model provider credential. Absence is a fatal startup error.
    pub api_key: String,
    /// Hard wall-clock timeout for one pipeline invocation.
    pub timeout: Duration,
    /// Directory uploaded reports are persisted under.
    pub upload_dir: PathBuf,
    /// Maximum request body size in bytes.
    pub max_upload_size_bytes: usize,
}

impl AppConfig {
    /// Build configuration from the process environment.
    ///
    /// `GOOGLE_API_KEY` must be present; everything else has a default.
    /// Malformed numeric values are logged and replaced by their default
    /// rather than failing startup.
    pub fn from_env() -> Result<Self> {
        let api_key = std::env::var("GOOGLE_API_KEY")
            .ok()
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| {
                HemolensError::validation("GOOGLE_API_KEY not found in environment variables")
            })?;

        let model = std::env::var("HEMOLENS_MODEL")
            .ok()
            .filter(|m| !m.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_MODEL.to_string());

        let timeout = Duration::from_secs(parse_env_number(
            "HEMOLENS_TIMEOUT_SECS",
            DEFAULT_TIMEOUT_SECS,
        ));

        let upload_dir = std::env::var("HEMOLENS_UPLOAD_DIR")
            .ok()
            .filter(|d| !d.trim().is_empty())
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_UPLOAD_DIR));

        let max_upload_size_mb =
            parse_env_number("HEMOLENS_MAX_UPLOAD_SIZE_MB", DEFAULT_MAX_UPLOAD_SIZE_MB);

        Ok(Self {
            model,
            api_key,
            timeout,
            upload_dir,
            max_upload_size_bytes: max_upload_size_mb * 1024 * 1024,
        })
    }
}

/// Parse a positive number from an environment variable, falling back to
/// `default` (with a warning) when unset, unparseable, or zero.
fn parse_env_number<T>(name: &str, default: T) -> T
where
    T: std::str::FromStr + PartialOrd + Default + Copy + std::fmt::Display,
{
    match std::env::var(name) {
        Ok(value) => match value.parse::<T>() {
            Ok(parsed) if parsed > T::default() => parsed,
            Ok(_) => {
                tracing::warn!("Invalid {} value (must be > 0), using default {}", name, default);
                default
            }
            Err(_) => {
                tracing::warn!(
                    "Failed to parse {}='{}', must be a positive number; using default {}",
                    name,
                    value,
                    default
                );
                default
            }
        },
        Err(_) => default,
    }
}
