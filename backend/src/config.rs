//! Runtime configuration read from the environment.
//!
//! Every setting has a default so the server starts with no environment at
//! all; `main` loads an optional `.env` file before calling [`Config::load`].
//! A variable that is set but unparseable is a startup error rather than a
//! silent fallback.

use log::info;
use std::env;
use std::fmt::{Debug, Display};
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid value for {key}: {reason}")]
    Invalid { key: &'static str, reason: String },
}

#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    /// Base URL of the prediction service; `/predict` is appended.
    pub ml_url: String,
    pub database_path: PathBuf,
    pub upload_dir: PathBuf,
    /// Directory holding the TTF family used for PDF reports.
    pub font_dir: PathBuf,
    pub predictor_timeout: Duration,
    /// Idle lifetime of queue sessions and report selections.
    pub handoff_ttl: Duration,
    pub sweep_interval: Duration,
    /// Per-file upload limit in bytes.
    pub max_upload_bytes: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 5001,
            ml_url: "http://127.0.0.1:5000".to_string(),
            database_path: PathBuf::from("yamleaf.sqlite"),
            upload_dir: PathBuf::from("uploads"),
            font_dir: PathBuf::from("fonts"),
            predictor_timeout: Duration::from_secs(60),
            handoff_ttl: Duration::from_secs(600),
            sweep_interval: Duration::from_secs(30),
            max_upload_bytes: 10 * 1024 * 1024,
        }
    }
}

impl Config {
    pub fn load() -> Result<Self, ConfigError> {
        let defaults = Config::default();
        Ok(Self {
            host: try_load("HOST", defaults.host)?,
            port: try_load("PORT", defaults.port)?,
            ml_url: try_load::<String>("ML_URL", defaults.ml_url)?
                .trim_end_matches('/')
                .to_string(),
            database_path: try_load("DATABASE_PATH", defaults.database_path)?,
            upload_dir: try_load("UPLOAD_DIR", defaults.upload_dir)?,
            font_dir: try_load("FONT_DIR", defaults.font_dir)?,
            predictor_timeout: load_secs("PREDICTOR_TIMEOUT_SECS", defaults.predictor_timeout)?,
            handoff_ttl: load_secs("HANDOFF_TTL_SECS", defaults.handoff_ttl)?,
            sweep_interval: load_secs("SWEEP_INTERVAL_SECS", defaults.sweep_interval)?,
            max_upload_bytes: try_load("MAX_UPLOAD_BYTES", defaults.max_upload_bytes)?,
        })
    }
}

fn try_load<T>(key: &'static str, default: T) -> Result<T, ConfigError>
where
    T: FromStr + Debug,
    T::Err: Display,
{
    match env::var(key) {
        Ok(raw) => parse_value(key, &raw),
        Err(_) => {
            info!("{key} not set, using default: {default:?}");
            Ok(default)
        }
    }
}

fn load_secs(key: &'static str, default: Duration) -> Result<Duration, ConfigError> {
    let secs: u64 = try_load(key, default.as_secs())?;
    if secs == 0 {
        return Err(ConfigError::Invalid {
            key,
            reason: "must be greater than zero".to_string(),
        });
    }
    Ok(Duration::from_secs(secs))
}

fn parse_value<T>(key: &'static str, raw: &str) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: Display,
{
    raw.trim().parse().map_err(|e: T::Err| ConfigError::Invalid {
        key,
        reason: e.to_string(),
    })
}
