use std::net::{IpAddr, Ipv4Addr, SocketAddr};

use thiserror::Error;

use crate::db::config::DbConfig;
use crate::tracker::schedule::IntervalError;
use crate::tracker::{MasteryRange, ReviewIntervals};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("REVIEW_INTERVALS: {0}")]
    Intervals(#[from] IntervalError),
    #[error("{key} must be {expected}, got {value:?}")]
    Invalid {
        key: &'static str,
        expected: &'static str,
        value: String,
    },
}

/// Scheduling knobs shared by the progress and review services.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackerConfig {
    pub intervals: ReviewIntervals,
    pub mastery: MasteryRange,
    /// Promote to `mastered` once the last review round is completed.
    pub master_on_full_reviews: bool,
    /// How many days ahead the upcoming bucket reaches. `None` is unbounded.
    pub upcoming_days: Option<u32>,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            intervals: ReviewIntervals::default(),
            mastery: MasteryRange::default(),
            master_on_full_reviews: false,
            upcoming_days: None,
        }
    }
}

impl TrackerConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        let intervals = match non_empty_var("REVIEW_INTERVALS") {
            Some(raw) => raw.parse::<ReviewIntervals>()?,
            None => ReviewIntervals::default(),
        };

        let mastery = match non_empty_var("MASTERY_MAX") {
            Some(raw) => {
                let max = raw
                    .parse::<i64>()
                    .ok()
                    .filter(|max| *max >= 0)
                    .ok_or(ConfigError::Invalid {
                        key: "MASTERY_MAX",
                        expected: "a non-negative integer",
                        value: raw,
                    })?;
                MasteryRange::new(max)
            }
            None => MasteryRange::default(),
        };

        let upcoming_days = match non_empty_var("REVIEW_UPCOMING_DAYS") {
            Some(raw) => Some(raw.parse::<u32>().map_err(|_| ConfigError::Invalid {
                key: "REVIEW_UPCOMING_DAYS",
                expected: "a number of days",
                value: raw,
            })?),
            None => None,
        };

        Ok(Self {
            intervals,
            mastery,
            master_on_full_reviews: env_bool("MASTER_ON_FULL_REVIEWS", false),
            upcoming_days,
        })
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub host: IpAddr,
    pub port: u16,
    pub log_level: String,
    pub file_logs: bool,
    pub log_dir: String,
    pub seed_catalog: bool,
    pub database: DbConfig,
    pub tracker: TrackerConfig,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        let port = std::env::var("PORT")
            .ok()
            .and_then(|value| value.parse::<u16>().ok())
            .unwrap_or(3000);

        let host = std::env::var("HOST")
            .ok()
            .and_then(|value| value.parse::<IpAddr>().ok())
            .unwrap_or(IpAddr::V4(Ipv4Addr::new(0, 0, 0, 0)));

        let log_level = std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string());
        let log_dir = std::env::var("LOG_DIR").unwrap_or_else(|_| "./logs".to_string());

        Ok(Self {
            host,
            port,
            log_level,
            file_logs: env_bool("ENABLE_FILE_LOGS", false),
            log_dir,
            seed_catalog: env_bool("SEED_CATALOG", true),
            database: DbConfig::from_env(),
            tracker: TrackerConfig::from_env()?,
        })
    }

    pub fn bind_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }
}

fn non_empty_var(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

pub(crate) fn env_bool(key: &str, default: bool) -> bool {
    match non_empty_var(key) {
        Some(value) => matches!(value.to_ascii_lowercase().as_str(), "true" | "1" | "yes"),
        None => default,
    }
}

pub(crate) fn env_u32(key: &str, default: u32) -> u32 {
    non_empty_var(key)
        .and_then(|value| value.parse().ok())
        .unwrap_or(default)
}

pub(crate) fn env_u64(key: &str, default: u64) -> u64 {
    non_empty_var(key)
        .and_then(|value| value.parse().ok())
        .unwrap_or(default)
}
