use std::path::PathBuf;
use std::time::Duration;

use hookscope_cache::DEFAULT_MAX_AGE;
use hookscope_flood::TargetPolicy;

pub const ALLOWED_TARGETS_ENV: &str = "HOOKSCOPE_ALLOWED_TARGETS";
pub const CACHE_DB_ENV: &str = "HOOKSCOPE_CACHE_DB";
pub const CACHE_MAX_AGE_ENV: &str = "HOOKSCOPE_CACHE_MAX_AGE_SECS";
pub const NO_COLOR_ENV: &str = "HOOKSCOPE_NO_COLOR";

const DEFAULT_CACHE_DB: &str = "hookscope-cache.sqlite";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub policy: TargetPolicy,
    pub cache_db: PathBuf,
    pub cache_max_age: Duration,
    pub color: bool,
}

impl Config {
    pub fn from_env() -> Result<Self, String> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, String> {
        let policy = lookup(ALLOWED_TARGETS_ENV)
            .map(|value| TargetPolicy::parse(&value))
            .unwrap_or_default();
        let cache_db = PathBuf::from(lookup(CACHE_DB_ENV).unwrap_or_else(|| DEFAULT_CACHE_DB.into()));
        let cache_max_age = match lookup(CACHE_MAX_AGE_ENV) {
            Some(raw) => raw
                .trim()
                .parse::<u64>()
                .map(Duration::from_secs)
                .map_err(|e| format!("{CACHE_MAX_AGE_ENV}={raw:?}: {e}"))?,
            None => DEFAULT_MAX_AGE,
        };
        let color = lookup(NO_COLOR_ENV).is_none_or(|value| value.is_empty());
        Ok(Self {
            policy,
            cache_db,
            cache_max_age,
            color,
        })
    }
}
