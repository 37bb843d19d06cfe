//! Server configuration, read once at start-up from the environment (and `.env`).

use anyhow::{anyhow, Context};
use chrono::NaiveTime;
use std::str::FromStr;
use std::time::Duration;

use folioledger_core::jobs::SchedulerConfig;
use folioledger_market_data::CacheConfig;
use folioledger_storage_sqlite::DbConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderKind {
    Yahoo,
    Static,
}

impl FromStr for ProviderKind {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> anyhow::Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "yahoo" => Ok(ProviderKind::Yahoo),
            "static" => Ok(ProviderKind::Static),
            other => Err(anyhow!("unknown market data provider '{}'", other)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Text,
    Json,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub db: DbConfig,
    pub scheduler: SchedulerConfig,
    pub cache: CacheConfig,
    pub provider: ProviderKind,
    pub quote_currency: String,
    pub log_format: LogFormat,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the configuration from `lookup`, falling back to defaults for unset keys.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let get = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        let db_defaults = DbConfig::default();
        let db = DbConfig {
            path: get("FL_DB_PATH").unwrap_or(db_defaults.path),
            max_connections: parse_or(&get, "FL_DB_MAX_CONNECTIONS", db_defaults.max_connections)?,
            min_idle: parse_or(&get, "FL_DB_MIN_IDLE", db_defaults.min_idle)?,
        };

        let defaults = SchedulerConfig::default();
        let scheduler = SchedulerConfig {
            tick: secs_or(&get, "FL_SCHEDULER_TICK_SECS", defaults.tick)?,
            job_timeout: secs_or(&get, "FL_JOB_TIMEOUT_SECS", defaults.job_timeout)?,
            detection_interval: match get("FL_DETECTION_INTERVAL_MINS") {
                Some(raw) => Duration::from_secs(60 * parse::<u64>("FL_DETECTION_INTERVAL_MINS", &raw)?),
                None => defaults.detection_interval,
            },
            price_refresh_at: time_or(&get, "FL_PRICE_REFRESH_AT", defaults.price_refresh_at)?,
            snapshot_at: time_or(&get, "FL_SNAPSHOT_AT", defaults.snapshot_at)?,
            cleanup_at: time_or(&get, "FL_CLEANUP_AT", defaults.cleanup_at)?,
            snapshot_retention_days: parse_or(
                &get,
                "FL_SNAPSHOT_RETENTION_DAYS",
                defaults.snapshot_retention_days,
            )?,
        };
        if scheduler.tick.is_zero() {
            return Err(anyhow!("FL_SCHEDULER_TICK_SECS must be greater than zero"));
        }

        let cache_defaults = CacheConfig::default();
        let cache = CacheConfig {
            ttl: secs_or(&get, "FL_QUOTE_TTL_SECS", cache_defaults.ttl)?,
            ..cache_defaults
        };

        let provider = match get("FL_MARKET_DATA_PROVIDER") {
            Some(raw) => raw.parse()?,
            None => ProviderKind::Yahoo,
        };
        let quote_currency = get("FL_QUOTE_CURRENCY")
            .map(|value| value.trim().to_uppercase())
            .unwrap_or_else(|| "USD".to_string());
        let log_format = log_format(get("FL_LOG_FORMAT").as_deref());

        Ok(Config {
            db,
            scheduler,
            cache,
            provider,
            quote_currency,
            log_format,
        })
    }
}

pub fn log_format(raw: Option<&str>) -> LogFormat {
    match raw {
        Some(value) if value.trim().eq_ignore_ascii_case("json") => LogFormat::Json,
        _ => LogFormat::Text,
    }
}

fn parse<T>(key: &str, raw: &str) -> anyhow::Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    raw.trim()
        .parse::<T>()
        .with_context(|| format!("{} has an invalid value '{}'", key, raw))
}

fn parse_or<T>(get: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> anyhow::Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match get(key) {
        Some(raw) => parse(key, &raw),
        None => Ok(default),
    }
}

fn secs_or(
    get: &impl Fn(&str) -> Option<String>,
    key: &str,
    default: Duration,
) -> anyhow::Result<Duration> {
    match get(key) {
        Some(raw) => Ok(Duration::from_secs(parse(key, &raw)?)),
        None => Ok(default),
    }
}

/// Wall-clock times are `HH:MM` (or `HH:MM:SS`) in UTC.
fn time_or(
    get: &impl Fn(&str) -> Option<String>,
    key: &str,
    default: NaiveTime,
) -> anyhow::Result<NaiveTime> {
    let Some(raw) = get(key) else {
        return Ok(default);
    };
    let raw = raw.trim();
    NaiveTime::parse_from_str(raw, "%H:%M")
        .or_else(|_| NaiveTime::parse_from_str(raw, "%H:%M:%S"))
        .with_context(|| format!("{} must be HH:MM, got '{}'", key, raw))
}
