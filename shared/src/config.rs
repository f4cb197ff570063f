use std::str::FromStr;
use std::time::Duration;
use tracing::warn;

/// Which implementation backs the source of truth.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DurableBackend {
    Postgres,
    Sled,
    Memory,
}

impl FromStr for DurableBackend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "postgres" | "postgresql" => Ok(DurableBackend::Postgres),
            "sled" => Ok(DurableBackend::Sled),
            "memory" => Ok(DurableBackend::Memory),
            other => Err(format!(
                "Invalid durable backend '{}'. Must be 'postgres', 'sled', or 'memory'",
                other
            )),
        }
    }
}

#[derive(Clone, Debug)]
pub struct PostgresConfig {
    pub host: String,
    pub port: u16,
    pub dbname: String,
    pub user: String,
    pub password: String,
    pub pool_size: usize,
}

#[derive(Clone, Debug)]
pub struct CacheSettings {
    pub ttl: Duration,
    pub max_entries: Option<u64>,
}

#[derive(Clone, Debug)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub log_level: String,
    pub request_timeout: Duration,
    pub shutdown_timeout: Duration,
    pub backend: DurableBackend,
    pub data_dir: String,
    pub postgres: PostgresConfig,
    pub cache: CacheSettings,
}

impl Config {
    const DEFAULT_HOST: &'static str = "0.0.0.0";
    const DEFAULT_PORT: u16 = 8080;
    const DEFAULT_LOG_LEVEL: &'static str = "info";
    const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
    const DEFAULT_SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(30);
    const DEFAULT_DATA_DIR: &'static str = "./data";
    const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(10 * 60);
    /// Longest TTL the cache builder accepts (1000 years).
    pub const MAX_CACHE_TTL: Duration = Duration::from_secs(1000 * 365 * 24 * 3600);
    const DEFAULT_POOL_SIZE: usize = 16;

    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the configuration from an arbitrary key lookup.
    /// Missing or unparseable values fall back to their defaults.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let string_or = |key: &str, default: &str| lookup(key).unwrap_or_else(|| default.to_string());

        Self {
            host: string_or("HTTP_HOST", Self::DEFAULT_HOST),
            port: parsed_or(&lookup, "HTTP_PORT", Self::DEFAULT_PORT),
            log_level: string_or("LOG_LEVEL", Self::DEFAULT_LOG_LEVEL),
            request_timeout: duration_or(&lookup, "HTTP_TIMEOUT", Self::DEFAULT_REQUEST_TIMEOUT),
            shutdown_timeout: duration_or(
                &lookup,
                "SHUTDOWN_TIMEOUT",
                Self::DEFAULT_SHUTDOWN_TIMEOUT,
            ),
            backend: parsed_or(&lookup, "ORDERS_DURABLE_BACKEND", DurableBackend::Postgres),
            data_dir: string_or("ORDERS_DATA_DIR", Self::DEFAULT_DATA_DIR),
            postgres: PostgresConfig {
                host: string_or("POSTGRES_HOST", "db"),
                port: parsed_or(&lookup, "POSTGRES_PORT", 5432),
                dbname: string_or("POSTGRES_DB", "postgres"),
                user: string_or("POSTGRES_USER", "postgres"),
                password: string_or("POSTGRES_PASSWORD", "postgres"),
                pool_size: parsed_or(&lookup, "POSTGRES_POOL_SIZE", Self::DEFAULT_POOL_SIZE),
            },
            cache: CacheSettings {
                ttl: cache_ttl(&lookup),
                max_entries: lookup("CACHE_MAX_ENTRIES").and_then(|raw| match raw.parse() {
                    Ok(value) => Some(value),
                    Err(_) => {
                        warn!("CACHE_MAX_ENTRIES='{}' is not a number, cache is unbounded", raw);
                        None
                    }
                }),
            },
        }
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn parsed_or<F, T>(lookup: &F, key: &str, default: T) -> T
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    match lookup(key) {
        Some(raw) => raw.trim().parse().unwrap_or_else(|_| {
            warn!("{}='{}' could not be parsed, using default", key, raw);
            default
        }),
        None => default,
    }
}

fn duration_or<F>(lookup: &F, key: &str, default: Duration) -> Duration
where
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        Some(raw) => parse_duration(&raw).unwrap_or_else(|| {
            warn!("{}='{}' is not a valid duration, using {:?}", key, raw, default);
            default
        }),
        None => default,
    }
}

fn cache_ttl<F>(lookup: &F) -> Duration
where
    F: Fn(&str) -> Option<String>,
{
    let ttl = duration_or(lookup, "CACHE_TTL", Config::DEFAULT_CACHE_TTL);
    if ttl > Config::MAX_CACHE_TTL {
        warn!(
            "CACHE_TTL={:?} exceeds the {:?} limit, using {:?}",
            ttl,
            Config::MAX_CACHE_TTL,
            Config::DEFAULT_CACHE_TTL
        );
        return Config::DEFAULT_CACHE_TTL;
    }
    ttl
}

/// Parses `500ms`, `30s`, `10m`, `1h` or a bare number of seconds.
pub fn parse_duration(raw: &str) -> Option<Duration> {
    let raw = raw.trim();
    let split = raw
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(raw.len());
    let (digits, unit) = raw.split_at(split);
    let value: u64 = digits.parse().ok()?;

    match unit {
        "" | "s" => Some(Duration::from_secs(value)),
        "ms" => Some(Duration::from_millis(value)),
        "m" => value.checked_mul(60).map(Duration::from_secs),
        "h" => value.checked_mul(3600).map(Duration::from_secs),
        _ => None,
    }
}
