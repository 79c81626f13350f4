use std::{env, time::Duration};

use url::Url;

use crate::{errors::Error, Result};

/// Telegram caps `getUpdates` at 100 updates per call.
pub const MAX_BATCH_SIZE: usize = 100;

/// Upper bound for the `getUpdates` long-poll timeout, in seconds.
pub const MAX_POLL_TIMEOUT_SECS: u64 = 600;

/// Typed configuration for the bot, loaded from the environment.
#[derive(Clone, Debug)]
pub struct Config {
    // Telegram
    pub telegram_bot_token: String,
    pub telegram_api_url: Option<String>,

    // Consumer loop
    pub batch_size: usize,
    pub poll_timeout: Duration,
    pub idle_delay: Duration,
    pub backoff_initial: Duration,
    pub backoff_max: Duration,

    // Behavior flags
    pub remove_after_serving: bool,

    // Outbound throttling
    pub reply_min_interval: Duration,

    pub storage: StorageConfig,
}

/// Where pages are kept.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum StorageConfig {
    /// Process-local store; everything is lost on restart.
    Memory,
    Postgres { url: String },
}

/// Values supplied on the command line; they win over the environment.
#[derive(Clone, Debug, Default)]
pub struct Overrides {
    pub telegram_bot_token: Option<String>,
    pub memory_store: bool,
}

impl Config {
    /// Load `.env` (if present) and read the process environment.
    pub fn load(overrides: &Overrides) -> Result<Self> {
        // Existing variables win over `.env`.
        let _ = dotenvy::dotenv();
        Self::from_lookup(|key| env::var(key).ok(), overrides)
    }

    pub fn from_lookup(
        lookup: impl Fn(&str) -> Option<String>,
        overrides: &Overrides,
    ) -> Result<Self> {
        let var = |key: &str| lookup(key).and_then(non_empty);

        let telegram_bot_token = overrides
            .telegram_bot_token
            .clone()
            .and_then(non_empty)
            .or_else(|| var("TELEGRAM_BOT_TOKEN"))
            .ok_or_else(|| {
                Error::Config(
                    "token is not specified (--tg-bot-token or TELEGRAM_BOT_TOKEN)".to_string(),
                )
            })?;
        let telegram_api_url = var("TELEGRAM_API_URL");

        let batch_size = parse_or(&var, "BATCH_SIZE", MAX_BATCH_SIZE)?.clamp(1, MAX_BATCH_SIZE);
        let poll_timeout_secs: u64 = parse_or(&var, "POLL_TIMEOUT_SECS", 25)?;
        if poll_timeout_secs > MAX_POLL_TIMEOUT_SECS {
            return Err(Error::Config(format!(
                "POLL_TIMEOUT_SECS must be <= {MAX_POLL_TIMEOUT_SECS}, got {poll_timeout_secs}"
            )));
        }
        let poll_timeout = Duration::from_secs(poll_timeout_secs);
        let idle_delay = Duration::from_millis(parse_or(&var, "IDLE_DELAY_MS", 1000)?);
        let backoff_initial = Duration::from_millis(parse_or(&var, "BACKOFF_INITIAL_MS", 1000)?);
        let backoff_max = Duration::from_millis(parse_or(&var, "BACKOFF_MAX_MS", 60_000)?);
        if backoff_initial.is_zero() || backoff_max < backoff_initial {
            return Err(Error::Config(
                "BACKOFF_INITIAL_MS must be > 0 and <= BACKOFF_MAX_MS".to_string(),
            ));
        }

        let remove_after_serving = match var("REMOVE_AFTER_SERVING") {
            Some(v) => parse_bool(&v).ok_or_else(|| {
                Error::Config(format!("REMOVE_AFTER_SERVING is not a boolean: {v}"))
            })?,
            None => true,
        };

        let reply_min_interval =
            Duration::from_millis(parse_or(&var, "REPLY_MIN_INTERVAL_MS", 1050)?);

        let storage = if overrides.memory_store {
            StorageConfig::Memory
        } else {
            StorageConfig::Postgres {
                url: database_url(&var)?,
            }
        };

        Ok(Self {
            telegram_bot_token,
            telegram_api_url,
            batch_size,
            poll_timeout,
            idle_delay,
            backoff_initial,
            backoff_max,
            remove_after_serving,
            reply_min_interval,
            storage,
        })
    }
}

/// `DATABASE_URL` if set, otherwise assembled from the `POSTGRES_*` parts.
fn database_url(var: &impl Fn(&str) -> Option<String>) -> Result<String> {
    if let Some(url) = var("DATABASE_URL") {
        return Ok(url);
    }

    let required = |key: &str| {
        var(key).ok_or_else(|| {
            Error::Config(format!(
                "{key} environment variable is required (or set DATABASE_URL)"
            ))
        })
    };

    let host = required("POSTGRES_HOST")?;
    let user = required("POSTGRES_USER")?;
    let dbname = required("POSTGRES_DBNAME")?;
    let password = var("POSTGRES_PASSWORD");
    let port: u16 = parse_or(var, "POSTGRES_PORT", 5432)?;
    let sslmode = var("POSTGRES_SSLMODE").unwrap_or_else(|| "disable".to_string());

    let mut url = Url::parse(&format!("postgres://{host}"))
        .map_err(|e| Error::Config(format!("invalid POSTGRES_HOST {host:?}: {e}")))?;
    let bad_part = |what: &str| Error::Config(format!("can't build database url: invalid {what}"));
    url.set_username(&user).map_err(|_| bad_part("user"))?;
    url.set_password(password.as_deref())
        .map_err(|_| bad_part("password"))?;
    url.set_port(Some(port)).map_err(|_| bad_part("port"))?;
    url.set_path(&dbname);
    url.query_pairs_mut().append_pair("sslmode", &sslmode);

    Ok(url.into())
}

fn parse_or<T>(var: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match var(key) {
        Some(v) => v
            .trim()
            .parse::<T>()
            .map_err(|e| Error::Config(format!("{key}={v:?}: {e}"))),
        None => Ok(default),
    }
}

fn parse_bool(s: &str) -> Option<bool> {
    match s.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

fn non_empty(s: String) -> Option<String> {
    if s.trim().is_empty() {
        None
    } else {
        Some(s)
    }
}
