//! Server settings read from the environment.

use std::env;
use std::str::FromStr;
use std::time::Duration;

use bindicator_core::{CacheConfig, MAX_TTL, RefuseType};
use bindicator_provider_hackney::{DEFAULT_BASE_URL, RefuseTypeTable};
use chrono_tz::Tz;
use tracing::warn;

const DEFAULT_PORT: u16 = 8080;
const DEFAULT_HOST: &str = "0.0.0.0";
const DEFAULT_TIMEZONE: Tz = Tz::Europe__London;
const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Everything `main` needs to wire the server together.
#[derive(Debug, Clone)]
pub(crate) struct Config {
    pub(crate) host: String,
    pub(crate) port: u16,
    pub(crate) api_base: String,
    pub(crate) api_token: Option<String>,
    pub(crate) timezone: Tz,
    pub(crate) cache: CacheConfig,
    pub(crate) max_concurrency: Option<usize>,
    pub(crate) request_timeout: Duration,
    pub(crate) refuse_types: RefuseTypeTable,
}

impl Config {
    /// Read the process environment. Malformed values fall back to their defaults.
    pub(crate) fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| {
            lookup(key)
                .map(|value| value.trim().to_owned())
                .filter(|value| !value.is_empty())
        };

        let cache_defaults = CacheConfig::default();
        let cache = CacheConfig {
            enabled: parse_or("BINDICATOR_CACHE_ENABLED", var("BINDICATOR_CACHE_ENABLED"), true),
            capacity: parse_or(
                "BINDICATOR_CACHE_CAPACITY",
                var("BINDICATOR_CACHE_CAPACITY"),
                cache_defaults.capacity,
            ),
            ttl: cache_ttl(var("BINDICATOR_CACHE_TTL_SECS"), cache_defaults.ttl),
        };

        let max_concurrency = var("BINDICATOR_MAX_CONCURRENCY").and_then(|raw| {
            match raw.parse::<usize>() {
                Ok(limit) if limit > 0 => Some(limit),
                _ => {
                    warn!(value = %raw, "ignoring BINDICATOR_MAX_CONCURRENCY, expected a positive integer");
                    None
                }
            }
        });

        let timezone = var("BINDICATOR_TIMEZONE").map_or(DEFAULT_TIMEZONE, |raw| {
            raw.parse::<Tz>().unwrap_or_else(|err| {
                warn!(value = %raw, %err, "unknown BINDICATOR_TIMEZONE, using Europe/London");
                DEFAULT_TIMEZONE
            })
        });

        Self {
            host: var("BINDICATOR_HOST").unwrap_or_else(|| DEFAULT_HOST.to_owned()),
            port: parse_or("PORT", var("PORT"), DEFAULT_PORT),
            api_base: var("BINDICATOR_API_BASE").unwrap_or_else(|| DEFAULT_BASE_URL.to_owned()),
            api_token: var("BINDICATOR_API_TOKEN"),
            timezone,
            cache,
            max_concurrency,
            request_timeout: Duration::from_secs(parse_or(
                "BINDICATOR_REQUEST_TIMEOUT_SECS",
                var("BINDICATOR_REQUEST_TIMEOUT_SECS"),
                DEFAULT_REQUEST_TIMEOUT.as_secs(),
            )),
            refuse_types: var("BINDICATOR_REFUSE_TYPES")
                .map_or_else(RefuseTypeTable::default, |raw| refuse_types(&raw)),
        }
    }
}

fn parse_or<T>(key: &str, raw: Option<String>, default: T) -> T
where
    T: FromStr + Copy,
{
    match raw {
        None => default,
        Some(raw) => raw.parse().unwrap_or_else(|_err| {
            warn!(key, value = %raw, "malformed setting, using default");
            default
        }),
    }
}

fn cache_ttl(raw: Option<String>, default: Duration) -> Duration {
    let ttl = Duration::from_secs(parse_or(
        "BINDICATOR_CACHE_TTL_SECS",
        raw,
        default.as_secs(),
    ));
    if ttl > MAX_TTL {
        warn!(
            ttl_secs = ttl.as_secs(),
            max_secs = MAX_TTL.as_secs(),
            "BINDICATOR_CACHE_TTL_SECS too long, using default"
        );
        return default;
    }
    ttl
}

/// Parse `id=slug,id=slug` on top of the built-in table.
fn refuse_types(raw: &str) -> RefuseTypeTable {
    raw.split(',')
        .map(str::trim)
        .filter(|entry| !entry.is_empty())
        .fold(RefuseTypeTable::default(), |table, entry| {
            let parsed = entry
                .split_once('=')
                .map(|(id, slug)| (id.trim(), RefuseType::from_slug(slug)))
                .filter(|(id, refuse_type)| !id.is_empty() && *refuse_type != RefuseType::Undefined);
            match parsed {
                Some((id, refuse_type)) => table.with(id, refuse_type),
                None => {
                    warn!(entry, "ignoring malformed BINDICATOR_REFUSE_TYPES entry");
                    table
                }
            }
        })
}
