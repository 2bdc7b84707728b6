use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

// ─── Defaults ────────────────────────────────────────────────────

const DEFAULT_BIND_ADDR: &str = "0.0.0.0:3000";
const DEFAULT_DATABASE_PATH: &str = "flags.db";
const DEFAULT_POOL_SIZE: u32 = 4;
const DEFAULT_REDIS_URL: &str = "redis://127.0.0.1:6379/";
const DEFAULT_KV_FLAG_KEY: &str = "ld";
const DEFAULT_CONFIGCAT_FLAG_KEY: &str = "iswinter";
const DEFAULT_CONFIGCAT_TTL_SECS: u64 = 60;
const DEFAULT_RESTAPI_URL: &str = "https://internetfreedom.in/api/healthz";
const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 10;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("invalid value {value:?} for {key}: {reason}")]
    Invalid {
        key: &'static str,
        value: String,
        reason: String,
    },
}

/// LaunchDarkly REST endpoint plus the API key sent as `Authorization`.
#[derive(Debug, Clone)]
pub struct LaunchDarklyConfig {
    pub url: String,
    pub api_key: String,
}

#[derive(Debug, Clone)]
pub struct ConfigCatConfig {
    pub sdk_key: String,
    /// CDN or proxy override; `None` lets the SDK choose.
    pub base_url: Option<String>,
    pub flag_key: String,
    pub cache_ttl: Duration,
}

/// Everything the harness needs to know at startup.
///
/// Providers that are not configured stay `None`; their endpoints answer
/// 503 instead of failing the whole process.
#[derive(Debug, Clone)]
pub struct Config {
    pub bind_addr: SocketAddr,
    pub database_path: PathBuf,
    pub database_pool_size: u32,
    pub redis_url: String,
    pub kv_flag_key: String,
    pub launchdarkly: Option<LaunchDarklyConfig>,
    pub configcat: Option<ConfigCatConfig>,
    pub peer_service_url: Option<String>,
    pub restapi_url: String,
    pub http_timeout: Duration,
    pub seed_fixtures: bool,
}

impl Config {
    /// Read configuration from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same parsing as [`Config::from_env`], with an injectable lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        // Empty values behave like unset ones.
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let bind_addr = parse_or(&get, "BIND_ADDR", DEFAULT_BIND_ADDR)?;
        let database_pool_size: u32 =
            parse_or(&get, "DATABASE_POOL_SIZE", &DEFAULT_POOL_SIZE.to_string())?;
        if database_pool_size == 0 {
            return Err(ConfigError::Invalid {
                key: "DATABASE_POOL_SIZE",
                value: "0".into(),
                reason: "pool size must be at least 1".into(),
            });
        }

        let launchdarkly = match (get("LD_URL"), get("LD_KEY")) {
            (Some(url), Some(api_key)) => Some(LaunchDarklyConfig { url, api_key }),
            _ => None,
        };

        let configcat = match get("CC_KEY") {
            Some(sdk_key) => Some(ConfigCatConfig {
                sdk_key,
                base_url: get("CONFIGCAT_BASE_URL")
                    .map(|url| url.trim_end_matches('/').to_owned()),
                flag_key: get("CONFIGCAT_FLAG_KEY")
                    .unwrap_or_else(|| DEFAULT_CONFIGCAT_FLAG_KEY.into()),
                cache_ttl: Duration::from_secs(parse_or(
                    &get,
                    "CONFIGCAT_CACHE_TTL_SECS",
                    &DEFAULT_CONFIGCAT_TTL_SECS.to_string(),
                )?),
            }),
            None => None,
        };

        Ok(Self {
            bind_addr,
            database_path: get("DATABASE_PATH")
                .unwrap_or_else(|| DEFAULT_DATABASE_PATH.into())
                .into(),
            database_pool_size,
            redis_url: get("REDIS_URL").unwrap_or_else(|| DEFAULT_REDIS_URL.into()),
            kv_flag_key: get("KV_FLAG_KEY").unwrap_or_else(|| DEFAULT_KV_FLAG_KEY.into()),
            launchdarkly,
            configcat,
            peer_service_url: get("PEER_SERVICE_URL")
                .map(|url| url.trim_end_matches('/').to_owned()),
            restapi_url: get("RESTAPI_URL").unwrap_or_else(|| DEFAULT_RESTAPI_URL.into()),
            http_timeout: Duration::from_secs(parse_or(
                &get,
                "HTTP_TIMEOUT_SECS",
                &DEFAULT_HTTP_TIMEOUT_SECS.to_string(),
            )?),
            seed_fixtures: parse_bool(&get, "SEED_FIXTURES", true)?,
        })
    }
}

fn parse_or<G, T>(get: &G, key: &'static str, default: &str) -> Result<T, ConfigError>
where
    G: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    let raw = get(key).unwrap_or_else(|| default.to_owned());
    raw.trim().parse().map_err(|e: T::Err| ConfigError::Invalid {
        key,
        value: raw.clone(),
        reason: e.to_string(),
    })
}

fn parse_bool<G>(get: &G, key: &'static str, default: bool) -> Result<bool, ConfigError>
where
    G: Fn(&str) -> Option<String>,
{
    let Some(raw) = get(key) else {
        return Ok(default);
    };
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::Invalid {
            key,
            value: raw,
            reason: "expected a boolean".into(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_from(pairs: &[(&str, &str)]) -> Result<Config, ConfigError> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn defaults_apply_when_environment_is_empty() {
        let config = config_from(&[]).unwrap();

        assert_eq!(config.bind_addr.to_string(), "0.0.0.0:3000");
        assert_eq!(config.database_path, PathBuf::from("flags.db"));
        assert_eq!(config.database_pool_size, 4);
        assert_eq!(config.kv_flag_key, "ld");
        assert_eq!(config.restapi_url, DEFAULT_RESTAPI_URL);
        assert_eq!(config.http_timeout, Duration::from_secs(10));
        assert!(config.seed_fixtures);
        assert!(config.launchdarkly.is_none());
        assert!(config.configcat.is_none());
        assert!(config.peer_service_url.is_none());
    }

    #[test]
    fn launchdarkly_needs_both_url_and_key() {
        let config = config_from(&[("LD_URL", "https://app.launchdarkly.com/api/v2/flags/x")])
            .unwrap();
        assert!(config.launchdarkly.is_none());

        let config = config_from(&[
            ("LD_URL", "https://app.launchdarkly.com/api/v2/flags/x"),
            ("LD_KEY", "api-123"),
        ])
        .unwrap();
        let ld = config.launchdarkly.unwrap();
        assert_eq!(ld.api_key, "api-123");
    }

    #[test]
    fn configcat_settings_follow_sdk_key() {
        let config = config_from(&[
            ("CC_KEY", "sdk-key"),
            ("CONFIGCAT_CACHE_TTL_SECS", "5"),
        ])
        .unwrap();
        let cc = config.configcat.unwrap();
        assert_eq!(cc.sdk_key, "sdk-key");
        assert_eq!(cc.flag_key, "iswinter");
        assert_eq!(cc.base_url, None);
        assert_eq!(cc.cache_ttl, Duration::from_secs(5));
    }

    #[test]
    fn configcat_base_url_override_drops_trailing_slash() {
        let config = config_from(&[
            ("CC_KEY", "sdk-key"),
            ("CONFIGCAT_BASE_URL", "http://proxy.local/"),
        ])
        .unwrap();
        assert_eq!(
            config.configcat.unwrap().base_url.as_deref(),
            Some("http://proxy.local")
        );
    }

    #[test]
    fn empty_values_count_as_unset() {
        let config = config_from(&[("CC_KEY", "  "), ("KV_FLAG_KEY", "")]).unwrap();
        assert!(config.configcat.is_none());
        assert_eq!(config.kv_flag_key, "ld");
    }

    #[test]
    fn peer_url_loses_trailing_slash() {
        let config = config_from(&[("PEER_SERVICE_URL", "http://flags.internal/")]).unwrap();
        assert_eq!(config.peer_service_url.as_deref(), Some("http://flags.internal"));
    }

    #[test]
    fn invalid_numbers_are_rejected() {
        let err = config_from(&[("HTTP_TIMEOUT_SECS", "soon")]).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { key: "HTTP_TIMEOUT_SECS", .. }));

        let err = config_from(&[("DATABASE_POOL_SIZE", "0")]).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { key: "DATABASE_POOL_SIZE", .. }));

        let err = config_from(&[("BIND_ADDR", "nowhere")]).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { key: "BIND_ADDR", .. }));
    }

    #[test]
    fn booleans_accept_common_spellings() {
        assert!(!config_from(&[("SEED_FIXTURES", "off")]).unwrap().seed_fixtures);
        assert!(config_from(&[("SEED_FIXTURES", "YES")]).unwrap().seed_fixtures);
        assert!(config_from(&[("SEED_FIXTURES", "maybe")]).is_err());
    }
}
