use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use fly8_cache::PollConfig;
use fly8_channel::{ChannelConfig, ReconnectConfig, TransportKind};
use fly8_core::error::CoreError;

/// Synchronization layer configuration loaded from environment variables.
///
/// All fields have defaults suitable for local development against a
/// backend on `localhost:4000`.
#[derive(Debug, Clone)]
pub struct SyncConfig {
    /// REST base URL (default: `http://localhost:4000`).
    pub api_url: String,
    /// Event channel base URL (default: same as `api_url`).
    pub socket_url: String,
    /// Bound on each REST request (default: 30s).
    pub request_timeout: Duration,
    pub reconnect: ReconnectConfig,
    /// Poll cadence for statistics and list queries (default: 30s).
    pub stats_poll: PollConfig,
    /// Poll cadence for "today"-scoped queries (default: 60s).
    pub today_poll: PollConfig,
    /// Idle time after which unreferenced cache entries are dropped
    /// (default: 300s).
    pub cache_gc_after: Duration,
    /// Debounce delay for search input (default: 500ms).
    pub search_debounce: Duration,
    /// Persisted session file (default: `.fly8-session.json`).
    pub session_path: PathBuf,
}

impl SyncConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                  | Default                 |
    /// |--------------------------|-------------------------|
    /// | `API_URL`                | `http://localhost:4000` |
    /// | `SOCKET_URL`             | value of `API_URL`      |
    /// | `REQUEST_TIMEOUT_SECS`   | `30`                    |
    /// | `RECONNECT_ATTEMPTS`     | `5`                     |
    /// | `RECONNECT_DELAY_MS`     | `1000`                  |
    /// | `RECONNECT_MAX_DELAY_MS` | `5000`                  |
    /// | `POLL_ENABLED`           | `true`                  |
    /// | `STATS_POLL_SECS`        | `30`                    |
    /// | `TODAY_POLL_SECS`        | `60`                    |
    /// | `CACHE_GC_SECS`          | `300`                   |
    /// | `SEARCH_DEBOUNCE_MS`     | `500`                   |
    /// | `SESSION_PATH`           | `.fly8-session.json`    |
    pub fn from_env() -> Result<Self, CoreError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build from an arbitrary variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, CoreError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let api_url = lookup("API_URL")
            .unwrap_or_else(|| "http://localhost:4000".into())
            .trim_end_matches('/')
            .to_string();
        let socket_url = lookup("SOCKET_URL")
            .map(|url| url.trim_end_matches('/').to_string())
            .unwrap_or_else(|| api_url.clone());

        let request_timeout_secs: u64 = parse(&lookup, "REQUEST_TIMEOUT_SECS", 30)?;
        let reconnect_attempts: u32 = parse(&lookup, "RECONNECT_ATTEMPTS", 5)?;
        let reconnect_delay_ms: u64 = parse(&lookup, "RECONNECT_DELAY_MS", 1000)?;
        let reconnect_max_delay_ms: u64 = parse(&lookup, "RECONNECT_MAX_DELAY_MS", 5000)?;
        let poll_enabled = parse_bool(&lookup, "POLL_ENABLED", true)?;
        let stats_poll_secs: u64 = parse(&lookup, "STATS_POLL_SECS", 30)?;
        let today_poll_secs: u64 = parse(&lookup, "TODAY_POLL_SECS", 60)?;
        let cache_gc_secs: u64 = parse(&lookup, "CACHE_GC_SECS", 300)?;
        let search_debounce_ms: u64 = parse(&lookup, "SEARCH_DEBOUNCE_MS", 500)?;
        let session_path = lookup("SESSION_PATH").unwrap_or_else(|| ".fly8-session.json".into());

        if request_timeout_secs == 0 {
            return Err(CoreError::Validation(
                "REQUEST_TIMEOUT_SECS must be greater than zero".into(),
            ));
        }
        if reconnect_max_delay_ms < reconnect_delay_ms {
            return Err(CoreError::Validation(
                "RECONNECT_MAX_DELAY_MS must not be below RECONNECT_DELAY_MS".into(),
            ));
        }

        let poll = |secs: u64| PollConfig {
            interval: Duration::from_secs(secs),
            enabled: poll_enabled && secs > 0,
        };

        Ok(Self {
            api_url,
            socket_url,
            request_timeout: Duration::from_secs(request_timeout_secs),
            reconnect: ReconnectConfig {
                initial_delay: Duration::from_millis(reconnect_delay_ms),
                max_delay: Duration::from_millis(reconnect_max_delay_ms),
                max_attempts: reconnect_attempts,
                ..ReconnectConfig::default()
            },
            stats_poll: poll(stats_poll_secs),
            today_poll: poll(today_poll_secs),
            cache_gc_after: Duration::from_secs(cache_gc_secs),
            search_debounce: Duration::from_millis(search_debounce_ms),
            session_path: PathBuf::from(session_path),
        })
    }

    /// Channel settings: WebSocket first, long-polling as fallback.
    pub fn channel(&self) -> ChannelConfig {
        ChannelConfig {
            url: self.socket_url.clone(),
            transports: vec![TransportKind::WebSocket, TransportKind::LongPolling],
            reconnect: self.reconnect.clone(),
        }
    }
}

fn parse<T, F>(lookup: &F, name: &str, default: T) -> Result<T, CoreError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
    F: Fn(&str) -> Option<String>,
{
    match lookup(name) {
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|e| CoreError::Validation(format!("{name} is invalid ({raw:?}): {e}"))),
        None => Ok(default),
    }
}

fn parse_bool<F>(lookup: &F, name: &str, default: bool) -> Result<bool, CoreError>
where
    F: Fn(&str) -> Option<String>,
{
    match lookup(name).map(|raw| raw.trim().to_ascii_lowercase()) {
        None => Ok(default),
        Some(raw) => match raw.as_str() {
            "1" | "true" | "yes" | "on" => Ok(true),
            "0" | "false" | "no" | "off" => Ok(false),
            _ => Err(CoreError::Validation(format!("{name} must be a boolean, got {raw:?}"))),
        },
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use assert_matches::assert_matches;

    use super::*;

    fn from(vars: &[(&str, &str)]) -> Result<SyncConfig, CoreError> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        SyncConfig::from_lookup(|name| vars.get(name).cloned())
    }

    #[test]
    fn defaults() {
        let config = from(&[]).unwrap();
        assert_eq!(config.api_url, "http://localhost:4000");
        assert_eq!(config.socket_url, config.api_url);
        assert_eq!(config.request_timeout, Duration::from_secs(30));
        assert_eq!(config.reconnect.max_attempts, 5);
        assert_eq!(config.reconnect.initial_delay, Duration::from_secs(1));
        assert_eq!(config.stats_poll, PollConfig::every(Duration::from_secs(30)));
        assert_eq!(config.today_poll, PollConfig::every(Duration::from_secs(60)));
        assert_eq!(config.search_debounce, Duration::from_millis(500));
        assert_eq!(config.session_path, PathBuf::from(".fly8-session.json"));
    }

    #[test]
    fn overrides_and_trailing_slash() {
        let config = from(&[
            ("API_URL", "https://api.fly8.global/"),
            ("SOCKET_URL", "https://rt.fly8.global"),
            ("STATS_POLL_SECS", "10"),
        ])
        .unwrap();
        assert_eq!(config.api_url, "https://api.fly8.global");
        assert_eq!(config.channel().url, "https://rt.fly8.global");
        assert_eq!(config.stats_poll.interval, Duration::from_secs(10));
    }

    #[test]
    fn polling_can_be_disabled() {
        let config = from(&[("POLL_ENABLED", "false")]).unwrap();
        assert!(!config.stats_poll.enabled);
        assert!(!config.today_poll.enabled);
    }

    #[test]
    fn malformed_values_are_rejected() {
        assert_matches!(
            from(&[("REQUEST_TIMEOUT_SECS", "soon")]),
            Err(CoreError::Validation(_))
        );
        assert_matches!(from(&[("POLL_ENABLED", "maybe")]), Err(CoreError::Validation(_)));
        assert_matches!(
            from(&[("RECONNECT_DELAY_MS", "9000")]),
            Err(CoreError::Validation(_))
        );
    }
}
