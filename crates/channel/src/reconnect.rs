//! Bounded exponential-backoff reconnection.
//!
//! When the channel drops, the connection task calls [`reconnect_loop`],
//! which waits, re-reads the bearer token, and renegotiates a transport
//! until it connects, runs out of attempts, or is cancelled.

use std::time::Duration;

use fly8_core::session::SessionStore;
use tokio_util::sync::CancellationToken;

use crate::transport::{connect_any, Connector, Transport, TransportKind};

/// Tunable parameters for the backoff strategy.
#[derive(Debug, Clone)]
pub struct ReconnectConfig {
    /// Delay before the first reconnection attempt.
    pub initial_delay: Duration,
    /// Upper bound on the delay between attempts.
    pub max_delay: Duration,
    /// Factor by which the delay grows after each failure.
    pub multiplier: f64,
    /// Attempts before giving up and reporting `ReconnectFailed`.
    pub max_attempts: u32,
}

impl Default for ReconnectConfig {
    fn default() -> Self {
        Self {
            initial_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(5),
            multiplier: 2.0,
            max_attempts: 5,
        }
    }
}

/// Calculate the next backoff delay from the current delay and config.
///
/// The result is clamped to [`ReconnectConfig::max_delay`].
pub fn next_delay(current: Duration, config: &ReconnectConfig) -> Duration {
    let next_ms = (current.as_millis() as f64 * config.multiplier) as u64;
    Duration::from_millis(next_ms).min(config.max_delay)
}

pub enum ReconnectOutcome {
    Connected(Box<dyn Transport>),
    Exhausted { attempts: u32 },
    Cancelled,
}

impl std::fmt::Debug for ReconnectOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ReconnectOutcome::Connected(t) => write!(f, "Connected({})", t.kind()),
            ReconnectOutcome::Exhausted { attempts } => write!(f, "Exhausted({attempts})"),
            ReconnectOutcome::Cancelled => f.write_str("Cancelled"),
        }
    }
}

/// Retry the connection with backoff.
///
/// The token is re-read from `session` on every attempt so a re-login
/// during the outage is picked up.
pub async fn reconnect_loop(
    connector: &dyn Connector,
    kinds: &[TransportKind],
    session: &dyn SessionStore,
    config: &ReconnectConfig,
    cancel: &CancellationToken,
) -> ReconnectOutcome {
    let mut delay = config.initial_delay;

    for attempt in 1..=config.max_attempts {
        // Wait before each attempt, respecting cancellation.
        tokio::select! {
            _ = cancel.cancelled() => return ReconnectOutcome::Cancelled,
            _ = tokio::time::sleep(delay) => {}
        }

        tracing::info!(
            attempt,
            max_attempts = config.max_attempts,
            delay_ms = delay.as_millis() as u64,
            "Reconnecting event channel",
        );

        let token = session.token();
        tokio::select! {
            _ = cancel.cancelled() => {
                tracing::info!("Reconnect cancelled");
                return ReconnectOutcome::Cancelled;
            }
            result = connect_any(connector, kinds, token.as_deref()) => {
                match result {
                    Ok(transport) => {
                        tracing::info!(attempt, transport = %transport.kind(), "Event channel reconnected");
                        return ReconnectOutcome::Connected(transport);
                    }
                    Err(e) => {
                        tracing::warn!(error = %e, "Reconnect attempt {attempt} failed");
                    }
                }
            }
        }

        delay = next_delay(delay, config);
    }

    tracing::error!(
        attempts = config.max_attempts,
        "Event channel reconnect attempts exhausted",
    );
    ReconnectOutcome::Exhausted {
        attempts: config.max_attempts,
    }
}
