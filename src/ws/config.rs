#![expect(
    clippy::module_name_repetitions,
    reason = "Configuration types intentionally mirror the module name for clarity"
)]

use std::time::Duration;

use backoff::backoff::Constant;

const DEFAULT_HEARTBEAT_INTERVAL_DURATION: Duration = Duration::from_secs(10);
const DEFAULT_RECONNECT_DELAY_DURATION: Duration = Duration::from_secs(10);

/// Configuration for chat channel client behavior.
#[non_exhaustive]
#[derive(Debug, Clone)]
pub struct Config {
    /// Interval between outbound ping probes. The same duration serves as the
    /// reply deadline, so a silent peer is detected after at most two
    /// intervals.
    pub heartbeat_interval: Duration,
    /// Reconnection policy
    pub reconnect: ReconnectConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            heartbeat_interval: DEFAULT_HEARTBEAT_INTERVAL_DURATION,
            reconnect: ReconnectConfig::default(),
        }
    }
}

/// Configuration for reconnection behavior.
///
/// Reconnects run on a fixed delay with no growth and no attempt cap. The
/// channel is operated by a present user, so failures stay visible while
/// retries keep running at a slow, constant pace.
#[non_exhaustive]
#[derive(Debug, Clone)]
pub struct ReconnectConfig {
    /// Fixed delay between a reconnect request and the attempt it schedules
    pub delay: Duration,
    /// Automatically request a reconnect when the session closes.
    ///
    /// Disabled by default: a disconnect surfaces to the user and
    /// reconnection stays a manual action unless this is enabled.
    pub on_close: bool,
}

impl Default for ReconnectConfig {
    fn default() -> Self {
        Self {
            delay: DEFAULT_RECONNECT_DELAY_DURATION,
            on_close: false,
        }
    }
}

impl From<ReconnectConfig> for Constant {
    fn from(config: ReconnectConfig) -> Self {
        Constant::new(config.delay)
    }
}
