use serde::Deserialize;
use std::time::Duration;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub push: PushConfig,
    #[serde(default)]
    pub poll: PollConfig,
    #[serde(default)]
    pub ui: UiConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Backend origin, e.g. `http://127.0.0.1:5000`. Pull API and push
    /// endpoint are both derived from it.
    #[serde(default = "default_base_url")]
    pub base_url: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
        }
    }
}

fn default_base_url() -> String {
    "http://127.0.0.1:5000".into()
}

#[derive(Debug, Clone, Deserialize)]
pub struct PushConfig {
    /// When false the client goes straight to polling.
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_connect_timeout_ms")]
    pub connect_timeout_ms: u64,
    /// Delay before the first retry; doubles per failed attempt.
    #[serde(default = "default_reconnect_delay_ms")]
    pub reconnect_delay_ms: u64,
    #[serde(default = "default_reconnect_delay_max_ms")]
    pub reconnect_delay_max_ms: u64,
    /// Failed attempts per connect cycle before falling back to polling.
    #[serde(default = "default_max_reconnect_attempts")]
    pub max_reconnect_attempts: u32,
    /// Messages held while disconnected; the oldest are dropped beyond this.
    #[serde(default = "default_outbound_queue_capacity")]
    pub outbound_queue_capacity: usize,
}

impl Default for PushConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            connect_timeout_ms: default_connect_timeout_ms(),
            reconnect_delay_ms: default_reconnect_delay_ms(),
            reconnect_delay_max_ms: default_reconnect_delay_max_ms(),
            max_reconnect_attempts: default_max_reconnect_attempts(),
            outbound_queue_capacity: default_outbound_queue_capacity(),
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_connect_timeout_ms() -> u64 {
    10_000
}

fn default_reconnect_delay_ms() -> u64 {
    1_000
}

fn default_reconnect_delay_max_ms() -> u64 {
    5_000
}

fn default_max_reconnect_attempts() -> u32 {
    10
}

fn default_outbound_queue_capacity() -> usize {
    100
}

#[derive(Debug, Clone, Deserialize)]
pub struct PollConfig {
    #[serde(default = "default_poll_interval_ms")]
    pub interval_ms: u64,
    /// Per-request timeout; a timed-out cycle counts as failed.
    #[serde(default = "default_poll_timeout_ms")]
    pub timeout_ms: u64,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            interval_ms: default_poll_interval_ms(),
            timeout_ms: default_poll_timeout_ms(),
        }
    }
}

fn default_poll_interval_ms() -> u64 {
    5_000
}

fn default_poll_timeout_ms() -> u64 {
    10_000
}

#[derive(Debug, Clone, Deserialize)]
pub struct UiConfig {
    #[serde(default = "default_clock_interval_ms")]
    pub clock_interval_ms: u64,
    /// Preference flags (query table pause). Best-effort.
    #[serde(default = "default_prefs_path")]
    pub prefs_path: String,
}

impl Default for UiConfig {
    fn default() -> Self {
        Self {
            clock_interval_ms: default_clock_interval_ms(),
            prefs_path: default_prefs_path(),
        }
    }
}

fn default_clock_interval_ms() -> u64 {
    1_000
}

fn default_prefs_path() -> String {
    "data/prefs.json".into()
}

impl AppConfig {
    /// Reads `CONFIG_FILE` (default `config.toml`). A missing file yields the
    /// defaults; an unreadable or invalid one is an error.
    pub fn load() -> anyhow::Result<Self> {
        let path = std::env::var("CONFIG_FILE").unwrap_or_else(|_| "config.toml".into());
        match std::fs::read_to_string(&path) {
            Ok(s) => Self::load_from_str(&s),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::info!(path = %path, "config file not found, using defaults");
                Ok(Self::default())
            }
            Err(e) => Err(anyhow::anyhow!("reading {}: {}", path, e)),
        }
    }

    /// Parse and validate config from a string (e.g. for tests).
    pub fn load_from_str(s: &str) -> anyhow::Result<Self> {
        let config: AppConfig = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> anyhow::Result<()> {
        let base = self.server.base_url.as_str();
        anyhow::ensure!(
            base.starts_with("http://") || base.starts_with("https://"),
            "server.base_url must start with http:// or https://, got {:?}",
            base
        );
        anyhow::ensure!(
            self.push.connect_timeout_ms > 0,
            "push.connect_timeout_ms must be > 0, got {}",
            self.push.connect_timeout_ms
        );
        anyhow::ensure!(
            self.push.reconnect_delay_ms > 0,
            "push.reconnect_delay_ms must be > 0, got {}",
            self.push.reconnect_delay_ms
        );
        anyhow::ensure!(
            self.push.reconnect_delay_max_ms >= self.push.reconnect_delay_ms,
            "push.reconnect_delay_max_ms must be >= push.reconnect_delay_ms, got {}",
            self.push.reconnect_delay_max_ms
        );
        anyhow::ensure!(
            self.push.max_reconnect_attempts > 0,
            "push.max_reconnect_attempts must be > 0, got {}",
            self.push.max_reconnect_attempts
        );
        anyhow::ensure!(
            self.push.outbound_queue_capacity > 0,
            "push.outbound_queue_capacity must be > 0, got {}",
            self.push.outbound_queue_capacity
        );
        anyhow::ensure!(
            self.poll.interval_ms > 0,
            "poll.interval_ms must be > 0, got {}",
            self.poll.interval_ms
        );
        anyhow::ensure!(
            self.poll.timeout_ms > 0,
            "poll.timeout_ms must be > 0, got {}",
            self.poll.timeout_ms
        );
        anyhow::ensure!(
            self.ui.clock_interval_ms > 0,
            "ui.clock_interval_ms must be > 0, got {}",
            self.ui.clock_interval_ms
        );
        Ok(())
    }

    /// Backend origin without a trailing slash.
    pub fn base_url(&self) -> &str {
        self.server.base_url.trim_end_matches('/')
    }

    pub fn clock_interval(&self) -> Duration {
        Duration::from_millis(self.ui.clock_interval_ms)
    }
}
