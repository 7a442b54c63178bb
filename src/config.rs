use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub device: DeviceConfig,
    pub polling: PollingConfig,
    pub monitoring: MonitoringConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub port: u16,
    pub host: String,
}

/// Which acquisition variant talks to the device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransportKind {
    /// Structured polling of the two octet counters over SNMP v2c.
    Snmp,
    /// One-shot `monitor-traffic` scrape over an SSH exec channel.
    Ssh,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DeviceConfig {
    pub host: String,
    pub transport: TransportKind,
    /// Explicit port; defaults to 161 (snmp) or 22 (ssh) when absent.
    pub port: Option<u16>,
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,

    // SNMP variant
    #[serde(default = "default_community")]
    pub community: String,
    #[serde(default = "default_interface_index")]
    pub interface_index: u32,

    // SSH variant
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
    #[serde(default)]
    pub interface_name: String,
}

fn default_timeout_ms() -> u64 {
    3000
}

fn default_community() -> String {
    "public".into()
}

fn default_interface_index() -> u32 {
    2
}

#[derive(Debug, Clone, Deserialize)]
pub struct PollingConfig {
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
    /// Per-subscriber observation channel depth (slow clients apply backpressure).
    #[serde(default = "default_channel_capacity")]
    pub channel_capacity: usize,
}

fn default_poll_interval_ms() -> u64 {
    1000
}

fn default_channel_capacity() -> usize {
    32
}

#[derive(Debug, Clone, Deserialize)]
pub struct MonitoringConfig {
    /// How often to log app stats (live subscriber count) at INFO level.
    pub stats_log_interval_secs: u64,
}

impl DeviceConfig {
    /// Effective device port for the configured transport.
    pub fn effective_port(&self) -> u16 {
        self.port.unwrap_or(match self.transport {
            TransportKind::Snmp => 161,
            TransportKind::Ssh => 22,
        })
    }

    /// Human-readable identity of the monitored interface, sent to subscribers.
    pub fn interface_label(&self) -> String {
        match self.transport {
            TransportKind::Snmp => format!("SNMP Index {}", self.interface_index),
            TransportKind::Ssh => self.interface_name.clone(),
        }
    }
}

impl AppConfig {
    pub fn load() -> anyhow::Result<Self> {
        let path = std::env::var("CONFIG_FILE").unwrap_or_else(|_| "config.toml".into());
        let s = std::fs::read_to_string(&path)?;
        Self::load_from_str(&s)
    }

    /// Parse and validate config from a string (e.g. for tests).
    pub fn load_from_str(s: &str) -> anyhow::Result<Self> {
        let config: AppConfig = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> anyhow::Result<()> {
        anyhow::ensure!(
            self.server.port > 0,
            "server.port must be between 1 and 65535, got {}",
            self.server.port
        );
        anyhow::ensure!(!self.device.host.is_empty(), "device.host must be non-empty");
        anyhow::ensure!(
            self.device.timeout_ms > 0,
            "device.timeout_ms must be > 0, got {}",
            self.device.timeout_ms
        );
        match self.device.transport {
            TransportKind::Snmp => {
                anyhow::ensure!(
                    !self.device.community.is_empty(),
                    "device.community must be non-empty for the snmp transport"
                );
            }
            TransportKind::Ssh => {
                anyhow::ensure!(
                    !self.device.username.is_empty(),
                    "device.username must be non-empty for the ssh transport"
                );
                anyhow::ensure!(
                    !self.device.interface_name.is_empty(),
                    "device.interface_name must be non-empty for the ssh transport"
                );
            }
        }
        anyhow::ensure!(
            self.polling.poll_interval_ms > 0,
            "polling.poll_interval_ms must be > 0, got {}",
            self.polling.poll_interval_ms
        );
        anyhow::ensure!(
            self.polling.channel_capacity > 0,
            "polling.channel_capacity must be > 0, got {}",
            self.polling.channel_capacity
        );
        anyhow::ensure!(
            self.monitoring.stats_log_interval_secs > 0,
            "monitoring.stats_log_interval_secs must be > 0, got {}",
            self.monitoring.stats_log_interval_secs
        );
        Ok(())
    }
}
