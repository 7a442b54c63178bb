// Domain models and wire messages

use serde::{Deserialize, Serialize};

/// One raw acquisition from the device. Counters are cumulative,
/// monotonically non-decreasing as reported, but may reset to zero on
/// reboot or wrap at a fixed modulus (32-bit legacy counters).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RawSample {
    pub rx_bytes: u64,
    pub tx_bytes: u64,
    /// Capture time, epoch milliseconds.
    pub captured_at: u64,
}

/// What a `CounterSource` yields per tick. SNMP polling returns cumulative
/// counters; the SSH scrape returns rates the device already computed.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Reading {
    Counters(RawSample),
    Rates {
        rx_bps: f64,
        tx_bps: f64,
        captured_at: u64,
    },
}

/// One bandwidth observation, derived and never persisted.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RateObservation {
    pub rx_bps: f64,
    pub tx_bps: f64,
    /// Observation time, epoch milliseconds.
    pub observed_at: u64,
}

/// Sent to a subscriber once on connect.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", tag = "type", rename = "config")]
pub struct ConfigMessage {
    pub interface: String,
    pub poll_interval_ms: u64,
}

/// Sent to a subscriber per tick that produced an observation.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename = "metrics")]
pub struct ObservationMessage {
    pub ts: u64,
    pub rx_bps: f64,
    pub tx_bps: f64,
    pub rx_mbps: f64,
    pub tx_mbps: f64,
}

impl From<RateObservation> for ObservationMessage {
    fn from(obs: RateObservation) -> Self {
        Self {
            ts: obs.observed_at,
            rx_bps: obs.rx_bps,
            tx_bps: obs.tx_bps,
            rx_mbps: obs.rx_bps / 1e6,
            tx_mbps: obs.tx_bps / 1e6,
        }
    }
}

/// Epoch milliseconds now. Falls back to 0 if the clock is before the epoch.
pub fn epoch_millis() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or_else(|e| {
            tracing::warn!(error = %e, operation = "get_timestamp", "system time error");
            0
        })
}
