// Counter acquisition from the device

mod scrape;
mod snmp;

pub use scrape::{SshCounterSource, parse_monitor_output};
pub use snmp::{SnmpCounterSource, decode_counter_bytes};

use async_trait::async_trait;

use crate::models::Reading;

/// Per-tick acquisition failures. None of these are fatal to the process:
/// a failing tick yields no observation and the next tick tries again.
#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    /// Connection-level failure (refused, timed out, dropped). The
    /// transport session is torn down; the next fetch reconnects.
    #[error("transport error: {0}")]
    Transport(String),

    /// The device rejected the specific query. The session is retained.
    #[error("protocol error: {0}")]
    Protocol(String),

    /// Scrape output matched no accepted shape. The session is retained and
    /// the raw output is carried for diagnosis.
    #[error("unrecognized scrape output: {message}; raw output: {raw:?}")]
    Parse { message: String, raw: String },
}

impl SourceError {
    /// Whether this failure invalidates the underlying connection.
    pub fn tears_down_session(&self) -> bool {
        matches!(self, SourceError::Transport(_))
    }
}

/// One raw acquisition per call, hiding whether it came from structured
/// SNMP polling or a text-command scrape.
#[async_trait]
pub trait CounterSource: Send + Sync {
    async fn fetch(&self) -> Result<Reading, SourceError>;
}
