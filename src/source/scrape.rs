// Scrape variant: one-shot monitor-traffic command over an SSH exec channel

use ssh2::Session;
use std::io::Read;
use std::net::TcpStream;

use async_trait::async_trait;

use crate::config::DeviceConfig;
use crate::models::{Reading, epoch_millis};
use crate::source::{CounterSource, SourceError};
use crate::transport::{Connect, TransportSession};

pub struct SshConnector {
    host: String,
    port: u16,
    username: String,
    password: String,
    timeout_ms: u64,
}

impl Connect for SshConnector {
    type Conn = Session;

    fn connect(&self) -> Result<Session, SourceError> {
        let tcp = TcpStream::connect((self.host.as_str(), self.port))
            .map_err(|e| SourceError::Transport(format!("tcp connect to {}: {e}", self.host)))?;
        let mut sess =
            Session::new().map_err(|e| SourceError::Transport(format!("ssh session: {e}")))?;
        sess.set_tcp_stream(tcp);
        sess.set_timeout(self.timeout_ms as u32);
        sess.handshake()
            .map_err(|e| SourceError::Transport(format!("ssh handshake: {e}")))?;
        sess.userauth_password(&self.username, &self.password)
            .map_err(|e| SourceError::Transport(format!("ssh auth: {e}")))?;
        Ok(sess)
    }

    fn target(&self) -> String {
        format!("ssh://{}@{}:{}", self.username, self.host, self.port)
    }
}

/// Asks the device to report instantaneous counters for the named interface
/// and pattern-matches the captured output. Yields already-computed rates.
pub struct SshCounterSource {
    session: TransportSession<SshConnector>,
    command: String,
}

impl SshCounterSource {
    pub fn new(device: &DeviceConfig) -> Self {
        let connector = SshConnector {
            host: device.host.clone(),
            port: device.effective_port(),
            username: device.username.clone(),
            password: device.password.clone(),
            timeout_ms: device.timeout_ms,
        };
        let command = format!(
            "/interface monitor-traffic \"{}\" once",
            device.interface_name
        );
        Self {
            session: TransportSession::new(connector),
            command,
        }
    }
}

#[async_trait]
impl CounterSource for SshCounterSource {
    async fn fetch(&self) -> Result<Reading, SourceError> {
        let command = self.command.clone();
        let output = self
            .session
            .run(move |sess| {
                let mut channel = sess
                    .channel_session()
                    .map_err(|e| SourceError::Transport(format!("ssh channel: {e}")))?;
                channel
                    .exec(&command)
                    .map_err(|e| SourceError::Transport(format!("ssh exec: {e}")))?;
                let mut output = String::new();
                channel
                    .read_to_string(&mut output)
                    .map_err(|e| SourceError::Transport(format!("ssh read: {e}")))?;
                let _ = channel.wait_close();
                Ok(output)
            })
            .await?;

        let (rx_bps, tx_bps) = parse_monitor_output(&output)?;
        Ok(Reading::Rates {
            rx_bps,
            tx_bps,
            captured_at: epoch_millis(),
        })
    }
}

/// Extracts the rx/tx rates in bits per second from monitor-traffic output.
///
/// Two accepted shapes:
/// (a) explicit `rx-bits-per-second` / `tx-bits-per-second` fields, taken
///     directly;
/// (b) human-readable `rx-rate` / `tx-rate` fields in megabits (decimal
///     comma or point, optional `Mbps` suffix), multiplied by 1e6.
pub fn parse_monitor_output(output: &str) -> Result<(f64, f64), SourceError> {
    if let (Some(rx), Some(tx)) = (
        field_value(output, "rx-bits-per-second"),
        field_value(output, "tx-bits-per-second"),
    ) && let (Ok(rx_bps), Ok(tx_bps)) = (rx.parse::<f64>(), tx.parse::<f64>())
    {
        return Ok((rx_bps, tx_bps));
    }

    if let (Some(rx), Some(tx)) = (
        field_value(output, "rx-rate"),
        field_value(output, "tx-rate"),
    ) && let (Some(rx_mbit), Some(tx_mbit)) = (parse_megabits(rx), parse_megabits(tx))
    {
        return Ok((rx_mbit * 1e6, tx_mbit * 1e6));
    }

    Err(SourceError::Parse {
        message: "no rx/tx rate fields found".into(),
        raw: output.to_string(),
    })
}

/// Finds `key:` in whitespace-separated output and returns the next token.
fn field_value<'a>(output: &'a str, key: &str) -> Option<&'a str> {
    let mut tokens = output.split_whitespace();
    while let Some(token) = tokens.next() {
        if token.trim_end_matches(':') == key {
            return tokens.next();
        }
    }
    None
}

/// Parses a human-readable megabit value like `5.2Mbps`, `5,2Mbps` or `12`.
fn parse_megabits(token: &str) -> Option<f64> {
    let trimmed = token.trim();
    let numeric = trimmed
        .strip_suffix("Mbps")
        .or_else(|| trimmed.strip_suffix("mbps"))
        .unwrap_or(trimmed);
    numeric.replace(',', ".").parse::<f64>().ok()
}
