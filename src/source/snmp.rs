// Structured polling variant: SNMP v2c GET of the interface octet counters

use snmp2::{Oid, SyncSession, Value};
use std::time::Duration;

use async_trait::async_trait;

use crate::config::DeviceConfig;
use crate::models::{RawSample, Reading, epoch_millis};
use crate::source::{CounterSource, SourceError};
use crate::transport::{Connect, TransportSession};

/// ifHCInOctets / ifHCOutOctets (IF-MIB 64-bit counters), indexed by interface.
const OID_IF_HC_IN_OCTETS: [u64; 11] = [1, 3, 6, 1, 2, 1, 31, 1, 1, 1, 6];
const OID_IF_HC_OUT_OCTETS: [u64; 11] = [1, 3, 6, 1, 2, 1, 31, 1, 1, 1, 10];

pub struct SnmpConnector {
    addr: String,
    community: Vec<u8>,
    timeout: Duration,
}

impl Connect for SnmpConnector {
    type Conn = SyncSession;

    fn connect(&self) -> Result<SyncSession, SourceError> {
        SyncSession::new_v2c(self.addr.as_str(), &self.community, Some(self.timeout), 0)
            .map_err(|e| SourceError::Transport(format!("snmp session to {}: {e:?}", self.addr)))
    }

    fn target(&self) -> String {
        format!("snmp://{}", self.addr)
    }
}

/// Reads the two cumulative octet counters for one interface index per tick.
pub struct SnmpCounterSource {
    session: TransportSession<SnmpConnector>,
    oid_rx: Oid<'static>,
    oid_tx: Oid<'static>,
}

impl SnmpCounterSource {
    pub fn new(device: &DeviceConfig) -> anyhow::Result<Self> {
        let index = u64::from(device.interface_index);
        let mut rx_parts = OID_IF_HC_IN_OCTETS.to_vec();
        rx_parts.push(index);
        let mut tx_parts = OID_IF_HC_OUT_OCTETS.to_vec();
        tx_parts.push(index);
        let oid_rx = Oid::from(rx_parts.as_slice())
            .map_err(|e| anyhow::anyhow!("rx counter oid: {e:?}"))?
            .to_owned();
        let oid_tx = Oid::from(tx_parts.as_slice())
            .map_err(|e| anyhow::anyhow!("tx counter oid: {e:?}"))?
            .to_owned();

        let connector = SnmpConnector {
            addr: format!("{}:{}", device.host, device.effective_port()),
            community: device.community.clone().into_bytes(),
            timeout: Duration::from_millis(device.timeout_ms),
        };
        Ok(Self {
            session: TransportSession::new(connector),
            oid_rx,
            oid_tx,
        })
    }
}

#[async_trait]
impl CounterSource for SnmpCounterSource {
    async fn fetch(&self) -> Result<Reading, SourceError> {
        let oid_rx = self.oid_rx.clone();
        let oid_tx = self.oid_tx.clone();
        let (rx_bytes, tx_bytes) = self
            .session
            .run(move |sess| {
                let rx = get_counter(sess, &oid_rx)?;
                let tx = get_counter(sess, &oid_tx)?;
                Ok((rx, tx))
            })
            .await?;

        Ok(Reading::Counters(RawSample {
            rx_bytes,
            tx_bytes,
            captured_at: epoch_millis(),
        }))
    }
}

fn get_counter(sess: &mut SyncSession, oid: &Oid<'_>) -> Result<u64, SourceError> {
    let pdu = sess
        .get(oid)
        .map_err(|e| SourceError::Transport(format!("snmp get: {e:?}")))?;
    let mut varbinds = pdu.varbinds;
    match varbinds.next() {
        Some((_, value)) => decode_counter_value(&value),
        None => Err(SourceError::Protocol("empty varbind list in response".into())),
    }
}

fn decode_counter_value(value: &Value<'_>) -> Result<u64, SourceError> {
    match value {
        Value::Counter64(n) => Ok(*n),
        Value::Counter32(n) => Ok(u64::from(*n)),
        Value::Unsigned32(n) => Ok(u64::from(*n)),
        Value::Integer(n) => Ok((*n).max(0) as u64),
        // Some agents hand 64-bit counters back as raw octets.
        Value::OctetString(bytes) => Ok(decode_counter_bytes(bytes)),
        Value::Opaque(bytes) => Ok(decode_counter_bytes(bytes)),
        Value::NoSuchObject | Value::NoSuchInstance | Value::EndOfMibView => Err(
            SourceError::Protocol("device rejected counter oid; check interface_index".into()),
        ),
        other => Err(SourceError::Protocol(format!(
            "unexpected counter value type: {other:?}"
        ))),
    }
}

/// Decodes a big-endian unsigned counter whose wire encoding may be shorter
/// than 8 bytes (a short encoding is a small value, zero-padded on the left).
/// Longer encodings keep the trailing 8 bytes.
pub fn decode_counter_bytes(bytes: &[u8]) -> u64 {
    let tail = if bytes.len() > 8 {
        &bytes[bytes.len() - 8..]
    } else {
        bytes
    };
    let mut padded = [0u8; 8];
    padded[8 - tail.len()..].copy_from_slice(tail);
    u64::from_be_bytes(padded)
}
