//! Client for the hddtemp daemon's pipe-delimited TCP protocol.
//!
//! The daemon writes one complete response per connection and closes it:
//!
//! ```text
//! |/dev/sda|WDC WD40EFRX|38|C||/dev/sdb|ST4000|SLP|*|
//! ```
//!
//! Records are separated by `||` and fields within a record by `|`, so the
//! response is split on the two-character delimiter before the single one.

use crate::error::{ExporterError, ProtocolErrorKind, Result};
use crate::metrics::collector::Collector;
use crate::metrics::descriptor::{DescriptorTable, MetricDescriptor, MetricId, Sample};
use async_trait::async_trait;
use serde::Serialize;
use std::sync::Arc;
use tokio::io::AsyncReadExt;
use tokio::net::TcpStream;
use tracing::{debug, warn};

/// Temperature reported for a drive whose unit is `*` (asleep, unknown, no sensor).
pub const NO_READING: f64 = -1.0;

const RECORD_SEPARATOR: &str = "||";
const FIELD_SEPARATOR: char = '|';

/// One drive reading from an hddtemp response.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HddRecord {
    pub device: String,
    pub id: String,
    /// Degrees Celsius, or [`NO_READING`] when the daemon had no reading.
    pub temperature_celsius: f64,
}

impl HddRecord {
    pub fn has_reading(&self) -> bool {
        self.temperature_celsius != NO_READING
    }
}

/// Parse a complete hddtemp response.
///
/// Any malformed record fails the whole batch; no partial list is returned.
pub fn parse_response(response: &str) -> Result<Vec<HddRecord>> {
    let body = response
        .strip_prefix(FIELD_SEPARATOR)
        .ok_or_else(|| ExporterError::protocol_error(ProtocolErrorKind::MalformedResponse, response))?;

    // Drop the closing delimiter. The daemon always sends one, and a missing
    // one leaves the final record short a field so it is still rejected.
    let mut chars = body.chars();
    chars.next_back();
    let body = chars.as_str();

    body.split(RECORD_SEPARATOR).map(parse_record).collect()
}

fn parse_record(record: &str) -> Result<HddRecord> {
    let fields: Vec<&str> = record.split(FIELD_SEPARATOR).collect();
    let &[device, id, temperature, unit] = fields.as_slice() else {
        return Err(ExporterError::protocol_error(
            ProtocolErrorKind::WrongFieldCount,
            record,
        ));
    };

    let temperature_celsius = match unit {
        "*" => NO_READING,
        "C" => temperature.parse::<f64>().map_err(|_| {
            ExporterError::protocol_error(ProtocolErrorKind::BadTemperatureLiteral, temperature)
        })?,
        _ => {
            return Err(ExporterError::protocol_error(
                ProtocolErrorKind::UnsupportedUnit,
                record,
            ))
        }
    };

    Ok(HddRecord {
        device: device.to_string(),
        id: id.to_string(),
        temperature_celsius,
    })
}

/// Render records in the daemon's wire format.
///
/// Records without a reading are written with the `*` unit, the way the daemon
/// reports a sleeping drive.
pub fn encode_records(records: &[HddRecord]) -> String {
    let body = records
        .iter()
        .map(|r| {
            if r.has_reading() {
                format!("{}|{}|{}|C", r.device, r.id, r.temperature_celsius)
            } else {
                format!("{}|{}|*|*", r.device, r.id)
            }
        })
        .collect::<Vec<_>>()
        .join(RECORD_SEPARATOR);
    format!("|{}|", body)
}

/// Fetches readings from an hddtemp daemon, one connection per call.
#[derive(Debug, Clone)]
pub struct HddTempClient {
    address: String,
}

impl HddTempClient {
    pub fn new(address: impl Into<String>) -> Self {
        Self {
            address: address.into(),
        }
    }

    pub fn address(&self) -> &str {
        &self.address
    }

    /// Connect, drain the response, close, then parse it.
    pub async fn fetch(&self) -> Result<Vec<HddRecord>> {
        let response = self.read_response().await?;
        debug!(address = %self.address, bytes = response.len(), "Read hddtemp response");
        parse_response(&response)
    }

    async fn read_response(&self) -> Result<String> {
        let mut stream =
            TcpStream::connect(&self.address)
                .await
                .map_err(|source| ExporterError::Connection {
                    address: self.address.clone(),
                    source,
                })?;

        let mut buf = Vec::new();
        stream
            .read_to_end(&mut buf)
            .await
            .map_err(|source| ExporterError::Read {
                address: self.address.clone(),
                source,
            })?;

        // `stream` is dropped here, closing the connection on every path.
        Ok(String::from_utf8_lossy(&buf).into_owned())
    }
}

/// Exposes hddtemp readings as `sensor_hddsmart_temperature_celsius`.
pub struct HddTempCollector {
    client: HddTempClient,
    descriptors: Arc<DescriptorTable>,
}

impl HddTempCollector {
    pub fn new(client: HddTempClient, descriptors: Arc<DescriptorTable>) -> Self {
        Self {
            client,
            descriptors,
        }
    }

    /// One fetch at startup so a misconfigured address shows up in the logs early.
    /// Never fails; the daemon may simply not be up yet.
    pub async fn probe(&self) -> bool {
        match self.client.fetch().await {
            Ok(records) => {
                debug!(address = %self.client.address(), drives = records.len(), "hddtemp reachable");
                true
            }
            Err(e) => {
                warn!(address = %self.client.address(), "Error reading hddtemps: {}", e);
                false
            }
        }
    }
}

#[async_trait]
impl Collector for HddTempCollector {
    fn name(&self) -> &'static str {
        "hddtemp"
    }

    fn describe(&self) -> Vec<Arc<MetricDescriptor>> {
        self.descriptors.select(&[MetricId::HddTemperature])
    }

    async fn collect(&self) -> Result<Vec<Sample>> {
        self.client
            .fetch()
            .await?
            .into_iter()
            .map(|r| {
                self.descriptors.sample(
                    MetricId::HddTemperature,
                    r.temperature_celsius,
                    vec![r.device, r.id],
                )
            })
            .collect()
    }
}
