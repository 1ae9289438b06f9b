use crate::constants::TIMEOUT_MS;
use crate::error::SimdosError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Two-ASCII-digit pump address carried in every frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PumpAddress([u8; 2]);

impl PumpAddress {
    /// Parse an address from a string of exactly two ASCII digits.
    pub fn new(s: &str) -> Result<Self, SimdosError> {
        let bytes = s.as_bytes();
        if bytes.len() != 2 || !bytes.iter().all(u8::is_ascii_digit) {
            return Err(SimdosError::Validation(format!(
                "pump address {s:?} must be exactly two ASCII digits"
            )));
        }
        Ok(PumpAddress([bytes[0], bytes[1]]))
    }

    pub fn as_bytes(&self) -> &[u8; 2] {
        &self.0
    }
}

impl Default for PumpAddress {
    fn default() -> Self {
        PumpAddress(*b"00")
    }
}

impl fmt::Display for PumpAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.0[0] as char, self.0[1] as char)
    }
}

/// Pump operating mode (`MS{n}` / `?MS`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PumpMode {
    /// Continuous run mode with an applied flow rate
    Run,
    /// Dispense a volume over a time
    DispenseVolTime,
    /// Dispense at a rate over a time
    DispenseRateTime,
}

impl PumpMode {
    pub fn code(self) -> u8 {
        match self {
            PumpMode::Run => 0,
            PumpMode::DispenseVolTime => 1,
            PumpMode::DispenseRateTime => 2,
        }
    }

    pub fn from_code(code: u8) -> Option<Self> {
        match code {
            0 => Some(PumpMode::Run),
            1 => Some(PumpMode::DispenseVolTime),
            2 => Some(PumpMode::DispenseRateTime),
            _ => None,
        }
    }
}

impl fmt::Display for PumpMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PumpMode::Run => write!(f, "Run"),
            PumpMode::DispenseVolTime => write!(f, "Dispense_VolTime"),
            PumpMode::DispenseRateTime => write!(f, "Dispense_RateTime"),
        }
    }
}

/// One decoded link-layer response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Response {
    /// Positive acknowledge with no data frame
    Ack,
    /// Device-reported rejection
    Nack,
    /// ACK followed by a checksum-verified data frame, markers stripped
    Data(String),
}

/// Result of a command that the pump answers with ACK or NACK only.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reply {
    Ack,
    Nack,
}

impl Reply {
    pub fn is_ack(self) -> bool {
        matches!(self, Reply::Ack)
    }

    pub(crate) fn from_response(response: Response) -> Result<Self, SimdosError> {
        match response {
            Response::Ack => Ok(Reply::Ack),
            Response::Nack => Ok(Reply::Nack),
            Response::Data(data) => Err(SimdosError::Parse(format!(
                "unexpected data frame {data:?} for an ACK/NACK command"
            ))),
        }
    }
}

/// Result of a query: a decoded value, an ACK/NACK passed through unchanged,
/// or a data frame that did not parse and is handed back raw.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PumpReply<T> {
    Value(T),
    Ack,
    Nack,
    Raw(String),
}

impl<T> PumpReply<T> {
    pub fn value(self) -> Option<T> {
        match self {
            PumpReply::Value(v) => Some(v),
            _ => None,
        }
    }
}

/// Decoded 3-digit status word from `?SS{n}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PumpStatus {
    code: u16,
}

impl PumpStatus {
    pub fn new(code: u16) -> Self {
        PumpStatus { code }
    }

    pub fn code(&self) -> u16 {
        self.code
    }

    /// Bit 0 of status page 1 indicates the motor is running.
    pub fn motor_running(&self) -> bool {
        self.code & 1 != 0
    }
}

/// Hardware flow-rate envelope of a pump model (µl/min).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlowRateLimits {
    pub min_ul_min: u32,
    pub max_ul_min: u32,
}

impl FlowRateLimits {
    pub fn new(min_ul_min: u32, max_ul_min: u32) -> Self {
        FlowRateLimits {
            min_ul_min,
            max_ul_min,
        }
    }

    pub fn contains(&self, flow_ul_min: u32) -> bool {
        (self.min_ul_min..=self.max_ul_min).contains(&flow_ul_min)
    }
}

/// Supported pump models and their dosing ranges.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PumpModel {
    /// SIMDOS 02 (FEM 1.02): 0.03 – 2.5 ml/min
    Simdos02,
    /// SIMDOS 10 (FEM 1.10): 1.0 – 100 ml/min
    Simdos10,
}

impl PumpModel {
    pub fn limits(self) -> FlowRateLimits {
        match self {
            PumpModel::Simdos02 => FlowRateLimits::new(30, 2_500),
            PumpModel::Simdos10 => FlowRateLimits::new(1_000, 100_000),
        }
    }
}

impl fmt::Display for PumpModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PumpModel::Simdos02 => write!(f, "SIMDOS02"),
            PumpModel::Simdos10 => write!(f, "SIMDOS10"),
        }
    }
}

/// Static configuration of one pump connection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PumpConfig {
    /// Serial device, e.g. `COM3` or `/dev/ttyUSB0`
    pub port: String,
    #[serde(default)]
    pub address: PumpAddress,
    pub model: PumpModel,
    /// Substitute the fixed `'U'` checksum byte for the computed LRC
    #[serde(default)]
    pub universal_lrc: bool,
    /// Response timeout in milliseconds
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
}

fn default_timeout_ms() -> u64 {
    TIMEOUT_MS
}

impl PumpConfig {
    pub fn new(port: impl Into<String>, model: PumpModel) -> Self {
        PumpConfig {
            port: port.into(),
            address: PumpAddress::default(),
            model,
            universal_lrc: false,
            timeout_ms: TIMEOUT_MS,
        }
    }
}

/// One timestamped flow-log row, as observed from the device.
///
/// Fields read back as NACK or a malformed frame are logged as `None`
/// rather than failing the sampling pass.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FlowLogRecord {
    pub timestamp: DateTime<Utc>,
    pub flow_ul_min: Option<u32>,
    pub mode: Option<PumpMode>,
}

/// Persistence sink accepting timestamped flow-log rows.
///
/// CSV (or other) serialization lives outside this crate; the control loop
/// only hands rows across this seam.
pub trait SampleSink {
    fn record(&mut self, row: &FlowLogRecord) -> std::io::Result<()>;
}

impl SampleSink for Vec<FlowLogRecord> {
    fn record(&mut self, row: &FlowLogRecord) -> std::io::Result<()> {
        self.push(row.clone());
        Ok(())
    }
}
