//! Capability interface shared by hardware-backed and simulated pumps.

use crate::error::Result;
use crate::types::{
    FlowLogRecord, FlowRateLimits, PumpMode, PumpReply, PumpStatus, Reply,
};
use chrono::Utc;

/// The operations a metering pump exposes, independent of whether bytes
/// actually cross a wire. The orchestrator and any UI layer depend only on
/// this trait.
pub trait PumpDevice {
    fn connect(&mut self) -> Result<()>;
    fn disconnect(&mut self);
    fn is_connected(&self) -> bool;

    /// Hardware dosing envelope, when the model is known.
    fn flow_rate_limits(&self) -> Option<FlowRateLimits>;

    fn set_mode(&mut self, mode: PumpMode) -> Result<Reply>;
    fn get_mode(&mut self) -> Result<PumpReply<PumpMode>>;
    fn start_pump(&mut self) -> Result<Reply>;
    fn stop_pump(&mut self) -> Result<Reply>;

    /// Prime with `strokes` strokes, aborting on the first non-ACK.
    fn prime_pump(&mut self, strokes: u32) -> Result<Reply>;

    fn set_flow_rate_run_mode(&mut self, flow_ul_min: u32) -> Result<Reply>;
    fn get_flow_rate_run_mode(&mut self) -> Result<PumpReply<u32>>;

    fn get_pump_model_firmware(&mut self) -> Result<PumpReply<String>>;
    fn get_pump_status(&mut self, page: u8) -> Result<PumpReply<PumpStatus>>;

    /// One timestamped log row; read failures degrade to `None` fields.
    fn sample_log_record(&mut self) -> FlowLogRecord {
        let flow_ul_min = match self.get_flow_rate_run_mode() {
            Ok(PumpReply::Value(v)) => Some(v),
            _ => None,
        };
        let mode = match self.get_mode() {
            Ok(PumpReply::Value(m)) => Some(m),
            _ => None,
        };
        FlowLogRecord {
            timestamp: Utc::now(),
            flow_ul_min,
            mode,
        }
    }
}
