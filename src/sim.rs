//! Simulated pump: the full [`PumpDevice`] surface with no serial link.
//!
//! Mirrors the observable behavior of the hardware driver closely enough
//! that application logic can be exercised without a pump on the bench:
//! the same validation rules apply, and a `force_nack` switch makes the
//! device reject commands the way real hardware does.

use crate::constants::FLOW_RATE_PROTOCOL_MAX;
use crate::device::PumpDevice;
use crate::error::{Result, SimdosError};
use crate::types::{FlowRateLimits, PumpMode, PumpModel, PumpReply, PumpStatus, Reply};

/// In-memory stand-in for one SIMDOS pump.
pub struct SimulatedPump {
    model: PumpModel,
    connected: bool,
    running: bool,
    mode: PumpMode,
    flow_ul_min: u32,
    force_nack: bool,
}

impl SimulatedPump {
    pub fn new(model: PumpModel) -> Self {
        SimulatedPump {
            model,
            connected: false,
            running: false,
            mode: PumpMode::Run,
            flow_ul_min: 30_000,
            force_nack: false,
        }
    }

    /// When set, every subsequent command is answered with NACK. Lets
    /// callers exercise their rejection handling.
    pub fn force_nack(&mut self, on: bool) {
        self.force_nack = on;
    }

    pub fn motor_running(&self) -> bool {
        self.running
    }

    fn ensure_connected(&self) -> Result<()> {
        if self.connected {
            Ok(())
        } else {
            Err(SimdosError::NotConnected)
        }
    }

    fn reply(&self) -> Reply {
        if self.force_nack {
            Reply::Nack
        } else {
            Reply::Ack
        }
    }
}

impl PumpDevice for SimulatedPump {
    fn connect(&mut self) -> Result<()> {
        log::debug!("simulated {} pump connected", self.model);
        self.connected = true;
        Ok(())
    }

    fn disconnect(&mut self) {
        self.connected = false;
    }

    fn is_connected(&self) -> bool {
        self.connected
    }

    fn flow_rate_limits(&self) -> Option<FlowRateLimits> {
        Some(self.model.limits())
    }

    fn set_mode(&mut self, mode: PumpMode) -> Result<Reply> {
        self.ensure_connected()?;
        if self.force_nack {
            return Ok(Reply::Nack);
        }
        self.mode = mode;
        Ok(Reply::Ack)
    }

    fn get_mode(&mut self) -> Result<PumpReply<PumpMode>> {
        self.ensure_connected()?;
        if self.force_nack {
            return Ok(PumpReply::Nack);
        }
        Ok(PumpReply::Value(self.mode))
    }

    fn start_pump(&mut self) -> Result<Reply> {
        self.ensure_connected()?;
        if self.force_nack {
            return Ok(Reply::Nack);
        }
        self.running = true;
        Ok(Reply::Ack)
    }

    fn stop_pump(&mut self) -> Result<Reply> {
        self.ensure_connected()?;
        if self.force_nack {
            return Ok(Reply::Nack);
        }
        self.running = false;
        Ok(Reply::Ack)
    }

    fn prime_pump(&mut self, _strokes: u32) -> Result<Reply> {
        self.ensure_connected()?;
        Ok(self.reply())
    }

    fn set_flow_rate_run_mode(&mut self, flow_ul_min: u32) -> Result<Reply> {
        self.ensure_connected()?;
        if flow_ul_min > FLOW_RATE_PROTOCOL_MAX {
            return Err(SimdosError::Validation(format!(
                "flow rate {flow_ul_min} µl/min exceeds the protocol field \
                 maximum of {FLOW_RATE_PROTOCOL_MAX}"
            )));
        }
        let limits = self.model.limits();
        if !limits.contains(flow_ul_min) {
            log::warn!(
                "flow rate {flow_ul_min} µl/min is outside the {} range \
                 {}..={} µl/min",
                self.model,
                limits.min_ul_min,
                limits.max_ul_min
            );
        }
        if self.force_nack {
            return Ok(Reply::Nack);
        }
        self.flow_ul_min = flow_ul_min;
        Ok(Reply::Ack)
    }

    fn get_flow_rate_run_mode(&mut self) -> Result<PumpReply<u32>> {
        self.ensure_connected()?;
        if self.force_nack {
            return Ok(PumpReply::Nack);
        }
        Ok(PumpReply::Value(self.flow_ul_min))
    }

    fn get_pump_model_firmware(&mut self) -> Result<PumpReply<String>> {
        self.ensure_connected()?;
        if self.force_nack {
            return Ok(PumpReply::Nack);
        }
        Ok(PumpReply::Value(format!("{}00.01", self.model)))
    }

    fn get_pump_status(&mut self, page: u8) -> Result<PumpReply<PumpStatus>> {
        self.ensure_connected()?;
        if !crate::constants::VALID_STATUS_PAGES.contains(&page) {
            return Err(SimdosError::Validation(format!(
                "status page {page} is not one of {:?}",
                crate::constants::VALID_STATUS_PAGES
            )));
        }
        if self.force_nack {
            return Ok(PumpReply::Nack);
        }
        let code = match (page, self.running) {
            (1, true) => 1,
            _ => 0,
        };
        Ok(PumpReply::Value(PumpStatus::new(code)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn operations_require_connect() {
        let mut pump = SimulatedPump::new(PumpModel::Simdos10);
        assert!(matches!(
            pump.start_pump(),
            Err(SimdosError::NotConnected)
        ));
        pump.connect().unwrap();
        assert_eq!(pump.start_pump().unwrap(), Reply::Ack);
    }

    #[test]
    fn tracks_mode_motor_and_flow_state() {
        let mut pump = SimulatedPump::new(PumpModel::Simdos10);
        pump.connect().unwrap();
        pump.set_mode(PumpMode::DispenseVolTime).unwrap();
        pump.set_flow_rate_run_mode(42_000).unwrap();
        pump.start_pump().unwrap();

        assert_eq!(
            pump.get_mode().unwrap(),
            PumpReply::Value(PumpMode::DispenseVolTime)
        );
        assert_eq!(
            pump.get_flow_rate_run_mode().unwrap(),
            PumpReply::Value(42_000)
        );
        let status = pump.get_pump_status(1).unwrap().value().unwrap();
        assert!(status.motor_running());

        pump.stop_pump().unwrap();
        let status = pump.get_pump_status(1).unwrap().value().unwrap();
        assert!(!status.motor_running());
    }

    #[test]
    fn enforces_the_same_protocol_range_as_hardware() {
        let mut pump = SimulatedPump::new(PumpModel::Simdos10);
        pump.connect().unwrap();
        assert!(matches!(
            pump.set_flow_rate_run_mode(100_000_000),
            Err(SimdosError::Validation(_))
        ));
    }

    #[test]
    fn force_nack_rejects_commands() {
        let mut pump = SimulatedPump::new(PumpModel::Simdos10);
        pump.connect().unwrap();
        pump.force_nack(true);
        assert_eq!(pump.set_mode(PumpMode::Run).unwrap(), Reply::Nack);
        assert_eq!(pump.get_mode().unwrap(), PumpReply::Nack);
    }

    #[test]
    fn log_record_degrades_to_none_on_nack() {
        let mut pump = SimulatedPump::new(PumpModel::Simdos10);
        pump.connect().unwrap();
        let record = pump.sample_log_record();
        assert_eq!(record.flow_ul_min, Some(30_000));
        assert_eq!(record.mode, Some(PumpMode::Run));

        pump.force_nack(true);
        let record = pump.sample_log_record();
        assert_eq!(record.flow_ul_min, None);
        assert_eq!(record.mode, None);
    }
}
