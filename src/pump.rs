//! High-level command set for a SIMDOS metering pump.
//!
//! Each operation maps onto a 2–3 character mnemonic with an optional
//! fixed-width numeric argument, exchanged through one [`Session`]. NACK
//! and communication errors are surfaced to the caller and never retried
//! here.

use crate::constants::{
    FLOW_RATE_PROTOCOL_MAX, PRIME_STROKE_DELAY_MS, VALID_STATUS_PAGES,
};
use crate::device::PumpDevice;
use crate::error::{Result, SimdosError};
use crate::transport::{SerialLink, Session};
use crate::types::{
    FlowRateLimits, PumpConfig, PumpMode, PumpReply, PumpStatus, Reply, Response,
};
use serialport::SerialPort;
use std::thread;
use std::time::Duration;

/// Hardware-backed SIMDOS pump.
///
/// Constructed disconnected; [`PumpDevice::connect`] opens the port. The
/// session is dropped on a fatal communication error, after which every
/// operation fails with [`SimdosError::NotConnected`] until reconnected.
pub struct SimdosPump<L: SerialLink = Box<dyn SerialPort>> {
    config: PumpConfig,
    session: Option<Session<L>>,
}

impl SimdosPump {
    pub fn new(config: PumpConfig) -> Self {
        SimdosPump {
            config,
            session: None,
        }
    }

    /// List available serial ports.
    pub fn list_ports() -> Result<Vec<serialport::SerialPortInfo>> {
        Ok(serialport::available_ports()?)
    }
}

impl<L: SerialLink> SimdosPump<L> {
    /// Wrap an existing session. Used by tests and custom transports.
    pub fn with_session(session: Session<L>, config: PumpConfig) -> Self {
        SimdosPump {
            config,
            session: Some(session),
        }
    }

    pub fn config(&self) -> &PumpConfig {
        &self.config
    }

    fn exchange(&mut self, payload: &str, expect_data: bool) -> Result<Response> {
        let session = self.session.as_mut().ok_or(SimdosError::NotConnected)?;
        session.send_receive(payload, expect_data, self.config.universal_lrc)
    }

    fn command(&mut self, payload: &str) -> Result<Reply> {
        let response = self.exchange(payload, false)?;
        Reply::from_response(response)
    }

    /// `?SI` — the pump echoes its address, confirming the link is alive.
    pub fn check_communication(&mut self) -> Result<PumpReply<String>> {
        match self.exchange("?SI", true)? {
            Response::Data(address) => Ok(PumpReply::Value(address)),
            Response::Ack => Ok(PumpReply::Ack),
            Response::Nack => Ok(PumpReply::Nack),
        }
    }

    pub fn set_mode(&mut self, mode: PumpMode) -> Result<Reply> {
        self.command(&format!("MS{}", mode.code()))
    }

    pub fn get_mode(&mut self) -> Result<PumpReply<PumpMode>> {
        match self.exchange("?MS", true)? {
            Response::Data(data) => {
                let mode = data
                    .trim()
                    .parse::<u8>()
                    .ok()
                    .and_then(PumpMode::from_code);
                Ok(match mode {
                    Some(mode) => PumpReply::Value(mode),
                    None => PumpReply::Raw(data),
                })
            }
            Response::Ack => Ok(PumpReply::Ack),
            Response::Nack => Ok(PumpReply::Nack),
        }
    }

    pub fn start_pump(&mut self) -> Result<Reply> {
        self.command("KY1")
    }

    pub fn stop_pump(&mut self) -> Result<Reply> {
        self.command("KY0")
    }

    /// `KY2` repeated once per stroke; the sequence aborts on the first
    /// non-ACK and reports that reply.
    pub fn prime_pump(&mut self, strokes: u32) -> Result<Reply> {
        for stroke in 0..strokes {
            let reply = self.command("KY2")?;
            if !reply.is_ack() {
                log::warn!("prime stroke {}/{strokes} rejected", stroke + 1);
                return Ok(reply);
            }
            if stroke + 1 < strokes {
                thread::sleep(Duration::from_millis(PRIME_STROKE_DELAY_MS));
            }
        }
        Ok(Reply::Ack)
    }

    /// `RV{:08}` — set the run-mode flow rate in µl/min.
    ///
    /// A value outside the 8-digit protocol field is a hard validation
    /// failure and nothing is transmitted. A value outside the model's
    /// dosing range is only a warning; the pump is the authority and may
    /// still reject it with NACK.
    pub fn set_flow_rate_run_mode(&mut self, flow_ul_min: u32) -> Result<Reply> {
        if flow_ul_min > FLOW_RATE_PROTOCOL_MAX {
            return Err(SimdosError::Validation(format!(
                "flow rate {flow_ul_min} µl/min exceeds the protocol field \
                 maximum of {FLOW_RATE_PROTOCOL_MAX}"
            )));
        }
        let limits = self.config.model.limits();
        if !limits.contains(flow_ul_min) {
            log::warn!(
                "flow rate {flow_ul_min} µl/min is outside the {} range \
                 {}..={} µl/min",
                self.config.model,
                limits.min_ul_min,
                limits.max_ul_min
            );
        }
        self.command(&format!("RV{flow_ul_min:08}"))
    }

    /// `?RV` — read back the configured run-mode flow rate.
    pub fn get_flow_rate_run_mode(&mut self) -> Result<PumpReply<u32>> {
        match self.exchange("?RV", true)? {
            Response::Data(data) => Ok(match data.trim().parse::<u32>() {
                Ok(flow) => PumpReply::Value(flow),
                Err(_) => PumpReply::Raw(data),
            }),
            Response::Ack => Ok(PumpReply::Ack),
            Response::Nack => Ok(PumpReply::Nack),
        }
    }

    /// `?SV` — raw `{model}{firmware}` identification string.
    pub fn get_pump_model_firmware(&mut self) -> Result<PumpReply<String>> {
        match self.exchange("?SV", true)? {
            Response::Data(data) => Ok(PumpReply::Value(data)),
            Response::Ack => Ok(PumpReply::Ack),
            Response::Nack => Ok(PumpReply::Nack),
        }
    }

    /// `?SS{n}` — 3-digit status word for page n ∈ {1, 2, 3, 4, 6}.
    pub fn get_pump_status(&mut self, page: u8) -> Result<PumpReply<PumpStatus>> {
        if !VALID_STATUS_PAGES.contains(&page) {
            return Err(SimdosError::Validation(format!(
                "status page {page} is not one of {VALID_STATUS_PAGES:?}"
            )));
        }
        match self.exchange(&format!("?SS{page}"), true)? {
            Response::Data(data) => Ok(match data.trim().parse::<u16>() {
                Ok(code) => PumpReply::Value(PumpStatus::new(code)),
                Err(_) => PumpReply::Raw(data),
            }),
            Response::Ack => Ok(PumpReply::Ack),
            Response::Nack => Ok(PumpReply::Nack),
        }
    }

    /// `IP` — restore factory settings.
    pub fn reset_to_factory_settings(&mut self) -> Result<Reply> {
        log::warn!("sending factory reset to pump on {}", self.config.port);
        self.command("IP")
    }

    /// `IN` — reinitialize (restart) the pump.
    pub fn initialize_pump(&mut self) -> Result<Reply> {
        self.command("IN")
    }
}

impl PumpDevice for SimdosPump {
    fn connect(&mut self) -> Result<()> {
        if self.session.as_ref().map_or(false, Session::is_connected) {
            return Ok(());
        }
        let session = Session::connect(
            &self.config.port,
            self.config.address,
            Duration::from_millis(self.config.timeout_ms),
        )?;
        self.session = Some(session);
        log::info!(
            "connected to {} pump on {}",
            self.config.model,
            self.config.port
        );
        Ok(())
    }

    fn disconnect(&mut self) {
        if let Some(mut session) = self.session.take() {
            session.disconnect();
        }
    }

    fn is_connected(&self) -> bool {
        self.session.as_ref().map_or(false, Session::is_connected)
    }

    fn flow_rate_limits(&self) -> Option<FlowRateLimits> {
        Some(self.config.model.limits())
    }

    fn set_mode(&mut self, mode: PumpMode) -> Result<Reply> {
        self.set_mode(mode)
    }

    fn get_mode(&mut self) -> Result<PumpReply<PumpMode>> {
        self.get_mode()
    }

    fn start_pump(&mut self) -> Result<Reply> {
        self.start_pump()
    }

    fn stop_pump(&mut self) -> Result<Reply> {
        self.stop_pump()
    }

    fn prime_pump(&mut self, strokes: u32) -> Result<Reply> {
        self.prime_pump(strokes)
    }

    fn set_flow_rate_run_mode(&mut self, flow_ul_min: u32) -> Result<Reply> {
        self.set_flow_rate_run_mode(flow_ul_min)
    }

    fn get_flow_rate_run_mode(&mut self) -> Result<PumpReply<u32>> {
        self.get_flow_rate_run_mode()
    }

    fn get_pump_model_firmware(&mut self) -> Result<PumpReply<String>> {
        self.get_pump_model_firmware()
    }

    fn get_pump_status(&mut self, page: u8) -> Result<PumpReply<PumpStatus>> {
        self.get_pump_status(page)
    }
}
