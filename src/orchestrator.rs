//! Applies one computed flow rate across all connected pump sessions.
//!
//! Each pump's update is an independent three-step sequence — ensure Run
//! mode, ensure the motor is running, set the flow rate — and a failure on
//! one pump never blocks the other. Whether a failure also halts automatic
//! control is an explicit policy choice, not a hardcoded behavior.

use crate::control::{self, ControlSample, FlowControlConfig};
use crate::device::PumpDevice;
use crate::error::SimdosError;
use crate::types::{PumpMode, PumpReply, Reply};
use serde::{Deserialize, Serialize};

/// What a pump failure during a control tick does to the loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FaultPolicy {
    /// Abort only the failing pump's update; the loop keeps running
    ContinueOthers,
    /// Any pump failure requests a halt of automatic control
    HaltControl,
}

/// Step of the per-pump update sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateStage {
    ModeSwitch,
    MotorStart,
    FlowRate,
}

/// Outcome of one pump's update within a control tick.
#[derive(Debug)]
pub enum UpdateStatus {
    /// The flow rate was applied, after clamping into effective bounds
    Applied { flow_ul_min: u32 },
    /// The pump was not connected and was left alone
    Skipped,
    /// The device rejected a command at the given stage
    NackedAt(UpdateStage),
    /// Communication failed at the given stage
    FailedAt(UpdateStage, SimdosError),
}

impl UpdateStatus {
    pub fn is_failure(&self) -> bool {
        matches!(
            self,
            UpdateStatus::NackedAt(_) | UpdateStatus::FailedAt(_, _)
        )
    }
}

/// Result of one full orchestrator pass.
#[derive(Debug)]
pub struct TickOutcome {
    /// Per-pump statuses, in the order the pumps were supplied
    pub updates: Vec<UpdateStatus>,
    /// True when the fault policy requests that automatic control stop
    pub halt: bool,
}

/// Sequences flow-rate updates across pump sessions.
pub struct FlowController {
    policy: FaultPolicy,
}

impl FlowController {
    pub fn new(policy: FaultPolicy) -> Self {
        FlowController { policy }
    }

    /// Compute the flow demand for one sample and push it to every pump.
    pub fn run_tick(
        &self,
        sample: &ControlSample,
        config: &FlowControlConfig,
        pumps: &mut [&mut dyn PumpDevice],
    ) -> TickOutcome {
        let flow = control::flow_ul_min(sample, config);
        log::debug!(
            "tick: I = {:.3} A, OCV = {:.3} V -> demand {:.1} µl/min",
            sample.current_ma / 1000.0,
            sample.ocv_volts,
            flow
        );
        self.apply_flow(flow, config, pumps)
    }

    /// Apply one (unclamped) flow demand to every connected pump, clamping
    /// into each pump's effective bounds.
    pub fn apply_flow(
        &self,
        flow_ul_min: f64,
        config: &FlowControlConfig,
        pumps: &mut [&mut dyn PumpDevice],
    ) -> TickOutcome {
        let mut updates = Vec::with_capacity(pumps.len());
        let mut halt = false;
        for pump in pumps.iter_mut() {
            let status = update_one(flow_ul_min, config, &mut **pump);
            if status.is_failure() && self.policy == FaultPolicy::HaltControl {
                halt = true;
            }
            updates.push(status);
        }
        TickOutcome { updates, halt }
    }
}

impl Default for FlowController {
    fn default() -> Self {
        FlowController::new(FaultPolicy::ContinueOthers)
    }
}

fn update_one(
    flow_ul_min: f64,
    config: &FlowControlConfig,
    pump: &mut dyn PumpDevice,
) -> UpdateStatus {
    if !pump.is_connected() {
        return UpdateStatus::Skipped;
    }

    // Ensure the pump is in Run mode.
    let in_run_mode = match pump.get_mode() {
        Ok(PumpReply::Value(PumpMode::Run)) => true,
        Ok(_) => false,
        Err(err) => return UpdateStatus::FailedAt(UpdateStage::ModeSwitch, err),
    };
    if !in_run_mode {
        match pump.set_mode(PumpMode::Run) {
            Ok(Reply::Ack) => {}
            Ok(Reply::Nack) => return UpdateStatus::NackedAt(UpdateStage::ModeSwitch),
            Err(err) => return UpdateStatus::FailedAt(UpdateStage::ModeSwitch, err),
        }
    }

    // Ensure the motor is running. An unreadable status word is not fatal;
    // starting an already-running pump is harmless.
    let motor_running = match pump.get_pump_status(1) {
        Ok(PumpReply::Value(status)) => status.motor_running(),
        Ok(_) => false,
        Err(err) => return UpdateStatus::FailedAt(UpdateStage::MotorStart, err),
    };
    if !motor_running {
        match pump.start_pump() {
            Ok(Reply::Ack) => {}
            Ok(Reply::Nack) => return UpdateStatus::NackedAt(UpdateStage::MotorStart),
            Err(err) => return UpdateStatus::FailedAt(UpdateStage::MotorStart, err),
        }
    }

    let bounds = control::effective_bounds(config, pump.flow_rate_limits());
    let target = control::target_flow(flow_ul_min, &bounds);
    match pump.set_flow_rate_run_mode(target) {
        Ok(Reply::Ack) => UpdateStatus::Applied {
            flow_ul_min: target,
        },
        Ok(Reply::Nack) => UpdateStatus::NackedAt(UpdateStage::FlowRate),
        Err(err) => UpdateStatus::FailedAt(UpdateStage::FlowRate, err),
    }
}
