//! # SIMDOS Control Library
//!
//! A Rust library for driving KNF SIMDOS metering pumps over a framed
//! serial protocol, with an electrochemical (Nernst/SOC based) automatic
//! flow-rate controller for flow-battery experiments.
//!
//! ## Features
//!
//! - Framed ASCII protocol engine (STX/ETX envelope, XOR checksum,
//!   ACK/NACK request-response state machine)
//! - Full pump command set: mode, start/stop, prime, flow rate, status,
//!   identification
//! - Hardware-backed and simulated pumps behind one [`PumpDevice`] trait
//! - SOC-based flow-rate control with operator and hardware bounds
//! - Orchestrated updates across two independent pump sessions, driven by
//!   a cancellable periodic scheduler
//!
//! ## Example
//!
//! ```
//! use simdos_control::{PumpDevice, PumpMode, PumpModel, SimulatedPump};
//!
//! fn main() -> simdos_control::Result<()> {
//!     let mut pump = SimulatedPump::new(PumpModel::Simdos10);
//!     pump.connect()?;
//!     pump.set_mode(PumpMode::Run)?;
//!     pump.set_flow_rate_run_mode(30_000)?;
//!     pump.start_pump()?;
//!     Ok(())
//! }
//! ```
//!
//! Driving real hardware only changes the device construction:
//!
//! ```no_run
//! use simdos_control::{PumpConfig, PumpDevice, PumpModel, SimdosPump};
//!
//! fn main() -> simdos_control::Result<()> {
//!     let config = PumpConfig::new("/dev/ttyUSB0", PumpModel::Simdos10);
//!     let mut pump = SimdosPump::new(config);
//!     pump.connect()?;
//!     pump.start_pump()?;
//!     Ok(())
//! }
//! ```

pub mod constants;
pub mod control;
pub mod device;
pub mod error;
pub mod frame;
pub mod orchestrator;
pub mod pump;
pub mod scheduler;
pub mod sim;
pub mod transport;
pub mod types;

pub use control::{ControlSample, FlowControlConfig, SampleSource};
pub use device::PumpDevice;
pub use error::{Result, SimdosError};
pub use orchestrator::{FaultPolicy, FlowController, TickOutcome, UpdateStatus};
pub use pump::SimdosPump;
pub use scheduler::{PeriodicTask, TickControl};
pub use sim::SimulatedPump;
pub use transport::{SerialLink, Session};
pub use types::*;
