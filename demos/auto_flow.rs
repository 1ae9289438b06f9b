//! Automatic Flow Control Example
//!
//! Runs the SOC-based flow controller against two simulated pumps: a fixed
//! sample source stands in for the cycler's CSV export, the orchestrator
//! applies the computed rate to both pumps once per tick, and each pump's
//! flow-log row is printed as JSON.
//!
//! Usage:
//!   cargo run --example auto_flow
//!
//! Set RUST_LOG environment variable to control logging:
//!   RUST_LOG=debug cargo run --example auto_flow

use log::info;
use simdos_control::{
    ControlSample, FaultPolicy, FlowControlConfig, FlowController, PumpDevice, PumpModel,
    SampleSource, SimulatedPump,
};
use std::time::Duration;

/// Fixed readings in place of the cycler CSV + temperature probe.
struct BenchSource;

impl SampleSource for BenchSource {
    fn sample(&mut self) -> Option<ControlSample> {
        Some(ControlSample {
            current_ma: 5_000.0,
            ocv_volts: 1.42,
            temperature_c: Some(25.0),
        })
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = FlowControlConfig::default();
    config.validate()?;

    let mut pump_a = SimulatedPump::new(PumpModel::Simdos10);
    let mut pump_b = SimulatedPump::new(PumpModel::Simdos10);
    pump_a.connect()?;
    pump_b.connect()?;

    let mut source = BenchSource;
    let controller = FlowController::new(FaultPolicy::ContinueOthers);

    info!("=== Automatic Flow Control (3 ticks) ===");
    for tick in 1..=3 {
        let Some(sample) = source.sample() else {
            info!("tick {}: no sample available, skipping", tick);
            continue;
        };
        let outcome = controller.run_tick(
            &sample,
            &config,
            &mut [&mut pump_a, &mut pump_b],
        );
        for (pump_index, update) in outcome.updates.iter().enumerate() {
            info!("tick {}: pump {} -> {:?}", tick, pump_index, update);
        }

        for (name, pump) in [("A", &mut pump_a), ("B", &mut pump_b)] {
            let row = pump.sample_log_record();
            info!("pump {} log row: {}", name, serde_json::to_string(&row)?);
        }

        std::thread::sleep(Duration::from_millis(500));
    }

    info!("=== Automatic Flow Control Complete ===");
    Ok(())
}
