//! Manual Pump Control Example
//!
//! Demonstrates direct operation of one SIMDOS pump:
//! - Listing and selecting serial ports
//! - Connecting and checking communication
//! - Reading model/firmware and status
//! - Setting Run mode and a flow rate, then starting the pump
//!
//! Usage:
//!   cargo run --example manual_control                  # Interactive mode
//!   cargo run --example manual_control -- COM3          # Specify port
//!   cargo run --example manual_control -- /dev/ttyUSB0
//!
//! Set RUST_LOG environment variable to control logging:
//!   RUST_LOG=debug cargo run --example manual_control

use inquire::Select;
use log::info;
use simdos_control::{
    PumpConfig, PumpDevice, PumpModel, PumpMode, PumpReply, Result, SimdosPump,
};

/// Interactive serial port selection using inquire
fn select_port() -> Result<String> {
    let ports = SimdosPump::list_ports()?;

    if ports.is_empty() {
        eprintln!("No serial ports found!");
        std::process::exit(1);
    }

    let port_names: Vec<String> = ports
        .iter()
        .map(|p| format!("{} - {:?}", p.port_name, p.port_type))
        .collect();

    let selection = Select::new("Select a serial port:", port_names)
        .prompt()
        .map_err(|e| {
            std::io::Error::new(
                std::io::ErrorKind::Other,
                format!("Selection cancelled: {}", e),
            )
        })?;

    // Extract just the port name (before " - ")
    let port_name = selection.split(" - ").next().unwrap().to_string();
    Ok(port_name)
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let port_name = std::env::args()
        .nth(1)
        .map(Ok)
        .unwrap_or_else(select_port)?;

    info!("Connecting to SIMDOS pump on {}...", port_name);
    let config = PumpConfig::new(port_name, PumpModel::Simdos10);
    let mut pump = SimdosPump::new(config);
    pump.connect()?;

    match pump.check_communication()? {
        PumpReply::Value(address) => info!("✓ Pump responded from address {}", address),
        other => info!("✗ Unexpected communication check reply: {:?}", other),
    }

    if let PumpReply::Value(id) = pump.get_pump_model_firmware()? {
        info!("Model/firmware: {}", id);
    }

    info!("=== Run Mode at 30 ml/min ===");
    info!("Set mode:      {:?}", pump.set_mode(PumpMode::Run)?);
    info!("Set flow rate: {:?}", pump.set_flow_rate_run_mode(30_000)?);
    info!("Start:         {:?}", pump.start_pump()?);

    if let PumpReply::Value(status) = pump.get_pump_status(1)? {
        info!(
            "Status word {:03}: motor {}",
            status.code(),
            if status.motor_running() { "running" } else { "stopped" }
        );
    }

    std::thread::sleep(std::time::Duration::from_secs(5));

    info!("Stop: {:?}", pump.stop_pump()?);
    pump.disconnect();
    info!("=== Manual Control Complete ===");

    Ok(())
}
