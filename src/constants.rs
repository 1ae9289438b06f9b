//! Protocol constants for SIMDOS pump communication.
//!
//! This module defines the control bytes of the framed serial protocol,
//! the fixed serial interface parameters, and the physical constants used
//! by the flow-rate controller.

/// Start-of-frame marker (STX)
pub const STX: u8 = 0x02;

/// End-of-frame marker (ETX)
pub const ETX: u8 = 0x03;

/// Positive acknowledge (ACK)
pub const ACK: u8 = 0x06;

/// Negative acknowledge (NACK)
pub const NACK: u8 = 0x15;

/// Fixed checksum byte used when the pump runs in universal-LRC mode
pub const UNIVERSAL_LRC: u8 = b'U';

/// Baud rate (fixed by the pump interface)
pub const BAUD_RATE: u32 = 9600;

/// Default response timeout in milliseconds
pub const TIMEOUT_MS: u64 = 500;

/// Upper bound on a data frame (STX..ETX) before it is declared incomplete
pub const MAX_FRAME_LEN: usize = 64;

/// Largest flow rate representable in the 8-digit `RV` field (µl/min)
pub const FLOW_RATE_PROTOCOL_MAX: u32 = 99_999_999;

/// Status pages accepted by the `?SS{n}` query
pub const VALID_STATUS_PAGES: [u8; 5] = [1, 2, 3, 4, 6];

/// Delay between prime strokes, giving the diaphragm time to settle
pub const PRIME_STROKE_DELAY_MS: u64 = 500;

/// Floor on the automatic control interval
pub const MIN_CONTROL_INTERVAL_MS: u64 = 500;

/// Faraday constant (C/mol)
pub const FARADAY_CONSTANT: f64 = 96_485.3;

/// Universal gas constant (J/(mol·K))
pub const GAS_CONSTANT_R: f64 = 8.314_472;

/// OCV at which the Nernst logistic crosses SOC = 0.5 (V)
pub const NERNST_REFERENCE_OCV: f64 = 1.4;

/// Exponent magnitude beyond which the SOC logistic saturates to 0 or 1
pub const SOC_EXP_SATURATION: f64 = 700.0;

/// SOC is clamped into [ε, 1 − ε] before entering the flow law
pub const SOC_EPSILON: f64 = 1e-5;

/// Currents below this magnitude (A) are treated as zero
pub const CURRENT_EPSILON: f64 = 1e-9;

/// Temperature assumed when no probe reading is available (°C)
pub const DEFAULT_TEMPERATURE_C: f64 = 25.0;

/// Offset from Celsius to Kelvin
pub const KELVIN_OFFSET: f64 = 273.15;

/// Default electrolyte concentration (mol/l)
pub const DEFAULT_CONCENTRATION_MOLAR: f64 = 1.7;
