//! Error types for SIMDOS protocol operations.

use thiserror::Error;

/// Result type alias for pump operations.
pub type Result<T> = std::result::Result<T, SimdosError>;

/// Error types for SIMDOS pump communication and flow control.
#[derive(Error, Debug)]
pub enum SimdosError {
    /// Serial port communication error
    #[error("Serial port error: {0}")]
    SerialPort(#[from] serialport::Error),

    /// General I/O error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// The serial device could not be opened
    #[error("Port {port} unavailable: {source}")]
    PortUnavailable {
        /// Port that failed to open
        port: String,
        /// Underlying open failure
        source: serialport::Error,
    },

    /// No response byte arrived within the session timeout
    #[error("Response timeout")]
    Timeout,

    /// A data frame ended (timeout or overrun) before the ETX marker
    #[error("Incomplete frame: no ETX before timeout")]
    IncompleteFrame,

    /// A data frame arrived without its trailing checksum byte
    #[error("Missing checksum after data frame")]
    MissingChecksum,

    /// Response checksum validation failed; the frame is discarded
    #[error("Checksum mismatch: computed {computed:#04x}, received {received:#04x}")]
    ChecksumMismatch {
        /// Checksum recomputed over the received STX..ETX span
        computed: u8,
        /// Checksum byte the pump sent
        received: u8,
    },

    /// A byte outside the protocol alphabet where ACK/NACK/STX was expected
    #[error("Unexpected byte {0:#04x} in response")]
    UnexpectedByte(u8),

    /// Caller supplied an out-of-protocol-range value; nothing was transmitted
    #[error("Validation error: {0}")]
    Validation(String),

    /// Operation attempted on a closed session
    #[error("Not connected")]
    NotConnected,

    /// Response content could not be interpreted
    #[error("Parse error: {0}")]
    Parse(String),
}

impl SimdosError {
    /// Whether this error forces the owning transport session closed.
    ///
    /// Physical I/O failures leave the link state unknown, so the session is
    /// dropped and must be reconnected. Timeouts and malformed frames are
    /// surfaced but keep the session open.
    pub fn closes_session(&self) -> bool {
        matches!(self, SimdosError::SerialPort(_) | SimdosError::Io(_))
    }
}
