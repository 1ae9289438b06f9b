//! Transport session: exclusive ownership of one open serial connection.
//!
//! A session performs exactly one exchange at a time: it clears the input
//! buffer of stale bytes, writes one encoded frame, and reads back one
//! delimited response within the configured timeout. Failed exchanges are
//! surfaced to the caller, never retried here.

use crate::constants::BAUD_RATE;
use crate::error::{Result, SimdosError};
use crate::frame;
use crate::types::{PumpAddress, Response};
use serialport::{ClearBuffer, DataBits, Parity, SerialPort, StopBits};
use std::io::{self, Read, Write};
use std::time::Duration;

/// Byte-oriented serial link, abstracted so tests and the loopback harness
/// can substitute an in-memory implementation.
pub trait SerialLink: Read + Write {
    /// Discard any bytes already buffered on the receive side.
    fn discard_input(&mut self) -> io::Result<()>;
}

impl SerialLink for Box<dyn SerialPort> {
    fn discard_input(&mut self) -> io::Result<()> {
        self.clear(ClearBuffer::Input).map_err(io::Error::from)
    }
}

/// One open connection to one pump.
///
/// Not reentrant: a second request only begins after the previous exchange
/// has returned or timed out. A fatal communication error drops the link,
/// and later calls fail with [`SimdosError::NotConnected`] until a fresh
/// connect.
pub struct Session<L: SerialLink = Box<dyn SerialPort>> {
    link: Option<L>,
    address: PumpAddress,
    label: String,
}

impl Session<Box<dyn SerialPort>> {
    /// Open the serial device with the fixed 9600-8-N-1 framing parameters.
    pub fn connect(port: &str, address: PumpAddress, timeout: Duration) -> Result<Self> {
        let link = serialport::new(port, BAUD_RATE)
            .data_bits(DataBits::Eight)
            .parity(Parity::None)
            .stop_bits(StopBits::One)
            .timeout(timeout)
            .open()
            .map_err(|source| SimdosError::PortUnavailable {
                port: port.to_string(),
                source,
            })?;
        log::debug!("opened {port} for pump address {address}");
        Ok(Session {
            link: Some(link),
            address,
            label: port.to_string(),
        })
    }
}

impl<L: SerialLink> Session<L> {
    /// Wrap an already-open link. Used by tests and custom transports.
    pub fn over(link: L, address: PumpAddress, label: impl Into<String>) -> Self {
        Session {
            link: Some(link),
            address,
            label: label.into(),
        }
    }

    pub fn is_connected(&self) -> bool {
        self.link.is_some()
    }

    pub fn address(&self) -> PumpAddress {
        self.address
    }

    /// Write one framed request and read back its response.
    ///
    /// Timeouts and malformed frames come back as errors for the caller to
    /// judge; a physical read/write failure additionally closes the session
    /// since the link state must be assumed desynchronized.
    pub fn send_receive(
        &mut self,
        payload: &str,
        expect_data: bool,
        universal_lrc: bool,
    ) -> Result<Response> {
        if !payload.bytes().all(|b| (0x20..=0x7e).contains(&b)) {
            return Err(SimdosError::Validation(format!(
                "payload {payload:?} is not printable ASCII"
            )));
        }
        let request = frame::encode(&self.address, payload, universal_lrc);
        log::debug!("{} -> {payload} ({request:02x?})", self.label);

        let result = self.exchange(&request, expect_data);
        match &result {
            Ok(response) => log::debug!("{} <- {response:?}", self.label),
            Err(err) if err.closes_session() => {
                log::warn!("{}: closing session after link fault: {err}", self.label);
                self.link = None;
            }
            Err(err) => log::debug!("{} <- error: {err}", self.label),
        }
        result
    }

    fn exchange(&mut self, request: &[u8], expect_data: bool) -> Result<Response> {
        let link = self.link.as_mut().ok_or(SimdosError::NotConnected)?;
        link.discard_input()?;
        link.write_all(request)?;
        link.flush()?;
        frame::decode_response(link, expect_data)
    }

    /// Close the underlying port. Idempotent.
    pub fn disconnect(&mut self) {
        if self.link.take().is_some() {
            log::debug!("{}: session closed", self.label);
        }
    }
}
