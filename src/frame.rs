//! Link-layer frame codec.
//!
//! A frame is `STX + address (2 ASCII digits) + payload (ASCII) + ETX`
//! followed by one checksum byte: the XOR fold of every byte from STX
//! through ETX inclusive, or the fixed byte `'U'` when the pump is in
//! universal-LRC mode. The checksum byte is never part of its own span.

use crate::constants::{ACK, ETX, MAX_FRAME_LEN, NACK, STX, UNIVERSAL_LRC};
use crate::error::{Result, SimdosError};
use crate::types::{PumpAddress, Response};
use std::io::{self, Read};

/// XOR-fold longitudinal redundancy check over a frame span.
pub fn lrc(span: &[u8]) -> u8 {
    span.iter().fold(0, |acc, &b| acc ^ b)
}

/// Build one complete command frame. Pure; the result is immutable.
pub fn encode(address: &PumpAddress, payload: &str, universal_lrc: bool) -> Vec<u8> {
    debug_assert!(payload.is_ascii());
    let mut frame = Vec::with_capacity(payload.len() + 5);
    frame.push(STX);
    frame.extend_from_slice(address.as_bytes());
    frame.extend_from_slice(payload.as_bytes());
    frame.push(ETX);
    let checksum = if universal_lrc {
        UNIVERSAL_LRC
    } else {
        lrc(&frame)
    };
    frame.push(checksum);
    frame
}

/// Read and classify one response from the link.
///
/// The first byte decides everything: ACK with no data expected is the whole
/// response; ACK with data expected is followed by `STX + data + ETX + LRC`;
/// NACK is a device rejection; anything else is a protocol violation.
pub fn decode_response<R: Read>(reader: &mut R, expect_data: bool) -> Result<Response> {
    let first = read_byte(reader)?.ok_or(SimdosError::Timeout)?;
    match first {
        ACK if !expect_data => Ok(Response::Ack),
        ACK => read_data_frame(reader),
        NACK => Ok(Response::Nack),
        other => Err(SimdosError::UnexpectedByte(other)),
    }
}

fn read_data_frame<R: Read>(reader: &mut R) -> Result<Response> {
    let mut span = Vec::with_capacity(16);
    loop {
        let byte = read_byte(reader)?.ok_or(SimdosError::IncompleteFrame)?;
        span.push(byte);
        if byte == ETX {
            break;
        }
        if span.len() >= MAX_FRAME_LEN {
            return Err(SimdosError::IncompleteFrame);
        }
    }

    let received = read_byte(reader)?.ok_or(SimdosError::MissingChecksum)?;
    let computed = lrc(&span);
    if computed != received {
        // Corrupted data is discarded, never trusted.
        return Err(SimdosError::ChecksumMismatch { computed, received });
    }
    if span[0] != STX {
        return Err(SimdosError::UnexpectedByte(span[0]));
    }

    let interior = &span[1..span.len() - 1];
    if !interior.is_ascii() {
        return Err(SimdosError::Parse(
            "non-ASCII bytes inside data frame".to_string(),
        ));
    }
    Ok(Response::Data(
        interior.iter().map(|&b| b as char).collect(),
    ))
}

/// Read one byte, mapping end-of-input and timeout to `None`.
///
/// `serialport` reads report a timeout as `TimedOut`/`WouldBlock` (or an
/// empty read on some platforms); any other I/O failure is a real link
/// fault and propagates.
fn read_byte<R: Read>(reader: &mut R) -> Result<Option<u8>> {
    let mut buf = [0u8; 1];
    loop {
        match reader.read(&mut buf) {
            Ok(0) => return Ok(None),
            Ok(_) => return Ok(Some(buf[0])),
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e)
                if e.kind() == io::ErrorKind::TimedOut
                    || e.kind() == io::ErrorKind::WouldBlock =>
            {
                return Ok(None)
            }
            Err(e) => return Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn data_frame(interior: &[u8]) -> Vec<u8> {
        let mut span = vec![STX];
        span.extend_from_slice(interior);
        span.push(ETX);
        let checksum = lrc(&span);
        span.push(checksum);
        let mut bytes = vec![ACK];
        bytes.extend_from_slice(&span);
        bytes
    }

    #[test]
    fn encode_embeds_xor_of_marker_span() {
        let address = PumpAddress::new("00").unwrap();
        for payload in ["MS0", "?RV", "RV00030000", "KY1", "?SS1"] {
            let frame = encode(&address, payload, false);
            let span = &frame[..frame.len() - 1];
            assert_eq!(frame[0], STX);
            assert_eq!(span[span.len() - 1], ETX);
            assert_eq!(*frame.last().unwrap(), lrc(span));
        }
    }

    #[test]
    fn encode_universal_checksum_is_fixed_u() {
        let address = PumpAddress::new("00").unwrap();
        let frame = encode(&address, "KY1", true);
        assert_eq!(*frame.last().unwrap(), b'U');
    }

    #[test]
    fn decode_ack_nack_and_timeout() {
        let mut ack = Cursor::new(vec![ACK]);
        assert_eq!(decode_response(&mut ack, false).unwrap(), Response::Ack);

        let mut nack = Cursor::new(vec![NACK]);
        assert_eq!(decode_response(&mut nack, false).unwrap(), Response::Nack);

        let mut empty = Cursor::new(Vec::new());
        assert!(matches!(
            decode_response(&mut empty, false),
            Err(SimdosError::Timeout)
        ));
    }

    #[test]
    fn decode_data_frame_strips_markers() {
        let mut stream = Cursor::new(data_frame(b"00030000"));
        assert_eq!(
            decode_response(&mut stream, true).unwrap(),
            Response::Data("00030000".to_string())
        );
    }

    #[test]
    fn any_single_flipped_byte_fails_the_checksum() {
        let good = data_frame(b"00030000");
        // Flip each byte of the STX..ETX span in turn (skip the leading ACK
        // and the trailing checksum byte).
        for i in 1..good.len() - 1 {
            let mut corrupted = good.clone();
            corrupted[i] ^= 0x10;
            let mut stream = Cursor::new(corrupted);
            assert!(
                matches!(
                    decode_response(&mut stream, true),
                    Err(SimdosError::ChecksumMismatch { .. })
                ),
                "flip at index {i} was silently accepted"
            );
        }
    }

    #[test]
    fn truncated_frame_is_incomplete() {
        let mut stream = Cursor::new(vec![ACK, STX, b'0', b'0']);
        assert!(matches!(
            decode_response(&mut stream, true),
            Err(SimdosError::IncompleteFrame)
        ));
    }

    #[test]
    fn overlong_frame_is_incomplete() {
        let mut bytes = vec![ACK, STX];
        bytes.extend(std::iter::repeat(b'9').take(MAX_FRAME_LEN + 8));
        let mut stream = Cursor::new(bytes);
        assert!(matches!(
            decode_response(&mut stream, true),
            Err(SimdosError::IncompleteFrame)
        ));
    }

    #[test]
    fn missing_checksum_byte() {
        let mut frame = data_frame(b"123");
        frame.pop();
        let mut stream = Cursor::new(frame);
        assert!(matches!(
            decode_response(&mut stream, true),
            Err(SimdosError::MissingChecksum)
        ));
    }

    #[test]
    fn unexpected_first_byte() {
        let mut stream = Cursor::new(vec![0x7f]);
        assert!(matches!(
            decode_response(&mut stream, false),
            Err(SimdosError::UnexpectedByte(0x7f))
        ));
    }
}
