//! Expert binary frame codec and ASCII line helpers.
//!
//! Expert amplifiers accept commands wrapped in a small binary frame and
//! answer either with a binary frame of their own or with legacy ASCII
//! text terminated by `;`. This module is the pure encode/decode layer for
//! both formats; it performs no I/O.
//!
//! # Frame format
//!
//! ```text
//! 0x55 0x55 0x55 <len> <payload: len bytes> <checksum>
//! ```
//!
//! - Three sync bytes mark the start of a frame.
//! - `len` counts payload bytes only (not sync, length, or checksum).
//! - `checksum` is the sum of the payload bytes modulo 256.
//!
//! Response frames start with the same sync pattern (some firmware uses
//! `0xAA` instead of `0x55`), but their fourth byte declares the size of
//! the whole reply: `len - 3` further bytes follow the header.

use bytes::{BufMut, BytesMut};

use amplib_core::error::{Error, Result};

/// Frame sync byte.
pub const SYNC: u8 = 0x55;

/// Alternative response sync byte seen in captures from 1.3K-FA firmware.
pub const RESPONSE_SYNC_ALT: u8 = 0xAA;

/// Number of repeated sync bytes at the start of every frame.
pub const SYNC_LEN: usize = 3;

/// Size of a frame header: three sync bytes plus the length byte.
pub const HEADER_LEN: usize = SYNC_LEN + 1;

/// Largest payload a single command frame may carry.
pub const MAX_PAYLOAD: usize = 60;

/// ASCII line terminator, also written on its own to poll for replies.
pub const SENTINEL: u8 = b';';

/// Compute the frame checksum: the payload byte sum modulo 256.
///
/// # Example
///
/// ```
/// use amplib_expert::protocol::checksum;
///
/// assert_eq!(checksum(&[0x80]), 0x80);
/// assert_eq!(checksum(&[0xFF, 0x02]), 0x01);
/// assert_eq!(checksum(&[]), 0x00);
/// ```
pub fn checksum(payload: &[u8]) -> u8 {
    payload.iter().fold(0u8, |acc, b| acc.wrapping_add(*b))
}

/// Encode a command payload into a complete frame.
///
/// Returns [`Error::InvalidParameter`] if the payload is longer than
/// [`MAX_PAYLOAD`] bytes.
///
/// # Example
///
/// ```
/// use amplib_expert::protocol::encode_frame;
///
/// let frame = encode_frame(&[0x80]).unwrap();
/// assert_eq!(frame, [0x55, 0x55, 0x55, 0x01, 0x80, 0x80]);
///
/// assert!(encode_frame(&[0u8; 61]).is_err());
/// ```
pub fn encode_frame(payload: &[u8]) -> Result<Vec<u8>> {
    if payload.len() > MAX_PAYLOAD {
        return Err(Error::InvalidParameter(format!(
            "command payload is {} bytes, maximum is {MAX_PAYLOAD}",
            payload.len()
        )));
    }

    let mut buf = BytesMut::with_capacity(HEADER_LEN + payload.len() + 1);
    buf.put_slice(&[SYNC; SYNC_LEN]);
    buf.put_u8(payload.len() as u8);
    buf.put_slice(payload);
    buf.put_u8(checksum(payload));
    Ok(buf.to_vec())
}

/// Whether `byte` is an accepted sync marker.
fn is_sync(byte: u8) -> bool {
    byte == SYNC || byte == RESPONSE_SYNC_ALT
}

/// Validate a response header and return how many bytes follow it.
///
/// The three leading bytes must all be the same sync marker. The fourth
/// byte declares the reply size; `len - 3` bytes follow the header.
///
/// # Example
///
/// ```
/// use amplib_expert::protocol::decode_header;
///
/// assert_eq!(decode_header(&[0x55, 0x55, 0x55, 0x08]).unwrap(), 5);
/// assert_eq!(decode_header(&[0xAA, 0xAA, 0xAA, 0x43]).unwrap(), 64);
/// assert!(decode_header(&[0x55, 0x00, 0x55, 0x08]).is_err());
/// ```
pub fn decode_header(header: &[u8]) -> Result<usize> {
    if header.len() < HEADER_LEN {
        return Err(Error::Protocol(format!(
            "short response header: {} of {HEADER_LEN} bytes",
            header.len()
        )));
    }

    let marker = header[0];
    if !is_sync(marker) || header[1] != marker || header[2] != marker {
        return Err(Error::Protocol(format!(
            "bad sync in response header: {:02X?}",
            &header[..SYNC_LEN]
        )));
    }

    let declared = header[SYNC_LEN] as usize;
    declared.checked_sub(SYNC_LEN).ok_or_else(|| {
        Error::Protocol(format!("response length byte {declared} is below {SYNC_LEN}"))
    })
}

/// Return the payload of a frame with its framing removed.
///
/// Strips the header and the trailing checksum byte. A bare header
/// (no body at all) yields an empty payload. The checksum is not checked
/// here; see [`verify_checksum`].
///
/// # Example
///
/// ```
/// use amplib_expert::protocol::{decode_body, encode_frame};
///
/// let frame = encode_frame(b"^FR14074;").unwrap();
/// assert_eq!(decode_body(&frame).unwrap(), b"^FR14074;");
/// ```
pub fn decode_body(frame: &[u8]) -> Result<&[u8]> {
    if frame.len() < HEADER_LEN || !is_sync(frame[0]) {
        return Err(Error::Protocol(format!(
            "not a frame: {:02X?}",
            &frame[..frame.len().min(HEADER_LEN)]
        )));
    }
    if frame.len() == HEADER_LEN {
        return Ok(&[]);
    }
    Ok(&frame[HEADER_LEN..frame.len() - 1])
}

/// Check a frame's trailing checksum against its payload.
///
/// Frames without a body carry no checksum and always pass.
pub fn verify_checksum(frame: &[u8]) -> Result<()> {
    let payload = decode_body(frame)?;
    if frame.len() == HEADER_LEN {
        return Ok(());
    }
    let expected = checksum(payload);
    let actual = frame[frame.len() - 1];
    if expected != actual {
        return Err(Error::ChecksumMismatch { expected, actual });
    }
    Ok(())
}

/// Turn one raw line (as read up to and including the sentinel) into text.
///
/// Strips the trailing `;` and surrounding whitespace (the amplifier
/// sometimes sends CR/LF between lines). Non-UTF-8 bytes are replaced.
pub fn line_text(raw: &[u8]) -> String {
    let body = raw.strip_suffix(&[SENTINEL]).unwrap_or(raw);
    String::from_utf8_lossy(body).trim().to_string()
}

/// Whether a raw line is the bare sentinel acknowledgment `;`.
pub fn is_bare_sentinel(raw: &[u8]) -> bool {
    raw == [SENTINEL]
}
