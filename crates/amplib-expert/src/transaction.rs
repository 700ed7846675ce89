//! Transaction engine: one request/response exchange with the amplifier.
//!
//! Every exchange starts by discarding stale input so a previous failed
//! command cannot desynchronize this one. The command is then framed and
//! written, and the reply is collected in one of two ways:
//!
//! - **Framed** ([`ReplyMode::Frame`]): read the 4-byte header, learn the
//!   reply size from it, read the rest.
//! - **Lines** ([`ReplyMode::Lines`]): poll by writing a bare `;` and read
//!   text up to the next `;`, until the amplifier answers with a lone `;`
//!   or the poll budget runs out. Running out is not an error; the caller
//!   sees [`LineReply::acknowledged`] set to `false`.
//!
//! Every blocking read is bounded by [`TransactionConfig::timeout`].

use std::time::Duration;

use tracing::{debug, trace, warn};

use amplib_core::error::{Error, Result};
use amplib_core::transport::Transport;

use crate::protocol::{self, HEADER_LEN, SENTINEL};

/// Timing and retry parameters for transactions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransactionConfig {
    /// Timeout for each individual read from the transport.
    pub timeout: Duration,
    /// Extra read timeouts tolerated while a frame or line is incomplete.
    pub max_retries: u32,
    /// How many times to poll with the sentinel before giving up.
    pub poll_attempts: u32,
    /// Longest line accepted from the amplifier, in bytes.
    pub line_capacity: usize,
    /// Reject framed replies whose trailing checksum does not match.
    pub verify_checksum: bool,
}

impl Default for TransactionConfig {
    fn default() -> Self {
        TransactionConfig {
            timeout: Duration::from_millis(2000),
            max_retries: 2,
            poll_attempts: 3,
            line_capacity: 128,
            verify_checksum: false,
        }
    }
}

/// How the reply to a command is collected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplyMode {
    /// A length-prefixed binary frame.
    Frame,
    /// Sentinel-terminated ASCII lines, collected by polling.
    Lines,
}

/// Text collected by a sentinel poll.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LineReply {
    /// Non-empty lines received before the acknowledgment, sentinel stripped.
    pub lines: Vec<String>,
    /// Whether the amplifier answered a poll with a lone `;`.
    pub acknowledged: bool,
}

impl LineReply {
    /// The first line of the reply, or `""` if nothing was received.
    pub fn first(&self) -> &str {
        self.lines.first().map(String::as_str).unwrap_or("")
    }
}

/// The reply to one transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    /// Header plus body of a framed reply.
    Frame(Vec<u8>),
    /// Lines collected by polling.
    Lines(LineReply),
}

/// Run one exchange, collecting the reply according to `mode`.
///
/// `command` is the payload to frame and send. In [`ReplyMode::Frame`] a
/// non-empty command is required; in [`ReplyMode::Lines`] `None` skips the
/// write and only polls.
pub async fn transact(
    transport: &mut dyn Transport,
    config: &TransactionConfig,
    command: Option<&[u8]>,
    mode: ReplyMode,
) -> Result<Reply> {
    match mode {
        ReplyMode::Frame => transact_frame(transport, config, command)
            .await
            .map(Reply::Frame),
        ReplyMode::Lines => transact_lines(transport, config, command)
            .await
            .map(Reply::Lines),
    }
}

/// Send a command and read a framed reply.
///
/// Returns the whole reply, header included. Use
/// [`decode_body`](protocol::decode_body) to get at the payload.
pub async fn transact_frame(
    transport: &mut dyn Transport,
    config: &TransactionConfig,
    command: Option<&[u8]>,
) -> Result<Vec<u8>> {
    transport.discard_input().await?;

    let payload = command.filter(|c| !c.is_empty()).ok_or_else(|| {
        Error::InvalidParameter("a command is required when a framed reply is expected".into())
    })?;
    write_command(transport, payload).await?;

    let mut header = [0u8; HEADER_LEN];
    let got = read_exact(transport, &mut header, config).await?;
    if got == 0 {
        return Err(Error::Timeout);
    }
    let remaining = protocol::decode_header(&header[..got])?;
    debug!(remaining, "framed reply header");

    let mut frame = header.to_vec();
    frame.resize(HEADER_LEN + remaining, 0);
    let got = read_exact(transport, &mut frame[HEADER_LEN..], config).await?;
    if got < remaining {
        return Err(Error::Protocol(format!(
            "short reply body: {got} of {remaining} bytes"
        )));
    }
    trace!(frame = ?frame, "framed reply");

    if config.verify_checksum {
        protocol::verify_checksum(&frame)?;
    }
    Ok(frame)
}

/// Optionally send a command, then collect ASCII lines by sentinel polling.
pub async fn transact_lines(
    transport: &mut dyn Transport,
    config: &TransactionConfig,
    command: Option<&[u8]>,
) -> Result<LineReply> {
    transport.discard_input().await?;

    if let Some(payload) = command.filter(|c| !c.is_empty()) {
        write_command(transport, payload).await?;
    }

    let reply = poll_lines(transport, config).await?;
    debug!(
        lines = ?reply.lines,
        acknowledged = reply.acknowledged,
        "line reply"
    );
    Ok(reply)
}

/// Poll with the sentinel until a lone `;` comes back or attempts run out.
async fn poll_lines(
    transport: &mut dyn Transport,
    config: &TransactionConfig,
) -> Result<LineReply> {
    let mut reply = LineReply::default();

    for attempt in 1..=config.poll_attempts {
        transport.send(&[SENTINEL]).await?;
        match read_line(transport, config).await {
            Ok(raw) if protocol::is_bare_sentinel(&raw) => {
                reply.acknowledged = true;
                break;
            }
            Ok(raw) => {
                let text = protocol::line_text(&raw);
                trace!(attempt, line = %text, "poll returned text");
                if !text.is_empty() {
                    reply.lines.push(text);
                }
            }
            Err(Error::Timeout) => {
                debug!(attempt, "no reply to sentinel poll");
            }
            Err(e) => return Err(e),
        }
    }

    if !reply.acknowledged {
        warn!(
            attempts = config.poll_attempts,
            "amplifier did not acknowledge sentinel poll, continuing"
        );
    }
    Ok(reply)
}

/// Frame a payload and write it in one call.
async fn write_command(transport: &mut dyn Transport, payload: &[u8]) -> Result<()> {
    let frame = protocol::encode_frame(payload)?;
    trace!(frame = ?frame, "sending command");
    transport.send(&frame).await
}

/// Fill `buf` from the transport, tolerating up to `max_retries` timeouts.
///
/// Returns how many bytes were read; fewer than `buf.len()` means the
/// retry budget ran out first.
pub async fn read_exact(
    transport: &mut dyn Transport,
    buf: &mut [u8],
    config: &TransactionConfig,
) -> Result<usize> {
    let mut filled = 0;
    let mut timeouts = 0;

    while filled < buf.len() {
        match transport.receive(&mut buf[filled..], config.timeout).await {
            Ok(0) => return Err(Error::ConnectionLost),
            Ok(n) => filled += n,
            Err(Error::Timeout) => {
                if timeouts >= config.max_retries {
                    break;
                }
                timeouts += 1;
                trace!(filled, wanted = buf.len(), timeouts, "read timed out, retrying");
            }
            Err(e) => return Err(e),
        }
    }
    Ok(filled)
}

/// Read one line, up to and including the next `;`.
///
/// Reads a byte at a time so nothing after the sentinel is consumed. Stops
/// early at [`TransactionConfig::line_capacity`] bytes or when the retry
/// budget runs out with a partial line. A timeout before the first byte
/// returns [`Error::Timeout`] at once; retries only apply once a line has
/// started.
pub async fn read_line(
    transport: &mut dyn Transport,
    config: &TransactionConfig,
) -> Result<Vec<u8>> {
    let mut line = Vec::new();
    let mut byte = [0u8; 1];
    let mut timeouts = 0;

    while line.len() < config.line_capacity {
        match transport.receive(&mut byte, config.timeout).await {
            Ok(0) => return Err(Error::ConnectionLost),
            Ok(_) => {
                line.push(byte[0]);
                if byte[0] == SENTINEL {
                    return Ok(line);
                }
            }
            Err(Error::Timeout) if line.is_empty() => return Err(Error::Timeout),
            Err(Error::Timeout) => {
                if timeouts >= config.max_retries {
                    break;
                }
                timeouts += 1;
            }
            Err(e) => return Err(e),
        }
    }

    if line.is_empty() {
        return Err(Error::Timeout);
    }
    debug!(bytes = line.len(), "line ended without sentinel");
    Ok(line)
}
