//! Error types for amplib.
//!
//! All fallible operations across the library return [`Result<T>`], which
//! uses [`Error`] as the error type. Transport-layer, protocol-layer, and
//! application-layer errors are all captured here.

/// The error type for all amplib operations.
///
/// Variants cover the failure modes encountered when talking to an
/// amplifier: bad arguments from the caller, physical transport failures,
/// and replies that do not match what the protocol expects.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A transport-level error (serial port open/read/write).
    #[error("transport error: {0}")]
    Transport(String),

    /// A protocol-level error (bad sync bytes, short frame, echo mismatch).
    #[error("protocol error: {0}")]
    Protocol(String),

    /// A reply arrived but did not match the expected pattern.
    ///
    /// The raw reply text is kept so callers can log or display it.
    #[error("protocol error: {context}: unexpected reply {reply:?}")]
    UnexpectedReply {
        /// What was being asked for (e.g. "antenna query").
        context: String,
        /// The reply as received, with the sentinel stripped.
        reply: String,
    },

    /// The trailing checksum of a received frame did not match its payload.
    ///
    /// Only produced when receive-side checksum verification is enabled.
    #[error("protocol error: checksum mismatch (expected 0x{expected:02X}, got 0x{actual:02X})")]
    ChecksumMismatch {
        /// Checksum computed over the received payload.
        expected: u8,
        /// Checksum byte carried by the frame.
        actual: u8,
    },

    /// Timed out waiting for a response from the amplifier.
    ///
    /// This typically indicates the amplifier is powered off or the baud
    /// rate is wrong.
    #[error("timeout waiting for response")]
    Timeout,

    /// The requested operation is not supported by this amplifier model.
    #[error("unsupported operation: {0}")]
    Unsupported(String),

    /// An invalid parameter was passed to an amplifier command.
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),

    /// No connection to the amplifier has been established.
    #[error("not connected")]
    NotConnected,

    /// The connection to the amplifier was lost unexpectedly.
    #[error("connection lost")]
    ConnectionLost,

    /// An underlying I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Build an [`Error::UnexpectedReply`] from a context label and the raw reply.
    pub fn unexpected_reply(context: impl Into<String>, reply: impl Into<String>) -> Self {
        Error::UnexpectedReply {
            context: context.into(),
            reply: reply.into(),
        }
    }

    /// Returns `true` if the error means the link itself failed, as opposed
    /// to the amplifier answering with something unexpected (or not at all).
    pub fn is_transport(&self) -> bool {
        matches!(
            self,
            Error::Transport(_) | Error::Io(_) | Error::NotConnected | Error::ConnectionLost
        )
    }

    /// Returns `true` for any protocol-level error, including the typed
    /// reply and checksum variants.
    pub fn is_protocol(&self) -> bool {
        matches!(
            self,
            Error::Protocol(_) | Error::UnexpectedReply { .. } | Error::ChecksumMismatch { .. }
        )
    }
}

/// A convenience `Result` alias using [`Error`] as the error type.
pub type Result<T> = std::result::Result<T, Error>;
