//! Expert linear amplifier backend for amplib.
//!
//! This crate implements the serial protocol used by the Expert 1.3K-FA,
//! 1.5K-FA and 2K-FA amplifiers. It provides:
//!
//! - **Protocol codec** ([`protocol`]) -- encode and decode the binary
//!   command frame (`0x55 0x55 0x55 <len> <payload> <checksum>`) and the
//!   `;`-terminated ASCII lines.
//! - **Transaction engine** ([`transaction`]) -- flush, send, and collect a
//!   framed reply or poll for ASCII lines, with per-read timeouts.
//! - **Command builders** ([`commands`]) -- command payloads and parsers for
//!   the `^AE`, `^FR`, `^SW`, `^DF` and antenna record replies.
//! - **Fault table** ([`faults`]) -- fault code descriptions.
//! - **Model definitions** ([`models`]) -- capability data and opcode tables.
//! - **Amplifier driver** ([`amp`]) -- full [`Amplifier`](amplib_core::Amplifier)
//!   implementation with the multi-step level queries and event emission.
//! - **Builder** ([`builder`]) -- fluent builder API for constructing
//!   [`ExpertAmp`] instances.
//!
//! # Example
//!
//! ```
//! use amplib_expert::protocol::encode_frame;
//! use amplib_expert::commands::parse_frequency;
//! use amplib_expert::faults::lookup_fault;
//!
//! // The "open session" command frame.
//! let frame = encode_frame(&[0x80]).unwrap();
//! assert_eq!(frame, [0x55, 0x55, 0x55, 0x01, 0x80, 0x80]);
//!
//! // A status reply, sentinel already stripped.
//! assert_eq!(parse_frequency("^FR14074").unwrap(), 14_074_000);
//!
//! assert_eq!(lookup_fault(0x92), "ATU no match");
//! ```

pub mod amp;
pub mod builder;
pub mod commands;
pub mod faults;
pub mod models;
pub mod protocol;
pub mod transaction;

// Re-export the primary types for ergonomic `use amplib_expert::*`.
pub use amp::ExpertAmp;
pub use builder::ExpertBuilder;
pub use models::{ExpertModel, OpcodeTable};
