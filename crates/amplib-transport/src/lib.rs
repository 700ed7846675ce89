//! Transport implementations for amplib.
//!
//! This crate provides a concrete implementation of the
//! [`Transport`](amplib_core::Transport) trait for serial links:
//!
//! - [`SerialTransport`]: USB virtual COM ports and RS-232 serial connections
//!
//! # Example
//!
//! ```no_run
//! use amplib_transport::SerialTransport;
//! use amplib_core::transport::Transport;
//! use std::time::Duration;
//!
//! # async fn example() -> amplib_core::Result<()> {
//! let mut transport = SerialTransport::open("/dev/ttyUSB0", 115_200).await?;
//!
//! // "Open session" command frame
//! transport.send(&[0x55, 0x55, 0x55, 0x01, 0x80, 0x80]).await?;
//!
//! let mut buf = [0u8; 64];
//! let n = transport.receive(&mut buf, Duration::from_secs(2)).await?;
//! # Ok(())
//! # }
//! ```

pub mod serial;

pub use serial::{SerialConfig, SerialTransport};
