//! Transport trait for amplifier communication.
//!
//! The [`Transport`] trait abstracts over the physical link to an amplifier.
//! Implementations exist for serial ports and for the scripted mock used in
//! tests.
//!
//! Protocol engines (e.g. the Expert transaction engine in `amplib-expert`)
//! operate on a `Transport` rather than directly on a serial port, enabling
//! both real hardware control and deterministic unit testing with
//! `MockTransport` from the `amplib-test-harness` crate.

use async_trait::async_trait;
use std::time::Duration;

use crate::error::Result;

/// Asynchronous byte-level transport to an amplifier.
///
/// Implementations handle buffering and error recovery at the physical
/// layer. Framing, checksums and reply parsing are handled by the protocol
/// engines that consume this trait.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Send raw bytes to the amplifier.
    ///
    /// Implementations should block until all bytes have been written to
    /// the underlying transport.
    async fn send(&mut self, data: &[u8]) -> Result<()>;

    /// Receive bytes from the amplifier into the provided buffer.
    ///
    /// Returns the number of bytes actually read. Will wait up to `timeout`
    /// for data to arrive; returns [`Error::Timeout`](crate::error::Error::Timeout)
    /// if no data is received within the deadline.
    async fn receive(&mut self, buf: &mut [u8], timeout: Duration) -> Result<usize>;

    /// Drop any inbound bytes that have been received but not yet read.
    ///
    /// Called before each transaction so a reply left over from an earlier
    /// failed exchange cannot be mistaken for the next one.
    async fn discard_input(&mut self) -> Result<()>;

    /// Close the transport connection.
    ///
    /// After calling `close()`, subsequent `send()` and `receive()` calls
    /// should return [`Error::NotConnected`](crate::error::Error::NotConnected).
    async fn close(&mut self) -> Result<()>;

    /// Check whether the transport is currently connected.
    fn is_connected(&self) -> bool;
}
