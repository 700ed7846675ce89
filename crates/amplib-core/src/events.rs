//! Asynchronous amplifier event types.
//!
//! Events are emitted by amplifier drivers through a [`tokio::sync::broadcast`]
//! channel when something noteworthy happens. Station automation can react to
//! faults and power transitions without polling.

use crate::types::PowerState;

/// An event emitted by an amplifier driver.
///
/// Subscribe via [`crate::amp::Amplifier::subscribe()`]. Events are delivered
/// on a best-effort basis through a bounded broadcast channel.
#[derive(Debug, Clone, PartialEq)]
pub enum AmpEvent {
    /// The remote control session was opened.
    Connected,

    /// The remote control session was closed.
    Disconnected,

    /// The power state read back or commanded differs from the last one seen.
    PowerStateChanged {
        /// The new power state.
        state: PowerState,
    },

    /// A fault query returned a fault code.
    ///
    /// Emitted for every fault reading, including "no fault", so that
    /// listeners see the condition clear.
    FaultReported {
        /// Raw one-byte fault code.
        code: u8,
        /// Human-readable description.
        message: String,
    },
}
