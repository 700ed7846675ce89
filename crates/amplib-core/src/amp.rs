//! The `Amplifier` trait -- unified interface for all amplifier backends.
//!
//! Station automation and logging tools program against `dyn Amplifier`
//! without needing to know which manufacturer's protocol is in use. Each
//! backend (e.g. `amplib-expert`) provides a concrete type implementing
//! this trait, chosen when the amplifier is built.

use async_trait::async_trait;
use tokio::sync::broadcast;

use crate::error::{Error, Result};
use crate::events::AmpEvent;
use crate::types::*;

/// Unified asynchronous interface for controlling a linear amplifier.
///
/// Methods that talk to the amplifier are `async`; methods that return
/// cached state ([`info()`](Amplifier::info),
/// [`capabilities()`](Amplifier::capabilities)) are synchronous.
///
/// Operations a backend cannot perform return
/// [`Error::Unsupported`] through the default implementations below.
#[async_trait]
pub trait Amplifier: Send + Sync {
    /// Return static information about the amplifier (manufacturer, model).
    fn info(&self) -> &AmpInfo;

    /// Return the capabilities of the amplifier.
    fn capabilities(&self) -> &AmpCapabilities;

    /// Bring the remote control session up.
    async fn open(&self) -> Result<()>;

    /// Tear the remote control session down and release the link.
    async fn close(&self) -> Result<()>;

    /// Read a telemetry level.
    async fn get_level(&self, level: AmpLevel) -> Result<LevelValue>;

    /// Get the operating frequency in hertz.
    async fn get_frequency(&self) -> Result<u64> {
        Err(Error::Unsupported("frequency readout not supported".into()))
    }

    /// Tell the amplifier the operating frequency in hertz.
    async fn set_frequency(&self, _freq_hz: u64) -> Result<()> {
        Err(Error::Unsupported("frequency control not supported".into()))
    }

    /// Get the current power state.
    async fn get_power_state(&self) -> Result<PowerState> {
        Err(Error::Unsupported("power state readout not supported".into()))
    }

    /// Change the power state.
    async fn set_power_state(&self, _state: PowerState) -> Result<()> {
        Err(Error::Unsupported("power state control not supported".into()))
    }

    /// Reset the amplifier.
    async fn reset(&self, _kind: ResetKind) -> Result<()> {
        Err(Error::Unsupported("reset not supported".into()))
    }

    /// Subscribe to amplifier events.
    ///
    /// Returns a broadcast receiver. The channel is bounded; if the consumer
    /// falls behind, older events will be dropped (lagged).
    fn subscribe(&self) -> Result<broadcast::Receiver<AmpEvent>>;
}
