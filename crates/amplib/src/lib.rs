//! # amplib -- Linear Amplifier Control for Amateur Radio
//!
//! `amplib` is an asynchronous Rust library for controlling amateur radio
//! linear amplifiers over a serial link. It is meant for station automation
//! and logging software that needs to read amplifier telemetry (power,
//! SWR, tuner settings, faults) and switch it between standby and operate.
//!
//! ## Quick Start
//!
//! ```no_run
//! use amplib::{AmpLevel, Amplifier};
//! use amplib::expert::{ExpertBuilder, models::expert_15k_fa};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let amp = ExpertBuilder::new(expert_15k_fa())
//!         .serial_port("/dev/ttyUSB0")
//!         .build()
//!         .await?;
//!
//!     amp.open().await?;
//!     let freq = amp.get_frequency().await?;
//!     println!("Amplifier tuned to {} Hz", freq);
//!     amp.close().await?;
//!     Ok(())
//! }
//! ```
//!
//! ## Architecture
//!
//! | Crate                  | Purpose                                          |
//! |------------------------|--------------------------------------------------|
//! | `amplib-core`          | Traits ([`Amplifier`], [`Transport`]), types, errors |
//! | `amplib-transport`     | Serial transport over `tokio-serial`             |
//! | `amplib-expert`        | Expert 1.3K-FA / 1.5K-FA / 2K-FA driver          |
//! | **`amplib`**           | This facade crate -- re-exports everything       |
//!
//! Backends implement the [`Amplifier`] trait, so application code can work
//! with `dyn Amplifier` and remain manufacturer-agnostic.
//!
//! ## Feature Flags
//!
//! | Feature  | Enables                             | Default |
//! |----------|-------------------------------------|---------|
//! | `expert` | [`expert`] module (Expert protocol) | yes     |
//! | `full`   | All backends                        | no      |
//!
//! ## Event Subscription
//!
//! Drivers emit [`AmpEvent`]s through a broadcast channel:
//!
//! ```no_run
//! use amplib::{AmpEvent, Amplifier};
//! # async fn example(amp: &dyn Amplifier) -> amplib::Result<()> {
//! let mut events = amp.subscribe()?;
//! while let Ok(event) = events.recv().await {
//!     if let AmpEvent::FaultReported { code, message } = event {
//!         eprintln!("fault 0x{code:02X}: {message}");
//!     }
//! }
//! # Ok(())
//! # }
//! ```

pub use amplib_core::*;

/// Expert amplifier backend.
///
/// Provides [`ExpertAmp`](expert::ExpertAmp) and
/// [`ExpertBuilder`](expert::ExpertBuilder) for the 1.3K-FA, 1.5K-FA and
/// 2K-FA, which share a binary-framed serial protocol with ASCII replies.
#[cfg(feature = "expert")]
pub mod expert {
    pub use amplib_expert::*;
}

/// Returns a flat list of all supported amplifier models across all
/// enabled backends.
///
/// # Example
///
/// ```
/// let amps = amplib::supported_amplifiers();
/// for amp in &amps {
///     println!("{} {} ({} baud)", amp.manufacturer, amp.model_name, amp.default_baud_rate);
/// }
/// ```
pub fn supported_amplifiers() -> Vec<AmpDefinition> {
    let mut amps = Vec::new();

    #[cfg(feature = "expert")]
    {
        amps.extend(
            expert::models::all_expert_models()
                .iter()
                .map(AmpDefinition::from),
        );
    }

    amps
}
