//! amplib-core: Core traits, types, and error definitions for amplib.
//!
//! This crate defines the manufacturer-agnostic abstractions that all amplib
//! backends implement. Applications depend on these types without pulling in
//! any specific amplifier driver.
//!
//! # Key types
//!
//! - [`Amplifier`] -- the unified trait for controlling any amplifier
//! - [`Transport`] -- byte-level communication channel
//! - [`AmpEvent`] -- asynchronous notifications
//! - [`Error`] / [`Result`] -- error handling

pub mod amp;
pub mod error;
pub mod events;
pub mod transport;
pub mod types;

// Re-export key types at crate root for ergonomic `use amplib_core::*`.
pub use amp::Amplifier;
pub use error::{Error, Result};
pub use events::AmpEvent;
pub use transport::Transport;
pub use types::*;
