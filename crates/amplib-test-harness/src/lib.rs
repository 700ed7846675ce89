//! amplib-test-harness: Test utilities and mock transports for amplib.
//!
//! This crate provides [`MockTransport`] for deterministic unit testing of
//! protocol engines without requiring a real amplifier.

pub mod mock_serial;

pub use mock_serial::MockTransport;
