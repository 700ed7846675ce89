//! ExpertBuilder -- fluent builder for constructing [`ExpertAmp`] instances.
//!
//! Separates configuration from construction so that callers can set up
//! serial port parameters, timeouts, retry budgets and opcode assignments
//! before the transport is opened.
//!
//! # Example
//!
//! ```no_run
//! use amplib_core::AmpLevel;
//! use amplib_expert::builder::ExpertBuilder;
//! use amplib_expert::models::expert_15k_fa;
//! use std::time::Duration;
//!
//! # async fn example() -> amplib_core::Result<()> {
//! let amp = ExpertBuilder::new(expert_15k_fa())
//!     .serial_port("/dev/ttyUSB0")
//!     .baud_rate(115_200)
//!     .command_timeout(Duration::from_millis(1500))
//!     .antenna_query_opcode(0x92)
//!     .level_opcode(AmpLevel::Fault, 0x93)
//!     .build()
//!     .await?;
//! # Ok(())
//! # }
//! ```

use std::time::Duration;

use amplib_core::AmpLevel;
use amplib_core::error::{Error, Result};
use amplib_core::transport::Transport;

use crate::amp::ExpertAmp;
use crate::models::ExpertModel;
use crate::transaction::TransactionConfig;

/// Fluent builder for [`ExpertAmp`].
///
/// Defaults come from the [`ExpertModel`] and the amplifier's serial
/// settings (2 s timeout, 2 retries, 3 sentinel polls).
pub struct ExpertBuilder {
    model: ExpertModel,
    serial_port: Option<String>,
    baud_rate: Option<u32>,
    config: TransactionConfig,
}

impl ExpertBuilder {
    /// Create a new builder for the given Expert model.
    pub fn new(model: ExpertModel) -> Self {
        let config = TransactionConfig {
            timeout: Duration::from_millis(model.capabilities.timeout_ms),
            max_retries: model.capabilities.retry,
            ..Default::default()
        };
        ExpertBuilder {
            model,
            serial_port: None,
            baud_rate: None,
            config,
        }
    }

    /// Set the serial port path (e.g. `/dev/ttyUSB0` or `COM3`).
    pub fn serial_port(mut self, port: &str) -> Self {
        self.serial_port = Some(port.to_string());
        self
    }

    /// Override the default baud rate for this model (9600 to 115200).
    pub fn baud_rate(mut self, baud: u32) -> Self {
        self.baud_rate = Some(baud);
        self
    }

    /// Set the timeout for each read from the amplifier (default: 2s).
    pub fn command_timeout(mut self, timeout: Duration) -> Self {
        self.config.timeout = timeout;
        self
    }

    /// Set how many extra read timeouts are tolerated while a reply is
    /// still incomplete (default: 2).
    pub fn max_retries(mut self, n: u32) -> Self {
        self.config.max_retries = n;
        self
    }

    /// Set how many times to poll with `;` for an acknowledgment (default: 3).
    pub fn poll_attempts(mut self, n: u32) -> Self {
        self.config.poll_attempts = n;
        self
    }

    /// Set the longest reply line accepted, in bytes (default: 128).
    pub fn line_capacity(mut self, bytes: usize) -> Self {
        self.config.line_capacity = bytes;
        self
    }

    /// Reject framed replies whose trailing checksum does not match
    /// (default: off).
    pub fn verify_checksum(mut self, enabled: bool) -> Self {
        self.config.verify_checksum = enabled;
        self
    }

    /// Assign the query opcode for a telemetry level.
    pub fn level_opcode(mut self, level: AmpLevel, opcode: u8) -> Self {
        self.model.opcodes.levels.insert(level, opcode);
        self
    }

    /// Assign the selected-antenna query opcode.
    pub fn antenna_query_opcode(mut self, opcode: u8) -> Self {
        self.model.opcodes.antenna_query = Some(opcode);
        self
    }

    /// Assign the power-on (`^ON`) and operate (`^OP`) query opcodes.
    pub fn power_query_opcodes(mut self, on: u8, operate: u8) -> Self {
        self.model.opcodes.power_query = Some((on, operate));
        self
    }

    fn validate(&self) -> Result<()> {
        if let Some(baud) = self.baud_rate {
            let caps = &self.model.capabilities;
            if !caps.supports_baud_rate(baud) {
                return Err(Error::InvalidParameter(format!(
                    "baud rate {baud} outside supported range {}..={}",
                    caps.serial_rate_min, caps.serial_rate_max
                )));
            }
        }
        if self.config.poll_attempts == 0 {
            return Err(Error::InvalidParameter(
                "poll_attempts must be at least 1".into(),
            ));
        }
        if self.config.line_capacity == 0 {
            return Err(Error::InvalidParameter(
                "line_capacity must be at least 1".into(),
            ));
        }
        Ok(())
    }

    /// Build an [`ExpertAmp`] with a caller-provided transport.
    ///
    /// This is the primary entry point for testing (pass a
    /// `MockTransport` from `amplib-test-harness`) and for callers that
    /// manage the link themselves.
    pub async fn build_with_transport(self, transport: Box<dyn Transport>) -> Result<ExpertAmp> {
        self.validate()?;
        Ok(ExpertAmp::new(transport, self.model, self.config))
    }

    /// Build an [`ExpertAmp`] using a serial transport.
    ///
    /// Requires that [`serial_port()`](Self::serial_port) has been called.
    /// The baud rate defaults to the model's default if not overridden.
    pub async fn build(self) -> Result<ExpertAmp> {
        self.validate()?;
        let port = self
            .serial_port
            .as_ref()
            .ok_or_else(|| Error::InvalidParameter("serial_port is required for build()".into()))?;
        let baud = self.baud_rate.unwrap_or(self.model.default_baud_rate);

        let transport = amplib_transport::SerialTransport::open(port, baud).await?;
        self.build_with_transport(Box::new(transport)).await
    }
}
