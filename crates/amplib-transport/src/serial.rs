//! Serial transport for Expert amplifiers.
//!
//! The amplifier's remote port (RS-232 or its USB virtual COM port) runs at
//! 9600 to 115200 baud with a fixed 8N1 line and no handshaking, so the
//! only setting callers choose is the baud rate. [`SerialTransport`] opens
//! the port that way and implements [`Transport`] over it.
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
//! // Status query frame.
//! transport.send(&[0x55, 0x55, 0x55, 0x01, 0x90, 0x90]).await?;
//!
//! let mut buf = [0u8; 64];
//! let n = transport.receive(&mut buf, Duration::from_secs(2)).await?;
//! # Ok(())
//! # }
//! ```

use amplib_core::error::{Error, Result};
use amplib_core::transport::Transport;
use async_trait::async_trait;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio_serial::{
    ClearBuffer, DataBits, FlowControl, Parity, SerialPort, SerialPortBuilderExt, SerialStream,
    StopBits,
};

/// Settings for opening an amplifier's serial port.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SerialConfig {
    /// Line speed, 9600 through 115200.
    pub baud_rate: u32,
    /// Drop anything the amplifier sent before the port was opened.
    pub clear_on_open: bool,
}

impl Default for SerialConfig {
    fn default() -> Self {
        SerialConfig {
            baud_rate: 115_200,
            clear_on_open: true,
        }
    }
}

/// An open serial link to an amplifier.
pub struct SerialTransport {
    port: Option<SerialStream>,
    port_name: String,
}

impl SerialTransport {
    /// Open `port` at `baud_rate` with the default settings.
    pub async fn open(port: &str, baud_rate: u32) -> Result<Self> {
        let config = SerialConfig {
            baud_rate,
            ..Default::default()
        };
        Self::open_with_config(port, config).await
    }

    /// Open `port` with explicit settings.
    pub async fn open_with_config(port: &str, config: SerialConfig) -> Result<Self> {
        tracing::debug!(port, baud_rate = config.baud_rate, "opening amplifier port");

        let stream = tokio_serial::new(port, config.baud_rate)
            .data_bits(DataBits::Eight)
            .stop_bits(StopBits::One)
            .parity(Parity::None)
            .flow_control(FlowControl::None)
            .open_native_async()
            .map_err(|e| {
                tracing::error!(port, error = %e, "cannot open amplifier port");
                Error::Transport(format!("cannot open {port}: {e}"))
            })?;

        if config.clear_on_open {
            stream.clear(ClearBuffer::All).map_err(|e| {
                Error::Transport(format!("cannot clear buffers on {port}: {e}"))
            })?;
        }

        tracing::info!(port, baud_rate = config.baud_rate, "amplifier port open");
        Ok(SerialTransport {
            port: Some(stream),
            port_name: port.to_string(),
        })
    }

    /// The path the port was opened with.
    pub fn port_name(&self) -> &str {
        &self.port_name
    }
}

/// A broken pipe or vanished device is a lost connection; anything else
/// stays an I/O error.
fn classify_io_error(e: std::io::Error) -> Error {
    match e.kind() {
        std::io::ErrorKind::BrokenPipe | std::io::ErrorKind::NotConnected => {
            Error::ConnectionLost
        }
        _ => Error::Io(e),
    }
}

#[async_trait]
impl Transport for SerialTransport {
    async fn send(&mut self, data: &[u8]) -> Result<()> {
        let port = self.port.as_mut().ok_or(Error::NotConnected)?;
        tracing::trace!(port = %self.port_name, data = ?data, "tx");

        port.write_all(data).await.map_err(|e| {
            tracing::error!(port = %self.port_name, error = %e, "write failed");
            classify_io_error(e)
        })?;
        // Commands are short; push each one out before waiting on the reply.
        port.flush().await.map_err(classify_io_error)
    }

    async fn receive(&mut self, buf: &mut [u8], timeout: Duration) -> Result<usize> {
        let port = self.port.as_mut().ok_or(Error::NotConnected)?;

        match tokio::time::timeout(timeout, port.read(buf)).await {
            Ok(Ok(n)) => {
                tracing::trace!(port = %self.port_name, data = ?&buf[..n], "rx");
                Ok(n)
            }
            Ok(Err(e)) => {
                tracing::error!(port = %self.port_name, error = %e, "read failed");
                Err(classify_io_error(e))
            }
            Err(_) => Err(Error::Timeout),
        }
    }

    async fn discard_input(&mut self) -> Result<()> {
        let port = self.port.as_mut().ok_or(Error::NotConnected)?;
        port.clear(ClearBuffer::Input).map_err(|e| {
            Error::Transport(format!("cannot clear input on {}: {e}", self.port_name))
        })
    }

    async fn close(&mut self) -> Result<()> {
        if let Some(mut port) = self.port.take() {
            if let Err(e) = port.flush().await {
                tracing::warn!(port = %self.port_name, error = %e, "flush on close failed");
            }
            tracing::info!(port = %self.port_name, "amplifier port closed");
        }
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.port.is_some()
    }
}
