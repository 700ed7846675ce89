//! Mock transport for deterministic testing of protocol engines.
//!
//! [`MockTransport`] implements the [`Transport`] trait with pre-loaded
//! request/response pairs. This lets you test frame encoding, sentinel
//! polling, and reply parsing without a real amplifier.
//!
//! # Example
//!
//! ```
//! use amplib_test_harness::MockTransport;
//!
//! let mut mock = MockTransport::new();
//! // When the engine sends the "open session" frame, answer with a bare header.
//! mock.expect(&[0x55, 0x55, 0x55, 0x01, 0x80, 0x80],
//!             &[0x55, 0x55, 0x55, 0x03]);
//! ```

use async_trait::async_trait;
use std::collections::VecDeque;
use std::time::Duration;

use amplib_core::error::{Error, Result};
use amplib_core::transport::Transport;

/// A pre-loaded request/response pair for the mock transport.
#[derive(Debug, Clone)]
struct Expectation {
    /// The exact bytes we expect to be sent.
    request: Vec<u8>,
    /// The bytes to return when the matching request is received.
    response: Vec<u8>,
}

/// A mock [`Transport`] for testing protocol engines without hardware.
///
/// Expectations are consumed in order. When `send()` is called, the sent
/// data is recorded and matched against the next expectation. The
/// corresponding response is then handed out by subsequent `receive()`
/// calls, as many bytes at a time as the caller's buffer holds. Once the
/// response is used up, `receive()` times out.
///
/// [`discard_input()`](Transport::discard_input) drops whatever is left of
/// the pending response, like flushing a real port's input buffer.
#[derive(Debug)]
pub struct MockTransport {
    /// Ordered queue of expected request/response pairs.
    expectations: VecDeque<Expectation>,
    /// The response data pending for the next `receive()` call.
    pending_response: Option<Vec<u8>>,
    /// Cursor into the pending response (how many bytes have been read so far).
    response_cursor: usize,
    /// Whether the transport is "connected".
    connected: bool,
    /// Log of all bytes sent through this transport.
    sent_log: Vec<Vec<u8>>,
    /// Number of `discard_input()` calls.
    discard_count: usize,
    /// Number of `receive()` calls.
    receive_count: usize,
    /// When set, the next `send()` fails with this I/O error kind.
    fail_next_send: Option<std::io::ErrorKind>,
    /// When set, the `receive()` call after this many more fails with the
    /// given I/O error kind.
    fail_receive: Option<(usize, std::io::ErrorKind)>,
}

impl MockTransport {
    /// Create a new mock transport in the connected state.
    pub fn new() -> Self {
        MockTransport {
            expectations: VecDeque::new(),
            pending_response: None,
            response_cursor: 0,
            connected: true,
            sent_log: Vec::new(),
            discard_count: 0,
            receive_count: 0,
            fail_next_send: None,
            fail_receive: None,
        }
    }

    /// Add an expected request/response pair.
    ///
    /// When `send()` is called with data matching `request`, the subsequent
    /// `receive()` calls will return `response`. Pass an empty `response`
    /// for writes the device does not answer.
    pub fn expect(&mut self, request: &[u8], response: &[u8]) {
        self.expectations.push_back(Expectation {
            request: request.to_vec(),
            response: response.to_vec(),
        });
    }

    /// Return a reference to all data that has been sent through this transport.
    ///
    /// Each element is the byte slice from one `send()` call.
    pub fn sent_data(&self) -> &[Vec<u8>] {
        &self.sent_log
    }

    /// Return the number of expectations that have not yet been consumed.
    pub fn remaining_expectations(&self) -> usize {
        self.expectations.len()
    }

    /// Return how many times the input buffer was discarded.
    pub fn discard_count(&self) -> usize {
        self.discard_count
    }

    /// Return how many times `receive()` was called, timeouts included.
    pub fn receive_count(&self) -> usize {
        self.receive_count
    }

    /// Make the next `send()` fail with an I/O error of the given kind.
    pub fn fail_next_send(&mut self, kind: std::io::ErrorKind) {
        self.fail_next_send = Some(kind);
    }

    /// Make the next `receive()` fail with an I/O error of the given kind.
    ///
    /// The pending response is left in place.
    pub fn fail_next_receive(&mut self, kind: std::io::ErrorKind) {
        self.fail_receive_after(0, kind);
    }

    /// Let `reads` more `receive()` calls through, then fail the one after
    /// with an I/O error of the given kind.
    pub fn fail_receive_after(&mut self, reads: usize, kind: std::io::ErrorKind) {
        self.fail_receive = Some((reads, kind));
    }

    /// Set the connected state of the mock transport.
    ///
    /// When set to `false`, subsequent `send()` and `receive()` calls will
    /// return [`Error::NotConnected`].
    pub fn set_connected(&mut self, connected: bool) {
        self.connected = connected;
    }
}

impl Default for MockTransport {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn send(&mut self, data: &[u8]) -> Result<()> {
        if !self.connected {
            return Err(Error::NotConnected);
        }

        if let Some(kind) = self.fail_next_send.take() {
            return Err(Error::Io(std::io::Error::new(kind, "mock send failure")));
        }

        self.sent_log.push(data.to_vec());

        if let Some(expectation) = self.expectations.pop_front() {
            if data != expectation.request.as_slice() {
                return Err(Error::Protocol(format!(
                    "unexpected send data: expected {:02X?}, got {:02X?}",
                    expectation.request, data
                )));
            }
            self.pending_response = Some(expectation.response);
            self.response_cursor = 0;
            Ok(())
        } else {
            Err(Error::Protocol(
                "no more expectations in mock transport".into(),
            ))
        }
    }

    async fn receive(&mut self, buf: &mut [u8], _timeout: Duration) -> Result<usize> {
        if !self.connected {
            return Err(Error::NotConnected);
        }
        self.receive_count += 1;

        if let Some((reads, kind)) = self.fail_receive {
            if reads == 0 {
                self.fail_receive = None;
                return Err(Error::Io(std::io::Error::new(kind, "mock receive failure")));
            }
            self.fail_receive = Some((reads - 1, kind));
        }

        if let Some(ref response) = self.pending_response {
            let remaining = &response[self.response_cursor..];
            if remaining.is_empty() {
                self.pending_response = None;
                self.response_cursor = 0;
                return Err(Error::Timeout);
            }
            let n = remaining.len().min(buf.len());
            buf[..n].copy_from_slice(&remaining[..n]);
            self.response_cursor += n;
            if self.response_cursor >= response.len() {
                self.pending_response = None;
                self.response_cursor = 0;
            }
            Ok(n)
        } else {
            Err(Error::Timeout)
        }
    }

    async fn discard_input(&mut self) -> Result<()> {
        if !self.connected {
            return Err(Error::NotConnected);
        }
        self.discard_count += 1;
        self.pending_response = None;
        self.response_cursor = 0;
        Ok(())
    }

    async fn close(&mut self) -> Result<()> {
        self.connected = false;
        self.pending_response = None;
        self.response_cursor = 0;
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.connected
    }
}
