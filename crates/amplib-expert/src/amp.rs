//! ExpertAmp -- the [`Amplifier`] trait implementation for Expert amplifiers.
//!
//! This module ties the transaction engine ([`transaction`]) and the reply
//! parsers ([`commands`]) to a [`Transport`]. Level queries are two-step:
//! first the selected antenna is read, then the level itself. Tuner values
//! (NH, PF) additionally scan the antenna record listing that follows the
//! level reply for the selected antenna's entry.
//!
//! The transport is held for the whole of a multi-step query so that no
//! other call can interleave its own exchange.

use std::collections::VecDeque;

use async_trait::async_trait;
use tokio::sync::{Mutex, broadcast};
use tracing::{debug, trace, warn};

use amplib_core::amp::Amplifier;
use amplib_core::error::{Error, Result};
use amplib_core::events::AmpEvent;
use amplib_core::transport::Transport;
use amplib_core::types::*;

use crate::commands::{self, AntennaRecord};
use crate::faults;
use crate::models::{ExpertModel, OpcodeTable};
use crate::protocol;
use crate::transaction::{self, LineReply, ReplyMode, TransactionConfig};

/// Upper bound on antenna record lines read while scanning for one antenna.
const MAX_RECORD_LINES: usize = 16;

/// A connected Expert amplifier.
///
/// Constructed via [`ExpertBuilder`](crate::builder::ExpertBuilder). All
/// amplifier communication goes through the [`Transport`] provided at
/// build time.
pub struct ExpertAmp {
    transport: Mutex<Box<dyn Transport>>,
    model: ExpertModel,
    config: TransactionConfig,
    event_tx: broadcast::Sender<AmpEvent>,
    /// Last power state read back or commanded.
    last_power_state: Mutex<Option<PowerState>>,
    info: AmpInfo,
    capabilities: AmpCapabilities,
}

impl ExpertAmp {
    /// Create a new `ExpertAmp` from its constituent parts.
    ///
    /// This is called by [`ExpertBuilder`](crate::builder::ExpertBuilder);
    /// callers should use the builder API instead.
    pub(crate) fn new(
        transport: Box<dyn Transport>,
        model: ExpertModel,
        config: TransactionConfig,
    ) -> Self {
        let (event_tx, _) = broadcast::channel(64);
        let info = AmpInfo {
            manufacturer: Manufacturer::Expert,
            model_name: model.name.to_string(),
            model_id: model.model_id.to_string(),
        };

        // Only advertise levels whose queries have opcodes.
        let mut capabilities = model.capabilities.clone();
        let ops = &model.opcodes;
        capabilities
            .readable_levels
            .retain(|level| ops.antenna_query.is_some() && ops.level(*level).is_some());

        ExpertAmp {
            transport: Mutex::new(transport),
            model,
            config,
            event_tx,
            last_power_state: Mutex::new(None),
            info,
            capabilities,
        }
    }

    /// The transaction settings in use.
    pub fn config(&self) -> &TransactionConfig {
        &self.config
    }

    /// The opcode table in use.
    pub fn opcodes(&self) -> &OpcodeTable {
        &self.model.opcodes
    }

    fn emit(&self, event: AmpEvent) {
        // No subscribers is not an error.
        let _ = self.event_tx.send(event);
    }

    /// Record `state` and emit [`AmpEvent::PowerStateChanged`] if it differs
    /// from the last state seen.
    async fn note_power_state(&self, state: PowerState) {
        let mut last = self.last_power_state.lock().await;
        if *last != Some(state) {
            *last = Some(state);
            drop(last);
            self.emit(AmpEvent::PowerStateChanged { state });
        }
    }

    /// Find the selected antenna's record in the listing that follows a
    /// tuner level reply.
    ///
    /// Lines already collected with the reply are examined first; further
    /// lines are read straight from the transport without flushing.
    async fn scan_antenna_records(
        &self,
        transport: &mut dyn Transport,
        reply: &LineReply,
        antenna: i64,
    ) -> Result<AntennaRecord> {
        let (lo_khz, hi_khz) = commands::parse_tuner_range(reply.first())?;
        debug!(lo_khz, hi_khz, "tuner frequency range");

        let mut pending: VecDeque<String> = reply.lines.iter().skip(1).cloned().collect();
        for _ in 0..MAX_RECORD_LINES {
            let line = match pending.pop_front() {
                Some(line) => line,
                None => {
                    let raw = transaction::read_line(transport, &self.config).await?;
                    protocol::line_text(&raw)
                }
            };
            if !commands::is_antenna_record(&line) {
                trace!(line = %line, "end of antenna records");
                break;
            }
            let record = commands::parse_antenna_record(&line)?;
            trace!(?record, "antenna record");
            if record.antenna == antenna {
                return Ok(record);
            }
        }

        Err(Error::Protocol(format!(
            "no tuner record found for antenna {antenna}"
        )))
    }

    /// Interpret a level reply once the selected antenna is known.
    async fn decode_level(
        &self,
        transport: &mut dyn Transport,
        level: AmpLevel,
        antenna: i64,
        reply: &LineReply,
    ) -> Result<LevelValue> {
        match level {
            AmpLevel::Swr => commands::parse_swr(reply.first()).map(LevelValue::Float),
            AmpLevel::Nh | AmpLevel::Pf => {
                let record = self.scan_antenna_records(transport, reply, antenna).await?;
                record
                    .value_for(level)
                    .map(LevelValue::Int)
                    .ok_or_else(|| Error::InvalidParameter(format!("{level} is not a tuner level")))
            }
            AmpLevel::PwrInput
            | AmpLevel::PwrForward
            | AmpLevel::PwrReflected
            | AmpLevel::PwrPeak => {
                commands::parse_level_int(reply.first(), level).map(LevelValue::Int)
            }
            AmpLevel::Fault => {
                let code = commands::parse_fault_code(reply.first())?;
                let message = faults::lookup_fault(code).into_owned();
                if faults::known_fault(code).is_none() {
                    warn!(code, reply = reply.first(), "unknown fault code");
                }
                self.emit(AmpEvent::FaultReported {
                    code,
                    message: message.clone(),
                });
                Ok(LevelValue::Text(message))
            }
        }
    }

    /// Send a power-state command; the acknowledgment is best effort.
    async fn send_power_state(&self, state: PowerState) -> Result<()> {
        let cmd = commands::cmd_set_power_state(&self.model.opcodes, state);
        let mut transport = self.transport.lock().await;
        debug!(%state, opcode = cmd[0], "setting power state");
        transaction::transact_lines(&mut **transport, &self.config, Some(&cmd)).await?;
        Ok(())
    }
}

#[async_trait]
impl Amplifier for ExpertAmp {
    fn info(&self) -> &AmpInfo {
        &self.info
    }

    fn capabilities(&self) -> &AmpCapabilities {
        &self.capabilities
    }

    async fn open(&self) -> Result<()> {
        let cmd = commands::cmd_open(&self.model.opcodes);
        let mut transport = self.transport.lock().await;
        debug!("opening session");
        match transaction::transact(&mut **transport, &self.config, Some(&cmd), ReplyMode::Frame)
            .await
        {
            Ok(_) => debug!("open reply discarded"),
            Err(e) if e.is_transport() => return Err(e),
            Err(e) => warn!(error = %e, "ignoring open reply"),
        }
        drop(transport);
        self.emit(AmpEvent::Connected);
        Ok(())
    }

    async fn close(&self) -> Result<()> {
        let cmd = commands::cmd_close(&self.model.opcodes);
        let mut transport = self.transport.lock().await;
        debug!("closing session");
        let result = match transaction::transact(
            &mut **transport,
            &self.config,
            Some(&cmd),
            ReplyMode::Frame,
        )
        .await
        {
            Ok(_) => Ok(()),
            Err(e) if e.is_transport() => Err(e),
            Err(e) => {
                warn!(error = %e, "ignoring close reply");
                Ok(())
            }
        };
        let closed = transport.close().await;
        drop(transport);
        self.emit(AmpEvent::Disconnected);
        result.and(closed)
    }

    async fn get_level(&self, level: AmpLevel) -> Result<LevelValue> {
        let ops = &self.model.opcodes;
        let antenna_cmd = commands::cmd_read_antenna(ops)?;
        let level_cmd = commands::cmd_read_level(ops, level)?;

        let mut guard = self.transport.lock().await;
        let transport: &mut dyn Transport = &mut **guard;
        debug!(%level, "reading level");

        let reply =
            transaction::transact_lines(transport, &self.config, Some(&antenna_cmd)).await?;
        let antenna = commands::parse_antenna(reply.first())?;
        debug!(antenna, "selected antenna");

        let reply = transaction::transact_lines(transport, &self.config, Some(&level_cmd)).await?;
        let value = self.decode_level(transport, level, antenna, &reply).await?;
        debug!(%level, %value, "level read");
        Ok(value)
    }

    async fn get_frequency(&self) -> Result<u64> {
        let cmd = commands::cmd_read_frequency(&self.model.opcodes);
        let mut transport = self.transport.lock().await;
        debug!("reading frequency");
        let reply = transaction::transact_lines(&mut **transport, &self.config, Some(&cmd)).await?;
        commands::parse_frequency(reply.first())
    }

    async fn set_frequency(&self, freq_hz: u64) -> Result<()> {
        let cmd = commands::cmd_set_frequency(freq_hz)?;
        let mut transport = self.transport.lock().await;
        debug!(freq_hz, "setting frequency");
        let reply = transaction::transact_lines(&mut **transport, &self.config, Some(&cmd)).await?;
        let echoed = commands::parse_frequency(reply.first())?;
        if echoed != freq_hz {
            return Err(Error::Protocol(format!(
                "frequency not accepted: sent {freq_hz} Hz, amplifier reports {echoed} Hz"
            )));
        }
        Ok(())
    }

    async fn get_power_state(&self) -> Result<PowerState> {
        let (on_cmd, operate_cmd) = commands::cmd_read_power_state(&self.model.opcodes)?;
        let mut guard = self.transport.lock().await;
        let transport: &mut dyn Transport = &mut **guard;
        debug!("reading power state");

        let reply = transaction::transact_lines(transport, &self.config, Some(&on_cmd)).await?;
        let state = if !commands::parse_power_flag(reply.first(), "^ON")? {
            PowerState::Off
        } else {
            let reply =
                transaction::transact_lines(transport, &self.config, Some(&operate_cmd)).await?;
            if commands::parse_power_flag(reply.first(), "^OP")? {
                PowerState::Operate
            } else {
                PowerState::Standby
            }
        };
        drop(guard);
        debug!(%state, "power state");
        self.note_power_state(state).await;
        Ok(state)
    }

    async fn set_power_state(&self, state: PowerState) -> Result<()> {
        self.send_power_state(state).await?;
        self.note_power_state(state).await;
        Ok(())
    }

    async fn reset(&self, kind: ResetKind) -> Result<()> {
        // The amplifier resets when toggled from standby to operate.
        debug!(?kind, "resetting");
        if let Err(e) = self.set_power_state(PowerState::Standby).await {
            warn!(error = %e, "failed to switch to standby before reset");
        }
        self.set_power_state(PowerState::Operate).await
    }

    fn subscribe(&self) -> Result<broadcast::Receiver<AmpEvent>> {
        Ok(self.event_tx.subscribe())
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::builder::ExpertBuilder;
    use crate::models::expert_15k_fa;
    use amplib_test_harness::MockTransport;
    use tokio::sync::broadcast::error::TryRecvError;

    const ANTENNA_OP: u8 = 0x20;

    fn level_op(level: AmpLevel) -> u8 {
        0x40 + AmpLevel::ALL.iter().position(|l| *l == level).unwrap() as u8
    }

    /// Script one line-mode exchange: the framed command, then one reply
    /// per sentinel poll.
    fn script(mock: &mut MockTransport, payload: &[u8], polls: &[&[u8]]) {
        mock.expect(&protocol::encode_frame(payload).unwrap(), &[]);
        for reply in polls {
            mock.expect(b";", reply);
        }
    }

    /// Script the antenna query answering with `antenna`.
    fn script_antenna(mock: &mut MockTransport, antenna: u32) {
        let reply = format!("^AE{antenna};");
        script(mock, &[ANTENNA_OP], &[reply.as_bytes(), b";"]);
    }

    async fn build(mock: MockTransport) -> ExpertAmp {
        let mut builder = ExpertBuilder::new(expert_15k_fa())
            .command_timeout(Duration::from_millis(10))
            .antenna_query_opcode(ANTENNA_OP)
            .power_query_opcodes(0x30, 0x31);
        for level in AmpLevel::ALL {
            builder = builder.level_opcode(level, level_op(level));
        }
        builder.build_with_transport(Box::new(mock)).await.unwrap()
    }

    async fn build_stock(mock: MockTransport) -> ExpertAmp {
        ExpertBuilder::new(expert_15k_fa())
            .command_timeout(Duration::from_millis(10))
            .build_with_transport(Box::new(mock))
            .await
            .unwrap()
    }

    // -- info / capabilities --

    #[tokio::test]
    async fn info_reports_model() {
        let amp = build(MockTransport::new()).await;
        assert_eq!(amp.info().manufacturer, Manufacturer::Expert);
        assert_eq!(amp.info().model_name, "1.5K-FA");
        assert_eq!(amp.info().model_id, "15K");
    }

    #[tokio::test]
    async fn capabilities_follow_assigned_opcodes() {
        let amp = build(MockTransport::new()).await;
        assert_eq!(amp.capabilities().readable_levels, AmpLevel::ALL.to_vec());
        assert_eq!(amp.capabilities().max_power_watts, 1500.0);

        let stock = build_stock(MockTransport::new()).await;
        assert!(stock.capabilities().readable_levels.is_empty());
        assert!(stock.capabilities().has_get_frequency);
    }

    // -- level queries --

    #[tokio::test]
    async fn fault_known_code() {
        let mut mock = MockTransport::new();
        script_antenna(&mut mock, 1);
        script(&mut mock, &[level_op(AmpLevel::Fault)], &[b"^SW32;", b";"]);
        let amp = build(mock).await;
        let mut events = amp.subscribe().unwrap();

        let value = amp.get_level(AmpLevel::Fault).await.unwrap();
        assert_eq!(value, LevelValue::Text("PA Current is too high".into()));
        assert_eq!(
            events.try_recv().unwrap(),
            AmpEvent::FaultReported {
                code: 0x20,
                message: "PA Current is too high".into()
            }
        );
    }

    #[tokio::test]
    async fn fault_unknown_code() {
        let mut mock = MockTransport::new();
        script_antenna(&mut mock, 1);
        script(&mut mock, &[level_op(AmpLevel::Fault)], &[b"^SW5;", b";"]);
        let amp = build(mock).await;

        let value = amp.get_level(AmpLevel::Fault).await.unwrap();
        assert_eq!(value.as_str(), Some("Unknown fault code=0x05"));
    }

    #[tokio::test]
    async fn fault_cleared_is_reported() {
        let mut mock = MockTransport::new();
        script_antenna(&mut mock, 1);
        script(&mut mock, &[level_op(AmpLevel::Fault)], &[b"^SW0;", b";"]);
        let amp = build(mock).await;
        let mut events = amp.subscribe().unwrap();

        let value = amp.get_level(AmpLevel::Fault).await.unwrap();
        assert_eq!(value.as_str(), Some("No fault condition"));
        assert_eq!(
            events.try_recv().unwrap(),
            AmpEvent::FaultReported {
                code: 0,
                message: "No fault condition".into()
            }
        );
        assert_eq!(events.try_recv().unwrap_err(), TryRecvError::Empty);
    }

    #[tokio::test]
    async fn swr_level() {
        let mut mock = MockTransport::new();
        script_antenna(&mut mock, 1);
        script(&mut mock, &[level_op(AmpLevel::Swr)], &[b"^SW15;", b";"]);
        let amp = build(mock).await;

        let value = amp.get_level(AmpLevel::Swr).await.unwrap();
        assert_eq!(value, LevelValue::Float(1.5));
    }

    #[tokio::test]
    async fn power_levels() {
        for (level, reply, watts) in [
            (AmpLevel::PwrInput, &b"^SW45;"[..], 45),
            (AmpLevel::PwrForward, &b"^SW1450;"[..], 1450),
            (AmpLevel::PwrReflected, &b"^SW12;"[..], 12),
            (AmpLevel::PwrPeak, &b"^SW1500;"[..], 1500),
        ] {
            let mut mock = MockTransport::new();
            script_antenna(&mut mock, 1);
            script(&mut mock, &[level_op(level)], &[reply, b";"]);
            let amp = build(mock).await;

            let value = amp.get_level(level).await.unwrap();
            assert_eq!(value, LevelValue::Int(watts), "{level}");
        }
    }

    #[tokio::test]
    async fn level_reply_mismatch_is_protocol_error() {
        let mut mock = MockTransport::new();
        script_antenna(&mut mock, 1);
        script(&mut mock, &[level_op(AmpLevel::PwrForward)], &[b"^FR14074;", b";"]);
        let amp = build(mock).await;

        let err = amp.get_level(AmpLevel::PwrForward).await.unwrap_err();
        match err {
            Error::UnexpectedReply { reply, .. } => assert_eq!(reply, "^FR14074"),
            other => panic!("expected UnexpectedReply, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn antenna_mismatch_stops_the_query() {
        let mut mock = MockTransport::new();
        script(&mut mock, &[ANTENNA_OP], &[b"^XX;", b";"]);
        let amp = build(mock).await;

        let err = amp.get_level(AmpLevel::Swr).await.unwrap_err();
        assert!(matches!(err, Error::UnexpectedReply { .. }));
    }

    #[tokio::test]
    async fn antenna_without_reply_is_protocol_error() {
        let mut mock = MockTransport::new();
        script(&mut mock, &[ANTENNA_OP], &[b"", b"", b""]);
        let amp = build(mock).await;

        let err = amp.get_level(AmpLevel::Swr).await.unwrap_err();
        assert!(err.is_protocol());
    }

    #[tokio::test]
    async fn unassigned_level_is_unsupported() {
        let amp = build_stock(MockTransport::new()).await;
        for level in AmpLevel::ALL {
            let err = amp.get_level(level).await.unwrap_err();
            assert!(matches!(err, Error::Unsupported(_)), "{level}");
        }
    }

    // -- tuner record scan --

    #[tokio::test]
    async fn nh_scans_records_after_reply() {
        let mut mock = MockTransport::new();
        script_antenna(&mut mock, 2);
        script(
            &mut mock,
            &[level_op(AmpLevel::Nh)],
            &[
                b"^DF1800,2000;",
                b";AN1 Side TX 1200 BYPASS 3 85;\r\nAN2 Side TX 950 BYPASS 1 140;",
            ],
        );
        let amp = build(mock).await;

        let value = amp.get_level(AmpLevel::Nh).await.unwrap();
        assert_eq!(value, LevelValue::Int(950));
    }

    #[tokio::test]
    async fn pf_uses_second_value() {
        let mut mock = MockTransport::new();
        script_antenna(&mut mock, 2);
        script(
            &mut mock,
            &[level_op(AmpLevel::Pf)],
            &[
                b"^DF1800,2000;",
                b";AN1 Side TX 1200 BYPASS 3 85;AN2 Side TX 950 BYPASS 1 140;",
            ],
        );
        let amp = build(mock).await;

        let value = amp.get_level(AmpLevel::Pf).await.unwrap();
        assert_eq!(value, LevelValue::Int(140));
    }

    #[tokio::test]
    async fn records_collected_with_reply_are_scanned_first() {
        let mut mock = MockTransport::new();
        script_antenna(&mut mock, 1);
        script(
            &mut mock,
            &[level_op(AmpLevel::Pf)],
            &[b"^DF7000,7300;", b"AN1 Side TX 700 BYPASS 0 90;", b";"],
        );
        let amp = build(mock).await;

        let value = amp.get_level(AmpLevel::Pf).await.unwrap();
        assert_eq!(value, LevelValue::Int(90));
    }

    #[tokio::test]
    async fn scan_without_matching_antenna_fails() {
        let mut mock = MockTransport::new();
        script_antenna(&mut mock, 3);
        script(
            &mut mock,
            &[level_op(AmpLevel::Nh)],
            &[
                b"^DF1800,2000;",
                b";AN1 Side TX 1200 BYPASS 3 85;^OP1;",
            ],
        );
        let amp = build(mock).await;

        let err = amp.get_level(AmpLevel::Nh).await.unwrap_err();
        assert!(matches!(err, Error::Protocol(_)));
    }

    #[tokio::test]
    async fn malformed_record_is_protocol_error() {
        let mut mock = MockTransport::new();
        script_antenna(&mut mock, 1);
        script(
            &mut mock,
            &[level_op(AmpLevel::Nh)],
            &[b"^DF1800,2000;", b";AN1 Side TX BYPASS;"],
        );
        let amp = build(mock).await;

        let err = amp.get_level(AmpLevel::Nh).await.unwrap_err();
        match err {
            Error::UnexpectedReply { context, reply } => {
                assert_eq!(context, "antenna record");
                assert_eq!(reply, "AN1 Side TX BYPASS");
            }
            other => panic!("expected UnexpectedReply, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn missing_tuner_range_is_protocol_error() {
        let mut mock = MockTransport::new();
        script_antenna(&mut mock, 1);
        script(&mut mock, &[level_op(AmpLevel::Nh)], &[b"^SW3;", b";"]);
        let amp = build(mock).await;

        let err = amp.get_level(AmpLevel::Nh).await.unwrap_err();
        assert!(err.is_protocol());
    }

    // -- frequency --

    #[tokio::test]
    async fn get_frequency_scales_khz() {
        let mut mock = MockTransport::new();
        script(&mut mock, &[0x90], &[b"^FR14074;", b";"]);
        let amp = build_stock(mock).await;

        assert_eq!(amp.get_frequency().await.unwrap(), 14_074_000);
    }

    #[tokio::test]
    async fn set_then_get_frequency_round_trips() {
        let mut mock = MockTransport::new();
        script(&mut mock, b"^FR07074;", &[b"^FR7074;", b";"]);
        script(&mut mock, &[0x90], &[b"^FR7074;", b";"]);
        let amp = build_stock(mock).await;

        amp.set_frequency(7_074_000).await.unwrap();
        assert_eq!(amp.get_frequency().await.unwrap(), 7_074_000);
    }

    #[tokio::test]
    async fn set_frequency_echo_mismatch() {
        let mut mock = MockTransport::new();
        script(&mut mock, b"^FR14074;", &[b"^FR14075;", b";"]);
        let amp = build_stock(mock).await;

        let err = amp.set_frequency(14_074_000).await.unwrap_err();
        assert!(matches!(err, Error::Protocol(_)));
    }

    #[tokio::test]
    async fn set_frequency_sub_khz_rejected_without_io() {
        // No expectations: any write would fail the mock.
        let amp = build_stock(MockTransport::new()).await;
        let err = amp.set_frequency(14_074_500).await.unwrap_err();
        assert!(matches!(err, Error::InvalidParameter(_)));
    }

    // -- session lifecycle --

    #[tokio::test]
    async fn open_discards_unparseable_reply() {
        let mut mock = MockTransport::new();
        mock.expect(&[0x55, 0x55, 0x55, 0x01, 0x80, 0x80], b"garbage");
        let amp = build_stock(mock).await;
        let mut events = amp.subscribe().unwrap();

        amp.open().await.unwrap();
        assert_eq!(events.try_recv().unwrap(), AmpEvent::Connected);
    }

    #[tokio::test]
    async fn open_tolerates_silence() {
        let mut mock = MockTransport::new();
        mock.expect(&[0x55, 0x55, 0x55, 0x01, 0x80, 0x80], &[]);
        let amp = build_stock(mock).await;

        amp.open().await.unwrap();
    }

    #[tokio::test]
    async fn open_surfaces_write_failure() {
        let mut mock = MockTransport::new();
        mock.expect(&[0x55, 0x55, 0x55, 0x01, 0x80, 0x80], &[]);
        mock.fail_next_send(std::io::ErrorKind::BrokenPipe);
        let amp = build_stock(mock).await;

        let err = amp.open().await.unwrap_err();
        assert!(err.is_transport());
    }

    #[tokio::test]
    async fn close_sends_close_and_releases_link() {
        let mut mock = MockTransport::new();
        mock.expect(&[0x55, 0x55, 0x55, 0x01, 0x81, 0x81], &[0x55, 0x55, 0x55, 0x03]);
        let amp = build_stock(mock).await;
        let mut events = amp.subscribe().unwrap();

        amp.close().await.unwrap();
        assert_eq!(events.try_recv().unwrap(), AmpEvent::Disconnected);

        let err = amp.get_frequency().await.unwrap_err();
        assert!(matches!(err, Error::NotConnected));
    }

    // -- power state --

    #[tokio::test]
    async fn power_state_operate() {
        let mut mock = MockTransport::new();
        script(&mut mock, &[0x30], &[b"^ON1;", b";"]);
        script(&mut mock, &[0x31], &[b"^OP1;", b";"]);
        let amp = build(mock).await;
        let mut events = amp.subscribe().unwrap();

        assert_eq!(amp.get_power_state().await.unwrap(), PowerState::Operate);
        assert_eq!(
            events.try_recv().unwrap(),
            AmpEvent::PowerStateChanged {
                state: PowerState::Operate
            }
        );
    }

    #[tokio::test]
    async fn power_state_event_only_on_change() {
        let mut mock = MockTransport::new();
        script(&mut mock, &[0x30], &[b"^ON0;", b";"]);
        script(&mut mock, &[0x30], &[b"^ON0;", b";"]);
        script(&mut mock, &[0x30], &[b"^ON1;", b";"]);
        script(&mut mock, &[0x31], &[b"^OP0;", b";"]);
        let amp = build(mock).await;
        let mut events = amp.subscribe().unwrap();

        assert_eq!(amp.get_power_state().await.unwrap(), PowerState::Off);
        assert_eq!(amp.get_power_state().await.unwrap(), PowerState::Off);
        assert_eq!(amp.get_power_state().await.unwrap(), PowerState::Standby);

        assert_eq!(
            events.try_recv().unwrap(),
            AmpEvent::PowerStateChanged {
                state: PowerState::Off
            }
        );
        assert_eq!(
            events.try_recv().unwrap(),
            AmpEvent::PowerStateChanged {
                state: PowerState::Standby
            }
        );
        assert!(events.try_recv().is_err());
    }

    #[tokio::test]
    async fn commanded_state_matching_last_read_is_not_reported() {
        let mut mock = MockTransport::new();
        script(&mut mock, &[0x30], &[b"^ON1;", b";"]);
        script(&mut mock, &[0x31], &[b"^OP1;", b";"]);
        script(&mut mock, &[0x0D], &[b";"]);
        let amp = build(mock).await;
        let mut events = amp.subscribe().unwrap();

        amp.get_power_state().await.unwrap();
        amp.set_power_state(PowerState::Operate).await.unwrap();

        assert!(matches!(
            events.try_recv().unwrap(),
            AmpEvent::PowerStateChanged { .. }
        ));
        assert!(events.try_recv().is_err());
    }

    #[tokio::test]
    async fn power_state_standby() {
        let mut mock = MockTransport::new();
        script(&mut mock, &[0x30], &[b"^ON1;", b";"]);
        script(&mut mock, &[0x31], &[b"^OP0;", b";"]);
        let amp = build(mock).await;

        assert_eq!(amp.get_power_state().await.unwrap(), PowerState::Standby);
    }

    #[tokio::test]
    async fn power_state_off_skips_operate_query() {
        let mut mock = MockTransport::new();
        script(&mut mock, &[0x30], &[b"^ON0;", b";"]);
        let amp = build(mock).await;

        assert_eq!(amp.get_power_state().await.unwrap(), PowerState::Off);
    }

    #[tokio::test]
    async fn power_state_unknown_value() {
        let mut mock = MockTransport::new();
        script(&mut mock, &[0x30], &[b"^ON7;", b";"]);
        let amp = build(mock).await;

        let err = amp.get_power_state().await.unwrap_err();
        assert!(matches!(err, Error::UnexpectedReply { .. }));
    }

    #[tokio::test]
    async fn power_state_query_unsupported_by_default() {
        let amp = build_stock(MockTransport::new()).await;
        let err = amp.get_power_state().await.unwrap_err();
        assert!(matches!(err, Error::Unsupported(_)));
    }

    #[tokio::test]
    async fn set_power_state_emits_event() {
        let mut mock = MockTransport::new();
        script(&mut mock, &[0x0D], &[b";"]);
        let amp = build_stock(mock).await;
        let mut events = amp.subscribe().unwrap();

        amp.set_power_state(PowerState::Operate).await.unwrap();
        assert_eq!(
            events.try_recv().unwrap(),
            AmpEvent::PowerStateChanged {
                state: PowerState::Operate
            }
        );
    }

    #[tokio::test]
    async fn set_power_state_without_acknowledgment_succeeds() {
        let mut mock = MockTransport::new();
        script(&mut mock, &[0x0B], &[b"", b"", b""]);
        let amp = build_stock(mock).await;

        amp.set_power_state(PowerState::On).await.unwrap();
    }

    #[tokio::test]
    async fn reset_toggles_standby_then_operate() {
        let mut mock = MockTransport::new();
        script(&mut mock, &[0x0A], &[b";"]);
        script(&mut mock, &[0x0D], &[b";"]);
        let amp = build_stock(mock).await;
        let mut events = amp.subscribe().unwrap();

        amp.reset(ResetKind::Fault).await.unwrap();
        assert_eq!(
            events.try_recv().unwrap(),
            AmpEvent::PowerStateChanged {
                state: PowerState::Standby
            }
        );
        assert_eq!(
            events.try_recv().unwrap(),
            AmpEvent::PowerStateChanged {
                state: PowerState::Operate
            }
        );
    }

    #[tokio::test]
    async fn reset_continues_when_standby_fails() {
        let mut mock = MockTransport::new();
        mock.fail_next_send(std::io::ErrorKind::BrokenPipe);
        script(&mut mock, &[0x0D], &[b";"]);
        let amp = build_stock(mock).await;

        amp.reset(ResetKind::Memory).await.unwrap();
    }

    #[tokio::test]
    async fn reset_reports_operate_failure() {
        let mut mock = MockTransport::new();
        script(&mut mock, &[0x0A], &[b";"]);
        let amp = build_stock(mock).await;

        let err = amp.reset(ResetKind::Amplifier).await.unwrap_err();
        assert!(matches!(err, Error::Protocol(_)));
    }
}
