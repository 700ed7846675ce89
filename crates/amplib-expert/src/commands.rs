//! Expert command builders and reply parsers.
//!
//! Builders return the payload to hand to the transaction engine (it adds
//! the framing). Parsers take one reply line with the `;` already stripped.
//!
//! All functions are pure; they perform no I/O.
//!
//! # Reply patterns
//!
//! | Query            | Reply                              |
//! |------------------|------------------------------------|
//! | Selected antenna | `^AE<n>`                           |
//! | Frequency        | `^FR<kHz>`                         |
//! | SWR              | `^SW<tenths>`                      |
//! | Power, fault     | `^SW<n>`                           |
//! | Tuner range      | `^DF<lo kHz>,<hi kHz>`             |
//! | Antenna record   | `AN<n> Side TX <L> <x> <x> <C>`    |
//!
//! Numbers are read the way C's `scanf` reads them: leading whitespace is
//! skipped and parsing stops at the first character that cannot continue
//! the number, so `^AE2 extra` yields antenna 2.

use amplib_core::{AmpLevel, Error, PowerState, Result};

use crate::models::OpcodeTable;

/// Marker present on every antenna record line.
pub const BYPASS_MARKER: &str = "BYPASS";

// ---------------------------------------------------------------
// Command builders
// ---------------------------------------------------------------

/// Build the "open session" command.
pub fn cmd_open(ops: &OpcodeTable) -> Vec<u8> {
    vec![ops.open]
}

/// Build the "close session" command.
pub fn cmd_close(ops: &OpcodeTable) -> Vec<u8> {
    vec![ops.close]
}

/// Build the status query, answered with the current frequency.
pub fn cmd_read_frequency(ops: &OpcodeTable) -> Vec<u8> {
    vec![ops.status]
}

/// Build a "set frequency" command: the text `^FR<kHz>;` with the kHz
/// value zero-padded to five digits.
///
/// # Errors
///
/// Returns [`Error::InvalidParameter`] if `freq_hz` is not a whole number
/// of kilohertz; the amplifier works in kHz and could never echo it back.
///
/// # Example
///
/// ```
/// use amplib_expert::commands::cmd_set_frequency;
///
/// assert_eq!(cmd_set_frequency(7_074_000).unwrap(), b"^FR07074;");
/// assert_eq!(cmd_set_frequency(14_074_000).unwrap(), b"^FR14074;");
/// assert!(cmd_set_frequency(14_074_500).is_err());
/// ```
pub fn cmd_set_frequency(freq_hz: u64) -> Result<Vec<u8>> {
    if freq_hz % 1000 != 0 {
        return Err(Error::InvalidParameter(format!(
            "frequency {freq_hz} Hz is not a whole number of kHz"
        )));
    }
    Ok(format!("^FR{:05};", freq_hz / 1000).into_bytes())
}

/// Build the selected-antenna query.
///
/// # Errors
///
/// Returns [`Error::Unsupported`] if no opcode is assigned.
pub fn cmd_read_antenna(ops: &OpcodeTable) -> Result<Vec<u8>> {
    ops.antenna_query
        .map(|op| vec![op])
        .ok_or_else(|| Error::Unsupported("antenna query opcode is not assigned".into()))
}

/// Build the query for one telemetry level.
///
/// # Errors
///
/// Returns [`Error::Unsupported`] if no opcode is assigned for `level`.
pub fn cmd_read_level(ops: &OpcodeTable, level: AmpLevel) -> Result<Vec<u8>> {
    ops.level(level)
        .map(|op| vec![op])
        .ok_or_else(|| Error::Unsupported(format!("no query opcode assigned for level {level}")))
}

/// Build the pair of power-state queries (`^ON`, then `^OP`).
///
/// # Errors
///
/// Returns [`Error::Unsupported`] if the opcodes are not assigned.
pub fn cmd_read_power_state(ops: &OpcodeTable) -> Result<(Vec<u8>, Vec<u8>)> {
    ops.power_query
        .map(|(on, operate)| (vec![on], vec![operate]))
        .ok_or_else(|| Error::Unsupported("power state query opcodes are not assigned".into()))
}

/// Build a "switch power state" command.
pub fn cmd_set_power_state(ops: &OpcodeTable, state: PowerState) -> Vec<u8> {
    vec![ops.power_state(state)]
}

// ---------------------------------------------------------------
// Number scanning
// ---------------------------------------------------------------

/// Length of the longest numeric prefix of `s`: optional sign, digits,
/// and (when `fraction` is set) a decimal point with more digits.
fn numeric_prefix_len(s: &str, fraction: bool) -> usize {
    let bytes = s.as_bytes();
    let mut i = 0;
    if matches!(bytes.first(), Some(b'+' | b'-')) {
        i += 1;
    }
    let digits_start = i;
    while i < bytes.len() && bytes[i].is_ascii_digit() {
        i += 1;
    }
    let mut seen_digit = i > digits_start;
    if fraction && i < bytes.len() && bytes[i] == b'.' {
        let mut j = i + 1;
        while j < bytes.len() && bytes[j].is_ascii_digit() {
            j += 1;
        }
        if j > i + 1 || seen_digit {
            seen_digit = seen_digit || j > i + 1;
            i = j;
        }
    }
    if seen_digit { i } else { 0 }
}

/// Parse the integer at the start of `s`, skipping leading whitespace.
fn scan_int(s: &str) -> Option<i64> {
    let s = s.trim_start();
    let len = numeric_prefix_len(s, false);
    s[..len].parse().ok()
}

/// Parse the decimal number at the start of `s`, skipping leading whitespace.
fn scan_float(s: &str) -> Option<f32> {
    let s = s.trim_start();
    let len = numeric_prefix_len(s, true);
    s[..len].parse().ok()
}

fn after_prefix<'a>(reply: &'a str, prefix: &str) -> Option<&'a str> {
    reply.strip_prefix(prefix)
}

// ---------------------------------------------------------------
// Reply parsers
// ---------------------------------------------------------------

/// Parse the integer following `prefix`.
///
/// # Example
///
/// ```
/// use amplib_expert::commands::parse_prefixed_int;
///
/// assert_eq!(parse_prefixed_int("^SW120", "^SW", "power").unwrap(), 120);
/// assert!(parse_prefixed_int("^AE1", "^SW", "power").is_err());
/// ```
pub fn parse_prefixed_int(reply: &str, prefix: &str, context: &str) -> Result<i64> {
    after_prefix(reply, prefix)
        .and_then(scan_int)
        .ok_or_else(|| Error::unexpected_reply(context, reply))
}

/// Parse the selected antenna from an `^AE<n>` reply.
pub fn parse_antenna(reply: &str) -> Result<i64> {
    parse_prefixed_int(reply, "^AE", "antenna query")
}

/// Parse the frequency in hertz from a `^FR<kHz>` reply.
///
/// # Example
///
/// ```
/// use amplib_expert::commands::parse_frequency;
///
/// assert_eq!(parse_frequency("^FR14074").unwrap(), 14_074_000);
/// assert!(parse_frequency("^AE1").is_err());
/// ```
pub fn parse_frequency(reply: &str) -> Result<u64> {
    let khz = parse_prefixed_int(reply, "^FR", "frequency")?;
    u64::try_from(khz)
        .ok()
        .and_then(|khz| khz.checked_mul(1000))
        .ok_or_else(|| Error::unexpected_reply("frequency", reply))
}

/// Parse an SWR reading from a `^SW<tenths>` reply.
pub fn parse_swr(reply: &str) -> Result<f32> {
    after_prefix(reply, "^SW")
        .and_then(scan_float)
        .map(|tenths| tenths / 10.0)
        .ok_or_else(|| Error::unexpected_reply("SWR", reply))
}

/// Parse an integer level (power in watts) from a `^SW<n>` reply.
pub fn parse_level_int(reply: &str, level: AmpLevel) -> Result<i32> {
    let context = level.to_string();
    let value = parse_prefixed_int(reply, "^SW", &context)?;
    i32::try_from(value).map_err(|_| Error::unexpected_reply(context, reply))
}

/// Parse a fault code from a `^SW<n>` reply.
pub fn parse_fault_code(reply: &str) -> Result<u8> {
    let value = parse_prefixed_int(reply, "^SW", "fault")?;
    u8::try_from(value).map_err(|_| Error::unexpected_reply("fault", reply))
}

/// Parse the tuner frequency range (kHz) from a `^DF<lo>,<hi>` reply.
pub fn parse_tuner_range(reply: &str) -> Result<(i64, i64)> {
    let bad = || Error::unexpected_reply("tuner range", reply);
    let rest = after_prefix(reply, "^DF").ok_or_else(bad)?;
    let (lo, hi) = rest.split_once(',').ok_or_else(bad)?;
    match (scan_int(lo), scan_int(hi)) {
        (Some(lo), Some(hi)) => Ok((lo, hi)),
        _ => Err(bad()),
    }
}

/// One antenna record from the tuner status listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AntennaRecord {
    /// Antenna number.
    pub antenna: i64,
    /// Tuner inductance in nanohenries.
    pub inductance_nh: i32,
    /// Tuner capacitance in picofarads.
    pub capacitance_pf: i32,
}

impl AntennaRecord {
    /// The value reported for an NH or PF level query.
    pub fn value_for(&self, level: AmpLevel) -> Option<i32> {
        match level {
            AmpLevel::Nh => Some(self.inductance_nh),
            AmpLevel::Pf => Some(self.capacitance_pf),
            _ => None,
        }
    }
}

/// Whether a line belongs to the antenna record listing.
pub fn is_antenna_record(line: &str) -> bool {
    line.contains(BYPASS_MARKER)
}

/// Parse an antenna record line: `AN<n> Side TX <L> <x> <x> <C> ...`.
///
/// The two fields between inductance and capacitance are skipped.
///
/// # Example
///
/// ```
/// use amplib_expert::commands::parse_antenna_record;
///
/// let rec = parse_antenna_record("AN2 Side TX 450 BYPASS 0 120").unwrap();
/// assert_eq!(rec.antenna, 2);
/// assert_eq!(rec.inductance_nh, 450);
/// assert_eq!(rec.capacitance_pf, 120);
/// ```
pub fn parse_antenna_record(line: &str) -> Result<AntennaRecord> {
    let bad = || Error::unexpected_reply("antenna record", line);
    let fields: Vec<&str> = line.split_whitespace().collect();
    if fields.len() < 7 || fields[1] != "Side" || fields[2] != "TX" {
        return Err(bad());
    }
    let antenna = fields[0]
        .strip_prefix("AN")
        .and_then(scan_int)
        .ok_or_else(bad)?;
    let inductance_nh = scan_int(fields[3])
        .and_then(|v| i32::try_from(v).ok())
        .ok_or_else(bad)?;
    let capacitance_pf = scan_int(fields[6])
        .and_then(|v| i32::try_from(v).ok())
        .ok_or_else(bad)?;
    Ok(AntennaRecord {
        antenna,
        inductance_nh,
        capacitance_pf,
    })
}

/// Parse a `^ON<0|1>` or `^OP<0|1>` flag.
pub fn parse_power_flag(reply: &str, prefix: &str) -> Result<bool> {
    match parse_prefixed_int(reply, prefix, "power state")? {
        0 => Ok(false),
        1 => Ok(true),
        _ => Err(Error::unexpected_reply("power state", reply)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table() -> OpcodeTable {
        let mut ops = OpcodeTable::default();
        ops.antenna_query = Some(0x20);
        ops.power_query = Some((0x30, 0x31));
        ops.levels.insert(AmpLevel::Swr, 0x40);
        ops
    }

    // -- builders --

    #[test]
    fn fixed_opcode_commands() {
        let ops = OpcodeTable::default();
        assert_eq!(cmd_open(&ops), vec![0x80]);
        assert_eq!(cmd_close(&ops), vec![0x81]);
        assert_eq!(cmd_read_frequency(&ops), vec![0x90]);
        assert_eq!(cmd_set_power_state(&ops, PowerState::Operate), vec![0x0D]);
        assert_eq!(cmd_set_power_state(&ops, PowerState::On), vec![0x0B]);
    }

    #[test]
    fn set_frequency_text() {
        assert_eq!(cmd_set_frequency(1_800_000).unwrap(), b"^FR01800;");
        assert_eq!(cmd_set_frequency(50_313_000).unwrap(), b"^FR50313;");
        assert_eq!(cmd_set_frequency(144_174_000).unwrap(), b"^FR144174;");
    }

    #[test]
    fn set_frequency_rejects_sub_khz() {
        let err = cmd_set_frequency(7_074_001).unwrap_err();
        assert!(matches!(err, Error::InvalidParameter(_)));
    }

    #[test]
    fn unassigned_queries_are_unsupported() {
        let ops = OpcodeTable::default();
        assert!(matches!(cmd_read_antenna(&ops), Err(Error::Unsupported(_))));
        assert!(matches!(
            cmd_read_level(&ops, AmpLevel::Fault),
            Err(Error::Unsupported(_))
        ));
        assert!(matches!(
            cmd_read_power_state(&ops),
            Err(Error::Unsupported(_))
        ));
    }

    #[test]
    fn assigned_queries() {
        let ops = table();
        assert_eq!(cmd_read_antenna(&ops).unwrap(), vec![0x20]);
        assert_eq!(cmd_read_level(&ops, AmpLevel::Swr).unwrap(), vec![0x40]);
        assert_eq!(
            cmd_read_power_state(&ops).unwrap(),
            (vec![0x30], vec![0x31])
        );
    }

    // -- scanning --

    #[test]
    fn scan_int_like_scanf() {
        assert_eq!(scan_int("42"), Some(42));
        assert_eq!(scan_int("  -7abc"), Some(-7));
        assert_eq!(scan_int("+3"), Some(3));
        assert_eq!(scan_int("x1"), None);
        assert_eq!(scan_int("-"), None);
        assert_eq!(scan_int(""), None);
    }

    #[test]
    fn scan_float_like_scanf() {
        assert_eq!(scan_float("15"), Some(15.0));
        assert_eq!(scan_float("1.5,"), Some(1.5));
        assert_eq!(scan_float(".5"), Some(0.5));
        assert_eq!(scan_float("2."), Some(2.0));
        assert_eq!(scan_float("."), None);
    }

    // -- parsers --

    #[test]
    fn antenna_reply() {
        assert_eq!(parse_antenna("^AE2").unwrap(), 2);
        assert_eq!(parse_antenna("^AE1 TX").unwrap(), 1);
    }

    #[test]
    fn antenna_reply_mismatch_keeps_raw_text() {
        match parse_antenna("^FR14074").unwrap_err() {
            Error::UnexpectedReply { context, reply } => {
                assert_eq!(context, "antenna query");
                assert_eq!(reply, "^FR14074");
            }
            other => panic!("expected UnexpectedReply, got {other:?}"),
        }
        assert!(parse_antenna("^AE").is_err());
        assert!(parse_antenna("").is_err());
    }

    #[test]
    fn frequency_reply() {
        assert_eq!(parse_frequency("^FR7074").unwrap(), 7_074_000);
        assert_eq!(parse_frequency("^FR01800").unwrap(), 1_800_000);
        assert!(parse_frequency("^FR-5").is_err());
        assert!(parse_frequency("FR14074").is_err());
    }

    #[test]
    fn swr_reply_in_tenths() {
        assert_eq!(parse_swr("^SW15").unwrap(), 1.5);
        assert_eq!(parse_swr("^SW10").unwrap(), 1.0);
        assert!(parse_swr("^SWx").is_err());
    }

    #[test]
    fn level_int_reply() {
        assert_eq!(parse_level_int("^SW1450", AmpLevel::PwrForward).unwrap(), 1450);
        match parse_level_int("^AE1", AmpLevel::PwrPeak).unwrap_err() {
            Error::UnexpectedReply { context, .. } => assert_eq!(context, "PWR_PEAK"),
            other => panic!("expected UnexpectedReply, got {other:?}"),
        }
    }

    #[test]
    fn fault_code_reply() {
        assert_eq!(parse_fault_code("^SW32").unwrap(), 0x20);
        assert_eq!(parse_fault_code("^SW0").unwrap(), 0);
        assert!(parse_fault_code("^SW256").is_err());
        assert!(parse_fault_code("^SW-1").is_err());
    }

    #[test]
    fn tuner_range_reply() {
        assert_eq!(parse_tuner_range("^DF1800,2000").unwrap(), (1800, 2000));
        assert_eq!(parse_tuner_range("^DF 7000, 7300").unwrap(), (7000, 7300));
        assert!(parse_tuner_range("^DF1800").is_err());
        assert!(parse_tuner_range("^DFa,b").is_err());
    }

    #[test]
    fn antenna_record_line() {
        let rec = parse_antenna_record("AN1 Side TX 1200 BYPASS 3 85 BYPASS").unwrap();
        assert_eq!(
            rec,
            AntennaRecord {
                antenna: 1,
                inductance_nh: 1200,
                capacitance_pf: 85
            }
        );
        assert_eq!(rec.value_for(AmpLevel::Nh), Some(1200));
        assert_eq!(rec.value_for(AmpLevel::Pf), Some(85));
        assert_eq!(rec.value_for(AmpLevel::Swr), None);
    }

    #[test]
    fn antenna_record_rejects_malformed_lines() {
        assert!(parse_antenna_record("AN1 Side RX 1200 a b 85").is_err());
        assert!(parse_antenna_record("AN1 Side TX BYPASS").is_err());
        assert!(parse_antenna_record("ANx Side TX 1 a b 2").is_err());
        assert!(parse_antenna_record("AN1 Side TX 1 a b c").is_err());
    }

    #[test]
    fn bypass_marker_detection() {
        assert!(is_antenna_record("AN1 Side TX 1 BYPASS 0 2"));
        assert!(!is_antenna_record("^DF1800,2000"));
    }

    #[test]
    fn power_flags() {
        assert!(parse_power_flag("^ON1", "^ON").unwrap());
        assert!(!parse_power_flag("^OP0", "^OP").unwrap());
        assert!(parse_power_flag("^ON2", "^ON").is_err());
        assert!(parse_power_flag("^OP1", "^ON").is_err());
    }
}
