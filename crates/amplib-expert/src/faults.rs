//! Expert fault codes.
//!
//! The amplifier reports abnormal conditions as a one-byte code. Known codes
//! map to a fixed description; anything else is reported as
//! `Unknown fault code=0xHH` so a fault is never dropped.

use std::borrow::Cow;

/// Known fault codes and their descriptions, in code order.
pub const FAULTS: &[(u8, &str)] = &[
    (0x00, "No fault condition"),
    (0x10, "Watchdog Timer was reset"),
    (0x20, "PA Current is too high"),
    (0x40, "Temperature is too high"),
    (0x60, "Input power is too high"),
    (0x61, "Gain is too low"),
    (0x70, "Invalid frequency"),
    (0x80, "50V supply voltage too low or too high"),
    (0x81, "5V supply voltage too low or too high"),
    (0x82, "10V supply voltage too low or too high"),
    (0x83, "12V supply voltage too low or too high"),
    (0x84, "-12V supply voltage too low or too high"),
    (0x85, "5V or 400V LPF board supply voltages not detected"),
    (0x90, "Reflected power is too high"),
    (0x91, "SWR very high"),
    (0x92, "ATU no match"),
    (0xB0, "Dissipated power too high"),
    (0xC0, "Forward power too high"),
    (0xE0, "Forward power too high for current setting"),
    (0xF0, "Gain is too high"),
];

/// Look up the description for a known fault code.
pub fn known_fault(code: u8) -> Option<&'static str> {
    FAULTS
        .iter()
        .find(|(c, _)| *c == code)
        .map(|(_, message)| *message)
}

/// Describe a fault code, synthesizing a message for unknown codes.
///
/// # Example
///
/// ```
/// use amplib_expert::faults::lookup_fault;
///
/// assert_eq!(lookup_fault(0x20), "PA Current is too high");
/// assert_eq!(lookup_fault(0x05), "Unknown fault code=0x05");
/// ```
pub fn lookup_fault(code: u8) -> Cow<'static, str> {
    match known_fault(code) {
        Some(message) => Cow::Borrowed(message),
        None => Cow::Owned(format!("Unknown fault code=0x{code:02x}")),
    }
}
