//! Core types used throughout amplib.
//!
//! These types provide a manufacturer-agnostic view of a linear amplifier:
//! which telemetry levels can be read, what a reading looks like, and the
//! power states an amplifier can be put into.

use std::fmt;
use std::str::FromStr;

/// A telemetry quantity that can be read from an amplifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AmpLevel {
    /// Standing wave ratio seen by the amplifier output.
    Swr,
    /// Tuner network inductance for the selected antenna, in nanohenries.
    Nh,
    /// Tuner network capacitance for the selected antenna, in picofarads.
    Pf,
    /// Drive power arriving at the amplifier input.
    PwrInput,
    /// Forward output power.
    PwrForward,
    /// Reflected output power.
    PwrReflected,
    /// Peak output power.
    PwrPeak,
    /// Current fault condition, reported as text.
    Fault,
}

impl AmpLevel {
    /// Every level, in declaration order.
    pub const ALL: [AmpLevel; 8] = [
        AmpLevel::Swr,
        AmpLevel::Nh,
        AmpLevel::Pf,
        AmpLevel::PwrInput,
        AmpLevel::PwrForward,
        AmpLevel::PwrReflected,
        AmpLevel::PwrPeak,
        AmpLevel::Fault,
    ];
}

impl fmt::Display for AmpLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            AmpLevel::Swr => "SWR",
            AmpLevel::Nh => "NH",
            AmpLevel::Pf => "PF",
            AmpLevel::PwrInput => "PWR_INPUT",
            AmpLevel::PwrForward => "PWR_FWD",
            AmpLevel::PwrReflected => "PWR_REFLECTED",
            AmpLevel::PwrPeak => "PWR_PEAK",
            AmpLevel::Fault => "FAULT",
        };
        write!(f, "{s}")
    }
}

/// Error returned when a string cannot be parsed into an [`AmpLevel`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseLevelError(String);

impl fmt::Display for ParseLevelError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown level: {}", self.0)
    }
}

impl std::error::Error for ParseLevelError {}

impl FromStr for AmpLevel {
    type Err = ParseLevelError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_uppercase().replace('-', "_").as_str() {
            "SWR" => Ok(AmpLevel::Swr),
            "NH" => Ok(AmpLevel::Nh),
            "PF" => Ok(AmpLevel::Pf),
            "PWR_INPUT" | "INPUT" => Ok(AmpLevel::PwrInput),
            "PWR_FWD" | "FWD" | "FORWARD" => Ok(AmpLevel::PwrForward),
            "PWR_REFLECTED" | "REFLECTED" | "REF" => Ok(AmpLevel::PwrReflected),
            "PWR_PEAK" | "PEAK" => Ok(AmpLevel::PwrPeak),
            "FAULT" => Ok(AmpLevel::Fault),
            _ => Err(ParseLevelError(s.to_string())),
        }
    }
}

/// A level reading returned by [`crate::amp::Amplifier::get_level()`].
///
/// The variant depends on the level: SWR is a float, power figures and
/// tuner values are integers, faults are text.
#[derive(Debug, Clone, PartialEq)]
pub enum LevelValue {
    /// A floating point reading (e.g. SWR 1.5).
    Float(f32),
    /// An integer reading (watts, nH, pF).
    Int(i32),
    /// A textual reading (fault description).
    Text(String),
}

impl LevelValue {
    /// Return the reading as `f32` if it is numeric.
    pub fn as_f32(&self) -> Option<f32> {
        match self {
            LevelValue::Float(v) => Some(*v),
            LevelValue::Int(v) => Some(*v as f32),
            LevelValue::Text(_) => None,
        }
    }

    /// Return the reading as `i32` if it is an integer.
    pub fn as_i32(&self) -> Option<i32> {
        match self {
            LevelValue::Int(v) => Some(*v),
            _ => None,
        }
    }

    /// Return the reading as text if it is textual.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            LevelValue::Text(s) => Some(s),
            _ => None,
        }
    }
}

impl fmt::Display for LevelValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LevelValue::Float(v) => write!(f, "{v:.1}"),
            LevelValue::Int(v) => write!(f, "{v}"),
            LevelValue::Text(s) => write!(f, "{s}"),
        }
    }
}

/// Power state of an amplifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PowerState {
    /// Mains off.
    Off,
    /// Powered on; whether it is keyed through is not known.
    On,
    /// Powered and amplifying.
    Operate,
    /// Powered but bypassed.
    Standby,
}

impl fmt::Display for PowerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            PowerState::Off => "OFF",
            PowerState::On => "ON",
            PowerState::Operate => "OPERATE",
            PowerState::Standby => "STANDBY",
        };
        write!(f, "{s}")
    }
}

/// Error returned when a string cannot be parsed into a [`PowerState`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsePowerStateError(String);

impl fmt::Display for ParsePowerStateError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown power state: {}", self.0)
    }
}

impl std::error::Error for ParsePowerStateError {}

impl FromStr for PowerState {
    type Err = ParsePowerStateError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "OFF" => Ok(PowerState::Off),
            "ON" => Ok(PowerState::On),
            "OPERATE" | "OPR" => Ok(PowerState::Operate),
            "STANDBY" | "STBY" => Ok(PowerState::Standby),
            _ => Err(ParsePowerStateError(s.to_string())),
        }
    }
}

/// What an amplifier reset should clear.
///
/// Backends that only have one way of resetting may ignore the distinction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ResetKind {
    /// Clear stored settings.
    Memory,
    /// Clear a latched fault.
    #[default]
    Fault,
    /// Full amplifier reset.
    Amplifier,
}

/// Amplifier manufacturer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Manufacturer {
    /// SPE Expert (binary framed protocol over serial).
    Expert,
}

impl fmt::Display for Manufacturer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Manufacturer::Expert => write!(f, "Expert"),
        }
    }
}

/// A supported amplifier model with enough information for a UI picker.
///
/// Obtained via `amplib::supported_amplifiers()` (facade crate) or by
/// converting a manufacturer-specific model type via its `From`
/// implementation.
#[derive(Debug, Clone)]
pub struct AmpDefinition {
    /// The manufacturer of the amplifier.
    pub manufacturer: Manufacturer,
    /// Human-readable model name (e.g. "1.5K-FA").
    pub model_name: &'static str,
    /// Default serial baud rate.
    pub default_baud_rate: u32,
    /// Full capability description for this model.
    pub capabilities: AmpCapabilities,
}

/// Static information about a connected amplifier.
#[derive(Debug, Clone)]
pub struct AmpInfo {
    /// The manufacturer of the amplifier.
    pub manufacturer: Manufacturer,
    /// Human-readable model name.
    pub model_name: String,
    /// Machine-readable model identifier.
    pub model_id: String,
}

/// Capabilities and limits of a specific amplifier model.
#[derive(Debug, Clone)]
pub struct AmpCapabilities {
    /// Rated output power in watts.
    pub max_power_watts: f32,
    /// Levels that [`get_level`](crate::amp::Amplifier::get_level) can read.
    pub readable_levels: Vec<AmpLevel>,
    /// Power states that can be commanded.
    pub power_states: Vec<PowerState>,
    /// Whether the amplifier reports its operating frequency.
    pub has_get_frequency: bool,
    /// Whether the amplifier accepts a frequency from the host.
    pub has_set_frequency: bool,
    /// Lowest supported serial baud rate.
    pub serial_rate_min: u32,
    /// Highest supported serial baud rate.
    pub serial_rate_max: u32,
    /// Default per-command timeout in milliseconds.
    pub timeout_ms: u64,
    /// Default retry count for incomplete reads.
    pub retry: u32,
}

impl Default for AmpCapabilities {
    fn default() -> Self {
        AmpCapabilities {
            max_power_watts: 0.0,
            readable_levels: Vec::new(),
            power_states: Vec::new(),
            has_get_frequency: false,
            has_set_frequency: false,
            serial_rate_min: 9600,
            serial_rate_max: 115_200,
            timeout_ms: 2000,
            retry: 2,
        }
    }
}

impl AmpCapabilities {
    /// Check whether a baud rate lies within the supported range (inclusive).
    pub fn supports_baud_rate(&self, baud: u32) -> bool {
        baud >= self.serial_rate_min && baud <= self.serial_rate_max
    }
}
