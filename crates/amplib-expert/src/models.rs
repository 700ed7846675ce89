//! Expert model definitions.
//!
//! The 1.3K-FA, 1.5K-FA and 2K-FA share one serial protocol and differ only
//! in rated output power. Each is described by an [`ExpertModel`] returned
//! from a factory function (e.g. [`expert_15k_fa()`]).
//!
//! | Model   | Baud   | Power |
//! |---------|--------|-------|
//! | 1.3K-FA | 115200 | 1300W |
//! | 1.5K-FA | 115200 | 1500W |
//! | 2K-FA   | 115200 | 2000W |
//!
//! Every model carries an [`OpcodeTable`]. Opcodes for opening and closing
//! the session, the status/frequency query, and power switching are known;
//! the antenna, level and power-state queries are left unassigned and must
//! be filled in (see
//! [`ExpertBuilder::level_opcode`](crate::builder::ExpertBuilder::level_opcode))
//! before the corresponding operations work.

use std::collections::HashMap;

use amplib_core::{AmpCapabilities, AmpDefinition, AmpLevel, Manufacturer, PowerState};

/// Command opcodes understood by an Expert amplifier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OpcodeTable {
    /// Start a remote control session.
    pub open: u8,
    /// End a remote control session.
    pub close: u8,
    /// Status query; the amplifier answers with `^FR<kHz>`.
    pub status: u8,
    /// Switch the amplifier off.
    pub power_off: u8,
    /// Switch the amplifier on.
    pub power_on: u8,
    /// Put the amplifier in operate.
    pub operate: u8,
    /// Put the amplifier in standby.
    pub standby: u8,
    /// Selected-antenna query (`^AE<n>` reply).
    pub antenna_query: Option<u8>,
    /// Power-on (`^ON`) and operate (`^OP`) queries.
    pub power_query: Option<(u8, u8)>,
    /// Per-level query opcodes.
    pub levels: HashMap<AmpLevel, u8>,
}

impl OpcodeTable {
    /// Opcode for reading `level`, if one is assigned.
    pub fn level(&self, level: AmpLevel) -> Option<u8> {
        self.levels.get(&level).copied()
    }

    /// Opcode for switching to `state`.
    pub fn power_state(&self, state: PowerState) -> u8 {
        match state {
            PowerState::Off => self.power_off,
            PowerState::On => self.power_on,
            PowerState::Operate => self.operate,
            PowerState::Standby => self.standby,
        }
    }
}

impl Default for OpcodeTable {
    fn default() -> Self {
        OpcodeTable {
            open: 0x80,
            close: 0x81,
            status: 0x90,
            power_off: 0x0A,
            power_on: 0x0B,
            operate: 0x0D,
            // Stock firmware shares the off opcode for standby.
            standby: 0x0A,
            antenna_query: None,
            power_query: None,
            levels: HashMap::new(),
        }
    }
}

/// Static model definition for an Expert amplifier.
#[derive(Debug, Clone)]
pub struct ExpertModel {
    /// Human-readable model name (e.g. "1.5K-FA").
    pub name: &'static str,
    /// Machine-readable model identifier, as reported in status replies.
    pub model_id: &'static str,
    /// Default serial baud rate.
    pub default_baud_rate: u32,
    /// Full capability description for this model.
    pub capabilities: AmpCapabilities,
    /// Command opcodes.
    pub opcodes: OpcodeTable,
}

fn expert_capabilities(max_power_watts: f32) -> AmpCapabilities {
    AmpCapabilities {
        max_power_watts,
        readable_levels: AmpLevel::ALL.to_vec(),
        power_states: vec![
            PowerState::Off,
            PowerState::On,
            PowerState::Operate,
            PowerState::Standby,
        ],
        has_get_frequency: true,
        has_set_frequency: true,
        serial_rate_min: 9600,
        serial_rate_max: 115_200,
        timeout_ms: 2000,
        retry: 2,
    }
}

/// Expert 1.3K-FA.
pub fn expert_13k_fa() -> ExpertModel {
    ExpertModel {
        name: "1.3K-FA",
        model_id: "13K",
        default_baud_rate: 115_200,
        capabilities: expert_capabilities(1300.0),
        opcodes: OpcodeTable::default(),
    }
}

/// Expert 1.5K-FA.
pub fn expert_15k_fa() -> ExpertModel {
    ExpertModel {
        name: "1.5K-FA",
        model_id: "15K",
        default_baud_rate: 115_200,
        capabilities: expert_capabilities(1500.0),
        opcodes: OpcodeTable::default(),
    }
}

/// Expert 2K-FA.
pub fn expert_2k_fa() -> ExpertModel {
    ExpertModel {
        name: "2K-FA",
        model_id: "20K",
        default_baud_rate: 115_200,
        capabilities: expert_capabilities(2000.0),
        opcodes: OpcodeTable::default(),
    }
}

/// All supported Expert models.
pub fn all_expert_models() -> Vec<ExpertModel> {
    vec![expert_13k_fa(), expert_15k_fa(), expert_2k_fa()]
}

impl From<&ExpertModel> for AmpDefinition {
    fn from(model: &ExpertModel) -> Self {
        AmpDefinition {
            manufacturer: Manufacturer::Expert,
            model_name: model.name,
            default_baud_rate: model.default_baud_rate,
            capabilities: model.capabilities.clone(),
        }
    }
}
