//! Resolution of raw event codes to symbolic control names.
//!
//! Names are looked up in a per-kind [ControlMap]. Some devices report several
//! buttons through one shared code and carry the button identity in the event
//! value instead. For those, the first-pass name belongs to a configured
//! indirection group (e.g. "BUTTON") and a second lookup keyed by the value
//! produces the final name.
use std::collections::{BTreeMap, HashMap};

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{drivers::joydev::event::EventKind, input::source::DeviceCapabilities};

#[derive(Debug, Error, PartialEq)]
pub enum ResolveError {
    #[error("Unknown code: {0:#04x}")]
    UnknownCode(u16),
}

/// Association of raw codes to symbolic names for each event kind
#[derive(Debug, Deserialize, Serialize, Clone, JsonSchema, PartialEq, Default)]
#[serde(rename_all = "snake_case")]
pub struct ControlMap {
    #[serde(default)]
    pub analog: BTreeMap<u8, String>,
    #[serde(default)]
    pub digital: BTreeMap<u8, String>,
    #[serde(default)]
    pub misc: BTreeMap<u8, String>,
}

/// Static names for raw axis and button codes as reported by the capability
/// query of a device (e.g. 0x00 => "left_stick_horz", 0x130 => "A").
#[derive(Debug, Deserialize, Serialize, Clone, JsonSchema, PartialEq, Default)]
#[serde(rename_all = "snake_case")]
pub struct NameTable {
    #[serde(default)]
    pub axes: BTreeMap<u16, String>,
    #[serde(default)]
    pub buttons: BTreeMap<u16, String>,
}

impl ControlMap {
    /// Build a control map from the index to code lists returned by the
    /// device capability query. Codes missing from the name table get a
    /// placeholder name.
    pub fn from_capabilities(caps: &DeviceCapabilities, names: &NameTable) -> Self {
        let mut map = ControlMap::default();
        for (index, code) in caps.axis_codes.iter().enumerate().take(u8::MAX as usize + 1) {
            let name = names
                .axes
                .get(code)
                .cloned()
                .unwrap_or_else(|| placeholder(*code));
            log::debug!("Axis {index} = {code:#04x} => {name}");
            map.analog.insert(index as u8, name);
        }
        for (index, code) in caps.button_codes.iter().enumerate().take(u8::MAX as usize + 1) {
            let name = names
                .buttons
                .get(code)
                .cloned()
                .unwrap_or_else(|| placeholder(*code));
            log::debug!("Button {index} = {code:#05x} => {name}");
            map.digital.insert(index as u8, name);
        }
        map
    }

    /// Returns the table for the given event kind
    fn table(&self, kind: EventKind) -> Option<&BTreeMap<u8, String>> {
        match kind {
            EventKind::Digital => Some(&self.digital),
            EventKind::Analog => Some(&self.analog),
            EventKind::Misc => Some(&self.misc),
            EventKind::Unknown(_) => None,
        }
    }

    /// Look up the name of the given code
    pub fn lookup(&self, code: u8, kind: EventKind) -> Result<&str, ResolveError> {
        self.table(kind)
            .and_then(|table| table.get(&code))
            .map(|name| name.as_str())
            .ok_or(ResolveError::UnknownCode(code as u16))
    }

    /// Returns true if no names are defined
    pub fn is_empty(&self) -> bool {
        self.analog.is_empty() && self.digital.is_empty() && self.misc.is_empty()
    }
}

/// Returns the placeholder name used for codes that have no name
pub fn placeholder(code: u16) -> String {
    format!("unknown(0x{code:02x})")
}

/// A resolved control name
#[derive(Debug, Clone, PartialEq)]
pub struct Resolved {
    pub name: String,
    /// True if the name was found through the value-keyed second lookup. The
    /// event value is then the control's identity, not its magnitude.
    pub indirect: bool,
}

/// Resolves raw codes of one device profile to symbolic control names
#[derive(Debug, Clone, Default)]
pub struct CodeResolver {
    control_map: ControlMap,
    value_map: HashMap<i16, String>,
    indirection_groups: Vec<String>,
}

impl CodeResolver {
    pub fn new(
        control_map: ControlMap,
        value_map: HashMap<i16, String>,
        indirection_groups: Vec<String>,
    ) -> Self {
        Self {
            control_map,
            value_map,
            indirection_groups,
        }
    }

    pub fn control_map(&self) -> &ControlMap {
        &self.control_map
    }

    /// Resolve the given code to a symbolic name. Unknown codes never fail;
    /// they resolve to a placeholder such as "unknown(0x1f)".
    pub fn resolve(&self, code: u8, kind: EventKind, value: i16) -> Resolved {
        let name = match self.control_map.lookup(code, kind) {
            Ok(name) => name,
            Err(e) => {
                log::trace!("{e} ({kind:?})");
                return Resolved {
                    name: placeholder(code as u16),
                    indirect: false,
                };
            }
        };

        if !self.indirection_groups.iter().any(|group| group == name) {
            return Resolved {
                name: name.to_string(),
                indirect: false,
            };
        }

        // The identity of the control is carried in the value field
        let name = match self.value_map.get(&value) {
            Some(name) => name.clone(),
            None => {
                log::trace!("No name for value {value} in group {name}");
                placeholder(value as u16)
            }
        };
        Resolved {
            name,
            indirect: true,
        }
    }
}
