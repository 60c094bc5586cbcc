pub mod path;

use std::{
    collections::BTreeMap,
    io,
    path::{Path, PathBuf},
};

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{
    drivers::joydev::event::KindTable,
    input::{
        actions::ActionKind,
        classify::DigitalQuirk,
        resolver::{ControlMap, NameTable},
        source::{find_device, DeviceInfo},
    },
};

/// Represents all possible errors loading a [ProfileConfig]
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("Could not read: {0}")]
    IoError(#[from] io::Error),
    #[error("Unable to deserialize: {0}")]
    DeserializeError(#[from] serde_yaml::Error),
}

/// Errors in the contents of a profile
#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("Missing required field: {0}")]
    MissingField(String),
    #[error("Invalid analog domain: {0}")]
    InvalidDomain(String),
    #[error("Unknown action: {0}")]
    UnknownAction(String),
}

/// Mode the physical controller reports in. Events are always read through
/// the joystick interface, the mode only selects the analog dead zone default.
#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum Transport {
    /// Generic HID pad with 8-bit axes (e.g. F710 switched to "D")
    DirectInput,
    /// XInput pad with 16-bit axes (e.g. F710 switched to "X")
    XInput,
    /// Any other joystick, no dead zone by default
    Joydev,
}

/// Device profile as written in a YAML file
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub struct ProfileConfig {
    pub version: u32,
    pub kind: String,
    pub name: String,
    pub description: Option<String>,
    pub transport: Transport,
    /// Case-insensitive substring of the device name
    pub device_search_term: Option<String>,
    /// Event type numbers, defaults to the joystick interface numbering
    pub event_kinds: Option<KindTable>,
    /// Static index to name mapping per event kind
    pub code_map: Option<ControlMap>,
    /// Raw axis/button code names combined with the device capability query
    pub name_table: Option<NameTable>,
    pub value_map: Option<BTreeMap<i16, String>>,
    pub indirection_groups: Option<Vec<String>>,
    pub analog_stick_target: Option<Vec<String>>,
    pub dpad_target: Option<Vec<String>>,
    pub analog_stick_max_value: Option<f64>,
    pub analog_stick_min_value: Option<f64>,
    pub analog_stick_zero_value: Option<f64>,
    pub analog_stick_epsilon: Option<f64>,
    pub analog_stick_dead_zone: Option<[f64; 2]>,
    pub digital_quirk: Option<DigitalQuirk>,
    pub misc_quirk: Option<DigitalQuirk>,
    pub suppress_init_events: Option<bool>,
    pub axis_direction: Option<f64>,
    pub throttle_scale: Option<f64>,
    pub throttle_scale_increment: Option<f64>,
    pub bindings: Option<BTreeMap<String, ActionKind>>,
}

impl ProfileConfig {
    /// Load a [ProfileConfig] from the given YAML string
    pub fn from_yaml(content: &str) -> Result<ProfileConfig, LoadError> {
        let profile: ProfileConfig = serde_yaml::from_str(content)?;
        Ok(profile)
    }

    /// Load a [ProfileConfig] from the given YAML file
    pub fn from_yaml_path(path: &Path) -> Result<ProfileConfig, LoadError> {
        let file = std::fs::File::open(path)?;
        let profile: ProfileConfig = serde_yaml::from_reader(file)?;
        Ok(profile)
    }

    /// Returns true if the search term of this profile matches exactly one of
    /// the given devices
    pub fn matches(&self, devices: &[DeviceInfo]) -> bool {
        let Some(term) = self.device_search_term.as_ref() else {
            return false;
        };
        find_device(devices, term).is_ok()
    }
}

/// Load every profile found in the profile directories. Files that fail to
/// load are logged and skipped.
pub fn load_profiles() -> Vec<(PathBuf, ProfileConfig)> {
    load_profiles_from(&path::get_profiles_paths())
}

/// Load every profile found in the given directories, sorted by filename
pub fn load_profiles_from(paths: &[PathBuf]) -> Vec<(PathBuf, ProfileConfig)> {
    let files = path::get_multidir_sorted_files(paths, |entry| {
        let name = entry.file_name();
        let name = name.to_string_lossy();
        name.ends_with(".yaml") || name.ends_with(".yml")
    });

    let mut profiles: Vec<(PathBuf, ProfileConfig)> = Vec::with_capacity(files.len());
    for file in files {
        // A file earlier in the load order shadows files of the same name
        if profiles
            .iter()
            .any(|(loaded, _)| loaded.file_name() == file.file_name())
        {
            log::debug!("Skipping shadowed profile: {file:?}");
            continue;
        }
        match ProfileConfig::from_yaml_path(&file) {
            Ok(profile) => {
                log::debug!("Loaded profile '{}' from {file:?}", profile.name);
                profiles.push((file, profile));
            }
            Err(e) => log::warn!("Failed to load profile {file:?}: {e}"),
        }
    }

    profiles
}

/// Returns the first profile in preference order whose search term matches a
/// currently present device.
pub fn select_profile<'a>(
    preference: &'a [ProfileConfig],
    devices: &[DeviceInfo],
) -> Option<&'a ProfileConfig> {
    let selected = preference.iter().find(|profile| profile.matches(devices));
    if let Some(profile) = selected {
        log::info!("Selected profile '{}'", profile.name);
    }
    selected
}
