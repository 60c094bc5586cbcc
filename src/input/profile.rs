//! Runtime device profile resolved from a [ProfileConfig].
//!
//! A single session implementation serves every supported controller. What
//! differs between devices and transport modes lives here: event kind numbers,
//! code tables, analog ranges and vendor quirks.
use std::collections::{BTreeMap, HashMap};

use crate::{
    config::{ConfigError, ProfileConfig, Transport},
    drivers::joydev::event::KindTable,
    input::{
        actions::ActionKind,
        classify::DigitalQuirk,
        dispatch::ThrottleScale,
        normalize::{AnalogDomain, AxisClass},
        resolver::{CodeResolver, ControlMap, NameTable},
        source::DeviceCapabilities,
    },
};

/// Default name of the control whose value carries the button identity
pub const DEFAULT_INDIRECTION_GROUP: &str = "BUTTON";

/// Transport mode together with its defaults
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportMode {
    DirectInput,
    XInput,
    Joydev,
}

impl From<Transport> for TransportMode {
    fn from(transport: Transport) -> Self {
        match transport {
            Transport::DirectInput => TransportMode::DirectInput,
            Transport::XInput => TransportMode::XInput,
            Transport::Joydev => TransportMode::Joydev,
        }
    }
}

impl TransportMode {
    /// Returns the default (max, min, zero, epsilon) of analog sticks.
    ///
    /// The joystick interface rescales every axis to [-32767, 32767]. A
    /// DirectInput pad reports 0..=255, so one raw step becomes about 257 and
    /// the resting values 127 and 128 land on 0 and 257.
    pub fn default_domain(&self) -> (f64, f64, f64, f64) {
        match self {
            TransportMode::DirectInput => (32767.0, -32767.0, 0.0, 257.0),
            TransportMode::XInput => (32767.0, -32767.0, 0.0, 129.0),
            TransportMode::Joydev => (32767.0, -32767.0, 0.0, 0.0),
        }
    }
}

/// Where the names of raw codes come from
#[derive(Debug, Clone, PartialEq)]
pub enum CodeSource {
    /// Fixed index to name tables
    Static(ControlMap),
    /// Name table applied to the capability query of the bound device
    Capabilities(NameTable),
}

/// Everything the session needs to know about one kind of controller
#[derive(Debug, Clone)]
pub struct DeviceProfile {
    pub name: String,
    pub transport: TransportMode,
    pub search_term: String,
    pub kinds: KindTable,
    pub codes: CodeSource,
    pub value_map: HashMap<i16, String>,
    pub indirection_groups: Vec<String>,
    pub analog_sticks: Vec<String>,
    pub pass_through: Vec<String>,
    pub domain: AnalogDomain,
    pub digital_quirk: DigitalQuirk,
    pub misc_quirk: DigitalQuirk,
    pub suppress_init_events: bool,
    pub throttle: ThrottleScale,
    pub bindings: BTreeMap<String, ActionKind>,
}

impl TryFrom<&ProfileConfig> for DeviceProfile {
    type Error = ConfigError;

    fn try_from(config: &ProfileConfig) -> Result<Self, Self::Error> {
        let transport = TransportMode::from(config.transport);

        let search_term = config
            .device_search_term
            .clone()
            .ok_or_else(|| ConfigError::MissingField("device_search_term".to_string()))?;

        let codes = match (config.code_map.as_ref(), config.name_table.as_ref()) {
            (Some(map), _) => CodeSource::Static(map.clone()),
            (None, Some(names)) => CodeSource::Capabilities(names.clone()),
            (None, None) => {
                return Err(ConfigError::MissingField(
                    "code_map or name_table".to_string(),
                ))
            }
        };

        let (max, min, zero, epsilon) = transport.default_domain();
        let domain = AnalogDomain::new(
            config.analog_stick_max_value.unwrap_or(max),
            config.analog_stick_min_value.unwrap_or(min),
            config.analog_stick_zero_value.unwrap_or(zero),
            config.analog_stick_epsilon.unwrap_or(epsilon),
        )?;
        let domain = match config.analog_stick_dead_zone {
            Some([lo, hi]) => domain.with_band(lo, hi)?,
            None => domain,
        };

        let default_throttle = ThrottleScale::default();
        let throttle = ThrottleScale {
            scale: config.throttle_scale.unwrap_or(default_throttle.scale),
            increment: config
                .throttle_scale_increment
                .unwrap_or(default_throttle.increment),
            sign: config.axis_direction.unwrap_or(default_throttle.sign),
        };

        Ok(Self {
            name: config.name.clone(),
            transport,
            search_term,
            kinds: config.event_kinds.clone().unwrap_or_else(KindTable::joydev),
            codes,
            value_map: config
                .value_map
                .clone()
                .unwrap_or_default()
                .into_iter()
                .collect(),
            indirection_groups: config
                .indirection_groups
                .clone()
                .unwrap_or_else(|| vec![DEFAULT_INDIRECTION_GROUP.to_string()]),
            analog_sticks: config.analog_stick_target.clone().unwrap_or_default(),
            pass_through: config.dpad_target.clone().unwrap_or_default(),
            domain,
            digital_quirk: config.digital_quirk.unwrap_or_default(),
            misc_quirk: config.misc_quirk.unwrap_or(DigitalQuirk::PressOnly),
            suppress_init_events: config.suppress_init_events.unwrap_or(true),
            throttle,
            bindings: config.bindings.clone().unwrap_or_default(),
        })
    }
}

impl DeviceProfile {
    /// Returns true if the control map must be built from the capability query
    pub fn needs_capabilities(&self) -> bool {
        matches!(self.codes, CodeSource::Capabilities(_))
    }

    /// Build the control map for a bound device
    pub fn control_map(&self, caps: Option<&DeviceCapabilities>) -> Result<ControlMap, ConfigError> {
        match &self.codes {
            CodeSource::Static(map) => Ok(map.clone()),
            CodeSource::Capabilities(names) => {
                let caps = caps.ok_or_else(|| {
                    ConfigError::MissingField("code_map (device capabilities unavailable)".into())
                })?;
                Ok(ControlMap::from_capabilities(caps, names))
            }
        }
    }

    /// Create the code resolver for the given control map
    pub fn resolver(&self, control_map: ControlMap) -> CodeResolver {
        CodeResolver::new(
            control_map,
            self.value_map.clone(),
            self.indirection_groups.clone(),
        )
    }

    /// Returns how values of the given analog control are converted
    pub fn axis_class(&self, name: &str) -> AxisClass {
        if self.pass_through.iter().any(|target| target == name) {
            return AxisClass::PassThrough;
        }
        AxisClass::Analog(self.domain)
    }
}

#[cfg(test)]
mod tests {
    use std::error::Error;

    use super::*;
    use crate::drivers::joydev::event::EventKind;

    const MINIMAL: &str = r#"
version: 1
kind: DeviceProfile
name: Test
transport: x_input
device_search_term: test pad
code_map:
  analog:
    0: LEFT_STICK_X
    6: DPAD_X
"#;

    const TRI_STATE_DPAD: &str = r#"
version: 1
kind: DeviceProfile
name: Test
transport: direct_input
device_search_term: test pad
event_kinds:
  digital: [1]
  analog: [3]
  misc: [4]
code_map:
  analog:
    0: LEFT_STICK_X
    16: DPAD_X
dpad_target:
  - DPAD_X
"#;

    #[test]
    fn test_transport_defaults() -> Result<(), Box<dyn Error>> {
        let config = ProfileConfig::from_yaml(MINIMAL)?;
        let profile = DeviceProfile::try_from(&config)?;
        assert_eq!(profile.transport, TransportMode::XInput);
        assert_eq!(profile.kinds, KindTable::joydev());
        assert_eq!(profile.domain.max(), 32767.0);
        assert_eq!(profile.domain.min(), -32767.0);
        assert_eq!(profile.domain.epsilon(), 129.0);
        assert_eq!(profile.indirection_groups, vec!["BUTTON".to_string()]);
        assert_eq!(profile.misc_quirk, DigitalQuirk::PressOnly);
        assert_eq!(profile.digital_quirk, DigitalQuirk::Default);
        assert!(profile.suppress_init_events);
        assert_eq!(profile.throttle.sign, -1.0);
        // Pad axes are rescaled like sticks unless listed as tri-state
        assert_eq!(
            profile.axis_class("DPAD_X"),
            AxisClass::Analog(profile.domain)
        );
        assert_eq!(
            profile.axis_class("LEFT_STICK_X"),
            AxisClass::Analog(profile.domain)
        );
        Ok(())
    }

    #[test]
    fn test_direct_input_dead_zone() -> Result<(), Box<dyn Error>> {
        let mut config = ProfileConfig::from_yaml(MINIMAL)?;
        config.transport = Transport::DirectInput;
        let profile = DeviceProfile::try_from(&config)?;
        // Resting values 127 and 128 as rescaled by the joystick interface
        assert_eq!(profile.domain.normalize(0.0), 0.0);
        assert_eq!(profile.domain.normalize(257.0), 0.0);
        assert_eq!(profile.domain.normalize(32767.0), 1.0);
        Ok(())
    }

    #[test]
    fn test_tri_state_pass_through() -> Result<(), Box<dyn Error>> {
        let config = ProfileConfig::from_yaml(TRI_STATE_DPAD)?;
        let profile = DeviceProfile::try_from(&config)?;
        assert_eq!(profile.kinds.kind_of(0x03), EventKind::Analog);
        assert_eq!(profile.axis_class("DPAD_X"), AxisClass::PassThrough);
        assert_eq!(profile.axis_class("DPAD_X").convert(-1), -1.0);
        Ok(())
    }

    #[test]
    fn test_missing_fields() -> Result<(), Box<dyn Error>> {
        let mut config = ProfileConfig::from_yaml(MINIMAL)?;
        config.device_search_term = None;
        assert_eq!(
            DeviceProfile::try_from(&config).err(),
            Some(ConfigError::MissingField("device_search_term".to_string()))
        );

        let mut config = ProfileConfig::from_yaml(MINIMAL)?;
        config.code_map = None;
        assert!(matches!(
            DeviceProfile::try_from(&config),
            Err(ConfigError::MissingField(_))
        ));
        Ok(())
    }

    #[test]
    fn test_invalid_domain() -> Result<(), Box<dyn Error>> {
        let mut config = ProfileConfig::from_yaml(MINIMAL)?;
        config.analog_stick_zero_value = Some(40000.0);
        assert!(matches!(
            DeviceProfile::try_from(&config),
            Err(ConfigError::InvalidDomain(_))
        ));
        Ok(())
    }

    #[test]
    fn test_capability_code_source() -> Result<(), Box<dyn Error>> {
        let mut config = ProfileConfig::from_yaml(MINIMAL)?;
        config.code_map = None;
        config.name_table = Some(NameTable {
            axes: BTreeMap::from([(0, "LEFT_STICK_X".to_string())]),
            buttons: BTreeMap::new(),
        });
        let profile = DeviceProfile::try_from(&config)?;
        assert!(profile.needs_capabilities());
        assert!(profile.control_map(None).is_err());

        let caps = DeviceCapabilities {
            name: "test pad".to_string(),
            axis_count: 1,
            button_count: 0,
            axis_codes: vec![0],
            button_codes: vec![],
        };
        let map = profile.control_map(Some(&caps))?;
        assert_eq!(map.analog.get(&0).map(String::as_str), Some("LEFT_STICK_X"));
        Ok(())
    }
}
