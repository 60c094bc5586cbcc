use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Vendor specific behavior of digital controls
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum DigitalQuirk {
    /// Nonzero values are presses, zero is a release
    #[default]
    Default,
    /// The device never reports a release, so every event is a press
    PressOnly,
}

/// Convert a raw digital value into 0 (released) or 1 (pressed). Releases are
/// never synthesized.
pub fn classify(raw_value: i16, quirk: DigitalQuirk) -> u8 {
    match quirk {
        DigitalQuirk::PressOnly => 1,
        DigitalQuirk::Default => u8::from(raw_value != 0),
    }
}
