//! Built-in controller part actions and the outputs they maintain.
use std::{
    collections::HashMap,
    fmt,
    str::FromStr,
    sync::{Arc, Mutex, MutexGuard, PoisonError},
};

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::config::ConfigError;

use super::dispatch::Binding;

/// Who is in control of the vehicle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum DriveMode {
    /// Steering and throttle from the user
    #[default]
    User,
    /// Steering from the pilot, throttle from the user
    LocalAngle,
    /// Steering and throttle from the pilot
    Local,
}

impl DriveMode {
    /// Returns the next mode in the toggle cycle
    pub fn next(self) -> Self {
        match self {
            DriveMode::User => DriveMode::LocalAngle,
            DriveMode::LocalAngle => DriveMode::Local,
            DriveMode::Local => DriveMode::User,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            DriveMode::User => "user",
            DriveMode::LocalAngle => "local_angle",
            DriveMode::Local => "local",
        }
    }
}

impl fmt::Display for DriveMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Values polled by the vehicle loop
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PartOutputs {
    pub angle: f64,
    pub throttle: f64,
    pub drive_mode: DriveMode,
    pub recording: bool,
}

impl Default for PartOutputs {
    fn default() -> Self {
        Self {
            angle: 0.0,
            throttle: 0.0,
            drive_mode: DriveMode::User,
            recording: true,
        }
    }
}

/// Action names usable in the `bindings` table of a profile
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum ActionKind {
    UpdateAngle,
    UpdateThrottle,
    ToggleRecording,
    ToggleDriveMode,
    IncrementThrottleScale,
    DecrementThrottleScale,
}

impl ActionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ActionKind::UpdateAngle => "update_angle",
            ActionKind::UpdateThrottle => "update_throttle",
            ActionKind::ToggleRecording => "toggle_recording",
            ActionKind::ToggleDriveMode => "toggle_drive_mode",
            ActionKind::IncrementThrottleScale => "increment_throttle_scale",
            ActionKind::DecrementThrottleScale => "decrement_throttle_scale",
        }
    }
}

impl FromStr for ActionKind {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let kind = match s {
            "update_angle" => ActionKind::UpdateAngle,
            "update_throttle" => ActionKind::UpdateThrottle,
            "toggle_recording" => ActionKind::ToggleRecording,
            "toggle_drive_mode" => ActionKind::ToggleDriveMode,
            "increment_throttle_scale" => ActionKind::IncrementThrottleScale,
            "decrement_throttle_scale" => ActionKind::DecrementThrottleScale,
            _ => return Err(ConfigError::UnknownAction(s.to_string())),
        };
        Ok(kind)
    }
}

impl fmt::Display for ActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Controller part whose outputs are updated by the bound actions and read by
/// the vehicle loop from another thread.
#[derive(Debug, Clone, Default)]
pub struct ControllerPart {
    outputs: Arc<Mutex<PartOutputs>>,
}

impl ControllerPart {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, PartOutputs> {
        self.outputs.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn outputs(&self) -> PartOutputs {
        *self.lock()
    }

    /// Returns the current (angle, throttle, drive_mode, recording)
    pub fn run_threaded(&self) -> (f64, f64, DriveMode, bool) {
        let outputs = self.lock();
        (
            outputs.angle,
            outputs.throttle,
            outputs.drive_mode,
            outputs.recording,
        )
    }

    /// Create the dispatch binding for the given action
    pub fn binding(&self, kind: ActionKind) -> Binding {
        let part = self.clone();
        match kind {
            ActionKind::UpdateAngle => Binding::Callback(Box::new(move |value| {
                part.lock().angle = value.as_f64();
            })),
            ActionKind::UpdateThrottle => Binding::Throttle(Box::new(move |value| {
                part.lock().throttle = value.as_f64();
            })),
            ActionKind::ToggleRecording => Binding::Callback(Box::new(move |value| {
                if !value.is_pressed() {
                    return;
                }
                let mut outputs = part.lock();
                outputs.recording = !outputs.recording;
                log::info!("Recording: {}", outputs.recording);
            })),
            ActionKind::ToggleDriveMode => Binding::Callback(Box::new(move |value| {
                if !value.is_pressed() {
                    return;
                }
                let mut outputs = part.lock();
                outputs.drive_mode = outputs.drive_mode.next();
                log::info!("Drive mode: {}", outputs.drive_mode);
            })),
            ActionKind::IncrementThrottleScale => Binding::IncrementScale,
            ActionKind::DecrementThrottleScale => Binding::DecrementScale,
        }
    }

    /// Create dispatch bindings for the given control name to action table
    pub fn bindings<'a, I>(&self, table: I) -> HashMap<String, Binding>
    where
        I: IntoIterator<Item = (&'a String, &'a ActionKind)>,
    {
        table
            .into_iter()
            .map(|(name, kind)| (name.clone(), self.binding(*kind)))
            .collect()
    }
}
