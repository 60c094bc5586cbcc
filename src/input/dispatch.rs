//! Dispatch of canonical control values to bound actions.
//!
//! Every dispatched value is first recorded in the shared [ControlState], then
//! the action bound to the control name (if any) is invoked with it.
use std::{
    collections::HashMap,
    fmt,
    sync::{Arc, Mutex, MutexGuard, PoisonError},
};

/// Canonical value of a control
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ControlValue {
    /// 0 (released) or 1 (pressed)
    Digital(u8),
    /// Normalized analog value, nominally within [-1.0, 1.0]
    Analog(f64),
}

impl ControlValue {
    pub fn as_f64(&self) -> f64 {
        match self {
            ControlValue::Digital(value) => *value as f64,
            ControlValue::Analog(value) => *value,
        }
    }

    /// Returns true if this is a digital press
    pub fn is_pressed(&self) -> bool {
        matches!(self, ControlValue::Digital(1))
    }
}

impl fmt::Display for ControlValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ControlValue::Digital(value) => write!(f, "{value}"),
            ControlValue::Analog(value) => write!(f, "{value:.4}"),
        }
    }
}

/// Last known value of every control, readable by external pollers. Cloning
/// the state produces another handle to the same map.
#[derive(Debug, Clone, Default)]
pub struct ControlState {
    values: Arc<Mutex<HashMap<String, ControlValue>>>,
}

impl ControlState {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, ControlValue>> {
        // Values are plain data, so a panic in another holder cannot leave
        // the map half updated.
        self.values.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn get(&self, name: &str) -> Option<ControlValue> {
        self.lock().get(name).copied()
    }

    pub fn set(&self, name: &str, value: ControlValue) {
        self.lock().insert(name.to_string(), value);
    }

    /// Returns a copy of all values. Each value is consistent on its own;
    /// the copy as a whole is not an atomic snapshot across controls.
    pub fn snapshot(&self) -> HashMap<String, ControlValue> {
        self.lock().clone()
    }

    /// Forget the value of the given control. This is the only way a
    /// press-only control returns to a released state.
    pub fn reset(&self, name: &str) -> Option<ControlValue> {
        self.lock().remove(name)
    }

    pub fn reset_all(&self) {
        self.lock().clear();
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }
}

/// Callback bound to a control name
pub type Action = Box<dyn FnMut(ControlValue) + Send>;

/// What happens when a bound control is dispatched
pub enum Binding {
    /// Invoke the action with the canonical value
    Callback(Action),
    /// Invoke the action with `value * scale * sign`
    Throttle(Action),
    /// Raise the throttle scale by its increment on press
    IncrementScale,
    /// Lower the throttle scale by its increment on press
    DecrementScale,
}

impl fmt::Debug for Binding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Binding::Callback(_) => write!(f, "Callback"),
            Binding::Throttle(_) => write!(f, "Throttle"),
            Binding::IncrementScale => write!(f, "IncrementScale"),
            Binding::DecrementScale => write!(f, "DecrementScale"),
        }
    }
}

/// Throttle scaling applied to throttle bindings. The scale is unbounded and
/// may become negative.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ThrottleScale {
    pub scale: f64,
    pub increment: f64,
    /// Axis direction, usually -1 so that pushing the stick forward is positive
    pub sign: f64,
}

impl Default for ThrottleScale {
    fn default() -> Self {
        Self {
            scale: 1.0,
            increment: 0.05,
            sign: -1.0,
        }
    }
}

impl ThrottleScale {
    pub fn apply(&self, value: f64) -> f64 {
        value * self.scale * self.sign
    }
}

/// Immutable mapping of control names to bindings
pub struct DispatchTable {
    bindings: HashMap<String, Binding>,
    throttle: ThrottleScale,
    state: ControlState,
}

impl fmt::Debug for DispatchTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DispatchTable")
            .field("bindings", &self.bindings)
            .field("throttle", &self.throttle)
            .finish()
    }
}

impl DispatchTable {
    pub fn new(bindings: HashMap<String, Binding>, throttle: ThrottleScale) -> Self {
        Self {
            bindings,
            throttle,
            state: ControlState::new(),
        }
    }

    /// Use the given shared state instead of a private one
    pub fn with_state(mut self, state: ControlState) -> Self {
        self.state = state;
        self
    }

    pub fn state(&self) -> &ControlState {
        &self.state
    }

    pub fn throttle_scale(&self) -> f64 {
        self.throttle.scale
    }

    pub fn is_bound(&self, name: &str) -> bool {
        self.bindings.contains_key(name)
    }

    /// Record the value of the given control and invoke its bound action
    pub fn dispatch(&mut self, name: &str, value: ControlValue) {
        self.state.set(name, value);

        let Some(binding) = self.bindings.get_mut(name) else {
            return;
        };
        match binding {
            Binding::Callback(action) => action(value),
            Binding::Throttle(action) => {
                let effective = self.throttle.apply(value.as_f64());
                log::trace!("Throttle {value} * {} => {effective}", self.throttle.scale);
                action(ControlValue::Analog(effective));
            }
            Binding::IncrementScale => {
                if value.is_pressed() {
                    self.throttle.scale += self.throttle.increment;
                    log::info!("Throttle scale: {:.2}", self.throttle.scale);
                }
            }
            Binding::DecrementScale => {
                if value.is_pressed() {
                    self.throttle.scale -= self.throttle.increment;
                    log::info!("Throttle scale: {:.2}", self.throttle.scale);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::mpsc;

    use super::*;

    fn recorder() -> (Action, mpsc::Receiver<ControlValue>) {
        let (tx, rx) = mpsc::channel();
        let action: Action = Box::new(move |value| {
            let _ = tx.send(value);
        });
        (action, rx)
    }

    #[test]
    fn test_press_only_invokes_twice() {
        let (action, rx) = recorder();
        let bindings = HashMap::from([("X".to_string(), Binding::Callback(action))]);
        let mut table = DispatchTable::new(bindings, ThrottleScale::default());

        table.dispatch("X", ControlValue::Digital(1));
        table.dispatch("X", ControlValue::Digital(1));

        let received: Vec<ControlValue> = rx.try_iter().collect();
        assert_eq!(received, vec![ControlValue::Digital(1); 2]);
        assert_eq!(table.state().get("X"), Some(ControlValue::Digital(1)));
    }

    #[test]
    fn test_throttle_scale() {
        let (action, rx) = recorder();
        let bindings = HashMap::from([
            ("RIGHT_STICK_Y".to_string(), Binding::Throttle(action)),
            ("R1".to_string(), Binding::IncrementScale),
        ]);
        let throttle = ThrottleScale {
            scale: 1.0,
            increment: 0.05,
            sign: -1.0,
        };
        let mut table = DispatchTable::new(bindings, throttle);

        table.dispatch("RIGHT_STICK_Y", ControlValue::Analog(0.5));
        table.dispatch("R1", ControlValue::Digital(1));
        table.dispatch("RIGHT_STICK_Y", ControlValue::Analog(0.5));

        let received: Vec<f64> = rx.try_iter().map(|v| v.as_f64()).collect();
        assert_eq!(received.len(), 2);
        assert!((received[0] + 0.5).abs() < 1e-9);
        assert!((received[1] + 0.525).abs() < 1e-9);
        // The state holds the canonical value, not the scaled one
        assert_eq!(
            table.state().get("RIGHT_STICK_Y"),
            Some(ControlValue::Analog(0.5))
        );
    }

    #[test]
    fn test_scale_changes_on_press_only() {
        let bindings = HashMap::from([("L1".to_string(), Binding::DecrementScale)]);
        let mut table = DispatchTable::new(bindings, ThrottleScale::default());
        table.dispatch("L1", ControlValue::Digital(0));
        assert_eq!(table.throttle_scale(), 1.0);
        for _ in 0..30 {
            table.dispatch("L1", ControlValue::Digital(1));
        }
        assert!(table.throttle_scale() < 0.0);
    }

    #[test]
    fn test_unbound_controls_update_state() {
        let state = ControlState::new();
        let mut table =
            DispatchTable::new(HashMap::new(), ThrottleScale::default()).with_state(state.clone());
        table.dispatch("unknown(0x1f)", ControlValue::Analog(0.25));
        assert_eq!(state.get("unknown(0x1f)"), Some(ControlValue::Analog(0.25)));
        assert_eq!(state.reset("unknown(0x1f)"), Some(ControlValue::Analog(0.25)));
        assert!(state.is_empty());
    }
}
