//! Device session driving the blocking read loop of one controller.
//!
//! The session binds to the single device matching the profile's search term,
//! then processes one raw record per iteration: decode, resolve the control
//! name, convert the value and dispatch it. When a read fails the session
//! drops the device and polls discovery until the controller is back. The
//! control map, the bindings and the [ControlState] survive reconnects.
//!
//! ```text
//! Unbound -> Open -> Reading <-> Reconnecting
//!                       \            /
//!                        -> Closed <-
//! ```
use std::{
    fmt,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
    thread,
    time::Duration,
};

use thiserror::Error;

use crate::{
    config::ConfigError,
    drivers::joydev::{
        event::{decode, EventKind},
        js_report::JS_EVENT_SIZE,
    },
    input::{
        classify::classify,
        dispatch::{ControlState, ControlValue, DispatchTable},
        profile::DeviceProfile,
        resolver::CodeResolver,
        source::{
            find_device_by_path, DeviceDiscovery, DeviceError, DeviceInfo, SourceInputDevice,
        },
    },
};

/// Errors that end a session
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("Device error: {0}")]
    Device(#[from] DeviceError),
    #[error("Invalid profile: {0}")]
    Config(#[from] ConfigError),
}

/// Lifecycle state of a [DeviceSession]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// No device has been bound yet
    Unbound,
    /// A device was found and opened, nothing has been read yet
    Open,
    Reading,
    /// The connection was lost and discovery is being polled
    Reconnecting,
    Closed,
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = match self {
            SessionState::Unbound => "unbound",
            SessionState::Open => "open",
            SessionState::Reading => "reading",
            SessionState::Reconnecting => "reconnecting",
            SessionState::Closed => "closed",
        };
        write!(f, "{state}")
    }
}

/// Timing of the session
#[derive(Debug, Clone)]
pub struct SessionOptions {
    /// Delay after a lost connection before discovery starts
    pub reconnect_backoff: Duration,
    /// Interval between discovery attempts
    pub retry_interval: Duration,
    /// Delay honored when the session closes
    pub shutdown_grace: Duration,
    /// Bind the device at this path instead of searching by name
    pub device_path: Option<String>,
    /// Log every dispatched control value
    pub verbose: bool,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            reconnect_backoff: Duration::from_millis(100),
            retry_interval: Duration::from_secs(3),
            shutdown_grace: Duration::from_millis(100),
            device_path: None,
            verbose: false,
        }
    }
}

/// Requests a session to stop. The flag is checked between iterations, so a
/// read that is already blocking is not interrupted.
#[derive(Debug, Clone, Default)]
pub struct ShutdownHandle {
    flag: Arc<AtomicBool>,
}

impl ShutdownHandle {
    pub fn shutdown(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    pub fn is_shutdown(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }
}

/// Outcome of a single session iteration
#[derive(Debug, Clone, PartialEq)]
pub enum Step {
    /// A control value was recorded and its action invoked
    Dispatched { name: String, value: ControlValue },
    /// The record was read but dropped (malformed, replayed or unknown kind)
    Discarded,
    /// The read failed and the session is now reconnecting
    ConnectionLost,
    Closed,
}

/// Session over one controller described by a [DeviceProfile]
pub struct DeviceSession<D: DeviceDiscovery> {
    discovery: D,
    profile: DeviceProfile,
    options: SessionOptions,
    state: SessionState,
    device: Option<D::Device>,
    info: Option<DeviceInfo>,
    resolver: Option<CodeResolver>,
    dispatch: DispatchTable,
    shutdown: ShutdownHandle,
}

impl<D: DeviceDiscovery> DeviceSession<D> {
    pub fn new(
        discovery: D,
        profile: DeviceProfile,
        dispatch: DispatchTable,
        options: SessionOptions,
    ) -> Self {
        Self {
            discovery,
            profile,
            options,
            state: SessionState::Unbound,
            device: None,
            info: None,
            resolver: None,
            dispatch,
            shutdown: ShutdownHandle::default(),
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn profile(&self) -> &DeviceProfile {
        &self.profile
    }

    /// Returns the currently bound device, if any
    pub fn device_info(&self) -> Option<&DeviceInfo> {
        self.info.as_ref()
    }

    /// Returns a handle to the last known control values
    pub fn control_state(&self) -> ControlState {
        self.dispatch.state().clone()
    }

    pub fn dispatch_table(&self) -> &DispatchTable {
        &self.dispatch
    }

    /// Returns a handle that can stop this session from another thread
    pub fn shutdown_handle(&self) -> ShutdownHandle {
        self.shutdown.clone()
    }

    /// Find the device to bind, by path if one was given
    fn locate(&self) -> Result<DeviceInfo, DeviceError> {
        match self.options.device_path.as_ref() {
            Some(path) => find_device_by_path(&self.discovery.list()?, path),
            None => self.discovery.find(&self.profile.search_term),
        }
    }

    /// Find, open and bind the device. A missing device is waited for; more
    /// than one matching device, a device that cannot be opened or a profile
    /// that cannot be applied to the device is fatal.
    pub fn bind(&mut self) -> Result<(), SessionError> {
        if self.state != SessionState::Unbound {
            return Ok(());
        }
        log::info!("Looking for device matching '{}'", self.profile.search_term);

        let info = loop {
            match self.locate() {
                Ok(info) => break info,
                Err(e @ DeviceError::NotFound { .. }) => {
                    log::info!("{e}. Retrying in {:?}", self.options.retry_interval);
                }
                Err(e) => {
                    log::error!("Unable to bind device: {e}");
                    return Err(e.into());
                }
            }
            if self.shutdown.is_shutdown() {
                self.close();
                return Ok(());
            }
            thread::sleep(self.options.retry_interval);
        };

        let mut device = self.discovery.open(&info)?;
        let caps = if self.profile.needs_capabilities() {
            Some(device.capabilities()?)
        } else {
            None
        };
        let control_map = self.profile.control_map(caps.as_ref())?;
        log::debug!("Using control map: {control_map:?}");

        log::info!("Bound device '{}' at {}", info.name, info.path);
        self.resolver = Some(self.profile.resolver(control_map));
        self.device = Some(device);
        self.info = Some(info);
        self.state = SessionState::Open;
        Ok(())
    }

    /// Run a single iteration of the session
    pub fn step(&mut self) -> Result<Step, SessionError> {
        if self.shutdown.is_shutdown() {
            self.close();
        }

        match self.state {
            SessionState::Closed => return Ok(Step::Closed),
            SessionState::Unbound => self.bind()?,
            SessionState::Reconnecting => self.reconnect()?,
            SessionState::Open | SessionState::Reading => (),
        }

        // Binding or reconnecting may have observed a shutdown request
        if self.state == SessionState::Closed {
            return Ok(Step::Closed);
        }
        self.state = SessionState::Reading;

        let Some(device) = self.device.as_mut() else {
            self.state = SessionState::Reconnecting;
            return Ok(Step::ConnectionLost);
        };

        let mut buf = [0u8; JS_EVENT_SIZE];
        let read = match device.read_record(&mut buf) {
            Ok(read) => read,
            Err(e) => {
                log::warn!("{e}");
                self.device = None;
                self.state = SessionState::Reconnecting;
                thread::sleep(self.options.reconnect_backoff);
                return Ok(Step::ConnectionLost);
            }
        };

        Ok(self.process(&buf[..read]))
    }

    /// Decode, resolve and dispatch one raw record
    fn process(&mut self, record: &[u8]) -> Step {
        let event = match decode(record, &self.profile.kinds) {
            Ok(event) => event,
            Err(e) => {
                log::warn!("Discarding record: {e}");
                return Step::Discarded;
            }
        };
        log::trace!("Got event: {event:?}");

        if event.init && self.profile.suppress_init_events {
            log::trace!("Suppressing initial state event: {event:?}");
            return Step::Discarded;
        }
        if let EventKind::Unknown(event_type) = event.kind {
            log::warn!("Ignoring event with unknown type {event_type:#04x}: {event:?}");
            return Step::Discarded;
        }

        let Some(resolver) = self.resolver.as_ref() else {
            return Step::Discarded;
        };
        let resolved = resolver.resolve(event.code, event.kind, event.value);

        if resolved.indirect && event.value == 0 {
            // A zero value identifies no control, it is the release of one
            log::trace!("Ignoring release of value-identified control: {event:?}");
            return Step::Discarded;
        }
        let value = if resolved.indirect {
            // The raw value identified the control, it carries no magnitude
            ControlValue::Digital(1)
        } else {
            match event.kind {
                EventKind::Analog => {
                    let class = self.profile.axis_class(&resolved.name);
                    ControlValue::Analog(class.convert(event.value))
                }
                EventKind::Digital => {
                    ControlValue::Digital(classify(event.value, self.profile.digital_quirk))
                }
                EventKind::Misc => {
                    ControlValue::Digital(classify(event.value, self.profile.misc_quirk))
                }
                EventKind::Unknown(_) => return Step::Discarded,
            }
        };

        if self.options.verbose {
            log::info!("{} => {value}", resolved.name);
        }
        self.dispatch.dispatch(&resolved.name, value);

        Step::Dispatched {
            name: resolved.name,
            value,
        }
    }

    /// Poll discovery until the device is back. The control map, bindings and
    /// control state are kept as they are.
    fn reconnect(&mut self) -> Result<(), SessionError> {
        loop {
            if self.shutdown.is_shutdown() {
                self.close();
                return Ok(());
            }

            match self
                .locate()
                .and_then(|info| self.discovery.open(&info).map(|device| (info, device)))
            {
                Ok((info, device)) => {
                    log::info!("Reconnected device '{}' at {}", info.name, info.path);
                    self.device = Some(device);
                    self.info = Some(info);
                    self.state = SessionState::Reading;
                    return Ok(());
                }
                Err(e @ DeviceError::Ambiguous { .. }) => {
                    log::error!("Unable to reconnect device: {e}");
                    return Err(e.into());
                }
                Err(e) => {
                    log::debug!("Device not available yet: {e}");
                }
            }
            thread::sleep(self.options.retry_interval);
        }
    }

    /// Run the session until it is shut down or a fatal error occurs
    pub fn run(&mut self) -> Result<(), SessionError> {
        log::info!("Starting session for profile '{}'", self.profile.name);
        loop {
            if let Step::Closed = self.step()? {
                break;
            }
        }
        log::info!("Session for profile '{}' stopped", self.profile.name);
        Ok(())
    }

    /// Stop reading from the device and release it. Honors the shutdown
    /// grace delay on the first call.
    pub fn close(&mut self) {
        if self.state == SessionState::Closed {
            return;
        }
        log::info!("Closing session ({})", self.state);
        self.shutdown.shutdown();
        self.device = None;
        self.state = SessionState::Closed;
        thread::sleep(self.options.shutdown_grace);
    }
}

impl<D: DeviceDiscovery> fmt::Debug for DeviceSession<D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DeviceSession")
            .field("profile", &self.profile.name)
            .field("state", &self.state)
            .field("device", &self.info)
            .finish()
    }
}
