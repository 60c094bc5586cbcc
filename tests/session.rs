use std::{
    collections::VecDeque,
    error::Error,
    fs, io,
    path::Path,
    sync::Mutex,
    thread,
    time::Duration,
};

use joypart::{
    config::{ProfileConfig, Transport},
    input::{
        actions::{ControllerPart, DriveMode},
        dispatch::{ControlValue, DispatchTable},
        profile::DeviceProfile,
        session::{DeviceSession, SessionOptions, SessionState, Step},
        source::{
            DeviceCapabilities, DeviceDiscovery, DeviceError, DeviceInfo, IoError,
            SourceInputDevice,
        },
    },
};

const PROFILE_DIR: &str = "./rootfs/usr/share/joypart/profiles";
const ELECOM_PROFILE: &str = "./rootfs/usr/share/joypart/profiles/30-elecom_jc_u3912t.yaml";
const XBOX_PROFILE: &str = "./rootfs/usr/share/joypart/profiles/40-xbox360_joydev.yaml";

const JS_EVENT_BUTTON: u8 = 0x01;
const JS_EVENT_AXIS: u8 = 0x02;

/// Capabilities of a generic HID pad (F710 in "D" mode, JC-U3912T)
fn hid_pad_capabilities(name: &str) -> DeviceCapabilities {
    DeviceCapabilities {
        name: name.to_string(),
        axis_count: 6,
        button_count: 12,
        axis_codes: vec![0x00, 0x01, 0x02, 0x05, 0x10, 0x11],
        button_codes: (0x120..=0x12b).collect(),
    }
}

/// Capabilities of an xpad driven pad
fn xpad_capabilities(name: &str) -> DeviceCapabilities {
    DeviceCapabilities {
        name: name.to_string(),
        axis_count: 8,
        button_count: 11,
        axis_codes: vec![0x00, 0x01, 0x02, 0x03, 0x04, 0x05, 0x10, 0x11],
        button_codes: vec![
            0x130, 0x131, 0x133, 0x134, 0x136, 0x137, 0x13a, 0x13b, 0x13c, 0x13d, 0x13e,
        ],
    }
}

fn record(value: i16, kind_flags: u8, code: u8) -> Option<[u8; 8]> {
    let mut buf = [0u8; 8];
    buf[4..6].copy_from_slice(&value.to_le_bytes());
    buf[6] = kind_flags;
    buf[7] = code;
    Some(buf)
}

/// Device replaying a fixed list of records. `None` fails the read.
struct ReplayDevice {
    records: VecDeque<Option<[u8; 8]>>,
    capabilities: DeviceCapabilities,
}

impl SourceInputDevice for ReplayDevice {
    fn read_record(&mut self, buf: &mut [u8]) -> Result<usize, IoError> {
        match self.records.pop_front().flatten() {
            Some(record) => {
                buf[..8].copy_from_slice(&record);
                Ok(8)
            }
            None => Err(io::Error::from(io::ErrorKind::NotConnected).into()),
        }
    }

    fn capabilities(&mut self) -> Result<DeviceCapabilities, DeviceError> {
        Ok(self.capabilities.clone())
    }
}

struct ReplayDiscovery {
    name: String,
    capabilities: DeviceCapabilities,
    connections: Mutex<VecDeque<Vec<Option<[u8; 8]>>>>,
}

impl ReplayDiscovery {
    fn new(name: &str, connections: Vec<Vec<Option<[u8; 8]>>>) -> Self {
        Self {
            name: name.to_string(),
            capabilities: DeviceCapabilities::default(),
            connections: Mutex::new(connections.into()),
        }
    }

    fn with_capabilities(mut self, capabilities: DeviceCapabilities) -> Self {
        self.capabilities = capabilities;
        self
    }
}

impl DeviceDiscovery for ReplayDiscovery {
    type Device = ReplayDevice;

    fn list(&self) -> Result<Vec<DeviceInfo>, DeviceError> {
        if self.connections.lock().unwrap().is_empty() {
            return Ok(vec![]);
        }
        Ok(vec![DeviceInfo {
            path: "/dev/input/js0".to_string(),
            name: self.name.clone(),
        }])
    }

    fn open(&self, _info: &DeviceInfo) -> Result<Self::Device, DeviceError> {
        let records = self
            .connections
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_default();
        Ok(ReplayDevice {
            records: records.into(),
            capabilities: self.capabilities.clone(),
        })
    }
}

fn options() -> SessionOptions {
    SessionOptions {
        reconnect_backoff: Duration::ZERO,
        retry_interval: Duration::from_millis(1),
        shutdown_grace: Duration::ZERO,
        device_path: None,
        verbose: true,
    }
}

fn load(path: &str) -> Result<DeviceProfile, Box<dyn Error>> {
    let config = ProfileConfig::from_yaml_path(Path::new(path))?;
    Ok(DeviceProfile::try_from(&config)?)
}

#[test]
fn test_elecom_part_outputs() -> Result<(), Box<dyn Error>> {
    let profile = load(ELECOM_PROFILE)?;
    let part = ControllerPart::new();
    let dispatch = DispatchTable::new(part.bindings(&profile.bindings), profile.throttle);

    let connection = vec![
        // Left stick fully right
        record(32767, JS_EVENT_AXIS, 0),
        // Right stick half way up
        record(-16384, JS_EVENT_AXIS, 2),
        // Button "4" twice: user -> local_angle -> local
        record(1, JS_EVENT_BUTTON, 3),
        record(0, JS_EVENT_BUTTON, 3),
        record(1, JS_EVENT_BUTTON, 3),
        record(0, JS_EVENT_BUTTON, 3),
        // Button "2" raises the throttle scale
        record(1, JS_EVENT_BUTTON, 1),
        record(-16384, JS_EVENT_AXIS, 2),
        // Dpad left
        record(-32767, JS_EVENT_AXIS, 4),
    ];
    let discovery = ReplayDiscovery::new("SMART JC-U3912T", vec![connection])
        .with_capabilities(hid_pad_capabilities("SMART JC-U3912T"));
    let mut session = DeviceSession::new(discovery, profile, dispatch, options());
    for _ in 0..9 {
        session.step()?;
    }

    let (angle, throttle, mode, recording) = part.run_threaded();
    assert_eq!(angle, 1.0);
    // -16384 / 32767, times scale 1.05, times direction -1
    assert!((throttle - 16384.0 / 32767.0 * 1.05).abs() < 1e-9);
    assert_eq!(mode, DriveMode::Local);
    assert!(recording);

    let state = session.control_state();
    assert_eq!(state.get("4"), Some(ControlValue::Digital(0)));
    assert_eq!(state.get("DPAD_X"), Some(ControlValue::Analog(-1.0)));
    assert_eq!(session.dispatch_table().throttle_scale(), 1.05);
    Ok(())
}

#[test]
fn test_reconnect_keeps_outputs() -> Result<(), Box<dyn Error>> {
    let profile = load(ELECOM_PROFILE)?;
    let part = ControllerPart::new();
    let dispatch = DispatchTable::new(part.bindings(&profile.bindings), profile.throttle);

    let first = vec![record(1, JS_EVENT_BUTTON, 0), None];
    let second = vec![record(-32767, JS_EVENT_AXIS, 0)];
    let discovery = ReplayDiscovery::new("SMART JC-U3912T", vec![first, second])
        .with_capabilities(hid_pad_capabilities("SMART JC-U3912T"));
    let mut session = DeviceSession::new(discovery, profile, dispatch, options());

    session.step()?;
    assert!(!part.outputs().recording);
    session.step()?;
    assert_eq!(session.state(), SessionState::Reconnecting);
    session.step()?;
    assert_eq!(session.state(), SessionState::Reading);

    let outputs = part.outputs();
    assert!(!outputs.recording);
    assert_eq!(outputs.angle, -1.0);
    assert_eq!(session.control_state().get("1"), Some(ControlValue::Digital(1)));
    Ok(())
}

/// Every bundled profile must name and scale what the joystick interface
/// reports for its pad
#[test]
fn test_bundled_profiles_accept_joystick_records() -> Result<(), Box<dyn Error>> {
    let mut paths: Vec<_> = fs::read_dir(PROFILE_DIR)?
        .map(|entry| entry.map(|e| e.path()))
        .collect::<Result<_, _>>()?;
    paths.sort();
    assert!(!paths.is_empty());

    for path in paths {
        let config = ProfileConfig::from_yaml_path(&path)?;
        let profile = DeviceProfile::try_from(&config)?;
        let name = profile.search_term.clone();
        let capabilities = match config.transport {
            Transport::DirectInput => hid_pad_capabilities(&name),
            Transport::XInput | Transport::Joydev => xpad_capabilities(&name),
        };

        let connection = vec![
            record(32767, JS_EVENT_AXIS, 0),
            record(1, JS_EVENT_BUTTON, 0),
            record(0, JS_EVENT_BUTTON, 0),
        ];
        let discovery =
            ReplayDiscovery::new(&name, vec![connection]).with_capabilities(capabilities);
        let dispatch = DispatchTable::new(Default::default(), profile.throttle);
        let mut session = DeviceSession::new(discovery, profile, dispatch, options());

        let mut dispatched = vec![];
        for _ in 0..3 {
            match session.step()? {
                Step::Dispatched { name, value } => dispatched.push((name, value)),
                step => panic!("{path:?}: expected a dispatched value, got {step:?}"),
            }
        }
        let (stick, deflection) = &dispatched[0];
        let (button, press) = &dispatched[1];
        let (_, release) = &dispatched[2];

        assert_eq!(stick, "LEFT_STICK_X", "{path:?}");
        assert_eq!(*deflection, ControlValue::Analog(1.0), "{path:?}");
        assert!(!button.starts_with("unknown("), "{path:?}: {button}");
        assert_eq!(*press, ControlValue::Digital(1), "{path:?}");
        assert_eq!(*release, ControlValue::Digital(0), "{path:?}");
    }
    Ok(())
}

#[test]
fn test_capability_control_map() -> Result<(), Box<dyn Error>> {
    let profile = load(XBOX_PROFILE)?;
    let part = ControllerPart::new();
    let dispatch = DispatchTable::new(part.bindings(&profile.bindings), profile.throttle);

    let discovery = ReplayDiscovery::new(
        "Microsoft X-Box 360 pad",
        vec![vec![
            record(32767, JS_EVENT_AXIS, 0),
            record(1, JS_EVENT_BUTTON, 3),
            record(0, JS_EVENT_BUTTON, 3),
            record(-32767, JS_EVENT_AXIS, 6),
        ]],
    )
    .with_capabilities(xpad_capabilities("Microsoft X-Box 360 pad"));
    let mut session = DeviceSession::new(discovery, profile, dispatch, options());
    for _ in 0..4 {
        session.step()?;
    }

    let state = session.control_state();
    assert_eq!(state.get("LEFT_STICK_X"), Some(ControlValue::Analog(1.0)));
    assert_eq!(state.get("Y"), Some(ControlValue::Digital(0)));
    assert_eq!(state.get("DPAD_X"), Some(ControlValue::Analog(-1.0)));
    assert_eq!(part.outputs().angle, 1.0);
    Ok(())
}

#[test]
fn test_shutdown_from_another_thread() -> Result<(), Box<dyn Error>> {
    let profile = load(ELECOM_PROFILE)?;
    let dispatch = DispatchTable::new(Default::default(), profile.throttle);
    // The device never shows up, so the session keeps polling discovery
    let discovery = ReplayDiscovery::new("SMART JC-U3912T", vec![]);
    let mut session = DeviceSession::new(discovery, profile, dispatch, options());
    let shutdown = session.shutdown_handle();

    let handle = thread::spawn(move || {
        let result = session.run();
        (result.is_ok(), session.state())
    });
    thread::sleep(Duration::from_millis(20));
    shutdown.shutdown();

    let (ok, state) = handle.join().map_err(|_| "session thread panicked")?;
    assert!(ok);
    assert_eq!(state, SessionState::Closed);
    Ok(())
}
