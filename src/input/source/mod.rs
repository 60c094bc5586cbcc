pub mod joydev;

use std::io;

use thiserror::Error;

/// Read failures on an open device. Any of these means the connection to the
/// device was lost and the session should try to reconnect.
#[derive(Debug, Error)]
pub enum IoError {
    #[error("Lost connection with device: {0}")]
    ConnectionLost(#[from] io::Error),
}

/// Errors finding, opening or querying a device
#[derive(Debug, Error)]
pub enum DeviceError {
    #[error("No device matching '{search_term}' could be found")]
    NotFound { search_term: String },
    #[error("Found multiple devices matching '{search_term}': {matches:?}. Please specify the device path.")]
    Ambiguous {
        search_term: String,
        matches: Vec<String>,
    },
    #[error("Unable to open device '{path}': {source}")]
    Open {
        path: String,
        #[source]
        source: io::Error,
    },
    #[error("Unable to query device capabilities: {0}")]
    Capabilities(String),
    #[error("Unable to enumerate devices: {0}")]
    Discovery(String),
}

/// Path and display name of a device found during discovery
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceInfo {
    pub path: String,
    pub name: String,
}

/// Result of the control descriptor query of an open device
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeviceCapabilities {
    /// Display name reported by the driver
    pub name: String,
    pub axis_count: u8,
    pub button_count: u8,
    /// Raw axis code for each axis index (e.g. 0x00 for ABS_X)
    pub axis_codes: Vec<u16>,
    /// Raw button code for each button index (e.g. 0x130 for BTN_A)
    pub button_codes: Vec<u16>,
}

/// A [SourceInputDevice] is an open device that produces raw event records
pub trait SourceInputDevice {
    /// Block until the next record is available and copy it into the given
    /// buffer. Returns the number of bytes read, which may be less than one
    /// full record.
    fn read_record(&mut self, buf: &mut [u8]) -> Result<usize, IoError>;

    /// Query the device for its name, axes and buttons
    fn capabilities(&mut self) -> Result<DeviceCapabilities, DeviceError>;
}

/// A [DeviceDiscovery] lists the devices currently available and opens them
pub trait DeviceDiscovery {
    type Device: SourceInputDevice;

    /// Returns all devices currently present on the system
    fn list(&self) -> Result<Vec<DeviceInfo>, DeviceError>;

    /// Open the given device for reading
    fn open(&self, info: &DeviceInfo) -> Result<Self::Device, DeviceError>;

    /// Find the single device whose name contains the given search term
    fn find(&self, search_term: &str) -> Result<DeviceInfo, DeviceError> {
        let devices = self.list()?;
        find_device(devices.as_slice(), search_term)
    }
}

/// Returns the only device whose name contains the given search term, ignoring
/// case. Fails with [DeviceError::NotFound] if nothing matches and with
/// [DeviceError::Ambiguous] if more than one device matches.
pub fn find_device(devices: &[DeviceInfo], search_term: &str) -> Result<DeviceInfo, DeviceError> {
    let term = search_term.to_lowercase();
    let mut likely_devices: Vec<&DeviceInfo> = devices
        .iter()
        .filter(|device| {
            log::trace!("Checking device: {device:?}");
            device.name.to_lowercase().contains(term.as_str())
        })
        .collect();

    match likely_devices.len() {
        0 => Err(DeviceError::NotFound {
            search_term: search_term.to_string(),
        }),
        1 => Ok(likely_devices.remove(0).clone()),
        _ => Err(DeviceError::Ambiguous {
            search_term: search_term.to_string(),
            matches: likely_devices.iter().map(|d| d.path.clone()).collect(),
        }),
    }
}

/// Returns the device at the given path (e.g. "/dev/input/js0")
pub fn find_device_by_path(devices: &[DeviceInfo], path: &str) -> Result<DeviceInfo, DeviceError> {
    devices
        .iter()
        .find(|device| device.path == path)
        .cloned()
        .ok_or_else(|| DeviceError::NotFound {
            search_term: path.to_string(),
        })
}
