use crate::{drivers::joydev::driver::Driver, udev::discover_joysticks};

use super::{
    DeviceCapabilities, DeviceDiscovery, DeviceError, DeviceInfo, IoError, SourceInputDevice,
};

/// Source device implementation for Linux joystick devices
#[derive(Debug)]
pub struct JoystickDevice {
    driver: Driver,
    path: String,
}

impl JoystickDevice {
    /// Open the joystick device at the given path (e.g. "/dev/input/js0")
    pub fn new(path: &str) -> Result<Self, DeviceError> {
        let driver = Driver::new(path).map_err(|source| DeviceError::Open {
            path: path.to_string(),
            source,
        })?;
        Ok(Self {
            driver,
            path: path.to_string(),
        })
    }

    pub fn path(&self) -> &str {
        self.path.as_str()
    }
}

impl SourceInputDevice for JoystickDevice {
    fn read_record(&mut self, buf: &mut [u8]) -> Result<usize, IoError> {
        Ok(self.driver.read(buf)?)
    }

    fn capabilities(&mut self) -> Result<DeviceCapabilities, DeviceError> {
        let to_err = |e: nix::Error| DeviceError::Capabilities(format!("{}: {e}", self.path));
        let name = self.driver.name().map_err(to_err)?;
        let axis_count = self.driver.axis_count().map_err(to_err)?;
        let button_count = self.driver.button_count().map_err(to_err)?;
        let axis_codes = self.driver.axis_map().map_err(to_err)?;
        let button_codes = self.driver.button_map().map_err(to_err)?;

        log::debug!("Device name: {name}");
        log::debug!("Found {axis_count} axes: {axis_codes:02x?}");
        log::debug!("Found {button_count} buttons: {button_codes:03x?}");

        Ok(DeviceCapabilities {
            name,
            axis_count,
            button_count,
            axis_codes,
            button_codes,
        })
    }
}

/// Discovers joystick devices through udev
#[derive(Debug, Default, Clone, Copy)]
pub struct JoydevDiscovery;

impl DeviceDiscovery for JoydevDiscovery {
    type Device = JoystickDevice;

    fn list(&self) -> Result<Vec<DeviceInfo>, DeviceError> {
        let devices = discover_joysticks().map_err(|e| DeviceError::Discovery(e.to_string()))?;
        Ok(devices.into_iter().map(DeviceInfo::from).collect())
    }

    fn open(&self, info: &DeviceInfo) -> Result<Self::Device, DeviceError> {
        log::info!("Opening device '{}' at {}", info.name, info.path);
        JoystickDevice::new(info.path.as_str())
    }
}
