pub mod device;

use std::error::Error;

use udev::Enumerator;

use self::device::UdevDevice;

/// Returns a list of devices in the given subsystem that have a devnode property.
pub fn discover_devices(subsystem: &str) -> Result<Vec<udev::Device>, Box<dyn Error>> {
    let mut enumerator = Enumerator::new()?;
    enumerator.match_subsystem(subsystem)?;

    log::debug!("Started udev {subsystem} enumerator.");

    Ok(enumerator
        .scan_devices()?
        .filter(|device| device.devnode().is_some())
        .collect())
}

/// Returns all joystick devices (e.g. /dev/input/js0) currently known to udev
pub fn discover_joysticks() -> Result<Vec<UdevDevice>, Box<dyn Error>> {
    let devices = discover_devices("input")?
        .into_iter()
        .map(UdevDevice::from)
        .filter(|device| device.is_joystick())
        .collect();

    Ok(devices)
}
