use std::{ffi::OsStr, path::Path};

use crate::input::source::DeviceInfo;

#[derive(Debug, Clone, Default)]
pub struct UdevDevice {
    devnode: String,
    sysname: String,
    name: String,
}

impl UdevDevice {
    /// Returns a UdevDevice object from the given base path and name.
    /// e.g. UdevDevice::from_devnode("/dev/input", "js0");
    pub fn from_devnode(base_path: &str, name: &str) -> Self {
        let devnode = format!("{base_path}/{name}");
        Self {
            devnode,
            sysname: name.to_string(),
            name: "".to_string(),
        }
    }

    pub fn devnode(&self) -> String {
        self.devnode.clone()
    }

    pub fn sysname(&self) -> String {
        self.sysname.clone()
    }

    /// Returns the display name of the input device this node belongs to
    pub fn name(&self) -> String {
        self.name.clone()
    }

    /// Returns true if this is a joystick interface node (e.g. "js0")
    pub fn is_joystick(&self) -> bool {
        let Some(suffix) = self.sysname.strip_prefix("js") else {
            return false;
        };
        !suffix.is_empty() && suffix.chars().all(|c| c.is_ascii_digit())
    }
}

/// Looks up the given attribute on the device and then on each of its parents
/// until it is found. Returns an empty string if no device in the tree has it.
pub fn get_attribute_from_tree(device: &::udev::Device, attribute: &str) -> String {
    // Check if the current device has this attribute
    let attr = match device.attribute_value(attribute) {
        Some(attr) => attr,
        None => {
            if let Some(parent) = device.parent() {
                return get_attribute_from_tree(&parent, attribute);
            } else {
                return "".to_string();
            };
        }
    };
    attr.to_string_lossy().to_string()
}

impl From<::udev::Device> for UdevDevice {
    fn from(device: ::udev::Device) -> Self {
        let devnode = device
            .devnode()
            .unwrap_or(Path::new(""))
            .to_string_lossy()
            .to_string();
        let sysname = device.sysname().to_string_lossy().to_string();
        // The name attribute lives on the parent "inputN" device
        let name = get_attribute_from_tree(&device, "name");
        let name = if name.is_empty() {
            device
                .property_value("NAME")
                .unwrap_or(OsStr::new(""))
                .to_string_lossy()
                .trim_matches('"')
                .to_string()
        } else {
            name
        };

        Self {
            devnode,
            sysname,
            name,
        }
    }
}

impl From<UdevDevice> for DeviceInfo {
    fn from(device: UdevDevice) -> Self {
        DeviceInfo {
            path: device.devnode,
            name: device.name,
        }
    }
}
