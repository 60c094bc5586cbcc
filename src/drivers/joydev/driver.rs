use std::{
    fs::File,
    io::{self, Read},
    os::fd::AsRawFd,
};

use super::js_report::JS_EVENT_SIZE;

/// Maximum number of axes reported in the axis map (ABS_CNT)
pub const ABS_CNT: usize = 0x40;
/// Maximum number of buttons reported in the button map (KEY_MAX - BTN_MISC + 1)
pub const BTNMAP_SIZE: usize = 0x200;
/// Buffer size used to read the device name
const NAME_SIZE: usize = 128;

mod ioctl {
    // JSIOCGAXES
    nix::ioctl_read!(axes, b'j', 0x11, u8);
    // JSIOCGBUTTONS
    nix::ioctl_read!(buttons, b'j', 0x12, u8);
    // JSIOCGNAME(len)
    nix::ioctl_read_buf!(name, b'j', 0x13, u8);
    // JSIOCGAXMAP
    nix::ioctl_read!(axis_map, b'j', 0x32, [u8; 0x40]);
    // JSIOCGBTNMAP
    nix::ioctl_read!(button_map, b'j', 0x34, [u16; 0x200]);
}

/// Driver for a Linux joystick character device (e.g. /dev/input/js0)
#[derive(Debug)]
pub struct Driver {
    file: File,
}

impl Driver {
    pub fn new(path: &str) -> Result<Self, io::Error> {
        log::debug!("Opening joystick device at: {path}");
        let file = File::open(path)?;
        Ok(Self { file })
    }

    /// Blocking read of one event record. Returns the number of bytes read.
    /// A read of zero bytes means the device went away.
    pub fn read(&mut self, buf: &mut [u8]) -> Result<usize, io::Error> {
        let size = buf.len().min(JS_EVENT_SIZE);
        let bytes_read = self.file.read(&mut buf[..size])?;
        if bytes_read == 0 {
            return Err(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                "Device returned end of file",
            ));
        }
        Ok(bytes_read)
    }

    /// Returns the device name
    pub fn name(&self) -> Result<String, nix::Error> {
        let mut buf = [0u8; NAME_SIZE];
        unsafe { ioctl::name(self.file.as_raw_fd(), &mut buf) }?;
        let end = buf.iter().position(|b| *b == 0).unwrap_or(NAME_SIZE);
        Ok(String::from_utf8_lossy(&buf[..end]).to_string())
    }

    /// Returns the number of axes
    pub fn axis_count(&self) -> Result<u8, nix::Error> {
        let mut count = 0u8;
        unsafe { ioctl::axes(self.file.as_raw_fd(), &mut count) }?;
        Ok(count)
    }

    /// Returns the number of buttons
    pub fn button_count(&self) -> Result<u8, nix::Error> {
        let mut count = 0u8;
        unsafe { ioctl::buttons(self.file.as_raw_fd(), &mut count) }?;
        Ok(count)
    }

    /// Returns the raw axis code for each axis index
    pub fn axis_map(&self) -> Result<Vec<u16>, nix::Error> {
        let count = self.axis_count()? as usize;
        let mut map = [0u8; ABS_CNT];
        unsafe { ioctl::axis_map(self.file.as_raw_fd(), &mut map) }?;
        Ok(map
            .iter()
            .take(count.min(ABS_CNT))
            .map(|code| *code as u16)
            .collect())
    }

    /// Returns the raw button code for each button index
    pub fn button_map(&self) -> Result<Vec<u16>, nix::Error> {
        let count = self.button_count()? as usize;
        let mut map = [0u16; BTNMAP_SIZE];
        unsafe { ioctl::button_map(self.file.as_raw_fd(), &mut map) }?;
        Ok(map.iter().take(count.min(BTNMAP_SIZE)).copied().collect())
    }
}
