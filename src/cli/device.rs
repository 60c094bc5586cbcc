use std::error::Error;

use clap::Args;
use tabled::settings::{Panel, Style};
use tabled::{Table, Tabled};

use crate::drivers::joydev::event::{decode, EventKind, KindTable};
use crate::drivers::joydev::js_report::JS_EVENT_SIZE;
use crate::input::source::joydev::{JoydevDiscovery, JoystickDevice};
use crate::input::source::{DeviceDiscovery, SourceInputDevice};

#[derive(Args, Debug, Clone)]
pub struct CheckArgs {
    /// Path to the joystick device node
    #[arg(default_value = "/dev/input/js0")]
    pub path: String,
    /// Only show the device capabilities
    #[arg(long)]
    pub no_events: bool,
}

#[derive(Tabled)]
struct DeviceRow {
    path: String,
    name: String,
}

#[derive(Tabled)]
struct ControlRow {
    index: usize,
    code: String,
}

pub async fn handle_devices() -> Result<(), Box<dyn Error>> {
    let mut devices = JoydevDiscovery.list()?;
    devices.sort_by(|a, b| a.path.cmp(&b.path));
    let count = devices.len();

    let rows: Vec<DeviceRow> = devices
        .into_iter()
        .map(|device| DeviceRow {
            path: device.path,
            name: device.name,
        })
        .collect();

    let mut table = Table::new(rows);
    table
        .with(Style::modern_rounded())
        .with(Panel::header("Joystick Devices"));
    println!("{table}");
    println!("Found {count} device(s)");

    Ok(())
}

pub async fn handle_check(args: CheckArgs) -> Result<(), Box<dyn Error>> {
    let mut device = JoystickDevice::new(args.path.as_str())?;
    let caps = device.capabilities()?;

    println!("Device name: {}", caps.name);
    let axes: Vec<ControlRow> = caps
        .axis_codes
        .iter()
        .enumerate()
        .map(|(index, code)| ControlRow {
            index,
            code: format!("{code:#04x}"),
        })
        .collect();
    let mut table = Table::new(axes);
    table
        .with(Style::modern_rounded())
        .with(Panel::header(format!("{} Axes", caps.axis_count)));
    println!("{table}");

    let buttons: Vec<ControlRow> = caps
        .button_codes
        .iter()
        .enumerate()
        .map(|(index, code)| ControlRow {
            index,
            code: format!("{code:#05x}"),
        })
        .collect();
    let mut table = Table::new(buttons);
    table
        .with(Style::modern_rounded())
        .with(Panel::header(format!("{} Buttons", caps.button_count)));
    println!("{table}");

    if args.no_events {
        return Ok(());
    }

    // Reads block, so print events from a blocking thread until the device
    // goes away or the process is interrupted.
    let task = tokio::task::spawn_blocking(move || -> Result<(), String> {
        let kinds = KindTable::joydev();
        let mut buf = [0u8; JS_EVENT_SIZE];
        loop {
            let read = device.read_record(&mut buf).map_err(|e| e.to_string())?;
            let event = match decode(&buf[..read], &kinds) {
                Ok(event) => event,
                Err(e) => {
                    log::warn!("{e}");
                    continue;
                }
            };
            let kind = match event.kind {
                EventKind::Digital => "button",
                EventKind::Analog => "axis",
                EventKind::Misc => "misc",
                EventKind::Unknown(_) => "unknown",
            };
            let init = if event.init { " (init)" } else { "" };
            println!(
                "time={:>10} {kind:<7} number={:<3} value={:>6}{init}",
                event.timestamp, event.code, event.value
            );
        }
    });

    tokio::select! {
        result = task => result??,
        _ = tokio::signal::ctrl_c() => (),
    }

    Ok(())
}
