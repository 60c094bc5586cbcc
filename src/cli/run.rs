use std::error::Error;
use std::path::PathBuf;
use std::time::Duration;

use clap::Args;

use crate::config::{load_profiles, select_profile, ProfileConfig};
use crate::input::actions::{ActionKind, ControllerPart};
use crate::input::dispatch::DispatchTable;
use crate::input::profile::DeviceProfile;
use crate::input::session::{DeviceSession, SessionOptions};
use crate::input::source::joydev::JoydevDiscovery;
use crate::input::source::DeviceDiscovery;

/// How often the part outputs are polled, like a vehicle loop would
const POLL_INTERVAL: Duration = Duration::from_millis(50);

#[derive(Args, Debug, Clone, Default)]
pub struct RunArgs {
    /// Profile file to use. Without one, the first bundled profile matching a
    /// connected device is selected.
    #[arg(short, long)]
    pub profile: Option<PathBuf>,
    /// Override the device search term of the profile
    #[arg(short = 't', long)]
    pub search_term: Option<String>,
    /// Bind the device at this path (e.g. "/dev/input/js0") instead of
    /// searching by name
    #[arg(short, long)]
    pub device: Option<String>,
    /// Bind a control to an action (e.g. "X=toggle_recording")
    #[arg(short, long = "bind", value_parser = parse_binding)]
    pub bindings: Vec<(String, ActionKind)>,
    /// Seconds between device discovery attempts
    #[arg(long)]
    pub retry_interval: Option<f64>,
    /// Log every control value
    #[arg(short, long)]
    pub verbose: bool,
}

/// Parse a "NAME=ACTION" binding argument
fn parse_binding(arg: &str) -> Result<(String, ActionKind), String> {
    let Some((name, action)) = arg.split_once('=') else {
        return Err(format!("expected NAME=ACTION, got '{arg}'"));
    };
    let action = action.trim().parse::<ActionKind>().map_err(|e| e.to_string())?;
    Ok((name.trim().to_string(), action))
}

/// Load the profile given on the command line or select a bundled one
fn load_profile(args: &RunArgs) -> Result<DeviceProfile, Box<dyn Error>> {
    let config = match args.profile.as_ref() {
        Some(path) => ProfileConfig::from_yaml_path(path)?,
        None => {
            let profiles: Vec<ProfileConfig> =
                load_profiles().into_iter().map(|(_, p)| p).collect();
            let devices = JoydevDiscovery.list()?;
            select_profile(&profiles, &devices)
                .cloned()
                .ok_or("No profile matches a connected device")?
        }
    };

    let mut profile = DeviceProfile::try_from(&config)?;
    if let Some(term) = args.search_term.as_ref() {
        profile.search_term = term.clone();
    }
    for (name, action) in args.bindings.iter() {
        profile.bindings.insert(name.clone(), *action);
    }

    Ok(profile)
}

pub async fn handle_run(args: RunArgs) -> Result<(), Box<dyn Error>> {
    let profile = load_profile(&args)?;
    log::info!("Using profile '{}'", profile.name);

    let part = ControllerPart::new();
    let dispatch = DispatchTable::new(part.bindings(&profile.bindings), profile.throttle);
    let mut options = SessionOptions {
        device_path: args.device.clone(),
        verbose: args.verbose,
        ..Default::default()
    };
    if let Some(interval) = args.retry_interval {
        options.retry_interval = Duration::try_from_secs_f64(interval)?;
    }
    let grace = options.shutdown_grace;

    let mut session = DeviceSession::new(JoydevDiscovery, profile, dispatch, options);
    let shutdown = session.shutdown_handle();
    let mut task = tokio::task::spawn_blocking(move || session.run());

    let mut interval = tokio::time::interval(POLL_INTERVAL);
    let mut last = part.run_threaded();
    loop {
        tokio::select! {
            result = &mut task => {
                result??;
                return Ok(());
            }
            _ = tokio::signal::ctrl_c() => {
                log::info!("Shutting down");
                shutdown.shutdown();
                break;
            }
            _ = interval.tick() => {
                let outputs = part.run_threaded();
                if outputs != last {
                    let (angle, throttle, mode, recording) = outputs;
                    log::debug!(
                        "angle={angle:.3} throttle={throttle:.3} mode={mode} recording={recording}"
                    );
                    last = outputs;
                }
            }
        }
    }

    // A read already in flight is not interrupted, so only wait for the
    // session while it can still notice the shutdown request.
    match tokio::time::timeout(grace * 2, task).await {
        Ok(result) => result??,
        Err(_) => log::debug!("Session is blocked in a read, exiting anyway"),
    }

    Ok(())
}
