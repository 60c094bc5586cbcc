use std::error::Error;
use std::path::PathBuf;

use clap::Subcommand;
use tabled::settings::{Panel, Style};
use tabled::{Table, Tabled};

use crate::config::{load_profiles, select_profile, ProfileConfig};
use crate::input::profile::DeviceProfile;
use crate::input::source::joydev::JoydevDiscovery;
use crate::input::source::DeviceDiscovery;

#[derive(Subcommand, Debug, Clone)]
pub enum ProfilesCommand {
    /// List all loadable device profiles
    List,
    /// Validate the given profile file
    Check { path: PathBuf },
    /// Show which profile would be used for the connected devices
    Select,
}

#[derive(Tabled)]
struct ProfileRow {
    name: String,
    transport: String,
    search_term: String,
    path: String,
}

pub async fn handle_profiles(cmd: ProfilesCommand) -> Result<(), Box<dyn Error>> {
    match cmd {
        ProfilesCommand::List => {
            let profiles = load_profiles();
            let count = profiles.len();
            let rows: Vec<ProfileRow> = profiles
                .into_iter()
                .map(|(path, profile)| ProfileRow {
                    name: profile.name,
                    transport: format!("{:?}", profile.transport),
                    search_term: profile.device_search_term.unwrap_or_default(),
                    path: path.display().to_string(),
                })
                .collect();

            let mut table = Table::new(rows);
            table
                .with(Style::modern_rounded())
                .with(Panel::header("Device Profiles"));
            println!("{table}");
            println!("Found {count} profile(s)");
        }
        ProfilesCommand::Check { path } => {
            let config = ProfileConfig::from_yaml_path(&path)?;
            let profile = DeviceProfile::try_from(&config)?;
            println!("Profile '{}' is valid", profile.name);
            println!("  Transport: {:?}", profile.transport);
            println!("  Search term: {}", profile.search_term);
            let (lo, hi) = profile.domain.dead_zone();
            println!(
                "  Analog range: [{}, {}], dead zone [{lo}, {hi}]",
                profile.domain.min(),
                profile.domain.max()
            );
            for (name, action) in profile.bindings.iter() {
                println!("  {name} => {action}");
            }
        }
        ProfilesCommand::Select => {
            let profiles: Vec<ProfileConfig> =
                load_profiles().into_iter().map(|(_, p)| p).collect();
            let devices = JoydevDiscovery.list()?;
            match select_profile(&profiles, &devices) {
                Some(profile) => println!("{}", profile.name),
                None => return Err("No profile matches a connected device".into()),
            }
        }
    }

    Ok(())
}
