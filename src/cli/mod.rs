pub mod device;
pub mod profile;
pub mod run;

use std::error::Error;

use clap::{Parser, Subcommand};
use device::{handle_check, handle_devices, CheckArgs};
use profile::{handle_profiles, ProfilesCommand};
use run::{handle_run, RunArgs};

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    #[command(subcommand)]
    pub cmd: Option<Commands>,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Bind a joystick and translate its events until interrupted (default)
    Run(RunArgs),
    /// List discovered joystick devices
    Devices,
    /// Show the axes and buttons of a joystick device and print its raw events
    Check(CheckArgs),
    /// Manage device profiles
    Profiles {
        #[command(subcommand)]
        cmd: ProfilesCommand,
    },
}

pub async fn main_cli(args: Args) -> Result<(), Box<dyn Error>> {
    let cmd = args.cmd.unwrap_or(Commands::Run(RunArgs::default()));

    match cmd {
        Commands::Run(args) => handle_run(args).await?,
        Commands::Devices => handle_devices().await?,
        Commands::Check(args) => handle_check(args).await?,
        Commands::Profiles { cmd } => handle_profiles(cmd).await?,
    }

    Ok(())
}
