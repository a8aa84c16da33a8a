use anyhow::Result;
use clap::Parser;
use tracing_subscriber::{fmt, EnvFilter};

mod cli;
mod command;
mod domain;
mod entity;
mod error;
mod git;
mod notify;
mod settings;
mod updater;

use cli::{Cli, Commands};
use command::UpdaterOptions;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };

    fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let options = UpdaterOptions {
        root: cli.root,
        settings_dir: cli.settings_dir,
        group_size: cli.group_size,
    };

    match cli.command {
        Some(Commands::Check) => command::run_check(&options).await?,
        Some(Commands::Update { force, yes }) => command::run_update(&options, force, yes).await?,
        Some(Commands::Status) => command::run_status(&options).await?,
        Some(Commands::Skip { id, commit }) => command::run_skip(&options, &id, commit).await?,
        Some(Commands::Disable { id }) => command::run_disable(&options, &id).await?,
        Some(Commands::Enable { id }) => command::run_enable(&options, &id).await?,
        Some(Commands::Pause) => command::run_pause(&options).await?,
        Some(Commands::Resume) => command::run_resume(&options).await?,
        Some(Commands::Config(args)) => command::run_config(&options, args).await?,
        Some(Commands::Changelog { manifest, force }) => {
            command::run_changelog(&options, &manifest, force).await?
        }
        Some(Commands::Watch { changelog }) => command::run_watch(&options, changelog).await?,
        Some(Commands::Open { id }) => command::run_open(&options, &id).await?,
        None => {
            // No command specified, show help
            eprintln!("No command specified. Use --help for usage information.");
            eprintln!("Use 'mod-updater check' to look for updates or 'mod-updater watch' to keep checking.");
        }
    }

    Ok(())
}
