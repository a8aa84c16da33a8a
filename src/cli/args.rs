use clap::{Parser, Subcommand};

use crate::updater::DEFAULT_GROUP_SIZE;

/// mod-updater - keeps the mod loader, its plugins and themes up to date
#[derive(Parser)]
#[command(name = "mod-updater")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Install root (auto-detects git root if absent)
    #[arg(short = 'r', long, env = "MOD_UPDATER_ROOT", global = true)]
    pub root: Option<String>,

    /// Directory holding updater settings. Defaults to ~/.mod-updater
    #[arg(long, env = "MOD_UPDATER_SETTINGS_DIR", global = true)]
    pub settings_dir: Option<String>,

    /// Number of entities checked concurrently
    #[arg(long, default_value_t = DEFAULT_GROUP_SIZE, global = true)]
    pub group_size: usize,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Check every entity for pending updates
    Check,
    /// Install pending updates
    Update {
        /// Discard local changes before updating
        #[arg(short, long)]
        force: bool,

        /// Do not ask for confirmation before a forced update
        #[arg(short, long)]
        yes: bool,
    },
    /// Show updater state and pending updates
    Status,
    /// Stop prompting for the current upstream revision of an entity
    Skip {
        /// Update identifier (e.g. plugins_foo, themes_bar, self)
        id: String,

        /// Commit to skip (defaults to the pending head commit)
        #[arg(long)]
        commit: Option<String>,
    },
    /// Exclude an entity from update checks
    Disable {
        /// Update identifier
        id: String,
    },
    /// Re-include a previously disabled entity
    Enable {
        /// Update identifier
        id: String,
    },
    /// Pause scheduled checks
    Pause,
    /// Resume scheduled checks
    Resume,
    /// Show or change updater configuration
    Config(ConfigArgs),
    /// Show a changelog manifest once per version
    Changelog {
        /// Path to the changelog manifest (JSON)
        manifest: String,

        /// Show it even if this version was already seen
        #[arg(short, long)]
        force: bool,
    },
    /// Run the periodic update timer until interrupted
    Watch {
        /// Changelog manifest to show on startup
        #[arg(long)]
        changelog: Option<String>,
    },
    /// Open the pending head commit of an entity in the browser
    Open {
        /// Update identifier
        id: String,
    },
}

#[derive(clap::Args, Default)]
pub struct ConfigArgs {
    /// Install updates as soon as they are found
    #[arg(long)]
    pub automatic: Option<bool>,

    /// Minutes between scheduled checks (minimum 1)
    #[arg(long)]
    pub interval: Option<u64>,

    /// Turn the updater off entirely
    #[arg(long)]
    pub disabled: Option<bool>,
}

impl ConfigArgs {
    pub fn is_empty(&self) -> bool {
        self.automatic.is_none() && self.interval.is_none() && self.disabled.is_none()
    }
}
