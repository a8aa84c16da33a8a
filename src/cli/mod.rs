mod args;
mod paths;

pub use args::{Cli, Commands, ConfigArgs};
pub use paths::{resolve_install_root, resolve_settings_dir};
