use anyhow::{Context, Result};
use std::path::PathBuf;

/// Default settings directory name under the home directory
const SETTINGS_DIR_NAME: &str = ".mod-updater";

/// Find the git root directory by searching upward from current directory.
pub fn find_git_root() -> Option<PathBuf> {
    let current = std::env::current_dir().ok()?;
    let mut path = current.as_path();

    loop {
        if path.join(".git").exists() {
            return Some(path.to_path_buf());
        }
        path = path.parent()?;
    }
}

/// Resolve the install root: explicit path, else the enclosing git checkout,
/// else the current directory.
pub fn resolve_install_root(root: Option<String>) -> Result<PathBuf> {
    if let Some(path) = root {
        return PathBuf::from(&path)
            .canonicalize()
            .with_context(|| format!("Failed to canonicalize provided install root: {}", path));
    }
    match find_git_root() {
        Some(path) => Ok(path),
        None => std::env::current_dir().context("Failed to get current directory"),
    }
}

/// Resolve the settings directory, defaulting to `~/.mod-updater`.
pub fn resolve_settings_dir(settings_dir: Option<String>) -> Result<PathBuf> {
    if let Some(dir) = settings_dir {
        return Ok(PathBuf::from(dir));
    }
    let home = dirs::home_dir().context("Could not determine home directory")?;
    Ok(home.join(SETTINGS_DIR_NAME))
}
