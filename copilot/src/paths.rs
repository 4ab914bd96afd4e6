//! Default on-disk locations for persisted state.

use std::path::PathBuf;

use anyhow::{Context, Result};

/// Per-user config directory for this project, created on demand.
pub fn config_dir() -> Result<PathBuf> {
    let dir = dirs::config_dir()
        .context("no platform config directory")?
        .join("copilot");
    std::fs::create_dir_all(&dir).with_context(|| format!("creating {dir:?}"))?;
    Ok(dir)
}

/// Default location of the region calibration file.
pub fn calibration_file() -> Result<PathBuf> {
    Ok(config_dir()?.join("regions.json"))
}

/// Default location of the resolution scale table.
pub fn scale_table_file() -> Result<PathBuf> {
    Ok(config_dir()?.join("resolution.json"))
}
