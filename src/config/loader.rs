// src/config/loader.rs

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::Context;

use crate::config::model::{ConfigFile, RawConfigFile};
use crate::errors::Result;

/// Read and deserialize a workflow file without any semantic checks.
pub fn load_from_path(path: impl AsRef<Path>) -> Result<RawConfigFile> {
    let path = path.as_ref();
    let contents = fs::read_to_string(path)
        .with_context(|| format!("failed to read workflow file {}", path.display()))?;

    let config: RawConfigFile = toml::from_str(&contents)
        .with_context(|| format!("failed to parse workflow file {}", path.display()))?;

    Ok(config)
}

/// Read, deserialize and validate a workflow file.
///
/// The result can be turned into a runnable workflow with
/// [`ConfigFile::build_workflow`].
pub fn load_and_validate(path: impl AsRef<Path>) -> Result<ConfigFile> {
    let path = path.as_ref();
    let raw_config = load_from_path(path)?;
    let config = ConfigFile::try_from(raw_config)
        .with_context(|| format!("invalid workflow file {}", path.display()))?;
    Ok(config)
}

/// `Workflow.toml` in the current directory.
pub fn default_config_path() -> PathBuf {
    PathBuf::from("Workflow.toml")
}
