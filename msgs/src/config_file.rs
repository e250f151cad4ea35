use std::{fs, path::Path};

use anyhow::Context;
use serde::de::DeserializeOwned;

/// Reads a TOML config, or returns `T::default()` when no path is given.
pub fn load_config<T: DeserializeOwned + Default>(path: Option<&Path>) -> anyhow::Result<T> {
    let Some(path) = path else {
        return Ok(T::default());
    };

    let contents = fs::read_to_string(path)
        .with_context(|| format!("failed to read config file {}", path.display()))?;

    toml::from_str(&contents)
        .with_context(|| format!("failed to parse config file {}", path.display()))
}

/// Config path taken from the first command line argument.
pub fn config_path_from_args() -> Option<std::path::PathBuf> {
    std::env::args().nth(1).map(std::path::PathBuf::from)
}
