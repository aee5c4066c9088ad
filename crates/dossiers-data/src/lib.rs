// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

mod cache;
mod loader;
mod missions;

pub use cache::DatasetCache;
pub use loader::{DataSource, Dataset, FileSource, LoadError, load_dataset, parse_dataset};
pub use missions::{FileMissionData, MissionDataError, MissionDataProvider, StaticMissionData};

use anyhow::{Result, anyhow, bail};
use std::env;
use std::path::PathBuf;

pub const APP_NAME: &str = "suivi-dossiers";
pub const DATA_FILE_NAME: &str = "gdp_data.csv";

pub fn default_data_path() -> Result<PathBuf> {
    if let Some(override_path) = env::var_os("DOSSIERS_DATA_PATH") {
        return Ok(PathBuf::from(override_path));
    }

    let data_root = dirs::data_local_dir().ok_or_else(|| {
        anyhow!("cannot resolve data directory; set DOSSIERS_DATA_PATH to the GDP CSV path")
    })?;
    Ok(data_root.join(APP_NAME).join(DATA_FILE_NAME))
}

pub fn validate_data_path(path: &str) -> Result<()> {
    if path.is_empty() {
        bail!("data path must not be empty");
    }

    if let Some(index) = path.find("://")
        && index > 0
    {
        let scheme = &path[..index];
        if scheme.chars().all(char::is_alphabetic) {
            bail!(
                "data path {path:?} looks like a URI ({scheme}://); pass a filesystem path instead"
            );
        }
    }

    if path.starts_with("file:") {
        bail!("data path {path:?} uses file: URI syntax; pass a plain filesystem path");
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::validate_data_path;

    #[test]
    fn validate_data_path_rejects_uri_forms() {
        assert!(validate_data_path("").is_err());
        assert!(validate_data_path("file:gdp.csv").is_err());
        assert!(validate_data_path("https://example.com/gdp.csv").is_err());
        assert!(validate_data_path("/srv/dossiers/gdp_data.csv").is_ok());
        assert!(validate_data_path("data/gdp_data.csv").is_ok());
    }
}
