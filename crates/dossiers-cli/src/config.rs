// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Context, Result, anyhow, bail};
use dossiers_app::{MAX_YEAR, MIN_YEAR, YearRange};
use serde::Deserialize;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

const CONFIG_VERSION: i64 = 1;
const DEFAULT_STATUS_CLEAR: &str = "4s";

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub version: i64,
    #[serde(default)]
    pub data: Data,
    #[serde(default)]
    pub missions: Missions,
    #[serde(default)]
    pub ui: Ui,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            version: CONFIG_VERSION,
            data: Data::default(),
            missions: Missions::default(),
            ui: Ui::default(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Data {
    pub path: Option<String>,
    pub min_year: Option<i32>,
    pub max_year: Option<i32>,
    pub cache_ttl: Option<String>,
}

impl Default for Data {
    fn default() -> Self {
        Self {
            path: None,
            min_year: Some(MIN_YEAR),
            max_year: Some(MAX_YEAR),
            cache_ttl: None,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Missions {
    pub snapshot_path: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Ui {
    pub status_clear: Option<String>,
}

impl Default for Ui {
    fn default() -> Self {
        Self {
            status_clear: Some(DEFAULT_STATUS_CLEAR.to_owned()),
        }
    }
}

impl Config {
    pub fn default_path() -> Result<PathBuf> {
        if let Some(path) = env::var_os("DOSSIERS_CONFIG_PATH") {
            return Ok(PathBuf::from(path));
        }

        let config_root = dirs::config_dir().ok_or_else(|| {
            anyhow!("cannot resolve config directory; set DOSSIERS_CONFIG_PATH to the config file")
        })?;

        let app_dir = config_root.join(dossiers_data::APP_NAME);
        fs::create_dir_all(&app_dir)
            .with_context(|| format!("create config directory {}", app_dir.display()))?;
        Ok(app_dir.join("config.toml"))
    }

    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let raw = fs::read_to_string(path)
            .with_context(|| format!("read config file {}", path.display()))?;
        let value: toml::Value = toml::from_str(&raw)
            .with_context(|| format!("parse TOML config {}", path.display()))?;

        let version = value
            .get("version")
            .and_then(toml::Value::as_integer)
            .ok_or_else(|| {
                anyhow!(
                    "config file {} has no version; add `version = 1` and put values under [data], [missions], and [ui]",
                    path.display()
                )
            })?;

        if version != CONFIG_VERSION {
            bail!(
                "unsupported config version {} in {}; expected version = 1",
                version,
                path.display()
            );
        }

        let config: Config = value
            .try_into()
            .with_context(|| format!("decode config {}", path.display()))?;
        config.validate(path)?;
        Ok(config)
    }

    fn validate(&self, path: &Path) -> Result<()> {
        if self.version != CONFIG_VERSION {
            bail!(
                "config {} has version {}; expected 1",
                path.display(),
                self.version
            );
        }

        if let Some(data_path) = &self.data.path {
            dossiers_data::validate_data_path(data_path)
                .with_context(|| format!("invalid data.path in {}", path.display()))?;
        }

        for (key, year) in [("min_year", self.min_year()), ("max_year", self.max_year())] {
            if !(MIN_YEAR..=MAX_YEAR).contains(&year) {
                bail!(
                    "data.{key} in {} must lie in {MIN_YEAR}..={MAX_YEAR}, got {year}",
                    path.display()
                );
            }
        }

        if self.year_range().is_none() {
            bail!(
                "data.min_year ({}) in {} must not be after data.max_year ({})",
                self.min_year(),
                path.display(),
                self.max_year()
            );
        }

        if let Some(ttl) = &self.data.cache_ttl {
            let parsed = parse_duration(ttl)?;
            if parsed <= Duration::ZERO {
                bail!(
                    "data.cache_ttl in {} must be positive, got {}",
                    path.display(),
                    ttl
                );
            }
        }

        if let Some(snapshot_path) = &self.missions.snapshot_path
            && snapshot_path.trim().is_empty()
        {
            bail!(
                "missions.snapshot_path in {} must not be empty; remove it to use the built-in figures",
                path.display()
            );
        }

        if let Some(status_clear) = &self.ui.status_clear {
            let parsed = parse_duration(status_clear)?;
            if parsed <= Duration::ZERO {
                bail!(
                    "ui.status_clear in {} must be positive, got {}",
                    path.display(),
                    status_clear
                );
            }
        }

        Ok(())
    }

    /// `--data` wins over `[data].path`, which wins over `DOSSIERS_DATA_PATH`.
    pub fn data_path(&self, cli_override: Option<&Path>) -> Result<PathBuf> {
        if let Some(path) = cli_override {
            return Ok(path.to_path_buf());
        }
        match &self.data.path {
            Some(path) => Ok(PathBuf::from(path)),
            None => dossiers_data::default_data_path(),
        }
    }

    pub fn min_year(&self) -> i32 {
        self.data.min_year.unwrap_or(MIN_YEAR)
    }

    pub fn max_year(&self) -> i32 {
        self.data.max_year.unwrap_or(MAX_YEAR)
    }

    pub fn year_range(&self) -> Option<YearRange> {
        YearRange::new(self.min_year(), self.max_year())
    }

    pub fn cache_ttl(&self) -> Result<Option<Duration>> {
        self.data
            .cache_ttl
            .as_deref()
            .map(parse_duration)
            .transpose()
    }

    pub fn mission_snapshot_path(&self) -> Option<PathBuf> {
        self.missions.snapshot_path.as_ref().map(PathBuf::from)
    }

    pub fn status_clear(&self) -> Result<Duration> {
        parse_duration(
            self.ui
                .status_clear
                .as_deref()
                .unwrap_or(DEFAULT_STATUS_CLEAR),
        )
    }

    pub fn example_config(path: &Path) -> String {
        format!(
            "# suivi-dossiers config\n# Place this file at: {}\n\nversion = 1\n\n[data]\n# Optional. Default is DOSSIERS_DATA_PATH, then the platform data dir\n# (for example ~/.local/share/{}/{})\n# path = \"/absolute/path/to/gdp_data.csv\"\nmin_year = {}\nmax_year = {}\n# Optional. Omit to keep the table for the life of the process.\n# cache_ttl = \"1d\"\n\n[missions]\n# Optional. Omit to show the built-in sample figures.\n# snapshot_path = \"/absolute/path/to/missions.toml\"\n\n[ui]\nstatus_clear = \"{}\"\n",
            path.display(),
            dossiers_data::APP_NAME,
            dossiers_data::DATA_FILE_NAME,
            MIN_YEAR,
            MAX_YEAR,
            DEFAULT_STATUS_CLEAR,
        )
    }
}

fn parse_duration(raw: &str) -> Result<Duration> {
    if let Some(value) = raw.strip_suffix("ms") {
        let millis: u64 = value
            .parse()
            .with_context(|| format!("invalid duration {raw:?}"))?;
        return Ok(Duration::from_millis(millis));
    }

    let units = [('s', 1_u64), ('m', 60), ('h', 3_600), ('d', 86_400)];
    for (suffix, seconds_per_unit) in units {
        if let Some(value) = raw.strip_suffix(suffix) {
            let count: u64 = value
                .parse()
                .with_context(|| format!("invalid duration {raw:?}"))?;
            let secs = count
                .checked_mul(seconds_per_unit)
                .ok_or_else(|| anyhow!("duration {raw:?} is too large"))?;
            return Ok(Duration::from_secs(secs));
        }
    }

    bail!(
        "invalid duration {raw:?}; use one of: <N>ms, <N>s, <N>m, <N>h, <N>d (for example 500ms or 1d)"
    )
}
