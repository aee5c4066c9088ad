// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use dossiers_app::{MONTHS_PER_YEAR, MissionCounters, MissionSnapshot};
use serde::Deserialize;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

const SAMPLE_COUNTERS: MissionCounters = MissionCounters {
    planned: 42,
    due_last_period: 11,
    completed: 29,
    due_this_period: 8,
    completed_on_time: 24,
};

const SAMPLE_COMPLETION_RATES: [f64; MONTHS_PER_YEAR] = [
    62.0, 65.0, 68.0, 70.0, 71.5, 74.0, 73.0, 76.5, 79.0, 81.0, 84.5, 88.0,
];

const SAMPLE_ON_TIME_RATES: [f64; MONTHS_PER_YEAR] = [
    48.0, 50.5, 53.0, 55.0, 54.0, 58.5, 60.0, 61.5, 64.0, 66.0, 69.5, 72.0,
];

#[derive(Debug, Error)]
pub enum MissionDataError {
    #[error("mission data file {} does not exist", path.display())]
    MissingSource { path: PathBuf },
    #[error("read mission data file {}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("parse mission data file {}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
    #[error("mission data in {origin} is invalid: {reason}")]
    Invalid { origin: String, reason: String },
}

/// Supplies the counters and monthly rate series shown on the audit page.
pub trait MissionDataProvider {
    fn describe(&self) -> String;
    fn mission_snapshot(&self) -> Result<MissionSnapshot, MissionDataError>;
}

/// Fixed sample figures. No mission-tracking source exists yet, so this is
/// the default provider.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StaticMissionData;

impl MissionDataProvider for StaticMissionData {
    fn describe(&self) -> String {
        "built-in sample figures".to_owned()
    }

    fn mission_snapshot(&self) -> Result<MissionSnapshot, MissionDataError> {
        snapshot_from_parts(
            &self.describe(),
            SAMPLE_COUNTERS,
            &SAMPLE_COMPLETION_RATES,
            &SAMPLE_ON_TIME_RATES,
        )
    }
}

/// Reads figures from a TOML file shaped like:
///
/// ```toml
/// [counters]
/// planned = 42
/// due_last_period = 11
/// completed = 29
/// due_this_period = 8
/// completed_on_time = 24
///
/// [rates]
/// completion = [62.0, 65.0, ...] # 12 values, January first
/// on_time = [48.0, 50.5, ...]
/// ```
///
/// The file is re-read on every call so edits show up on the next visit to
/// the audit page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileMissionData {
    path: PathBuf,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct MissionFile {
    counters: MissionCounters,
    rates: RateSeries,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RateSeries {
    completion: Vec<f64>,
    on_time: Vec<f64>,
}

impl FileMissionData {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl MissionDataProvider for FileMissionData {
    fn describe(&self) -> String {
        self.path.display().to_string()
    }

    fn mission_snapshot(&self) -> Result<MissionSnapshot, MissionDataError> {
        let raw = fs::read_to_string(&self.path).map_err(|source| {
            if source.kind() == io::ErrorKind::NotFound {
                MissionDataError::MissingSource {
                    path: self.path.clone(),
                }
            } else {
                MissionDataError::Io {
                    path: self.path.clone(),
                    source,
                }
            }
        })?;
        let file: MissionFile =
            toml::from_str(&raw).map_err(|source| MissionDataError::Parse {
                path: self.path.clone(),
                source,
            })?;

        snapshot_from_parts(
            &self.describe(),
            file.counters,
            &file.rates.completion,
            &file.rates.on_time,
        )
    }
}

fn snapshot_from_parts(
    origin: &str,
    counters: MissionCounters,
    completion: &[f64],
    on_time: &[f64],
) -> Result<MissionSnapshot, MissionDataError> {
    let invalid = |reason: String| MissionDataError::Invalid {
        origin: origin.to_owned(),
        reason,
    };

    for (name, series) in [("completion", completion), ("on_time", on_time)] {
        if series.len() != MONTHS_PER_YEAR {
            return Err(invalid(format!(
                "rates.{name} has {} values; expected {MONTHS_PER_YEAR} (January to December)",
                series.len()
            )));
        }
        if let Some(value) = series
            .iter()
            .find(|value| !(0.0..=100.0).contains(*value))
        {
            return Err(invalid(format!(
                "rates.{name} contains {value}; rates are percentages between 0 and 100"
            )));
        }
    }

    if counters.completed_on_time > counters.completed {
        return Err(invalid(format!(
            "counters.completed_on_time ({}) exceeds counters.completed ({})",
            counters.completed_on_time, counters.completed
        )));
    }

    MissionSnapshot::from_series(counters, completion, on_time)
        .ok_or_else(|| invalid("rate series could not be paired by month".to_owned()))
}
