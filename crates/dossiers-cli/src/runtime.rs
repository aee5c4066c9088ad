// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Context, Result};
use dossiers_app::{DatasetSummary, MissionSnapshot};
use dossiers_data::{DataSource, DatasetCache, MissionDataProvider};

/// Wires the dataset cache and the mission provider into the router.
pub struct DashboardRuntime<'a, S> {
    cache: &'a DatasetCache<S>,
    missions: Box<dyn MissionDataProvider + 'a>,
}

impl<'a, S: DataSource> DashboardRuntime<'a, S> {
    pub fn new(cache: &'a DatasetCache<S>, missions: Box<dyn MissionDataProvider + 'a>) -> Self {
        Self { cache, missions }
    }
}

impl<S: DataSource> dossiers_tui::AppRuntime for DashboardRuntime<'_, S> {
    fn load_dataset_summary(&mut self) -> Result<DatasetSummary> {
        let dataset = self
            .cache
            .get()
            .with_context(|| format!("load dataset from {}", self.cache.source().describe()))?;
        Ok(dataset.summary())
    }

    fn load_mission_snapshot(&mut self) -> Result<MissionSnapshot> {
        self.missions
            .mission_snapshot()
            .with_context(|| format!("load mission figures from {}", self.missions.describe()))
    }
}
