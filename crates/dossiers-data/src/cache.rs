// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use crate::loader::{DataSource, Dataset, LoadError, load_dataset};
use dossiers_app::YearRange;
use std::sync::{Arc, PoisonError, RwLock};
use std::time::{Duration, Instant};

/// Load-once holder for the long-format table. Built at startup and handed
/// to whoever needs the data; the only shared mutable state in the process.
///
/// Without a TTL the first successful load is kept for the life of the
/// cache. Concurrent first reads may each load the source, but only one
/// result is stored.
#[derive(Debug)]
pub struct DatasetCache<S> {
    source: S,
    range: YearRange,
    ttl: Option<Duration>,
    entry: RwLock<Option<CacheEntry>>,
}

#[derive(Debug)]
struct CacheEntry {
    dataset: Arc<Dataset>,
    stored_at: Instant,
}

impl<S: DataSource> DatasetCache<S> {
    pub fn new(source: S, range: YearRange) -> Self {
        Self {
            source,
            range,
            ttl: None,
            entry: RwLock::new(None),
        }
    }

    pub fn with_ttl(mut self, ttl: Option<Duration>) -> Self {
        self.ttl = ttl;
        self
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    pub fn range(&self) -> YearRange {
        self.range
    }

    pub fn ttl(&self) -> Option<Duration> {
        self.ttl
    }

    pub fn get(&self) -> Result<Arc<Dataset>, LoadError> {
        {
            let guard = self.entry.read().unwrap_or_else(PoisonError::into_inner);
            if let Some(entry) = guard.as_ref()
                && self.is_fresh(entry)
            {
                tracing::trace!(source = %self.source.describe(), "dataset cache hit");
                return Ok(Arc::clone(&entry.dataset));
            }
        }

        let dataset = Arc::new(load_dataset(&self.source, self.range)?);

        let mut guard = self.entry.write().unwrap_or_else(PoisonError::into_inner);
        if let Some(entry) = guard.as_ref()
            && self.is_fresh(entry)
        {
            return Ok(Arc::clone(&entry.dataset));
        }
        if guard.is_some() {
            tracing::info!(source = %self.source.describe(), "dataset cache entry expired");
        }
        *guard = Some(CacheEntry {
            dataset: Arc::clone(&dataset),
            stored_at: Instant::now(),
        });
        Ok(dataset)
    }

    /// Drops the stored table; the next `get` reads the source again.
    pub fn invalidate(&self) {
        let mut guard = self.entry.write().unwrap_or_else(PoisonError::into_inner);
        if guard.take().is_some() {
            tracing::debug!(source = %self.source.describe(), "dataset cache invalidated");
        }
    }

    pub fn is_loaded(&self) -> bool {
        let guard = self.entry.read().unwrap_or_else(PoisonError::into_inner);
        guard.as_ref().is_some_and(|entry| self.is_fresh(entry))
    }

    fn is_fresh(&self, entry: &CacheEntry) -> bool {
        match self.ttl {
            Some(ttl) => entry.stored_at.elapsed() < ttl,
            None => true,
        }
    }
}
