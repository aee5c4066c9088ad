// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::Result;
use dossiers_app::YearRange;
use dossiers_data::{
    DataSource, DatasetCache, FileSource, LoadError, load_dataset, parse_dataset,
};
use dossiers_testkit::{GdpFaker, temp_gdp_csv, wide_csv, write_fixture_csv};
use std::cell::Cell;
use std::collections::BTreeSet;
use std::io::Read;
use std::sync::Arc;
use std::thread;

/// Serves the bytes once; a second open is a test failure.
struct OneShotSource {
    bytes: Vec<u8>,
    opened: Cell<bool>,
}

impl OneShotSource {
    fn new(bytes: Vec<u8>) -> Self {
        Self {
            bytes,
            opened: Cell::new(false),
        }
    }
}

impl DataSource for OneShotSource {
    fn describe(&self) -> String {
        "one-shot".to_owned()
    }

    fn open(&self) -> Result<Box<dyn Read + '_>, LoadError> {
        if self.opened.replace(true) {
            return Err(LoadError::Io {
                origin: self.describe(),
                source: std::io::Error::other("source read twice"),
            });
        }
        Ok(Box::new(self.bytes.as_slice()))
    }
}

#[test]
fn record_count_is_rows_times_years() -> Result<()> {
    for rows in [1_usize, 3, 17] {
        let (_dir, path, _records) = temp_gdp_csv(rows as u64, rows, YearRange::DEFAULT)?;
        let dataset = load_dataset(&FileSource::new(&path), YearRange::DEFAULT)?;
        assert_eq!(dataset.len(), rows * 63, "rows = {rows}");
        assert_eq!(dataset.country_count(), rows);
    }
    Ok(())
}

#[test]
fn every_country_covers_the_full_year_range() -> Result<()> {
    let (_dir, path, _records) = temp_gdp_csv(5, 4, YearRange::DEFAULT)?;
    let dataset = load_dataset(&FileSource::new(&path), YearRange::DEFAULT)?;

    let expected = (1960..=2022).collect::<BTreeSet<i32>>();
    assert_eq!(dataset.distinct_years(), expected);
    assert!(
        dataset
            .records()
            .iter()
            .all(|record| (1960..=2022).contains(&record.year))
    );

    for code in dataset.country_codes() {
        let years = dataset
            .records()
            .iter()
            .filter(|record| record.country_code == code)
            .map(|record| record.year)
            .collect::<BTreeSet<_>>();
        assert_eq!(years, expected, "country {code}");
    }
    Ok(())
}

#[test]
fn long_values_match_wide_cells() -> Result<()> {
    let range = YearRange::new(2000, 2009).expect("valid range");
    let rows = GdpFaker::new(11).rows(6, range);
    let dataset = parse_dataset(wide_csv(&rows, range)?.as_bytes(), "fixture", range)?;

    for row in &rows {
        for (year, expected) in range.years().zip(&row.values) {
            let record = dataset
                .records()
                .iter()
                .find(|record| record.country_code == row.country_code && record.year == year)
                .expect("record for every (country, year)");
            assert_eq!(record.value, *expected);
        }
    }
    Ok(())
}

#[test]
fn narrower_range_reads_only_its_columns() -> Result<()> {
    let (_dir, path, _records) = temp_gdp_csv(2, 5, YearRange::DEFAULT)?;
    let range = YearRange::new(2000, 2004).expect("valid range");
    let dataset = load_dataset(&FileSource::new(&path), range)?;

    assert_eq!(dataset.len(), 25);
    assert_eq!(
        dataset.distinct_years(),
        (2000..=2004).collect::<BTreeSet<_>>()
    );
    Ok(())
}

#[test]
fn range_wider_than_file_is_malformed() -> Result<()> {
    let narrow = YearRange::new(1990, 1999).expect("valid range");
    let (_dir, path, _records) = temp_gdp_csv(3, 2, narrow)?;

    let error = load_dataset(&FileSource::new(&path), YearRange::DEFAULT)
        .expect_err("missing years should fail");
    match error {
        LoadError::MalformedInput { reason, .. } => {
            assert!(reason.contains("1960..1989"), "unexpected reason: {reason}");
            assert!(reason.contains("2000..2022"), "unexpected reason: {reason}");
        }
        other => panic!("expected MalformedInput, got {other:?}"),
    }
    Ok(())
}

#[test]
fn header_without_any_year_column_fails_cleanly() -> Result<()> {
    let (_dir, path) = write_fixture_csv(
        "Country Name,Country Code,Indicator Name\nCountry A,ABC,GDP\nCountry B,BCD,GDP\n",
    )?;
    let cache = DatasetCache::new(FileSource::new(&path), YearRange::DEFAULT);

    let error = cache.get().expect_err("malformed input should fail");
    assert!(matches!(error, LoadError::MalformedInput { .. }));
    assert!(!cache.is_loaded());
    Ok(())
}

#[test]
fn missing_file_is_missing_source() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("absent.csv");

    let error = load_dataset(&FileSource::new(&path), YearRange::DEFAULT)
        .expect_err("missing file should fail");
    assert!(matches!(error, LoadError::MissingSource { .. }));
    assert!(error.to_string().contains("absent.csv"));
    Ok(())
}

#[test]
fn cache_reads_the_source_once() -> Result<()> {
    let range = YearRange::new(1960, 1961).expect("valid range");
    let source = OneShotSource::new(
        b"Country Name,Country Code,1960,1961\nCountry A,ABC,100,110\n".to_vec(),
    );
    let cache = DatasetCache::new(source, range);

    let first = cache.get()?;
    let second = cache.get()?;

    assert!(Arc::ptr_eq(&first, &second));
    assert_eq!(first.records(), second.records());
    assert_eq!(first.len(), 2);
    Ok(())
}

#[test]
fn cache_is_shareable_across_threads() -> Result<()> {
    let (_dir, path, _records) = temp_gdp_csv(8, 3, YearRange::DEFAULT)?;
    let cache = Arc::new(DatasetCache::new(FileSource::new(&path), YearRange::DEFAULT));

    let handles = (0..4)
        .map(|_| {
            let cache = Arc::clone(&cache);
            thread::spawn(move || cache.get().map(|dataset| dataset.len()))
        })
        .collect::<Vec<_>>();

    for handle in handles {
        let len = handle
            .join()
            .map_err(|_| anyhow::anyhow!("loader thread panicked"))??;
        assert_eq!(len, 3 * 63);
    }

    let first = cache.get()?;
    let second = cache.get()?;
    assert!(Arc::ptr_eq(&first, &second));
    Ok(())
}

#[test]
fn summary_reports_counts_and_gaps() -> Result<()> {
    let range = YearRange::new(1960, 1962).expect("valid range");
    let dataset = parse_dataset(
        b"Country Name,Country Code,1960,1961,1962\nA,AAA,,1,2\nB,BBB,3,,\n",
        "inline",
        range,
    )?;

    let summary = dataset.summary();
    assert_eq!(summary.countries, 2);
    assert_eq!(summary.records, 6);
    assert_eq!(summary.missing_values, 3);
    assert_eq!(summary.year_range, range);
    Ok(())
}
