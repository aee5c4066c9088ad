// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use dossiers_app::{DatasetSummary, LongRecord, WideRecord, YearRange};
use sha2::{Digest, Sha256};
use std::collections::BTreeSet;
use std::fs::File;
use std::io::{self, BufReader, Read};
use std::path::{Path, PathBuf};
use thiserror::Error;
use time::OffsetDateTime;

const COUNTRY_NAME: &str = "Country Name";
const COUNTRY_CODE: &str = "Country Code";

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("data source {origin} does not exist")]
    MissingSource { origin: String },
    #[error("data source {origin} is malformed: {reason}")]
    MalformedInput { origin: String, reason: String },
    #[error("read data source {origin}")]
    Io {
        origin: String,
        #[source]
        source: io::Error,
    },
    #[error(
        "invalid year range {min}..={max}; min_year must not exceed max_year and both must lie in {}..={}",
        dossiers_app::MIN_YEAR,
        dossiers_app::MAX_YEAR
    )]
    InvalidRange { min: i32, max: i32 },
}

impl LoadError {
    pub fn checked_range(min: i32, max: i32) -> Result<YearRange, Self> {
        YearRange::new(min, max).ok_or(Self::InvalidRange { min, max })
    }
}

/// Where the wide-format table comes from.
pub trait DataSource {
    fn describe(&self) -> String;
    fn open(&self) -> Result<Box<dyn Read + '_>, LoadError>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileSource {
    path: PathBuf,
}

impl FileSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl DataSource for FileSource {
    fn describe(&self) -> String {
        self.path.display().to_string()
    }

    fn open(&self) -> Result<Box<dyn Read + '_>, LoadError> {
        match File::open(&self.path) {
            Ok(file) => Ok(Box::new(BufReader::new(file))),
            Err(error) if error.kind() == io::ErrorKind::NotFound => {
                Err(LoadError::MissingSource {
                    origin: self.describe(),
                })
            }
            Err(source) => Err(LoadError::Io {
                origin: self.describe(),
                source,
            }),
        }
    }
}

/// Long-format table plus what is known about where it came from.
#[derive(Debug, Clone, PartialEq)]
pub struct Dataset {
    records: Vec<LongRecord>,
    countries: usize,
    year_range: YearRange,
    checksum: String,
    loaded_at: OffsetDateTime,
}

impl Dataset {
    pub fn records(&self) -> &[LongRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn country_count(&self) -> usize {
        self.countries
    }

    pub fn year_range(&self) -> YearRange {
        self.year_range
    }

    /// Hex SHA-256 of the raw source bytes.
    pub fn checksum(&self) -> &str {
        &self.checksum
    }

    pub fn loaded_at(&self) -> OffsetDateTime {
        self.loaded_at
    }

    pub fn distinct_years(&self) -> BTreeSet<i32> {
        self.records.iter().map(|record| record.year).collect()
    }

    pub fn country_codes(&self) -> BTreeSet<&str> {
        self.records
            .iter()
            .map(|record| record.country_code.as_str())
            .collect()
    }

    pub fn missing_values(&self) -> usize {
        self.records
            .iter()
            .filter(|record| record.value.is_none())
            .count()
    }

    pub fn summary(&self) -> DatasetSummary {
        DatasetSummary {
            countries: self.countries,
            records: self.records.len(),
            missing_values: self.missing_values(),
            year_range: self.year_range,
        }
    }
}

pub fn load_dataset<S: DataSource + ?Sized>(
    source: &S,
    range: YearRange,
) -> Result<Dataset, LoadError> {
    let origin = source.describe();
    tracing::info!(
        source = %origin,
        min_year = range.min(),
        max_year = range.max(),
        "loading dataset"
    );

    let mut bytes = Vec::new();
    source
        .open()?
        .read_to_end(&mut bytes)
        .map_err(|source| LoadError::Io {
            origin: origin.clone(),
            source,
        })?;

    let dataset = parse_dataset(&bytes, &origin, range)?;
    tracing::info!(
        source = %origin,
        countries = dataset.country_count(),
        records = dataset.len(),
        missing = dataset.missing_values(),
        "dataset loaded"
    );
    Ok(dataset)
}

/// Reads a wide table and unpivots every year column of `range` into long
/// records. Nothing is returned unless the whole input parses.
pub fn parse_dataset(bytes: &[u8], origin: &str, range: YearRange) -> Result<Dataset, LoadError> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::Headers)
        .from_reader(bytes);

    let headers = reader
        .headers()
        .map_err(|error| csv_error(origin, error))?
        .clone();
    let columns =
        ColumnMap::resolve(&headers, range).map_err(|reason| LoadError::MalformedInput {
            origin: origin.to_owned(),
            reason,
        })?;

    let mut records = Vec::new();
    let mut countries = 0usize;
    for row in reader.records() {
        let row = row.map_err(|error| csv_error(origin, error))?;
        records.extend(columns.wide_record(&row).unpivot(range));
        countries += 1;
    }

    Ok(Dataset {
        records,
        countries,
        year_range: range,
        checksum: checksum_sha256(bytes),
        loaded_at: OffsetDateTime::now_utc(),
    })
}

#[derive(Debug)]
struct ColumnMap {
    name: Option<usize>,
    code: usize,
    years: Vec<usize>,
}

impl ColumnMap {
    fn resolve(headers: &csv::StringRecord, range: YearRange) -> Result<Self, String> {
        let position = |label: &str| {
            headers
                .iter()
                .position(|header| header.trim_start_matches('\u{feff}') == label)
        };

        let code = position(COUNTRY_CODE)
            .ok_or_else(|| format!("header has no {COUNTRY_CODE:?} column"))?;

        let mut years = Vec::with_capacity(range.year_count());
        let mut missing = Vec::new();
        for year in range.years() {
            match position(&year.to_string()) {
                Some(index) => years.push(index),
                None => missing.push(year),
            }
        }
        if !missing.is_empty() {
            return Err(format!(
                "header is missing year columns {}",
                format_year_runs(&missing)
            ));
        }

        Ok(Self {
            name: position(COUNTRY_NAME),
            code,
            years,
        })
    }

    fn wide_record(&self, row: &csv::StringRecord) -> WideRecord {
        WideRecord {
            country_name: self
                .name
                .and_then(|index| row.get(index))
                .unwrap_or_default()
                .to_owned(),
            country_code: row.get(self.code).unwrap_or_default().to_owned(),
            values: self
                .years
                .iter()
                .map(|index| row.get(*index).and_then(parse_value))
                .collect(),
        }
    }
}

fn parse_value(cell: &str) -> Option<f64> {
    cell.trim()
        .parse::<f64>()
        .ok()
        .filter(|value| value.is_finite())
}

fn csv_error(origin: &str, error: csv::Error) -> LoadError {
    if !error.is_io_error() {
        return LoadError::MalformedInput {
            origin: origin.to_owned(),
            reason: error.to_string(),
        };
    }

    match error.into_kind() {
        csv::ErrorKind::Io(source) => LoadError::Io {
            origin: origin.to_owned(),
            source,
        },
        other => LoadError::MalformedInput {
            origin: origin.to_owned(),
            reason: format!("{other:?}"),
        },
    }
}

/// Collapses sorted years into `1960..1965, 1970` runs.
fn format_year_runs(years: &[i32]) -> String {
    let mut runs: Vec<(i32, i32)> = Vec::new();
    for year in years {
        match runs.last_mut() {
            Some((_, end)) if *end + 1 == *year => *end = *year,
            _ => runs.push((*year, *year)),
        }
    }

    runs.iter()
        .map(|(start, end)| {
            if start == end {
                start.to_string()
            } else {
                format!("{start}..{end}")
            }
        })
        .collect::<Vec<_>>()
        .join(", ")
}

fn checksum_sha256(data: &[u8]) -> String {
    let digest = Sha256::digest(data);
    let mut output = String::with_capacity(64);
    for byte in digest {
        use std::fmt::Write as _;
        let _ = write!(&mut output, "{byte:02x}");
    }
    output
}

#[cfg(test)]
mod tests {
    use super::{LoadError, format_year_runs, parse_dataset, parse_value};
    use dossiers_app::{LongRecord, YearRange};

    fn range(min: i32, max: i32) -> YearRange {
        YearRange::new(min, max).expect("valid range")
    }

    #[test]
    fn two_year_row_unpivots_to_two_records() -> Result<(), LoadError> {
        let input = b"Country Name,Country Code,1960,1961\nCountry A,ABC,100,110\n";
        let dataset = parse_dataset(input, "inline", range(1960, 1961))?;

        assert_eq!(
            dataset.records(),
            &[
                LongRecord {
                    country_code: "ABC".to_owned(),
                    year: 1960,
                    value: Some(100.0),
                },
                LongRecord {
                    country_code: "ABC".to_owned(),
                    year: 1961,
                    value: Some(110.0),
                },
            ]
        );
        assert_eq!(dataset.country_count(), 1);
        Ok(())
    }

    #[test]
    fn blank_and_text_cells_become_missing() -> Result<(), LoadError> {
        let input = b"Country Name,Country Code,1960,1961,1962\nX,XXX,,n/a,3.5\n";
        let dataset = parse_dataset(input, "inline", range(1960, 1962))?;

        let values = dataset
            .records()
            .iter()
            .map(|record| record.value)
            .collect::<Vec<_>>();
        assert_eq!(values, vec![None, None, Some(3.5)]);
        assert_eq!(dataset.missing_values(), 2);
        Ok(())
    }

    #[test]
    fn columns_outside_range_and_extra_metadata_are_ignored() -> Result<(), LoadError> {
        let input = b"Country Name,Country Code,Indicator Name,1959,1960,2023\nA,AAA,GDP,1,2,3\n";
        let dataset = parse_dataset(input, "inline", range(1960, 1960))?;

        assert_eq!(dataset.len(), 1);
        assert_eq!(dataset.records()[0].value, Some(2.0));
        Ok(())
    }

    #[test]
    fn header_without_year_columns_is_malformed() {
        let input = b"Country Name,Country Code,Indicator Name\nA,AAA,GDP\n";
        let error = parse_dataset(input, "inline", YearRange::DEFAULT)
            .expect_err("missing years should fail");

        match error {
            LoadError::MalformedInput { reason, .. } => {
                assert!(reason.contains("1960..2022"), "unexpected reason: {reason}");
            }
            other => panic!("expected MalformedInput, got {other:?}"),
        }
    }

    #[test]
    fn header_without_country_code_is_malformed() {
        let input = b"Country Name,1960\nA,1\n";
        let error =
            parse_dataset(input, "inline", range(1960, 1960)).expect_err("no code column");
        assert!(matches!(error, LoadError::MalformedInput { .. }));
        assert!(error.to_string().contains("Country Code"));
    }

    #[test]
    fn ragged_row_fails_without_partial_table() {
        let input = b"Country Name,Country Code,1960\nA,AAA,1\nB,BBB\n";
        let error = parse_dataset(input, "inline", range(1960, 1960)).expect_err("ragged row");
        assert!(matches!(error, LoadError::MalformedInput { .. }));
    }

    #[test]
    fn empty_input_is_malformed() {
        let error = parse_dataset(b"", "inline", range(1960, 1960)).expect_err("empty input");
        assert!(matches!(error, LoadError::MalformedInput { .. }));
    }

    #[test]
    fn padded_headers_and_bom_are_tolerated() -> Result<(), LoadError> {
        let input = "\u{feff}Country Name, Country Code , 1960\nA,AAA,7\n";
        let dataset = parse_dataset(input.as_bytes(), "inline", range(1960, 1960))?;
        assert_eq!(dataset.records()[0].country_code, "AAA");
        Ok(())
    }

    #[test]
    fn checksum_tracks_source_bytes() -> Result<(), LoadError> {
        let first = parse_dataset(b"Country Code,1960\nA,1\n", "a", range(1960, 1960))?;
        let same = parse_dataset(b"Country Code,1960\nA,1\n", "b", range(1960, 1960))?;
        let other = parse_dataset(b"Country Code,1960\nA,2\n", "c", range(1960, 1960))?;

        assert_eq!(first.checksum().len(), 64);
        assert_eq!(first.checksum(), same.checksum());
        assert_ne!(first.checksum(), other.checksum());
        Ok(())
    }

    #[test]
    fn parse_value_drops_non_finite_numbers() {
        assert_eq!(parse_value(" 12.5 "), Some(12.5));
        assert_eq!(parse_value("NaN"), None);
        assert_eq!(parse_value("inf"), None);
        assert_eq!(parse_value(""), None);
    }

    #[test]
    fn year_runs_collapse_contiguous_spans() {
        assert_eq!(format_year_runs(&[1960, 1961, 1962, 1970]), "1960..1962, 1970");
        assert_eq!(format_year_runs(&[2001]), "2001");
    }

    #[test]
    fn checked_range_rejects_inverted_bounds() {
        assert!(LoadError::checked_range(1960, 2022).is_ok());
        let error = LoadError::checked_range(2022, 1960).expect_err("inverted range");
        assert!(error.to_string().contains("min_year"));
    }

    #[test]
    fn checked_range_rejects_years_outside_the_series() {
        let error = LoadError::checked_range(1900, 1901).expect_err("pre-1960 range");
        assert!(matches!(
            error,
            LoadError::InvalidRange {
                min: 1900,
                max: 1901
            }
        ));
        assert!(error.to_string().contains("1960..=2022"));
    }
}
