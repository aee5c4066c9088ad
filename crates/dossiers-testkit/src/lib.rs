// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Context, Result, anyhow};
use dossiers_app::{WideRecord, YearRange};
use std::fs;
use std::path::PathBuf;

const COUNTRIES: [(&str, &str); 16] = [
    ("Côte d'Ivoire", "CIV"),
    ("Senegal", "SEN"),
    ("Mali", "MLI"),
    ("Burkina Faso", "BFA"),
    ("Ghana", "GHA"),
    ("Benin", "BEN"),
    ("Togo", "TGO"),
    ("Niger", "NER"),
    ("Guinea", "GIN"),
    ("Cameroon", "CMR"),
    ("France", "FRA"),
    ("Korea, Rep.", "KOR"),
    ("Egypt, Arab Rep.", "EGY"),
    ("Morocco", "MAR"),
    ("Tunisia", "TUN"),
    ("Gabon", "GAB"),
];

const INDICATOR_NAME: &str = "GDP (current US$)";
const INDICATOR_CODE: &str = "NY.GDP.MKTP.CD";

#[derive(Debug, Clone)]
struct DeterministicRng {
    state: u64,
}

impl DeterministicRng {
    fn new(seed: u64) -> Self {
        let mut state = seed ^ 0x9E37_79B9_7F4A_7C15;
        if state == 0 {
            state = 0xA409_3822_299F_31D0;
        }
        Self { state }
    }

    fn next_u64(&mut self) -> u64 {
        self.state = self
            .state
            .wrapping_mul(6_364_136_223_846_793_005)
            .wrapping_add(1_442_695_040_888_963_407);

        let mut x = self.state;
        x ^= x >> 13;
        x ^= x << 7;
        x ^= x >> 17;
        x
    }

    fn int_n(&mut self, n: usize) -> usize {
        if n <= 1 {
            return 0;
        }
        (self.next_u64() % (n as u64)) as usize
    }

    fn unit(&mut self) -> f64 {
        (self.next_u64() >> 11) as f64 / (1_u64 << 53) as f64
    }
}

/// Generates plausible wide-format GDP rows. Same seed, same rows.
#[derive(Debug, Clone)]
pub struct GdpFaker {
    rng: DeterministicRng,
}

impl GdpFaker {
    pub fn new(seed: u64) -> Self {
        let normalized = if seed == 0 { 1 } else { seed };
        Self {
            rng: DeterministicRng::new(normalized),
        }
    }

    /// `count` rows with a leading run of missing years (series that start
    /// late) followed by a noisy growth curve.
    pub fn rows(&mut self, count: usize, range: YearRange) -> Vec<WideRecord> {
        (0..count).map(|index| self.row(index, range)).collect()
    }

    fn row(&mut self, index: usize, range: YearRange) -> WideRecord {
        let (name, code) = COUNTRIES[index % COUNTRIES.len()];
        let round = index / COUNTRIES.len();
        let (country_name, country_code) = if round == 0 {
            (name.to_owned(), code.to_owned())
        } else {
            (format!("{name} {round}"), format!("{code}{round}"))
        };

        let years = range.year_count();
        let gap = self.rng.int_n(years.min(12));
        let mut value = 1.0e8 * (1.0 + 50.0 * self.rng.unit());
        let mut values = Vec::with_capacity(years);
        for offset in 0..years {
            if offset < gap {
                values.push(None);
                continue;
            }
            let growth = 0.97 + 0.12 * self.rng.unit();
            value *= growth;
            values.push(Some(value.round()));
        }

        WideRecord {
            country_name,
            country_code,
            values,
        }
    }
}

/// Renders rows the way the World Bank export lays them out: name, code,
/// two indicator columns, then one column per year.
pub fn wide_csv(rows: &[WideRecord], range: YearRange) -> Result<String> {
    let mut writer = csv::Writer::from_writer(Vec::new());

    let mut header = vec![
        "Country Name".to_owned(),
        "Country Code".to_owned(),
        "Indicator Name".to_owned(),
        "Indicator Code".to_owned(),
    ];
    header.extend(range.years().map(|year| year.to_string()));
    writer.write_record(&header).context("write CSV header")?;

    for row in rows {
        let mut record = vec![
            row.country_name.clone(),
            row.country_code.clone(),
            INDICATOR_NAME.to_owned(),
            INDICATOR_CODE.to_owned(),
        ];
        record.extend(
            row.values
                .iter()
                .map(|value| value.map(|value| value.to_string()).unwrap_or_default()),
        );
        writer
            .write_record(&record)
            .with_context(|| format!("write CSV row for {}", row.country_code))?;
    }

    let bytes = writer
        .into_inner()
        .map_err(|error| anyhow!("flush CSV writer: {}", error.error()))?;
    String::from_utf8(bytes).context("CSV output is not UTF-8")
}

/// Writes `contents` to `gdp_data.csv` inside a fresh temp dir. Keep the
/// returned dir alive for as long as the file is needed.
pub fn write_fixture_csv(contents: &str) -> Result<(tempfile::TempDir, PathBuf)> {
    let dir = tempfile::tempdir().context("create temp dir")?;
    let path = dir.path().join("gdp_data.csv");
    fs::write(&path, contents).with_context(|| format!("write fixture {}", path.display()))?;
    Ok((dir, path))
}

pub fn temp_gdp_csv(
    seed: u64,
    rows: usize,
    range: YearRange,
) -> Result<(tempfile::TempDir, PathBuf, Vec<WideRecord>)> {
    let records = GdpFaker::new(seed).rows(rows, range);
    let (dir, path) = write_fixture_csv(&wide_csv(&records, range)?)?;
    Ok((dir, path, records))
}

pub fn country_codes() -> impl Iterator<Item = &'static str> {
    COUNTRIES.iter().map(|(_, code)| *code)
}

#[cfg(test)]
mod tests {
    use super::{GdpFaker, country_codes, temp_gdp_csv, wide_csv};
    use anyhow::Result;
    use dossiers_app::YearRange;
    use std::collections::BTreeSet;

    #[test]
    fn same_seed_same_rows() {
        let left = GdpFaker::new(42).rows(5, YearRange::DEFAULT);
        let right = GdpFaker::new(42).rows(5, YearRange::DEFAULT);
        assert_eq!(left, right);
    }

    #[test]
    fn rows_cover_every_year_of_the_range() {
        let range = YearRange::new(1990, 1999).expect("valid range");
        let rows = GdpFaker::new(7).rows(3, range);
        assert!(rows.iter().all(|row| row.values.len() == 10));
        assert!(
            rows.iter()
                .all(|row| row.values.last().copied().flatten().is_some())
        );
    }

    #[test]
    fn country_codes_stay_unique_past_the_first_round() {
        let rows = GdpFaker::new(3).rows(40, YearRange::DEFAULT);
        let codes = rows
            .iter()
            .map(|row| row.country_code.as_str())
            .collect::<BTreeSet<_>>();
        assert_eq!(codes.len(), 40);
        assert_eq!(country_codes().count(), 16);
    }

    #[test]
    fn csv_quotes_names_with_commas() -> Result<()> {
        let range = YearRange::new(2000, 2001).expect("valid range");
        let rows = GdpFaker::new(1).rows(12, range);
        let text = wide_csv(&rows, range)?;

        assert!(text.starts_with("Country Name,Country Code,Indicator Name,Indicator Code,2000,2001\n"));
        assert!(text.contains("\"Korea, Rep.\",KOR"));
        assert_eq!(text.lines().count(), 13);
        Ok(())
    }

    #[test]
    fn temp_csv_exists_while_dir_is_alive() -> Result<()> {
        let (dir, path, rows) = temp_gdp_csv(9, 2, YearRange::DEFAULT)?;
        assert!(path.exists());
        assert_eq!(rows.len(), 2);
        drop(dir);
        assert!(!path.exists());
        Ok(())
    }
}
