// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use serde::{Deserialize, Serialize};
use std::ops::RangeInclusive;
use time::Month;

pub const MIN_YEAR: i32 = 1960;
pub const MAX_YEAR: i32 = 2022;
pub const MONTHS_PER_YEAR: usize = 12;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Page {
    Home,
    MissionAudit,
    MissionInspection,
    MissionStudy,
}

impl Page {
    pub const ALL: [Self; 4] = [
        Self::Home,
        Self::MissionAudit,
        Self::MissionInspection,
        Self::MissionStudy,
    ];

    /// Value stored in the per-session slot.
    pub const fn session_value(self) -> &'static str {
        match self {
            Self::Home => "accueil",
            Self::MissionAudit => "page1",
            Self::MissionInspection => "page2",
            Self::MissionStudy => "page3",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "accueil" => Some(Self::Home),
            "page1" => Some(Self::MissionAudit),
            "page2" => Some(Self::MissionInspection),
            "page3" => Some(Self::MissionStudy),
            _ => None,
        }
    }

    /// Restores a page from a session slot. Values that no declared
    /// transition can produce are a configuration fault and land on Home.
    pub fn from_session_value(value: &str) -> Self {
        match Self::parse(value) {
            Some(page) => page,
            None => {
                tracing::error!(
                    value,
                    "unrecognized navigation state in session slot; falling back to home"
                );
                Self::Home
            }
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::Home => "accueil",
            Self::MissionAudit => "audit interne",
            Self::MissionInspection => "inspection et évaluation",
            Self::MissionStudy => "étude et conseil",
        }
    }

    pub const fn heading(self) -> &'static str {
        match self {
            Self::Home => "Page d'accueil",
            Self::MissionAudit => {
                "Bienvenue sur la page présentant l'état des lieux des Missions d’audit interne."
            }
            Self::MissionInspection => {
                "Bienvenue sur la page présentant l'état des lieux des missions d’inspection et d’évaluation."
            }
            Self::MissionStudy => {
                "Bienvenue sur la page présentant l'état des lieux des missions d’étude et conseil."
            }
        }
    }

    /// Actions the page offers, in display order.
    pub const fn triggers(self) -> &'static [Trigger] {
        match self {
            Self::Home => &[
                Trigger::OpenAudit,
                Trigger::OpenInspection,
                Trigger::OpenStudy,
            ],
            Self::MissionAudit | Self::MissionInspection | Self::MissionStudy => {
                &[Trigger::ReturnHome]
            }
        }
    }

    pub fn offers(self, trigger: Trigger) -> bool {
        self.triggers().contains(&trigger)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Trigger {
    OpenAudit,
    OpenInspection,
    OpenStudy,
    ReturnHome,
}

impl Trigger {
    pub const fn label(self) -> &'static str {
        match self {
            Self::OpenAudit => "Missions d’audit interne",
            Self::OpenInspection => "Missions d’inspection et d’évaluation",
            Self::OpenStudy => "Missions d’étude et de conseil",
            Self::ReturnHome => "Retour à l'accueil",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct YearRange {
    min: i32,
    max: i32,
}

impl YearRange {
    pub const DEFAULT: Self = Self {
        min: MIN_YEAR,
        max: MAX_YEAR,
    };

    /// A window inside `MIN_YEAR..=MAX_YEAR`; `None` when inverted or when
    /// either bound falls outside the published series.
    pub const fn new(min: i32, max: i32) -> Option<Self> {
        if min > max || min < MIN_YEAR || max > MAX_YEAR {
            return None;
        }
        Some(Self { min, max })
    }

    pub const fn min(self) -> i32 {
        self.min
    }

    pub const fn max(self) -> i32 {
        self.max
    }

    pub const fn year_count(self) -> usize {
        (self.max.abs_diff(self.min) as usize).saturating_add(1)
    }

    pub fn years(self) -> RangeInclusive<i32> {
        self.min..=self.max
    }

    pub const fn contains(self, year: i32) -> bool {
        year >= self.min && year <= self.max
    }
}

impl Default for YearRange {
    fn default() -> Self {
        Self::DEFAULT
    }
}

/// One source row: a country with one value slot per year of the range.
#[derive(Debug, Clone, PartialEq)]
pub struct WideRecord {
    pub country_name: String,
    pub country_code: String,
    pub values: Vec<Option<f64>>,
}

impl WideRecord {
    /// Unpivots the year columns into long records, holding the country
    /// code fixed. `values` is indexed from `range.min()`.
    pub fn unpivot(&self, range: YearRange) -> impl Iterator<Item = LongRecord> + '_ {
        range
            .years()
            .zip(self.values.iter())
            .map(|(year, value)| LongRecord {
                country_code: self.country_code.clone(),
                year,
                value: *value,
            })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LongRecord {
    pub country_code: String,
    pub year: i32,
    pub value: Option<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DatasetSummary {
    pub countries: usize,
    pub records: usize,
    pub missing_values: usize,
    pub year_range: YearRange,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct MissionCounters {
    pub planned: u32,
    pub due_last_period: u32,
    pub completed: u32,
    pub due_this_period: u32,
    pub completed_on_time: u32,
}

impl MissionCounters {
    pub const fn labeled(self) -> [(&'static str, u32); 5] {
        [
            ("Missions planifiées", self.planned),
            ("Missions échues période précédente", self.due_last_period),
            ("Missions réalisées", self.completed),
            ("Missions échues période en cours", self.due_this_period),
            ("Missions réalisées dans les délais", self.completed_on_time),
        ]
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MonthlyRates {
    pub month: Month,
    pub completion_rate: f64,
    pub on_time_rate: f64,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct MissionSnapshot {
    pub counters: MissionCounters,
    pub monthly: Vec<MonthlyRates>,
}

impl MissionSnapshot {
    /// Pairs two January-first series into monthly points. Both series must
    /// hold exactly one value per calendar month.
    pub fn from_series(
        counters: MissionCounters,
        completion: &[f64],
        on_time: &[f64],
    ) -> Option<Self> {
        if completion.len() != MONTHS_PER_YEAR || on_time.len() != MONTHS_PER_YEAR {
            return None;
        }

        let mut month = Month::January;
        let mut monthly = Vec::with_capacity(MONTHS_PER_YEAR);
        for (completion_rate, on_time_rate) in completion.iter().zip(on_time) {
            monthly.push(MonthlyRates {
                month,
                completion_rate: *completion_rate,
                on_time_rate: *on_time_rate,
            });
            month = month.next();
        }
        Some(Self { counters, monthly })
    }
}

pub const fn month_label_fr(month: Month) -> &'static str {
    match month {
        Month::January => "janv.",
        Month::February => "févr.",
        Month::March => "mars",
        Month::April => "avr.",
        Month::May => "mai",
        Month::June => "juin",
        Month::July => "juil.",
        Month::August => "août",
        Month::September => "sept.",
        Month::October => "oct.",
        Month::November => "nov.",
        Month::December => "déc.",
    }
}

#[cfg(test)]
mod tests {
    use super::{
        LongRecord, MissionCounters, MissionSnapshot, Page, Trigger, WideRecord, YearRange,
        month_label_fr,
    };
    use time::Month;

    #[test]
    fn session_values_round_trip_for_every_page() {
        for page in Page::ALL {
            assert_eq!(Page::parse(page.session_value()), Some(page));
        }
    }

    #[test]
    fn unknown_session_value_falls_back_to_home() {
        assert_eq!(Page::from_session_value("page9"), Page::Home);
        assert_eq!(Page::from_session_value(""), Page::Home);
        assert_eq!(Page::from_session_value("page2"), Page::MissionInspection);
    }

    #[test]
    fn home_offers_three_missions_and_subpages_offer_return() {
        assert_eq!(Page::Home.triggers().len(), 3);
        assert!(!Page::Home.offers(Trigger::ReturnHome));
        for page in [
            Page::MissionAudit,
            Page::MissionInspection,
            Page::MissionStudy,
        ] {
            assert_eq!(page.triggers(), &[Trigger::ReturnHome]);
        }
    }

    #[test]
    fn year_range_rejects_inverted_bounds() {
        assert!(YearRange::new(2000, 1999).is_none());
        let single = YearRange::new(1999, 1999).expect("single year range");
        assert_eq!(single.year_count(), 1);
        assert_eq!(YearRange::DEFAULT.year_count(), 63);
        assert!(YearRange::DEFAULT.contains(1960));
        assert!(!YearRange::DEFAULT.contains(2023));
    }

    #[test]
    fn year_range_stays_inside_the_published_window() {
        assert!(YearRange::new(1900, 2050).is_none());
        assert!(YearRange::new(1959, 1960).is_none());
        assert!(YearRange::new(2022, 2023).is_none());
        assert!(YearRange::new(i32::MIN, i32::MAX).is_none());
        assert_eq!(YearRange::new(1960, 2022), Some(YearRange::DEFAULT));
    }

    #[test]
    fn unpivot_holds_country_code_fixed() {
        let range = YearRange::new(1960, 1961).expect("valid range");
        let row = WideRecord {
            country_name: "Country A".to_owned(),
            country_code: "ABC".to_owned(),
            values: vec![Some(100.0), Some(110.0)],
        };

        let records = row.unpivot(range).collect::<Vec<_>>();
        assert_eq!(
            records,
            vec![
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
    }

    #[test]
    fn mission_snapshot_requires_twelve_points_per_series() {
        let counters = MissionCounters::default();
        assert!(MissionSnapshot::from_series(counters, &[1.0; 11], &[1.0; 12]).is_none());

        let snapshot =
            MissionSnapshot::from_series(counters, &[50.0; 12], &[40.0; 12]).expect("12 points");
        assert_eq!(snapshot.monthly.len(), 12);
        assert_eq!(snapshot.monthly[0].month, Month::January);
        assert_eq!(snapshot.monthly[11].month, Month::December);
    }

    #[test]
    fn month_labels_are_french_abbreviations() {
        assert_eq!(month_label_fr(Month::February), "févr.");
        assert_eq!(month_label_fr(Month::August), "août");
    }
}
