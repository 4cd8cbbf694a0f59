use crate::error::PipelineError;
use crate::util::{display_cases, display_opt_pct, display_opt_rate, display_rate};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use tabled::Tabled;

/// Headers exactly as read plus every cell as text.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawTable {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
    /// Records the reader had to skip.
    pub unreadable_rows: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Disease {
    Measles,
    Rubella,
}

impl Disease {
    pub const ALL: [Disease; 2] = [Disease::Measles, Disease::Rubella];

    pub fn as_str(&self) -> &'static str {
        match self {
            Disease::Measles => "Measles",
            Disease::Rubella => "Rubella",
        }
    }
}

impl fmt::Display for Disease {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Disease {
    type Err = PipelineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "measles" => Ok(Disease::Measles),
            "rubella" => Ok(Disease::Rubella),
            other => Err(PipelineError::InvalidOption(format!("unknown disease `{}`", other))),
        }
    }
}

/// How a case count was established. `Per100k` is derived, never read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum MetricKind {
    Total,
    LabConfirmed,
    Clinical,
    EpiLinked,
    Per100k,
}

impl MetricKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            MetricKind::Total => "total",
            MetricKind::LabConfirmed => "lab_confirmed",
            MetricKind::Clinical => "clinical",
            MetricKind::EpiLinked => "epi_linked",
            MetricKind::Per100k => "per_100k",
        }
    }
}

impl fmt::Display for MetricKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct MetricKey {
    pub disease: Disease,
    pub kind: MetricKind,
}

/// One normalized country-year observation.
#[derive(Debug, Clone, PartialEq)]
pub struct CanonicalRow {
    pub country: String,
    pub region: String,
    pub year: i32,
    pub population: Option<f64>,
    /// Only recognized metric columns; `None` means the cell was empty or
    /// could not be read as a number.
    pub metrics: BTreeMap<MetricKey, Option<f64>>,
}

/// The tidy unit of aggregation.
#[derive(Debug, Clone, PartialEq)]
pub struct LongRecord {
    pub country: String,
    pub region: String,
    pub year: i32,
    pub disease: Disease,
    pub metric_kind: MetricKind,
    pub value: Option<f64>,
}

/// Which slice of the long table a view aggregates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum DiseaseSelector {
    Single(Disease),
    Both,
    Per100k(Disease),
}

impl DiseaseSelector {
    pub fn label(&self) -> String {
        match self {
            DiseaseSelector::Single(d) => d.to_string(),
            DiseaseSelector::Both => "Both".to_string(),
            DiseaseSelector::Per100k(d) => format!("{}_per100k", d),
        }
    }

    /// Series name used by the global trend.
    pub fn series_name(&self) -> String {
        match self {
            DiseaseSelector::Both => "Measles + Rubella".to_string(),
            other => other.label(),
        }
    }
}

impl fmt::Display for DiseaseSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.label())
    }
}

impl FromStr for DiseaseSelector {
    type Err = PipelineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.eq_ignore_ascii_case("both") {
            return Ok(DiseaseSelector::Both);
        }
        let lower = s.to_ascii_lowercase();
        if let Some(name) = lower.strip_suffix("_per100k") {
            return Ok(DiseaseSelector::Per100k(name.parse()?));
        }
        Ok(DiseaseSelector::Single(s.parse()?))
    }
}

impl TryFrom<String> for DiseaseSelector {
    type Error = PipelineError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<DiseaseSelector> for String {
    fn from(value: DiseaseSelector) -> Self {
        value.label()
    }
}

/// Trailing window sizes offered for rolling means.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(try_from = "usize", into = "usize")]
pub enum RollingWindow {
    One,
    #[default]
    Three,
    Five,
}

impl RollingWindow {
    pub fn size(&self) -> usize {
        match self {
            RollingWindow::One => 1,
            RollingWindow::Three => 3,
            RollingWindow::Five => 5,
        }
    }
}

impl TryFrom<usize> for RollingWindow {
    type Error = PipelineError;

    fn try_from(value: usize) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(RollingWindow::One),
            3 => Ok(RollingWindow::Three),
            5 => Ok(RollingWindow::Five),
            other => Err(PipelineError::InvalidOption(format!(
                "rolling window must be 1, 3 or 5 (got {})",
                other
            ))),
        }
    }
}

impl From<RollingWindow> for usize {
    fn from(value: RollingWindow) -> Self {
        value.size()
    }
}

#[derive(Debug, Clone, Serialize, Tabled, PartialEq)]
pub struct TrendRow {
    #[serde(rename = "Group")]
    #[tabled(rename = "Group")]
    pub group: String,
    #[serde(rename = "Year")]
    #[tabled(rename = "Year")]
    pub year: i32,
    #[serde(rename = "Value")]
    #[tabled(rename = "Value", display_with = "display_cases")]
    pub value: f64,
    #[serde(rename = "Rolling")]
    #[tabled(rename = "Rolling", display_with = "display_rate")]
    pub rolling: f64,
    #[serde(rename = "YoY")]
    #[tabled(rename = "YoY", display_with = "display_opt_pct")]
    pub yoy: Option<f64>,
}

#[derive(Debug, Clone, Serialize, Tabled, PartialEq)]
pub struct RankingRow {
    #[serde(rename = "Rank")]
    #[tabled(rename = "Rank")]
    pub rank: usize,
    #[serde(rename = "Country")]
    #[tabled(rename = "Country")]
    pub country: String,
    #[serde(rename = "Value")]
    #[tabled(rename = "Value", display_with = "display_cases")]
    pub value: f64,
}

/// One cell of the region-by-year confirmation heatmap, in percent.
#[derive(Debug, Clone, Serialize, Tabled, PartialEq)]
pub struct RateCell {
    #[serde(rename = "Region")]
    #[tabled(rename = "Region")]
    pub region: String,
    #[serde(rename = "Year")]
    #[tabled(rename = "Year")]
    pub year: i32,
    #[serde(rename = "LabConfirmedPct")]
    #[tabled(rename = "LabConfirmedPct", display_with = "display_opt_rate")]
    pub rate: Option<f64>,
}

#[derive(Debug, Clone, Serialize, Tabled, PartialEq)]
pub struct MapRow {
    #[serde(rename = "Country")]
    #[tabled(rename = "Country")]
    pub country: String,
    #[serde(rename = "Value")]
    #[tabled(rename = "Value", display_with = "display_cases")]
    pub value: f64,
}

#[derive(Debug, Clone, Serialize, Tabled, PartialEq)]
pub struct DiseaseComparisonRow {
    #[serde(rename = "Disease")]
    #[tabled(rename = "Disease")]
    pub disease: Disease,
    #[serde(rename = "TotalCases")]
    #[tabled(rename = "TotalCases", display_with = "display_cases")]
    pub total: f64,
    #[serde(rename = "LabConfirmed")]
    #[tabled(rename = "LabConfirmed", display_with = "display_cases")]
    pub lab_confirmed: f64,
}

#[derive(Debug, Clone, Serialize, Tabled, PartialEq)]
pub struct RegionShareRow {
    #[serde(rename = "Region")]
    #[tabled(rename = "Region")]
    pub region: String,
    #[serde(rename = "Total")]
    #[tabled(rename = "Total", display_with = "display_cases")]
    pub total: f64,
    #[serde(rename = "SharePct")]
    #[tabled(rename = "SharePct", display_with = "display_rate")]
    pub share_pct: f64,
}

/// Headline numbers for the filtered period.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct KpiSummary {
    pub period_total: f64,
    pub latest_year: Option<i32>,
    pub latest_total: f64,
    pub yoy_latest: Option<f64>,
    pub countries: usize,
}

/// Row of the filtered long-form download, in its fixed column order.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ExportRow {
    pub country: String,
    pub region: String,
    pub disease: String,
    pub year: i32,
    pub value: Option<f64>,
}

#[derive(Debug, Serialize)]
pub struct SummaryReport {
    pub generated_at: String,
    pub disease: String,
    pub year_range: (i32, i32),
    pub regions: Vec<String>,
    pub kpis: KpiSummary,
    pub disease_comparison: Vec<DiseaseComparisonRow>,
    pub region_share: Vec<RegionShareRow>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn selector_labels_parse_back() {
        for label in ["Measles", "Rubella", "Both", "Measles_per100k", "Rubella_per100k"] {
            let sel: DiseaseSelector = label.parse().unwrap();
            assert_eq!(sel.label(), label);
        }
        assert_eq!(
            "rubella_PER100K".parse::<DiseaseSelector>().unwrap(),
            DiseaseSelector::Per100k(Disease::Rubella)
        );
        assert!("Mumps".parse::<DiseaseSelector>().is_err());
    }

    #[test]
    fn metric_kind_names_match_column_suffixes() {
        let names: Vec<String> = [
            MetricKind::Total,
            MetricKind::LabConfirmed,
            MetricKind::Clinical,
            MetricKind::EpiLinked,
            MetricKind::Per100k,
        ]
        .iter()
        .map(ToString::to_string)
        .collect();
        assert_eq!(names, ["total", "lab_confirmed", "clinical", "epi_linked", "per_100k"]);
    }

    #[test]
    fn rolling_window_only_accepts_offered_sizes() {
        assert_eq!(RollingWindow::try_from(5).unwrap().size(), 5);
        assert!(RollingWindow::try_from(2).is_err());
        assert_eq!(RollingWindow::default(), RollingWindow::Three);
    }
}
