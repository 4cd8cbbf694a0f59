//! The loaded, immutable dataset every query reads from.

use crate::error::Result;
use crate::filter::FilterSpec;
use crate::loader;
use crate::normalize::{normalize, LoadReport};
use crate::reshape::to_long;
use crate::types::{CanonicalRow, DiseaseSelector, LongRecord, RawTable};
use std::collections::BTreeSet;
use std::path::Path;

/// Normalized wide rows plus their long projection, built once per load
/// and only ever read afterwards. Reloading builds a new value.
#[derive(Debug, Clone)]
pub struct Dataset {
    rows: Vec<CanonicalRow>,
    long: Vec<LongRecord>,
    available: Vec<DiseaseSelector>,
    regions: Vec<String>,
    years: Option<(i32, i32)>,
    report: LoadReport,
}

impl Dataset {
    pub fn from_raw(raw: &RawTable) -> Result<Dataset> {
        let normalized = normalize(raw)?;
        let long = to_long(&normalized.rows);

        let regions: BTreeSet<&str> = normalized.rows.iter().map(|r| r.region.as_str()).collect();
        let years = normalized
            .rows
            .iter()
            .map(|r| r.year)
            .fold(None, |acc: Option<(i32, i32)>, y| match acc {
                Some((lo, hi)) => Some((lo.min(y), hi.max(y))),
                None => Some((y, y)),
            });
        log::info!(
            "dataset ready: {} long records, {} regions, years {:?}",
            long.records.len(),
            regions.len(),
            years
        );

        Ok(Dataset {
            regions: regions.into_iter().map(str::to_string).collect(),
            rows: normalized.rows,
            long: long.records,
            available: long.available_selectors,
            years,
            report: normalized.report,
        })
    }

    pub fn load<P: AsRef<Path>>(path: P) -> Result<Dataset> {
        let raw = loader::load_raw(path)?;
        Dataset::from_raw(&raw)
    }

    pub fn rows(&self) -> &[CanonicalRow] {
        &self.rows
    }

    pub fn records(&self) -> &[LongRecord] {
        &self.long
    }

    pub fn report(&self) -> &LoadReport {
        &self.report
    }

    /// Sorted distinct regions.
    pub fn regions(&self) -> &[String] {
        &self.regions
    }

    /// `(first, last)` year present, `None` for an empty dataset.
    pub fn year_bounds(&self) -> Option<(i32, i32)> {
        self.years
    }

    /// Disease options with data behind them; per-100k options only appear
    /// when a population denominator was available.
    pub fn available_selectors(&self) -> &[DiseaseSelector] {
        &self.available
    }

    pub fn offers(&self, selector: DiseaseSelector) -> bool {
        self.available.contains(&selector)
    }

    /// The "everything selected" view: all regions, every year.
    pub fn default_filter(&self, disease: DiseaseSelector) -> FilterSpec {
        let years = self.years.unwrap_or((i32::MIN, i32::MAX));
        FilterSpec::new(disease, years, self.regions.iter().cloned())
    }
}
