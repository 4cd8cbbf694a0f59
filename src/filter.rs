//! Composable predicates over the long table.

use crate::types::{Disease, DiseaseSelector, LongRecord, MetricKind};
use std::collections::BTreeSet;

/// An immutable description of the active view.
///
/// An empty region set means nothing is selected: it filters everything out
/// rather than meaning "all regions".
#[derive(Debug, Clone, PartialEq)]
pub struct FilterSpec {
    pub disease: DiseaseSelector,
    /// Inclusive `(lo, hi)`; `lo > hi` selects nothing.
    pub years: (i32, i32),
    pub regions: BTreeSet<String>,
}

impl FilterSpec {
    pub fn new<I, S>(disease: DiseaseSelector, years: (i32, i32), regions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        FilterSpec {
            disease,
            years,
            regions: regions.into_iter().map(Into::into).collect(),
        }
    }

    /// Year range and region membership, ignoring the disease selector.
    pub fn in_scope(&self, r: &LongRecord) -> bool {
        let (lo, hi) = self.years;
        r.year >= lo && r.year <= hi && self.regions.contains(&r.region)
    }

    /// Whether the disease selector admits this record. Only `total` rows
    /// back the plain and combined views so confirmation subtypes are
    /// never double counted.
    pub fn selects(&self, r: &LongRecord) -> bool {
        match self.disease {
            DiseaseSelector::Single(d) => r.disease == d && r.metric_kind == MetricKind::Total,
            DiseaseSelector::Both => r.metric_kind == MetricKind::Total,
            DiseaseSelector::Per100k(d) => r.disease == d && r.metric_kind == MetricKind::Per100k,
        }
    }

    /// Copy of this spec restricted to a single disease's totals.
    pub fn with_disease(&self, disease: Disease) -> FilterSpec {
        FilterSpec {
            disease: DiseaseSelector::Single(disease),
            ..self.clone()
        }
    }
}

/// Records admitted by every predicate of `spec`, borrowed from `long`.
pub fn filter<'a>(long: &'a [LongRecord], spec: &FilterSpec) -> Vec<&'a LongRecord> {
    long.iter()
        .filter(|r| spec.in_scope(r) && spec.selects(r))
        .collect()
}

/// Records inside the year range and region set, every disease and kind.
pub fn filter_scope<'a>(long: &'a [LongRecord], spec: &FilterSpec) -> Vec<&'a LongRecord> {
    long.iter().filter(|r| spec.in_scope(r)).collect()
}
