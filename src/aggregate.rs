//! Grouped sums and derived time-series metrics.
//!
//! None of these functions sort their input series: callers pass series
//! already ordered by year.

use crate::types::{LongRecord, RollingWindow, TrendRow};
use std::collections::BTreeMap;
use std::fmt;

/// A field of [`LongRecord`] usable as part of a group key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GroupBy {
    Country,
    Region,
    Year,
    Disease,
    MetricKind,
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum KeyPart {
    Text(String),
    Year(i32),
}

impl KeyPart {
    fn of(r: &LongRecord, by: GroupBy) -> KeyPart {
        match by {
            GroupBy::Country => KeyPart::Text(r.country.clone()),
            GroupBy::Region => KeyPart::Text(r.region.clone()),
            GroupBy::Year => KeyPart::Year(r.year),
            GroupBy::Disease => KeyPart::Text(r.disease.to_string()),
            GroupBy::MetricKind => KeyPart::Text(r.metric_kind.to_string()),
        }
    }

    pub fn year(&self) -> Option<i32> {
        match self {
            KeyPart::Year(y) => Some(*y),
            KeyPart::Text(_) => None,
        }
    }
}

impl fmt::Display for KeyPart {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KeyPart::Text(s) => f.write_str(s),
            KeyPart::Year(y) => write!(f, "{}", y),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct GroupSum {
    pub key: Vec<KeyPart>,
    pub value: f64,
}

/// Sum `value` per key tuple, sorted by key. Absent values add 0, so a
/// group of only absent values is indistinguishable from a zero total.
pub fn group_sum<'a, I>(records: I, keys: &[GroupBy]) -> Vec<GroupSum>
where
    I: IntoIterator<Item = &'a LongRecord>,
{
    let mut groups: BTreeMap<Vec<KeyPart>, f64> = BTreeMap::new();
    for r in records {
        let key = keys.iter().map(|k| KeyPart::of(r, *k)).collect();
        *groups.entry(key).or_insert(0.0) += r.value.unwrap_or(0.0);
    }
    groups
        .into_iter()
        .map(|(key, value)| GroupSum { key, value })
        .collect()
}

/// Split sums grouped by `[.., Year]` into one year-ordered series per
/// leading key. Sums whose last key part is not a year are skipped.
pub fn series_by_prefix(sums: Vec<GroupSum>) -> BTreeMap<Vec<KeyPart>, Vec<(i32, f64)>> {
    let mut out: BTreeMap<Vec<KeyPart>, Vec<(i32, f64)>> = BTreeMap::new();
    for GroupSum { mut key, value } in sums {
        let Some(year) = key.pop().and_then(|k| k.year()) else {
            continue;
        };
        out.entry(key).or_default().push((year, value));
    }
    out
}

/// Trailing simple moving average with min-periods 1.
pub fn rolling_mean(series: &[f64], window: RollingWindow) -> Vec<f64> {
    let w = window.size();
    (0..series.len())
        .map(|i| {
            let start = (i + 1).saturating_sub(w);
            let slice = &series[start..=i];
            slice.iter().sum::<f64>() / slice.len() as f64
        })
        .collect()
}

/// Year-over-year relative change, `value[t] / value[t-1] - 1`.
///
/// `None` at index 0 and wherever either side is absent or the previous
/// value is zero.
pub fn yoy(series: &[Option<f64>]) -> Vec<Option<f64>> {
    let mut out = Vec::with_capacity(series.len());
    for (i, current) in series.iter().enumerate() {
        let prev = if i == 0 { None } else { series[i - 1] };
        let ratio = match (prev, current) {
            (Some(p), Some(c)) if p != 0.0 => Some(c / p - 1.0),
            _ => None,
        };
        out.push(ratio.filter(|r| r.is_finite()));
    }
    out
}

/// Attach rolling mean and YoY to one year-ordered series.
pub fn trend_rows(group: &str, series: &[(i32, f64)], window: RollingWindow) -> Vec<TrendRow> {
    let values: Vec<f64> = series.iter().map(|(_, v)| *v).collect();
    let rolling = rolling_mean(&values, window);
    let present: Vec<Option<f64>> = values.iter().copied().map(Some).collect();
    let changes = yoy(&present);
    series
        .iter()
        .zip(rolling)
        .zip(changes)
        .map(|(((year, value), rolling), yoy)| TrendRow {
            group: group.to_string(),
            year: *year,
            value: *value,
            rolling,
            yoy,
        })
        .collect()
}
