//! Schema normalization: raw headers and cells into [`CanonicalRow`]s.

use crate::error::{PipelineError, Result};
use crate::types::{CanonicalRow, Disease, MetricKey, MetricKind, RawTable};
use crate::util::{canonical_header, parse_f64_safe, parse_i32_safe};
use once_cell::sync::Lazy;
use std::collections::{BTreeMap, HashMap, HashSet};

pub const COUNTRY: &str = "country";
pub const REGION: &str = "region";
pub const YEAR: &str = "year";
const POPULATION_ALIASES: [&str; 3] = ["population", "total_population", "pop"];

/// Canonical metric column name -> (disease, kind). Hyphenated spellings
/// come from the WHO spreadsheet headers.
static METRIC_COLUMNS: Lazy<HashMap<String, MetricKey>> = Lazy::new(|| {
    let kinds: [(&str, MetricKind); 6] = [
        ("total", MetricKind::Total),
        ("lab_confirmed", MetricKind::LabConfirmed),
        ("lab-confirmed", MetricKind::LabConfirmed),
        ("clinical", MetricKind::Clinical),
        ("epi_linked", MetricKind::EpiLinked),
        ("epi-linked", MetricKind::EpiLinked),
    ];
    let mut map = HashMap::new();
    for disease in Disease::ALL {
        let prefix = disease.as_str().to_lowercase();
        for (suffix, kind) in kinds {
            map.insert(format!("{}_{}", prefix, suffix), MetricKey { disease, kind });
        }
    }
    map
});

/// Look up a canonical column name in the fixed metric table.
pub fn metric_for_column(canonical: &str) -> Option<MetricKey> {
    METRIC_COLUMNS.get(canonical).copied()
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Column {
    Country,
    Region,
    Year,
    Population,
    Metric(MetricKey),
    Ignored,
}

/// What happened while normalizing, for console diagnostics.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LoadReport {
    pub total_rows: usize,
    pub kept_rows: usize,
    /// Records the CSV reader could not parse.
    pub unreadable_rows: usize,
    pub duplicate_rows: usize,
    pub merged_rows: usize,
    pub invalid_rows: usize,
    pub coerced_cells: usize,
    pub ignored_columns: Vec<String>,
    pub duplicate_headers: Vec<String>,
}

#[derive(Debug, Clone, Default)]
pub struct NormalizedTable {
    /// Canonical header names in source order, first occurrence only.
    pub headers: Vec<String>,
    pub rows: Vec<CanonicalRow>,
    pub report: LoadReport,
}

/// Normalize a raw table into canonical rows.
///
/// Rows sharing (country, year), such as monthly reports, are merged by
/// summing each metric; a merged metric stays absent only if every part was
/// absent. The first row's region is kept.
pub fn normalize(raw: &RawTable) -> Result<NormalizedTable> {
    let mut report = LoadReport {
        total_rows: raw.rows.len(),
        unreadable_rows: raw.unreadable_rows,
        ..LoadReport::default()
    };

    let mut seen = HashSet::new();
    let mut headers = Vec::new();
    let mut columns = Vec::with_capacity(raw.headers.len());
    for h in &raw.headers {
        let name = canonical_header(h);
        if !seen.insert(name.clone()) {
            log::warn!("duplicate column `{}` ignored", name);
            report.duplicate_headers.push(name);
            columns.push(Column::Ignored);
            continue;
        }
        let column = match name.as_str() {
            COUNTRY => Column::Country,
            REGION => Column::Region,
            YEAR => Column::Year,
            n if POPULATION_ALIASES.contains(&n) => Column::Population,
            n => match metric_for_column(n) {
                Some(key) => Column::Metric(key),
                None => {
                    report.ignored_columns.push(name.clone());
                    Column::Ignored
                }
            },
        };
        columns.push(column);
        headers.push(name);
    }

    let missing: Vec<String> = [COUNTRY, REGION, YEAR]
        .into_iter()
        .filter(|req| !headers.iter().any(|h| h.as_str() == *req))
        .map(|req| req.to_string())
        .collect();
    if !missing.is_empty() {
        return Err(PipelineError::Schema { missing });
    }

    let mut index: HashMap<(String, i32), usize> = HashMap::new();
    let mut rows: Vec<CanonicalRow> = Vec::new();
    let mut unique_rows = HashSet::new();

    for (line, cells) in raw.rows.iter().enumerate() {
        if !unique_rows.insert(cells) {
            report.duplicate_rows += 1;
            continue;
        }

        let mut country = None;
        let mut region = None;
        let mut year_cell = None;
        let mut population = None;
        let mut metrics = BTreeMap::new();
        for (col, column) in columns.iter().enumerate() {
            let cell = cells.get(col).map(String::as_str);
            match column {
                Column::Country => country = cell.map(|c| c.trim().to_string()),
                Column::Region => region = cell.map(|c| c.trim().to_string()),
                Column::Year => year_cell = cell,
                Column::Population => population = coerce(cell, line, &mut report),
                Column::Metric(key) => {
                    metrics.insert(*key, coerce(cell, line, &mut report));
                }
                Column::Ignored => {}
            }
        }

        let country = country.unwrap_or_default();
        let year = match parse_i32_safe(year_cell) {
            Some(y) if !country.is_empty() => y,
            _ => {
                log::debug!("row {}: missing country or invalid year {:?}", line + 1, year_cell);
                report.invalid_rows += 1;
                continue;
            }
        };
        let region = region.unwrap_or_default();

        let key = (country.clone(), year);
        match index.get(&key) {
            Some(&i) => {
                if rows[i].region != region {
                    log::warn!(
                        "row {}: {} {} listed under `{}` and `{}`, keeping `{}`",
                        line + 1,
                        country,
                        year,
                        rows[i].region,
                        region,
                        rows[i].region
                    );
                }
                merge_into(&mut rows[i], population, metrics);
                report.merged_rows += 1;
            }
            None => {
                index.insert(key, rows.len());
                rows.push(CanonicalRow {
                    country,
                    region,
                    year,
                    population,
                    metrics,
                });
            }
        }
    }

    report.kept_rows = rows.len();
    log::info!(
        "normalized {} rows into {} country-years ({} duplicates, {} invalid, {} cells unreadable)",
        report.total_rows,
        report.kept_rows,
        report.duplicate_rows,
        report.invalid_rows,
        report.coerced_cells
    );
    Ok(NormalizedTable {
        headers,
        rows,
        report,
    })
}

/// Numeric coercion; a non-blank cell that fails to parse is counted.
fn coerce(cell: Option<&str>, line: usize, report: &mut LoadReport) -> Option<f64> {
    let value = parse_f64_safe(cell);
    if value.is_none() {
        if let Some(text) = cell.filter(|c| !c.trim().is_empty()) {
            log::debug!("row {}: `{}` is not numeric, treated as absent", line + 1, text);
            report.coerced_cells += 1;
        }
    }
    value
}

fn merge_into(
    row: &mut CanonicalRow,
    population: Option<f64>,
    metrics: BTreeMap<MetricKey, Option<f64>>,
) {
    row.population = row.population.or(population);
    for (key, value) in metrics {
        let slot = row.metrics.entry(key).or_insert(None);
        *slot = match (*slot, value) {
            (Some(a), Some(b)) => Some(a + b),
            (a, b) => a.or(b),
        };
    }
}
