//! Named views over a [`Dataset`]: filter first, then aggregate.
//!
//! Every query returns an empty vector (or zeroed summary) when the filter
//! leaves nothing, so callers can show a "no data" state.

use crate::aggregate::{group_sum, series_by_prefix, trend_rows, GroupBy, KeyPart};
use crate::dataset::Dataset;
use crate::filter::{filter, filter_scope, FilterSpec};
use crate::types::{
    Disease, DiseaseComparisonRow, DiseaseSelector, ExportRow, KpiSummary, LongRecord, MapRow,
    MetricKind, RankingRow, RateCell, RegionShareRow, RollingWindow, TrendRow,
};
use crate::util::mean_present;
use std::cmp::Ordering;
use std::collections::{BTreeMap, HashSet};

fn selected<'a>(ds: &'a Dataset, spec: &FilterSpec, view: &str) -> Vec<&'a LongRecord> {
    let records = filter(ds.records(), spec);
    if records.is_empty() {
        log::warn!("{}: no records for {} in {:?}", view, spec.disease, spec.years);
    }
    records
}

fn text(part: Option<&KeyPart>) -> String {
    part.map(ToString::to_string).unwrap_or_default()
}

/// Yearly totals for the selected disease (combined for `Both`).
pub fn global_trend(ds: &Dataset, spec: &FilterSpec, window: RollingWindow) -> Vec<TrendRow> {
    let records = selected(ds, spec, "global trend");
    let series: Vec<(i32, f64)> = group_sum(records, &[GroupBy::Year])
        .into_iter()
        .filter_map(|s| s.key.first().and_then(KeyPart::year).map(|y| (y, s.value)))
        .collect();
    trend_rows(&spec.disease.series_name(), &series, window)
}

/// One yearly series per region, each with its own rolling mean and YoY.
pub fn regional_trend(ds: &Dataset, spec: &FilterSpec, window: RollingWindow) -> Vec<TrendRow> {
    let records = selected(ds, spec, "regional trend");
    let sums = group_sum(records, &[GroupBy::Region, GroupBy::Year]);
    series_by_prefix(sums)
        .into_iter()
        .flat_map(|(key, series)| trend_rows(&text(key.first()), &series, window))
        .collect()
}

/// Countries by period total, highest first; ties break by name.
pub fn country_ranking(ds: &Dataset, spec: &FilterSpec, top_n: usize) -> Vec<RankingRow> {
    let records = selected(ds, spec, "country ranking");
    let mut totals: Vec<(String, f64)> = group_sum(records, &[GroupBy::Country])
        .into_iter()
        .map(|s| (text(s.key.first()), s.value))
        .collect();
    totals.sort_by(|a, b| {
        b.1.partial_cmp(&a.1)
            .unwrap_or(Ordering::Equal)
            .then_with(|| a.0.cmp(&b.0))
    });
    totals
        .into_iter()
        .take(top_n)
        .enumerate()
        .map(|(idx, (country, value))| RankingRow {
            rank: idx + 1,
            country,
            value,
        })
        .collect()
}

/// All countries in ranking order, for picking a country trend.
pub fn ranked_countries(ds: &Dataset, spec: &FilterSpec) -> Vec<String> {
    country_ranking(ds, spec, usize::MAX)
        .into_iter()
        .map(|r| r.country)
        .collect()
}

pub fn country_trend(
    ds: &Dataset,
    spec: &FilterSpec,
    country: &str,
    window: RollingWindow,
) -> Vec<TrendRow> {
    let records: Vec<&LongRecord> = selected(ds, spec, "country trend")
        .into_iter()
        .filter(|r| r.country == country)
        .collect();
    if records.is_empty() {
        log::warn!("country trend: no records for `{}`", country);
    }
    let series: Vec<(i32, f64)> = group_sum(records, &[GroupBy::Year])
        .into_iter()
        .filter_map(|s| s.key.first().and_then(KeyPart::year).map(|y| (y, s.value)))
        .collect();
    trend_rows(country, &series, window)
}

/// Per (region, year): mean over countries of `lab_confirmed / total * 100`.
///
/// A country with a zero or absent total, or an absent lab count, has no
/// rate; a cell where no country has a rate is absent.
pub fn confirmation_rate_matrix(ds: &Dataset, spec: &FilterSpec, disease: Disease) -> Vec<RateCell> {
    type Counts = (Option<f64>, Option<f64>);
    let mut cells: BTreeMap<(String, i32), BTreeMap<&str, Counts>> = BTreeMap::new();
    for r in filter_scope(ds.records(), spec) {
        if r.disease != disease {
            continue;
        }
        let slot = match r.metric_kind {
            MetricKind::Total | MetricKind::LabConfirmed => cells
                .entry((r.region.clone(), r.year))
                .or_default()
                .entry(r.country.as_str())
                .or_default(),
            _ => continue,
        };
        if r.metric_kind == MetricKind::Total {
            slot.0 = r.value;
        } else {
            slot.1 = r.value;
        }
    }

    cells
        .into_iter()
        .map(|((region, year), countries)| {
            let rates: Vec<Option<f64>> = countries
                .values()
                .map(|(total, lab)| match (total, lab) {
                    (Some(t), Some(l)) if *t > 0.0 => Some(l / t * 100.0),
                    _ => None,
                })
                .collect();
            RateCell {
                region,
                year,
                rate: mean_present(&rates),
            }
        })
        .collect()
}

/// Headline numbers: period total, latest year, YoY of latest vs previous.
pub fn kpi_summary(ds: &Dataset, spec: &FilterSpec) -> KpiSummary {
    let records = selected(ds, spec, "kpi summary");
    let period_total: f64 = records.iter().filter_map(|r| r.value).sum();
    let latest_year = records.iter().map(|r| r.year).max();
    let year_total = |year: i32| -> f64 {
        records
            .iter()
            .filter(|r| r.year == year)
            .filter_map(|r| r.value)
            .sum()
    };
    let latest_total = latest_year.map(year_total).unwrap_or(0.0);
    let yoy_latest = latest_year
        .filter(|y| records.iter().any(|r| r.year == y - 1))
        .map(|y| year_total(y - 1))
        .filter(|prev| *prev > 0.0)
        .map(|prev| latest_total / prev - 1.0);
    let countries: HashSet<&str> = records.iter().map(|r| r.country.as_str()).collect();
    KpiSummary {
        period_total,
        latest_year,
        latest_total,
        yoy_latest,
        countries: countries.len(),
    }
}

/// Per-country totals for one year, the feed for a choropleth map.
pub fn map_snapshot(ds: &Dataset, spec: &FilterSpec, year: i32) -> Vec<MapRow> {
    let records: Vec<&LongRecord> = selected(ds, spec, "map snapshot")
        .into_iter()
        .filter(|r| r.year == year)
        .collect();
    group_sum(records, &[GroupBy::Country])
        .into_iter()
        .map(|s| MapRow {
            country: text(s.key.first()),
            value: s.value,
        })
        .collect()
}

/// Total and lab-confirmed sums per disease over the selected years and
/// regions. Diseases with no records in range are left out.
pub fn disease_comparison(ds: &Dataset, spec: &FilterSpec) -> Vec<DiseaseComparisonRow> {
    let scope = filter_scope(ds.records(), spec);
    Disease::ALL
        .into_iter()
        .filter(|d| scope.iter().any(|r| r.disease == *d))
        .map(|disease| {
            let sum_kind = |kind: MetricKind| -> f64 {
                scope
                    .iter()
                    .filter(|r| r.disease == disease && r.metric_kind == kind)
                    .filter_map(|r| r.value)
                    .sum()
            };
            DiseaseComparisonRow {
                disease,
                total: sum_kind(MetricKind::Total),
                lab_confirmed: sum_kind(MetricKind::LabConfirmed),
            }
        })
        .collect()
}

/// Each region's share of a disease's total; regions with no cases are
/// omitted.
pub fn region_share(ds: &Dataset, spec: &FilterSpec, disease: Disease) -> Vec<RegionShareRow> {
    let records = filter(ds.records(), &spec.with_disease(disease));
    let totals: Vec<(String, f64)> = group_sum(records, &[GroupBy::Region])
        .into_iter()
        .map(|s| (text(s.key.first()), s.value))
        .filter(|(_, v)| *v > 0.0)
        .collect();
    let grand: f64 = totals.iter().map(|(_, v)| v).sum();
    totals
        .into_iter()
        .map(|(region, total)| RegionShareRow {
            region,
            total,
            share_pct: total / grand * 100.0,
        })
        .collect()
}

/// The filtered long table in download order: country, region, disease,
/// year.
pub fn export_rows(ds: &Dataset, spec: &FilterSpec) -> Vec<ExportRow> {
    let mut records = filter(ds.records(), spec);
    records.sort_by(|a, b| {
        a.country
            .cmp(&b.country)
            .then_with(|| a.region.cmp(&b.region))
            .then_with(|| a.disease.cmp(&b.disease))
            .then_with(|| a.year.cmp(&b.year))
    });
    records
        .into_iter()
        .map(|r| ExportRow {
            country: r.country.clone(),
            region: r.region.clone(),
            disease: match r.metric_kind {
                MetricKind::Per100k => DiseaseSelector::Per100k(r.disease).label(),
                _ => r.disease.to_string(),
            },
            year: r.year,
            value: r.value,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{DiseaseSelector, RawTable};
    use approx::assert_relative_eq;

    const HEADERS: [&str; 7] = [
        "Country",
        "Region",
        "Year",
        "Measles Total",
        "Measles \nlab-confirmed",
        "Rubella\nTotal",
        "Population",
    ];

    fn dataset(rows: &[[&str; 7]]) -> Dataset {
        let raw = RawTable {
            headers: HEADERS.iter().map(|s| s.to_string()).collect(),
            rows: rows
                .iter()
                .map(|r| r.iter().map(|s| s.to_string()).collect())
                .collect(),
            ..RawTable::default()
        };
        Dataset::from_raw(&raw).unwrap()
    }

    fn sample() -> Dataset {
        dataset(&[
            ["Afghanistan", "EMR", "2020", "100", "40", "2", ""],
            ["Afghanistan", "EMR", "2021", "150", "30", "0", ""],
            ["Afghanistan", "EMR", "2022", "0", "0", "1", ""],
            ["Pakistan", "EMR", "2021", "300", "150", "5", ""],
            ["Chad", "AFR", "2021", "50", "", "", ""],
            ["Chad", "AFR", "2022", "0", "0", "", ""],
        ])
    }

    fn measles(ds: &Dataset) -> FilterSpec {
        ds.default_filter(DiseaseSelector::Single(Disease::Measles))
    }

    #[test]
    fn global_trend_sums_per_year_with_yoy() {
        let ds = sample();
        let rows = global_trend(&ds, &measles(&ds), RollingWindow::One);
        let values: Vec<(i32, f64)> = rows.iter().map(|r| (r.year, r.value)).collect();
        assert_eq!(values, vec![(2020, 100.0), (2021, 500.0), (2022, 0.0)]);
        assert_eq!(rows[0].yoy, None);
        assert_relative_eq!(rows[1].yoy.unwrap(), 4.0);
        assert_relative_eq!(rows[2].yoy.unwrap(), -1.0);
        assert!(rows.iter().all(|r| r.group == "Measles"));
    }

    #[test]
    fn global_trend_both_combines_diseases() {
        let ds = sample();
        let spec = ds.default_filter(DiseaseSelector::Both);
        let rows = global_trend(&ds, &spec, RollingWindow::Three);
        assert_eq!(rows[0].value, 102.0);
        assert_eq!(rows[1].value, 505.0);
        assert_eq!(rows[0].group, "Measles + Rubella");
    }

    #[test]
    fn country_trend_matches_afghanistan_example() {
        let ds = sample();
        let rows = country_trend(&ds, &measles(&ds), "Afghanistan", RollingWindow::Three);
        let yoy: Vec<Option<f64>> = rows.iter().map(|r| r.yoy).collect();
        assert_eq!(yoy, vec![None, Some(0.5), Some(-1.0)]);
        assert_relative_eq!(rows[2].rolling, 250.0 / 3.0);
    }

    #[test]
    fn regional_trend_keeps_series_separate() {
        let ds = sample();
        let rows = regional_trend(&ds, &measles(&ds), RollingWindow::Three);
        let afr: Vec<_> = rows.iter().filter(|r| r.group == "AFR").collect();
        assert_eq!(afr.len(), 2);
        assert_eq!(afr[0].yoy, None);
        assert_eq!(afr[1].rolling, 25.0);
        assert_eq!(rows.first().map(|r| r.group.as_str()), Some("AFR"));
    }

    #[test]
    fn ranking_orders_and_truncates() {
        let ds = sample();
        let rows = country_ranking(&ds, &measles(&ds), 2);
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].country, "Pakistan");
        assert_eq!(rows[0].rank, 1);
        assert_eq!(rows[1].country, "Afghanistan");
        assert_eq!(ranked_countries(&ds, &measles(&ds)).len(), 3);
    }

    #[test]
    fn confirmation_rates_average_countries_and_absent_on_zero_totals() {
        let ds = sample();
        let cells = confirmation_rate_matrix(&ds, &measles(&ds), Disease::Measles);
        let get = |region: &str, year: i32| {
            cells
                .iter()
                .find(|c| c.region == region && c.year == year)
                .map(|c| c.rate)
        };
        // (30/150 + 150/300) / 2 * 100
        assert_relative_eq!(get("EMR", 2021).flatten().unwrap(), 35.0);
        assert_eq!(get("EMR", 2022), Some(None));
        assert_eq!(get("AFR", 2021), Some(None));
        assert_eq!(get("AFR", 2022), Some(None));
    }

    #[test]
    fn kpis_report_latest_year_change() {
        let ds = sample();
        let kpi = kpi_summary(&ds, &measles(&ds));
        assert_eq!(kpi.period_total, 600.0);
        assert_eq!(kpi.latest_year, Some(2022));
        assert_eq!(kpi.latest_total, 0.0);
        assert_relative_eq!(kpi.yoy_latest.unwrap(), -1.0);
        assert_eq!(kpi.countries, 3);
    }

    #[test]
    fn empty_selection_yields_valid_empty_results() {
        let ds = sample();
        let spec = FilterSpec::new(
            DiseaseSelector::Single(Disease::Measles),
            (2020, 2022),
            Vec::<String>::new(),
        );
        assert!(global_trend(&ds, &spec, RollingWindow::Three).is_empty());
        assert!(regional_trend(&ds, &spec, RollingWindow::Three).is_empty());
        assert!(country_ranking(&ds, &spec, 10).is_empty());
        assert!(country_trend(&ds, &spec, "Chad", RollingWindow::Three).is_empty());
        assert!(confirmation_rate_matrix(&ds, &spec, Disease::Measles).is_empty());
        assert!(map_snapshot(&ds, &spec, 2021).is_empty());
        assert!(disease_comparison(&ds, &spec).is_empty());
        assert!(region_share(&ds, &spec, Disease::Rubella).is_empty());
        assert!(export_rows(&ds, &spec).is_empty());
        let kpi = kpi_summary(&ds, &spec);
        assert_eq!(kpi.latest_year, None);
        assert_eq!(kpi.yoy_latest, None);
        assert_eq!(kpi.countries, 0);
    }

    #[test]
    fn map_snapshot_is_per_country_for_one_year() {
        let ds = sample();
        let rows = map_snapshot(&ds, &measles(&ds), 2021);
        let flat: Vec<(&str, f64)> = rows.iter().map(|r| (r.country.as_str(), r.value)).collect();
        assert_eq!(flat, vec![("Afghanistan", 150.0), ("Chad", 50.0), ("Pakistan", 300.0)]);
    }

    #[test]
    fn disease_comparison_and_region_share() {
        let ds = sample();
        let spec = measles(&ds);
        let cmp = disease_comparison(&ds, &spec);
        assert_eq!(cmp.len(), 2);
        assert_eq!(cmp[0].disease, Disease::Measles);
        assert_eq!(cmp[0].total, 600.0);
        assert_eq!(cmp[0].lab_confirmed, 220.0);
        assert_eq!(cmp[1].total, 8.0);

        let share = region_share(&ds, &spec, Disease::Rubella);
        assert_eq!(share.len(), 1);
        assert_eq!(share[0].region, "EMR");
        assert_eq!(share[0].share_pct, 100.0);
    }

    #[test]
    fn export_is_sorted_by_country_region_disease_year() {
        let ds = sample();
        let rows = export_rows(&ds, &ds.default_filter(DiseaseSelector::Both));
        let keys: Vec<(String, String, i32)> = rows
            .iter()
            .map(|r| (r.country.clone(), r.disease.clone(), r.year))
            .collect();
        let mut sorted = keys.clone();
        sorted.sort();
        assert_eq!(keys, sorted);
        assert_eq!(rows[0].country, "Afghanistan");
        assert_eq!(rows[0].disease, "Measles");
    }

    #[test]
    fn per_capita_export_is_labelled_as_rate() {
        let ds = dataset(&[["Chad", "AFR", "2020", "50", "", "", "1000000"]]);
        let spec = ds.default_filter(DiseaseSelector::Per100k(Disease::Measles));
        let rows = export_rows(&ds, &spec);
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].disease, "Measles_per100k");
        assert_relative_eq!(rows[0].value.unwrap(), 5.0);

        let counts = export_rows(&ds, &measles(&ds));
        assert_eq!(counts[0].disease, "Measles");
        assert_eq!(counts[0].value, Some(50.0));
    }

    #[test]
    fn per_capita_view_only_when_population_known() {
        let ds = dataset(&[
            ["Chad", "AFR", "2021", "50", "", "", "1000000"],
            ["Peru", "AMR", "2021", "9", "", "", ""],
        ]);
        let selector = DiseaseSelector::Per100k(Disease::Measles);
        assert!(ds.offers(selector));
        assert!(!ds.offers(DiseaseSelector::Per100k(Disease::Rubella)));
        let rows = country_ranking(&ds, &ds.default_filter(selector), 10);
        assert_eq!(rows.len(), 1);
        assert_relative_eq!(rows[0].value, 5.0);
    }
}
