// Report bundle: runs every query for the configured view and writes the
// results as CSV/JSON files.
use crate::config::Settings;
use crate::dataset::Dataset;
use crate::error::Result;
use crate::filter::FilterSpec;
use crate::output::{write_csv, write_json};
use crate::query;
use crate::types::{ExportRow, MapRow, RankingRow, RateCell, SummaryReport, TrendRow};
use chrono::Utc;
use std::path::{Path, PathBuf};

pub const GLOBAL_TREND_FILE: &str = "global_trend.csv";
pub const REGIONAL_TREND_FILE: &str = "regional_trend.csv";
pub const RANKING_FILE: &str = "country_ranking.csv";
pub const COUNTRY_TREND_FILE: &str = "country_trend.csv";
pub const CONFIRMATION_FILE: &str = "confirmation_rates.csv";
pub const MAP_FILE: &str = "map_snapshot.csv";
pub const EXPORT_FILE: &str = "filtered_long.csv";
pub const SUMMARY_FILE: &str = "summary.json";

#[derive(Debug)]
pub struct ReportSet {
    pub spec: FilterSpec,
    pub global_trend: Vec<TrendRow>,
    pub regional_trend: Vec<TrendRow>,
    pub ranking: Vec<RankingRow>,
    pub country: Option<String>,
    pub country_trend: Vec<TrendRow>,
    pub confirmation: Vec<RateCell>,
    pub map_year: Option<i32>,
    pub map: Vec<MapRow>,
    pub export: Vec<ExportRow>,
    pub summary: SummaryReport,
}

pub fn generate(ds: &Dataset, settings: &Settings) -> ReportSet {
    let spec = settings.filter_for(ds);
    let window = settings.rolling_window;

    let mut global_trend = query::global_trend(ds, &spec, window);
    let mut regional_trend = query::regional_trend(ds, &spec, window);
    let ranking = query::country_ranking(ds, &spec, settings.top_n);

    let country = settings
        .country
        .clone()
        .or_else(|| query::ranked_countries(ds, &spec).into_iter().next());
    let mut country_trend = match &country {
        Some(c) => query::country_trend(ds, &spec, c, window),
        None => Vec::new(),
    };
    if !settings.show_yoy {
        for row in global_trend
            .iter_mut()
            .chain(regional_trend.iter_mut())
            .chain(country_trend.iter_mut())
        {
            row.yoy = None;
        }
    }

    let confirmation = query::confirmation_rate_matrix(ds, &spec, settings.heatmap_disease);

    let (lo, hi) = spec.years;
    let map_year = settings.map_year.or((lo <= hi).then_some(hi));
    let map = match map_year {
        Some(year) => query::map_snapshot(ds, &spec, year),
        None => Vec::new(),
    };

    let summary = SummaryReport {
        generated_at: Utc::now().to_rfc3339(),
        disease: spec.disease.label(),
        year_range: spec.years,
        regions: spec.regions.iter().cloned().collect(),
        kpis: query::kpi_summary(ds, &spec),
        disease_comparison: query::disease_comparison(ds, &spec),
        region_share: query::region_share(ds, &spec, settings.heatmap_disease),
    };

    ReportSet {
        export: query::export_rows(ds, &spec),
        spec,
        global_trend,
        regional_trend,
        ranking,
        country,
        country_trend,
        confirmation,
        map_year,
        map,
        summary,
    }
}

/// Write every report into `dir`, returning the paths written.
pub fn write_all(reports: &ReportSet, dir: &Path) -> Result<Vec<PathBuf>> {
    let mut written = Vec::new();
    let mut emit = |name: &str| -> PathBuf {
        let path = dir.join(name);
        written.push(path.clone());
        path
    };
    write_csv(&emit(GLOBAL_TREND_FILE), &reports.global_trend)?;
    write_csv(&emit(REGIONAL_TREND_FILE), &reports.regional_trend)?;
    write_csv(&emit(RANKING_FILE), &reports.ranking)?;
    write_csv(&emit(COUNTRY_TREND_FILE), &reports.country_trend)?;
    write_csv(&emit(CONFIRMATION_FILE), &reports.confirmation)?;
    write_csv(&emit(MAP_FILE), &reports.map)?;
    write_csv(&emit(EXPORT_FILE), &reports.export)?;
    write_json(&emit(SUMMARY_FILE), &reports.summary)?;
    log::info!("wrote {} report files to {}", written.len(), dir.display());
    Ok(written)
}
