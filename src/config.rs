//! Command-line flags and the optional TOML settings file.

use crate::dataset::Dataset;
use crate::error::Result;
use crate::filter::FilterSpec;
use crate::types::{Disease, DiseaseSelector, RollingWindow};
use clap::Parser;
use serde::Deserialize;
use std::path::{Path, PathBuf};

pub const DEFAULT_CONFIG: &str = "measles_report.toml";
const TOP_N_RANGE: (usize, usize) = (5, 50);

#[derive(Debug, Parser)]
#[command(name = "measles_report", about = "Measles and rubella case reports from a WHO-style CSV")]
pub struct Cli {
    /// CSV file to load (overrides `data_path` in the config file).
    #[arg(short, long)]
    pub data: Option<PathBuf>,

    /// Settings file; `measles_report.toml` is used when present.
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Directory for report files (overrides `output_dir`).
    #[arg(short, long)]
    pub output_dir: Option<PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub data_path: PathBuf,
    pub output_dir: PathBuf,
    pub disease: DiseaseSelector,
    /// Inclusive; `None` means every year in the data.
    pub year_range: Option<(i32, i32)>,
    /// `None` means every region; an empty list selects nothing.
    pub regions: Option<Vec<String>>,
    pub top_n: usize,
    pub rolling_window: RollingWindow,
    pub show_yoy: bool,
    /// Country for the trend report; defaults to the top-ranked one.
    pub country: Option<String>,
    /// Year for the map snapshot; defaults to the end of the year range.
    pub map_year: Option<i32>,
    pub heatmap_disease: Disease,
    pub preview_rows: usize,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            data_path: PathBuf::from("measles_rubella_cases.csv"),
            output_dir: PathBuf::from("."),
            disease: DiseaseSelector::Single(Disease::Measles),
            year_range: None,
            regions: None,
            top_n: 10,
            rolling_window: RollingWindow::default(),
            show_yoy: true,
            country: None,
            map_year: None,
            heatmap_disease: Disease::Measles,
            preview_rows: 5,
        }
    }
}

impl Settings {
    pub fn from_toml_str(text: &str) -> Result<Settings> {
        let settings: Settings = toml::from_str(text)?;
        Ok(settings.clamped())
    }

    pub fn from_file(path: &Path) -> Result<Settings> {
        let text = std::fs::read_to_string(path)?;
        log::info!("settings loaded from {}", path.display());
        Settings::from_toml_str(&text)
    }

    /// Settings file (explicit, else the default name if it exists) with
    /// command-line overrides applied.
    pub fn resolve(cli: &Cli) -> Result<Settings> {
        let mut settings = match &cli.config {
            Some(path) => Settings::from_file(path)?,
            None if Path::new(DEFAULT_CONFIG).exists() => Settings::from_file(Path::new(DEFAULT_CONFIG))?,
            None => Settings::default(),
        };
        if let Some(data) = &cli.data {
            settings.data_path = data.clone();
        }
        if let Some(dir) = &cli.output_dir {
            settings.output_dir = dir.clone();
        }
        Ok(settings)
    }

    fn clamped(mut self) -> Settings {
        let (lo, hi) = TOP_N_RANGE;
        if !(lo..=hi).contains(&self.top_n) {
            log::warn!("top_n {} outside {}..={}, clamping", self.top_n, lo, hi);
            self.top_n = self.top_n.clamp(lo, hi);
        }
        self
    }

    /// Build the active filter against a loaded dataset. A per-100k
    /// selector the dataset cannot back falls back to plain totals.
    pub fn filter_for(&self, ds: &Dataset) -> FilterSpec {
        let disease = match self.disease {
            DiseaseSelector::Per100k(d) if !ds.offers(self.disease) => {
                log::warn!("{} unavailable without population data, using {}", self.disease, d);
                DiseaseSelector::Single(d)
            }
            other => other,
        };
        let mut spec = ds.default_filter(disease);
        if let Some(years) = self.year_range {
            spec.years = years;
        }
        if let Some(regions) = &self.regions {
            spec.regions = regions.iter().map(|r| r.trim().to_string()).collect();
        }
        spec
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::RawTable;

    #[test]
    fn empty_file_gives_defaults() {
        assert_eq!(Settings::from_toml_str("").unwrap(), Settings::default());
    }

    #[test]
    fn parses_selectors_windows_and_ranges() {
        let s = Settings::from_toml_str(
            r#"
            disease = "Rubella_per100k"
            year_range = [2015, 2020]
            regions = ["AFR", "EUR"]
            rolling_window = 5
            top_n = 100
            heatmap_disease = "Rubella"
            "#,
        )
        .unwrap();
        assert_eq!(s.disease, DiseaseSelector::Per100k(Disease::Rubella));
        assert_eq!(s.year_range, Some((2015, 2020)));
        assert_eq!(s.rolling_window, RollingWindow::Five);
        assert_eq!(s.top_n, 50);
        assert_eq!(s.heatmap_disease, Disease::Rubella);
    }

    #[test]
    fn rejects_unsupported_window() {
        assert!(Settings::from_toml_str("rolling_window = 4").is_err());
        assert!(Settings::from_toml_str("disease = \"Mumps\"").is_err());
    }

    #[test]
    fn cli_flags_parse_and_missing_config_errors() {
        let cli = Cli::parse_from(["measles_report", "--data", "in.csv", "--output-dir", "out", "--config", "/nonexistent/x.toml"]);
        assert!(Settings::resolve(&cli).is_err());
        let cli = Cli::parse_from(["measles_report", "-d", "in.csv"]);
        assert_eq!(cli.data, Some(PathBuf::from("in.csv")));
    }

    #[test]
    fn per_capita_falls_back_without_population() {
        let raw = RawTable {
            headers: vec!["country".into(), "region".into(), "year".into(), "measles_total".into()],
            rows: vec![vec!["Chad".into(), "AFR".into(), "2020".into(), "4".into()]],
            ..RawTable::default()
        };
        let ds = Dataset::from_raw(&raw).unwrap();
        let settings = Settings {
            disease: DiseaseSelector::Per100k(Disease::Measles),
            regions: Some(vec![]),
            ..Settings::default()
        };
        let spec = settings.filter_for(&ds);
        assert_eq!(spec.disease, DiseaseSelector::Single(Disease::Measles));
        assert!(spec.regions.is_empty());
        assert_eq!(spec.years, (2020, 2020));
    }
}
