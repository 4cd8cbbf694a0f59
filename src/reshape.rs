//! Wide country-year rows into tidy long records.

use crate::types::{CanonicalRow, Disease, DiseaseSelector, LongRecord, MetricKey, MetricKind};

const PER_CAPITA_SCALE: f64 = 100_000.0;

#[derive(Debug, Clone, Default)]
pub struct LongForm {
    pub records: Vec<LongRecord>,
    /// Disease options that have data behind them, in menu order.
    pub available_selectors: Vec<DiseaseSelector>,
}

/// Project canonical rows into long records: one per recognized metric per
/// row, plus a derived `per_100k` record wherever a positive population and
/// a present total exist for the same row.
pub fn to_long(rows: &[CanonicalRow]) -> LongForm {
    let mut records = Vec::with_capacity(rows.len() * 4);
    let mut per_capita = [false; 2];

    for row in rows {
        for (key, value) in &row.metrics {
            records.push(record(row, *key, *value));
        }
        let Some(population) = row.population.filter(|p| *p > 0.0) else {
            continue;
        };
        for (slot, disease) in Disease::ALL.into_iter().enumerate() {
            let total = row.metrics.get(&MetricKey {
                disease,
                kind: MetricKind::Total,
            });
            if let Some(Some(total)) = total {
                let key = MetricKey {
                    disease,
                    kind: MetricKind::Per100k,
                };
                records.push(record(row, key, Some(total / population * PER_CAPITA_SCALE)));
                per_capita[slot] = true;
            }
        }
    }

    let mut available_selectors = vec![
        DiseaseSelector::Single(Disease::Measles),
        DiseaseSelector::Single(Disease::Rubella),
        DiseaseSelector::Both,
    ];
    for (slot, disease) in Disease::ALL.into_iter().enumerate() {
        if per_capita[slot] {
            available_selectors.push(DiseaseSelector::Per100k(disease));
        }
    }

    LongForm {
        records,
        available_selectors,
    }
}

fn record(row: &CanonicalRow, key: MetricKey, value: Option<f64>) -> LongRecord {
    LongRecord {
        country: row.country.clone(),
        region: row.region.clone(),
        year: row.year,
        disease: key.disease,
        metric_kind: key.kind,
        value,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::{BTreeMap, HashSet};

    fn row(country: &str, year: i32, population: Option<f64>, metrics: &[(Disease, MetricKind, Option<f64>)]) -> CanonicalRow {
        CanonicalRow {
            country: country.to_string(),
            region: "EUR".to_string(),
            year,
            population,
            metrics: metrics
                .iter()
                .map(|(d, k, v)| (MetricKey { disease: *d, kind: *k }, *v))
                .collect(),
        }
    }

    #[test]
    fn emits_one_record_per_metric_and_keeps_absent_values() {
        let rows = vec![row(
            "France",
            2020,
            None,
            &[
                (Disease::Measles, MetricKind::Total, Some(10.0)),
                (Disease::Measles, MetricKind::LabConfirmed, None),
                (Disease::Rubella, MetricKind::Total, Some(1.0)),
            ],
        )];
        let long = to_long(&rows);
        assert_eq!(long.records.len(), 3);
        assert!(long
            .records
            .iter()
            .any(|r| r.metric_kind == MetricKind::LabConfirmed && r.value.is_none()));
    }

    #[test]
    fn per_capita_requires_population() {
        let rows = vec![row(
            "France",
            2020,
            None,
            &[(Disease::Measles, MetricKind::Total, Some(10.0))],
        )];
        let long = to_long(&rows);
        assert!(long.records.iter().all(|r| r.metric_kind != MetricKind::Per100k));
        assert_eq!(long.available_selectors.len(), 3);
        assert!(!long
            .available_selectors
            .contains(&DiseaseSelector::Per100k(Disease::Measles)));
    }

    #[test]
    fn per_capita_derived_when_population_present() {
        let rows = vec![
            row(
                "France",
                2020,
                Some(1_000_000.0),
                &[(Disease::Measles, MetricKind::Total, Some(50.0))],
            ),
            row(
                "Spain",
                2020,
                None,
                &[(Disease::Measles, MetricKind::Total, Some(10.0))],
            ),
        ];
        let long = to_long(&rows);
        let per: Vec<_> = long
            .records
            .iter()
            .filter(|r| r.metric_kind == MetricKind::Per100k)
            .collect();
        assert_eq!(per.len(), 1);
        assert_eq!(per[0].country, "France");
        assert_eq!(per[0].value, Some(5.0));
        assert!(long
            .available_selectors
            .contains(&DiseaseSelector::Per100k(Disease::Measles)));
        assert!(!long
            .available_selectors
            .contains(&DiseaseSelector::Per100k(Disease::Rubella)));
    }

    #[test]
    fn long_keys_are_unique_and_round_trip_to_wide_values() {
        let rows = vec![
            row(
                "France",
                2020,
                None,
                &[
                    (Disease::Measles, MetricKind::Total, Some(10.0)),
                    (Disease::Measles, MetricKind::Clinical, Some(4.0)),
                    (Disease::Rubella, MetricKind::EpiLinked, None),
                ],
            ),
            row(
                "France",
                2021,
                None,
                &[(Disease::Measles, MetricKind::Total, Some(12.0))],
            ),
        ];
        let long = to_long(&rows);

        let mut keys = HashSet::new();
        for r in &long.records {
            assert!(keys.insert((r.country.clone(), r.year, r.disease, r.metric_kind)));
        }

        let mut rebuilt: BTreeMap<(i32, MetricKey), Option<f64>> = BTreeMap::new();
        for r in &long.records {
            let key = MetricKey { disease: r.disease, kind: r.metric_kind };
            rebuilt.insert((r.year, key), r.value);
        }
        for src in &rows {
            for (key, value) in &src.metrics {
                assert_eq!(rebuilt[&(src.year, *key)], *value);
            }
        }
    }
}
