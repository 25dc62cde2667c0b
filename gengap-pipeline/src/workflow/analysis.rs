//! Bootstrap analysis sweeps
//!
//! Groups the joined author-position view by the report dimensions
//! and invokes the bootstrap estimator once per group. Only binary
//! (male/female) results with a probability participate; unknown and
//! non-binary authors are excluded from the value lists but groups
//! they belong to still appear, reported as insufficient when nothing
//! usable remains. Result tables are written as CSV for the plotting
//! collaborator.

use crate::db::positions::{fetch_observations, ObservationRow};
use crate::stats::bootstrap::{bootstrap_p_female, BootstrapEstimate};
use gengap_common::db::{Gender, Position};
use gengap_common::{Error, Result};
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::Serialize;
use sqlx::SqlitePool;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::info;

/// Year bands for the period comparison (pre-pandemic, pandemic,
/// recovery)
const PERIODS: [(&str, i64, i64); 3] = [
    ("pre_pandemic_2018_2019", 2018, 2019),
    ("pandemic_2020_2021", 2020, 2021),
    ("recovery_2022_2023", 2022, 2023),
];

#[derive(Debug, Serialize)]
struct PositionDatasetRow {
    dataset: String,
    position: String,
    mean: Option<f64>,
    ci_lower: Option<f64>,
    ci_upper: Option<f64>,
    n: usize,
}

#[derive(Debug, Serialize)]
struct YearDatasetRow {
    dataset: String,
    year: i64,
    mean: Option<f64>,
    ci_lower: Option<f64>,
    ci_upper: Option<f64>,
    n: usize,
}

#[derive(Debug, Serialize)]
struct QuartilePositionRow {
    quartile: String,
    position: String,
    mean: Option<f64>,
    ci_lower: Option<f64>,
    ci_upper: Option<f64>,
    n: usize,
}

#[derive(Debug, Serialize)]
struct QuartileYearRow {
    quartile: String,
    year: i64,
    mean: Option<f64>,
    ci_lower: Option<f64>,
    ci_upper: Option<f64>,
    n: usize,
}

#[derive(Debug, Serialize)]
struct PeriodRow {
    period: String,
    mean: Option<f64>,
    ci_lower: Option<f64>,
    ci_upper: Option<f64>,
    n: usize,
}

/// Summary of one analysis run
#[derive(Debug, Clone, Default)]
pub struct AnalysisOutcome {
    pub tables: Vec<PathBuf>,
    pub groups: usize,
    pub insufficient_groups: usize,
}

/// Run all sweeps over the given year range and write CSV tables into
/// `out_dir`.
pub async fn run_analysis(
    pool: &SqlitePool,
    year_min: i64,
    year_max: i64,
    iterations: usize,
    out_dir: &Path,
) -> Result<AnalysisOutcome> {
    std::fs::create_dir_all(out_dir)?;
    let rows = fetch_observations(pool, year_min, year_max).await?;
    info!(
        "Running bootstrap sweeps over {} author-position rows ({}-{})",
        rows.len(),
        year_min,
        year_max
    );

    let mut outcome = AnalysisOutcome::default();
    let mut rng = StdRng::from_entropy();

    // Sweep 1: position x dataset
    let groups = group_values(&rows, |row| {
        Some((row.dataset.clone(), row.position.clone()))
    });
    let mut table = Vec::new();
    for ((dataset, position), values) in order_by_position(groups) {
        let estimate = bootstrap_p_female(&values, iterations, &mut rng);
        tally(&mut outcome, &estimate);
        table.push(PositionDatasetRow {
            dataset,
            position,
            mean: estimate.mean,
            ci_lower: estimate.ci_lower,
            ci_upper: estimate.ci_upper,
            n: estimate.n,
        });
    }
    outcome
        .tables
        .push(write_table(out_dir, "analysis_position_breakdown.csv", &table)?);

    // Sweep 2: year x dataset
    let groups = group_values(&rows, |row| Some((row.dataset.clone(), row.year)));
    let mut table = Vec::new();
    for ((dataset, year), values) in groups {
        let estimate = bootstrap_p_female(&values, iterations, &mut rng);
        tally(&mut outcome, &estimate);
        table.push(YearDatasetRow {
            dataset,
            year,
            mean: estimate.mean,
            ci_lower: estimate.ci_lower,
            ci_upper: estimate.ci_upper,
            n: estimate.n,
        });
    }
    outcome
        .tables
        .push(write_table(out_dir, "analysis_temporal_trend.csv", &table)?);

    // Sweep 3: quartile x position (rows without a tier drop out)
    let groups = group_values(&rows, |row| {
        row.quartile
            .clone()
            .map(|quartile| (quartile, row.position.clone()))
    });
    let mut table = Vec::new();
    for ((quartile, position), values) in order_by_position(groups) {
        let estimate = bootstrap_p_female(&values, iterations, &mut rng);
        tally(&mut outcome, &estimate);
        table.push(QuartilePositionRow {
            quartile,
            position,
            mean: estimate.mean,
            ci_lower: estimate.ci_lower,
            ci_upper: estimate.ci_upper,
            n: estimate.n,
        });
    }
    outcome.tables.push(write_table(
        out_dir,
        "analysis_journal_quartile_by_position.csv",
        &table,
    )?);

    // Sweep 4: quartile x year
    let groups = group_values(&rows, |row| {
        row.quartile.clone().map(|quartile| (quartile, row.year))
    });
    let mut table = Vec::new();
    for ((quartile, year), values) in groups {
        let estimate = bootstrap_p_female(&values, iterations, &mut rng);
        tally(&mut outcome, &estimate);
        table.push(QuartileYearRow {
            quartile,
            year,
            mean: estimate.mean,
            ci_lower: estimate.ci_lower,
            ci_upper: estimate.ci_upper,
            n: estimate.n,
        });
    }
    outcome.tables.push(write_table(
        out_dir,
        "analysis_journal_quartile_by_year.csv",
        &table,
    )?);

    // Sweep 5: period comparison
    let mut table = Vec::new();
    for (period, start, end) in PERIODS {
        let values: Vec<f64> = rows
            .iter()
            .filter(|row| row.year >= start && row.year <= end)
            .filter_map(usable_probability)
            .collect();
        let estimate = bootstrap_p_female(&values, iterations, &mut rng);
        tally(&mut outcome, &estimate);
        table.push(PeriodRow {
            period: period.to_string(),
            mean: estimate.mean,
            ci_lower: estimate.ci_lower,
            ci_upper: estimate.ci_upper,
            n: estimate.n,
        });
    }
    outcome.tables.push(write_table(
        out_dir,
        "analysis_period_comparison.csv",
        &table,
    )?);

    info!(
        "Analysis done: {} groups estimated, {} with insufficient data, {} tables",
        outcome.groups,
        outcome.insufficient_groups,
        outcome.tables.len()
    );
    Ok(outcome)
}

/// P(female) of one row if it should feed the estimator: binary
/// gender with a resolved probability.
fn usable_probability(row: &ObservationRow) -> Option<f64> {
    if !Gender::parse(&row.gender).is_binary() {
        return None;
    }
    row.p_female
}

/// Group usable probabilities by a key. A group appears as soon as
/// any row maps to its key, even when no row contributes a value, so
/// all-unknown groups surface as insufficient instead of vanishing.
fn group_values<K: Ord>(
    rows: &[ObservationRow],
    key_fn: impl Fn(&ObservationRow) -> Option<K>,
) -> BTreeMap<K, Vec<f64>> {
    let mut groups: BTreeMap<K, Vec<f64>> = BTreeMap::new();
    for row in rows {
        if let Some(key) = key_fn(row) {
            let values = groups.entry(key).or_default();
            if let Some(p) = usable_probability(row) {
                values.push(p);
            }
        }
    }
    groups
}

/// Order (group, position-label) keys by the structural position
/// sequence rather than alphabetically.
fn order_by_position<G: Ord>(
    groups: BTreeMap<(G, String), Vec<f64>>,
) -> Vec<((G, String), Vec<f64>)> {
    let rank = |label: &str| {
        Position::parse(label)
            .map(|position| position as usize)
            .unwrap_or(Position::ALL.len())
    };
    let mut ordered: Vec<_> = groups.into_iter().collect();
    ordered.sort_by(|((ga, pa), _), ((gb, pb), _)| {
        ga.cmp(gb).then_with(|| rank(pa).cmp(&rank(pb)))
    });
    ordered
}

fn tally(outcome: &mut AnalysisOutcome, estimate: &BootstrapEstimate) {
    outcome.groups += 1;
    if estimate.is_insufficient() {
        outcome.insufficient_groups += 1;
    }
}

fn write_table<T: Serialize>(out_dir: &Path, file_name: &str, rows: &[T]) -> Result<PathBuf> {
    let path = out_dir.join(file_name);
    let mut writer = csv::Writer::from_path(&path)
        .map_err(|e| Error::Internal(format!("Create {} failed: {}", path.display(), e)))?;
    for row in rows {
        writer
            .serialize(row)
            .map_err(|e| Error::Internal(format!("Write {} failed: {}", path.display(), e)))?;
    }
    writer
        .flush()
        .map_err(|e| Error::Internal(format!("Flush {} failed: {}", path.display(), e)))?;
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(
        dataset: &str,
        year: i64,
        position: &str,
        gender: &str,
        p_female: Option<f64>,
    ) -> ObservationRow {
        ObservationRow {
            source_id: "PMID:1".to_string(),
            year,
            dataset: dataset.to_string(),
            quartile: None,
            name: "name".to_string(),
            gender: gender.to_string(),
            p_female,
            position: position.to_string(),
        }
    }

    #[test]
    fn unknown_and_other_excluded_from_values() {
        let rows = vec![
            row("Biology", 2020, "first", "female", Some(1.0)),
            row("Biology", 2020, "first", "unknown", None),
            row("Biology", 2020, "first", "nonbinary", Some(0.5)),
            row("Biology", 2020, "first", "male", Some(0.0)),
        ];

        let groups = group_values(&rows, |r| Some(r.position.clone()));
        assert_eq!(groups["first"], vec![1.0, 0.0]);
    }

    #[test]
    fn all_unknown_group_still_appears() {
        let rows = vec![row("Biology", 2020, "last", "unknown", None)];
        let groups = group_values(&rows, |r| Some(r.position.clone()));
        assert!(groups["last"].is_empty());
    }

    #[test]
    fn positions_ordered_structurally() {
        let mut groups: BTreeMap<(String, String), Vec<f64>> = BTreeMap::new();
        for label in ["last", "first", "penultimate", "middle", "second"] {
            groups.insert(("Biology".to_string(), label.to_string()), vec![]);
        }

        let ordered: Vec<String> = order_by_position(groups)
            .into_iter()
            .map(|((_, position), _)| position)
            .collect();
        assert_eq!(
            ordered,
            vec!["first", "second", "middle", "penultimate", "last"]
        );
    }
}
