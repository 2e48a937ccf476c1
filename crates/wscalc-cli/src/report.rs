use std::fmt::Write as _;
use std::fs;
use std::path::{Path, PathBuf};

use num_traits::ToPrimitive;
use serde::Serialize;
use thiserror::Error;
use wscalc_core::model::{OperatorGroup, Rational};
use wscalc_core::tree::DamageDistribution;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ReportMode {
    Sequence,
    Solver,
}

/// A rational rendered both ways: the exact `p/q` form and a float
/// approximation for quick reading. The exact form is authoritative.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExactValue {
    pub exact: String,
    pub approx: f64,
}

impl ExactValue {
    pub fn of(value: &Rational) -> Self {
        Self {
            exact: value.to_string(),
            approx: value.to_f64().unwrap_or(f64::NAN),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DamageRow {
    pub damage: u32,
    #[serde(flatten)]
    pub probability: ExactValue,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DistributionReport {
    pub scenario: String,
    pub mode: ReportMode,
    pub kill_threshold: u32,
    pub rows: Vec<DamageRow>,
    pub kill_probability: ExactValue,
    pub expectation: ExactValue,
    pub variance: ExactValue,
    pub total_mass: String,
    pub conservation_failures: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub best_ordering: Option<Vec<String>>,
}

#[derive(Debug, Error)]
pub enum ReportError {
    #[error("failed to write report {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to encode report: {0}")]
    Json(#[from] serde_json::Error),
}

impl DistributionReport {
    pub fn new(
        scenario: &str,
        mode: ReportMode,
        kill_threshold: u32,
        distribution: &DamageDistribution,
        conservation_failures: usize,
        best_ordering: Option<&[OperatorGroup]>,
    ) -> Self {
        let rows = distribution
            .damage_probabilities()
            .iter()
            .map(|(damage, prob)| DamageRow {
                damage: *damage,
                probability: ExactValue::of(prob),
            })
            .collect();
        Self {
            scenario: scenario.to_string(),
            mode,
            kill_threshold,
            rows,
            kill_probability: ExactValue::of(distribution.kill_probability()),
            expectation: ExactValue::of(distribution.expectation()),
            variance: ExactValue::of(distribution.variance()),
            total_mass: distribution.total_mass().to_string(),
            conservation_failures,
            best_ordering: best_ordering
                .map(|groups| groups.iter().map(OperatorGroup::to_string).collect()),
        }
    }

    pub fn render_text(&self) -> String {
        let mut out = String::new();
        let mode = match self.mode {
            ReportMode::Sequence => "sequence",
            ReportMode::Solver => "solver",
        };
        let _ = writeln!(out, "scenario '{}' ({mode})", self.scenario);
        if let Some(ordering) = &self.best_ordering {
            let _ = writeln!(out, "best ordering: {}", ordering.join(" -> "));
        }
        let _ = writeln!(out, "{:>6}  {:<24}  ~", "damage", "probability");
        for row in &self.rows {
            let _ = writeln!(
                out,
                "{:>6}  {:<24}  {:.4}",
                row.damage, row.probability.exact, row.probability.approx
            );
        }
        let _ = writeln!(
            out,
            "kill probability (>= {}): {} (~{:.4})",
            self.kill_threshold, self.kill_probability.exact, self.kill_probability.approx
        );
        let _ = writeln!(
            out,
            "expectation: {} (~{:.4})",
            self.expectation.exact, self.expectation.approx
        );
        let _ = writeln!(
            out,
            "variance: {} (~{:.4})",
            self.variance.exact, self.variance.approx
        );
        let _ = writeln!(out, "total probability mass: {}", self.total_mass);
        if self.conservation_failures > 0 {
            let _ = writeln!(
                out,
                "WARNING: {} conservation check(s) failed, see logs",
                self.conservation_failures
            );
        }
        out
    }

    pub fn write_json(&self, path: &Path) -> Result<(), ReportError> {
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json).map_err(|source| ReportError::Io {
            path: path.to_path_buf(),
            source,
        })
    }
}
