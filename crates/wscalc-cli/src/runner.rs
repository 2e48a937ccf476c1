use std::time::Instant;

use thiserror::Error;
use tracing::{Level, event};
use wscalc_core::game::Scenario;
use wscalc_core::model::TransitionError;
use wscalc_core::solver::Solver;
use wscalc_core::tree::ProbabilityTree;

use crate::report::{DistributionReport, ReportMode};

#[derive(Debug, Error)]
pub enum RunError {
    #[error("scenario '{name}' has no operator groups to solve over")]
    MissingGroups { name: String },
    #[error("engine rejected the scenario: {0}")]
    Transition(#[from] TransitionError),
}

pub struct RunRequest<'a> {
    pub name: &'a str,
    pub scenario: &'a Scenario,
    pub solve: bool,
}

pub fn run(request: &RunRequest<'_>) -> Result<DistributionReport, RunError> {
    if request.solve {
        solve_groups(request)
    } else {
        run_sequence(request)
    }
}

fn run_sequence(request: &RunRequest<'_>) -> Result<DistributionReport, RunError> {
    let scenario = request.scenario;
    let started = Instant::now();
    let mut tree = ProbabilityTree::new(scenario.root(), scenario.operators.clone());
    let failures = tree.build_validated()?;
    for failure in &failures {
        event!(
            Level::WARN,
            layer = failure.layer,
            operator = %failure.operator,
            expected = %failure.expected,
            actual = %failure.actual,
            "probability conservation failed"
        );
    }
    let distribution = tree.distribution(scenario.kill_threshold);
    event!(
        Level::INFO,
        scenario = request.name,
        operators = scenario.operators.len(),
        leaves = tree.leaves().count(),
        elapsed_ms = started.elapsed().as_millis() as u64,
        "operator sequence resolved"
    );
    Ok(DistributionReport::new(
        request.name,
        ReportMode::Sequence,
        scenario.kill_threshold,
        &distribution,
        failures.len(),
        None,
    ))
}

fn solve_groups(request: &RunRequest<'_>) -> Result<DistributionReport, RunError> {
    let scenario = request.scenario;
    if scenario.groups.is_empty() {
        return Err(RunError::MissingGroups {
            name: request.name.to_string(),
        });
    }
    let started = Instant::now();
    let mut solver = Solver::new(scenario.root(), &scenario.groups);
    let score = solver.solve()?;
    let ordering = solver.best_ordering();
    let distribution = solver.distribution(scenario.kill_threshold);
    event!(
        Level::INFO,
        scenario = request.name,
        groups = scenario.groups.len(),
        best_score = %score,
        elapsed_ms = started.elapsed().as_millis() as u64,
        "group ordering search finished"
    );
    Ok(DistributionReport::new(
        request.name,
        ReportMode::Solver,
        scenario.kill_threshold,
        &distribution,
        0,
        Some(&ordering),
    ))
}
