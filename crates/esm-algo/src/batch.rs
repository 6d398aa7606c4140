//! Independent scenario builds and solves over one shared store.
//!
//! Every scenario owns its registry, cache and constraints; the store is only
//! borrowed, so builds fan out across threads without locking.

use crate::formulation::build_model;
use crate::model::Model;
use crate::options::{BuildOptions, SolveOptions};
use crate::solve::TerminationStatus;
use esm_core::{EsmResult, ParameterStore};
use serde::Serialize;

#[cfg(feature = "parallel")]
use rayon::prelude::*;

/// Result of building and solving one scenario.
#[derive(Serialize)]
pub struct ScenarioOutcome {
    pub scenario: String,
    /// `"ok"` when the model was built and handed off, `"error"` otherwise.
    pub status: String,
    pub termination: Option<TerminationStatus>,
    pub objective: Option<f64>,
    pub columns: usize,
    pub rows: usize,
    pub error: Option<String>,
    #[serde(skip)]
    pub model: Option<Model>,
}

impl ScenarioOutcome {
    fn failed(scenario: &str, err: impl std::fmt::Display) -> Self {
        Self {
            scenario: scenario.to_string(),
            status: "error".to_string(),
            termination: None,
            objective: None,
            columns: 0,
            rows: 0,
            error: Some(err.to_string()),
            model: None,
        }
    }

    pub fn is_ok(&self) -> bool {
        self.status == "ok"
    }
}

/// Build one model per option set, in input order.
pub fn build_scenarios(store: &ParameterStore, options: &[BuildOptions]) -> Vec<EsmResult<Model>> {
    #[cfg(feature = "parallel")]
    let models: Vec<EsmResult<Model>> = options
        .par_iter()
        .map(|opts| build_model(store, opts))
        .collect();
    #[cfg(not(feature = "parallel"))]
    let models: Vec<EsmResult<Model>> = options
        .iter()
        .map(|opts| build_model(store, opts))
        .collect();

    let failed = models.iter().filter(|m| m.is_err()).count();
    tracing::info!(
        scenarios = models.len(),
        failed,
        "scenario builds finished"
    );
    models
}

/// Build and solve each scenario.
pub fn solve_scenarios(
    store: &ParameterStore,
    jobs: &[(BuildOptions, SolveOptions)],
) -> Vec<ScenarioOutcome> {
    #[cfg(feature = "parallel")]
    let outcomes: Vec<ScenarioOutcome> = jobs
        .par_iter()
        .map(|(build, solve)| run_scenario(store, build, solve))
        .collect();
    #[cfg(not(feature = "parallel"))]
    let outcomes: Vec<ScenarioOutcome> = jobs
        .iter()
        .map(|(build, solve)| run_scenario(store, build, solve))
        .collect();

    let success = outcomes.iter().filter(|o| o.is_ok()).count();
    tracing::info!(
        scenarios = outcomes.len(),
        success,
        failure = outcomes.len() - success,
        "scenario solves finished"
    );
    outcomes
}

/// [`solve_scenarios`] on a dedicated pool; `threads == 0` uses every core.
#[cfg(feature = "parallel")]
pub fn solve_scenarios_with_threads(
    store: &ParameterStore,
    jobs: &[(BuildOptions, SolveOptions)],
    threads: usize,
) -> anyhow::Result<Vec<ScenarioOutcome>> {
    use anyhow::Context;

    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(threads)
        .build()
        .context("building Rayon thread pool for scenario solves")?;
    Ok(pool.install(|| solve_scenarios(store, jobs)))
}

fn run_scenario(
    store: &ParameterStore,
    build: &BuildOptions,
    solve: &SolveOptions,
) -> ScenarioOutcome {
    let mut model = match build_model(store, build) {
        Ok(model) => model,
        Err(err) => {
            tracing::warn!(scenario = %build.scenario, error = %err, "scenario build failed");
            return ScenarioOutcome::failed(&build.scenario, err);
        }
    };
    let termination = match model.solve_with_options(solve) {
        Ok(solution) => solution.status.clone(),
        Err(err) => {
            tracing::warn!(scenario = %build.scenario, error = %err, "scenario handoff failed");
            return ScenarioOutcome::failed(&build.scenario, err);
        }
    };
    ScenarioOutcome {
        scenario: build.scenario.clone(),
        status: "ok".to_string(),
        termination: Some(termination),
        objective: model.objective_value(),
        columns: model.variables().column_count(),
        rows: model.constraints().row_count(),
        error: None,
        model: Some(model),
    }
}
