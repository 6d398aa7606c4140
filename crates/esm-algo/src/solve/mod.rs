//! Solve handoff: translate a built [`Model`] to `good_lp`, run one backend
//! once, and store the outcome on the model.
//!
//! Solver outcomes (infeasible, unbounded, backend failure) come back as a
//! [`TerminationStatus`]; only a failed handoff is an error.

mod lp_format;

use crate::model::{Integrality, Model, ObjectiveSense, Sense};
use crate::options::SolveOptions;
use esm_core::{EsmError, EsmResult, LinExpr};
use good_lp::{
    constraint, variable, Constraint, Expression, ProblemVariables, ResolutionError, SolverModel,
    Variable,
};
use serde::Serialize;
use std::fmt;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;
use web_time::Instant;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LpSolverKind {
    #[cfg(feature = "solver-clarabel")]
    Clarabel,
    #[cfg(feature = "solver-highs")]
    Highs,
}

impl LpSolverKind {
    pub fn available() -> &'static [&'static str] {
        AVAILABLE_LP_SOLVERS
    }

    pub fn as_str(&self) -> &'static str {
        match *self {
            #[cfg(feature = "solver-clarabel")]
            LpSolverKind::Clarabel => "clarabel",
            #[cfg(feature = "solver-highs")]
            LpSolverKind::Highs => "highs",
        }
    }

    /// Whether the backend accepts integer and binary columns.
    pub fn supports_integers(&self) -> bool {
        match *self {
            #[cfg(feature = "solver-clarabel")]
            LpSolverKind::Clarabel => false,
            #[cfg(feature = "solver-highs")]
            LpSolverKind::Highs => true,
        }
    }
}

const AVAILABLE_LP_SOLVERS: &[&str] = &[
    #[cfg(feature = "solver-clarabel")]
    "clarabel",
    #[cfg(feature = "solver-highs")]
    "highs",
];

fn unknown_solver_error(label: &str) -> EsmError {
    EsmError::UnknownSolver {
        label: label.to_string(),
        supported: LpSolverKind::available().join(", "),
    }
}

impl FromStr for LpSolverKind {
    type Err = EsmError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let normalized = value.to_ascii_lowercase();
        match normalized.as_str() {
            "clarabel" => {
                #[cfg(feature = "solver-clarabel")]
                {
                    Ok(LpSolverKind::Clarabel)
                }
                #[cfg(not(feature = "solver-clarabel"))]
                {
                    Err(unknown_solver_error(&normalized))
                }
            }
            "highs" => {
                #[cfg(feature = "solver-highs")]
                {
                    Ok(LpSolverKind::Highs)
                }
                #[cfg(not(feature = "solver-highs"))]
                {
                    Err(unknown_solver_error(&normalized))
                }
            }
            other => Err(unknown_solver_error(other)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", content = "message", rename_all = "lowercase")]
pub enum TerminationStatus {
    Optimal,
    Infeasible,
    Unbounded,
    Error(String),
}

impl TerminationStatus {
    pub fn is_optimal(&self) -> bool {
        matches!(self, TerminationStatus::Optimal)
    }
}

impl fmt::Display for TerminationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TerminationStatus::Optimal => f.write_str("optimal"),
            TerminationStatus::Infeasible => f.write_str("infeasible"),
            TerminationStatus::Unbounded => f.write_str("unbounded"),
            TerminationStatus::Error(msg) => write!(f, "error: {}", msg),
        }
    }
}

impl From<ResolutionError> for TerminationStatus {
    fn from(err: ResolutionError) -> Self {
        match err {
            ResolutionError::Infeasible => TerminationStatus::Infeasible,
            ResolutionError::Unbounded => TerminationStatus::Unbounded,
            other => TerminationStatus::Error(other.to_string()),
        }
    }
}

/// Outcome of one solve.
#[derive(Debug, Clone, Serialize)]
pub struct Solution {
    pub status: TerminationStatus,
    pub solver: String,
    pub objective_value: Option<f64>,
    /// Primal value per column, indexed by `VarId`.
    pub values: Option<Vec<f64>>,
    /// Dual value per constraint, then per row.
    pub duals: Option<Vec<Vec<f64>>>,
    pub elapsed: Duration,
}

/// Backend result before it is attached to the model.
struct RawOutcome {
    status: TerminationStatus,
    values: Option<Vec<f64>>,
    duals: Option<Vec<Vec<f64>>>,
}

impl RawOutcome {
    fn failed(err: ResolutionError) -> Self {
        Self {
            status: err.into(),
            values: None,
            duals: None,
        }
    }
}

/// The model in `good_lp` terms.
struct Translation {
    problem: ProblemVariables,
    columns: Vec<Variable>,
    objective: Expression,
    rows: Vec<Vec<Constraint>>,
}

fn expression(expr: &LinExpr, columns: &[Variable]) -> Expression {
    let mut out = Expression::from(expr.constant_term());
    for &(id, coef) in expr.terms() {
        out += coef * columns[id.index()];
    }
    out
}

fn translate(model: &Model) -> Translation {
    let mut problem = ProblemVariables::new();
    let columns: Vec<Variable> = model
        .variables()
        .columns()
        .iter()
        .map(|column| {
            let mut def = variable();
            if column.lower.is_finite() {
                def = def.min(column.lower);
            }
            if column.upper.is_finite() {
                def = def.max(column.upper);
            }
            match column.integrality {
                Integrality::Continuous => {}
                Integrality::Integer => def = def.integer(),
                Integrality::Binary => def = def.binary(),
            }
            problem.add(def)
        })
        .collect();

    let objective = expression(&model.objective().expr, &columns);
    let rows = model
        .constraints()
        .iter()
        .map(|c| {
            c.rows()
                .iter()
                .map(|row| {
                    let lhs = expression(&row.expr, &columns);
                    let rhs = row.rhs;
                    match row.sense {
                        Sense::Le => constraint!(lhs <= rhs),
                        Sense::Ge => constraint!(lhs >= rhs),
                        Sense::Eq => constraint!(lhs == rhs),
                    }
                })
                .collect()
        })
        .collect();

    Translation {
        problem,
        columns,
        objective,
        rows,
    }
}

/// Add every row, keeping references grouped per constraint.
fn add_rows<M: SolverModel>(
    problem: &mut M,
    rows: Vec<Vec<Constraint>>,
) -> Vec<Vec<good_lp::constraint::ConstraintReference>> {
    rows.into_iter()
        .map(|group| {
            group
                .into_iter()
                .map(|c| problem.add_constraint(c))
                .collect()
        })
        .collect()
}

fn primal<S: good_lp::Solution>(solution: &S, columns: &[Variable]) -> Vec<f64> {
    columns.iter().map(|v| solution.value(*v)).collect()
}

fn run(kind: LpSolverKind, sense: ObjectiveSense, translation: Translation) -> RawOutcome {
    let Translation {
        problem,
        columns,
        objective,
        rows,
    } = translation;
    let unsolved = match sense {
        ObjectiveSense::Minimise => problem.minimise(objective),
        ObjectiveSense::Maximise => problem.maximise(objective),
    };
    match kind {
        #[cfg(feature = "solver-clarabel")]
        LpSolverKind::Clarabel => {
            let mut model = unsolved.using(good_lp::solvers::clarabel::clarabel);
            add_rows(&mut model, rows);
            match model.solve() {
                Ok(solution) => RawOutcome {
                    status: TerminationStatus::Optimal,
                    values: Some(primal(&solution, &columns)),
                    duals: None,
                },
                Err(err) => RawOutcome::failed(err),
            }
        }
        #[cfg(feature = "solver-highs")]
        LpSolverKind::Highs => {
            use good_lp::solvers::{DualValues, SolutionWithDual};

            let mut model = unsolved.using(good_lp::solvers::highs::highs);
            let refs = add_rows(&mut model, rows);
            match model.solve() {
                Ok(mut solution) => {
                    let values = primal(&solution, &columns);
                    let dual = solution.compute_dual();
                    let duals = refs
                        .iter()
                        .map(|group| group.iter().map(|r| dual.dual(r.clone())).collect())
                        .collect();
                    RawOutcome {
                        status: TerminationStatus::Optimal,
                        values: Some(values),
                        duals: Some(duals),
                    }
                }
                Err(err) => RawOutcome::failed(err),
            }
        }
    }
}

impl Model {
    /// Solve with the named backend, writing a plain-text log when asked.
    pub fn solve(&mut self, solver: &str, log_path: Option<&Path>) -> EsmResult<&Solution> {
        let mut options = SolveOptions::default().with_solver(solver);
        if let Some(path) = log_path {
            options = options.with_log_path(path);
        }
        self.solve_with_options(&options)
    }

    pub fn solve_with_options(&mut self, options: &SolveOptions) -> EsmResult<&Solution> {
        let kind: LpSolverKind = options.solver.parse()?;
        if self.variables().has_integers() && !kind.supports_integers() {
            return Err(EsmError::Solver(format!(
                "'{}' is continuous only but the model has integer columns",
                kind.as_str()
            )));
        }
        if let Some(path) = &options.lp_path {
            self.write_lp(path)?;
        }

        let start = Instant::now();
        tracing::info!(
            scenario = self.scenario(),
            solver = kind.as_str(),
            columns = self.variables().column_count(),
            rows = self.constraints().row_count(),
            "solving"
        );
        let translation = translate(self);
        let has_integers = self.variables().has_integers();
        let mut raw = run(kind, self.objective().sense, translation);
        // MILP duals are not meaningful
        if has_integers {
            raw.duals = None;
        }
        let objective_value = raw
            .values
            .as_ref()
            .map(|values| self.objective().expr.evaluate(values));
        let solution = Solution {
            status: raw.status,
            solver: kind.as_str().to_string(),
            objective_value,
            values: raw.values,
            duals: raw.duals,
            elapsed: start.elapsed(),
        };

        if solution.status.is_optimal() {
            tracing::info!(
                scenario = self.scenario(),
                objective = objective_value.unwrap_or_default(),
                elapsed_ms = solution.elapsed.as_millis() as u64,
                "solve finished"
            );
        } else {
            tracing::warn!(
                scenario = self.scenario(),
                status = %solution.status,
                "solve did not reach optimality"
            );
        }

        if let Some(path) = &options.log_path {
            std::fs::write(path, self.solve_log(&solution))?;
        }
        Ok(&*self.solution.insert(solution))
    }

    fn solve_log(&self, solution: &Solution) -> String {
        let objective = solution
            .objective_value
            .map(|v| format!("{:.6}", v))
            .unwrap_or_else(|| "n/a".to_string());
        format!(
            "scenario: {}\nsolver: {}\nstatus: {}\nobjective: {}\ncolumns: {}\nrows: {}\nelapsed_s: {:.3}\n",
            self.scenario(),
            solution.solver,
            solution.status,
            objective,
            self.variables().column_count(),
            self.constraints().row_count(),
            solution.elapsed.as_secs_f64(),
        )
    }
}
