//! # esm-algo: Energy-System Model Formulation
//!
//! Builds an OSeMOSYS-style linear (or mixed-integer) program from a
//! [`ParameterStore`](esm_core::ParameterStore) and hands it to a solver.
//!
//! ## Pipeline
//!
//! | Stage | Module | Output |
//! |-------|--------|--------|
//! | Validation | [`schema`] | diagnostics, or the first schema error |
//! | Variables | [`model::VariableRegistry`] | masked, indexed columns |
//! | Expressions | [`model::ExpressionStage`] | cached derived arrays |
//! | Constraints | [`model::ConstraintStage`] | named row families |
//! | Objective | [`model::ObjectiveStage`] | a finished [`Model`] |
//! | Solve | [`solve`] | a [`Solution`] stored on the model |
//!
//! [`build_model`] runs the whole formulation in one call. Equation families
//! with no data (no storage, no trade routes, no emission limits) generate
//! nothing and leave an info diagnostic behind.
//!
//! ## Example
//!
//! ```ignore
//! use esm_algo::{build_model, BuildOptions};
//!
//! let mut model = build_model(&store, &BuildOptions::default())?;
//! let solution = model.solve("clarabel", None)?;
//! println!("{} {:?}", solution.status, model.objective_value());
//! let capacity = model.variable_values("NewCapacity")?;
//! ```
//!
//! ## Features
//!
//! - `solver-clarabel` (default): pure-Rust interior point, continuous only
//! - `solver-highs`: MILP and duals through HiGHS
//! - `parallel` (default): Rayon fan-out in [`batch`]

pub mod accumulate;
pub mod batch;
pub mod finance;
mod formulation;
pub mod model;
pub mod options;
pub mod schema;
pub mod solve;

pub use batch::{build_scenarios, solve_scenarios, ScenarioOutcome};
pub use formulation::build_model;
pub use model::{Model, Sense, VariableSpec};
pub use options::{BuildOptions, SolveOptions, DEFAULT_GROWTH_BIG_M};
pub use solve::{LpSolverKind, Solution, TerminationStatus};
