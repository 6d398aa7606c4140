//! Staged model construction.
//!
//! The stages consume each other, so declaration order is enforced by the
//! types: variables, then expressions, then constraints, then the objective.
//!
//! ```text
//! VariableRegistry ──finish──▶ ExpressionStage ──finish──▶ ConstraintStage
//!                                                              │ finish
//!                                  Model ◀──minimise── ObjectiveStage
//! ```

pub mod constraints;
pub mod expressions;
pub mod objective;
pub mod variables;

pub use constraints::{Constraint, ConstraintSet, ConstraintStage, Operand, Row, Sense};
pub use expressions::{CachedExpr, ExpressionCache, ExpressionStage};
pub use objective::{Objective, ObjectiveSense, ObjectiveStage};
pub use variables::{
    Column, Integrality, Variable, VariableRegistry, VariableSet, VariableSpec,
};

use crate::solve::Solution;
use esm_core::{Coord, Diagnostics, EsmError, EsmResult, Param};

/// A fully built optimization model, optionally carrying a solution.
#[derive(Debug)]
pub struct Model {
    scenario: String,
    variables: VariableSet,
    expressions: ExpressionCache,
    constraints: ConstraintSet,
    objective: Objective,
    diagnostics: Diagnostics,
    pub(crate) solution: Option<Solution>,
}

impl Model {
    pub(crate) fn new(
        variables: VariableSet,
        expressions: ExpressionCache,
        constraints: ConstraintSet,
        objective: Objective,
        diagnostics: Diagnostics,
    ) -> Self {
        Self {
            scenario: String::new(),
            variables,
            expressions,
            constraints,
            objective,
            diagnostics,
            solution: None,
        }
    }

    pub(crate) fn with_scenario(mut self, scenario: &str) -> Self {
        self.scenario = scenario.to_string();
        self
    }

    pub fn scenario(&self) -> &str {
        &self.scenario
    }

    pub fn variables(&self) -> &VariableSet {
        &self.variables
    }

    pub fn expressions(&self) -> &ExpressionCache {
        &self.expressions
    }

    pub fn constraints(&self) -> &ConstraintSet {
        &self.constraints
    }

    pub fn objective(&self) -> &Objective {
        &self.objective
    }

    pub fn diagnostics(&self) -> &Diagnostics {
        &self.diagnostics
    }

    pub fn solution(&self) -> Option<&Solution> {
        self.solution.as_ref()
    }

    pub fn objective_value(&self) -> Option<f64> {
        self.solution.as_ref().and_then(|s| s.objective_value)
    }

    fn primal(&self) -> EsmResult<&[f64]> {
        self.solution
            .as_ref()
            .and_then(|s| s.values.as_deref())
            .ok_or_else(|| EsmError::Solver("model has no primal solution".into()))
    }

    /// Solved values of a variable over its surviving indices.
    pub fn variable_values(&self, name: &str) -> EsmResult<Param> {
        let values = self.primal()?;
        let var = self.variables.get(name)?;
        Ok(var.ids().map(|id| values[id.index()]).named(name))
    }

    /// Solved value of one variable index.
    pub fn value(&self, name: &str, coords: &[Coord]) -> EsmResult<f64> {
        let values = self.primal()?;
        let expr = self.variables.at(name, coords)?;
        Ok(expr.evaluate(values))
    }

    /// A cached linear expression evaluated at the primal solution.
    pub fn evaluate(&self, expression: &str) -> EsmResult<Param> {
        let values = self.primal()?;
        let expr = self.expressions.lin(expression)?;
        Ok(expr.map(|e| e.evaluate(values)).named(expression))
    }

    /// Duals of a constraint, if the backend reported them.
    pub fn dual(&self, constraint: &str) -> EsmResult<Option<Param>> {
        let (index, c) = self
            .constraints
            .iter()
            .enumerate()
            .find(|(_, c)| c.name() == constraint)
            .ok_or_else(|| EsmError::Other(format!("unknown constraint '{}'", constraint)))?;
        let Some(duals) = self.solution.as_ref().and_then(|s| s.duals.as_ref()) else {
            return Ok(None);
        };
        let Some(row_duals) = duals.get(index) else {
            return Ok(None);
        };
        let mut out = Param::empty(constraint, c.axes().to_vec())?;
        for (row, value) in c.rows().iter().zip(row_duals) {
            out.insert_at(row.key.clone(), *value);
        }
        Ok(Some(out))
    }
}
