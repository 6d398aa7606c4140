//! The objective: the last build stage.

use super::constraints::ConstraintSet;
use super::expressions::ExpressionCache;
use super::variables::VariableSet;
use super::Model;
use esm_core::{Diagnostics, EsmError, EsmResult, LinArray, LinExpr};
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ObjectiveSense {
    Minimise,
    Maximise,
}

#[derive(Debug, Clone)]
pub struct Objective {
    pub sense: ObjectiveSense,
    pub expr: LinExpr,
}

pub struct ObjectiveStage {
    variables: VariableSet,
    cache: ExpressionCache,
    constraints: ConstraintSet,
    diagnostics: Diagnostics,
}

impl ObjectiveStage {
    pub(crate) fn new(
        variables: VariableSet,
        cache: ExpressionCache,
        constraints: ConstraintSet,
        diagnostics: Diagnostics,
    ) -> Self {
        Self {
            variables,
            cache,
            constraints,
            diagnostics,
        }
    }

    pub fn minimise(self, expr: &LinArray) -> EsmResult<Model> {
        self.set(ObjectiveSense::Minimise, expr)
    }

    pub fn maximise(self, expr: &LinArray) -> EsmResult<Model> {
        self.set(ObjectiveSense::Maximise, expr)
    }

    fn set(mut self, sense: ObjectiveSense, expr: &LinArray) -> EsmResult<Model> {
        if !expr.axes().is_empty() {
            return Err(EsmError::Objective(format!(
                "'{}' still has dimensions [{}]; reduce it to a scalar",
                expr.label(),
                expr.dims().join(", ")
            )));
        }
        let value = match expr.get_key(&[]) {
            Some(e) => e.clone(),
            None => {
                self.diagnostics
                    .add_warning("objective", "objective is empty; using zero");
                LinExpr::constant(0.0)
            }
        };
        tracing::info!(terms = value.terms().len(), "objective set");
        Ok(Model::new(
            self.variables,
            self.cache,
            self.constraints,
            Objective { sense, expr: value },
            self.diagnostics,
        ))
    }
}
