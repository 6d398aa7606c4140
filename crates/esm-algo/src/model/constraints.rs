//! Constraint assembly: the third build stage.
//!
//! A constraint is `lhs (sense) rhs` over labeled arrays. Rows are generated
//! only where `lhs - rhs` is present and the optional mask is true, so a
//! missing parameter entry silently removes the row at that index instead of
//! producing a row against zero.

use super::expressions::ExpressionCache;
use super::objective::ObjectiveStage;
use super::variables::VariableSet;
use esm_core::{Axis, Coord, Diagnostics, EsmResult, Key, LinArray, LinExpr, Mask, Param};
use serde::Serialize;
use std::collections::HashMap;
use std::fmt;

const CONSTANT_ROW_TOLERANCE: f64 = 1e-9;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Sense {
    Le,
    Ge,
    Eq,
}

impl Sense {
    fn holds(self, lhs: f64, rhs: f64) -> bool {
        match self {
            Sense::Le => lhs <= rhs + CONSTANT_ROW_TOLERANCE,
            Sense::Ge => lhs + CONSTANT_ROW_TOLERANCE >= rhs,
            Sense::Eq => (lhs - rhs).abs() <= CONSTANT_ROW_TOLERANCE,
        }
    }
}

impl fmt::Display for Sense {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Sense::Le => "<=",
            Sense::Ge => ">=",
            Sense::Eq => "=",
        })
    }
}

/// Right-hand side of a constraint.
#[derive(Debug, Clone, Copy)]
pub enum Operand<'a> {
    Lin(&'a LinArray),
    Param(&'a Param),
    Scalar(f64),
}

impl<'a> From<&'a LinArray> for Operand<'a> {
    fn from(arr: &'a LinArray) -> Self {
        Operand::Lin(arr)
    }
}

impl<'a> From<&'a Param> for Operand<'a> {
    fn from(arr: &'a Param) -> Self {
        Operand::Param(arr)
    }
}

impl From<f64> for Operand<'_> {
    fn from(value: f64) -> Self {
        Operand::Scalar(value)
    }
}

/// One generated row: `expr (sense) rhs`, variables on the left.
#[derive(Debug, Clone)]
pub struct Row {
    pub key: Key,
    pub expr: LinExpr,
    pub sense: Sense,
    pub rhs: f64,
}

#[derive(Debug, Clone)]
pub struct Constraint {
    name: String,
    axes: Vec<Axis>,
    rows: Vec<Row>,
}

impl Constraint {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn axes(&self) -> &[Axis] {
        &self.axes
    }

    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn coords_of(&self, row: &Row) -> Vec<Coord> {
        row.key
            .iter()
            .zip(&self.axes)
            .map(|(p, a)| a.coord(*p).clone())
            .collect()
    }

    pub fn row_at(&self, coords: &[Coord]) -> Option<&Row> {
        self.rows.iter().find(|r| self.coords_of(r) == coords)
    }

    /// `EBa11_EnergyBalanceEachTS5[R1, DAY, ELC, 2020]`
    pub fn row_label(&self, row: &Row) -> String {
        let parts: Vec<String> = self.coords_of(row).iter().map(|c| c.to_string()).collect();
        format!("{}[{}]", self.name, parts.join(", "))
    }
}

/// Ordered, named constraints. Re-adding a name replaces it in place.
#[derive(Debug, Clone)]
pub struct ConstraintSet {
    constraints: Vec<Constraint>,
    by_name: HashMap<String, usize>,
    drop_trivial_rows: bool,
}

impl Default for ConstraintSet {
    fn default() -> Self {
        Self {
            constraints: Vec::new(),
            by_name: HashMap::new(),
            drop_trivial_rows: true,
        }
    }
}

impl ConstraintSet {
    pub fn get(&self, name: &str) -> Option<&Constraint> {
        self.by_name.get(name).map(|&i| &self.constraints[i])
    }

    pub fn iter(&self) -> impl Iterator<Item = &Constraint> {
        self.constraints.iter()
    }

    pub fn len(&self) -> usize {
        self.constraints.len()
    }

    pub fn is_empty(&self) -> bool {
        self.constraints.is_empty()
    }

    pub fn row_count(&self) -> usize {
        self.constraints.iter().map(Constraint::len).sum()
    }

    pub fn add<'a>(
        &mut self,
        name: &str,
        lhs: &LinArray,
        sense: Sense,
        rhs: impl Into<Operand<'a>>,
        mask: Option<&Mask>,
        diagnostics: &mut Diagnostics,
    ) -> EsmResult<usize> {
        let mut diff = match rhs.into() {
            Operand::Lin(r) => lhs.sub(r)?,
            Operand::Param(p) => lhs.sub(p)?,
            Operand::Scalar(c) => lhs.add_scalar(-c),
        };
        if let Some(mask) = mask {
            diff = diff.where_mask(mask)?;
        }

        let mut rows = Vec::with_capacity(diff.len());
        let mut constant_rows = 0usize;
        for (key, expr) in diff.iter() {
            let rhs = -expr.constant_term();
            if expr.is_constant() {
                if self.drop_trivial_rows && sense.holds(0.0, rhs) {
                    continue;
                }
                constant_rows += 1;
                if !sense.holds(0.0, rhs) {
                    diagnostics.add_warning_with_entity(
                        "constant-row",
                        &format!("row has no variables and 0 {} {} cannot hold", sense, rhs),
                        &format!("{}{}", name, diff.format_key(key)),
                    );
                }
            }
            rows.push(Row {
                key: key.clone(),
                expr: LinExpr::from_parts(expr.terms().to_vec(), 0.0),
                sense,
                rhs,
            });
        }
        if constant_rows > 0 {
            tracing::warn!(constraint = name, rows = constant_rows, "rows without variables");
        }

        let constraint = Constraint {
            name: name.to_string(),
            axes: diff.axes().to_vec(),
            rows,
        };
        let count = constraint.len();
        match self.by_name.get(name) {
            Some(&i) => {
                tracing::debug!(constraint = name, rows = count, "constraint replaced");
                diagnostics.add_info("override", &format!("constraint '{}' replaced", name));
                self.constraints[i] = constraint;
            }
            None => {
                tracing::debug!(constraint = name, rows = count, "constraint added");
                self.by_name.insert(name.to_string(), self.constraints.len());
                self.constraints.push(constraint);
            }
        }
        Ok(count)
    }
}

/// Variables and expressions are frozen; constraints may be added.
pub struct ConstraintStage {
    variables: VariableSet,
    cache: ExpressionCache,
    constraints: ConstraintSet,
    diagnostics: Diagnostics,
}

impl ConstraintStage {
    pub(crate) fn new(
        variables: VariableSet,
        cache: ExpressionCache,
        diagnostics: Diagnostics,
    ) -> Self {
        Self {
            variables,
            cache,
            constraints: ConstraintSet::default(),
            diagnostics,
        }
    }

    pub fn set_drop_trivial_rows(&mut self, drop: bool) {
        self.constraints.drop_trivial_rows = drop;
    }

    pub fn variables(&self) -> &VariableSet {
        &self.variables
    }

    pub fn cache(&self) -> &ExpressionCache {
        &self.cache
    }

    pub fn constraints(&self) -> &ConstraintSet {
        &self.constraints
    }

    pub fn diagnostics_mut(&mut self) -> &mut Diagnostics {
        &mut self.diagnostics
    }

    pub fn lin(&self, name: &str) -> EsmResult<&LinArray> {
        self.cache.lin(name)
    }

    pub fn param(&self, name: &str) -> EsmResult<&Param> {
        self.cache.param(name)
    }

    pub fn add<'a>(
        &mut self,
        name: &str,
        lhs: &LinArray,
        sense: Sense,
        rhs: impl Into<Operand<'a>>,
        mask: Option<&Mask>,
    ) -> EsmResult<usize> {
        self.constraints
            .add(name, lhs, sense, rhs, mask, &mut self.diagnostics)
    }

    pub fn finish(self) -> ObjectiveStage {
        tracing::info!(
            constraints = self.constraints.len(),
            rows = self.constraints.row_count(),
            "constraints assembled"
        );
        ObjectiveStage::new(self.variables, self.cache, self.constraints, self.diagnostics)
    }
}
