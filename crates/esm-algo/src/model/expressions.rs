//! Named intermediate arrays: the second build stage.

use super::constraints::ConstraintStage;
use super::variables::VariableSet;
use esm_core::{Diagnostics, EsmError, EsmResult, LinArray, Mask, Param};
use std::collections::BTreeMap;

/// A cached array of one of the three element kinds.
#[derive(Debug, Clone)]
pub enum CachedExpr {
    Param(Param),
    Mask(Mask),
    Lin(LinArray),
}

impl CachedExpr {
    fn kind(&self) -> &'static str {
        match self {
            CachedExpr::Param(_) => "parameter",
            CachedExpr::Mask(_) => "mask",
            CachedExpr::Lin(_) => "linear expression",
        }
    }
}

/// Write-once store of named expressions.
#[derive(Debug, Clone, Default)]
pub struct ExpressionCache {
    entries: BTreeMap<String, CachedExpr>,
}

impl ExpressionCache {
    pub fn insert(&mut self, name: &str, expr: CachedExpr) -> EsmResult<()> {
        if self.entries.contains_key(name) {
            return Err(EsmError::DuplicateExpression(name.to_string()));
        }
        self.entries.insert(name.to_string(), expr);
        Ok(())
    }

    pub fn get(&self, name: &str) -> EsmResult<&CachedExpr> {
        self.entries
            .get(name)
            .ok_or_else(|| EsmError::UndefinedExpression(name.to_string()))
    }

    pub fn lin(&self, name: &str) -> EsmResult<&LinArray> {
        match self.get(name)? {
            CachedExpr::Lin(arr) => Ok(arr),
            _ => Err(EsmError::ExpressionKind {
                name: name.to_string(),
                expected: "linear expression",
            }),
        }
    }

    pub fn param(&self, name: &str) -> EsmResult<&Param> {
        match self.get(name)? {
            CachedExpr::Param(arr) => Ok(arr),
            _ => Err(EsmError::ExpressionKind {
                name: name.to_string(),
                expected: "parameter",
            }),
        }
    }

    pub fn mask(&self, name: &str) -> EsmResult<&Mask> {
        match self.get(name)? {
            CachedExpr::Mask(arr) => Ok(arr),
            _ => Err(EsmError::ExpressionKind {
                name: name.to_string(),
                expected: "mask",
            }),
        }
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Names and kinds, in name order.
    pub fn describe(&self) -> impl Iterator<Item = (&str, &'static str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.kind()))
    }
}

/// Variables are frozen; expressions may be defined.
pub struct ExpressionStage {
    variables: VariableSet,
    cache: ExpressionCache,
    diagnostics: Diagnostics,
}

impl ExpressionStage {
    pub(crate) fn new(variables: VariableSet, diagnostics: Diagnostics) -> Self {
        Self {
            variables,
            cache: ExpressionCache::default(),
            diagnostics,
        }
    }

    pub fn variables(&self) -> &VariableSet {
        &self.variables
    }

    pub fn cache(&self) -> &ExpressionCache {
        &self.cache
    }

    pub fn diagnostics_mut(&mut self) -> &mut Diagnostics {
        &mut self.diagnostics
    }

    pub fn define_lin(&mut self, name: &str, expr: LinArray) -> EsmResult<()> {
        tracing::trace!(expression = name, entries = expr.len(), "cached");
        self.cache.insert(name, CachedExpr::Lin(expr.named(name)))
    }

    pub fn define_param(&mut self, name: &str, expr: Param) -> EsmResult<()> {
        self.cache.insert(name, CachedExpr::Param(expr.named(name)))
    }

    pub fn define_mask(&mut self, name: &str, expr: Mask) -> EsmResult<()> {
        self.cache.insert(name, CachedExpr::Mask(expr.named(name)))
    }

    pub fn lin(&self, name: &str) -> EsmResult<&LinArray> {
        self.cache.lin(name)
    }

    pub fn param(&self, name: &str) -> EsmResult<&Param> {
        self.cache.param(name)
    }

    pub fn mask(&self, name: &str) -> EsmResult<&Mask> {
        self.cache.mask(name)
    }

    pub fn finish(self) -> ConstraintStage {
        tracing::info!(expressions = self.cache.len(), "expressions cached");
        ConstraintStage::new(self.variables, self.cache, self.diagnostics)
    }
}
