//! Variable declaration: the first build stage.

use super::expressions::ExpressionStage;
use esm_core::{
    Axis, Coord, DimensionCatalogue, Diagnostics, EsmError, EsmResult, Key, LabeledArray,
    LinArray, LinExpr, Mask, VarId,
};
use serde::Serialize;
use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Integrality {
    Continuous,
    Integer,
    Binary,
}

/// Declaration of one indexed variable.
#[derive(Debug, Clone)]
pub struct VariableSpec {
    name: String,
    dims: Vec<String>,
    lower: Option<f64>,
    upper: Option<f64>,
    integrality: Integrality,
    mask: Option<Mask>,
}

impl VariableSpec {
    pub fn new(name: &str, dims: &[&str]) -> Self {
        Self {
            name: name.to_string(),
            dims: dims.iter().map(|d| d.to_string()).collect(),
            lower: None,
            upper: None,
            integrality: Integrality::Continuous,
            mask: None,
        }
    }

    pub fn lower(mut self, bound: f64) -> Self {
        self.lower = Some(bound);
        self
    }

    pub fn upper(mut self, bound: f64) -> Self {
        self.upper = Some(bound);
        self
    }

    pub fn integer(mut self) -> Self {
        self.integrality = Integrality::Integer;
        self
    }

    /// Integer in [0, 1].
    pub fn binary(mut self) -> Self {
        self.integrality = Integrality::Binary;
        self.lower = Some(0.0);
        self.upper = Some(1.0);
        self
    }

    /// Only indices where `mask` is present and true exist.
    pub fn masked(mut self, mask: Mask) -> Self {
        self.mask = Some(mask);
        self
    }
}

/// A declared variable: one column per surviving index.
#[derive(Debug, Clone)]
pub struct Variable {
    name: String,
    ids: LabeledArray<VarId>,
    integrality: Integrality,
    masked: bool,
}

impl Variable {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn ids(&self) -> &LabeledArray<VarId> {
        &self.ids
    }

    pub fn integrality(&self) -> Integrality {
        self.integrality
    }

    pub fn is_masked(&self) -> bool {
        self.masked
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// The variable as an array of single-term expressions.
    pub fn expr(&self) -> LinArray {
        let out = self.ids.map(|id| LinExpr::var(*id)).named(&self.name);
        if self.masked {
            out.with_masked_source(&self.name)
        } else {
            out
        }
    }
}

/// Solver column data.
#[derive(Debug, Clone)]
pub struct Column {
    pub variable: usize,
    pub key: Key,
    pub lower: f64,
    pub upper: f64,
    pub integrality: Integrality,
}

/// Collects declarations; [`finish`](Self::finish) freezes them.
pub struct VariableRegistry<'a> {
    catalogue: &'a DimensionCatalogue,
    variables: Vec<Variable>,
    by_name: HashMap<String, usize>,
    columns: Vec<Column>,
    diagnostics: Diagnostics,
}

impl<'a> VariableRegistry<'a> {
    pub fn new(catalogue: &'a DimensionCatalogue) -> Self {
        Self {
            catalogue,
            variables: Vec::new(),
            by_name: HashMap::new(),
            columns: Vec::new(),
            diagnostics: Diagnostics::new(),
        }
    }

    pub fn declare(&mut self, spec: VariableSpec) -> EsmResult<&Variable> {
        if self.by_name.contains_key(&spec.name) {
            return Err(EsmError::DuplicateVariable(spec.name));
        }
        let dims: Vec<&str> = spec.dims.iter().map(String::as_str).collect();
        let axes = self.catalogue.axes_for(&dims)?;
        let projection = match &spec.mask {
            Some(mask) => Some(mask_projection(&spec.name, &axes, mask)?),
            None => None,
        };

        let index = self.variables.len();
        let mut ids = LabeledArray::empty(&spec.name, axes.clone())?;
        for key in esm_core::array::product(&axes) {
            if let (Some(mask), Some(proj)) = (&spec.mask, &projection) {
                let mkey: Key = proj.iter().map(|&i| key[i]).collect();
                if mask.get_key(&mkey) != Some(&true) {
                    continue;
                }
            }
            let id = VarId(self.columns.len() as u32);
            self.columns.push(Column {
                variable: index,
                key: key.clone(),
                lower: spec.lower.unwrap_or(f64::NEG_INFINITY),
                upper: spec.upper.unwrap_or(f64::INFINITY),
                integrality: spec.integrality,
            });
            ids.insert_at(key, id);
        }

        if ids.is_empty() {
            self.diagnostics.add_warning_with_entity(
                "variable",
                "declared with no surviving indices",
                &spec.name,
            );
        }
        tracing::debug!(variable = %spec.name, columns = ids.len(), "declared variable");

        self.by_name.insert(spec.name.clone(), index);
        self.variables.push(Variable {
            name: spec.name,
            ids,
            integrality: spec.integrality,
            masked: spec.mask.is_some(),
        });
        Ok(&self.variables[index])
    }

    pub fn catalogue(&self) -> &DimensionCatalogue {
        self.catalogue
    }

    pub fn finish(self) -> ExpressionStage {
        tracing::info!(
            variables = self.variables.len(),
            columns = self.columns.len(),
            "variables declared"
        );
        ExpressionStage::new(
            VariableSet {
                variables: self.variables,
                by_name: self.by_name,
                columns: self.columns,
            },
            self.diagnostics,
        )
    }
}

/// Position of each mask axis within the variable's axes.
fn mask_projection(name: &str, axes: &[Axis], mask: &Mask) -> EsmResult<Vec<usize>> {
    mask.axes()
        .iter()
        .map(|maxis| {
            let i = axes
                .iter()
                .position(|a| a.name() == maxis.name())
                .ok_or_else(|| EsmError::MissingDimension(format!(
                    "{} (mask of '{}')",
                    maxis.name(),
                    name
                )))?;
            if !axes[i].same_coords(maxis) {
                return Err(EsmError::Alignment {
                    left: name.to_string(),
                    right: mask.label().to_string(),
                    dim: maxis.name().to_string(),
                });
            }
            Ok(i)
        })
        .collect()
}

/// Frozen variable declarations.
#[derive(Debug, Clone)]
pub struct VariableSet {
    variables: Vec<Variable>,
    by_name: HashMap<String, usize>,
    columns: Vec<Column>,
}

impl VariableSet {
    pub fn get(&self, name: &str) -> EsmResult<&Variable> {
        self.by_name
            .get(name)
            .map(|&i| &self.variables[i])
            .ok_or_else(|| EsmError::UndeclaredVariable(name.to_string()))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.by_name.contains_key(name)
    }

    pub fn expr(&self, name: &str) -> EsmResult<LinArray> {
        Ok(self.get(name)?.expr())
    }

    /// Scalar access; a masked-out index is a domain-policy error.
    pub fn at(&self, name: &str, coords: &[Coord]) -> EsmResult<LinExpr> {
        let var = self.get(name)?;
        var.ids
            .get(coords)
            .map(|id| LinExpr::var(*id))
            .ok_or_else(|| EsmError::DomainPolicy {
                name: name.to_string(),
                index: format!(
                    "[{}]",
                    coords.iter().map(|c| c.to_string()).collect::<Vec<_>>().join(", ")
                ),
            })
    }

    pub fn iter(&self) -> impl Iterator<Item = &Variable> {
        self.variables.iter()
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    pub fn has_integers(&self) -> bool {
        self.columns
            .iter()
            .any(|c| c.integrality != Integrality::Continuous)
    }

    /// `NewCapacity[R1, COAL, 2020]`
    pub fn column_label(&self, id: VarId) -> String {
        let column = &self.columns[id.index()];
        let var = &self.variables[column.variable];
        format!("{}{}", var.name, var.ids.format_key(&column.key))
    }

    /// Variable name and coordinates of a column.
    pub fn column_coords(&self, id: VarId) -> (&str, Vec<Coord>) {
        let column = &self.columns[id.index()];
        let var = &self.variables[column.variable];
        (&var.name, var.ids.coords_of(&column.key))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn catalogue() -> DimensionCatalogue {
        DimensionCatalogue::new()
            .with_dimension("REGION", ["R1", "R2"])
            .unwrap()
            .with_dimension("YEAR", [2020, 2021])
            .unwrap()
    }

    #[test]
    fn test_declare_assigns_one_column_per_index() {
        let cat = catalogue();
        let mut reg = VariableRegistry::new(&cat);
        reg.declare(VariableSpec::new("NewCapacity", &["REGION", "YEAR"]).lower(0.0))
            .unwrap();
        let stage = reg.finish();
        let vars = stage.variables();
        assert_eq!(vars.column_count(), 4);
        assert_eq!(vars.columns()[0].lower, 0.0);
        assert!(vars.columns()[0].upper.is_infinite());
        assert_eq!(vars.column_label(VarId(1)), "NewCapacity[R1, 2021]");
    }

    #[test]
    fn test_duplicate_variable_rejected() {
        let cat = catalogue();
        let mut reg = VariableRegistry::new(&cat);
        reg.declare(VariableSpec::new("x", &["REGION"])).unwrap();
        let err = reg.declare(VariableSpec::new("x", &["YEAR"])).unwrap_err();
        assert!(matches!(err, EsmError::DuplicateVariable(_)));
    }

    #[test]
    fn test_masked_index_is_domain_policy_error() {
        let cat = catalogue();
        let mut mask = Mask::empty("route", vec![cat.axis("REGION").unwrap().clone()]).unwrap();
        mask.insert(&["R1".into()], true).unwrap();
        mask.insert(&["R2".into()], false).unwrap();

        let mut reg = VariableRegistry::new(&cat);
        reg.declare(VariableSpec::new("Export", &["REGION", "YEAR"]).masked(mask))
            .unwrap();
        let stage = reg.finish();
        let vars = stage.variables();
        assert_eq!(vars.get("Export").unwrap().len(), 2);
        assert!(vars.at("Export", &["R1".into(), 2020.into()]).is_ok());
        assert!(matches!(
            vars.at("Export", &["R2".into(), 2020.into()]),
            Err(EsmError::DomainPolicy { .. })
        ));
        assert!(vars
            .expr("Export")
            .unwrap()
            .masked_sources()
            .contains("Export"));
    }

    #[test]
    fn test_mask_on_unknown_dimension_rejected() {
        let cat = catalogue();
        let mask = Mask::empty("m", vec![cat.axis("YEAR").unwrap().clone()]).unwrap();
        let mut reg = VariableRegistry::new(&cat);
        let err = reg
            .declare(VariableSpec::new("x", &["REGION"]).masked(mask))
            .unwrap_err();
        assert!(matches!(err, EsmError::MissingDimension(_)));
    }

    #[test]
    fn test_binary_bounds() {
        let cat = catalogue();
        let mut reg = VariableRegistry::new(&cat);
        reg.declare(VariableSpec::new("z", &["REGION"]).binary()).unwrap();
        let stage = reg.finish();
        assert!(stage.variables().has_integers());
        assert_eq!(stage.variables().columns()[0].upper, 1.0);
    }
}
