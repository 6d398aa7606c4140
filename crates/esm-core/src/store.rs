//! Read-only parameter data handed to model builds.

use crate::array::{Mask, Param};
use crate::coord::{Coord, DimensionCatalogue};
use crate::error::{EsmError, EsmResult};
use crate::limit::{Limit, LimitArray};
use std::collections::BTreeMap;

/// Named parameters and limits over a shared dimension catalogue.
///
/// A store is assembled once, then only borrowed; concurrent builds may
/// share one instance.
#[derive(Debug, Clone, Default)]
pub struct ParameterStore {
    catalogue: DimensionCatalogue,
    values: BTreeMap<String, Param>,
    limits: BTreeMap<String, LimitArray>,
}

impl ParameterStore {
    pub fn new(catalogue: DimensionCatalogue) -> Self {
        Self {
            catalogue,
            values: BTreeMap::new(),
            limits: BTreeMap::new(),
        }
    }

    pub fn catalogue(&self) -> &DimensionCatalogue {
        &self.catalogue
    }

    pub fn insert_param(
        &mut self,
        name: &str,
        dims: &[&str],
        entries: impl IntoIterator<Item = (Vec<Coord>, f64)>,
    ) -> EsmResult<()> {
        let axes = self.catalogue.axes_for(dims)?;
        let param = Param::from_entries(name, axes, entries)?;
        self.values.insert(name.to_string(), param);
        Ok(())
    }

    /// Store a prepared array under its label, replacing any previous one.
    pub fn set_param(&mut self, param: Param) -> EsmResult<()> {
        self.check_axes(param.label(), &param.dims(), param.axes())?;
        self.values.insert(param.label().to_string(), param);
        Ok(())
    }

    pub fn insert_limit(
        &mut self,
        name: &str,
        dims: &[&str],
        entries: impl IntoIterator<Item = (Vec<Coord>, Limit)>,
    ) -> EsmResult<()> {
        let axes = self.catalogue.axes_for(dims)?;
        let limits = LimitArray::from_entries(name, axes, entries)?;
        self.limits.insert(name.to_string(), limits);
        Ok(())
    }

    /// Insert a limit from legacy data where `-1` means unbounded.
    pub fn insert_limit_sentinel(
        &mut self,
        name: &str,
        dims: &[&str],
        entries: impl IntoIterator<Item = (Vec<Coord>, f64)>,
    ) -> EsmResult<()> {
        self.insert_limit(
            name,
            dims,
            entries
                .into_iter()
                .map(|(coords, v)| (coords, Limit::from_sentinel(v))),
        )
    }

    pub fn param(&self, name: &str) -> EsmResult<&Param> {
        self.values
            .get(name)
            .ok_or_else(|| EsmError::MissingParameter(name.to_string()))
    }

    pub fn try_param(&self, name: &str) -> Option<&Param> {
        self.values.get(name)
    }

    /// Tag parameters as masks: present and true where the value is 1.
    pub fn tag(&self, name: &str) -> Option<Mask> {
        self.values.get(name).map(|p| p.eq_scalar(1.0))
    }

    pub fn limit(&self, name: &str) -> Option<&LimitArray> {
        self.limits.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.values.contains_key(name) || self.limits.contains_key(name)
    }

    pub fn param_names(&self) -> impl Iterator<Item = &str> {
        self.values.keys().map(String::as_str)
    }

    pub fn limit_names(&self) -> impl Iterator<Item = &str> {
        self.limits.keys().map(String::as_str)
    }

    fn check_axes(&self, name: &str, dims: &[&str], axes: &[crate::Axis]) -> EsmResult<()> {
        for (dim, axis) in dims.iter().zip(axes) {
            let known = self.catalogue.axis(dim)?;
            if !known.same_coords(axis) {
                return Err(EsmError::Alignment {
                    left: name.to_string(),
                    right: "dimension catalogue".into(),
                    dim: dim.to_string(),
                });
            }
        }
        Ok(())
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
    fn test_missing_parameter_is_schema_error() {
        let store = ParameterStore::new(catalogue());
        assert!(matches!(
            store.param("DiscountRate"),
            Err(EsmError::MissingParameter(_))
        ));
        assert!(store.try_param("DiscountRate").is_none());
    }

    #[test]
    fn test_insert_and_tag() {
        let mut store = ParameterStore::new(catalogue());
        store
            .insert_param(
                "ReserveMargin",
                &["REGION", "YEAR"],
                vec![
                    (vec!["R1".into(), 2020.into()], 1.0),
                    (vec!["R2".into(), 2020.into()], 0.0),
                ],
            )
            .unwrap();
        let tag = store.tag("ReserveMargin").unwrap();
        assert_eq!(tag.count_true(), 1);
        assert_eq!(tag.len(), 2);
    }

    #[test]
    fn test_sentinel_limits() {
        let mut store = ParameterStore::new(catalogue());
        store
            .insert_limit_sentinel(
                "AnnualEmissionLimit",
                &["REGION", "YEAR"],
                vec![
                    (vec!["R1".into(), 2020.into()], -1.0),
                    (vec!["R1".into(), 2021.into()], 5.0),
                ],
            )
            .unwrap();
        let limit = store.limit("AnnualEmissionLimit").unwrap();
        assert_eq!(limit.bounded().len(), 1);
        assert!(store.contains("AnnualEmissionLimit"));
    }

    #[test]
    fn test_unknown_dimension() {
        let mut store = ParameterStore::new(catalogue());
        let err = store
            .insert_param("StorageLevelStart", &["STORAGE"], vec![])
            .unwrap_err();
        assert!(matches!(err, EsmError::MissingDimension(_)));
    }

    #[test]
    fn test_store_is_shareable() {
        fn assert_sync<T: Send + Sync>() {}
        assert_sync::<ParameterStore>();
    }
}
