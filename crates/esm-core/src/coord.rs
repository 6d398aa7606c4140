//! Coordinates and named axes.

use crate::error::{EsmError, EsmResult};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::Arc;

/// A single coordinate label along a dimension.
///
/// Years and mode numbers are integers; everything else is a string label.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Coord {
    Int(i64),
    Label(String),
}

impl Coord {
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Coord::Int(v) => Some(*v),
            Coord::Label(_) => None,
        }
    }
}

impl fmt::Display for Coord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Coord::Int(v) => write!(f, "{}", v),
            Coord::Label(s) => write!(f, "{}", s),
        }
    }
}

impl From<i64> for Coord {
    fn from(v: i64) -> Self {
        Coord::Int(v)
    }
}

impl From<i32> for Coord {
    fn from(v: i32) -> Self {
        Coord::Int(v as i64)
    }
}

impl From<&str> for Coord {
    fn from(s: &str) -> Self {
        Coord::Label(s.to_string())
    }
}

impl From<String> for Coord {
    fn from(s: String) -> Self {
        Coord::Label(s)
    }
}

#[derive(Debug)]
struct AxisCoords {
    values: Vec<Coord>,
    lookup: HashMap<Coord, u32>,
}

/// A named, ordered coordinate list.
///
/// Coordinates are shared between axes created by [`Axis::renamed`], so
/// aliasing YEAR as BUILDYEAR costs nothing and keeps positions comparable.
#[derive(Debug, Clone)]
pub struct Axis {
    name: Arc<str>,
    coords: Arc<AxisCoords>,
}

impl Axis {
    pub fn new(name: &str, values: Vec<Coord>) -> EsmResult<Self> {
        let mut lookup = HashMap::with_capacity(values.len());
        for (pos, value) in values.iter().enumerate() {
            if lookup.insert(value.clone(), pos as u32).is_some() {
                return Err(EsmError::InvalidValue {
                    parameter: name.to_string(),
                    index: value.to_string(),
                    reason: "duplicate coordinate".into(),
                });
            }
        }
        Ok(Self {
            name: Arc::from(name),
            coords: Arc::new(AxisCoords { values, lookup }),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn len(&self) -> usize {
        self.coords.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.coords.values.is_empty()
    }

    pub fn coords(&self) -> &[Coord] {
        &self.coords.values
    }

    pub fn coord(&self, pos: u32) -> &Coord {
        &self.coords.values[pos as usize]
    }

    pub fn position(&self, coord: &Coord) -> Option<u32> {
        self.coords.lookup.get(coord).copied()
    }

    /// Same coordinates under another dimension name.
    pub fn renamed(&self, name: &str) -> Axis {
        Axis {
            name: Arc::from(name),
            coords: Arc::clone(&self.coords),
        }
    }

    /// Whether two axes can be aligned position-by-position.
    pub fn same_coords(&self, other: &Axis) -> bool {
        Arc::ptr_eq(&self.coords, &other.coords) || self.coords.values == other.coords.values
    }

    /// Integer coordinates as floats, for arithmetic on years.
    pub fn numeric_values(&self) -> EsmResult<Vec<f64>> {
        self.coords
            .values
            .iter()
            .map(|c| {
                c.as_int().map(|v| v as f64).ok_or_else(|| EsmError::InvalidValue {
                    parameter: self.name.to_string(),
                    index: c.to_string(),
                    reason: "coordinate is not an integer".into(),
                })
            })
            .collect()
    }
}

impl PartialEq for Axis {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name && self.same_coords(other)
    }
}

/// All dimensions known to a model, by name.
#[derive(Debug, Clone, Default)]
pub struct DimensionCatalogue {
    axes: BTreeMap<String, Axis>,
}

impl DimensionCatalogue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert<C: Into<Coord>>(
        &mut self,
        name: &str,
        values: impl IntoIterator<Item = C>,
    ) -> EsmResult<()> {
        let axis = Axis::new(name, values.into_iter().map(Into::into).collect())?;
        self.axes.insert(name.to_string(), axis);
        Ok(())
    }

    /// Builder-style [`insert`](Self::insert).
    pub fn with_dimension<C: Into<Coord>>(
        mut self,
        name: &str,
        values: impl IntoIterator<Item = C>,
    ) -> EsmResult<Self> {
        self.insert(name, values)?;
        Ok(self)
    }

    /// Register `alias` as a second name for the coordinates of `existing`.
    pub fn alias(&mut self, existing: &str, alias: &str) -> EsmResult<()> {
        let axis = self.axis(existing)?.renamed(alias);
        self.axes.insert(alias.to_string(), axis);
        Ok(())
    }

    pub fn axis(&self, name: &str) -> EsmResult<&Axis> {
        self.axes
            .get(name)
            .ok_or_else(|| EsmError::MissingDimension(name.to_string()))
    }

    pub fn get(&self, name: &str) -> Option<&Axis> {
        self.axes.get(name)
    }

    pub fn axes_for(&self, dims: &[&str]) -> EsmResult<Vec<Axis>> {
        dims.iter().map(|d| self.axis(d).cloned()).collect()
    }

    /// Present and non-empty.
    pub fn is_populated(&self, name: &str) -> bool {
        self.axes.get(name).is_some_and(|a| !a.is_empty())
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.axes.keys().map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_duplicate_coordinate_rejected() {
        let err = Axis::new("YEAR", vec![2020.into(), 2020.into()]).unwrap_err();
        assert!(matches!(err, EsmError::InvalidValue { .. }));
    }

    #[test]
    fn test_alias_shares_coordinates() {
        let mut cat = DimensionCatalogue::new();
        cat.insert("YEAR", [2020, 2021, 2022]).unwrap();
        cat.alias("YEAR", "BUILDYEAR").unwrap();
        let year = cat.axis("YEAR").unwrap();
        let build = cat.axis("BUILDYEAR").unwrap();
        assert!(year.same_coords(build));
        assert_ne!(year, build);
        assert_eq!(build.position(&Coord::Int(2021)), Some(1));
    }

    #[test]
    fn test_numeric_values_reject_labels() {
        let axis = Axis::new("REGION", vec!["R1".into()]).unwrap();
        assert!(axis.numeric_values().is_err());
        let years = Axis::new("YEAR", vec![2020.into(), 2030.into()]).unwrap();
        assert_eq!(years.numeric_values().unwrap(), vec![2020.0, 2030.0]);
    }

    #[test]
    fn test_missing_dimension() {
        let cat = DimensionCatalogue::new();
        assert!(matches!(
            cat.axis("STORAGE"),
            Err(EsmError::MissingDimension(_))
        ));
        assert!(!cat.is_populated("STORAGE"));
    }
}
