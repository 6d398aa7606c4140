//! Reductions and shape-changing operations.

use super::{product, Key, LabeledArray, Mask, Summable};
use crate::coord::{Axis, Coord};
use crate::error::{EsmError, EsmResult};
use std::collections::{BTreeMap, BTreeSet};

/// Direction of a running sum along a dimension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// Sum of entries at earlier positions.
    Forward,
    /// Sum of entries at later positions.
    Backward,
}

impl<T: Clone> LabeledArray<T> {
    fn require_dim(&self, dim: &str) -> EsmResult<usize> {
        self.axis_index(dim)
            .ok_or_else(|| EsmError::MissingDimension(format!("{} (in '{}')", dim, self.label)))
    }

    /// Sum over `dims`. A group is present iff at least one member is.
    pub fn sum_over(&self, dims: &[&str]) -> EsmResult<Self>
    where
        T: Summable,
    {
        let drop = dims
            .iter()
            .map(|d| self.require_dim(d))
            .collect::<EsmResult<Vec<_>>>()?;
        let keep: Vec<usize> = (0..self.axes.len()).filter(|i| !drop.contains(i)).collect();

        let mut groups: BTreeMap<Key, T::Acc> = BTreeMap::new();
        for (key, value) in &self.data {
            let group: Key = keep.iter().map(|&i| key[i]).collect();
            T::accumulate(groups.entry(group).or_default(), value);
        }

        Ok(LabeledArray {
            label: self.label.clone(),
            axes: keep.iter().map(|&i| self.axes[i].clone()).collect(),
            data: groups.into_iter().map(|(k, acc)| (k, T::finish(acc))).collect(),
            masked_sources: BTreeSet::new(),
        })
    }

    /// Positional shift: the value at position `i` moves to `i + offset`.
    ///
    /// `shift("YEAR", 1)` puts last year's value at each year; the first
    /// year becomes absent.
    pub fn shift(&self, dim: &str, offset: i64) -> EsmResult<Self> {
        let d = self.require_dim(dim)?;
        let len = self.axes[d].len() as i64;
        let data = self
            .data
            .iter()
            .filter_map(|(key, value)| {
                let pos = key[d] as i64 + offset;
                (0..len).contains(&pos).then(|| {
                    let mut moved = key.clone();
                    moved[d] = pos as u32;
                    (moved, value.clone())
                })
            })
            .collect();
        Ok(LabeledArray {
            label: self.label.clone(),
            axes: self.axes.clone(),
            data,
            masked_sources: self.masked_sources.clone(),
        })
    }

    pub fn rename(&self, dim: &str, new_name: &str) -> EsmResult<Self> {
        let d = self.require_dim(dim)?;
        if self.has_dim(new_name) {
            return Err(EsmError::Other(format!(
                "dimension '{}' already present in '{}'",
                new_name, self.label
            )));
        }
        let mut out = self.clone();
        out.axes[d] = self.axes[d].renamed(new_name);
        Ok(out)
    }

    /// Swap two dimension names, e.g. REGION and _REGION.
    pub fn swap_dims(&self, a: &str, b: &str) -> EsmResult<Self> {
        let ia = self.require_dim(a)?;
        let ib = self.require_dim(b)?;
        if !self.axes[ia].same_coords(&self.axes[ib]) {
            return Err(EsmError::Alignment {
                left: self.label.clone(),
                right: self.label.clone(),
                dim: format!("{}/{}", a, b),
            });
        }
        let mut out = self.clone();
        out.axes[ia] = self.axes[ia].renamed(b);
        out.axes[ib] = self.axes[ib].renamed(a);
        Ok(out)
    }

    /// Broadcast over every coordinate of a new axis.
    pub fn expand(&self, axis: &Axis) -> EsmResult<Self> {
        if let Some(i) = self.axis_index(axis.name()) {
            if !self.axes[i].same_coords(axis) {
                return Err(EsmError::Alignment {
                    left: self.label.clone(),
                    right: axis.name().to_string(),
                    dim: axis.name().to_string(),
                });
            }
            return Ok(self.clone());
        }
        let mut out = self.clone();
        out.axes.push(axis.clone());
        out.data = self
            .data
            .iter()
            .flat_map(|(key, value)| {
                (0..axis.len() as u32).map(move |p| {
                    let mut k = key.clone();
                    k.push(p);
                    (k, value.clone())
                })
            })
            .collect();
        Ok(out)
    }

    /// Fix one dimension at `coord` and drop it.
    pub fn select(&self, dim: &str, coord: &Coord) -> EsmResult<Self> {
        let d = self.require_dim(dim)?;
        let pos = self.axes[d]
            .position(coord)
            .ok_or_else(|| EsmError::InvalidValue {
                parameter: self.label.clone(),
                index: coord.to_string(),
                reason: format!("not a coordinate of {}", dim),
            })?;
        let mut axes = self.axes.clone();
        axes.remove(d);
        let data = self
            .data
            .iter()
            .filter(|(key, _)| key[d] == pos)
            .map(|(key, value)| {
                let mut k = key.clone();
                k.remove(d);
                (k, value.clone())
            })
            .collect();
        Ok(LabeledArray {
            label: self.label.clone(),
            axes,
            data,
            masked_sources: self.masked_sources.clone(),
        })
    }

    /// Keep entries where `mask` is present and true. Extra mask dimensions
    /// broadcast the result.
    pub fn where_mask(&self, mask: &Mask) -> EsmResult<Self> {
        Ok(self
            .zip_with(mask, |v, m| (*m).then(|| v.clone()))?
            .clear_masked_sources())
    }

    /// Left where present, otherwise right.
    pub fn or_else(&self, other: &Self) -> EsmResult<Self> {
        self.outer_with(other, |l, r| l.or(r).cloned())
    }

    /// Explicit default over the full Cartesian product.
    pub fn fill(&self, value: T) -> EsmResult<Self> {
        let mut out = self.clone();
        for key in product(&self.axes) {
            if !out.data.contains_key(&key) {
                self.check_coercion(&key)?;
                out.data.insert(key, value.clone());
            }
        }
        Ok(out)
    }

    /// Exclusive running sum along `dim`, within each group of the other
    /// dimensions. Only positions present in `self` get a value; the first
    /// position in the direction of travel gets the empty sum.
    pub fn running_sum(&self, dim: &str, direction: Direction) -> EsmResult<Self>
    where
        T: Summable,
    {
        let d = self.require_dim(dim)?;
        let mut groups: BTreeMap<Key, Vec<(u32, &Key, &T)>> = BTreeMap::new();
        for (key, value) in &self.data {
            let mut rest = key.clone();
            rest.remove(d);
            groups.entry(rest).or_default().push((key[d], key, value));
        }

        let mut data = BTreeMap::new();
        for (_, mut members) in groups {
            members.sort_by_key(|(pos, _, _)| *pos);
            if direction == Direction::Backward {
                members.reverse();
            }
            let mut acc = T::Acc::default();
            for (_, key, value) in members {
                data.insert(key.clone(), T::finish(acc.clone()));
                T::accumulate(&mut acc, value);
            }
        }

        Ok(LabeledArray {
            label: self.label.clone(),
            axes: self.axes.clone(),
            data,
            masked_sources: self.masked_sources.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_support::*;
    use super::*;
    use crate::array::Param;

    fn series() -> Param {
        let y = years("YEAR", &[2020, 2021, 2022]);
        param(
            "s",
            vec![y],
            vec![
                (vec![2020.into()], 1.0),
                (vec![2021.into()], 2.0),
                (vec![2022.into()], 4.0),
            ],
        )
    }

    #[test]
    fn test_shift_moves_values_forward() {
        let s = series().shift("YEAR", 1).unwrap();
        assert!(s.get(&[2020.into()]).is_none());
        assert_eq!(s.get(&[2021.into()]), Some(&1.0));
        assert_eq!(s.get(&[2022.into()]), Some(&2.0));
    }

    #[test]
    fn test_sum_over_absent_group_stays_absent() {
        let r = axis("REGION", &["R1", "R2"]);
        let y = years("YEAR", &[2020, 2021]);
        let p = param(
            "p",
            vec![r, y],
            vec![(vec!["R1".into(), 2020.into()], 1.0), (vec!["R1".into(), 2021.into()], 2.0)],
        );
        let s = p.sum_over(&["YEAR"]).unwrap();
        assert_eq!(s.get(&["R1".into()]), Some(&3.0));
        assert!(s.get(&["R2".into()]).is_none());
        assert!(p.sum_over(&["TECHNOLOGY"]).is_err());
    }

    #[test]
    fn test_running_sum_both_directions() {
        let fwd = series().running_sum("YEAR", Direction::Forward).unwrap();
        assert_eq!(fwd.get(&[2020.into()]), Some(&0.0));
        assert_eq!(fwd.get(&[2022.into()]), Some(&3.0));
        let bwd = series().running_sum("YEAR", Direction::Backward).unwrap();
        assert_eq!(bwd.get(&[2020.into()]), Some(&6.0));
        assert_eq!(bwd.get(&[2022.into()]), Some(&0.0));
    }

    #[test]
    fn test_rename_and_swap() {
        let r = axis("REGION", &["R1", "R2"]);
        let rr = r.renamed("_REGION");
        let p = param("p", vec![r, rr], vec![(vec!["R1".into(), "R2".into()], 1.0)]);
        let q = p.swap_dims("REGION", "_REGION").unwrap();
        assert_eq!(q.dims(), vec!["_REGION", "REGION"]);
        // Read by name, the entry now sits at REGION=R2, _REGION=R1.
        assert_eq!(q.get(&["R1".into(), "R2".into()]), Some(&1.0));
        assert!(p.rename("REGION", "_REGION").is_err());
    }

    #[test]
    fn test_fill_and_or_else() {
        let y = years("YEAR", &[2020, 2021, 2022]);
        let sparse = param("a", vec![y.clone()], vec![(vec![2021.into()], 5.0)]);
        let filled = sparse.fill(0.0).unwrap();
        assert_eq!(filled.len(), 3);
        let fallback = param("b", vec![y], vec![(vec![2020.into()], 1.0), (vec![2021.into()], 9.0)]);
        let merged = sparse.or_else(&fallback).unwrap();
        assert_eq!(merged.get(&[2021.into()]), Some(&5.0));
        assert_eq!(merged.get(&[2020.into()]), Some(&1.0));
        assert!(merged.get(&[2022.into()]).is_none());
    }

    #[test]
    fn test_select_drops_dimension() {
        let s = series().select("YEAR", &Coord::Int(2021)).unwrap();
        assert!(s.dims().is_empty());
        assert_eq!(s.get(&[]), Some(&2.0));
    }

    #[test]
    fn test_where_mask_broadcasts_extra_dims() {
        let y = years("YEAR", &[2020, 2021]);
        let b = y.renamed("BUILDYEAR");
        let built = param("nc", vec![b.clone()], vec![(vec![2020.into()], 1.0), (vec![2021.into()], 1.0)]);
        let mut window = Mask::empty("w", vec![y, b]).unwrap();
        window.insert(&[2021.into(), 2020.into()], true).unwrap();
        window.insert(&[2021.into(), 2021.into()], true).unwrap();
        window.insert(&[2020.into(), 2021.into()], false).unwrap();
        let active = built.where_mask(&window).unwrap();
        assert_eq!(active.len(), 2);
        let acc = active.sum_over(&["BUILDYEAR"]).unwrap();
        assert_eq!(acc.get(&[2021.into()]), Some(&2.0));
        assert!(acc.get(&[2020.into()]).is_none());
    }
}
