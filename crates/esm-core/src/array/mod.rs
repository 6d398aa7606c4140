//! Sparse labeled arrays over named dimensions.
//!
//! A [`LabeledArray`] maps position tuples (one position per axis) to values.
//! A tuple that is not stored is *absent*: not applicable, rather than zero.
//! Absence propagates through inner arithmetic and reductions; the only way
//! to turn it into a number is an explicit [`fill`](LabeledArray::fill) or
//! one of the `*_outer` operations.
//!
//! Every binary operation goes through [`LabeledArray::zip_with`] or
//! [`LabeledArray::outer_with`], which align operands on the union of their
//! dimensions. Operands that share a dimension name but disagree on its
//! coordinates are rejected with [`EsmError::Alignment`].
//!
//! Arrays also remember which masked variables they reference directly
//! ("masked sources"). Filling such an array, or outer-combining it where
//! it is absent, would silently coerce an undefined variable to zero and is
//! refused with [`EsmError::DomainPolicy`]. Reductions and explicit masking
//! clear the set.

mod ops;
mod reshape;

pub use ops::{AddElem, DivElem, MulElem, Summable, Zero};
pub use reshape::Direction;

use crate::coord::{Axis, Coord};
use crate::error::{EsmError, EsmResult};
use crate::linexpr::LinExpr;
use std::collections::{BTreeMap, BTreeSet, HashMap};

/// Position tuple, one entry per axis.
pub type Key = Vec<u32>;

/// Numeric parameter data.
pub type Param = LabeledArray<f64>;
/// Boolean selection. Absent is distinct from `false`.
pub type Mask = LabeledArray<bool>;
/// Array of linear expressions.
pub type LinArray = LabeledArray<LinExpr>;

#[derive(Debug, Clone)]
pub struct LabeledArray<T> {
    label: String,
    axes: Vec<Axis>,
    data: BTreeMap<Key, T>,
    masked_sources: BTreeSet<String>,
}

impl<T> LabeledArray<T> {
    /// An array with no present entries.
    pub fn empty(label: impl Into<String>, axes: Vec<Axis>) -> EsmResult<Self> {
        let label = label.into();
        for (i, axis) in axes.iter().enumerate() {
            if axes[..i].iter().any(|a| a.name() == axis.name()) {
                return Err(EsmError::Other(format!(
                    "dimension '{}' repeated in '{}'",
                    axis.name(),
                    label
                )));
            }
        }
        Ok(Self {
            label,
            axes,
            data: BTreeMap::new(),
            masked_sources: BTreeSet::new(),
        })
    }

    /// A zero-dimensional array holding one value.
    pub fn scalar(label: impl Into<String>, value: T) -> Self {
        let mut data = BTreeMap::new();
        data.insert(Vec::new(), value);
        Self {
            label: label.into(),
            axes: Vec::new(),
            data,
            masked_sources: BTreeSet::new(),
        }
    }

    pub fn from_entries(
        label: impl Into<String>,
        axes: Vec<Axis>,
        entries: impl IntoIterator<Item = (Vec<Coord>, T)>,
    ) -> EsmResult<Self> {
        let mut array = Self::empty(label, axes)?;
        for (coords, value) in entries {
            array.insert(&coords, value)?;
        }
        Ok(array)
    }

    /// The same value at every tuple of the Cartesian product.
    pub fn full(label: impl Into<String>, axes: Vec<Axis>, value: T) -> EsmResult<Self>
    where
        T: Clone,
    {
        let mut array = Self::empty(label, axes)?;
        for key in product(&array.axes) {
            array.data.insert(key, value.clone());
        }
        Ok(array)
    }

    pub fn insert(&mut self, coords: &[Coord], value: T) -> EsmResult<()> {
        let key = self.key_of(coords)?;
        self.data.insert(key, value);
        Ok(())
    }

    /// Insert by position tuple. Positions must be valid for the axes.
    pub fn insert_at(&mut self, key: Key, value: T) {
        debug_assert!(key.len() == self.axes.len());
        self.data.insert(key, value);
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    /// Rename for error messages and cache entries.
    pub fn named(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }

    pub fn axes(&self) -> &[Axis] {
        &self.axes
    }

    pub fn dims(&self) -> Vec<&str> {
        self.axes.iter().map(Axis::name).collect()
    }

    pub fn axis_index(&self, dim: &str) -> Option<usize> {
        self.axes.iter().position(|a| a.name() == dim)
    }

    pub fn has_dim(&self, dim: &str) -> bool {
        self.axis_index(dim).is_some()
    }

    /// Number of present entries.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn get(&self, coords: &[Coord]) -> Option<&T> {
        let key = self.key_of(coords).ok()?;
        self.data.get(&key)
    }

    pub fn get_key(&self, key: &[u32]) -> Option<&T> {
        self.data.get(key)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Key, &T)> {
        self.data.iter()
    }

    pub fn values(&self) -> impl Iterator<Item = &T> {
        self.data.values()
    }

    /// Entries with coordinates resolved.
    pub fn entries(&self) -> impl Iterator<Item = (Vec<Coord>, &T)> {
        self.data.iter().map(|(k, v)| (self.coords_of(k), v))
    }

    pub fn coords_of(&self, key: &[u32]) -> Vec<Coord> {
        key.iter()
            .zip(&self.axes)
            .map(|(p, a)| a.coord(*p).clone())
            .collect()
    }

    /// `[R1, COAL, 2020]`
    pub fn format_key(&self, key: &[u32]) -> String {
        format_axes_key(&self.axes, key)
    }

    pub fn masked_sources(&self) -> &BTreeSet<String> {
        &self.masked_sources
    }

    /// Record that this array references a masked variable.
    pub fn with_masked_source(mut self, name: impl Into<String>) -> Self {
        self.masked_sources.insert(name.into());
        self
    }

    pub(crate) fn clear_masked_sources(mut self) -> Self {
        self.masked_sources.clear();
        self
    }

    pub fn map<V>(&self, f: impl Fn(&T) -> V) -> LabeledArray<V> {
        self.filter_map(|v| Some(f(v)))
    }

    /// Map, dropping entries for which `f` returns `None`.
    pub fn filter_map<V>(&self, f: impl Fn(&T) -> Option<V>) -> LabeledArray<V> {
        LabeledArray {
            label: self.label.clone(),
            axes: self.axes.clone(),
            data: self
                .data
                .iter()
                .filter_map(|(k, v)| f(v).map(|out| (k.clone(), out)))
                .collect(),
            masked_sources: self.masked_sources.clone(),
        }
    }

    /// Boolean mask of where this array is present.
    pub fn present(&self) -> Mask {
        self.map(|_| true).clear_masked_sources()
    }

    fn key_of(&self, coords: &[Coord]) -> EsmResult<Key> {
        if coords.len() != self.axes.len() {
            return Err(EsmError::InvalidValue {
                parameter: self.label.clone(),
                index: format_coords(coords),
                reason: format!("expected {} coordinates", self.axes.len()),
            });
        }
        coords
            .iter()
            .zip(&self.axes)
            .map(|(c, a)| {
                a.position(c).ok_or_else(|| EsmError::InvalidValue {
                    parameter: self.label.clone(),
                    index: format_coords(coords),
                    reason: format!("'{}' is not a coordinate of {}", c, a.name()),
                })
            })
            .collect()
    }

    /// Union of axes for a binary operation. Returns the union (self's axes
    /// first), the shared (left, right) axis positions, and the positions of
    /// the right-only axes.
    fn join_layout<U>(&self, other: &LabeledArray<U>) -> EsmResult<JoinLayout> {
        let mut axes = self.axes.clone();
        let mut shared = Vec::new();
        let mut right_only = Vec::new();
        for (ri, raxis) in other.axes.iter().enumerate() {
            match self.axis_index(raxis.name()) {
                Some(li) => {
                    if !self.axes[li].same_coords(raxis) {
                        return Err(EsmError::Alignment {
                            left: self.label.clone(),
                            right: other.label.clone(),
                            dim: raxis.name().to_string(),
                        });
                    }
                    shared.push((li, ri));
                }
                None => {
                    right_only.push(ri);
                    axes.push(raxis.clone());
                }
            }
        }
        Ok(JoinLayout {
            axes,
            shared,
            right_only,
        })
    }

    /// Inner join with broadcasting: `f` runs wherever both operands are
    /// present; a `None` result leaves the tuple absent.
    pub fn zip_with<U, V>(
        &self,
        other: &LabeledArray<U>,
        f: impl Fn(&T, &U) -> Option<V>,
    ) -> EsmResult<LabeledArray<V>> {
        let layout = self.join_layout(other)?;

        let mut index: HashMap<Key, Vec<(&Key, &U)>> = HashMap::new();
        for (rk, rv) in &other.data {
            let sk: Key = layout.shared.iter().map(|&(_, ri)| rk[ri]).collect();
            index.entry(sk).or_default().push((rk, rv));
        }

        let mut data = BTreeMap::new();
        for (lk, lv) in &self.data {
            let sk: Key = layout.shared.iter().map(|&(li, _)| lk[li]).collect();
            let Some(matches) = index.get(&sk) else {
                continue;
            };
            for (rk, rv) in matches {
                if let Some(value) = f(lv, rv) {
                    let mut key = lk.clone();
                    key.extend(layout.right_only.iter().map(|&ri| rk[ri]));
                    data.insert(key, value);
                }
            }
        }

        Ok(LabeledArray {
            label: self.label.clone(),
            axes: layout.axes,
            data,
            masked_sources: self
                .masked_sources
                .union(&other.masked_sources)
                .cloned()
                .collect(),
        })
    }

    /// Outer join with broadcasting: `f` runs wherever either operand is
    /// present. An operand lacking a dimension of the union is broadcast over
    /// every coordinate of that dimension.
    pub fn outer_with<U, V>(
        &self,
        other: &LabeledArray<U>,
        f: impl Fn(Option<&T>, Option<&U>) -> Option<V>,
    ) -> EsmResult<LabeledArray<V>> {
        let layout = self.join_layout(other)?;
        let n_left = self.axes.len();
        let left_only: Vec<usize> = (0..n_left)
            .filter(|li| !layout.shared.iter().any(|(l, _)| l == li))
            .collect();
        let right_extra_axes: Vec<Axis> = layout.axes[n_left..].to_vec();
        let left_only_axes: Vec<Axis> = left_only.iter().map(|&li| self.axes[li].clone()).collect();

        let mut slots: BTreeMap<Key, (Option<&T>, Option<&U>)> = BTreeMap::new();
        for (lk, lv) in &self.data {
            for tail in product(&right_extra_axes) {
                let mut key = lk.clone();
                key.extend(tail);
                slots.entry(key).or_insert((None, None)).0 = Some(lv);
            }
        }
        for (rk, rv) in &other.data {
            for fill in product(&left_only_axes) {
                let mut key = vec![0u32; layout.axes.len()];
                for &(li, ri) in &layout.shared {
                    key[li] = rk[ri];
                }
                for (slot, &li) in left_only.iter().enumerate() {
                    key[li] = fill[slot];
                }
                for (offset, &ri) in layout.right_only.iter().enumerate() {
                    key[n_left + offset] = rk[ri];
                }
                slots.entry(key).or_insert((None, None)).1 = Some(rv);
            }
        }

        let mut data = BTreeMap::new();
        for (key, (l, r)) in slots {
            if l.is_none() {
                self.check_coercion(&key[..n_left])?;
            }
            if r.is_none() && !other.masked_sources.is_empty() {
                return Err(EsmError::DomainPolicy {
                    name: first_source(&other.masked_sources),
                    index: format_axes_key(&layout.axes, &key),
                });
            }
            if let Some(value) = f(l, r) {
                data.insert(key, value);
            }
        }

        Ok(LabeledArray {
            label: self.label.clone(),
            axes: layout.axes,
            data,
            masked_sources: self
                .masked_sources
                .union(&other.masked_sources)
                .cloned()
                .collect(),
        })
    }

    /// Refuse to default an entry of an array that references masked variables.
    fn check_coercion(&self, key: &[u32]) -> EsmResult<()> {
        if self.masked_sources.is_empty() {
            return Ok(());
        }
        Err(EsmError::DomainPolicy {
            name: first_source(&self.masked_sources),
            index: self.format_key(key),
        })
    }
}

struct JoinLayout {
    axes: Vec<Axis>,
    shared: Vec<(usize, usize)>,
    right_only: Vec<usize>,
}

fn first_source(sources: &BTreeSet<String>) -> String {
    sources.iter().next().cloned().unwrap_or_default()
}

fn format_axes_key(axes: &[Axis], key: &[u32]) -> String {
    let parts: Vec<String> = key
        .iter()
        .zip(axes)
        .map(|(p, a)| a.coord(*p).to_string())
        .collect();
    format!("[{}]", parts.join(", "))
}

fn format_coords(coords: &[Coord]) -> String {
    let parts: Vec<String> = coords.iter().map(|c| c.to_string()).collect();
    format!("[{}]", parts.join(", "))
}

/// Every position tuple of the product of `axes`, in lexicographic order.
pub fn product(axes: &[Axis]) -> Vec<Key> {
    if axes.iter().any(Axis::is_empty) {
        return Vec::new();
    }
    let total: usize = axes.iter().map(Axis::len).product();
    let mut out = Vec::with_capacity(total);
    let mut current = vec![0u32; axes.len()];
    for _ in 0..total {
        out.push(current.clone());
        for d in (0..axes.len()).rev() {
            current[d] += 1;
            if (current[d] as usize) < axes[d].len() {
                break;
            }
            current[d] = 0;
        }
    }
    out
}
