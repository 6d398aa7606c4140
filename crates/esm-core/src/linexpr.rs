//! Sparse affine forms over model columns.

use serde::Serialize;
use std::fmt;

/// Column index assigned by the variable registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct VarId(pub u32);

impl VarId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// `Σ coef·var + constant`, terms sorted by column with no duplicates or zeros.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LinExpr {
    terms: Vec<(VarId, f64)>,
    constant: f64,
}

impl LinExpr {
    pub fn var(id: VarId) -> Self {
        Self {
            terms: vec![(id, 1.0)],
            constant: 0.0,
        }
    }

    pub fn constant(value: f64) -> Self {
        Self {
            terms: Vec::new(),
            constant: value,
        }
    }

    /// Build from arbitrary terms, merging repeats.
    pub fn from_parts(mut terms: Vec<(VarId, f64)>, constant: f64) -> Self {
        terms.sort_by_key(|(id, _)| *id);
        let mut merged: Vec<(VarId, f64)> = Vec::with_capacity(terms.len());
        for (id, coef) in terms {
            match merged.last_mut() {
                Some((last, acc)) if *last == id => *acc += coef,
                _ => merged.push((id, coef)),
            }
        }
        merged.retain(|(_, c)| *c != 0.0);
        Self {
            terms: merged,
            constant,
        }
    }

    pub fn terms(&self) -> &[(VarId, f64)] {
        &self.terms
    }

    pub fn constant_term(&self) -> f64 {
        self.constant
    }

    /// No variable terms.
    pub fn is_constant(&self) -> bool {
        self.terms.is_empty()
    }

    pub fn coefficient(&self, id: VarId) -> f64 {
        self.terms
            .binary_search_by_key(&id, |(v, _)| *v)
            .map(|i| self.terms[i].1)
            .unwrap_or(0.0)
    }

    pub fn scaled(&self, k: f64) -> Self {
        if k == 0.0 {
            return Self::constant(0.0);
        }
        Self {
            terms: self.terms.iter().map(|(v, c)| (*v, c * k)).collect(),
            constant: self.constant * k,
        }
    }

    pub fn plus(&self, other: &LinExpr) -> Self {
        self.merge(other, 1.0)
    }

    pub fn minus(&self, other: &LinExpr) -> Self {
        self.merge(other, -1.0)
    }

    pub fn plus_constant(&self, c: f64) -> Self {
        Self {
            terms: self.terms.clone(),
            constant: self.constant + c,
        }
    }

    /// Value under a primal solution indexed by column.
    pub fn evaluate(&self, values: &[f64]) -> f64 {
        self.terms
            .iter()
            .map(|(v, c)| c * values.get(v.index()).copied().unwrap_or(0.0))
            .sum::<f64>()
            + self.constant
    }

    fn merge(&self, other: &LinExpr, sign: f64) -> Self {
        let mut out = Vec::with_capacity(self.terms.len() + other.terms.len());
        let (mut i, mut j) = (0, 0);
        while i < self.terms.len() || j < other.terms.len() {
            let next = match (self.terms.get(i), other.terms.get(j)) {
                (Some(a), Some(b)) if a.0 == b.0 => {
                    i += 1;
                    j += 1;
                    (a.0, a.1 + sign * b.1)
                }
                (Some(a), Some(b)) if a.0 < b.0 => {
                    i += 1;
                    *a
                }
                (Some(a), None) => {
                    i += 1;
                    *a
                }
                (_, Some(b)) => {
                    j += 1;
                    (b.0, sign * b.1)
                }
                (None, None) => break,
            };
            if next.1 != 0.0 {
                out.push(next);
            }
        }
        Self {
            terms: out,
            constant: self.constant + sign * other.constant,
        }
    }
}

impl From<f64> for LinExpr {
    fn from(value: f64) -> Self {
        LinExpr::constant(value)
    }
}

impl fmt::Display for LinExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, (v, c)) in self.terms.iter().enumerate() {
            if i > 0 {
                write!(f, " {} ", if *c < 0.0 { '-' } else { '+' })?;
                write!(f, "{} x{}", c.abs(), v.0)?;
            } else {
                write!(f, "{} x{}", c, v.0)?;
            }
        }
        if self.constant != 0.0 || self.terms.is_empty() {
            if self.terms.is_empty() {
                write!(f, "{}", self.constant)?;
            } else {
                write!(
                    f,
                    " {} {}",
                    if self.constant < 0.0 { '-' } else { '+' },
                    self.constant.abs()
                )?;
            }
        }
        Ok(())
    }
}
