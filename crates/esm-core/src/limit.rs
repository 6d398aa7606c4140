//! Upper limits that may be absent in a meaningful way.
//!
//! Input data traditionally spells "no limit" as `-1`. That sentinel is
//! converted once, at the edge, and never seen by equation code.

use crate::array::{LabeledArray, Param};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Limit {
    Unbounded,
    Bounded(f64),
}

impl Limit {
    /// `-1` means unbounded; anything else is a bound.
    pub fn from_sentinel(value: f64) -> Self {
        if value == -1.0 {
            Limit::Unbounded
        } else {
            Limit::Bounded(value)
        }
    }

    pub fn bound(&self) -> Option<f64> {
        match self {
            Limit::Unbounded => None,
            Limit::Bounded(v) => Some(*v),
        }
    }

    pub fn is_bounded(&self) -> bool {
        matches!(self, Limit::Bounded(_))
    }
}

pub type LimitArray = LabeledArray<Limit>;

impl LimitArray {
    /// Finite bounds only; unbounded entries become absent and generate no rows.
    pub fn bounded(&self) -> Param {
        self.filter_map(Limit::bound)
    }
}
