//! Elementwise arithmetic, comparisons, and mask algebra.

use super::{LabeledArray, LinArray, Mask, Param};
use crate::coord::Axis;
use crate::error::EsmResult;
use crate::linexpr::{LinExpr, VarId};

pub trait Zero {
    fn zero() -> Self;
}

impl Zero for f64 {
    fn zero() -> Self {
        0.0
    }
}

impl Zero for LinExpr {
    fn zero() -> Self {
        LinExpr::constant(0.0)
    }
}

/// Addition and subtraction between element kinds.
pub trait AddElem<Rhs = Self> {
    type Output;
    fn add_elem(&self, rhs: &Rhs) -> Self::Output;
    fn sub_elem(&self, rhs: &Rhs) -> Self::Output;
}

impl AddElem for f64 {
    type Output = f64;
    fn add_elem(&self, rhs: &f64) -> f64 {
        self + rhs
    }
    fn sub_elem(&self, rhs: &f64) -> f64 {
        self - rhs
    }
}

impl AddElem for LinExpr {
    type Output = LinExpr;
    fn add_elem(&self, rhs: &LinExpr) -> LinExpr {
        self.plus(rhs)
    }
    fn sub_elem(&self, rhs: &LinExpr) -> LinExpr {
        self.minus(rhs)
    }
}

impl AddElem<f64> for LinExpr {
    type Output = LinExpr;
    fn add_elem(&self, rhs: &f64) -> LinExpr {
        self.plus_constant(*rhs)
    }
    fn sub_elem(&self, rhs: &f64) -> LinExpr {
        self.plus_constant(-rhs)
    }
}

impl AddElem<LinExpr> for f64 {
    type Output = LinExpr;
    fn add_elem(&self, rhs: &LinExpr) -> LinExpr {
        rhs.plus_constant(*self)
    }
    fn sub_elem(&self, rhs: &LinExpr) -> LinExpr {
        rhs.scaled(-1.0).plus_constant(*self)
    }
}

/// Multiplication. Only combinations that stay linear are implemented.
pub trait MulElem<Rhs = Self> {
    type Output;
    fn mul_elem(&self, rhs: &Rhs) -> Self::Output;
}

impl MulElem for f64 {
    type Output = f64;
    fn mul_elem(&self, rhs: &f64) -> f64 {
        self * rhs
    }
}

impl MulElem<f64> for LinExpr {
    type Output = LinExpr;
    fn mul_elem(&self, rhs: &f64) -> LinExpr {
        self.scaled(*rhs)
    }
}

impl MulElem<LinExpr> for f64 {
    type Output = LinExpr;
    fn mul_elem(&self, rhs: &LinExpr) -> LinExpr {
        rhs.scaled(*self)
    }
}

/// Division. A zero denominator yields absence.
pub trait DivElem<Rhs = Self> {
    type Output;
    fn div_elem(&self, rhs: &Rhs) -> Option<Self::Output>;
}

impl DivElem for f64 {
    type Output = f64;
    fn div_elem(&self, rhs: &f64) -> Option<f64> {
        (*rhs != 0.0).then(|| self / rhs)
    }
}

impl DivElem<f64> for LinExpr {
    type Output = LinExpr;
    fn div_elem(&self, rhs: &f64) -> Option<LinExpr> {
        (*rhs != 0.0).then(|| self.scaled(1.0 / rhs))
    }
}

/// Values that can be folded by a reduction.
pub trait Summable: Sized {
    type Acc: Default + Clone;
    fn accumulate(acc: &mut Self::Acc, value: &Self);
    fn finish(acc: Self::Acc) -> Self;
}

impl Summable for f64 {
    type Acc = f64;
    fn accumulate(acc: &mut f64, value: &f64) {
        *acc += value;
    }
    fn finish(acc: f64) -> f64 {
        acc
    }
}

impl Summable for LinExpr {
    type Acc = (Vec<(VarId, f64)>, f64);
    fn accumulate(acc: &mut Self::Acc, value: &LinExpr) {
        acc.0.extend_from_slice(value.terms());
        acc.1 += value.constant_term();
    }
    fn finish(acc: Self::Acc) -> LinExpr {
        LinExpr::from_parts(acc.0, acc.1)
    }
}

#[allow(clippy::should_implement_trait)]
impl<T> LabeledArray<T> {
    /// Inner sum; absent if either side is absent.
    pub fn add<U>(&self, rhs: &LabeledArray<U>) -> EsmResult<LabeledArray<T::Output>>
    where
        T: AddElem<U>,
    {
        self.zip_with(rhs, |a, b| Some(a.add_elem(b)))
    }

    pub fn sub<U>(&self, rhs: &LabeledArray<U>) -> EsmResult<LabeledArray<T::Output>>
    where
        T: AddElem<U>,
    {
        self.zip_with(rhs, |a, b| Some(a.sub_elem(b)))
    }

    pub fn mul<U>(&self, rhs: &LabeledArray<U>) -> EsmResult<LabeledArray<T::Output>>
    where
        T: MulElem<U>,
    {
        self.zip_with(rhs, |a, b| Some(a.mul_elem(b)))
    }

    pub fn div<U>(&self, rhs: &LabeledArray<U>) -> EsmResult<LabeledArray<T::Output>>
    where
        T: DivElem<U>,
    {
        self.zip_with(rhs, |a, b| a.div_elem(b))
    }

    /// Sum over the union of present tuples; a one-sided tuple adds zero.
    pub fn add_outer<U>(&self, rhs: &LabeledArray<U>) -> EsmResult<LabeledArray<T::Output>>
    where
        T: AddElem<U> + Zero,
        U: Zero,
    {
        self.outer_with(rhs, |a, b| match (a, b) {
            (Some(a), Some(b)) => Some(a.add_elem(b)),
            (Some(a), None) => Some(a.add_elem(&U::zero())),
            (None, Some(b)) => Some(T::zero().add_elem(b)),
            (None, None) => None,
        })
    }

    pub fn sub_outer<U>(&self, rhs: &LabeledArray<U>) -> EsmResult<LabeledArray<T::Output>>
    where
        T: AddElem<U> + Zero,
        U: Zero,
    {
        self.outer_with(rhs, |a, b| match (a, b) {
            (Some(a), Some(b)) => Some(a.sub_elem(b)),
            (Some(a), None) => Some(a.sub_elem(&U::zero())),
            (None, Some(b)) => Some(T::zero().sub_elem(b)),
            (None, None) => None,
        })
    }

    pub fn add_scalar(&self, c: f64) -> LabeledArray<T::Output>
    where
        T: AddElem<f64>,
    {
        self.map(|v| v.add_elem(&c))
    }

    pub fn scale(&self, k: f64) -> LabeledArray<T::Output>
    where
        T: MulElem<f64>,
    {
        self.map(|v| v.mul_elem(&k))
    }
}

impl Param {
    /// Elementwise `self ^ exponent`.
    pub fn powf(&self, exponent: &Param) -> EsmResult<Param> {
        self.zip_with(exponent, |b, e| Some(b.powf(*e)))
    }

    pub fn gt_scalar(&self, v: f64) -> Mask {
        self.map(|x| *x > v)
    }

    pub fn ge_scalar(&self, v: f64) -> Mask {
        self.map(|x| *x >= v)
    }

    pub fn lt_scalar(&self, v: f64) -> Mask {
        self.map(|x| *x < v)
    }

    pub fn le_scalar(&self, v: f64) -> Mask {
        self.map(|x| *x <= v)
    }

    pub fn eq_scalar(&self, v: f64) -> Mask {
        self.map(|x| *x == v)
    }

    pub fn gt(&self, rhs: &Param) -> EsmResult<Mask> {
        self.zip_with(rhs, |a, b| Some(a > b))
    }

    pub fn le(&self, rhs: &Param) -> EsmResult<Mask> {
        self.zip_with(rhs, |a, b| Some(a <= b))
    }

    /// Constant linear expressions with the same domain.
    pub fn to_lin(&self) -> LinArray {
        self.map(|v| LinExpr::constant(*v))
    }

    pub fn max_value(&self) -> Option<f64> {
        self.values().copied().reduce(f64::max)
    }

    /// Numeric coordinates of `axis` as a one-dimensional parameter.
    pub fn coordinate_values(axis: &Axis) -> EsmResult<Param> {
        let mut out = Param::empty(axis.name(), vec![axis.clone()])?;
        for (pos, value) in axis.numeric_values()?.into_iter().enumerate() {
            out.insert_at(vec![pos as u32], value);
        }
        Ok(out)
    }
}

#[allow(clippy::should_implement_trait)]
impl Mask {
    pub fn and(&self, rhs: &Mask) -> EsmResult<Mask> {
        self.zip_with(rhs, |a, b| Some(*a && *b))
    }

    pub fn or(&self, rhs: &Mask) -> EsmResult<Mask> {
        self.zip_with(rhs, |a, b| Some(*a || *b))
    }

    pub fn not(&self) -> Mask {
        self.map(|v| !v)
    }

    pub fn any(&self) -> bool {
        self.values().any(|v| *v)
    }

    pub fn count_true(&self) -> usize {
        self.values().filter(|v| **v).count()
    }

    /// True at the first coordinate of `axis`, false elsewhere.
    pub fn first_of(axis: &Axis) -> EsmResult<Mask> {
        Self::position_mask(axis, 0)
    }

    /// True at the last coordinate of `axis`, false elsewhere.
    pub fn last_of(axis: &Axis) -> EsmResult<Mask> {
        Self::position_mask(axis, axis.len().saturating_sub(1))
    }

    fn position_mask(axis: &Axis, at: usize) -> EsmResult<Mask> {
        let mut out = Mask::empty(axis.name(), vec![axis.clone()])?;
        for pos in 0..axis.len() {
            out.insert_at(vec![pos as u32], pos == at);
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_support::*;
    use super::*;
    use crate::coord::Coord;
    use crate::error::EsmError;
    use crate::linexpr::VarId;

    #[test]
    fn test_absence_propagates_through_inner_ops() {
        let r = axis("REGION", &["R1", "R2"]);
        let a = param("a", vec![r.clone()], vec![(vec!["R1".into()], 1.0), (vec!["R2".into()], 2.0)]);
        let b = param("b", vec![r], vec![(vec!["R1".into()], 3.0)]);
        let sum = a.add(&b).unwrap();
        assert_eq!(sum.len(), 1);
        assert_eq!(sum.get(&["R1".into()]), Some(&4.0));
        assert!(sum.get(&["R2".into()]).is_none());
    }

    #[test]
    fn test_division_by_zero_is_absent() {
        let r = axis("REGION", &["R1", "R2"]);
        let a = param("a", vec![r.clone()], vec![(vec!["R1".into()], 1.0), (vec!["R2".into()], 2.0)]);
        let b = param("b", vec![r], vec![(vec!["R1".into()], 0.0), (vec!["R2".into()], 4.0)]);
        let q = a.div(&b).unwrap();
        assert!(q.get(&["R1".into()]).is_none());
        assert_eq!(q.get(&["R2".into()]), Some(&0.5));
    }

    #[test]
    fn test_outer_add_treats_one_sided_as_zero() {
        let r = axis("REGION", &["R1", "R2"]);
        let a = param("a", vec![r.clone()], vec![(vec!["R1".into()], 1.0)]);
        let b = param("b", vec![r], vec![(vec!["R2".into()], 2.0)]);
        let diff = a.sub_outer(&b).unwrap();
        assert_eq!(diff.get(&["R1".into()]), Some(&1.0));
        assert_eq!(diff.get(&["R2".into()]), Some(&-2.0));
    }

    #[test]
    fn test_linear_times_parameter() {
        let r = axis("REGION", &["R1"]);
        let x = LinArray::from_entries("x", vec![r.clone()], vec![(vec!["R1".into()], LinExpr::var(VarId(4)))])
            .unwrap();
        let k = param("k", vec![r], vec![(vec!["R1".into()], 2.5)]);
        let y = x.mul(&k).unwrap().add_scalar(1.0);
        let e = y.get(&["R1".into()]).unwrap();
        assert_eq!(e.coefficient(VarId(4)), 2.5);
        assert_eq!(e.constant_term(), 1.0);
    }

    #[test]
    fn test_mask_algebra_keeps_absence() {
        let r = axis("REGION", &["R1", "R2"]);
        let a = param("a", vec![r.clone()], vec![(vec!["R1".into()], 1.0), (vec!["R2".into()], 0.0)]);
        let b = param("b", vec![r], vec![(vec!["R1".into()], 1.0)]);
        let m = a.gt_scalar(0.5).and(&b.eq_scalar(1.0)).unwrap();
        assert_eq!(m.len(), 1);
        assert!(m.any());
        assert_eq!(a.gt_scalar(0.5).not().count_true(), 1);
    }

    #[test]
    fn test_first_and_last_masks() {
        let y = years("YEAR", &[2020, 2021, 2022]);
        let first = Mask::first_of(&y).unwrap();
        let last = Mask::last_of(&y).unwrap();
        assert_eq!(first.get(&[Coord::Int(2020)]), Some(&true));
        assert_eq!(first.get(&[Coord::Int(2022)]), Some(&false));
        assert_eq!(last.get(&[Coord::Int(2022)]), Some(&true));
    }

    #[test]
    fn test_coordinate_values_requires_integers() {
        let y = years("YEAR", &[2020, 2025]);
        let v = Param::coordinate_values(&y).unwrap();
        assert_eq!(v.get(&[Coord::Int(2025)]), Some(&2025.0));
        let r = axis("REGION", &["R1"]);
        assert!(matches!(
            Param::coordinate_values(&r),
            Err(EsmError::InvalidValue { .. })
        ));
    }
}
