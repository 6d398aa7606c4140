//! Vintage accumulation of capacity over operating lifetimes.

use crate::schema::dims::{BUILDYEAR, YEAR};
use esm_core::{DimensionCatalogue, EsmResult, LabeledArray, Mask, Param, Summable};

/// Mask over `(entity…, YEAR, BUILDYEAR)`: true where capacity built in
/// BUILDYEAR is still operating in YEAR, i.e. `0 <= YEAR - BUILDYEAR < life`.
pub fn vintage_window(life: &Param, catalogue: &DimensionCatalogue) -> EsmResult<Mask> {
    let years = Param::coordinate_values(catalogue.axis(YEAR)?)?;
    let built = Param::coordinate_values(catalogue.axis(BUILDYEAR)?)?;
    let age = years.sub(&built)?.named("age");
    let started = age.ge_scalar(0.0);
    let alive = life.gt(&age)?;
    Ok(started.and(&alive)?.named("vintage_window"))
}

/// Sum of `new[..., B]` over every build year B whose capacity is alive in Y.
///
/// Entities without a life value get no accumulated capacity.
pub fn vintage<T>(
    new: &LabeledArray<T>,
    life: &Param,
    catalogue: &DimensionCatalogue,
) -> EsmResult<LabeledArray<T>>
where
    T: Clone + Summable,
{
    let window = vintage_window(life, catalogue)?;
    new.rename(YEAR, BUILDYEAR)?
        .where_mask(&window)?
        .sum_over(&[BUILDYEAR])
}
