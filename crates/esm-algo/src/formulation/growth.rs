//! Year-on-year limits on capacity additions.

use super::Context;
use crate::model::{ConstraintStage, Sense};
use crate::options::DEFAULT_GROWTH_BIG_M;
use crate::schema::dims::*;
use esm_core::EsmResult;

pub(super) fn constrain(ctx: &Context, stage: &mut ConstraintStage) -> EsmResult<()> {
    let max_rate = ctx.param("CapacityAdditionalMaxGrowthRate")?;
    let min_rate = ctx.param("CapacityAdditionalMinGrowthRate")?;
    if max_rate.is_empty() && min_rate.is_empty() {
        return Ok(());
    }

    let new = stage.variables().expr("NewCapacity")?;
    // last year's gross capacity at each year; absent in the first year
    let previous = stage.lin("GrossCapacity")?.shift(YEAR, 1)?;
    let by_max_rate = previous.mul(&max_rate)?;

    if stage.variables().contains("OR_GrowthRateFloor") {
        let floor = ctx.param("CapacityAdditionalMaxFloor")?;
        let big_m = big_m(ctx)?;
        let choice = stage.variables().expr("OR_GrowthRateFloor")?;
        tracing::debug!(big_m, "growth floor disjunction");

        // choice may be 1 only where the growth-rate bound reaches the floor
        let reach = by_max_rate.div(&floor)?;
        stage.add("OR_GrowthRateFloor_pull_down", &choice, Sense::Le, &reach, None)?;

        // choice = 0: NewCapacity <= floor
        let floor_bound = choice.scale(big_m).add(&floor)?;
        stage.add("OR_GrowthRateFloor_lte_floor", &new, Sense::Le, &floor_bound, None)?;

        // choice = 1: NewCapacity <= GrossCapacity(Y-1) * rate
        let rate_bound = choice.scale(-big_m).add_scalar(big_m).add(&by_max_rate)?;
        stage.add(
            "OR_GrowthRateFloor_lte_growthrate",
            &new,
            Sense::Le,
            &rate_bound,
            None,
        )?;
    } else if !max_rate.is_empty() {
        stage.add("GrowthRateMax", &new, Sense::Le, &by_max_rate, None)?;
    }

    if !min_rate.is_empty() {
        let by_min_rate = previous.mul(&min_rate)?;
        stage.add("GrowthRateMin", &new, Sense::Ge, &by_min_rate, None)?;
    }
    Ok(())
}

fn big_m(ctx: &Context) -> EsmResult<f64> {
    if let Some(m) = ctx.options().growth_rate_big_m {
        return Ok(m);
    }
    Ok(ctx
        .param("AccumulatedAnnualDemand")?
        .max_value()
        .filter(|d| *d > 0.0)
        .map_or(DEFAULT_GROWTH_BIG_M, |d| d * 1000.0))
}
