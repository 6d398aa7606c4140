//! Storage: charge and discharge, the nested level recursion over
//! year, season, day type and daily time bracket, and storage costs.
//!
//! Levels are variables at period boundaries only. Within a day type the
//! level at a bracket is recovered from the boundary level plus a running
//! sum of net charge, checked forward from the start and backward from the
//! finish.

use super::{skip_family, Context};
use crate::accumulate::vintage;
use crate::finance::{discount_factor, entity_rate, salvage, salvage_discount};
use crate::model::{ConstraintStage, ExpressionStage, Sense};
use crate::schema::dims::*;
use esm_core::{Direction, EsmResult, LinArray, LinExpr, Mask, Param};

fn positive(param: Param) -> Param {
    param.filter_map(|v| (*v > 0.0).then_some(*v))
}

fn zero() -> LinExpr {
    LinExpr::constant(0.0)
}

pub(super) fn define(ctx: &Context, stage: &mut ExpressionStage) -> EsmResult<()> {
    if !ctx.has_storage() {
        return Ok(());
    }
    let years = ctx.years()?;
    let activity = stage.variables().expr("RateOfActivity")?;
    let conversion = positive(ctx.param("Conversionls")?)
        .mul(&positive(ctx.param("Conversionld")?))?
        .mul(&positive(ctx.param("Conversionlh")?))?;

    let charge = storage_rate(ctx, &activity, &conversion, "TechnologyToStorage")?;
    let discharge = storage_rate(ctx, &activity, &conversion, "TechnologyFromStorage")?;

    let net = charge.sub(&discharge)?;
    let within_year = net
        .mul(&ctx.param("YearSplit")?.mul(&conversion)?)?
        .sum_over(&[TIMESLICE])?
        .fill(zero())?;
    let within_day = net.mul(&ctx.param("DaySplit")?)?.fill(zero())?;

    let year_start = stage.variables().expr("StorageLevelYearStart")?;
    let annual_net = within_year.sum_over(&[SEASON, DAYTYPE, DAILYTIMEBRACKET])?;
    let year_finish = year_start.shift(YEAR, -1)?.or_else(
        &year_start
            .add(&annual_net)?
            .where_mask(&Mask::last_of(years)?)?,
    )?;

    let new = stage.variables().expr("NewStorageCapacity")?;
    let accumulated = vintage(&new, &ctx.param("OperationalLifeStorage")?, ctx.catalogue())?;
    let gross = accumulated.add_outer(&ctx.param("ResidualStorageCapacity")?)?;
    let lower = gross.mul(&ctx.param("MinStorageCharge")?)?;

    stage.define_lin("RateOfStorageCharge", charge)?;
    stage.define_lin("RateOfStorageDischarge", discharge)?;
    stage.define_lin("NetChargeWithinYear", within_year)?;
    stage.define_lin("NetChargeWithinDay", within_day)?;
    stage.define_lin("StorageLevelYearFinish", year_finish)?;
    stage.define_lin("AccumulatedNewStorageCapacity", accumulated)?;
    stage.define_lin("GrossStorageCapacity", gross.clone())?;
    stage.define_lin("StorageUpperLimit", gross)?;
    stage.define_lin("StorageLowerLimit", lower)?;

    define_costs(ctx, stage)?;
    tracing::debug!(family = "storage", "expressions defined");
    Ok(())
}

/// Activity routed into or out of storage, per storage and bracket.
fn storage_rate(
    ctx: &Context,
    activity: &LinArray,
    conversion: &Param,
    ratio: &str,
) -> EsmResult<LinArray> {
    activity
        .mul(&positive(ctx.param(ratio)?))?
        .mul(conversion)?
        .sum_over(&[TECHNOLOGY, MODE_OF_OPERATION, TIMESLICE])?
        .fill(zero())
}

fn define_costs(ctx: &Context, stage: &mut ExpressionStage) -> EsmResult<()> {
    let years = ctx.years()?;
    let rate = entity_rate(
        &ctx.param("DiscountRateStorage")?,
        &ctx.param("DiscountRate")?,
        &[ctx.axis(STORAGE)?],
    )?;
    let life = ctx.param("OperationalLifeStorage")?;
    let partition = salvage(&rate, &life, &ctx.param("DepreciationMethod")?, years)?;
    let factor = discount_factor(&rate, years, 0.0)?;

    let investment = stage
        .variables()
        .expr("NewStorageCapacity")?
        .mul(&ctx.param("CapitalCostStorage")?.fill(0.0)?)?;
    let discounted_investment = investment.div(&factor)?;
    let salvage_value = investment.mul(&partition.factor)?;
    let discounted_salvage = salvage_value.div(&salvage_discount(&rate, years)?)?;
    let total = discounted_investment.sub_outer(&discounted_salvage)?;

    stage.define_param("DiscountFactorStorage", factor)?;
    stage.define_param("SalvageFactorStorage", partition.factor)?;
    stage.define_lin("CapitalInvestmentStorage", investment)?;
    stage.define_lin("DiscountedCapitalInvestmentStorage", discounted_investment)?;
    stage.define_lin("SalvageValueStorage", salvage_value)?;
    stage.define_lin("DiscountedSalvageValueStorage", discounted_salvage)?;
    stage.define_lin("TotalDiscountedStorageCost", total)?;
    Ok(())
}

pub(super) fn constrain(ctx: &Context, stage: &mut ConstraintStage) -> EsmResult<()> {
    if !ctx.has_storage() {
        skip_family(stage.diagnostics_mut(), "storage", "no STORAGE coordinates");
        return Ok(());
    }
    let years = ctx.years()?;
    let seasons = ctx.axis(SEASON)?;
    let day_types = ctx.axis(DAYTYPE)?;
    let vars = stage.variables();
    let year_start = vars.expr("StorageLevelYearStart")?;
    let season_start = vars.expr("StorageLevelSeasonStart")?;
    let day_start = vars.expr("StorageLevelDayTypeStart")?;
    let day_finish = vars.expr("StorageLevelDayTypeFinish")?;
    let within_year = stage.lin("NetChargeWithinYear")?.clone();
    let within_day = stage.lin("NetChargeWithinDay")?.clone();
    let year_finish = stage.lin("StorageLevelYearFinish")?.clone();
    let day_net = within_day
        .sum_over(&[DAILYTIMEBRACKET])?
        .mul(&ctx.param("DaysInDayType")?)?;

    // S5/S6: first year from the initial level, later years carry over
    let initial = ctx
        .param("StorageLevelStart")?
        .to_lin()
        .expand(years)?
        .where_mask(&Mask::first_of(years)?)?;
    let carried = year_start
        .add(&within_year.sum_over(&[SEASON, DAYTYPE, DAILYTIMEBRACKET])?)?
        .shift(YEAR, 1)?;
    let rhs = carried.or_else(&initial)?;
    stage.add("S5_and_S6_StorageLevelYearStart", &year_start, Sense::Eq, &rhs, None)?;

    // S9/S10: seasons start from the year, then chain
    let from_year = year_start
        .expand(seasons)?
        .where_mask(&Mask::first_of(seasons)?)?;
    let chained = season_start
        .add(&within_year.sum_over(&[DAYTYPE, DAILYTIMEBRACKET])?)?
        .shift(SEASON, 1)?;
    let rhs = chained.or_else(&from_year)?;
    stage.add("S9_and_S10_StorageLevelSeasonStart", &season_start, Sense::Eq, &rhs, None)?;

    // S11/S12: day types start from the season, then chain over real days
    let from_season = season_start
        .expand(day_types)?
        .where_mask(&Mask::first_of(day_types)?)?;
    let chained = day_start.add(&day_net)?.shift(DAYTYPE, 1)?;
    let rhs = chained.or_else(&from_season)?;
    stage.add("S11_and_S12_StorageLevelDayTypeStart", &day_start, Sense::Eq, &rhs, None)?;

    // S13-S15: finishes run backward from the next boundary
    let last_season = Mask::last_of(seasons)?;
    let last_day_type = Mask::last_of(day_types)?;
    let at_year_end = year_finish
        .expand(seasons)?
        .expand(day_types)?
        .where_mask(&last_season.and(&last_day_type)?)?;
    let at_season_end = season_start
        .shift(SEASON, -1)?
        .expand(day_types)?
        .where_mask(&last_day_type)?;
    let within = day_finish.sub(&day_net)?.shift(DAYTYPE, -1)?;
    let rhs = within.or_else(&at_season_end)?.or_else(&at_year_end)?;
    stage.add(
        "S13_and_S14_and_S15_StorageLevelDayTypeFinish",
        &day_finish,
        Sense::Eq,
        &rhs,
        None,
    )?;

    // SC1-SC4: bracket levels within the first and last instance of each day type
    let before = within_day.running_sum(DAILYTIMEBRACKET, Direction::Forward)?;
    let after = within_day.running_sum(DAILYTIMEBRACKET, Direction::Backward)?;
    let lower = stage.lin("StorageLowerLimit")?.clone();
    let upper = stage.lin("StorageUpperLimit")?.clone();
    let levels = [
        ("SC1", day_start.add(&before)?),
        ("SC2", day_start.sub(&after.shift(DAYTYPE, 1)?)?),
        ("SC3", day_finish.sub(&after)?),
        ("SC4", day_finish.shift(DAYTYPE, 1)?.add(&before)?),
    ];
    for (prefix, level) in levels {
        stage.add(&format!("{}_LowerLimit", prefix), &level, Sense::Ge, &lower, None)?;
        stage.add(&format!("{}_UpperLimit", prefix), &level, Sense::Le, &upper, None)?;
    }

    // SC5/SC6: charge and discharge rates
    for (name, flow, limit) in [
        ("SC5_MaxChargeConstraint", "RateOfStorageCharge", "StorageMaxChargeRate"),
        ("SC6_MaxDischargeConstraint", "RateOfStorageDischarge", "StorageMaxDischargeRate"),
    ] {
        let limit = ctx.param(limit)?;
        if limit.is_empty() {
            continue;
        }
        let flow = stage.lin(flow)?.clone();
        stage.add(name, &flow, Sense::Le, &limit, None)?;
    }
    Ok(())
}
