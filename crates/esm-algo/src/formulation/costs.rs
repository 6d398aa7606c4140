//! Discounted cost accounting per technology and the regional totals that
//! feed the objective.

use super::Context;
use crate::finance::{annuity, discount_factor, entity_rate, salvage, salvage_discount};
use crate::model::ExpressionStage;
use crate::schema::dims::*;
use esm_core::EsmResult;

pub(super) fn define(ctx: &Context, stage: &mut ExpressionStage) -> EsmResult<()> {
    define_discounting(ctx, stage)?;
    define_technology_costs(ctx, stage)?;
    define_totals(stage)
}

fn define_discounting(ctx: &Context, stage: &mut ExpressionStage) -> EsmResult<()> {
    let years = ctx.years()?;
    let regional = ctx.param("DiscountRate")?;
    let rate = entity_rate(
        &ctx.param("DiscountRateIdv")?,
        &regional,
        &[ctx.axis(TECHNOLOGY)?],
    )?;
    let life = ctx.param("OperationalLife")?;
    let (pv_annuity, recovery) = annuity(&rate, &life)?;
    let partition = salvage(&rate, &life, &ctx.param("DepreciationMethod")?, years)?;

    stage.define_param("DiscountFactor", discount_factor(&regional, years, 0.0)?)?;
    stage.define_param("DiscountFactorMid", discount_factor(&regional, years, 0.5)?)?;
    stage.define_param("DiscountFactorSalvage", salvage_discount(&rate, years)?)?;
    stage.define_param("PvAnnuity", pv_annuity)?;
    stage.define_param("CapitalRecoveryFactor", recovery)?;
    stage.define_mask("SalvageSinkingFund", partition.sinking_fund)?;
    stage.define_mask("SalvageStraightLine", partition.straight_line)?;
    stage.define_mask("SalvageNone", partition.none)?;
    stage.define_param("SalvageFactor", partition.factor)?;
    Ok(())
}

fn define_technology_costs(ctx: &Context, stage: &mut ExpressionStage) -> EsmResult<()> {
    let new = stage.variables().expr("NewCapacity")?;
    let capital_cost = ctx.param("CapitalCost")?.fill(0.0)?;

    let investment = new
        .mul(&capital_cost)?
        .mul(stage.param("CapitalRecoveryFactor")?)?
        .mul(stage.param("PvAnnuity")?)?;
    let discounted_investment = investment.div(stage.param("DiscountFactor")?)?;

    let fixed = stage
        .lin("GrossCapacity")?
        .mul(&ctx.param("FixedCost")?)?;
    let variable = stage
        .lin("TotalAnnualTechnologyActivityByMode")?
        .mul(&ctx.param("VariableCost")?)?
        .sum_over(&[MODE_OF_OPERATION])?;
    let operating = fixed.add_outer(&variable)?;
    let discounted_operating = operating.div(stage.param("DiscountFactorMid")?)?;

    let salvage_value = new
        .mul(&capital_cost)?
        .mul(stage.param("SalvageFactor")?)?;
    let discounted_salvage = salvage_value.div(stage.param("DiscountFactorSalvage")?)?;

    let discounted_penalty = stage
        .lin("AnnualTechnologyEmissionsPenalty")?
        .div(stage.param("DiscountFactorMid")?)?;

    let total = discounted_investment
        .add_outer(&discounted_operating)?
        .add_outer(&discounted_penalty)?
        .sub_outer(&discounted_salvage)?;

    stage.define_lin("CapitalInvestment", investment)?;
    stage.define_lin("DiscountedCapitalInvestment", discounted_investment)?;
    stage.define_lin("AnnualFixedOperatingCost", fixed)?;
    stage.define_lin("AnnualVariableOperatingCost", variable)?;
    stage.define_lin("OperatingCost", operating)?;
    stage.define_lin("DiscountedOperatingCost", discounted_operating)?;
    stage.define_lin("SalvageValue", salvage_value)?;
    stage.define_lin("DiscountedSalvageValue", discounted_salvage)?;
    stage.define_lin("DiscountedTechnologyEmissionsPenalty", discounted_penalty)?;
    stage.define_lin("TotalDiscountedCostByTechnology", total)?;
    Ok(())
}

/// Regional totals. Storage and trade costs join when those families ran.
fn define_totals(stage: &mut ExpressionStage) -> EsmResult<()> {
    let mut total = stage
        .lin("TotalDiscountedCostByTechnology")?
        .sum_over(&[TECHNOLOGY])?;
    if stage.cache().contains("TotalDiscountedStorageCost") {
        let storage = stage
            .lin("TotalDiscountedStorageCost")?
            .sum_over(&[STORAGE])?;
        total = total.add_outer(&storage)?;
    }
    if stage.cache().contains("TotalDiscountedCostTrade") {
        let trade = stage
            .lin("TotalDiscountedCostTrade")?
            .sum_over(&[REGION_PARTNER, FUEL])?;
        total = total.add_outer(&trade)?;
    }
    let by_region = total.sum_over(&[YEAR])?;
    stage.define_lin("TotalDiscountedCost", total)?;
    stage.define_lin("ModelPeriodCostByRegion", by_region)?;
    tracing::debug!(family = "costs", "expressions defined");
    Ok(())
}
