//! Emission accounting, penalties, and emission ceilings.

use super::{skip_family, Context};
use crate::model::{ConstraintStage, ExpressionStage, Sense};
use crate::schema::dims::*;
use esm_core::EsmResult;

pub(super) fn define(ctx: &Context, stage: &mut ExpressionStage) -> EsmResult<()> {
    let by_mode = stage
        .lin("TotalAnnualTechnologyActivityByMode")?
        .mul(&ctx.param("EmissionActivityRatio")?)?;
    let technology = by_mode.sum_over(&[MODE_OF_OPERATION])?;
    let penalty_by_emission = technology.mul(&ctx.param("EmissionsPenalty")?)?;
    let penalty = penalty_by_emission.sum_over(&[EMISSION])?;
    let annual = technology.sum_over(&[TECHNOLOGY])?;
    let period = annual
        .sum_over(&[YEAR])?
        .add_outer(&ctx.param("ModelPeriodExogenousEmission")?)?;

    stage.define_lin("AnnualTechnologyEmissionByMode", by_mode)?;
    stage.define_lin("AnnualTechnologyEmission", technology)?;
    stage.define_lin("AnnualTechnologyEmissionPenaltyByEmission", penalty_by_emission)?;
    stage.define_lin("AnnualTechnologyEmissionsPenalty", penalty)?;
    stage.define_lin("AnnualEmissions", annual)?;
    stage.define_lin("ModelPeriodEmissions", period)?;
    Ok(())
}

pub(super) fn constrain(ctx: &Context, stage: &mut ConstraintStage) -> EsmResult<()> {
    let annual_limit = ctx.limit("AnnualEmissionLimit")?;
    let period_limit = ctx.limit("ModelPeriodEmissionLimit")?;
    if annual_limit.is_empty() && period_limit.is_empty() {
        skip_family(stage.diagnostics_mut(), "emissions", "no bounded emission limits");
        return Ok(());
    }

    // E8: annual ceiling including exogenous emissions
    let annual = stage
        .lin("AnnualEmissions")?
        .add_outer(&ctx.param("AnnualExogenousEmission")?)?;
    stage.add(
        "E8_AnnualEmissionsLimit",
        &annual,
        Sense::Le,
        &annual_limit,
        None,
    )?;

    // E9: whole-horizon ceiling
    let period = stage.lin("ModelPeriodEmissions")?.clone();
    stage.add(
        "E9_ModelPeriodEmissionsLimit",
        &period,
        Sense::Le,
        &period_limit,
        None,
    )?;
    Ok(())
}
