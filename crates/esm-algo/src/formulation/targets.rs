//! Reserve margin and renewable production targets.

use super::{skip_family, Context};
use crate::model::{ConstraintStage, ExpressionStage, Sense};
use crate::schema::dims::*;
use esm_core::EsmResult;

pub(super) fn define(ctx: &Context, stage: &mut ExpressionStage) -> EsmResult<()> {
    if !ctx.param("ReserveMargin")?.is_empty() {
        let capacity = stage
            .lin("GrossCapacity")?
            .mul(&ctx.param("CapacityToActivityUnit")?)?
            .where_mask(&ctx.tag("ReserveMarginTagTechnology")?)?
            .sum_over(&[TECHNOLOGY])?;
        let demand = stage
            .lin("RateOfProduction")?
            .where_mask(&ctx.tag("ReserveMarginTagFuel")?)?
            .sum_over(&[FUEL])?;
        stage.define_lin("TotalCapacityInReserveMargin", capacity)?;
        stage.define_lin("DemandNeedingReserveMargin", demand)?;
    }

    if !ctx.param("REMinProductionTarget")?.is_empty() {
        let renewable = stage
            .lin("ProductionByTechnology")?
            .where_mask(&ctx.tag("RETagTechnology")?)?
            .sum_over(&[TIMESLICE, TECHNOLOGY, FUEL])?;
        let target_fuel = stage
            .lin("Production")?
            .where_mask(&ctx.tag("RETagFuel")?)?
            .sum_over(&[TIMESLICE, FUEL])?;
        stage.define_lin("TotalREProductionAnnual", renewable)?;
        stage.define_lin("RETotalProductionOfTargetFuelAnnual", target_fuel)?;
    }
    Ok(())
}

pub(super) fn constrain(ctx: &Context, stage: &mut ConstraintStage) -> EsmResult<()> {
    // RM3: tagged capacity covers tagged production plus the margin
    let margin = ctx.param("ReserveMargin")?;
    if margin.is_empty() {
        skip_family(stage.diagnostics_mut(), "reserve margin", "ReserveMargin not supplied");
    } else {
        let shortfall = stage
            .lin("DemandNeedingReserveMargin")?
            .mul(&margin)?
            .sub_outer(stage.lin("TotalCapacityInReserveMargin")?)?;
        let positive = margin.gt_scalar(0.0);
        stage.add(
            "RM3_ReserveMargin_Constraint",
            &shortfall,
            Sense::Le,
            0.0,
            Some(&positive),
        )?;
    }

    // RE4: renewable share of the target fuels
    let target = ctx.param("REMinProductionTarget")?;
    if target.is_empty() {
        skip_family(
            stage.diagnostics_mut(),
            "renewable target",
            "REMinProductionTarget not supplied",
        );
    } else {
        let shortfall = stage
            .lin("RETotalProductionOfTargetFuelAnnual")?
            .mul(&target)?
            .sub_outer(stage.lin("TotalREProductionAnnual")?)?;
        stage.add(
            "RE4_EnergyConstraint",
            &shortfall,
            Sense::Le,
            0.0,
            Some(&target.present()),
        )?;
    }
    Ok(())
}
