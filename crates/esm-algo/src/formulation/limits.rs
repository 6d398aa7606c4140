//! Capacity, investment, and activity limits per technology.

use super::Context;
use crate::model::{ConstraintStage, Sense};
use esm_core::EsmResult;

/// `(constraint, expression, limit parameter)`; upper limits use bounded
/// entries, lower limits only positive ones.
const UPPER: [(&str, &str, &str); 4] = [
    (
        "NCC1_TotalAnnualMaxNewCapacityConstraint",
        "NewCapacity",
        "TotalAnnualMaxCapacityInvestment",
    ),
    (
        "TCC1_TotalAnnualMaxCapacityConstraint",
        "GrossCapacity",
        "TotalAnnualMaxCapacity",
    ),
    (
        "AAC2_TotalAnnualTechnologyActivityUpperLimit",
        "TotalTechnologyAnnualActivity",
        "TotalTechnologyAnnualActivityUpperLimit",
    ),
    (
        "TAC2_TotalModelHorizonTechnologyActivityUpperLimit",
        "TotalTechnologyModelPeriodActivity",
        "TotalTechnologyModelPeriodActivityUpperLimit",
    ),
];

const LOWER: [(&str, &str, &str); 4] = [
    (
        "NCC2_TotalAnnualMinNewCapacityConstraint",
        "NewCapacity",
        "TotalAnnualMinCapacityInvestment",
    ),
    (
        "TCC2_TotalAnnualMinCapacityConstraint",
        "GrossCapacity",
        "TotalAnnualMinCapacity",
    ),
    (
        "AAC3_TotalAnnualTechnologyActivityLowerLimit",
        "TotalTechnologyAnnualActivity",
        "TotalTechnologyAnnualActivityLowerLimit",
    ),
    (
        "TAC3_TotalModelHorizonTechnologyActivityLowerLimit",
        "TotalTechnologyModelPeriodActivity",
        "TotalTechnologyModelPeriodActivityLowerLimit",
    ),
];

pub(super) fn constrain(ctx: &Context, stage: &mut ConstraintStage) -> EsmResult<()> {
    for (name, expression, parameter) in UPPER {
        let limit = ctx.limit(parameter)?;
        if limit.is_empty() {
            continue;
        }
        let lhs = lookup(stage, expression)?;
        stage.add(name, &lhs, Sense::Le, &limit, None)?;
    }

    for (name, expression, parameter) in LOWER {
        let limit = ctx.param(parameter)?;
        let positive = limit.gt_scalar(0.0);
        if !positive.any() {
            continue;
        }
        let lhs = lookup(stage, expression)?;
        stage.add(name, &lhs, Sense::Ge, &limit, Some(&positive))?;
    }

    // ACF1: minimum annual capacity factor
    let min_factor = ctx.param("TotalAnnualMinCapacityFactor")?;
    let positive = min_factor.gt_scalar(0.0);
    if positive.any() {
        let floor = stage
            .lin("GrossCapacity")?
            .mul(&min_factor)?
            .mul(&ctx.param("AvailabilityFactor")?.fill(1.0)?)?
            .mul(&ctx.param("CapacityToActivityUnit")?)?;
        let annual = stage.lin("TotalTechnologyAnnualActivity")?.clone();
        stage.add(
            "ACF1_TotalAnnualMinCapacityFactor",
            &annual,
            Sense::Ge,
            &floor,
            Some(&positive),
        )?;
    }
    Ok(())
}

/// Variables and cached expressions share one namespace here.
fn lookup(stage: &ConstraintStage, name: &str) -> EsmResult<esm_core::LinArray> {
    if stage.variables().contains(name) {
        return stage.variables().expr(name);
    }
    Ok(stage.lin(name)?.clone())
}
