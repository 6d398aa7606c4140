//! Capacity accumulation and adequacy.

use super::Context;
use crate::accumulate::vintage;
use crate::model::{ConstraintStage, ExpressionStage, Sense};
use crate::schema::dims::*;
use esm_core::{EsmResult, LinArray};
use std::collections::BTreeSet;

pub(super) fn define(ctx: &Context, stage: &mut ExpressionStage) -> EsmResult<()> {
    let new = stage.variables().expr("NewCapacity")?;
    let accumulated = vintage(&new, &ctx.param("OperationalLife")?, ctx.catalogue())?;
    let gross = accumulated.add_outer(&ctx.param("ResidualCapacity")?)?;
    stage.define_lin("AccumulatedNewCapacity", accumulated)?;
    stage.define_lin("GrossCapacity", gross)?;
    Ok(())
}

pub(super) fn constrain(ctx: &Context, stage: &mut ConstraintStage) -> EsmResult<()> {
    let gross = stage.lin("GrossCapacity")?.clone();
    let factor = ctx.param("CapacityFactor")?;
    let availability = ctx.param("AvailabilityFactor")?;
    let to_activity = ctx.param("CapacityToActivityUnit")?;

    // CAa4: activity within each timeslice
    let activity = stage.lin("RateOfTotalActivity")?.clone();
    let available = gross
        .mul(&factor)?
        .mul(&availability.fill(1.0)?)?
        .mul(&to_activity)?;
    stage.add("CAa4_Constraint_Capacity", &activity, Sense::Le, &available, None)?;
    report_unbounded_activity(stage, &activity, &available)?;

    // CAa5: whole units
    if stage.variables().contains("NumberOfNewTechnologyUnits") {
        let units = stage
            .variables()
            .expr("NumberOfNewTechnologyUnits")?
            .mul(&ctx.param("CapacityOfOneTechnologyUnit")?)?;
        let new = stage.variables().expr("NewCapacity")?;
        stage.add("CAa5_TotalNewCapacity", &units, Sense::Eq, &new, None)?;
    }

    // CAb1: planned maintenance on the annual total
    let year_split = ctx.param("YearSplit")?;
    let annual = stage.lin("TotalTechnologyAnnualActivity")?.clone();
    let maintained = gross
        .mul(&factor)?
        .mul(&year_split)?
        .sum_over(&[TIMESLICE])?
        .mul(&availability)?
        .mul(&to_activity)?;
    let derated = availability.lt_scalar(1.0);
    stage.add(
        "CAb1_PlannedMaintenance",
        &annual,
        Sense::Le,
        &maintained,
        Some(&derated),
    )?;
    Ok(())
}

/// Technologies with activity but no capacity bound in some timeslice.
fn report_unbounded_activity(
    stage: &mut ConstraintStage,
    activity: &LinArray,
    available: &LinArray,
) -> EsmResult<()> {
    let Some(t) = activity.axis_index(TECHNOLOGY) else {
        return Ok(());
    };
    let unbounded = activity.outer_with(available, |a, b| (a.is_some() && b.is_none()).then_some(()))?;
    let technologies: BTreeSet<String> = unbounded
        .iter()
        .map(|(key, _)| activity.axes()[t].coord(key[t]).to_string())
        .collect();
    for technology in technologies {
        tracing::warn!(technology = %technology, "activity without capacity bound");
        stage.diagnostics_mut().add_warning_with_entity(
            "capacity",
            "activity has no capacity bound in some timeslices",
            &technology,
        );
    }
    Ok(())
}
