//! Energy balance per fuel, by time slice and by year.

use super::Context;
use crate::model::{ConstraintStage, Sense};
use esm_core::{EsmResult, LinArray};

pub(super) const TIMESLICE_BALANCE: &str = "EBa11_EnergyBalanceEachTS5";
pub(super) const ANNUAL_BALANCE: &str = "EBb4_EnergyBalanceEachYear4";

/// Production left after use and demand.
pub(super) struct Surplus {
    pub timesliced: LinArray,
    pub annual: LinArray,
}

pub(super) fn surplus(ctx: &Context, stage: &ConstraintStage) -> EsmResult<Surplus> {
    let timesliced = stage
        .lin("Production")?
        .sub_outer(stage.lin("Use")?)?
        .sub_outer(stage.param("Demand")?)?;
    let annual = stage
        .lin("ProductionAnnual")?
        .sub_outer(stage.lin("UseAnnual")?)?
        .sub_outer(&ctx.param("AccumulatedAnnualDemand")?)?;
    Ok(Surplus { timesliced, annual })
}

pub(super) fn add_balances(stage: &mut ConstraintStage, surplus: &Surplus) -> EsmResult<()> {
    stage.add(TIMESLICE_BALANCE, &surplus.timesliced, Sense::Ge, 0.0, None)?;
    stage.add(ANNUAL_BALANCE, &surplus.annual, Sense::Ge, 0.0, None)?;
    Ok(())
}

pub(super) fn constrain(ctx: &Context, stage: &mut ConstraintStage) -> EsmResult<()> {
    let surplus = surplus(ctx, stage)?;
    add_balances(stage, &surplus)
}
