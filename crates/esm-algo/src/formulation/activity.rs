//! Activity aggregates and the production, use, and demand chains.

use super::Context;
use crate::model::ExpressionStage;
use crate::schema::dims::*;
use esm_core::EsmResult;

pub(super) fn define(ctx: &Context, stage: &mut ExpressionStage) -> EsmResult<()> {
    let activity = stage.variables().expr("RateOfActivity")?;
    let year_split = ctx.param("YearSplit")?;

    let total_rate = activity.sum_over(&[MODE_OF_OPERATION])?;
    let annual = total_rate.mul(&year_split)?.sum_over(&[TIMESLICE])?;
    let by_mode = activity.mul(&year_split)?.sum_over(&[TIMESLICE])?;
    let period = annual.sum_over(&[YEAR])?;
    stage.define_lin("RateOfTotalActivity", total_rate)?;
    stage.define_lin("TotalTechnologyAnnualActivity", annual)?;
    stage.define_lin("TotalAnnualTechnologyActivityByMode", by_mode)?;
    stage.define_lin("TotalTechnologyModelPeriodActivity", period)?;

    for (flow, ratio) in [("Production", "OutputActivityRatio"), ("Use", "InputActivityRatio")] {
        let ratio = ctx.nonzero(ratio)?;
        let by_mode = activity.mul(&ratio)?;
        let by_technology = by_mode.sum_over(&[MODE_OF_OPERATION])?;
        let rate = by_technology.sum_over(&[TECHNOLOGY])?;
        let timesliced = rate.mul(&year_split)?;
        let by_technology_timesliced = by_technology.mul(&year_split)?;
        let annual = timesliced.sum_over(&[TIMESLICE])?;
        let by_technology_annual = by_technology_timesliced.sum_over(&[TIMESLICE])?;

        stage.define_lin(&format!("RateOf{}ByTechnologyByMode", flow), by_mode)?;
        stage.define_lin(&format!("RateOf{}ByTechnology", flow), by_technology)?;
        stage.define_lin(&format!("RateOf{}", flow), rate)?;
        stage.define_lin(flow, timesliced)?;
        stage.define_lin(&format!("{}ByTechnology", flow), by_technology_timesliced)?;
        stage.define_lin(&format!("{}Annual", flow), annual)?;
        stage.define_lin(&format!("{}ByTechnologyAnnual", flow), by_technology_annual)?;
    }

    let demand = ctx
        .param("SpecifiedAnnualDemand")?
        .mul(&ctx.param("SpecifiedDemandProfile")?)?;
    stage.define_param("Demand", demand)?;

    tracing::debug!(family = "activity", "expressions defined");
    Ok(())
}
