//! Inter-regional trade along declared routes.
//!
//! `Export[r, rr]` leaves `r` for `rr` and must equal `Import[rr, r]`.
//! Losses are charged to the exporter. When trade is active the energy
//! balances are rebuilt with net trade subtracted.

use super::balance::{add_balances, surplus, Surplus};
use super::{skip_family, Context};
use crate::accumulate::vintage;
use crate::finance::{annuity, discount_factor, entity_rate, salvage, salvage_discount};
use crate::model::{ConstraintStage, ExpressionStage, Sense};
use crate::schema::dims::*;
use esm_core::EsmResult;

pub(super) fn define(ctx: &Context, stage: &mut ExpressionStage) -> EsmResult<()> {
    if !ctx.has_trade() {
        return Ok(());
    }
    let routes = ctx.routes()?;
    let exports = stage
        .variables()
        .expr("Export")?
        .where_mask(&routes)?;
    let imports = stage
        .variables()
        .expr("Import")?
        .where_mask(&ctx.reverse_routes()?)?;

    let loss = ctx.param("TradeLossBetweenRegions")?.fill(0.0)?;
    let gross_up = loss.filter_map(|l| (*l != 1.0).then(|| 1.0 / (1.0 - l)));
    let trade = exports.sub_outer(&imports)?;
    let net_trade = exports
        .mul(&gross_up)?
        .sub_outer(&imports)?
        .sum_over(&[REGION_PARTNER])?;
    let net_trade_annual = net_trade.sum_over(&[TIMESLICE])?;
    let export_annual = exports.sum_over(&[TIMESLICE])?;

    let new = stage
        .variables()
        .expr("NewTradeCapacity")?
        .where_mask(&routes)?;
    let accumulated = vintage(&new, &ctx.param("OperationalLifeTrade")?, ctx.catalogue())?;
    let gross = accumulated.add_outer(&ctx.param("ResidualTradeCapacity")?)?;

    stage.define_lin("Trade", trade)?;
    stage.define_lin("NetTrade", net_trade)?;
    stage.define_lin("NetTradeAnnual", net_trade_annual)?;
    stage.define_lin("ExportAnnual", export_annual)?;
    stage.define_lin("AccumulatedNewTradeCapacity", accumulated)?;
    stage.define_lin("GrossTradeCapacity", gross)?;

    define_costs(ctx, stage)?;
    tracing::debug!(family = "trade", routes = routes.count_true(), "expressions defined");
    Ok(())
}

fn define_costs(ctx: &Context, stage: &mut ExpressionStage) -> EsmResult<()> {
    let years = ctx.years()?;
    let rate = entity_rate(
        &ctx.param("DiscountRateTrade")?,
        &ctx.param("DiscountRate")?,
        &[ctx.axis(REGION_PARTNER)?, ctx.axis(FUEL)?],
    )?;
    let life = ctx.param("OperationalLifeTrade")?;
    let (pv_annuity, recovery) = annuity(&rate, &life)?;
    let partition = salvage(&rate, &life, &ctx.param("DepreciationMethod")?, years)?;

    let new = stage
        .variables()
        .expr("NewTradeCapacity")?
        .where_mask(&ctx.routes()?)?;
    let capital_cost = ctx.param("CapitalCostTrade")?.fill(0.0)?;
    let investment = new
        .mul(&capital_cost)?
        .mul(&recovery)?
        .mul(&pv_annuity)?;
    let discounted_investment = investment.div(&discount_factor(&rate, years, 0.0)?)?;
    let salvage_value = new.mul(&capital_cost)?.mul(&partition.factor)?;
    let discounted_salvage = salvage_value.div(&salvage_discount(&rate, years)?)?;
    let total = discounted_investment.sub_outer(&discounted_salvage)?;

    stage.define_lin("CapitalInvestmentTrade", investment)?;
    stage.define_lin("DiscountedCapitalInvestmentTrade", discounted_investment)?;
    stage.define_lin("SalvageValueTrade", salvage_value)?;
    stage.define_lin("DiscountedSalvageValueTrade", discounted_salvage)?;
    stage.define_lin("TotalDiscountedCostTrade", total)?;
    Ok(())
}

pub(super) fn constrain(ctx: &Context, stage: &mut ConstraintStage) -> EsmResult<()> {
    if !ctx.has_trade() {
        skip_family(stage.diagnostics_mut(), "trade", "no TradeRoute entries");
        return Ok(());
    }
    let exports = stage.variables().expr("Export")?;
    let imports = stage.variables().expr("Import")?;

    // EBa10: what leaves r for rr arrives in rr from r
    stage.add(
        "EBa10_EnergyBalanceEachTS4_trn",
        &exports,
        Sense::Eq,
        &imports.swap_dims(REGION, REGION_PARTNER)?,
        None,
    )?;

    // TC1a/TC1b: flows within the usable share of route capacity
    let usable = ctx
        .param("TradeLossBetweenRegions")?
        .fill(0.0)?
        .map(|l| 1.0 - l)
        .mul(&ctx.param("TradeCapacityToActivityUnit")?)?
        .mul(&ctx.param("YearSplit")?)?;
    let capacity = stage.lin("GrossTradeCapacity")?.mul(&usable)?;
    stage.add(
        "TC1a_TradeConstraint_Export",
        &exports,
        Sense::Le,
        &capacity,
        None,
    )?;
    stage.add(
        "TC1b_TradeConstraint_Import",
        &imports,
        Sense::Le,
        &capacity.swap_dims(REGION, REGION_PARTNER)?,
        None,
    )?;

    let new = stage.variables().expr("NewTradeCapacity")?;
    stage.add(
        "TC4_TradeConstraint",
        &new,
        Sense::Le,
        &ctx.limit("TotalAnnualMaxTradeInvestment")?,
        None,
    )?;

    // Route limits bound each route's exports; NetTradeAnnual is already summed over partners.
    let annual = stage.lin("ExportAnnual")?.clone();
    stage.add(
        "TradeConstraint_TotalTradeAnnualActivityUpperLimit",
        &annual,
        Sense::Le,
        &ctx.limit("TotalTradeAnnualActivityUpperLimit")?,
        None,
    )?;
    stage.add(
        "TradeConstraint_TotalTradeAnnualActivityLowerLimit",
        &annual,
        Sense::Ge,
        &ctx.param("TotalTradeAnnualActivityLowerLimit")?,
        None,
    )?;

    // Annual route flow within the available share of route capacity
    let route_capacity = stage
        .lin("GrossTradeCapacity")?
        .mul(&ctx.param("TradeRoute")?)?
        .mul(&ctx.param("TradeCapacityToActivityUnit")?)?;
    for (name, factor, sense) in [
        ("TradeConstraint_AvailabilityFactor", "AvailabilityFactorTrade", Sense::Le),
        (
            "TradeConstraint_AvailabilityFactorMin",
            "TotalAnnualMinCapacityFactorTrade",
            Sense::Ge,
        ),
    ] {
        let factor = ctx.param(factor)?;
        if factor.is_empty() {
            continue;
        }
        let bound = route_capacity.mul(&factor)?;
        stage.add(name, &annual, sense, &bound, Some(&factor.present()))?;
    }

    // Balances again, now net of trade
    let base = surplus(ctx, stage)?;
    let with_trade = Surplus {
        timesliced: base.timesliced.sub_outer(stage.lin("NetTrade")?)?,
        annual: base.annual.sub_outer(stage.lin("NetTradeAnnual")?)?,
    };
    add_balances(stage, &with_trade)
}
