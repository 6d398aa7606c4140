//! Decision variables of the energy model.

use super::Context;
use crate::model::{VariableRegistry, VariableSpec};
use crate::schema::dims::*;
use esm_core::{EsmResult, Mask};

pub(super) fn declare(ctx: &Context, registry: &mut VariableRegistry) -> EsmResult<()> {
    registry.declare(
        VariableSpec::new(
            "RateOfActivity",
            &[REGION, TIMESLICE, TECHNOLOGY, MODE_OF_OPERATION, YEAR],
        )
        .lower(0.0),
    )?;
    registry.declare(VariableSpec::new("NewCapacity", &[REGION, TECHNOLOGY, YEAR]).lower(0.0))?;

    let unit_size = ctx.nonzero("CapacityOfOneTechnologyUnit")?;
    if !unit_size.is_empty() {
        registry.declare(
            VariableSpec::new("NumberOfNewTechnologyUnits", &[REGION, TECHNOLOGY, YEAR])
                .lower(0.0)
                .integer()
                .masked(unit_size.present()),
        )?;
    }

    let floor = ctx.param("CapacityAdditionalMaxFloor")?;
    let max_rate = ctx.param("CapacityAdditionalMaxGrowthRate")?;
    if !floor.is_empty() && !max_rate.is_empty() {
        let after_first_year = Mask::first_of(ctx.years()?)?.not();
        let mask = floor
            .present()
            .and(&max_rate.present())?
            .and(&after_first_year)?;
        if mask.any() {
            registry.declare(
                VariableSpec::new("OR_GrowthRateFloor", &[REGION, TECHNOLOGY, YEAR])
                    .binary()
                    .masked(mask),
            )?;
        }
    }

    if ctx.has_storage() {
        declare_storage(registry)?;
    }
    if ctx.has_trade() {
        let routes = ctx.routes()?;
        let reverse = ctx.reverse_routes()?;
        registry.declare(
            VariableSpec::new("Export", &[REGION, REGION_PARTNER, TIMESLICE, FUEL, YEAR])
                .lower(0.0)
                .masked(routes.clone()),
        )?;
        registry.declare(
            VariableSpec::new("Import", &[REGION, REGION_PARTNER, TIMESLICE, FUEL, YEAR])
                .lower(0.0)
                .masked(reverse),
        )?;
        registry.declare(
            VariableSpec::new("NewTradeCapacity", &[REGION, REGION_PARTNER, FUEL, YEAR])
                .lower(0.0)
                .masked(routes),
        )?;
    }
    Ok(())
}

fn declare_storage(registry: &mut VariableRegistry) -> EsmResult<()> {
    let specs = [
        VariableSpec::new("NewStorageCapacity", &[REGION, STORAGE, YEAR]),
        VariableSpec::new("StorageLevelYearStart", &[REGION, STORAGE, YEAR]),
        VariableSpec::new("StorageLevelSeasonStart", &[REGION, STORAGE, SEASON, YEAR]),
        VariableSpec::new(
            "StorageLevelDayTypeStart",
            &[REGION, STORAGE, SEASON, DAYTYPE, YEAR],
        ),
        VariableSpec::new(
            "StorageLevelDayTypeFinish",
            &[REGION, STORAGE, SEASON, DAYTYPE, YEAR],
        ),
    ];
    for spec in specs {
        registry.declare(spec.lower(0.0))?;
    }
    Ok(())
}
