//! Fixture stores shared by the integration tests.
#![allow(dead_code)]

use esm_algo::schema::{self, dims::*};
use esm_core::{Coord, DimensionCatalogue, Param, ParameterStore};

pub const YEARS: [i64; 2] = [2020, 2021];
pub const CAPITAL_COST: f64 = 1000.0;

pub fn y(year: i64) -> Coord {
    Coord::from(year)
}

pub fn l(label: &str) -> Coord {
    Coord::from(label)
}

pub fn assert_close(actual: f64, expected: f64, tol: f64, what: &str) {
    let scale = expected.abs().max(1.0);
    assert!(
        (actual - expected).abs() <= tol * scale,
        "{what}: expected {expected}, got {actual}"
    );
}

/// Value of `array` at named coordinates, whatever its dimension order.
pub fn at(array: &Param, coords: &[(&str, Coord)]) -> f64 {
    let key: Vec<Coord> = array
        .dims()
        .iter()
        .map(|dim| {
            coords
                .iter()
                .find(|(name, _)| name == dim)
                .map(|(_, c)| c.clone())
                .unwrap_or_else(|| panic!("no coordinate for {dim}"))
        })
        .collect();
    *array
        .get(&key)
        .unwrap_or_else(|| panic!("{} has no entry at {:?}", array.label(), key))
}

/// One technology `GAS` producing `ELEC` in one time slice over two years.
pub fn catalogue(regions: &[&str]) -> DimensionCatalogue {
    catalogue_with(regions, &["GAS"])
}

pub fn catalogue_with(regions: &[&str], technologies: &[&str]) -> DimensionCatalogue {
    DimensionCatalogue::new()
        .with_dimension(REGION, regions.iter().copied())
        .unwrap()
        .with_dimension(TECHNOLOGY, technologies.iter().copied())
        .unwrap()
        .with_dimension(FUEL, ["ELEC"])
        .unwrap()
        .with_dimension(TIMESLICE, ["ALL"])
        .unwrap()
        .with_dimension(YEAR, YEARS)
        .unwrap()
        .with_dimension(MODE_OF_OPERATION, [1i64])
        .unwrap()
}

fn with_storage_dims(mut cat: DimensionCatalogue) -> DimensionCatalogue {
    cat.insert(STORAGE, ["DAM"]).unwrap();
    cat.insert(SEASON, [1i64]).unwrap();
    cat.insert(DAYTYPE, [1i64]).unwrap();
    cat.insert(DAILYTIMEBRACKET, [1i64]).unwrap();
    cat
}

fn new_store(mut cat: DimensionCatalogue) -> ParameterStore {
    schema::register_aliases(&mut cat).unwrap();
    let mut store = ParameterStore::new(cat);
    store
        .insert_param(
            "YearSplit",
            &[TIMESLICE, YEAR],
            YEARS.map(|year| (vec![l("ALL"), y(year)], 1.0)),
        )
        .unwrap();
    store
}

/// One entry per region, plant and year, keyed `[region, technology, extra.., year]`.
fn plant_entries(
    regions: &[&str],
    plants: &[(&str, f64)],
    extra: &[Coord],
    value: impl Fn(f64) -> f64,
) -> Vec<(Vec<Coord>, f64)> {
    let mut entries = Vec::new();
    for region in regions {
        for (technology, variable_cost) in plants {
            for year in YEARS {
                let mut key = vec![l(region), l(technology)];
                key.extend_from_slice(extra);
                key.push(y(year));
                entries.push((key, value(*variable_cost)));
            }
        }
    }
    entries
}

/// `(technology, variable cost)` plants in every region of `regions`:
/// output ratio 1, capital cost 1000, life 2 years.
fn add_plants(store: &mut ParameterStore, regions: &[&str], plants: &[(&str, f64)]) {
    store
        .insert_param(
            "OutputActivityRatio",
            &[REGION, TECHNOLOGY, FUEL, MODE_OF_OPERATION, YEAR],
            plant_entries(regions, plants, &[l("ELEC"), y(1)], |_| 1.0),
        )
        .unwrap();
    store
        .insert_param(
            "CapitalCost",
            &[REGION, TECHNOLOGY, YEAR],
            plant_entries(regions, plants, &[], |_| CAPITAL_COST),
        )
        .unwrap();
    if plants.iter().any(|(_, cost)| *cost != 0.0) {
        store
            .insert_param(
                "VariableCost",
                &[REGION, TECHNOLOGY, MODE_OF_OPERATION, YEAR],
                plant_entries(regions, plants, &[y(1)], |cost| cost),
            )
            .unwrap();
    }
    let mut lives = Vec::new();
    for region in regions {
        for (technology, _) in plants {
            lives.push((vec![l(region), l(technology)], 2.0));
        }
    }
    store
        .insert_param("OperationalLife", &[REGION, TECHNOLOGY], lives)
        .unwrap();
}

fn add_gas_plants(store: &mut ParameterStore, regions: &[&str], variable_cost: f64) {
    add_plants(store, regions, &[("GAS", variable_cost)]);
}

fn add_demand(store: &mut ParameterStore, demand: &[(&str, f64)]) {
    let mut entries = Vec::new();
    for (region, value) in demand {
        for year in YEARS {
            entries.push((vec![l(region), l("ELEC"), y(year)], *value));
        }
    }
    store
        .insert_param("AccumulatedAnnualDemand", &[REGION, FUEL, YEAR], entries)
        .unwrap();
}

/// Replace the demand of `R1` with one value per model year.
pub fn set_yearly_demand(store: &mut ParameterStore, per_year: [f64; 2]) {
    store
        .insert_param(
            "AccumulatedAnnualDemand",
            &[REGION, FUEL, YEAR],
            YEARS
                .iter()
                .zip(per_year)
                .map(|(year, value)| (vec![l("R1"), l("ELEC"), y(*year)], value)),
        )
        .unwrap();
}

/// One region, one gas plant, a flat annual demand.
pub fn single_technology_store(demand: f64) -> ParameterStore {
    let mut store = new_store(catalogue(&["R1"]));
    add_gas_plants(&mut store, &["R1"], 0.0);
    add_demand(&mut store, &[("R1", demand)]);
    schema::attach_defaults(&mut store).unwrap();
    store
}

/// [`single_technology_store`] with demand rising from 100 to 150.
pub fn rising_demand_store() -> ParameterStore {
    let mut store = single_technology_store(100.0);
    set_yearly_demand(&mut store, [100.0, 150.0]);
    store
}

/// `GAS` (variable cost 1) and the dearer `COAL` (variable cost 2) in `R1`.
pub fn two_technology_store(demand: f64) -> ParameterStore {
    let mut store = new_store(catalogue_with(&["R1"], &["GAS", "COAL"]));
    add_plants(&mut store, &["R1"], &[("GAS", 1.0), ("COAL", 2.0)]);
    add_demand(&mut store, &[("R1", demand)]);
    schema::attach_defaults(&mut store).unwrap();
    store
}

/// [`single_technology_store`] where each unit of gas activity emits one
/// unit of `CO2`.
pub fn emission_store(demand: f64) -> ParameterStore {
    let mut cat = catalogue(&["R1"]);
    cat.insert(EMISSION, ["CO2"]).unwrap();
    let mut store = new_store(cat);
    add_gas_plants(&mut store, &["R1"], 0.0);
    add_demand(&mut store, &[("R1", demand)]);
    store
        .insert_param(
            "EmissionActivityRatio",
            &[REGION, TECHNOLOGY, EMISSION, MODE_OF_OPERATION, YEAR],
            YEARS.map(|year| (vec![l("R1"), l("GAS"), l("CO2"), y(1), y(year)], 1.0)),
        )
        .unwrap();
    schema::attach_defaults(&mut store).unwrap();
    store
}

/// [`single_technology_store`] plus one idle reservoir starting at `start`.
pub fn storage_store(start: f64) -> ParameterStore {
    let mut store = new_store(with_storage_dims(catalogue(&["R1"])));
    add_gas_plants(&mut store, &["R1"], 0.0);
    add_demand(&mut store, &[("R1", 100.0)]);
    store
        .insert_param(
            "DaySplit",
            &[DAILYTIMEBRACKET, YEAR],
            YEARS.map(|year| (vec![y(1), y(year)], 1.0 / 365.0)),
        )
        .unwrap();
    store
        .insert_param(
            "DaysInDayType",
            &[SEASON, DAYTYPE, YEAR],
            YEARS.map(|year| (vec![y(1), y(1), y(year)], 365.0)),
        )
        .unwrap();
    for (name, dim) in [
        ("Conversionls", SEASON),
        ("Conversionld", DAYTYPE),
        ("Conversionlh", DAILYTIMEBRACKET),
    ] {
        store
            .insert_param(name, &[TIMESLICE, dim], [(vec![l("ALL"), y(1)], 1.0)])
            .unwrap();
    }
    store
        .insert_param(
            "StorageLevelStart",
            &[REGION, STORAGE],
            [(vec![l("R1"), l("DAM")], start)],
        )
        .unwrap();
    store
        .insert_param(
            "ResidualStorageCapacity",
            &[REGION, STORAGE, YEAR],
            YEARS.map(|year| (vec![l("R1"), l("DAM"), y(year)], 2.0 * start)),
        )
        .unwrap();
    schema::attach_defaults(&mut store).unwrap();
    store
}

/// Two regions; only `R1` can generate and only `R2` has demand. Trade
/// runs `R1 -> R2` only.
pub fn trade_store(demand: f64) -> ParameterStore {
    let mut store = new_store(catalogue(&["R1", "R2"]));
    add_gas_plants(&mut store, &["R1"], 1.0);
    add_demand(&mut store, &[("R2", demand)]);
    store
        .insert_param(
            "TradeRoute",
            &[REGION, REGION_PARTNER, FUEL, YEAR],
            YEARS.map(|year| (vec![l("R1"), l("R2"), l("ELEC"), y(year)], 1.0)),
        )
        .unwrap();
    store
        .insert_param(
            "CapitalCostTrade",
            &[REGION, REGION_PARTNER, FUEL, YEAR],
            YEARS.map(|year| (vec![l("R1"), l("R2"), l("ELEC"), y(year)], 10.0)),
        )
        .unwrap();
    schema::attach_defaults(&mut store).unwrap();
    store
}
