//! Emission accounting, ceilings and penalties.

mod common;

use common::{assert_close, at, emission_store, l, y, CAPITAL_COST, YEARS};
use esm_algo::schema::dims::*;
use esm_algo::{build_model, BuildOptions};
use esm_core::ParameterStore;

fn annual_limit(store: &mut ParameterStore, limit: f64) {
    store
        .insert_limit_sentinel(
            "AnnualEmissionLimit",
            &[REGION, EMISSION, YEAR],
            YEARS.map(|year| (vec![l("R1"), l("CO2"), y(year)], limit)),
        )
        .unwrap();
}

fn period_limit(store: &mut ParameterStore, limit: f64) {
    store
        .insert_limit_sentinel(
            "ModelPeriodEmissionLimit",
            &[REGION, EMISSION],
            [(vec![l("R1"), l("CO2")], limit)],
        )
        .unwrap();
}

#[test]
fn annual_ceiling_below_emissions_is_infeasible() {
    let mut store = emission_store(100.0);
    annual_limit(&mut store, 50.0);
    let mut model = build_model(&store, &BuildOptions::default()).unwrap();
    assert_eq!(model.constraints().get("E8_AnnualEmissionsLimit").unwrap().len(), 2);

    let solution = model.solve("clarabel", None).unwrap();
    assert!(!solution.status.is_optimal());
}

#[test]
fn annual_ceiling_above_emissions_is_slack() {
    let mut store = emission_store(100.0);
    annual_limit(&mut store, 150.0);
    let mut model = build_model(&store, &BuildOptions::default()).unwrap();
    let solution = model.solve("clarabel", None).unwrap();
    assert!(solution.status.is_optimal(), "{}", solution.status);

    let emissions = model.evaluate("AnnualEmissions").unwrap();
    for year in YEARS {
        let value = at(
            &emissions,
            &[(REGION, l("R1")), (EMISSION, l("CO2")), (YEAR, y(year))],
        );
        assert_close(value, 100.0, 1e-4, "AnnualEmissions");
    }
}

#[test]
fn unbounded_annual_limits_generate_no_rows() {
    let mut store = emission_store(100.0);
    annual_limit(&mut store, -1.0);
    let model = build_model(&store, &BuildOptions::default()).unwrap();
    assert!(model.constraints().get("E8_AnnualEmissionsLimit").is_none());
    assert!(model
        .diagnostics()
        .issues_by_category("family")
        .any(|i| i.message.starts_with("emissions")));
}

#[test]
fn period_ceiling_covers_the_whole_horizon() {
    let mut store = emission_store(100.0);
    period_limit(&mut store, 150.0);
    let mut model = build_model(&store, &BuildOptions::default()).unwrap();
    assert_eq!(
        model
            .constraints()
            .get("E9_ModelPeriodEmissionsLimit")
            .unwrap()
            .len(),
        1
    );
    // 100 per year over two years exceeds 150
    assert!(!model.solve("clarabel", None).unwrap().status.is_optimal());

    let mut store = emission_store(100.0);
    period_limit(&mut store, 250.0);
    let mut model = build_model(&store, &BuildOptions::default()).unwrap();
    assert!(model.solve("clarabel", None).unwrap().status.is_optimal());
    let period = model.evaluate("ModelPeriodEmissions").unwrap();
    let total = at(&period, &[(REGION, l("R1")), (EMISSION, l("CO2"))]);
    assert_close(total, 200.0, 1e-4, "ModelPeriodEmissions");
}

#[test]
fn emission_penalty_reaches_the_objective() {
    let mut store = emission_store(100.0);
    store
        .insert_param(
            "EmissionsPenalty",
            &[REGION, EMISSION, YEAR],
            YEARS.map(|year| (vec![l("R1"), l("CO2"), y(year)], 2.0)),
        )
        .unwrap();
    let mut model = build_model(&store, &BuildOptions::default()).unwrap();
    model.solve("clarabel", None).unwrap();

    // 200 per year, discounted to mid-year at the default 5%
    let penalty = 200.0 / 1.05f64.powf(0.5) + 200.0 / 1.05f64.powf(1.5);
    assert_close(
        model.objective_value().unwrap(),
        100.0 * CAPITAL_COST + penalty,
        1e-5,
        "objective",
    );
}
