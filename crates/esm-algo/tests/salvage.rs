//! Salvage value of capacity that outlives the horizon.

mod common;

use common::{assert_close, at, l, single_technology_store, y, CAPITAL_COST};
use esm_algo::schema::dims::*;
use esm_algo::{build_model, BuildOptions, Model};
use esm_core::ParameterStore;

const BUILT: f64 = 100.0 * CAPITAL_COST;

/// Gas plants living three years over a two-year horizon.
fn long_lived_store() -> ParameterStore {
    let mut store = single_technology_store(100.0);
    store
        .insert_param(
            "OperationalLife",
            &[REGION, TECHNOLOGY],
            [(vec![l("R1"), l("GAS")], 3.0)],
        )
        .unwrap();
    store
}

fn regional(store: &mut ParameterStore, name: &str, value: f64) {
    store
        .insert_param(name, &[REGION], [(vec![l("R1")], value)])
        .unwrap();
}

fn solved(store: &ParameterStore) -> Model {
    let mut model = build_model(store, &BuildOptions::default()).unwrap();
    let solution = model.solve("clarabel", None).unwrap();
    assert!(solution.status.is_optimal(), "{}", solution.status);
    model
}

fn salvage_2020(model: &Model) -> f64 {
    let salvage = model.evaluate("SalvageValue").unwrap();
    at(
        &salvage,
        &[(REGION, l("R1")), (TECHNOLOGY, l("GAS")), (YEAR, y(2020))],
    )
}

#[test]
fn sinking_fund_salvage_reduces_the_objective() {
    let model = solved(&long_lived_store());

    let partition = model.expressions();
    assert_eq!(partition.mask("SalvageSinkingFund").unwrap().count_true(), 2);
    assert_eq!(partition.mask("SalvageStraightLine").unwrap().count_true(), 0);

    // two of three years used at 5%
    let factor = 1.0 - (1.05f64.powi(2) - 1.0) / (1.05f64.powi(3) - 1.0);
    assert_close(salvage_2020(&model), BUILT * factor, 1e-4, "SalvageValue");
    assert_close(
        model.objective_value().unwrap(),
        BUILT - BUILT * factor / 1.05f64.powi(2),
        1e-5,
        "objective",
    );
}

#[test]
fn straight_line_salvage_is_linear_in_remaining_life() {
    let mut store = long_lived_store();
    regional(&mut store, "DepreciationMethod", 2.0);
    let model = solved(&store);

    assert_eq!(
        model
            .expressions()
            .mask("SalvageStraightLine")
            .unwrap()
            .count_true(),
        2
    );
    let factor = 1.0 / 3.0;
    assert_close(salvage_2020(&model), BUILT * factor, 1e-4, "SalvageValue");
    assert_close(
        model.objective_value().unwrap(),
        BUILT - BUILT * factor / 1.05f64.powi(2),
        1e-5,
        "objective",
    );
}

#[test]
fn zero_discount_rate_falls_back_to_straight_line() {
    let mut store = long_lived_store();
    regional(&mut store, "DiscountRate", 0.0);
    let model = solved(&store);

    let expressions = model.expressions();
    assert_eq!(expressions.mask("SalvageSinkingFund").unwrap().count_true(), 0);
    assert_eq!(expressions.mask("SalvageStraightLine").unwrap().count_true(), 2);
    // nothing is discounted: the capital cost less a third of it
    assert_close(
        model.objective_value().unwrap(),
        BUILT - BUILT / 3.0,
        1e-5,
        "objective",
    );
}
