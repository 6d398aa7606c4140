//! Build and handoff failures.

mod common;

use common::{catalogue, l, single_technology_store, y, YEARS};
use esm_algo::schema::{self, dims::*};
use esm_algo::{
    build_model, build_scenarios, solve_scenarios, BuildOptions, SolveOptions, TerminationStatus,
};
use esm_core::{EsmError, ParameterStore};

#[test]
fn missing_required_parameter_stops_the_build() {
    let mut cat = catalogue(&["R1"]);
    schema::register_aliases(&mut cat).unwrap();
    let store = ParameterStore::new(cat);

    let err = build_model(&store, &BuildOptions::default()).unwrap_err();
    assert!(matches!(err, EsmError::MissingParameter(_)), "{err}");
}

#[test]
fn unknown_solver_leaves_no_solution() {
    let store = single_technology_store(100.0);
    let mut model = build_model(&store, &BuildOptions::default()).unwrap();

    let err = model.solve("gurobi", None).unwrap_err();
    match err {
        EsmError::UnknownSolver { label, supported } => {
            assert_eq!(label, "gurobi");
            assert!(supported.contains("clarabel"));
        }
        other => panic!("unexpected error {other}"),
    }
    assert!(model.solution().is_none());
}

#[test]
fn unit_sizes_need_an_integer_backend() {
    let mut store = single_technology_store(100.0);
    store
        .insert_param(
            "CapacityOfOneTechnologyUnit",
            &[REGION, TECHNOLOGY, YEAR],
            YEARS.map(|year| (vec![l("R1"), l("GAS"), y(year)], 30.0)),
        )
        .unwrap();
    let mut model = build_model(&store, &BuildOptions::default()).unwrap();
    assert!(model.constraints().get("CAa5_TotalNewCapacity").is_some());

    let err = model.solve("clarabel", None).unwrap_err();
    assert!(matches!(err, EsmError::Solver(_)), "{err}");
    assert!(model.solution().is_none());
}

#[test]
fn scenarios_fail_independently() {
    let store = single_technology_store(100.0);
    let builds = vec![
        BuildOptions::default().with_scenario("low"),
        BuildOptions::default().with_scenario("high"),
    ];
    let models = build_scenarios(&store, &builds);
    assert_eq!(models.len(), 2);
    assert_eq!(models[1].as_ref().unwrap().scenario(), "high");

    let jobs = vec![
        (builds[0].clone(), SolveOptions::default()),
        (builds[1].clone(), SolveOptions::default().with_solver("cplex")),
    ];
    let outcomes = solve_scenarios(&store, &jobs);
    assert!(outcomes[0].is_ok());
    assert_eq!(outcomes[0].termination, Some(TerminationStatus::Optimal));
    assert!(outcomes[0].columns > 0);

    assert!(!outcomes[1].is_ok());
    assert!(outcomes[1].error.as_deref().unwrap().contains("cplex"));
    assert!(outcomes[1].model.is_none());

    let json = serde_json::to_value(&outcomes[0]).unwrap();
    assert_eq!(json["scenario"], "low");
    assert!(json.get("model").is_none());
}
