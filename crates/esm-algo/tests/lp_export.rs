//! LP-format export of a built model.

mod common;

use common::single_technology_store;
use esm_algo::{build_model, BuildOptions, SolveOptions};

#[test]
fn lp_file_has_every_section() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("model.lp");

    let store = single_technology_store(100.0);
    let model = build_model(&store, &BuildOptions::default()).unwrap();
    model.write_lp(&path).unwrap();

    let text = std::fs::read_to_string(&path).unwrap();
    let positions: Vec<usize> = ["Minimize", "Subject To", "Bounds", "End"]
        .iter()
        .map(|section| {
            text.find(section)
                .unwrap_or_else(|| panic!("{section} missing"))
        })
        .collect();
    assert!(positions.windows(2).all(|w| w[0] < w[1]));

    assert!(text.contains("NewCapacity(R1,GAS,2020)"));
    assert!(text.contains(" EBb4_EnergyBalanceEachYear4("));
    // continuous model: no integer sections
    assert!(!text.contains("General"));
    assert!(!text.contains("Binary"));
}

#[test]
fn solve_options_export_before_solving() {
    let dir = tempfile::tempdir().unwrap();
    let lp = dir.path().join("reference.lp");
    let log = dir.path().join("reference.log");

    let store = single_technology_store(100.0);
    let mut model = build_model(&store, &BuildOptions::default()).unwrap();
    let options = SolveOptions::default()
        .with_lp_path(&lp)
        .with_log_path(&log);
    let solution = model.solve_with_options(&options).unwrap();

    assert!(solution.status.is_optimal());
    assert!(lp.exists());
    assert!(std::fs::read_to_string(&log).unwrap().contains("status: optimal"));
}
