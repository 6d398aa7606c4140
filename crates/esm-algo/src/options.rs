//! Build and solve configuration.

use esm_core::EsmResult;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Fallback big-M for the growth-floor disjunction when no demand is known.
pub const DEFAULT_GROWTH_BIG_M: f64 = 1e6;

/// Options for one model build.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BuildOptions {
    /// Big-M for `OR_GrowthRateFloor`. `None` derives it from demand.
    pub growth_rate_big_m: Option<f64>,
    /// Drop rows without variables whose constants already satisfy them.
    pub drop_trivial_rows: bool,
    /// Scenario label carried into logs and the solve log.
    pub scenario: String,
}

impl Default for BuildOptions {
    fn default() -> Self {
        Self {
            growth_rate_big_m: None,
            drop_trivial_rows: true,
            scenario: "base".to_string(),
        }
    }
}

impl BuildOptions {
    pub fn with_scenario(mut self, scenario: impl Into<String>) -> Self {
        self.scenario = scenario.into();
        self
    }

    pub fn with_growth_rate_big_m(mut self, big_m: f64) -> Self {
        self.growth_rate_big_m = Some(big_m);
        self
    }

    pub fn with_drop_trivial_rows(mut self, drop: bool) -> Self {
        self.drop_trivial_rows = drop;
        self
    }

    pub fn from_json_str(json: &str) -> EsmResult<Self> {
        Ok(serde_json::from_str(json)?)
    }
}

/// Options for handing a built model to a solver.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SolveOptions {
    /// Backend name, parsed by [`crate::solve::LpSolverKind`].
    pub solver: String,
    /// Plain-text solve log.
    pub log_path: Option<PathBuf>,
    /// Export the problem in LP format before solving.
    pub lp_path: Option<PathBuf>,
}

impl Default for SolveOptions {
    fn default() -> Self {
        Self {
            solver: "clarabel".to_string(),
            log_path: None,
            lp_path: None,
        }
    }
}

impl SolveOptions {
    pub fn with_solver(mut self, solver: impl Into<String>) -> Self {
        self.solver = solver.into();
        self
    }

    pub fn with_log_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.log_path = Some(path.into());
        self
    }

    pub fn with_lp_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.lp_path = Some(path.into());
        self
    }

    pub fn from_json_str(json: &str) -> EsmResult<Self> {
        Ok(serde_json::from_str(json)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let opts = BuildOptions::default();
        assert!(opts.drop_trivial_rows);
        assert!(opts.growth_rate_big_m.is_none());
        assert_eq!(SolveOptions::default().solver, "clarabel");
    }

    #[test]
    fn test_partial_json_keeps_defaults() {
        let opts = BuildOptions::from_json_str(r#"{"scenario": "high-demand"}"#).unwrap();
        assert_eq!(opts.scenario, "high-demand");
        assert!(opts.drop_trivial_rows);

        let solve = SolveOptions::from_json_str(r#"{"solver": "HiGHS", "lp_path": "out.lp"}"#)
            .unwrap();
        assert_eq!(solve.solver, "HiGHS");
        assert_eq!(solve.lp_path, Some(PathBuf::from("out.lp")));
    }

    #[test]
    fn test_malformed_json_is_parse_error() {
        let err = BuildOptions::from_json_str("{").unwrap_err();
        assert!(matches!(err, esm_core::EsmError::Parse(_)));
    }
}
