//! Unified error type for model construction and solve handoff.
//!
//! Solver outcomes (infeasible, unbounded) are not errors; they are reported
//! as a termination status. Everything here aborts the build or the handoff.

use thiserror::Error;

/// Unified error type for all model-building operations.
#[derive(Error, Debug)]
pub enum EsmError {
    /// A required parameter is missing from the store
    #[error("Schema error: missing parameter '{0}'")]
    MissingParameter(String),

    /// A dimension is referenced but not present in the catalogue
    #[error("Schema error: missing dimension '{0}'")]
    MissingDimension(String),

    /// A parameter is stored with dimensions other than its declared shape
    #[error("Schema error: parameter '{parameter}' has dims [{found}], expected [{expected}]")]
    ShapeMismatch {
        parameter: String,
        expected: String,
        found: String,
    },

    /// A parameter value violates its kind (tag, method, rate, ...)
    #[error("Schema error: parameter '{parameter}' at {index}: {reason}")]
    InvalidValue {
        parameter: String,
        index: String,
        reason: String,
    },

    /// Two operands share a dimension name but disagree on its coordinates
    #[error("Alignment error: '{left}' and '{right}' disagree on coordinates of dimension '{dim}'")]
    Alignment {
        left: String,
        right: String,
        dim: String,
    },

    /// A masked-out variable index was referenced or coerced
    #[error("Domain policy error: '{name}' is undefined at {index}")]
    DomainPolicy { name: String, index: String },

    #[error("Undeclared variable '{0}'")]
    UndeclaredVariable(String),

    #[error("Duplicate variable '{0}'")]
    DuplicateVariable(String),

    #[error("Duplicate expression '{0}'")]
    DuplicateExpression(String),

    #[error("Undefined expression '{0}'")]
    UndefinedExpression(String),

    /// An expression exists but holds a different kind of value
    #[error("Expression '{name}' is not a {expected}")]
    ExpressionKind { name: String, expected: &'static str },

    #[error("Objective error: {0}")]
    Objective(String),

    #[error("unknown lp solver '{label}'; supported values: {supported}")]
    UnknownSolver { label: String, supported: String },

    /// The problem could not be handed to the solver
    #[error("Solver error: {0}")]
    Solver(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("{0}")]
    Other(String),
}

/// Convenience type alias for Results using EsmError.
pub type EsmResult<T> = Result<T, EsmError>;

impl From<serde_json::Error> for EsmError {
    fn from(err: serde_json::Error) -> Self {
        EsmError::Parse(err.to_string())
    }
}

impl From<String> for EsmError {
    fn from(s: String) -> Self {
        EsmError::Other(s)
    }
}

impl From<&str> for EsmError {
    fn from(s: &str) -> Self {
        EsmError::Other(s.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_alignment_error_names_both_operands() {
        let err = EsmError::Alignment {
            left: "GrossCapacity".into(),
            right: "CapacityFactor".into(),
            dim: "YEAR".into(),
        };
        let msg = err.to_string();
        assert!(msg.contains("GrossCapacity"));
        assert!(msg.contains("CapacityFactor"));
        assert!(msg.contains("YEAR"));
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: EsmError = io_err.into();
        assert!(matches!(err, EsmError::Io(_)));
    }

    #[test]
    fn test_json_error_conversion() {
        let parse: Result<serde_json::Value, _> = serde_json::from_str("{not json");
        let err: EsmError = parse.unwrap_err().into();
        assert!(matches!(err, EsmError::Parse(_)));
    }

    #[test]
    fn test_question_mark_operator() {
        fn inner() -> EsmResult<()> {
            Err(EsmError::MissingParameter("YearSplit".into()))
        }

        fn outer() -> EsmResult<()> {
            inner()?;
            Ok(())
        }

        assert!(outer().is_err());
    }
}
