//! Core data model for energy-system optimization models.
//!
//! - [`coord`]: coordinates, named axes, and the dimension catalogue
//! - [`array`]: sparse labeled arrays with absence semantics
//! - [`linexpr`]: affine forms over model columns
//! - [`limit`]: upper limits with an explicit unbounded variant
//! - [`store`]: read-only parameter data
//! - [`error`], [`diagnostics`]: failures and non-fatal findings

pub mod array;
pub mod coord;
pub mod diagnostics;
pub mod error;
pub mod limit;
pub mod linexpr;
pub mod store;

pub use array::{
    AddElem, Direction, DivElem, Key, LabeledArray, LinArray, Mask, MulElem, Param, Summable,
    Zero,
};
pub use coord::{Axis, Coord, DimensionCatalogue};
pub use diagnostics::{DiagnosticIssue, Diagnostics, Severity};
pub use error::{EsmError, EsmResult};
pub use limit::{Limit, LimitArray};
pub use linexpr::{LinExpr, VarId};
pub use store::ParameterStore;
