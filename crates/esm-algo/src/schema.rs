//! Parameter contract: which parameters a build reads, their shapes, the
//! value domain of each, and the documented defaults.
//!
//! The table is a closed `(ShapeTag, KindTag)` lookup. Validation dispatches
//! on the kind, never on the parameter name.

use esm_core::{
    DimensionCatalogue, Diagnostics, EsmError, EsmResult, Param, ParameterStore,
};

/// Dimension names.
pub mod dims {
    pub const REGION: &str = "REGION";
    /// Trade partner; an alias of [`REGION`].
    pub const REGION_PARTNER: &str = "_REGION";
    pub const TECHNOLOGY: &str = "TECHNOLOGY";
    pub const FUEL: &str = "FUEL";
    pub const TIMESLICE: &str = "TIMESLICE";
    pub const YEAR: &str = "YEAR";
    /// Vintage year; an alias of [`YEAR`].
    pub const BUILDYEAR: &str = "BUILDYEAR";
    pub const EMISSION: &str = "EMISSION";
    pub const MODE_OF_OPERATION: &str = "MODE_OF_OPERATION";
    pub const STORAGE: &str = "STORAGE";
    pub const SEASON: &str = "SEASON";
    pub const DAYTYPE: &str = "DAYTYPE";
    pub const DAILYTIMEBRACKET: &str = "DAILYTIMEBRACKET";

    /// Dimensions every model needs.
    pub const REQUIRED: [&str; 6] = [REGION, TECHNOLOGY, FUEL, TIMESLICE, YEAR, MODE_OF_OPERATION];
}

use dims::*;

/// Register the derived axes `BUILDYEAR` and `_REGION` if they are missing.
pub fn register_aliases(catalogue: &mut DimensionCatalogue) -> EsmResult<()> {
    if catalogue.get(BUILDYEAR).is_none() {
        catalogue.alias(YEAR, BUILDYEAR)?;
    }
    if catalogue.get(REGION_PARTNER).is_none() {
        catalogue.alias(REGION, REGION_PARTNER)?;
    }
    Ok(())
}

/// The shapes parameters come in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShapeTag {
    R,
    RY,
    RT,
    RTY,
    RTMY,
    RTTsY,
    RTFMY,
    RTEMY,
    RFY,
    RFTsY,
    RE,
    REY,
    RS,
    RSY,
    RTSM,
    RRF,
    RRFY,
    TsY,
    LhY,
    LsLdY,
    TsLs,
    TsLd,
    TsLh,
}

impl ShapeTag {
    pub fn dims(self) -> &'static [&'static str] {
        match self {
            ShapeTag::R => &[REGION],
            ShapeTag::RY => &[REGION, YEAR],
            ShapeTag::RT => &[REGION, TECHNOLOGY],
            ShapeTag::RTY => &[REGION, TECHNOLOGY, YEAR],
            ShapeTag::RTMY => &[REGION, TECHNOLOGY, MODE_OF_OPERATION, YEAR],
            ShapeTag::RTTsY => &[REGION, TECHNOLOGY, TIMESLICE, YEAR],
            ShapeTag::RTFMY => &[REGION, TECHNOLOGY, FUEL, MODE_OF_OPERATION, YEAR],
            ShapeTag::RTEMY => &[REGION, TECHNOLOGY, EMISSION, MODE_OF_OPERATION, YEAR],
            ShapeTag::RFY => &[REGION, FUEL, YEAR],
            ShapeTag::RFTsY => &[REGION, FUEL, TIMESLICE, YEAR],
            ShapeTag::RE => &[REGION, EMISSION],
            ShapeTag::REY => &[REGION, EMISSION, YEAR],
            ShapeTag::RS => &[REGION, STORAGE],
            ShapeTag::RSY => &[REGION, STORAGE, YEAR],
            ShapeTag::RTSM => &[REGION, TECHNOLOGY, STORAGE, MODE_OF_OPERATION],
            ShapeTag::RRF => &[REGION, REGION_PARTNER, FUEL],
            ShapeTag::RRFY => &[REGION, REGION_PARTNER, FUEL, YEAR],
            ShapeTag::TsY => &[TIMESLICE, YEAR],
            ShapeTag::LhY => &[DAILYTIMEBRACKET, YEAR],
            ShapeTag::LsLdY => &[SEASON, DAYTYPE, YEAR],
            ShapeTag::TsLs => &[TIMESLICE, SEASON],
            ShapeTag::TsLd => &[TIMESLICE, DAYTYPE],
            ShapeTag::TsLh => &[TIMESLICE, DAILYTIMEBRACKET],
        }
    }
}

/// Value domain of a parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KindTag {
    /// Any finite number.
    Value,
    /// Non-negative.
    Rate,
    /// Within `[0, 1]`.
    Fraction,
    /// Upper limit, stored as [`esm_core::Limit`].
    Limit,
    /// 0 or 1.
    Tag,
    /// 1 (sinking fund) or 2 (straight line).
    Method,
    /// At least one year.
    Life,
}

impl KindTag {
    /// Reason the value is outside this kind's domain, if it is.
    pub fn check(self, value: f64) -> Option<&'static str> {
        if !value.is_finite() {
            return Some("value is not finite");
        }
        match self {
            KindTag::Value | KindTag::Limit => None,
            KindTag::Rate => (value < 0.0).then_some("rate must be non-negative"),
            KindTag::Fraction => {
                (!(0.0..=1.0).contains(&value)).then_some("fraction must lie in [0, 1]")
            }
            KindTag::Tag => (value != 0.0 && value != 1.0).then_some("tag must be 0 or 1"),
            KindTag::Method => (value != DepreciationMethod::SinkingFund.code()
                && value != DepreciationMethod::StraightLine.code())
            .then_some("depreciation method must be 1 (sinking fund) or 2 (straight line)"),
            KindTag::Life => (value < 1.0).then_some("operational life must be at least 1"),
        }
    }
}

/// Depreciation policy for salvage value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DepreciationMethod {
    SinkingFund,
    StraightLine,
}

impl DepreciationMethod {
    pub fn code(self) -> f64 {
        match self {
            DepreciationMethod::SinkingFund => 1.0,
            DepreciationMethod::StraightLine => 2.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Requirement {
    Required,
    /// Required when the named dimension is non-empty.
    RequiredWith(&'static str),
    Optional,
}

#[derive(Debug, Clone, Copy)]
pub struct ParameterSpec {
    pub name: &'static str,
    pub shape: ShapeTag,
    pub kind: KindTag,
    pub requirement: Requirement,
    pub default: Option<f64>,
}

const fn p(name: &'static str, shape: ShapeTag, kind: KindTag) -> ParameterSpec {
    ParameterSpec {
        name,
        shape,
        kind,
        requirement: Requirement::Optional,
        default: None,
    }
}

impl ParameterSpec {
    const fn required(mut self) -> Self {
        self.requirement = Requirement::Required;
        self
    }

    const fn required_with(mut self, dim: &'static str) -> Self {
        self.requirement = Requirement::RequiredWith(dim);
        self
    }

    const fn default(mut self, value: f64) -> Self {
        self.default = Some(value);
        self
    }

    pub fn dims(&self) -> &'static [&'static str] {
        self.shape.dims()
    }
}

use KindTag::{Fraction, Life, Limit, Method, Rate, Tag, Value};
use ShapeTag::*;

pub const PARAMETERS: &[ParameterSpec] = &[
    // time
    p("YearSplit", TsY, Fraction).required(),
    p("DaySplit", LhY, Fraction).required_with(STORAGE),
    p("DaysInDayType", LsLdY, Value).required_with(STORAGE),
    p("Conversionls", TsLs, Tag).required_with(STORAGE),
    p("Conversionld", TsLd, Tag).required_with(STORAGE),
    p("Conversionlh", TsLh, Tag).required_with(STORAGE),
    // finance
    p("DiscountRate", R, Rate).required().default(0.05),
    p("DiscountRateIdv", RT, Rate),
    p("DepreciationMethod", R, Method).required().default(1.0),
    p("CapitalCost", RTY, Value),
    p("FixedCost", RTY, Value),
    p("VariableCost", RTMY, Value),
    // technology
    p("OperationalLife", RT, Life).required().default(1.0),
    p("CapacityToActivityUnit", RT, Value).required().default(1.0),
    p("CapacityFactor", RTTsY, Fraction).required().default(1.0),
    p("AvailabilityFactor", RTY, Fraction).default(1.0),
    p("ResidualCapacity", RTY, Value).default(0.0),
    p("InputActivityRatio", RTFMY, Value),
    p("OutputActivityRatio", RTFMY, Value).required(),
    p("CapacityOfOneTechnologyUnit", RTY, Value),
    // demand
    p("SpecifiedAnnualDemand", RFY, Value),
    p("SpecifiedDemandProfile", RFTsY, Fraction),
    p("AccumulatedAnnualDemand", RFY, Value),
    // limits
    p("TotalAnnualMaxCapacity", RTY, Limit),
    p("TotalAnnualMaxCapacityInvestment", RTY, Limit),
    p("TotalTechnologyAnnualActivityUpperLimit", RTY, Limit),
    p("TotalTechnologyModelPeriodActivityUpperLimit", RT, Limit),
    p("TotalAnnualMinCapacity", RTY, Value),
    p("TotalAnnualMinCapacityInvestment", RTY, Value),
    p("TotalTechnologyAnnualActivityLowerLimit", RTY, Value),
    p("TotalAnnualMinCapacityFactor", RTY, Value),
    p("TotalTechnologyModelPeriodActivityLowerLimit", RT, Value),
    p("CapacityAdditionalMaxGrowthRate", RTY, Value),
    p("CapacityAdditionalMinGrowthRate", RTY, Value),
    p("CapacityAdditionalMaxFloor", RTY, Value),
    // emissions
    p("EmissionActivityRatio", RTEMY, Value),
    p("EmissionsPenalty", REY, Value),
    p("AnnualExogenousEmission", REY, Value),
    p("AnnualEmissionLimit", REY, Limit),
    p("ModelPeriodExogenousEmission", RE, Value),
    p("ModelPeriodEmissionLimit", RE, Limit),
    // targets
    p("ReserveMargin", RY, Value),
    p("ReserveMarginTagTechnology", RTY, Tag),
    p("ReserveMarginTagFuel", RFY, Tag),
    p("REMinProductionTarget", RY, Fraction),
    p("RETagTechnology", RTY, Tag),
    p("RETagFuel", RFY, Tag),
    // storage
    p("TechnologyToStorage", RTSM, Value),
    p("TechnologyFromStorage", RTSM, Value),
    p("StorageLevelStart", RS, Value).default(0.0),
    p("StorageMaxChargeRate", RS, Value),
    p("StorageMaxDischargeRate", RS, Value),
    p("MinStorageCharge", RSY, Fraction).default(0.0),
    p("OperationalLifeStorage", RS, Life).required_with(STORAGE).default(1.0),
    p("CapitalCostStorage", RSY, Value),
    p("ResidualStorageCapacity", RSY, Value).default(0.0),
    p("DiscountRateStorage", RS, Rate),
    // trade
    p("TradeRoute", RRFY, Tag),
    p("TradeLossBetweenRegions", RRFY, Fraction),
    p("ResidualTradeCapacity", RRFY, Value).default(0.0),
    p("OperationalLifeTrade", RRF, Life).default(1.0),
    p("CapitalCostTrade", RRFY, Value),
    p("DiscountRateTrade", RRF, Rate),
    p("TradeCapacityToActivityUnit", RRF, Value).default(1.0),
    p("TotalAnnualMaxTradeInvestment", RRFY, Limit),
    p("TotalTradeAnnualActivityUpperLimit", RRFY, Limit),
    p("TotalTradeAnnualActivityLowerLimit", RRFY, Value),
    p("AvailabilityFactorTrade", RRFY, Fraction),
    p("TotalAnnualMinCapacityFactorTrade", RRFY, Fraction),
];

/// Look up a parameter's contract.
pub fn spec(name: &str) -> Option<&'static ParameterSpec> {
    PARAMETERS.iter().find(|s| s.name == name)
}

fn required(spec: &ParameterSpec, catalogue: &DimensionCatalogue) -> bool {
    match spec.requirement {
        Requirement::Required => true,
        Requirement::RequiredWith(dim) => catalogue.is_populated(dim),
        Requirement::Optional => false,
    }
}

/// Check a store against the parameter table before any variable exists.
///
/// Gaps and contract violations are errors. Parameters the table does not
/// know are reported as warnings and otherwise ignored.
pub fn validate(store: &ParameterStore) -> EsmResult<Diagnostics> {
    let catalogue = store.catalogue();
    let mut diagnostics = Diagnostics::new();

    for dim in dims::REQUIRED {
        catalogue.axis(dim)?;
    }
    validate_years(catalogue)?;
    for (alias, base) in [(BUILDYEAR, YEAR), (REGION_PARTNER, REGION)] {
        if let Some(axis) = catalogue.get(alias) {
            if !axis.same_coords(catalogue.axis(base)?) {
                return Err(EsmError::Alignment {
                    left: alias.to_string(),
                    right: base.to_string(),
                    dim: alias.to_string(),
                });
            }
        }
    }

    for spec in PARAMETERS {
        if required(spec, catalogue) && !store.contains(spec.name) {
            return Err(EsmError::MissingParameter(spec.name.to_string()));
        }
    }

    for name in store.param_names() {
        let Some(spec) = spec(name) else {
            diagnostics.add_warning_with_entity("schema", "parameter is not used by the model", name);
            continue;
        };
        if spec.kind == KindTag::Limit {
            return Err(EsmError::InvalidValue {
                parameter: name.to_string(),
                index: "*".to_string(),
                reason: "limit parameters belong in the limits map".to_string(),
            });
        }
        let param = store.param(name)?;
        check_shape(name, spec, &param.dims())?;
        check_values(name, spec.kind, param)?;
    }

    for name in store.limit_names() {
        let Some(spec) = spec(name) else {
            diagnostics.add_warning_with_entity("schema", "limit is not used by the model", name);
            continue;
        };
        if spec.kind != KindTag::Limit {
            return Err(EsmError::InvalidValue {
                parameter: name.to_string(),
                index: "*".to_string(),
                reason: "not a limit parameter".to_string(),
            });
        }
        if let Some(limit) = store.limit(name) {
            check_shape(name, spec, &limit.dims())?;
        }
    }

    tracing::debug!(
        parameters = store.param_names().count(),
        limits = store.limit_names().count(),
        warnings = diagnostics.warning_count(),
        "parameter store validated"
    );
    Ok(diagnostics)
}

fn validate_years(catalogue: &DimensionCatalogue) -> EsmResult<()> {
    let years = catalogue.axis(YEAR)?;
    let mut previous: Option<i64> = None;
    for coord in years.coords() {
        let Some(year) = coord.as_int() else {
            return Err(EsmError::InvalidValue {
                parameter: YEAR.to_string(),
                index: coord.to_string(),
                reason: "years must be integers".to_string(),
            });
        };
        if previous.is_some_and(|p| p >= year) {
            return Err(EsmError::InvalidValue {
                parameter: YEAR.to_string(),
                index: coord.to_string(),
                reason: "years must be strictly ascending".to_string(),
            });
        }
        previous = Some(year);
    }
    Ok(())
}

fn check_shape(name: &str, spec: &ParameterSpec, found: &[&str]) -> EsmResult<()> {
    if found != spec.dims() {
        return Err(EsmError::ShapeMismatch {
            parameter: name.to_string(),
            expected: spec.dims().join(", "),
            found: found.join(", "),
        });
    }
    Ok(())
}

fn check_values(name: &str, kind: KindTag, param: &Param) -> EsmResult<()> {
    for (key, value) in param.iter() {
        if let Some(reason) = kind.check(*value) {
            return Err(EsmError::InvalidValue {
                parameter: name.to_string(),
                index: param.format_key(key),
                reason: format!("{} (got {})", reason, value),
            });
        }
    }
    Ok(())
}

/// Fill every documented default over its parameter's full domain.
///
/// This is the one place absent entries become values. Parameters whose
/// dimensions are not in the catalogue are left alone.
pub fn attach_defaults(store: &mut ParameterStore) -> EsmResult<()> {
    let mut filled = 0usize;
    for spec in PARAMETERS {
        let Some(default) = spec.default else {
            continue;
        };
        if spec.dims().iter().any(|d| store.catalogue().get(d).is_none()) {
            continue;
        }
        let param = match store.try_param(spec.name) {
            Some(existing) => existing.fill(default)?,
            None => {
                let axes = store.catalogue().axes_for(spec.dims())?;
                Param::full(spec.name, axes, default)?
            }
        };
        store.set_param(param)?;
        filled += 1;
    }
    tracing::debug!(parameters = filled, "defaults attached");
    Ok(())
}
