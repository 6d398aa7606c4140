//! The energy-system formulation: variables, derived expressions, and the
//! constraint families, assembled into a [`Model`] in one pass.
//!
//! Families read parameters through [`Context`], which turns a missing
//! optional parameter into an empty array of its declared shape. Empty
//! arrays generate no rows, so an unconfigured family quietly disappears.

mod activity;
mod balance;
mod capacity;
mod costs;
mod emissions;
mod growth;
mod limits;
mod storage;
mod targets;
mod trade;
mod variables;

use crate::model::{Model, VariableRegistry};
use crate::options::BuildOptions;
use crate::schema::{self, dims::*};
use esm_core::{
    Axis, Coord, DimensionCatalogue, Diagnostics, EsmError, EsmResult, Mask, Param, ParameterStore,
};
use web_time::Instant;

/// Read access to the store for one build.
pub(crate) struct Context<'a> {
    store: &'a ParameterStore,
    catalogue: DimensionCatalogue,
    options: &'a BuildOptions,
}

impl<'a> Context<'a> {
    fn new(store: &'a ParameterStore, options: &'a BuildOptions) -> EsmResult<Self> {
        let mut catalogue = store.catalogue().clone();
        schema::register_aliases(&mut catalogue)?;
        // a model without emission types still carries the (empty) axis
        if catalogue.get(EMISSION).is_none() {
            catalogue.insert(EMISSION, Vec::<Coord>::new())?;
        }
        Ok(Self {
            store,
            catalogue,
            options,
        })
    }

    pub fn catalogue(&self) -> &DimensionCatalogue {
        &self.catalogue
    }

    pub fn options(&self) -> &BuildOptions {
        self.options
    }

    pub fn axis(&self, name: &str) -> EsmResult<&Axis> {
        self.catalogue.axis(name)
    }

    pub fn years(&self) -> EsmResult<&Axis> {
        self.catalogue.axis(YEAR)
    }

    /// A parameter, or an empty array of its shape when not supplied.
    pub fn param(&self, name: &str) -> EsmResult<Param> {
        if let Some(param) = self.store.try_param(name) {
            return Ok(param.clone());
        }
        let spec = schema::spec(name).ok_or_else(|| EsmError::MissingParameter(name.to_string()))?;
        Param::empty(name, self.catalogue.axes_for(spec.dims())?)
    }

    /// A parameter restricted to its nonzero entries.
    pub fn nonzero(&self, name: &str) -> EsmResult<Param> {
        Ok(self.param(name)?.filter_map(|v| (*v != 0.0).then_some(*v)))
    }

    /// Bounded entries of a limit parameter; unbounded ones generate no rows.
    pub fn limit(&self, name: &str) -> EsmResult<Param> {
        match self.store.limit(name) {
            Some(limit) => Ok(limit.bounded()),
            None => self.param(name),
        }
    }

    /// Tag parameter as a mask, true where the value is 1.
    pub fn tag(&self, name: &str) -> EsmResult<Mask> {
        Ok(self.param(name)?.eq_scalar(1.0))
    }

    pub fn has_storage(&self) -> bool {
        self.catalogue.is_populated(STORAGE)
    }

    pub fn has_trade(&self) -> bool {
        self.store.tag("TradeRoute").is_some_and(|routes| routes.any())
    }

    /// Trade routes `REGION -> _REGION`.
    pub fn routes(&self) -> EsmResult<Mask> {
        self.tag("TradeRoute")
    }

    /// Trade routes seen from the importing side: `_REGION -> REGION`.
    pub fn reverse_routes(&self) -> EsmResult<Mask> {
        self.routes()?.swap_dims(REGION, REGION_PARTNER)
    }
}

/// Record a family that generated nothing because its data is absent.
pub(crate) fn skip_family(diagnostics: &mut Diagnostics, family: &str, reason: &str) {
    tracing::debug!(family, reason, "family skipped");
    diagnostics.add_info("family", &format!("{} skipped: {}", family, reason));
}

/// Build the full model for one scenario.
///
/// The store is validated first; any error leaves nothing behind.
pub fn build_model(store: &ParameterStore, options: &BuildOptions) -> EsmResult<Model> {
    let start = Instant::now();
    tracing::info!(scenario = %options.scenario, "building model");

    let validation = schema::validate(store)?;
    let ctx = Context::new(store, options)?;

    let mut registry = VariableRegistry::new(ctx.catalogue());
    variables::declare(&ctx, &mut registry)?;
    let mut stage = registry.finish();
    stage.diagnostics_mut().merge(validation);

    activity::define(&ctx, &mut stage)?;
    capacity::define(&ctx, &mut stage)?;
    emissions::define(&ctx, &mut stage)?;
    storage::define(&ctx, &mut stage)?;
    trade::define(&ctx, &mut stage)?;
    targets::define(&ctx, &mut stage)?;
    costs::define(&ctx, &mut stage)?;

    let mut stage = stage.finish();
    stage.set_drop_trivial_rows(options.drop_trivial_rows);
    balance::constrain(&ctx, &mut stage)?;
    capacity::constrain(&ctx, &mut stage)?;
    limits::constrain(&ctx, &mut stage)?;
    growth::constrain(&ctx, &mut stage)?;
    emissions::constrain(&ctx, &mut stage)?;
    targets::constrain(&ctx, &mut stage)?;
    storage::constrain(&ctx, &mut stage)?;
    trade::constrain(&ctx, &mut stage)?;

    let total = stage.lin("TotalDiscountedCost")?.sum_over(&[REGION, YEAR])?;
    let model = stage
        .finish()
        .minimise(&total.named("TotalDiscountedCost"))?
        .with_scenario(&options.scenario);

    tracing::info!(
        scenario = %options.scenario,
        columns = model.variables().column_count(),
        rows = model.constraints().row_count(),
        warnings = model.diagnostics().warning_count(),
        elapsed_ms = start.elapsed().as_millis() as u64,
        "model built"
    );
    Ok(model)
}
