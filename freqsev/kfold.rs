//! K-fold cross-validation of a joint frequency-severity model.
//!
//! Severity targets delegate straight to the generic routine on the
//! severity-only rows. Frequency targets first re-estimate the deductible
//! adjustment from posterior severity draws, refit the frequency sub-model
//! with the adjustment offset in its linear predictor, and delegate the
//! refit model. A model that did not come out of this crate's joint fit is
//! forwarded unchanged ([`KfoldTarget::Single`]); that is the supported
//! fallback path, not an error.
//!
//! The pipeline is strictly linear: resolve the response, then either
//! delegate or subsample → compute offsets → refit → delegate. No loops,
//! no retries; the first failure halts the call.

use crate::backend::{
    CrossValidation, EngineError, FamilyKind, FitEngine, KfoldReport, KfoldRequest, SubmodelSpec,
};
use crate::data::DataError;
use crate::model::{JointModel, priors_for_response};
use crate::offset::{ADJUSTMENT_COLUMN, AdjustmentError, deductible_adjustment, subsample_size};
use ndarray::Array2;
use polars::prelude::*;
use rand::seq::index;
use thiserror::Error;

/// Default ceiling on total (draws × rows) work for the offset estimate.
pub const DEFAULT_DRAW_CEILING: f64 = 1e6;

/// What is being cross-validated.
///
/// `Single` is the transparent fallback: a fitted model with no joint
/// structure is handed to the generic routine unchanged.
pub enum KfoldTarget<'a, F> {
    Joint(&'a JointModel<F>),
    Single(&'a F),
}

/// Call options mirroring the generic routine's surface.
pub struct KfoldOptions<'a> {
    /// Response to cross-validate; required for a joint target.
    pub response: Option<&'a str>,
    /// Replacement data, forwarded on the fallback path. A joint target
    /// derives its data from the model's own training table instead.
    pub newdata: Option<&'a DataFrame>,
    /// Explicit posterior draw indices. Supplying these makes the offset
    /// estimate deterministic; otherwise a subsample is drawn per call.
    pub draw_ids: Option<Vec<usize>>,
    /// Upper bound on (draws × rows) work for the offset estimate.
    pub draw_ceiling: f64,
    /// Distribution function override, required for a custom severity
    /// family with no registered CDF.
    pub custom_distribution: Option<&'a dyn Fn(f64, &[f64]) -> f64>,
    /// Remaining arguments, forwarded verbatim to the generic routine.
    pub request: KfoldRequest,
}

impl Default for KfoldOptions<'_> {
    fn default() -> Self {
        Self {
            response: None,
            newdata: None,
            draw_ids: None,
            draw_ceiling: DEFAULT_DRAW_CEILING,
            custom_distribution: None,
            request: KfoldRequest::default(),
        }
    }
}

impl<'a> KfoldOptions<'a> {
    pub fn for_response(response: &'a str) -> Self {
        Self {
            response: Some(response),
            ..Self::default()
        }
    }
}

/// Errors of the cross-validation unit. All are fatal to the call.
#[derive(Error, Debug)]
pub enum KfoldError {
    #[error("a response variable is required to cross-validate a joint frequency-severity model")]
    ResponseRequired,
    #[error("response '{0}' matches neither the frequency nor the severity response of this model")]
    UnknownResponse(String),
    #[error(
        "severity family '{family}' has no registered distribution function; supply a custom one"
    )]
    MissingDistribution { family: String },
    #[error(transparent)]
    Adjustment(#[from] AdjustmentError),
    #[error(transparent)]
    Data(#[from] DataError),
    #[error(transparent)]
    Delegation(#[from] EngineError),
}

/// Cross-validates `target` by k-fold.
///
/// See the module docs for the two exit paths. The refit frequency model is
/// consumed by the delegated scoring; callers who want to keep it should
/// use [`refit_frequency_with_adjustment`] directly.
pub fn kfold<E, V>(
    engine: &E,
    validator: &V,
    target: KfoldTarget<'_, E::Fitted>,
    options: &KfoldOptions<'_>,
) -> Result<KfoldReport, KfoldError>
where
    E: FitEngine,
    V: CrossValidation<E::Fitted>,
{
    let model = match target {
        KfoldTarget::Single(fitted) => {
            // Not a joint model: forward unchanged.
            return Ok(validator.kfold(fitted, options.newdata, &options.request)?);
        }
        KfoldTarget::Joint(model) => model,
    };

    let response = options.response.ok_or(KfoldError::ResponseRequired)?;
    if response == model.spec.severity.response {
        let severity_data = model.severity_rows()?;
        log::info!(
            "Running K-Fold function on the severity response with {} folds",
            options.request.folds
        );
        return Ok(validator.kfold(&model.fitted, Some(&severity_data), &options.request)?);
    }
    if response != model.spec.frequency.response {
        return Err(KfoldError::UnknownResponse(response.to_string()));
    }

    let (refit, frequency_data) = refit_frequency_with_adjustment(engine, model, options)?;
    log::info!(
        "Running K-Fold function on the frequency response with {} folds",
        options.request.folds
    );
    Ok(validator.kfold(&refit, Some(&frequency_data), &options.request)?)
}

/// Re-estimates the deductible adjustment and refits the frequency
/// sub-model with the adjustment offset appended to its linear predictor.
///
/// Returns the refit model together with the frequency-only data (original
/// row order, adjustment column appended) it was fit on.
pub fn refit_frequency_with_adjustment<E>(
    engine: &E,
    model: &JointModel<E::Fitted>,
    options: &KfoldOptions<'_>,
) -> Result<(E::Fitted, DataFrame), KfoldError>
where
    E: FitEngine,
{
    let spec = &model.spec;
    let frequency_data = model.frequency_rows()?;
    let deductibles = crate::data::numeric_column(&frequency_data, &spec.deductible_column)?;

    // Registry lookup first; a custom family has no registered CDF and
    // must come with an override.
    let registered = spec.severity_family.distribution_fn();
    let distribution: &dyn Fn(f64, &[f64]) -> f64 = match (&registered, options.custom_distribution)
    {
        (Some(f), _) => f,
        (None, Some(f)) => f,
        (None, None) => {
            return Err(KfoldError::MissingDistribution {
                family: spec.severity_family.name().to_string(),
            });
        }
    };

    let draw_ids = match &options.draw_ids {
        Some(ids) => ids.clone(),
        None => {
            let total_draws = engine.total_draws(&model.fitted);
            if total_draws == 0 {
                return Err(KfoldError::Adjustment(AdjustmentError::NoDraws));
            }
            subsample_draws(options.draw_ceiling, frequency_data.height(), total_draws)
        }
    };

    let parameters = spec.severity_parameters();
    let mut parameter_draws: Vec<Array2<f64>> = Vec::with_capacity(parameters.len());
    for parameter in &parameters {
        let matrix = engine.posterior_expectation(
            &model.fitted,
            &spec.severity.response,
            parameter,
            &frequency_data,
            &draw_ids,
        )?;
        parameter_draws.push(matrix);
    }

    let offsets = deductible_adjustment(
        &deductibles,
        &parameter_draws,
        distribution,
        spec.frequency_link(),
        spec.adjustment_floor,
    )?;

    let mut frequency_data = frequency_data;
    frequency_data
        .with_column(Series::new(ADJUSTMENT_COLUMN.into(), offsets.to_vec()))
        .map_err(DataError::from)?;

    let refit_formula = spec.frequency.clone().with_offset(ADJUSTMENT_COLUMN);
    let submodel = SubmodelSpec {
        formula: refit_formula,
        family: FamilyKind::Frequency(spec.frequency_family),
    };
    let priors = priors_for_response(&model.priors, &spec.frequency.response);
    let controls = model.sampler.control_settings();

    log::info!("Recompiling frequency model");
    let refit = engine.fit(
        std::slice::from_ref(&submodel),
        &frequency_data,
        &priors,
        &model.sampler,
        &controls,
    )?;
    Ok((refit, frequency_data))
}

/// Samples draw indices without replacement from `[0, total_draws)`,
/// sized by [`subsample_size`]. Sorted for reproducible extraction order.
fn subsample_draws(ceiling: f64, rows: usize, total_draws: usize) -> Vec<usize> {
    let size = subsample_size(ceiling, rows, total_draws);
    let mut rng = rand::thread_rng();
    let mut ids = index::sample(&mut rng, total_draws, size).into_vec();
    ids.sort_unstable();
    ids
}
