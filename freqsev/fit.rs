//! The primary model-fitting entry point.
//!
//! [`fit_frequency_severity`] validates the tagged claims table against the
//! joint specification, builds the two sub-model specifications, and runs
//! one delegated backend fit covering both responses. The returned
//! [`JointModel`] carries everything the cross-validation unit later reads
//! off it: spec, sampler configuration, combined prior table, and the
//! training data itself.

use crate::backend::{EngineError, FamilyKind, FitEngine, SubmodelSpec};
use crate::data::{self, DataError};
use crate::family::MAX_SEVERITY_PARAMETERS;
use crate::model::{JointModel, JointSpec, Prior, SamplerConfig};
use polars::prelude::DataFrame;
use thiserror::Error;

/// Errors of the joint fitting entry point.
#[derive(Error, Debug)]
pub enum FitError {
    #[error(transparent)]
    Data(#[from] DataError),
    #[error("only 1-5 severity distribution parameters are supported, got {0}")]
    UnsupportedArity(usize),
    #[error(transparent)]
    Delegation(#[from] EngineError),
}

/// Fits the combined frequency-severity model.
///
/// Validation happens before the expensive delegated fit: the role column
/// must carry both tags, the deductible column must be complete and
/// finite, and the severity family's parameter arity must be within the
/// supported 1-5 range.
pub fn fit_frequency_severity<E>(
    engine: &E,
    data: DataFrame,
    spec: JointSpec,
    priors: Vec<Prior>,
    sampler: SamplerConfig,
) -> Result<JointModel<E::Fitted>, FitError>
where
    E: FitEngine,
{
    data::validate_roles(&data, &spec.role_column)?;
    data::numeric_column(&data, &spec.deductible_column)?;

    let arity = spec.severity_parameters().len();
    if arity == 0 || arity > MAX_SEVERITY_PARAMETERS {
        return Err(FitError::UnsupportedArity(arity));
    }

    let submodels = [
        SubmodelSpec {
            formula: spec.frequency.clone(),
            family: FamilyKind::Frequency(spec.frequency_family),
        },
        SubmodelSpec {
            formula: spec.severity.clone(),
            family: FamilyKind::Severity(spec.severity_family.clone()),
        },
    ];
    let controls = sampler.control_settings();

    log::info!(
        "Fitting joint model: [{}] + [{}] over {} rows",
        spec.frequency,
        spec.severity,
        data.height()
    );
    let fitted = engine.fit(&submodels, &data, &priors, &sampler, &controls)?;

    Ok(JointModel {
        fitted,
        spec,
        sampler,
        priors,
        data,
    })
}
