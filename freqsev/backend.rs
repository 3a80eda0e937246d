//! The delegated Bayesian backend, as consumed interfaces.
//!
//! Everything numerically heavy (MCMC sampling, posterior prediction,
//! generic k-fold scoring) lives behind these traits. The crate calls
//! [`FitEngine::fit`] once per refit and
//! [`FitEngine::posterior_expectation`] once per severity distribution
//! parameter; both exit paths of the cross-validation unit terminate in
//! [`CrossValidation::kfold`].
//!
//! Backend failures are opaque: an [`EngineError`] carries the backend's
//! own message and is surfaced verbatim, never interpreted.

use crate::family::{FrequencyFamily, SeverityFamily};
use crate::formula::Formula;
use crate::model::{ControlSettings, Prior, SamplerConfig};
use ndarray::Array2;
use polars::prelude::DataFrame;
use thiserror::Error;

/// Opaque failure surfaced from the fitting or cross-validation backend.
#[derive(Debug, Error)]
#[error("{message}")]
pub struct EngineError {
    message: String,
}

impl EngineError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Family of one sub-model in a (possibly joint) fit.
#[derive(Debug, Clone, PartialEq)]
pub enum FamilyKind {
    Frequency(FrequencyFamily),
    Severity(SeverityFamily),
}

/// One sub-model of a fit request: its formula and response family.
#[derive(Debug, Clone, PartialEq)]
pub struct SubmodelSpec {
    pub formula: Formula,
    pub family: FamilyKind,
}

/// Caller-supplied arguments forwarded verbatim to the generic k-fold
/// routine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KfoldRequest {
    pub folds: usize,
}

impl Default for KfoldRequest {
    fn default() -> Self {
        Self { folds: 10 }
    }
}

/// Result of the generic cross-validation routine, returned unchanged to
/// the caller.
#[derive(Debug, Clone, PartialEq)]
pub struct KfoldReport {
    /// Expected log pointwise predictive density estimate.
    pub elpd: f64,
    /// Standard error of the estimate.
    pub se: f64,
    /// Per-observation contributions, in data row order.
    pub pointwise: Vec<f64>,
}

/// Model fitting and posterior extraction, delegated to the sampling
/// engine.
pub trait FitEngine {
    /// Opaque fitted-model handle.
    type Fitted;

    /// Fits one model over the given sub-model specifications. A joint
    /// frequency-severity fit passes two; a refit passes one.
    fn fit(
        &self,
        submodels: &[SubmodelSpec],
        data: &DataFrame,
        priors: &[Prior],
        sampler: &SamplerConfig,
        controls: &ControlSettings,
    ) -> Result<Self::Fitted, EngineError>;

    /// Posterior-predictive expectation of one distribution parameter of
    /// `response`, evaluated at every row of `newdata` for every draw in
    /// `draw_ids`. Shape: `(draw_ids.len(), newdata.height())`.
    fn posterior_expectation(
        &self,
        fitted: &Self::Fitted,
        response: &str,
        parameter: &str,
        newdata: &DataFrame,
        draw_ids: &[usize],
    ) -> Result<Array2<f64>, EngineError>;

    /// Size of the post-warmup draw pool across all chains.
    fn total_draws(&self, fitted: &Self::Fitted) -> usize;
}

/// The generic k-fold cross-validation routine.
pub trait CrossValidation<F> {
    /// Scores `fitted` by k-fold cross-validation, optionally on
    /// `newdata` instead of the data the model was fit with.
    fn kfold(
        &self,
        fitted: &F,
        newdata: Option<&DataFrame>,
        request: &KfoldRequest,
    ) -> Result<KfoldReport, EngineError>;
}
