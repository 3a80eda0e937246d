//! End-to-end exercise of the joint fit and the deductible-adjusted k-fold
//! pipeline over simulated claims data, with the sampling backend mocked.

use freqsev::backend::{
    CrossValidation, EngineError, FamilyKind, FitEngine, KfoldReport, KfoldRequest, SubmodelSpec,
};
use freqsev::data::{self, ModelRole};
use freqsev::family::{FrequencyFamily, SeverityFamily};
use freqsev::fit::fit_frequency_severity;
use freqsev::formula::Formula;
use freqsev::kfold::{KfoldOptions, KfoldTarget, kfold};
use freqsev::model::{ControlSettings, JointSpec, Prior, SamplerConfig};
use freqsev::offset::ADJUSTMENT_COLUMN;
use freqsev::probability::normal_cdf;
use freqsev::simulate::{SimulationConfig, simulate_claims};
use ndarray::Array2;
use polars::prelude::DataFrame;
use std::cell::RefCell;
use std::collections::HashMap;

const SEVERITY_MU: f64 = 8.0;
const SEVERITY_SIGMA: f64 = 1.0;

/// Stand-in for the MCMC backend: posterior expectations concentrate on
/// the simulation's true severity parameters.
struct StubEngine {
    total_draws: usize,
    expectations: HashMap<String, f64>,
    fit_log: RefCell<Vec<(Vec<SubmodelSpec>, usize)>>,
}

#[derive(Debug, Clone, PartialEq)]
struct StubFitted {
    label: String,
}

impl StubEngine {
    fn new(total_draws: usize) -> Self {
        let mut expectations = HashMap::new();
        expectations.insert("mu".to_string(), SEVERITY_MU);
        expectations.insert("sigma".to_string(), SEVERITY_SIGMA);
        Self {
            total_draws,
            expectations,
            fit_log: RefCell::new(Vec::new()),
        }
    }
}

impl FitEngine for StubEngine {
    type Fitted = StubFitted;

    fn fit(
        &self,
        submodels: &[SubmodelSpec],
        data: &DataFrame,
        _priors: &[Prior],
        _sampler: &SamplerConfig,
        _controls: &ControlSettings,
    ) -> Result<Self::Fitted, EngineError> {
        self.fit_log
            .borrow_mut()
            .push((submodels.to_vec(), data.height()));
        let label = submodels
            .iter()
            .map(|s| s.formula.response.clone())
            .collect::<Vec<_>>()
            .join("+");
        Ok(StubFitted { label })
    }

    fn posterior_expectation(
        &self,
        _fitted: &Self::Fitted,
        _response: &str,
        parameter: &str,
        newdata: &DataFrame,
        draw_ids: &[usize],
    ) -> Result<Array2<f64>, EngineError> {
        let value = *self
            .expectations
            .get(parameter)
            .ok_or_else(|| EngineError::new(format!("unknown parameter '{parameter}'")))?;
        Ok(Array2::from_elem((draw_ids.len(), newdata.height()), value))
    }

    fn total_draws(&self, _fitted: &Self::Fitted) -> usize {
        self.total_draws
    }
}

struct StubValidator {
    scored: RefCell<Vec<(String, Option<DataFrame>)>>,
}

impl StubValidator {
    fn new() -> Self {
        Self {
            scored: RefCell::new(Vec::new()),
        }
    }
}

impl CrossValidation<StubFitted> for StubValidator {
    fn kfold(
        &self,
        fitted: &StubFitted,
        newdata: Option<&DataFrame>,
        _request: &KfoldRequest,
    ) -> Result<KfoldReport, EngineError> {
        self.scored
            .borrow_mut()
            .push((fitted.label.clone(), newdata.cloned()));
        let n = newdata.map(|df| df.height()).unwrap_or(0);
        Ok(KfoldReport {
            elpd: -(n as f64),
            se: 1.0,
            pointwise: vec![-1.0; n],
        })
    }
}

fn portfolio_spec() -> JointSpec {
    JointSpec::new(
        Formula::new("claim_count", &["vehicle_age"]),
        Formula::new("loss", &["vehicle_age"]),
        FrequencyFamily::Poisson,
        SeverityFamily::LogNormal,
        "deductible",
        "role",
    )
}

fn portfolio_priors() -> Vec<Prior> {
    vec![
        Prior::new("Intercept", "normal(0, 5)").for_response("claim_count"),
        Prior::new("b", "normal(0, 1)").for_response("claim_count"),
        Prior::new("b", "normal(0, 2)").for_response("loss"),
    ]
}

#[test]
fn frequency_kfold_over_simulated_portfolio() {
    let _ = env_logger::builder().is_test(true).try_init();

    let claims = simulate_claims(&SimulationConfig {
        policies: 120,
        expected_claims: 0.6,
        severity_mu: SEVERITY_MU,
        severity_sigma: SEVERITY_SIGMA,
        ..SimulationConfig::default()
    })
    .unwrap();

    let engine = StubEngine::new(4000);
    let model = fit_frequency_severity(
        &engine,
        claims,
        portfolio_spec(),
        portfolio_priors(),
        SamplerConfig::default(),
    )
    .unwrap();
    assert_eq!(engine.fit_log.borrow().len(), 1, "one joint fit");

    let validator = StubValidator::new();
    let options = KfoldOptions {
        draw_ids: Some((0..100).collect()),
        ..KfoldOptions::for_response("claim_count")
    };
    let report = kfold(&engine, &validator, KfoldTarget::Joint(&model), &options).unwrap();

    // The refit happened on the frequency subset only, with the offset
    // term in its formula.
    let fit_log = engine.fit_log.borrow();
    assert_eq!(fit_log.len(), 2, "joint fit plus one refit");
    let (refit_submodels, refit_rows) = &fit_log[1];
    assert_eq!(refit_submodels.len(), 1);
    assert!(matches!(
        refit_submodels[0].family,
        FamilyKind::Frequency(FrequencyFamily::Poisson)
    ));
    assert!(refit_submodels[0].formula.has_offset(ADJUSTMENT_COLUMN));
    assert_eq!(*refit_rows, 120);

    // The scored frame is the adjusted frequency subset; every offset
    // matches the closed form for its deductible.
    let scored = validator.scored.borrow();
    assert_eq!(scored.len(), 1);
    let frame = scored[0].1.as_ref().unwrap();
    assert_eq!(frame.height(), 120);
    let adjustments = data::numeric_column(frame, ADJUSTMENT_COLUMN).unwrap();
    let deductibles = data::numeric_column(frame, "deductible").unwrap();
    for (adjustment, deductible) in adjustments.iter().zip(&deductibles) {
        let expected = (1.0 - normal_cdf((deductible.ln() - SEVERITY_MU) / SEVERITY_SIGMA)).ln();
        assert!(
            (adjustment - expected).abs() < 1e-9,
            "offset {adjustment} != {expected} at deductible {deductible}"
        );
    }

    assert_eq!(report.pointwise.len(), 120);
}

#[test]
fn severity_kfold_scores_the_severity_subset_directly() {
    let claims = simulate_claims(&SimulationConfig {
        policies: 80,
        expected_claims: 1.0,
        ..SimulationConfig::default()
    })
    .unwrap();
    let severity_rows = data::role_subset(&claims, "role", ModelRole::Severity)
        .unwrap()
        .height();

    let engine = StubEngine::new(4000);
    let model = fit_frequency_severity(
        &engine,
        claims,
        portfolio_spec(),
        portfolio_priors(),
        SamplerConfig::default(),
    )
    .unwrap();

    let validator = StubValidator::new();
    let report = kfold(
        &engine,
        &validator,
        KfoldTarget::Joint(&model),
        &KfoldOptions::for_response("loss"),
    )
    .unwrap();

    // Straight delegation: no refit, severity rows only.
    assert_eq!(engine.fit_log.borrow().len(), 1, "joint fit only");
    let scored = validator.scored.borrow();
    assert_eq!(scored.len(), 1);
    assert_eq!(scored[0].0, "claim_count+loss", "scores the joint fit");
    assert_eq!(scored[0].1.as_ref().unwrap().height(), severity_rows);
    assert_eq!(report.pointwise.len(), severity_rows);
}
