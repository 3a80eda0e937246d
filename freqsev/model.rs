//! Joint model specification, sampler configuration, and the fitted-model
//! container.
//!
//! The [`JointModel`] is the durable artifact of a combined
//! frequency-severity fit: the opaque backend handle plus everything the
//! cross-validation unit later needs. That covers both formulas, the
//! families, the deductible and role columns, the sampler controls it was
//! fit with, the combined prior table, and the tagged training data itself.
//!
//! The serializable subset (specification, sampler configuration, priors)
//! round-trips through a human-readable TOML blueprint, in the same spirit
//! as persisting a trained model's configuration for later audit.

use crate::data::{self, DataError, ModelRole};
use crate::family::{FrequencyFamily, LinkFunction, SeverityFamily};
use crate::formula::Formula;
use polars::prelude::DataFrame;
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::{BufWriter, Write};
use thiserror::Error;

/// Default floor applied to deductible survival probabilities before they
/// enter the frequency link.
pub const DEFAULT_ADJUSTMENT_FLOOR: f64 = 1e-12;

/// One row of the prior table.
///
/// `response` carries the sub-model qualifier of a combined fit; it is
/// cleared when priors are filtered down for a single-response refit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Prior {
    /// Parameter class the prior applies to, e.g. `"b"` or `"Intercept"`.
    pub class: String,
    /// Specific coefficient within the class, if any.
    pub coefficient: Option<String>,
    /// Response the prior is tagged for in a combined fit.
    pub response: Option<String>,
    /// Distributional definition, e.g. `"normal(0, 5)"`.
    pub definition: String,
}

impl Prior {
    pub fn new(class: impl Into<String>, definition: impl Into<String>) -> Self {
        Self {
            class: class.into(),
            coefficient: None,
            response: None,
            definition: definition.into(),
        }
    }

    pub fn for_response(mut self, response: impl Into<String>) -> Self {
        self.response = Some(response.into());
        self
    }

    pub fn on_coefficient(mut self, coefficient: impl Into<String>) -> Self {
        self.coefficient = Some(coefficient.into());
        self
    }
}

/// Restricts a combined prior table to priors tagged for `response`,
/// clearing the tag so they apply to a refit sub-model that carries no
/// response qualifier.
pub fn priors_for_response(priors: &[Prior], response: &str) -> Vec<Prior> {
    priors
        .iter()
        .filter(|p| p.response.as_deref() == Some(response))
        .map(|p| {
            let mut prior = p.clone();
            prior.response = None;
            prior
        })
        .collect()
}

/// Sampler backend tag carried on the fitted model.
///
/// The two backends disagree on how adaptation controls are passed: one
/// takes them as direct arguments, the other wants a nested control block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SamplerBackend {
    /// External sampler binary; adaptation controls are plain arguments.
    CommandLine,
    /// In-process sampler; adaptation controls travel in a control block.
    InProcess,
}

/// Adaptation controls in the shape the tagged backend expects.
#[derive(Debug, Clone, PartialEq)]
pub enum ControlSettings {
    Arguments { adapt_delta: f64, max_treedepth: u32 },
    Nested(ControlBlock),
}

#[derive(Debug, Clone, PartialEq)]
pub struct ControlBlock {
    pub adapt_delta: f64,
    pub max_treedepth: u32,
}

/// MCMC sampler configuration shared by the joint fit and any refit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SamplerConfig {
    pub chains: usize,
    pub iterations: usize,
    pub warmup: usize,
    pub adapt_delta: f64,
    pub max_treedepth: u32,
    pub backend: SamplerBackend,
}

impl Default for SamplerConfig {
    fn default() -> Self {
        Self {
            chains: 4,
            iterations: 2000,
            warmup: 1000,
            adapt_delta: 0.95,
            max_treedepth: 12,
            backend: SamplerBackend::CommandLine,
        }
    }
}

impl SamplerConfig {
    pub fn draws_per_chain(&self) -> usize {
        self.iterations.saturating_sub(self.warmup)
    }

    /// Post-warmup draw pool across all chains.
    pub fn total_draws(&self) -> usize {
        self.chains * self.draws_per_chain()
    }

    /// Builds the control set in the representation the tagged backend
    /// expects. Refits must derive this from the original model's tag.
    pub fn control_settings(&self) -> ControlSettings {
        match self.backend {
            SamplerBackend::CommandLine => ControlSettings::Arguments {
                adapt_delta: self.adapt_delta,
                max_treedepth: self.max_treedepth,
            },
            SamplerBackend::InProcess => ControlSettings::Nested(ControlBlock {
                adapt_delta: self.adapt_delta,
                max_treedepth: self.max_treedepth,
            }),
        }
    }
}

/// The complete blueprint of a joint frequency-severity model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JointSpec {
    pub frequency: Formula,
    pub severity: Formula,
    pub frequency_family: FrequencyFamily,
    pub severity_family: SeverityFamily,
    /// Column holding each observation's deductible (left-truncation point).
    pub deductible_column: String,
    /// Column tagging each row as a frequency-row or severity-row.
    pub role_column: String,
    /// Minimum deductible survival probability admitted into the link.
    pub adjustment_floor: f64,
}

impl JointSpec {
    pub fn new(
        frequency: Formula,
        severity: Formula,
        frequency_family: FrequencyFamily,
        severity_family: SeverityFamily,
        deductible_column: impl Into<String>,
        role_column: impl Into<String>,
    ) -> Self {
        Self {
            frequency,
            severity,
            frequency_family,
            severity_family,
            deductible_column: deductible_column.into(),
            role_column: role_column.into(),
            adjustment_floor: DEFAULT_ADJUSTMENT_FLOOR,
        }
    }

    pub fn frequency_link(&self) -> LinkFunction {
        self.frequency_family.link()
    }

    /// Ordered severity distribution-parameter names.
    pub fn severity_parameters(&self) -> Vec<String> {
        self.severity_family.parameter_names()
    }
}

/// The serializable portion of a fitted joint model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Blueprint {
    pub spec: JointSpec,
    pub sampler: SamplerConfig,
    pub priors: Vec<Prior>,
}

/// Custom error type for blueprint loading and saving.
#[derive(Error, Debug)]
pub enum BlueprintError {
    #[error("Failed to read or write blueprint file: {0}")]
    IoError(#[from] std::io::Error),
    #[error("Failed to parse TOML blueprint file: {0}")]
    TomlParseError(#[from] toml::de::Error),
    #[error("Failed to serialize blueprint to TOML format: {0}")]
    TomlSerializeError(#[from] toml::ser::Error),
}

impl Blueprint {
    /// Saves the blueprint to a file in a human-readable TOML format.
    pub fn save(&self, path: &str) -> Result<(), BlueprintError> {
        let toml_string = toml::to_string_pretty(self)?;
        let mut file = BufWriter::new(fs::File::create(path)?);
        file.write_all(toml_string.as_bytes())?;
        Ok(())
    }

    /// Loads a blueprint from a TOML file.
    pub fn load(path: &str) -> Result<Self, BlueprintError> {
        let toml_string = fs::read_to_string(path)?;
        let blueprint = toml::from_str(&toml_string)?;
        Ok(blueprint)
    }
}

/// A fitted joint frequency-severity model.
///
/// `F` is the backend's opaque fitted-model handle.
#[derive(Debug)]
pub struct JointModel<F> {
    pub fitted: F,
    pub spec: JointSpec,
    pub sampler: SamplerConfig,
    pub priors: Vec<Prior>,
    /// The original tagged training data, row order untouched.
    pub data: DataFrame,
}

impl<F> JointModel<F> {
    /// Frequency-tagged rows with a stable row identifier appended.
    pub fn frequency_rows(&self) -> Result<DataFrame, DataError> {
        data::role_subset(&self.data, &self.spec.role_column, ModelRole::Frequency)
    }

    /// Severity-tagged rows with a stable row identifier appended.
    pub fn severity_rows(&self) -> Result<DataFrame, DataError> {
        data::role_subset(&self.data, &self.spec.role_column, ModelRole::Severity)
    }

    /// Serializable snapshot of the model's configuration.
    pub fn blueprint(&self) -> Blueprint {
        Blueprint {
            spec: self.spec.clone(),
            sampler: self.sampler.clone(),
            priors: self.priors.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn spec() -> JointSpec {
        JointSpec::new(
            Formula::new("claim_count", &["region", "vehicle_age"]),
            Formula::new("loss", &["region"]),
            FrequencyFamily::Poisson,
            SeverityFamily::LogNormal,
            "deductible",
            "role",
        )
    }

    #[test]
    fn prior_filtering_keeps_only_tagged_priors_and_clears_tags() {
        let priors = vec![
            Prior::new("Intercept", "normal(0, 5)").for_response("claim_count"),
            Prior::new("b", "normal(0, 1)")
                .for_response("claim_count")
                .on_coefficient("region"),
            Prior::new("b", "normal(0, 2)").for_response("loss"),
            Prior::new("sigma", "exponential(1)"),
        ];

        let filtered = priors_for_response(&priors, "claim_count");
        assert_eq!(filtered.len(), 2);
        assert!(filtered.iter().all(|p| p.response.is_none()));
        assert_eq!(filtered[0].class, "Intercept");
        assert_eq!(filtered[1].coefficient.as_deref(), Some("region"));
    }

    #[test]
    fn sampler_draw_pool_accounts_for_warmup_and_chains() {
        let sampler = SamplerConfig {
            chains: 4,
            iterations: 2000,
            warmup: 1000,
            ..SamplerConfig::default()
        };
        assert_eq!(sampler.draws_per_chain(), 1000);
        assert_eq!(sampler.total_draws(), 4000);
    }

    #[test]
    fn control_settings_follow_backend_tag() {
        let mut sampler = SamplerConfig::default();
        sampler.backend = SamplerBackend::CommandLine;
        match sampler.control_settings() {
            ControlSettings::Arguments {
                adapt_delta,
                max_treedepth,
            } => {
                assert_eq!(adapt_delta, sampler.adapt_delta);
                assert_eq!(max_treedepth, sampler.max_treedepth);
            }
            other => panic!("expected Arguments, got {other:?}"),
        }

        sampler.backend = SamplerBackend::InProcess;
        match sampler.control_settings() {
            ControlSettings::Nested(block) => {
                assert_eq!(block.adapt_delta, sampler.adapt_delta);
                assert_eq!(block.max_treedepth, sampler.max_treedepth);
            }
            other => panic!("expected Nested, got {other:?}"),
        }
    }

    #[test]
    fn blueprint_round_trips_through_toml() {
        let blueprint = Blueprint {
            spec: spec(),
            sampler: SamplerConfig::default(),
            priors: vec![Prior::new("b", "normal(0, 1)").for_response("claim_count")],
        };

        let dir = tempdir().unwrap();
        let path = dir.path().join("blueprint.toml");
        let path = path.to_str().unwrap();
        blueprint.save(path).unwrap();
        let reloaded = Blueprint::load(path).unwrap();
        assert_eq!(reloaded, blueprint);
    }

    #[test]
    fn severity_parameters_come_from_the_family() {
        assert_eq!(spec().severity_parameters(), vec!["mu", "sigma"]);
    }
}
