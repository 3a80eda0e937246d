//! Distribution families and link functions.
//!
//! The severity side is an enumerated registry: each built-in family knows
//! its ordered distribution-parameter names and its cumulative distribution
//! function, exposed through [`SeverityFamily::distribution_fn`]. A lookup
//! miss (a [`SeverityFamily::Custom`] family) is an explicit `None`, which
//! callers must cover with their own function; there is no silent default.
//!
//! Distribution functions share one calling convention,
//! `fn(x, &[f64]) -> f64`, with the parameter slice in the family's declared
//! order. Arity is validated by the offset computation, never assumed here.

use crate::probability::{normal_cdf, reg_lower_gamma};
use serde::{Deserialize, Serialize};

/// Cumulative distribution function under the uniform ordered-parameter
/// calling convention.
pub type DistributionFn = fn(f64, &[f64]) -> f64;

/// Maximum number of severity distribution parameters the adjustment
/// pipeline supports.
pub const MAX_SEVERITY_PARAMETERS: usize = 5;

/// Severity loss-size families.
///
/// `Custom` carries the caller's parameter names; its distribution function
/// must be supplied at the call site.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum SeverityFamily {
    /// rate
    Exponential,
    /// mu, sigma (log scale)
    LogNormal,
    /// shape, rate
    Gamma,
    /// shape, scale
    Weibull,
    /// shape, scale (Lomax / Pareto type II)
    Pareto,
    /// shape1, shape2, scale
    Burr,
    Custom {
        name: String,
        parameters: Vec<String>,
    },
}

impl SeverityFamily {
    /// Family identifier used in error messages and the blueprint artifact.
    pub fn name(&self) -> &str {
        match self {
            SeverityFamily::Exponential => "exponential",
            SeverityFamily::LogNormal => "lognormal",
            SeverityFamily::Gamma => "gamma",
            SeverityFamily::Weibull => "weibull",
            SeverityFamily::Pareto => "pareto",
            SeverityFamily::Burr => "burr",
            SeverityFamily::Custom { name, .. } => name,
        }
    }

    /// Ordered distribution-parameter names, as the backend reports them.
    pub fn parameter_names(&self) -> Vec<String> {
        let fixed: &[&str] = match self {
            SeverityFamily::Exponential => &["rate"],
            SeverityFamily::LogNormal => &["mu", "sigma"],
            SeverityFamily::Gamma => &["shape", "rate"],
            SeverityFamily::Weibull => &["shape", "scale"],
            SeverityFamily::Pareto => &["shape", "scale"],
            SeverityFamily::Burr => &["shape1", "shape2", "scale"],
            SeverityFamily::Custom { parameters, .. } => {
                return parameters.clone();
            }
        };
        fixed.iter().map(|s| s.to_string()).collect()
    }

    /// Registered CDF for the family, or `None` when the family is custom
    /// and the caller must provide one.
    pub fn distribution_fn(&self) -> Option<DistributionFn> {
        match self {
            SeverityFamily::Exponential => Some(exponential_cdf),
            SeverityFamily::LogNormal => Some(lognormal_cdf),
            SeverityFamily::Gamma => Some(gamma_cdf),
            SeverityFamily::Weibull => Some(weibull_cdf),
            SeverityFamily::Pareto => Some(pareto_cdf),
            SeverityFamily::Burr => Some(burr_cdf),
            SeverityFamily::Custom { .. } => None,
        }
    }
}

/// Frequency claim-count families.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FrequencyFamily {
    Poisson,
    NegativeBinomial,
}

impl FrequencyFamily {
    /// Canonical link of the family's mean parameter.
    pub fn link(&self) -> LinkFunction {
        match self {
            FrequencyFamily::Poisson | FrequencyFamily::NegativeBinomial => LinkFunction::Log,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            FrequencyFamily::Poisson => "poisson",
            FrequencyFamily::NegativeBinomial => "negbinomial",
        }
    }
}

/// Link function connecting the linear predictor to the mean response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LinkFunction {
    Log,
    Identity,
    Logit,
}

impl LinkFunction {
    /// Applies the link to a mean-scale value.
    ///
    /// Survival adjustments are floored above zero before reaching a `Log`
    /// or `Logit` link, so the restricted domains are respected upstream.
    #[inline]
    pub fn apply(&self, value: f64) -> f64 {
        match self {
            LinkFunction::Log => value.ln(),
            LinkFunction::Identity => value,
            LinkFunction::Logit => (value / (1.0 - value)).ln(),
        }
    }
}

// --- Registered CDFs ---
// Losses are non-negative; every CDF returns 0 for x <= 0.

fn exponential_cdf(x: f64, params: &[f64]) -> f64 {
    if x <= 0.0 {
        return 0.0;
    }
    let rate = params[0];
    1.0 - (-rate * x).exp()
}

fn lognormal_cdf(x: f64, params: &[f64]) -> f64 {
    if x <= 0.0 {
        return 0.0;
    }
    let (mu, sigma) = (params[0], params[1]);
    normal_cdf((x.ln() - mu) / sigma)
}

fn gamma_cdf(x: f64, params: &[f64]) -> f64 {
    if x <= 0.0 {
        return 0.0;
    }
    let (shape, rate) = (params[0], params[1]);
    reg_lower_gamma(shape, rate * x)
}

fn weibull_cdf(x: f64, params: &[f64]) -> f64 {
    if x <= 0.0 {
        return 0.0;
    }
    let (shape, scale) = (params[0], params[1]);
    1.0 - (-(x / scale).powf(shape)).exp()
}

fn pareto_cdf(x: f64, params: &[f64]) -> f64 {
    if x <= 0.0 {
        return 0.0;
    }
    let (shape, scale) = (params[0], params[1]);
    1.0 - (1.0 + x / scale).powf(-shape)
}

fn burr_cdf(x: f64, params: &[f64]) -> f64 {
    if x <= 0.0 {
        return 0.0;
    }
    let (shape1, shape2, scale) = (params[0], params[1], params[2]);
    1.0 - (1.0 + (x / scale).powf(shape1)).powf(-shape2)
}
