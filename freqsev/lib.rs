#![deny(dead_code)]
#![deny(unused_imports)]

//! # freqsev
//!
//! Bayesian frequency-severity claims modeling on top of a delegated MCMC
//! sampling engine. The crate owns the glue an actuarial workflow needs
//! (tagged claims tables, formula and prior handling, the deductible
//! survival adjustment) and hands every numerically heavy operation, from
//! sampling and posterior prediction to generic k-fold scoring, to a
//! backend consumed through the [`backend::FitEngine`] and
//! [`backend::CrossValidation`] traits.
//!
//! The one piece of real control logic lives in [`kfold`]: cross-validating
//! the frequency response of a joint fit first re-estimates the
//! per-observation deductible offset from posterior severity draws, refits
//! the frequency sub-model with that offset in its linear predictor, and
//! only then delegates to the generic k-fold routine.

pub mod backend;
pub mod data;
pub mod family;
pub mod fit;
pub mod formula;
pub mod kfold;
pub mod model;
pub mod offset;
pub mod probability;
pub mod simulate;
