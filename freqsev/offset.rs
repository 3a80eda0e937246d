//! Deductible survival adjustment.
//!
//! For every frequency-model row the severity model implies a probability
//! that a loss exceeds the row's deductible and is observed at all. The
//! frequency mean must be corrected by exactly that probability, so the
//! adjustment is estimated from posterior severity draws: per (draw, row)
//! pair, survival = 1 − CDF(deductible; that draw's parameters), floored,
//! passed through the frequency link, then averaged over draws. The result
//! is one offset scalar per row, keyed by row position.
//!
//! The draw-by-row parameter values arrive as one `(draws × rows)` matrix
//! per distribution parameter; rows are the join key, the parameter order
//! is the family's declared order.

use crate::family::{LinkFunction, MAX_SEVERITY_PARAMETERS};
use ndarray::{Array1, Array2};
use thiserror::Error;

/// Column the computed adjustment is written to, and the offset term the
/// refit frequency formula references.
pub const ADJUSTMENT_COLUMN: &str = "severity_adjustment";

/// Errors in the adjustment computation.
#[derive(Error, Debug)]
pub enum AdjustmentError {
    #[error("only 1-5 severity distribution parameters are supported, got {0}")]
    UnsupportedArity(usize),
    #[error(
        "posterior expectation matrix for parameter {parameter_index} has shape ({found_draws}, {found_rows}), expected ({draws}, {rows})"
    )]
    ShapeMismatch {
        parameter_index: usize,
        found_draws: usize,
        found_rows: usize,
        draws: usize,
        rows: usize,
    },
    #[error("no frequency rows to adjust")]
    NoRows,
    #[error("no posterior draws to average over")]
    NoDraws,
}

/// Computes the per-row deductible adjustment.
///
/// * `deductibles`: one deductible per frequency row.
/// * `parameter_draws`: one `(draws × rows)` matrix per severity
///   distribution parameter, in the family's declared order.
/// * `distribution`: CDF under the uniform ordered-parameter convention.
/// * `link`: the frequency family's link function.
/// * `floor`: minimum admitted survival probability.
///
/// Returns exactly one offset scalar per row, in row order.
pub fn deductible_adjustment(
    deductibles: &[f64],
    parameter_draws: &[Array2<f64>],
    distribution: &dyn Fn(f64, &[f64]) -> f64,
    link: LinkFunction,
    floor: f64,
) -> Result<Array1<f64>, AdjustmentError> {
    let arity = parameter_draws.len();
    if arity == 0 || arity > MAX_SEVERITY_PARAMETERS {
        return Err(AdjustmentError::UnsupportedArity(arity));
    }
    let rows = deductibles.len();
    if rows == 0 {
        return Err(AdjustmentError::NoRows);
    }
    let draws = parameter_draws[0].nrows();
    if draws == 0 {
        return Err(AdjustmentError::NoDraws);
    }
    for (parameter_index, matrix) in parameter_draws.iter().enumerate() {
        if matrix.nrows() != draws || matrix.ncols() != rows {
            return Err(AdjustmentError::ShapeMismatch {
                parameter_index,
                found_draws: matrix.nrows(),
                found_rows: matrix.ncols(),
                draws,
                rows,
            });
        }
    }

    let mut offsets = Array1::<f64>::zeros(rows);
    let mut params = [0.0_f64; MAX_SEVERITY_PARAMETERS];
    for (row, &deductible) in deductibles.iter().enumerate() {
        let mut acc = 0.0;
        for draw in 0..draws {
            for (slot, matrix) in params[..arity].iter_mut().zip(parameter_draws) {
                *slot = matrix[[draw, row]];
            }
            let survival = 1.0 - distribution(deductible, &params[..arity]);
            acc += link.apply(survival.max(floor));
        }
        offsets[row] = acc / draws as f64;
    }
    Ok(offsets)
}

/// Number of draws to subsample for the adjustment estimate:
/// `min(ceil(ceiling / rows), total_draws)`, never below one.
///
/// Callers guarantee a non-empty draw pool and at least one row.
pub fn subsample_size(ceiling: f64, rows: usize, total_draws: usize) -> usize {
    let per_row = (ceiling / rows as f64).ceil() as usize;
    per_row.clamp(1, total_draws)
}
