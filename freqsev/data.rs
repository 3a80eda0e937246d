//! # Claims Data Loading and Validation
//!
//! Entry point for user-provided claims tables. A joint frequency-severity
//! fit consumes one table holding both kinds of rows, distinguished by a
//! role column: frequency rows describe a policy's claim count and
//! deductible, severity rows describe one observed loss above its
//! deductible.
//!
//! - Strict schema: the role column must contain exactly the tags
//!   `"frequency"` and `"severity"`; numeric columns must be castable to
//!   f64, complete, and finite.
//! - User-centric errors: failures are assumed to be user-input errors and
//!   the `DataError` enum is written to be actionable.

use polars::prelude::*;
use std::fs::File;
use std::path::Path;
use thiserror::Error;

/// Name of the stable row identifier appended when a role subset is taken.
pub const ROW_ID_COLUMN: &str = "row_id";

/// Which sub-model a table row belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModelRole {
    Frequency,
    Severity,
}

impl ModelRole {
    /// Tag value stored in the role column.
    pub fn tag(&self) -> &'static str {
        match self {
            ModelRole::Frequency => "frequency",
            ModelRole::Severity => "severity",
        }
    }
}

/// A comprehensive error type for all data loading and validation failures.
#[derive(Error, Debug)]
pub enum DataError {
    #[error("Error from the underlying Polars DataFrame library: {0}")]
    PolarsError(#[from] PolarsError),
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
    #[error(
        "The required column '{0}' was not found in the claims table. Please check spelling and case."
    )]
    ColumnNotFound(String),
    #[error(
        "The required column '{column_name}' could not be converted to the expected type '{expected_type}'. (Found type: {found_type})"
    )]
    ColumnWrongType {
        column_name: String,
        expected_type: &'static str,
        found_type: String,
    },
    #[error(
        "Missing or null values were found in the required column '{0}'. Joint fitting requires complete data."
    )]
    MissingValuesFound(String),
    #[error(
        "Non-finite values (NaN or Infinity) were found in the required column '{0}'. All data must be finite."
    )]
    NonFiniteValuesFound(String),
    #[error(
        "The role column '{column}' contains the unknown tag '{tag}'. Only 'frequency' and 'severity' rows are supported."
    )]
    UnknownRoleTag { column: String, tag: String },
    #[error("The claims table contains no '{0}' rows. A joint fit needs both kinds.")]
    EmptyRole(&'static str),
}

/// Reads a comma-separated claims table from disk.
///
/// Schema validation happens later, against a concrete joint specification;
/// this only materializes the frame.
pub fn load_claims_csv(path: &str) -> Result<DataFrame, DataError> {
    log::info!("Loading claims table from '{path}'");
    let df = CsvReader::new(File::open(Path::new(path))?)
        .with_options(CsvReadOptions::default().with_has_header(true))
        .finish()?;
    log::info!("Loaded {} rows from '{path}'", df.height());
    Ok(df)
}

/// Extracts a complete, finite numeric column as `Vec<f64>`.
pub fn numeric_column(df: &DataFrame, column_name: &str) -> Result<Vec<f64>, DataError> {
    let column = df
        .column(column_name)
        .map_err(|_| DataError::ColumnNotFound(column_name.to_string()))?;
    if column.null_count() > 0 {
        return Err(DataError::MissingValuesFound(column_name.to_string()));
    }

    let casted = match column.cast(&DataType::Float64) {
        Ok(casted) => casted,
        Err(_) => {
            return Err(DataError::ColumnWrongType {
                column_name: column_name.to_string(),
                expected_type: "f64 (numeric)",
                found_type: format!("{:?}", column.dtype()),
            });
        }
    };
    if casted.null_count() > 0 {
        return Err(DataError::ColumnWrongType {
            column_name: column_name.to_string(),
            expected_type: "f64 (numeric)",
            found_type: format!("{:?}", column.dtype()),
        });
    }

    let chunked = casted.f64()?.rechunk();
    let values: Vec<f64> = chunked.into_no_null_iter().collect();
    if values.iter().any(|v| !v.is_finite()) {
        return Err(DataError::NonFiniteValuesFound(column_name.to_string()));
    }
    Ok(values)
}

/// Validates the role column: present, complete, and restricted to the two
/// supported tags, with at least one row of each.
pub fn validate_roles(df: &DataFrame, role_column: &str) -> Result<(), DataError> {
    let tags = role_tags(df, role_column)?;
    let mut frequency_rows = 0usize;
    let mut severity_rows = 0usize;
    for tag in &tags {
        match tag.as_str() {
            t if t == ModelRole::Frequency.tag() => frequency_rows += 1,
            t if t == ModelRole::Severity.tag() => severity_rows += 1,
            other => {
                return Err(DataError::UnknownRoleTag {
                    column: role_column.to_string(),
                    tag: other.to_string(),
                });
            }
        }
    }
    if frequency_rows == 0 {
        return Err(DataError::EmptyRole(ModelRole::Frequency.tag()));
    }
    if severity_rows == 0 {
        return Err(DataError::EmptyRole(ModelRole::Severity.tag()));
    }
    Ok(())
}

/// Restricts the table to rows of one role, preserving the original row
/// order, and appends a stable [`ROW_ID_COLUMN`] identifier.
pub fn role_subset(
    df: &DataFrame,
    role_column: &str,
    role: ModelRole,
) -> Result<DataFrame, DataError> {
    let column = df
        .column(role_column)
        .map_err(|_| DataError::ColumnNotFound(role_column.to_string()))?;
    let tags = column.str().map_err(|_| DataError::ColumnWrongType {
        column_name: role_column.to_string(),
        expected_type: "string role tags",
        found_type: format!("{:?}", column.dtype()),
    })?;

    let mask = tags.equal(role.tag());
    let subset = df.filter(&mask)?;
    if subset.height() == 0 {
        return Err(DataError::EmptyRole(role.tag()));
    }
    let subset = subset.with_row_index(ROW_ID_COLUMN.into(), None)?;
    Ok(subset)
}

fn role_tags(df: &DataFrame, role_column: &str) -> Result<Vec<String>, DataError> {
    let column = df
        .column(role_column)
        .map_err(|_| DataError::ColumnNotFound(role_column.to_string()))?;
    if column.null_count() > 0 {
        return Err(DataError::MissingValuesFound(role_column.to_string()));
    }
    let tags = column.str().map_err(|_| DataError::ColumnWrongType {
        column_name: role_column.to_string(),
        expected_type: "string role tags",
        found_type: format!("{:?}", column.dtype()),
    })?;
    Ok(tags.into_iter().flatten().map(|s| s.to_string()).collect())
}
