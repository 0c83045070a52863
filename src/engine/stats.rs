//! Column statistics shared by validation and cleaning.
//!
//! Every function ignores missing cells and fails with
//! [`TablewashError::EmptyColumn`] when nothing is left to summarise.

use super::types::{ColumnKind, Value, cells, kind_of};
use crate::error::{Result, TablewashError};
use polars::prelude::*;

const COUNT: &str = "__count";

fn empty(column: &Series) -> TablewashError {
    TablewashError::EmptyColumn {
        column: column.name().to_string(),
    }
}

fn numeric(column: &Series) -> Result<Float64Chunked> {
    let kind = kind_of(column);
    if kind != ColumnKind::Numeric {
        return Err(TablewashError::NonNumericColumn {
            column: column.name().to_string(),
            kind,
        });
    }
    let floats = column.cast(&DataType::Float64)?;
    let ca = floats.f64()?.clone();
    if ca.null_count() == ca.len() {
        return Err(empty(column));
    }
    Ok(ca)
}

/// # Errors
///
/// `NonNumericColumn` for other kinds, `EmptyColumn` when every cell is missing.
pub fn mean(column: &Series) -> Result<f64> {
    numeric(column)?.mean().ok_or_else(|| empty(column))
}

/// # Errors
///
/// `NonNumericColumn` for other kinds, `EmptyColumn` when every cell is missing.
pub fn median(column: &Series) -> Result<f64> {
    numeric(column)?.median().ok_or_else(|| empty(column))
}

/// Population standard deviation (divides by n).
///
/// # Errors
///
/// `NonNumericColumn` for other kinds, `EmptyColumn` when every cell is missing.
pub fn std_dev(column: &Series) -> Result<f64> {
    numeric(column)?.std(0).ok_or_else(|| empty(column))
}

/// Most frequent non-missing value of any kind. Ties go to the value seen first.
///
/// # Errors
///
/// `EmptyColumn` when every cell is missing.
pub fn mode(column: &Series) -> Result<Value> {
    let present = column.drop_nulls();
    if present.is_empty() {
        return Err(empty(column));
    }

    let name = present.name().clone();
    let counts = DataFrame::new(vec![present.into_column()])?
        .lazy()
        .group_by_stable([col(name.clone())])
        .agg([len().alias(COUNT)])
        .collect()?;

    let tally = counts
        .column(COUNT)?
        .as_materialized_series()
        .cast(&DataType::UInt64)?;
    let mut best: Option<(usize, u64)> = None;
    for (idx, count) in tally.u64()?.into_iter().enumerate() {
        let count = count.unwrap_or(0);
        if best.is_none_or(|(_, top)| count > top) {
            best = Some((idx, count));
        }
    }

    let values = cells(counts.column(name.as_str())?.as_materialized_series())?;
    best.and_then(|(idx, _)| values.into_iter().nth(idx).flatten())
        .ok_or_else(|| empty(column))
}

/// Z-score per row, aligned with the column. Missing cells stay missing.
/// A column without variation scores 0 everywhere.
///
/// # Errors
///
/// `NonNumericColumn` for other kinds, `EmptyColumn` when every cell is missing.
pub fn zscores(column: &Series) -> Result<Float64Chunked> {
    let ca = numeric(column)?;
    let mean = ca.mean().ok_or_else(|| empty(column))?;
    let std = ca.std(0).ok_or_else(|| empty(column))?;
    if std == 0.0 {
        Ok(ca.apply_values(|_| 0.0))
    } else {
        Ok(ca.apply_values(|v| (v - mean) / std))
    }
}
