use super::parsing::{parse_bool, parse_datetime, parse_number};
use super::stats;
use super::types::{
    Cell, ColumnKind, Dataset, TIME_UNIT, Value, cells, kind_of, non_null_count,
    series_from_cells, to_text,
};
use crate::config::{CleaningPlan, FillPlan, FillStrategy};
use crate::error::{Result, TablewashError};
use polars::prelude::*;
use std::collections::BTreeMap;

/// Repairs a private copy of a dataset.
///
/// Operations apply in call order and are idempotent on data they have
/// already cleaned. The dataset passed to [`Cleaner::new`] is never touched.
#[derive(Debug, Clone)]
pub struct Cleaner {
    df: Dataset,
    log: Vec<String>,
}

impl Cleaner {
    pub fn new(df: &Dataset) -> Self {
        Self {
            df: df.clone(),
            log: Vec::new(),
        }
    }

    pub fn dataset(&self) -> &Dataset {
        &self.df
    }

    pub fn into_dataset(self) -> Dataset {
        self.df
    }

    /// Human-readable record of every change made so far.
    pub fn log(&self) -> &[String] {
        &self.log
    }

    fn record(&mut self, entry: String) {
        tracing::info!("{entry}");
        self.log.push(entry);
    }

    /// Run a configured plan: duplicates, fill, outliers, corrections.
    ///
    /// # Errors
    ///
    /// Returns the first fill strategy that did not fit its column once the
    /// whole plan has run. Polars failures abort the plan immediately.
    pub fn apply_plan(&mut self, plan: &CleaningPlan) -> Result<()> {
        if plan.remove_duplicates {
            self.remove_duplicates()?;
        }
        let fill_result = self.fill_missing_values(&plan.fill).map(|_| ());
        if let Some(threshold) = plan.outlier_threshold {
            self.remove_outliers(threshold)?;
        }
        for (column, corrections) in &plan.corrections {
            self.correct_invalid_values(column, corrections)?;
        }
        fill_result
    }

    /// Keep the first row of every duplicate group. Returns rows removed.
    ///
    /// # Errors
    ///
    /// Propagates Polars errors from the de-duplication query.
    pub fn remove_duplicates(&mut self) -> Result<usize> {
        let before = self.df.height();
        if before < 2 {
            return Ok(0);
        }

        // all-null columns agree on every row
        let keys: Vec<String> = self
            .df
            .columns()
            .filter(|c| kind_of(c) != ColumnKind::Unknown)
            .map(|c| c.name().to_string())
            .collect();
        let unique = if keys.is_empty() {
            self.df.frame().slice(0, 1)
        } else {
            self.df
                .frame()
                .unique_stable(Some(&keys), UniqueKeepStrategy::First, None)?
        };
        self.df.set_frame(unique)?;

        let removed = before - self.df.height();
        if removed > 0 {
            self.record(format!("Removed {removed} duplicate rows"));
        }
        Ok(removed)
    }

    /// Fill missing cells column by column. Columns not in the plan keep their
    /// missing cells.
    ///
    /// Every entry is attempted. If any strategy did not fit its column, the
    /// first such error is returned after the others were applied.
    ///
    /// # Errors
    ///
    /// `UnsupportedStrategy` for mean or median on a non-numeric column,
    /// `EmptyColumn` for a statistic over a column with no values.
    pub fn fill_missing_values(&mut self, plan: &FillPlan) -> Result<usize> {
        let mut filled = 0;
        let mut first_error = None;

        for (name, strategy) in plan {
            match self.fill_column(name, strategy) {
                Ok(n) => filled += n,
                Err(e) => {
                    tracing::warn!("{e}");
                    first_error.get_or_insert(e);
                }
            }
        }

        match first_error {
            Some(e) => Err(e),
            None => Ok(filled),
        }
    }

    fn fill_column(&mut self, name: &str, strategy: &FillStrategy) -> Result<usize> {
        let Some(column) = self.df.column(name) else {
            tracing::warn!("Fill strategy for unknown column '{name}' ignored");
            return Ok(0);
        };
        let missing = column.null_count();
        if missing == 0 {
            return Ok(0);
        }
        let kind = kind_of(column);

        let (fill, fill_value) = match strategy {
            FillStrategy::Drop => {
                let keep = column.is_not_null();
                let removed = self.df.retain_rows(&keep)?;
                self.record(format!("Dropped {removed} rows with missing '{name}'"));
                return Ok(removed);
            }
            FillStrategy::Mean | FillStrategy::Median => {
                // a column with no values has nothing to average, whatever its kind
                if non_null_count(column) == 0 {
                    return Err(TablewashError::EmptyColumn {
                        column: name.to_owned(),
                    });
                }
                if kind != ColumnKind::Numeric {
                    return Err(TablewashError::UnsupportedStrategy {
                        column: name.to_owned(),
                        strategy: strategy.as_str().to_owned(),
                        kind,
                    });
                }
                if *strategy == FillStrategy::Mean {
                    (col(name).mean(), Value::Number(stats::mean(column)?))
                } else {
                    (col(name).median(), Value::Number(stats::median(column)?))
                }
            }
            FillStrategy::Mode => {
                let value = stats::mode(column)?;
                (literal(&value), value)
            }
            FillStrategy::Literal(raw) => {
                let value = convert_literal(raw, kind);
                let target = target_kind(kind, std::slice::from_ref(&value));
                if target != kind {
                    let converted = if kind == ColumnKind::Unknown {
                        column.cast(&target.dtype())?
                    } else {
                        to_text(column)?
                    };
                    self.df.replace_column(converted)?;
                }
                let value = fit_to(target, value);
                (literal(&value), value)
            }
        };

        let frame = self
            .df
            .lazy()
            .with_column(col(name).fill_null(fill))
            .collect()?;
        self.df.set_frame(frame)?;

        self.record(format!(
            "Filled {missing} missing values in '{name}' with {strategy}: {fill_value}"
        ));
        Ok(missing)
    }

    /// Drop every row whose z-score exceeds `threshold` in any numeric column.
    ///
    /// Z-scores for all columns come from the data as it was before this call,
    /// so removing a row never shifts the statistics of another column within
    /// the same pass.
    ///
    /// # Errors
    ///
    /// Propagates Polars errors from building or applying the row mask.
    pub fn remove_outliers(&mut self, threshold: f64) -> Result<usize> {
        let mut outliers = BooleanChunked::full("outlier".into(), false, self.df.height());
        let mut flagged_columns = BTreeMap::new();

        for column in self.df.columns() {
            if kind_of(column) != ColumnKind::Numeric || non_null_count(column) < 2 {
                continue;
            }
            let Ok(zscores) = stats::zscores(column) else {
                continue;
            };
            let flagged = zscores
                .apply_values(f64::abs)
                .gt(threshold)
                .fill_null_with_values(false)?;
            let count = flagged.sum().map_or(0, |n| n as usize);
            if count > 0 {
                flagged_columns.insert(column.name().to_string(), count);
                outliers = &outliers | &flagged;
            }
        }

        let removed = self.df.retain_rows(&!&outliers)?;
        if removed > 0 {
            let by_column: Vec<String> = flagged_columns
                .iter()
                .map(|(name, n)| format!("{name}: {n}"))
                .collect();
            self.record(format!(
                "Removed {removed} outlier rows (|z| > {threshold}; {})",
                by_column.join(", ")
            ));
        }
        Ok(removed)
    }

    /// Replace cells whose text exactly matches a key of `corrections`.
    ///
    /// # Errors
    ///
    /// Propagates Polars errors from rebuilding the column.
    pub fn correct_invalid_values(
        &mut self,
        column: &str,
        corrections: &BTreeMap<String, String>,
    ) -> Result<usize> {
        let Some(col) = self.df.column(column) else {
            tracing::warn!("Corrections for unknown column '{column}' ignored");
            return Ok(0);
        };
        let kind = kind_of(col);

        let targets: Vec<(usize, Value)> = cells(col)?
            .into_iter()
            .enumerate()
            .filter_map(|(idx, cell)| {
                let value = cell?;
                corrections
                    .get(&value.to_string())
                    .map(|fixed| (idx, convert_literal(fixed, kind)))
            })
            .collect();

        let count = self.apply_replacements(column, targets)?;
        if count > 0 {
            self.record(format!("Corrected {count} values in '{column}'"));
        }
        Ok(count)
    }

    /// Overwrite the given rows of one column, e.g. rows a check reported.
    ///
    /// # Errors
    ///
    /// Propagates Polars errors from rebuilding the column.
    pub fn replace_at_rows(
        &mut self,
        column: &str,
        rows: &[usize],
        replacement: &Cell,
    ) -> Result<usize> {
        let Some(col) = self.df.column(column) else {
            tracing::warn!("Row replacement for unknown column '{column}' ignored");
            return Ok(0);
        };
        let len = col.len();

        let count = match replacement {
            None => {
                let mut values = cells(col)?;
                let mut count = 0;
                for idx in rows {
                    if let Some(cell) = values.get_mut(*idx) {
                        *cell = None;
                        count += 1;
                    }
                }
                let rebuilt = series_from_cells(column, kind_of(col), &values)?;
                self.df.replace_column(rebuilt)?;
                count
            }
            Some(value) => {
                let targets = rows
                    .iter()
                    .filter(|idx| **idx < len)
                    .map(|idx| (*idx, value.clone()))
                    .collect();
                self.apply_replacements(column, targets)?
            }
        };

        if count > 0 {
            self.record(format!("Fixed {count} invalid values in '{column}'"));
        }
        Ok(count)
    }

    // Writes `targets` into the column, demoting it to text when a value does
    // not fit its kind.
    fn apply_replacements(&mut self, column: &str, targets: Vec<(usize, Value)>) -> Result<usize> {
        let Some(col) = self.df.column(column) else {
            return Ok(0);
        };
        if targets.is_empty() {
            return Ok(0);
        }
        let values: Vec<Value> = targets.iter().map(|(_, v)| v.clone()).collect();
        let target = target_kind(kind_of(col), &values);

        let mut updated = cells(col)?;
        let mut count = 0;
        for (idx, value) in targets {
            if let Some(cell) = updated.get_mut(idx) {
                *cell = Some(value);
                count += 1;
            }
        }
        let rebuilt = series_from_cells(column, target, &updated)?;
        self.df.replace_column(rebuilt)?;
        Ok(count)
    }
}

// Kind a column ends up with after `values` are written into it. Unknown
// columns adopt the kind of the first value; a mismatch degrades to text.
fn target_kind(kind: ColumnKind, values: &[Value]) -> ColumnKind {
    let kind = match (kind, values.first()) {
        (ColumnKind::Unknown, Some(first)) => ColumnKind::of(first),
        (kind, _) => kind,
    };
    if values.iter().any(|v| ColumnKind::of(v) != kind) {
        ColumnKind::Text
    } else {
        kind
    }
}

/// Interpret a configured literal in the column's own type when it fits.
fn convert_literal(raw: &str, kind: ColumnKind) -> Value {
    let converted = match kind {
        ColumnKind::Numeric => parse_number(raw).map(Value::Number),
        ColumnKind::Boolean => parse_bool(raw).map(Value::Bool),
        ColumnKind::DateTime => parse_datetime(raw).map(Value::DateTime),
        ColumnKind::Text | ColumnKind::Unknown => None,
    };
    converted.unwrap_or_else(|| Value::Text(raw.to_owned()))
}

fn fit_to(kind: ColumnKind, value: Value) -> Value {
    match (kind, value) {
        (ColumnKind::Text, value @ Value::Text(_)) => value,
        (ColumnKind::Text, other) => Value::Text(other.to_string()),
        (_, value) => value,
    }
}

// Polars literal in the storage dtype of the value's kind.
fn literal(value: &Value) -> Expr {
    match value {
        Value::Number(n) => lit(*n),
        Value::Bool(b) => lit(*b),
        Value::Text(s) => lit(s.clone()),
        Value::DateTime(dt) => {
            lit(dt.and_utc().timestamp_micros()).cast(DataType::Datetime(TIME_UNIT, None))
        }
    }
}
