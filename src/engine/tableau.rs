//! Shape a cleaned dataset for Tableau: safe column names, real types, and a
//! dimension/measure guide to go with the exported metadata.

use super::naming::sanitize_column_names;
use super::parsing::{parse_bool, parse_datetime, parse_number, parse_rate};
use super::types::{
    Cell, ColumnKind, Dataset, Value, cells, distinct_count, first_value, kind_of,
    series_from_cells,
};
use crate::config::PrepSettings;
use crate::error::Result;
use polars::prelude::*;
use serde::Serialize;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldRole {
    Dimension,
    Measure,
    DateField,
    /// Only returned for names the guide does not know.
    Unknown,
}

impl FieldRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Dimension => "dimension",
            Self::Measure => "measure",
            Self::DateField => "date_field",
            Self::Unknown => "unknown",
        }
    }
}

/// Column names grouped by role, each group in column order.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct FieldGuide {
    pub dimensions: Vec<String>,
    pub measures: Vec<String>,
    pub date_fields: Vec<String>,
}

impl FieldGuide {
    pub fn role_of(&self, name: &str) -> FieldRole {
        if self.date_fields.iter().any(|n| n == name) {
            FieldRole::DateField
        } else if self.measures.iter().any(|n| n == name) {
            FieldRole::Measure
        } else if self.dimensions.iter().any(|n| n == name) {
            FieldRole::Dimension
        } else {
            FieldRole::Unknown
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct TypeChange {
    pub column: String,
    pub from: ColumnKind,
    pub to: ColumnKind,
    /// Cells that did not parse and became missing.
    pub nulled: usize,
}

/// One row of the exported metadata table.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ColumnMetadata {
    #[serde(rename = "column_name")]
    pub name: String,
    pub original_name: String,
    #[serde(rename = "data_type")]
    pub kind: ColumnKind,
    pub role: FieldRole,
    pub null_count: usize,
    pub null_percentage: f64,
    pub distinct_count: usize,
    #[serde(rename = "sample_value")]
    pub sample: Option<String>,
    #[serde(rename = "min_value")]
    pub min: Option<String>,
    #[serde(rename = "max_value")]
    pub max: Option<String>,
}

#[derive(Debug, Clone)]
pub struct TableauPrep {
    df: Dataset,
    original_names: Vec<String>,
    settings: PrepSettings,
    log: Vec<String>,
}

impl TableauPrep {
    pub fn new(df: &Dataset, settings: PrepSettings) -> Self {
        Self {
            original_names: df.column_names(),
            df: df.clone(),
            settings,
            log: Vec::new(),
        }
    }

    pub fn with_defaults(df: &Dataset) -> Self {
        Self::new(df, PrepSettings::default())
    }

    pub fn dataset(&self) -> &Dataset {
        &self.df
    }

    pub fn into_dataset(self) -> Dataset {
        self.df
    }

    pub fn log(&self) -> &[String] {
        &self.log
    }

    fn record(&mut self, entry: String) {
        tracing::info!("{entry}");
        self.log.push(entry);
    }

    /// Rename every column to a Tableau-safe, unique name. Returns the number
    /// of columns renamed.
    ///
    /// # Errors
    ///
    /// Propagates Polars errors from rebuilding the frame.
    pub fn clean_column_names(&mut self) -> Result<usize> {
        let current = self.df.column_names();
        let cleaned = sanitize_column_names(&current, self.settings.title_case_names);
        let renames: Vec<String> = current
            .iter()
            .zip(&cleaned)
            .filter(|(old, new)| old != new)
            .map(|(old, new)| format!("'{old}' -> '{new}'"))
            .collect();
        if renames.is_empty() {
            return Ok(0);
        }

        self.df.set_column_names(&cleaned)?;
        let count = renames.len();
        self.record(format!("Renamed {count} columns: {}", renames.join(", ")));
        Ok(count)
    }

    /// Coerce text columns to boolean, datetime or numeric, in that order of
    /// preference. Columns that already carry a concrete type are left alone.
    ///
    /// # Errors
    ///
    /// Propagates Polars errors from reading or rebuilding a column.
    pub fn enforce_data_types(&mut self) -> Result<Vec<TypeChange>> {
        let mut converted = Vec::new();
        for column in self.df.columns() {
            if kind_of(column) != ColumnKind::Text {
                continue;
            }
            if let Some(result) = coerce_column(column, &self.settings)? {
                converted.push(result);
            }
        }

        let mut changes = Vec::with_capacity(converted.len());
        for (series, change) in converted {
            self.df.replace_column(series)?;
            let nulled = if change.nulled > 0 {
                format!(" ({} unparseable values set to missing)", change.nulled)
            } else {
                String::new()
            };
            self.record(format!(
                "Converted '{}' from {} to {}{nulled}",
                change.column, change.from, change.to
            ));
            changes.push(change);
        }
        Ok(changes)
    }

    /// # Errors
    ///
    /// Propagates Polars errors from counting distinct values.
    pub fn create_dimension_measure_guide(&self) -> Result<FieldGuide> {
        let rows = self.df.height();
        let mut guide = FieldGuide::default();
        for column in self.df.columns() {
            let name = column.name().to_string();
            match self.classify(column, rows)? {
                FieldRole::DateField => guide.date_fields.push(name),
                FieldRole::Measure => guide.measures.push(name),
                FieldRole::Dimension | FieldRole::Unknown => guide.dimensions.push(name),
            }
        }
        tracing::debug!(
            "Field guide: {} dimensions, {} measures, {} date fields",
            guide.dimensions.len(),
            guide.measures.len(),
            guide.date_fields.len()
        );
        Ok(guide)
    }

    fn classify(&self, column: &Series, rows: usize) -> Result<FieldRole> {
        let role = match kind_of(column) {
            ColumnKind::DateTime => FieldRole::DateField,
            ColumnKind::Numeric if rows > 0 => {
                let distinct = distinct_count(column)?;
                let unique_ratio = distinct as f64 / rows as f64;
                if distinct > self.settings.measure_min_distinct
                    && unique_ratio > self.settings.measure_min_unique_ratio
                {
                    FieldRole::Measure
                } else {
                    FieldRole::Dimension
                }
            }
            _ => FieldRole::Dimension,
        };
        Ok(role)
    }

    /// # Errors
    ///
    /// Propagates Polars errors from the per-column summaries.
    pub fn generate_metadata(&self) -> Result<Vec<ColumnMetadata>> {
        let guide = self.create_dimension_measure_guide()?;
        let rows = self.df.height();
        self.df
            .columns()
            .enumerate()
            .map(|(idx, column)| {
                let name = column.name().to_string();
                let original_name = self
                    .original_names
                    .get(idx)
                    .cloned()
                    .unwrap_or_else(|| name.clone());
                let role = guide.role_of(&name);
                let null_count = column.null_count();
                let (min, max) = value_range(column)?;
                Ok(ColumnMetadata {
                    name,
                    original_name,
                    kind: kind_of(column),
                    role,
                    null_count,
                    null_percentage: if rows == 0 {
                        0.0
                    } else {
                        null_count as f64 / rows as f64 * 100.0
                    },
                    distinct_count: distinct_count(column)?,
                    sample: first_value(column)?.map(|v| v.to_string()),
                    min,
                    max,
                })
            })
            .collect()
    }
}

// The coerced column and what changed, or `None` when no type fits.
fn coerce_column(column: &Series, settings: &PrepSettings) -> Result<Option<(Series, TypeChange)>> {
    let current = cells(column)?;
    let raw: Vec<String> = current.iter().flatten().map(Value::to_string).collect();
    if raw.is_empty() {
        return Ok(None);
    }
    let sample = || raw.iter().take(settings.sample_size).map(String::as_str);
    let confident = |rate: f64| rate >= settings.coercion_confidence;

    let (to, convert): (ColumnKind, fn(&str) -> Option<Value>) =
        if raw.iter().all(|v| parse_bool(v).is_some()) {
            (ColumnKind::Boolean, |s: &str| parse_bool(s).map(Value::Bool))
        } else if confident(parse_rate(sample(), |s| parse_datetime(s).is_some())) {
            (ColumnKind::DateTime, |s: &str| parse_datetime(s).map(Value::DateTime))
        } else if confident(parse_rate(sample(), |s| parse_number(s).is_some())) {
            (ColumnKind::Numeric, |s: &str| parse_number(s).map(Value::Number))
        } else {
            return Ok(None);
        };

    let mut nulled = 0;
    let converted: Vec<Cell> = current
        .iter()
        .map(|cell| {
            let value = cell.as_ref()?;
            let parsed = convert(&value.to_string());
            if parsed.is_none() {
                nulled += 1;
            }
            parsed
        })
        .collect();

    let name = column.name().as_str();
    tracing::debug!("Coerced '{name}' to {to}");
    let series = series_from_cells(name, to, &converted)?;
    Ok(Some((
        series,
        TypeChange {
            column: name.to_owned(),
            from: kind_of(column),
            to,
            nulled,
        },
    )))
}

// Only ordered kinds have a meaningful range.
fn value_range(column: &Series) -> Result<(Option<String>, Option<String>)> {
    let range = match kind_of(column) {
        ColumnKind::Numeric => {
            let numbers = column.f64()?;
            (
                numbers.min().map(|n| Value::Number(n).to_string()),
                numbers.max().map(|n| Value::Number(n).to_string()),
            )
        }
        ColumnKind::DateTime => {
            let dates: Vec<_> = cells(column)?
                .into_iter()
                .filter_map(|cell| match cell {
                    Some(Value::DateTime(dt)) => Some(dt),
                    _ => None,
                })
                .collect();
            (
                dates.iter().min().map(|dt| Value::DateTime(*dt).to_string()),
                dates.iter().max().map(|dt| Value::DateTime(*dt).to_string()),
            )
        }
        ColumnKind::Text | ColumnKind::Boolean | ColumnKind::Unknown => (None, None),
    };
    Ok(range)
}
