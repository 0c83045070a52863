//! Dataset model. A [`Dataset`] is a Polars `DataFrame` whose columns are kept
//! in one storage dtype per [`ColumnKind`], so the kind of every column can be
//! read straight off its dtype.

use crate::error::{Result, TablewashError};
use chrono::{DateTime, NaiveDateTime, NaiveTime, Timelike as _};
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Unit every datetime column is stored in.
pub const TIME_UNIT: TimeUnit = TimeUnit::Microseconds;

// DATA STRUCTURES

/// Semantic type tag carried by every column.
#[derive(Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, Hash, Debug)]
#[serde(rename_all = "lowercase")]
pub enum ColumnKind {
    Numeric,
    Text,
    Boolean,
    #[serde(rename = "datetime")]
    DateTime,
    #[default]
    Unknown,
}

impl ColumnKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Numeric => "numeric",
            Self::Text => "text",
            Self::Boolean => "boolean",
            Self::DateTime => "datetime",
            Self::Unknown => "unknown",
        }
    }

    /// Kind a freshly built value belongs to.
    pub fn of(value: &Value) -> Self {
        match value {
            Value::Number(_) => Self::Numeric,
            Value::Text(_) => Self::Text,
            Value::Bool(_) => Self::Boolean,
            Value::DateTime(_) => Self::DateTime,
        }
    }

    /// Kind of a column holding `dtype`. An all-null column is unknown.
    pub fn from_dtype(dtype: &DataType) -> Self {
        match dtype {
            DataType::Boolean => Self::Boolean,
            DataType::String => Self::Text,
            DataType::Datetime(_, _) | DataType::Date => Self::DateTime,
            DataType::Null => Self::Unknown,
            other if other.is_primitive_numeric() => Self::Numeric,
            _ => Self::Text,
        }
    }

    /// Storage dtype for columns of this kind.
    pub fn dtype(&self) -> DataType {
        match self {
            Self::Numeric => DataType::Float64,
            Self::Text => DataType::String,
            Self::Boolean => DataType::Boolean,
            Self::DateTime => DataType::Datetime(TIME_UNIT, None),
            Self::Unknown => DataType::Null,
        }
    }
}

impl fmt::Display for ColumnKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A present cell value. Missing cells are `None` in a [`Cell`].
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Value {
    Number(f64),
    Bool(bool),
    DateTime(NaiveDateTime),
    Text(String),
}

pub type Cell = Option<Value>;

impl Value {
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Number(n) => Some(*n),
            _ => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Number(n) => {
                if n.fract() == 0.0 && n.abs() < 1e15 {
                    write!(f, "{n:.0}")
                } else {
                    write!(f, "{n}")
                }
            }
            Self::Text(s) => f.write_str(s),
            Self::Bool(b) => write!(f, "{b}"),
            Self::DateTime(dt) => {
                let format = if dt.time() == NaiveTime::MIN {
                    "%Y-%m-%d"
                } else if dt.nanosecond() == 0 {
                    "%Y-%m-%d %H:%M:%S"
                } else {
                    "%Y-%m-%d %H:%M:%S%.f"
                };
                write!(f, "{}", dt.format(format))
            }
        }
    }
}

fn to_micros(dt: &NaiveDateTime) -> i64 {
    dt.and_utc().timestamp_micros()
}

fn from_micros(micros: i64) -> Option<NaiveDateTime> {
    DateTime::from_timestamp_micros(micros).map(|dt| dt.naive_utc())
}

// COLUMN HELPERS

pub fn kind_of(column: &Series) -> ColumnKind {
    ColumnKind::from_dtype(column.dtype())
}

/// Every cell of a column in row order, missing cells as `None`.
///
/// # Errors
///
/// Propagates Polars errors from casting to the storage dtype.
pub fn cells(column: &Series) -> Result<Vec<Cell>> {
    let cells = match kind_of(column) {
        ColumnKind::Numeric => {
            let floats = column.cast(&DataType::Float64)?;
            floats
                .f64()?
                .into_iter()
                .map(|v| v.map(Value::Number))
                .collect()
        }
        ColumnKind::Text => {
            let text = column.cast(&DataType::String)?;
            text.str()?
                .into_iter()
                .map(|v| v.map(|s| Value::Text(s.to_owned())))
                .collect()
        }
        ColumnKind::Boolean => column
            .bool()?
            .into_iter()
            .map(|v| v.map(Value::Bool))
            .collect(),
        ColumnKind::DateTime => {
            let physical = column
                .cast(&ColumnKind::DateTime.dtype())?
                .cast(&DataType::Int64)?;
            physical
                .i64()?
                .into_iter()
                .map(|v| v.and_then(from_micros).map(Value::DateTime))
                .collect()
        }
        ColumnKind::Unknown => vec![None; column.len()],
    };
    Ok(cells)
}

/// Non-missing values paired with their row index.
///
/// # Errors
///
/// See [`cells`].
pub fn indexed_values(column: &Series) -> Result<Vec<(usize, Value)>> {
    Ok(cells(column)?
        .into_iter()
        .enumerate()
        .filter_map(|(idx, cell)| cell.map(|v| (idx, v)))
        .collect())
}

/// Build a column of `kind`. Cells of any other kind become missing, except
/// for text columns, which render every value.
///
/// # Errors
///
/// Propagates Polars errors from casting datetimes to [`TIME_UNIT`].
pub fn series_from_cells(name: &str, kind: ColumnKind, cells: &[Cell]) -> Result<Series> {
    let name: PlSmallStr = name.into();
    let series = match kind {
        ColumnKind::Numeric => {
            let values: Vec<Option<f64>> = cells
                .iter()
                .map(|c| c.as_ref().and_then(Value::as_f64))
                .collect();
            Series::new(name, values)
        }
        ColumnKind::Text => {
            let values: Vec<Option<String>> = cells
                .iter()
                .map(|c| c.as_ref().map(Value::to_string))
                .collect();
            Series::new(name, values)
        }
        ColumnKind::Boolean => {
            let values: Vec<Option<bool>> = cells
                .iter()
                .map(|c| match c {
                    Some(Value::Bool(b)) => Some(*b),
                    _ => None,
                })
                .collect();
            Series::new(name, values)
        }
        ColumnKind::DateTime => {
            let micros: Vec<Option<i64>> = cells
                .iter()
                .map(|c| match c {
                    Some(Value::DateTime(dt)) => Some(to_micros(dt)),
                    _ => None,
                })
                .collect();
            Series::new(name, micros).cast(&kind.dtype())?
        }
        ColumnKind::Unknown => Series::full_null(name, cells.len(), &DataType::Null),
    };
    Ok(series)
}

/// Re-render a column as text, keeping missing cells missing.
///
/// # Errors
///
/// See [`cells`].
pub fn to_text(column: &Series) -> Result<Series> {
    series_from_cells(column.name().as_str(), ColumnKind::Text, &cells(column)?)
}

/// Number of distinct non-missing values.
///
/// # Errors
///
/// Propagates Polars errors from `n_unique`.
pub fn distinct_count(column: &Series) -> Result<usize> {
    if column.null_count() == column.len() {
        return Ok(0);
    }
    Ok(column.drop_nulls().n_unique()?)
}

pub fn non_null_count(column: &Series) -> usize {
    column.len() - column.null_count()
}

/// # Errors
///
/// See [`cells`].
pub fn first_value(column: &Series) -> Result<Option<Value>> {
    let present = column.drop_nulls();
    Ok(cells(&present.head(Some(1)))?.into_iter().flatten().next())
}

// Columns are stored in the dtype of their kind.
fn normalize(column: Series) -> Result<Series> {
    let target = kind_of(&column).dtype();
    if column.dtype() == &target {
        Ok(column)
    } else {
        Ok(column.cast(&target)?)
    }
}

/// An in-memory table: ordered, named, equally long columns.
#[derive(Clone, Debug, Default)]
pub struct Dataset {
    frame: DataFrame,
}

impl PartialEq for Dataset {
    fn eq(&self, other: &Self) -> bool {
        self.column_names() == other.column_names() && self.frame.equals_missing(&other.frame)
    }
}

impl Dataset {
    /// Build a dataset, enforcing that every column has the same length.
    ///
    /// # Errors
    ///
    /// `RaggedColumns` for a length mismatch. Duplicate names are rejected by
    /// Polars.
    pub fn new(columns: Vec<Series>) -> Result<Self> {
        if let Some(first) = columns.first() {
            let expected = first.len();
            if let Some(bad) = columns.iter().find(|c| c.len() != expected) {
                return Err(TablewashError::RaggedColumns {
                    column: bad.name().to_string(),
                    expected,
                    found: bad.len(),
                });
            }
        }
        let columns = columns
            .into_iter()
            .map(|s| normalize(s).map(Column::from))
            .collect::<Result<Vec<_>>>()?;
        Ok(Self {
            frame: DataFrame::new(columns)?,
        })
    }

    /// Wrap a frame, casting each column to the storage dtype of its kind.
    ///
    /// # Errors
    ///
    /// See [`Dataset::new`].
    pub fn from_frame(frame: DataFrame) -> Result<Self> {
        let columns = frame
            .get_columns()
            .iter()
            .map(|c| c.as_materialized_series().clone())
            .collect();
        Self::new(columns)
    }

    pub fn frame(&self) -> &DataFrame {
        &self.frame
    }

    pub fn lazy(&self) -> LazyFrame {
        self.frame.clone().lazy()
    }

    pub fn height(&self) -> usize {
        self.frame.height()
    }

    pub fn width(&self) -> usize {
        self.frame.width()
    }

    pub fn columns(&self) -> impl Iterator<Item = &Series> {
        self.frame
            .get_columns()
            .iter()
            .map(Column::as_materialized_series)
    }

    pub fn column(&self, name: &str) -> Option<&Series> {
        self.frame
            .column(name)
            .ok()
            .map(Column::as_materialized_series)
    }

    pub fn kind(&self, name: &str) -> Option<ColumnKind> {
        self.column(name).map(kind_of)
    }

    pub fn column_names(&self) -> Vec<String> {
        self.frame
            .get_column_names()
            .into_iter()
            .map(|name| name.to_string())
            .collect()
    }

    /// Swap in a new version of the column carrying the same name.
    ///
    /// # Errors
    ///
    /// Fails when no column has that name or the length differs.
    pub fn replace_column(&mut self, column: Series) -> Result<()> {
        let column = normalize(column)?;
        let name = column.name().to_string();
        self.frame.replace(&name, column)?;
        Ok(())
    }

    /// Rename every column at once, in column order.
    ///
    /// # Errors
    ///
    /// Fails when the new names are not unique.
    pub fn set_column_names(&mut self, names: &[String]) -> Result<()> {
        let columns = self
            .columns()
            .zip(names)
            .map(|(column, name)| column.clone().with_name(name.as_str().into()))
            .collect();
        *self = Self::new(columns)?;
        Ok(())
    }

    /// Keep only rows whose mask entry is `true`. Returns the number removed.
    ///
    /// # Errors
    ///
    /// Fails when the mask length differs from the row count.
    pub fn retain_rows(&mut self, keep: &BooleanChunked) -> Result<usize> {
        let before = self.height();
        self.frame = self.frame.filter(keep)?;
        Ok(before - self.height())
    }

    /// Replace the whole frame, e.g. with the result of a lazy query.
    ///
    /// # Errors
    ///
    /// See [`Dataset::new`].
    pub fn set_frame(&mut self, frame: DataFrame) -> Result<()> {
        *self = Self::from_frame(frame)?;
        Ok(())
    }
}
