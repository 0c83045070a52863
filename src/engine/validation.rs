//! Read-only data quality checks.
//!
//! A [`Validator`] borrows a dataset and never changes it. Each check is
//! independent and returns its own list of [`Issue`]s; [`Validator::validate_all`]
//! runs them in a fixed order and folds the results into a
//! [`ValidationReport`].

use super::naming::{name_problems, sanitize_column_name};
use super::parsing::{FALSE_TOKENS, TRUE_TOKENS, parse_datetime};
use super::stats;
use super::types::{Cell, ColumnKind, Dataset, Value, cells, kind_of, non_null_count};
use crate::config::ValidationSettings;
use crate::error::Result;
use polars::prelude::*;
use regex::Regex;
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::LazyLock;

const ROW_INDEX: &str = "__row";

static EMAIL_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Za-z0-9._%+-]+@[A-Za-z0-9.-]+\.[A-Za-z]{2,}$")
        .expect("email pattern is a valid regex")
});

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum IssueKind {
    MissingValues,
    DuplicateRows,
    Outlier,
    InvalidEmailFormat,
    InvalidDateFormat,
    InconsistentBoolean,
    BadColumnName,
}

impl IssueKind {
    pub const ALL: [Self; 7] = [
        Self::MissingValues,
        Self::DuplicateRows,
        Self::Outlier,
        Self::InvalidEmailFormat,
        Self::InvalidDateFormat,
        Self::InconsistentBoolean,
        Self::BadColumnName,
    ];

    pub fn title(&self) -> &'static str {
        match self {
            Self::MissingValues => "Missing values",
            Self::DuplicateRows => "Duplicate rows",
            Self::Outlier => "Outliers",
            Self::InvalidEmailFormat => "Invalid email format",
            Self::InvalidDateFormat => "Invalid date format",
            Self::InconsistentBoolean => "Inconsistent booleans",
            Self::BadColumnName => "Column name issues",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub enum Severity {
    Info,
    Warning,
    Error,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct DuplicateGroup {
    /// Canonical row, kept by the cleaner.
    pub first_row: usize,
    pub duplicate_rows: Vec<usize>,
}

/// Kind-specific evidence attached to an issue.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum IssueDetail {
    Missing { percentage: f64 },
    Duplicates { groups: Vec<DuplicateGroup> },
    Outliers { fraction: f64, values: Vec<f64> },
    InvalidValues { values: Vec<String> },
    Boolean {
        true_spellings: Vec<String>,
        false_spellings: Vec<String>,
    },
    ColumnName {
        problems: Vec<String>,
        suggested: String,
    },
}

/// One fact about the dataset as it was when validated.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Issue {
    pub kind: IssueKind,
    pub column: Option<String>,
    /// Affected row indices (empty for column-level issues).
    pub rows: Vec<usize>,
    /// Number of affected cells, rows or names.
    pub count: usize,
    pub severity: Severity,
    pub description: String,
    pub detail: IssueDetail,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct ReportSummary {
    /// Sum of `count` over the issues of each kind.
    pub affected: BTreeMap<IssueKind, usize>,
    /// Number of issue records of each kind.
    pub issues: BTreeMap<IssueKind, usize>,
    pub total_rows: usize,
    pub total_columns: usize,
}

impl ReportSummary {
    pub fn affected(&self, kind: IssueKind) -> usize {
        self.affected.get(&kind).copied().unwrap_or(0)
    }

    pub fn issues(&self, kind: IssueKind) -> usize {
        self.issues.get(&kind).copied().unwrap_or(0)
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct ValidationReport {
    pub issues: Vec<Issue>,
    pub summary: ReportSummary,
}

impl ValidationReport {
    pub fn new(issues: Vec<Issue>, total_rows: usize, total_columns: usize) -> Self {
        let mut summary = ReportSummary {
            total_rows,
            total_columns,
            ..Default::default()
        };
        for issue in &issues {
            *summary.affected.entry(issue.kind).or_insert(0) += issue.count;
            *summary.issues.entry(issue.kind).or_insert(0) += 1;
        }
        Self { issues, summary }
    }

    pub fn is_clean(&self) -> bool {
        self.issues.is_empty()
    }

    pub fn of_kind(&self, kind: IssueKind) -> impl Iterator<Item = &Issue> {
        self.issues.iter().filter(move |i| i.kind == kind)
    }

    /// Columns named by at least one issue of `kind`, in report order.
    pub fn columns_with(&self, kind: IssueKind) -> Vec<&str> {
        self.of_kind(kind)
            .filter_map(|i| i.column.as_deref())
            .collect()
    }
}


pub struct Validator<'a> {
    df: &'a Dataset,
    settings: ValidationSettings,
}

impl<'a> Validator<'a> {
    pub fn new(df: &'a Dataset, settings: ValidationSettings) -> Self {
        Self { df, settings }
    }

    pub fn with_defaults(df: &'a Dataset) -> Self {
        Self::new(df, ValidationSettings::default())
    }

    /// Run every check in a fixed order: missing, duplicates, outliers, email,
    /// date, boolean, names.
    pub fn validate_all(&self) -> ValidationReport {
        let mut issues = self.check_missing_values();
        issues.extend(self.check_duplicates());
        issues.extend(self.check_outliers());
        issues.extend(self.check_email_format());
        issues.extend(self.check_date_format());
        issues.extend(self.check_boolean_consistency());
        issues.extend(self.check_column_names());

        let report = ValidationReport::new(issues, self.df.height(), self.df.width());
        tracing::info!(
            "Validation found {} issues across {} rows and {} columns",
            report.issues.len(),
            report.summary.total_rows,
            report.summary.total_columns
        );
        report
    }

    pub fn check_missing_values(&self) -> Vec<Issue> {
        let total = self.df.height();
        self.df
            .columns()
            .filter(|column| column.null_count() > 0)
            .map(|column| {
                let rows: Vec<usize> = column
                    .is_null()
                    .into_iter()
                    .enumerate()
                    .filter_map(|(idx, missing)| missing.unwrap_or(false).then_some(idx))
                    .collect();
                let count = rows.len();
                let percentage = count as f64 / total as f64 * 100.0;
                let severity = if percentage > 15.0 {
                    Severity::Error
                } else if percentage > 5.0 {
                    Severity::Warning
                } else {
                    Severity::Info
                };
                let name = column.name().as_str();
                Issue {
                    kind: IssueKind::MissingValues,
                    column: Some(name.to_owned()),
                    rows,
                    count,
                    severity,
                    description: format!("Column '{name}': {count} missing ({percentage:.2}%)"),
                    detail: IssueDetail::Missing { percentage },
                }
            })
            .collect()
    }

    /// Rows equal to an earlier row in every cell. Missing equals missing.
    pub fn check_duplicates(&self) -> Vec<Issue> {
        let groups = match duplicate_groups(self.df) {
            Ok(groups) => groups,
            Err(e) => {
                tracing::warn!("Skipping duplicate check: {e}");
                return Vec::new();
            }
        };
        let rows: Vec<usize> = groups
            .iter()
            .flat_map(|g| g.duplicate_rows.iter().copied())
            .collect();
        if rows.is_empty() {
            return Vec::new();
        }
        let count = rows.len();
        vec![Issue {
            kind: IssueKind::DuplicateRows,
            column: None,
            rows,
            count,
            severity: Severity::Warning,
            description: format!(
                "Found {count} duplicate rows in {} groups",
                groups.len()
            ),
            detail: IssueDetail::Duplicates { groups },
        }]
    }

    pub fn check_outliers(&self) -> Vec<Issue> {
        let threshold = self.settings.outlier_threshold;
        let mut issues = Vec::new();

        for column in self.df.columns() {
            if kind_of(column) != ColumnKind::Numeric || non_null_count(column) < 2 {
                continue;
            }
            let name = column.name().as_str();
            let (zscores, values) = match (stats::zscores(column), column.f64()) {
                (Ok(z), Ok(values)) => (z, values),
                (Err(e), _) => {
                    tracing::debug!("Skipping outlier check for '{name}': {e}");
                    continue;
                }
                (_, Err(e)) => {
                    tracing::debug!("Skipping outlier check for '{name}': {e}");
                    continue;
                }
            };

            let (rows, values): (Vec<usize>, Vec<f64>) = zscores
                .into_iter()
                .zip(values)
                .enumerate()
                .filter_map(|(idx, pair)| match pair {
                    (Some(z), Some(v)) if z.abs() > threshold => Some((idx, v)),
                    _ => None,
                })
                .unzip();

            if rows.is_empty() {
                continue;
            }
            let count = rows.len();
            let fraction = count as f64 / non_null_count(column) as f64;
            issues.push(Issue {
                kind: IssueKind::Outlier,
                column: Some(name.to_owned()),
                rows,
                count,
                severity: Severity::Warning,
                description: format!("Column '{name}': {count} outliers (|z| > {threshold})"),
                detail: IssueDetail::Outliers { fraction, values },
            });
        }
        issues
    }

    pub fn check_email_format(&self) -> Vec<Issue> {
        self.df
            .columns()
            .filter_map(|column| Some((column, column_cells(column)?)))
            .filter(|(column, cells)| self.looks_like_email(column, cells))
            .filter_map(|(column, cells)| {
                let (rows, values) = invalid_values(&cells, |v| EMAIL_PATTERN.is_match(v));
                format_issue(
                    IssueKind::InvalidEmailFormat,
                    column.name().as_str(),
                    rows,
                    values,
                    "invalid email addresses",
                )
            })
            .collect()
    }

    pub fn check_date_format(&self) -> Vec<Issue> {
        self.df
            .columns()
            .filter_map(|column| Some((column, column_cells(column)?)))
            .filter(|(column, cells)| self.looks_like_date(column, cells))
            .filter_map(|(column, cells)| {
                let (rows, values) = invalid_values(&cells, |v| parse_datetime(v).is_some());
                format_issue(
                    IssueKind::InvalidDateFormat,
                    column.name().as_str(),
                    rows,
                    values,
                    "unparseable dates",
                )
            })
            .collect()
    }

    /// Columns made only of boolean tokens that spell true (or false) in more
    /// than one way.
    pub fn check_boolean_consistency(&self) -> Vec<Issue> {
        let mut issues = Vec::new();
        for column in self.df.columns() {
            if matches!(kind_of(column), ColumnKind::Boolean | ColumnKind::Unknown) {
                continue;
            }
            let Some(cells) = column_cells(column) else {
                continue;
            };

            let mut true_spellings = BTreeSet::new();
            let mut false_spellings = BTreeSet::new();
            let mut rows = Vec::new();
            let mut all_tokens = true;
            for (idx, value) in cells.iter().enumerate() {
                let Some(value) = value else {
                    continue;
                };
                let raw = value.to_string();
                let lower = raw.trim().to_lowercase();
                if TRUE_TOKENS.contains(&lower.as_str()) {
                    true_spellings.insert(raw);
                } else if FALSE_TOKENS.contains(&lower.as_str()) {
                    false_spellings.insert(raw);
                } else {
                    all_tokens = false;
                    break;
                }
                rows.push(idx);
            }

            if !all_tokens || (true_spellings.len() <= 1 && false_spellings.len() <= 1) {
                continue;
            }

            let name = column.name().as_str();
            let true_spellings: Vec<String> = true_spellings.into_iter().collect();
            let false_spellings: Vec<String> = false_spellings.into_iter().collect();
            issues.push(Issue {
                kind: IssueKind::InconsistentBoolean,
                column: Some(name.to_owned()),
                count: rows.len(),
                rows,
                severity: Severity::Warning,
                description: format!(
                    "Column '{name}': inconsistent boolean format (true as {true_spellings:?}, false as {false_spellings:?})"
                ),
                detail: IssueDetail::Boolean {
                    true_spellings,
                    false_spellings,
                },
            });
        }
        issues
    }

    pub fn check_column_names(&self) -> Vec<Issue> {
        self.df
            .column_names()
            .into_iter()
            .filter_map(|name| {
                let problems = name_problems(&name);
                if problems.is_empty() {
                    return None;
                }
                let suggested = sanitize_column_name(&name, false);
                Some(Issue {
                    kind: IssueKind::BadColumnName,
                    description: format!(
                        "Column '{name}': {} (suggested '{suggested}')",
                        problems.join(", ")
                    ),
                    column: Some(name),
                    rows: Vec::new(),
                    count: 1,
                    severity: Severity::Info,
                    detail: IssueDetail::ColumnName {
                        problems: problems.iter().map(|p| (*p).to_owned()).collect(),
                        suggested,
                    },
                })
            })
            .collect()
    }

    fn looks_like_email(&self, column: &Series, cells: &[Cell]) -> bool {
        let kind = kind_of(column);
        if kind == ColumnKind::Numeric {
            return false;
        }
        if column.name().to_lowercase().contains("email") {
            return true;
        }
        if kind != ColumnKind::Text {
            return false;
        }
        let sample = sample(cells, self.settings.email_sample_size);
        !sample.is_empty()
            && ratio(sample.iter().filter(|v| v.contains('@')).count(), sample.len())
                >= self.settings.email_content_ratio
    }

    fn looks_like_date(&self, column: &Series, cells: &[Cell]) -> bool {
        let kind = kind_of(column);
        if kind == ColumnKind::Numeric {
            return false;
        }
        if column.name().to_lowercase().contains("date") {
            return true;
        }
        if kind != ColumnKind::Text {
            return false;
        }
        let sample = sample(cells, self.settings.date_sample_size);
        !sample.is_empty()
            && ratio(
                sample.iter().filter(|v| parse_datetime(v).is_some()).count(),
                sample.len(),
            ) >= self.settings.date_content_ratio
    }
}

fn column_cells(column: &Series) -> Option<Vec<Cell>> {
    match cells(column) {
        Ok(cells) => Some(cells),
        Err(e) => {
            tracing::warn!("Skipping column '{}': {e}", column.name());
            None
        }
    }
}

// First `size` non-missing values, rendered.
fn sample(cells: &[Cell], size: usize) -> Vec<String> {
    cells
        .iter()
        .flatten()
        .take(size)
        .map(Value::to_string)
        .collect()
}

fn ratio(part: usize, whole: usize) -> f64 {
    if whole == 0 {
        0.0
    } else {
        part as f64 / whole as f64
    }
}

/// Group rows by full-row equality, in order of first occurrence. Only groups
/// with at least one repeat are returned.
///
/// # Errors
///
/// Propagates Polars errors from the grouping query.
pub fn duplicate_groups(df: &Dataset) -> Result<Vec<DuplicateGroup>> {
    if df.height() < 2 {
        return Ok(Vec::new());
    }

    // all-null columns agree on every row, so they never split a group
    let keys: Vec<PlSmallStr> = df
        .columns()
        .filter(|c| kind_of(c) != ColumnKind::Unknown)
        .map(|c| c.name().clone())
        .collect();
    if keys.is_empty() {
        return Ok(vec![DuplicateGroup {
            first_row: 0,
            duplicate_rows: (1..df.height()).collect(),
        }]);
    }
    if !df.frame().select(keys.clone())?.is_duplicated()?.any() {
        return Ok(Vec::new());
    }

    let grouped = df
        .lazy()
        .with_row_index(ROW_INDEX, None)
        .group_by_stable(keys.into_iter().map(col).collect::<Vec<_>>())
        .agg([col(ROW_INDEX)])
        .collect()?;

    let mut groups = Vec::new();
    let members = grouped.column(ROW_INDEX)?.as_materialized_series().list()?;
    for rows in members.into_iter().flatten() {
        let rows = rows.cast(&DataType::UInt64)?;
        let rows: Vec<usize> = rows
            .u64()?
            .into_iter()
            .flatten()
            .filter_map(|idx| usize::try_from(idx).ok())
            .collect();
        if let Some((&first_row, rest)) = rows.split_first()
            && !rest.is_empty()
        {
            groups.push(DuplicateGroup {
                first_row,
                duplicate_rows: rest.to_vec(),
            });
        }
    }
    Ok(groups)
}

// DateTime cells already parsed, so they always pass.
fn invalid_values<F>(cells: &[Cell], is_valid: F) -> (Vec<usize>, Vec<String>)
where
    F: Fn(&str) -> bool,
{
    cells
        .iter()
        .enumerate()
        .filter_map(|(idx, cell)| match cell {
            None | Some(Value::DateTime(_)) => None,
            Some(value) => Some((idx, value.to_string())),
        })
        .filter(|(_, raw)| !is_valid(raw))
        .unzip()
}

fn format_issue(
    kind: IssueKind,
    column: &str,
    rows: Vec<usize>,
    values: Vec<String>,
    what: &str,
) -> Option<Issue> {
    if rows.is_empty() {
        return None;
    }
    let count = rows.len();
    Some(Issue {
        kind,
        column: Some(column.to_owned()),
        rows,
        count,
        severity: Severity::Error,
        description: format!("Column '{column}': {count} {what}"),
        detail: IssueDetail::InvalidValues { values },
    })
}
