//! The data quality engine: load, validate, clean and prepare tabular data.
//!
//! Every stage works on its own copy of a [`Dataset`]. [`Validator`] only
//! reads; [`Cleaner`] and [`TableauPrep`] clone their input and hand back a
//! new dataset plus a log of what they changed.

pub mod cleaning;
pub mod io;
pub mod naming;
pub mod parsing;
pub mod report;
pub mod stats;
pub mod tableau;
pub mod types;
pub mod validation;

#[cfg(test)]
mod tests;

pub use cleaning::Cleaner;
pub use io::{load_csv, save_csv};
pub use tableau::{ColumnMetadata, FieldGuide, FieldRole, TableauPrep, TypeChange};
pub use types::{Cell, ColumnKind, Dataset, Value};
pub use validation::{Issue, IssueKind, Severity, ValidationReport, Validator};

use crate::config::{FillPlan, FillStrategy};

/// Literal used for non-numeric columns by [`suggested_fill_plan`].
pub const UNKNOWN_FILL: &str = "Unknown";

/// A fill plan for every column the report flagged as having missing values:
/// numeric columns take the median, everything else the literal "Unknown".
pub fn suggested_fill_plan(df: &Dataset, report: &ValidationReport) -> FillPlan {
    report
        .columns_with(IssueKind::MissingValues)
        .into_iter()
        .filter_map(|name| df.column(name))
        .map(|column| {
            let strategy = if types::kind_of(column) == ColumnKind::Numeric {
                FillStrategy::Median
            } else {
                FillStrategy::Literal(UNKNOWN_FILL.to_owned())
            };
            (column.name().to_string(), strategy)
        })
        .collect()
}
