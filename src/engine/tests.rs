use super::*;
use crate::config::{FillPlan, FillStrategy, LoadOptions};
use anyhow::{Context as _, Result};
use polars::prelude::{NamedFrom as _, Series};

mod cleaning;
mod validation;

pub(super) fn csv(text: &str) -> Result<Dataset> {
    Ok(io::read_csv(text.as_bytes(), &LoadOptions::default())?)
}

pub(super) fn values(df: &Dataset, name: &str) -> Result<Vec<Cell>> {
    let column = df.column(name).context("column exists")?;
    Ok(types::cells(column)?)
}

pub(super) fn numbers(df: &Dataset, name: &str) -> Result<Vec<Option<f64>>> {
    Ok(values(df, name)?
        .iter()
        .map(|cell| cell.as_ref().and_then(Value::as_f64))
        .collect())
}

#[test]
fn test_duplicate_and_median_scenario() -> Result<()> {
    let df = csv("id,age\n1,25\n1,25\n2,\n")?;

    let report = Validator::with_defaults(&df).validate_all();
    assert_eq!(report.summary.affected(IssueKind::DuplicateRows), 1);
    let missing: Vec<&Issue> = report.of_kind(IssueKind::MissingValues).collect();
    assert_eq!(missing.len(), 1);
    let age = missing.first().context("missing issue")?;
    assert_eq!(age.column.as_deref(), Some("age"));
    assert_eq!(age.count, 1);
    assert_eq!(age.rows, vec![2]);
    assert!(age.description.contains("33.33%"), "{}", age.description);

    let mut cleaner = Cleaner::new(&df);
    assert_eq!(cleaner.remove_duplicates()?, 1);
    let plan: FillPlan = [("age".to_owned(), FillStrategy::Median)].into();
    assert_eq!(cleaner.fill_missing_values(&plan)?, 1);

    let cleaned = cleaner.into_dataset();
    assert_eq!(cleaned.height(), 2);
    assert_eq!(numbers(&cleaned, "age")?, vec![Some(25.0), Some(25.0)]);
    assert_eq!(numbers(&cleaned, "id")?, vec![Some(1.0), Some(2.0)]);

    // the validator's dataset is untouched
    assert_eq!(df.height(), 3);
    Ok(())
}

#[test]
fn test_order_date_scenario() -> Result<()> {
    let df = csv("Order Date!,Amount\n2024-01-05,10\n2024-02-11,20\n2024-03-20,35\n")?;

    let mut prep = TableauPrep::with_defaults(&df);
    prep.clean_column_names()?;
    assert_eq!(prep.dataset().column_names(), vec!["Order_Date", "Amount"]);

    let changes = prep.enforce_data_types()?;
    assert_eq!(changes.len(), 1);
    let change = changes.first().context("one change")?;
    assert_eq!(change.column, "Order_Date");
    assert_eq!(change.to, ColumnKind::DateTime);
    assert_eq!(change.nulled, 0);

    let guide = prep.create_dimension_measure_guide()?;
    assert_eq!(guide.date_fields, vec!["Order_Date"]);
    assert_eq!(guide.measures, vec!["Amount"]);
    assert!(guide.dimensions.is_empty());
    Ok(())
}

#[test]
fn test_outlier_threshold_edge() -> Result<()> {
    let df = Dataset::new(vec![Series::new("x".into(), &[1.0, 1.0, 1.0, 1.0, 100.0])])?;

    // mean 20.8, population std 39.6, so z(100) is exactly 2.0
    let z = stats::zscores(df.column("x").context("x")?)?;
    let last = z.get(4).context("z for 100")?;
    assert!((last - 2.0).abs() < 1e-9, "z = {last}");

    assert!(Validator::with_defaults(&df).check_outliers().is_empty());
    let mut cleaner = Cleaner::new(&df);
    assert_eq!(cleaner.remove_outliers(3.0)?, 0);

    let strict = crate::config::ValidationSettings {
        outlier_threshold: 1.5,
        ..Default::default()
    };
    let issues = Validator::new(&df, strict).check_outliers();
    assert_eq!(issues.len(), 1);
    assert_eq!(issues.first().map(|i| i.rows.clone()), Some(vec![4]));
    assert_eq!(cleaner.remove_outliers(1.5)?, 1);
    assert_eq!(cleaner.dataset().height(), 4);
    Ok(())
}

#[test]
fn test_full_pipeline_keeps_stages_independent() -> Result<()> {
    let df = csv(
        "Customer ID,Email Address,Signup Date,Active,Spend\n\
         1,a@example.com,2024-01-01,yes,10.5\n\
         2,not-an-email,2024-01-02,no,20\n\
         3,c@example.com,,Yes,\n\
         3,c@example.com,,Yes,\n",
    )?;

    let report = Validator::with_defaults(&df).validate_all();
    assert!(!report.is_clean());
    assert_eq!(report.columns_with(IssueKind::InvalidEmailFormat), vec!["Email Address"]);
    assert_eq!(report.columns_with(IssueKind::InconsistentBoolean), vec!["Active"]);
    assert_eq!(report.summary.affected(IssueKind::BadColumnName), 3);

    let mut cleaner = Cleaner::new(&df);
    cleaner.remove_duplicates()?;
    let plan = suggested_fill_plan(cleaner.dataset(), &report);
    cleaner.fill_missing_values(&plan)?;
    let cleaned = cleaner.into_dataset();
    assert_eq!(cleaned.height(), 3);
    assert!(cleaned.columns().all(|c| c.null_count() == 0));

    let mut prep = TableauPrep::with_defaults(&cleaned);
    prep.clean_column_names()?;
    prep.enforce_data_types()?;
    let ready = prep.dataset();
    assert_eq!(
        ready.column_names(),
        vec!["Customer_ID", "Email_Address", "Signup_Date", "Active", "Spend"]
    );
    assert_eq!(ready.kind("Active"), Some(ColumnKind::Boolean));
    // "Unknown" filled into the date column cannot parse, but 2 of 3 values do
    assert_eq!(ready.kind("Signup_Date"), Some(ColumnKind::Text));
    assert_eq!(cleaned.column_names().first().map(String::as_str), Some("Customer ID"));
    Ok(())
}

#[test]
fn test_suggested_fill_plan() -> Result<()> {
    let df = csv("a,b,c\n1,x,\n,y,\n3,,\n")?;
    let report = Validator::with_defaults(&df).validate_all();
    let plan = suggested_fill_plan(&df, &report);
    assert_eq!(plan.get("a"), Some(&FillStrategy::Median));
    assert_eq!(plan.get("b"), Some(&FillStrategy::Literal(UNKNOWN_FILL.to_owned())));
    assert_eq!(plan.get("c"), Some(&FillStrategy::Literal(UNKNOWN_FILL.to_owned())));
    Ok(())
}
