use super::csv;
use crate::config::ValidationSettings;
use crate::engine::types::Dataset;
use crate::engine::validation::*;
use anyhow::{Context as _, Result};
use polars::prelude::{NamedFrom as _, Series};

fn severity_for(missing: usize, total: usize) -> Result<Severity> {
    let values: Vec<Option<f64>> = (0..total)
        .map(|i| (i >= missing).then_some(i as f64))
        .collect();
    let df = Dataset::new(vec![Series::new("x".into(), values)])?;
    let issues = Validator::with_defaults(&df).check_missing_values();
    Ok(issues.first().context("missing issue")?.severity)
}

#[test]
fn test_missing_value_severity_bands() -> Result<()> {
    assert_eq!(severity_for(1, 25)?, Severity::Info);
    assert_eq!(severity_for(1, 10)?, Severity::Warning);
    assert_eq!(severity_for(3, 20)?, Severity::Warning);
    assert_eq!(severity_for(4, 20)?, Severity::Error);
    Ok(())
}

#[test]
fn test_missing_values_reports_rows_and_percentage() -> Result<()> {
    let df = csv("a,b\n1,x\n,y\n3,\n,\n")?;
    let issues = Validator::with_defaults(&df).check_missing_values();
    assert_eq!(issues.len(), 2);
    let a = issues.first().context("issue for a")?;
    assert_eq!(a.rows, vec![1, 3]);
    assert_eq!(a.detail, IssueDetail::Missing { percentage: 50.0 });
    Ok(())
}

#[test]
fn test_duplicate_groups_treat_missing_as_equal() -> Result<()> {
    let df = csv("a,b\n1,\n2,x\n1,\n1,\n2,x\n3,y\n")?;
    let groups = duplicate_groups(&df)?;
    assert_eq!(
        groups,
        vec![
            DuplicateGroup {
                first_row: 0,
                duplicate_rows: vec![2, 3],
            },
            DuplicateGroup {
                first_row: 1,
                duplicate_rows: vec![4],
            },
        ]
    );

    let issues = Validator::with_defaults(&df).check_duplicates();
    assert_eq!(issues.len(), 1);
    let issue = issues.first().context("duplicate issue")?;
    assert_eq!(issue.count, 3);
    assert_eq!(issue.column, None);
    Ok(())
}

#[test]
fn test_duplicate_groups_without_repeats() -> Result<()> {
    let df = csv("a,b\n1,x\n2,x\n1,y\n")?;
    assert!(duplicate_groups(&df)?.is_empty());
    assert!(Validator::with_defaults(&df).check_duplicates().is_empty());
    Ok(())
}

#[test]
fn test_outliers_skip_short_and_constant_columns() -> Result<()> {
    let df = Dataset::new(vec![
        Series::new("single".into(), &[Some(5.0), None, None, None]),
        Series::new("flat".into(), &[7.0; 4]),
    ])?;
    let strict = ValidationSettings {
        outlier_threshold: 0.1,
        ..Default::default()
    };
    assert!(Validator::new(&df, strict).check_outliers().is_empty());
    Ok(())
}

#[test]
fn test_outlier_detail() -> Result<()> {
    let mut values = vec![Some(10.0); 20];
    values.push(Some(500.0));
    values.push(None);
    let df = Dataset::new(vec![Series::new("amount".into(), values)])?;

    let issues = Validator::with_defaults(&df).check_outliers();
    let issue = issues.first().context("outlier issue")?;
    assert_eq!(issue.rows, vec![20]);
    match &issue.detail {
        IssueDetail::Outliers { fraction, values } => {
            assert!((fraction - 1.0 / 21.0).abs() < 1e-12);
            assert_eq!(values, &vec![500.0]);
        }
        other => anyhow::bail!("unexpected detail {other:?}"),
    }
    Ok(())
}

#[test]
fn test_email_check_by_name_and_content() -> Result<()> {
    let df = csv(
        "contact,Email,notes\n\
         a@example.com,x@y.org,hello\n\
         b@example.com,broken@,world\n\
         nope,z@q.io,again\n",
    )?;
    let issues = Validator::with_defaults(&df).check_email_format();
    let flagged: Vec<(Option<&str>, &[usize])> = issues
        .iter()
        .map(|i| (i.column.as_deref(), i.rows.as_slice()))
        .collect();
    assert_eq!(
        flagged,
        vec![(Some("contact"), &[2_usize][..]), (Some("Email"), &[1_usize][..])]
    );
    assert!(issues.iter().all(|i| i.severity == Severity::Error));
    Ok(())
}

#[test]
fn test_email_check_ignores_numeric_columns() -> Result<()> {
    let df = csv("email_count\n1\n2\n")?;
    assert!(Validator::with_defaults(&df).check_email_format().is_empty());
    Ok(())
}

#[test]
fn test_date_check_lists_bad_values() -> Result<()> {
    let df = csv(
        "ship_date,created\n\
         2024-01-01,2024-01-01\n\
         someday,01/02/2024\n\
         2024-02-30,2024-03-03\n\
         2024-03-01,2024-03-04\n\
         2024-03-02,2024-03-05\n",
    )?;
    let issues = Validator::with_defaults(&df).check_date_format();
    assert_eq!(issues.len(), 1);
    let issue = issues.first().context("date issue")?;
    assert_eq!(issue.column.as_deref(), Some("ship_date"));
    assert_eq!(issue.rows, vec![1, 2]);
    assert_eq!(
        issue.detail,
        IssueDetail::InvalidValues {
            values: vec!["someday".to_owned(), "2024-02-30".to_owned()]
        }
    );
    Ok(())
}

#[test]
fn test_date_check_by_content() -> Result<()> {
    let mut text = String::from("when\n");
    for day in 1..=9 {
        text.push_str(&format!("2024-05-0{day}\n"));
    }
    text.push_str("tomorrow\n");
    let df = csv(&text)?;
    let issues = Validator::with_defaults(&df).check_date_format();
    assert_eq!(issues.first().map(|i| i.rows.clone()), Some(vec![9]));
    Ok(())
}

#[test]
fn test_boolean_consistency() -> Result<()> {
    let df = csv(
        "mixed,clean,other\n\
         True,yes,yes\n\
         true,no,maybe\n\
         FALSE,yes,no\n",
    )?;
    let issues = Validator::with_defaults(&df).check_boolean_consistency();
    assert_eq!(issues.len(), 1);
    let issue = issues.first().context("boolean issue")?;
    assert_eq!(issue.column.as_deref(), Some("mixed"));
    assert_eq!(
        issue.detail,
        IssueDetail::Boolean {
            true_spellings: vec!["True".to_owned(), "true".to_owned()],
            false_spellings: vec!["FALSE".to_owned()],
        }
    );
    Ok(())
}

#[test]
fn test_numeric_zero_one_column_is_consistent() -> Result<()> {
    let df = csv("flag\n1\n0\n1\n")?;
    assert!(Validator::with_defaults(&df).check_boolean_consistency().is_empty());
    Ok(())
}

#[test]
fn test_column_names() -> Result<()> {
    let df = csv("good_name,Order Date!,sales-2024\n1,2,3\n")?;
    let issues = Validator::with_defaults(&df).check_column_names();
    let suggested: Vec<String> = issues
        .iter()
        .filter_map(|i| match &i.detail {
            IssueDetail::ColumnName { suggested, .. } => Some(suggested.clone()),
            _ => None,
        })
        .collect();
    assert_eq!(suggested, vec!["Order_Date", "sales_2024"]);
    Ok(())
}

#[test]
fn test_validate_all_summary_and_order() -> Result<()> {
    let df = csv("id,e mail\n1,a@b.com\n1,a@b.com\n,bad\n")?;
    let report = Validator::with_defaults(&df).validate_all();

    let kinds: Vec<IssueKind> = report.issues.iter().map(|i| i.kind).collect();
    let mut sorted = kinds.clone();
    sorted.sort();
    assert_eq!(kinds, sorted, "checks run in a fixed order");

    assert_eq!(report.summary.total_rows, 3);
    assert_eq!(report.summary.total_columns, 2);
    assert_eq!(report.summary.affected(IssueKind::MissingValues), 1);
    assert_eq!(report.summary.affected(IssueKind::DuplicateRows), 1);
    assert_eq!(report.summary.affected(IssueKind::InvalidEmailFormat), 1);
    assert_eq!(report.summary.issues(IssueKind::BadColumnName), 1);
    assert_eq!(report.summary.issues(IssueKind::Outlier), 0);
    Ok(())
}

#[test]
fn test_report_serializes_to_json() -> Result<()> {
    let df = csv("a,b\n1,\n")?;
    let report = Validator::with_defaults(&df).validate_all();
    let json = serde_json::to_value(&report)?;
    assert_eq!(json["issues"][0]["kind"], "MissingValues");
    assert_eq!(json["issues"][0]["detail"]["type"], "missing");
    Ok(())
}
