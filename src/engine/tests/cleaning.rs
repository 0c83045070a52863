#![expect(clippy::unwrap_used, clippy::indexing_slicing)]

use super::{csv, numbers, values};
use crate::config::{CleaningPlan, FillPlan, FillStrategy};
use crate::engine::cleaning::Cleaner;
use crate::engine::stats;
use crate::engine::types::{ColumnKind, Dataset, Value};
use crate::error::TablewashError;
use anyhow::Result;
use polars::prelude::{NamedFrom as _, Series};
use std::collections::BTreeMap;

fn plan(entries: &[(&str, FillStrategy)]) -> FillPlan {
    entries
        .iter()
        .map(|(name, strategy)| ((*name).to_owned(), strategy.clone()))
        .collect()
}

fn text(value: &str) -> Option<Value> {
    Some(Value::Text(value.to_owned()))
}

#[test]
fn test_remove_duplicates_is_idempotent() -> Result<()> {
    let df = csv("a,b\n1,x\n1,x\n2,\n2,\n1,x\n3,y\n")?;
    let mut cleaner = Cleaner::new(&df);
    assert_eq!(cleaner.remove_duplicates()?, 3);
    let once = cleaner.dataset().clone();
    assert_eq!(cleaner.remove_duplicates()?, 0);
    assert_eq!(cleaner.dataset(), &once);
    assert_eq!(numbers(&once, "a")?, vec![Some(1.0), Some(2.0), Some(3.0)]);
    assert_eq!(cleaner.log().len(), 1);
    Ok(())
}

#[test]
fn test_cleaner_works_on_a_copy() -> Result<()> {
    let df = csv("a\n1\n1\n")?;
    let mut cleaner = Cleaner::new(&df);
    cleaner.remove_duplicates()?;
    assert_eq!(cleaner.dataset().height(), 1);
    assert_eq!(df.height(), 2);
    Ok(())
}

#[test]
fn test_mean_fill_preserves_mean() -> Result<()> {
    let df = Dataset::new(vec![Series::new(
        "score".into(),
        &[Some(4.0), None, Some(10.0), None, Some(7.0)],
    )])?;
    let before = stats::mean(df.column("score").unwrap())?;

    let mut cleaner = Cleaner::new(&df);
    cleaner.fill_missing_values(&plan(&[("score", FillStrategy::Mean)]))?;
    let column = cleaner.dataset().column("score").unwrap();
    assert_eq!(column.null_count(), 0);
    let after = stats::mean(column)?;
    assert!((before - after).abs() < 1e-9, "{before} != {after}");
    Ok(())
}

#[test]
fn test_fill_strategies() -> Result<()> {
    let df = Dataset::new(vec![
        Series::new("n".into(), &[Some(1.0), None, Some(2.0), Some(9.0)]),
        Series::new("t".into(), &[Some("b"), Some("a"), Some("a"), None]),
        Series::new("keep".into(), &[None, Some("x"), None, Some("y")]),
    ])?;
    let mut cleaner = Cleaner::new(&df);
    let filled = cleaner.fill_missing_values(&plan(&[
        ("n", FillStrategy::Median),
        ("t", FillStrategy::Mode),
    ]))?;
    assert_eq!(filled, 2);

    let out = cleaner.dataset();
    assert_eq!(numbers(out, "n")?[1], Some(2.0));
    assert_eq!(values(out, "t")?[3], text("a"));
    // columns outside the plan keep their gaps
    assert_eq!(out.column("keep").unwrap().null_count(), 2);
    Ok(())
}

#[test]
fn test_literal_fill_converts_or_demotes() -> Result<()> {
    let df = Dataset::new(vec![
        Series::new("qty".into(), &[Some(3.0), None]),
        Series::new("price".into(), &[None, Some(2.5)]),
    ])?;
    let mut cleaner = Cleaner::new(&df);
    cleaner.fill_missing_values(&plan(&[
        ("qty", FillStrategy::Literal("0".to_owned())),
        ("price", FillStrategy::Literal("Unknown".to_owned())),
    ]))?;

    let out = cleaner.dataset();
    assert_eq!(out.kind("qty"), Some(ColumnKind::Numeric));
    assert_eq!(values(out, "qty")?[1], Some(Value::Number(0.0)));

    assert_eq!(out.kind("price"), Some(ColumnKind::Text));
    assert_eq!(values(out, "price")?, vec![text("Unknown"), text("2.5")]);
    Ok(())
}

#[test]
fn test_drop_strategy_removes_rows() -> Result<()> {
    let df = csv("id,code\n1,a\n2,\n3,c\n")?;
    let mut cleaner = Cleaner::new(&df);
    let dropped = cleaner.fill_missing_values(&plan(&[("code", FillStrategy::Drop)]))?;
    assert_eq!(dropped, 1);
    assert_eq!(numbers(cleaner.dataset(), "id")?, vec![Some(1.0), Some(3.0)]);
    Ok(())
}

#[test]
fn test_unsupported_strategy_is_partial() -> Result<()> {
    let df = Dataset::new(vec![
        Series::new("city".into(), &[Some("Oslo"), None]),
        Series::new("temp".into(), &[Some(4.0), None]),
    ])?;
    let mut cleaner = Cleaner::new(&df);
    let result = cleaner.fill_missing_values(&plan(&[
        ("city", FillStrategy::Mean),
        ("temp", FillStrategy::Mean),
    ]));

    match result {
        Err(TablewashError::UnsupportedStrategy { column, kind, .. }) => {
            assert_eq!(column, "city");
            assert_eq!(kind, ColumnKind::Text);
        }
        other => panic!("expected UnsupportedStrategy, got {other:?}"),
    }
    let out = cleaner.dataset();
    assert_eq!(out.column("city").unwrap().null_count(), 1);
    assert_eq!(numbers(out, "temp")?, vec![Some(4.0), Some(4.0)]);
    Ok(())
}

#[test]
fn test_fill_on_empty_column_errors() -> Result<()> {
    let df = csv("a,b\n1,\n2,\n")?;
    let mut cleaner = Cleaner::new(&df);
    let result = cleaner.fill_missing_values(&plan(&[("b", FillStrategy::Mode)]));
    assert!(matches!(result, Err(TablewashError::EmptyColumn { .. })));
    Ok(())
}

#[test]
fn test_mean_and_median_on_all_missing_column_report_empty() -> Result<()> {
    let df = csv("a,b\n1,\n2,\n")?;
    assert_eq!(df.kind("b"), Some(ColumnKind::Unknown));
    for strategy in [FillStrategy::Mean, FillStrategy::Median] {
        let mut cleaner = Cleaner::new(&df);
        let result = cleaner.fill_missing_values(&plan(&[("b", strategy)]));
        assert!(
            matches!(result, Err(TablewashError::EmptyColumn { ref column }) if column == "b"),
            "got {result:?}"
        );
        assert_eq!(cleaner.dataset(), &df);
    }
    Ok(())
}

#[test]
fn test_literal_fill_types_an_all_missing_column() -> Result<()> {
    let df = csv("a,b\n1,\n2,\n")?;
    let mut cleaner = Cleaner::new(&df);
    assert_eq!(
        cleaner.fill_missing_values(&plan(&[("b", FillStrategy::Literal("none".to_owned()))]))?,
        2
    );
    assert_eq!(cleaner.dataset().kind("b"), Some(ColumnKind::Text));
    assert_eq!(values(cleaner.dataset(), "b")?, vec![text("none"), text("none")]);
    Ok(())
}

#[test]
fn test_unknown_column_in_plan_is_ignored() -> Result<()> {
    let df = csv("a\n1\n")?;
    let mut cleaner = Cleaner::new(&df);
    assert_eq!(cleaner.fill_missing_values(&plan(&[("zzz", FillStrategy::Mean)]))?, 0);
    assert_eq!(cleaner.dataset(), &df);
    Ok(())
}

#[test]
fn test_zero_variance_never_loses_rows() -> Result<()> {
    let df = Dataset::new(vec![
        Series::new("flat".into(), &[3.0; 6]),
        Series::new("label".into(), &["a"; 6]),
    ])?;
    let mut cleaner = Cleaner::new(&df);
    assert_eq!(cleaner.remove_outliers(0.0)?, 0);
    assert_eq!(cleaner.dataset().height(), 6);
    Ok(())
}

#[test]
fn test_remove_outliers_uses_statistics_from_before_the_pass() -> Result<()> {
    let mut a = vec![Some(10.0); 12];
    let mut b = vec![Some(5.0); 12];
    a[0] = Some(1000.0);
    b[1] = Some(-800.0);
    let df = Dataset::new(vec![Series::new("a".into(), a), Series::new("b".into(), b)])?;

    let mut cleaner = Cleaner::new(&df);
    assert_eq!(cleaner.remove_outliers(3.0)?, 2);
    assert_eq!(cleaner.dataset().height(), 10);
    // the survivors are constant, so a second pass is a no-op
    assert_eq!(cleaner.remove_outliers(3.0)?, 0);
    Ok(())
}

#[test]
fn test_correct_invalid_values() -> Result<()> {
    let df = csv("status,age\nactve,25\nactive,-1\nactve,30\n")?;
    let mut cleaner = Cleaner::new(&df);

    let status: BTreeMap<String, String> = [("actve".to_owned(), "active".to_owned())].into();
    assert_eq!(cleaner.correct_invalid_values("status", &status)?, 2);

    let age: BTreeMap<String, String> = [("-1".to_owned(), "0".to_owned())].into();
    assert_eq!(cleaner.correct_invalid_values("age", &age)?, 1);

    let out = cleaner.dataset();
    assert_eq!(
        values(out, "status")?,
        vec![text("active"), text("active"), text("active")]
    );
    assert_eq!(numbers(out, "age")?, vec![Some(25.0), Some(0.0), Some(30.0)]);
    assert_eq!(cleaner.correct_invalid_values("status", &status)?, 0);
    assert_eq!(cleaner.correct_invalid_values("missing", &status)?, 0);
    Ok(())
}

#[test]
fn test_replace_at_rows() -> Result<()> {
    let df = csv("email\na@b.com\nbroken\nalso broken\n")?;
    let mut cleaner = Cleaner::new(&df);
    assert_eq!(cleaner.replace_at_rows("email", &[1, 2, 99], &None)?, 2);
    assert_eq!(cleaner.dataset().column("email").unwrap().null_count(), 2);
    assert_eq!(cleaner.replace_at_rows("email", &[1], &text("unknown"))?, 1);
    assert_eq!(values(cleaner.dataset(), "email")?[1], text("unknown"));
    Ok(())
}

#[test]
fn test_apply_plan_runs_every_stage() -> Result<()> {
    let df = csv("id,city\n1,oslo\n1,oslo\n2,\n3,Bergn\n")?;
    let cleaning = CleaningPlan {
        remove_duplicates: true,
        fill: plan(&[("city", FillStrategy::Literal("Unknown".to_owned()))]),
        outlier_threshold: None,
        corrections: BTreeMap::from([(
            "city".to_owned(),
            BTreeMap::from([("Bergn".to_owned(), "Bergen".to_owned())]),
        )]),
    };

    let mut cleaner = Cleaner::new(&df);
    cleaner.apply_plan(&cleaning)?;
    let out = cleaner.dataset();
    assert_eq!(out.height(), 3);
    assert_eq!(
        values(out, "city")?,
        vec![text("oslo"), text("Unknown"), text("Bergen")]
    );
    assert_eq!(cleaner.log().len(), 3);
    Ok(())
}
