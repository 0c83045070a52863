use super::parsing::parse_number;
use super::types::Dataset;
use crate::config::LoadOptions;
use crate::error::{Result, ResultExt as _, TablewashError};
use polars::prelude::*;
use std::collections::HashSet;
use std::io::{Read, Write};
use std::path::Path;

/// Read a whole CSV file into memory. No partial dataset is returned.
///
/// # Errors
///
/// Fails with `MalformedInput` for ragged rows, invalid UTF-8 or a missing
/// header row, and with `Other` when the file cannot be opened.
pub fn load_csv(path: &Path, options: &LoadOptions) -> Result<Dataset> {
    let file = std::fs::File::open(path)
        .with_context(|| format!("Failed to open {}", path.display()))?;
    let df = read_csv(file, options).with_context(|| format!("Failed to read {}", path.display()))?;
    tracing::info!(
        "Loaded {} rows and {} columns from {}",
        df.height(),
        df.width(),
        path.display()
    );
    Ok(df)
}

/// Parse CSV records strictly, then hand each column to Polars.
///
/// Polars' own reader pads short rows with nulls, so record shape is checked
/// by the `csv` reader first.
///
/// # Errors
///
/// See [`load_csv`].
pub fn read_csv<R: Read>(reader: R, options: &LoadOptions) -> Result<Dataset> {
    let delimiter = u8::try_from(options.delimiter).map_err(|err| {
        TablewashError::Config(format!(
            "delimiter '{}' is not a single-byte character: {err}",
            options.delimiter
        ))
    })?;

    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .delimiter(delimiter)
        .from_reader(reader);

    let headers: Vec<String> = reader.headers()?.iter().map(str::to_owned).collect();
    if headers.is_empty() {
        return Err(TablewashError::MalformedInput(
            "missing header row".to_owned(),
        ));
    }
    let headers = dedupe_headers(headers);

    let mut raw: Vec<Vec<Option<String>>> = vec![Vec::new(); headers.len()];
    for record in reader.records() {
        let record = record?;
        for (column, field) in raw.iter_mut().zip(record.iter()) {
            let is_null = options.null_tokens.iter().any(|t| t == field.trim());
            column.push(if is_null { None } else { Some(field.to_owned()) });
        }
    }

    let columns = headers
        .into_iter()
        .zip(raw)
        .map(|(name, values)| infer_column(&name, values))
        .collect();
    Dataset::new(columns)
}

// Repeated header names get ".1", ".2", ... so every column stays addressable.
fn dedupe_headers(headers: Vec<String>) -> Vec<String> {
    let mut seen = HashSet::new();
    headers
        .into_iter()
        .map(|name| {
            let mut candidate = name.clone();
            let mut count = 0;
            while seen.contains(&candidate) {
                count += 1;
                candidate = format!("{name}.{count}");
            }
            seen.insert(candidate.clone());
            candidate
        })
        .collect()
}

/// Numeric when every present value parses as a number, text otherwise.
/// A column with no values at all has the Null dtype.
fn infer_column(name: &str, values: Vec<Option<String>>) -> Series {
    if values.iter().all(Option::is_none) {
        return Series::full_null(name.into(), values.len(), &DataType::Null);
    }

    let numbers: Option<Vec<Option<f64>>> = values
        .iter()
        .map(|v| match v {
            None => Some(None),
            Some(s) => parse_number(s).map(Some),
        })
        .collect();

    match numbers {
        Some(numbers) => Series::new(name.into(), numbers),
        None => Series::new(name.into(), values),
    }
}

/// # Errors
///
/// Fails when the file cannot be created or written.
pub fn save_csv(df: &Dataset, path: &Path) -> Result<()> {
    let file = std::fs::File::create(path)
        .with_context(|| format!("Failed to create {}", path.display()))?;
    write_csv(df, file).with_context(|| format!("Failed to write {}", path.display()))?;
    tracing::info!("Wrote {} rows to {}", df.height(), path.display());
    Ok(())
}

/// Missing cells are written as empty fields.
///
/// # Errors
///
/// Fails when Polars cannot serialise the frame or the writer fails.
pub fn write_csv<W: Write>(df: &Dataset, writer: W) -> Result<()> {
    // all-null columns go out as empty text fields
    let columns = df
        .columns()
        .map(|c| {
            if c.dtype() == &DataType::Null {
                c.cast(&DataType::String).map(Column::from)
            } else {
                Ok(Column::from(c.clone()))
            }
        })
        .collect::<PolarsResult<Vec<_>>>()?;
    let mut frame = DataFrame::new(columns)?;
    CsvWriter::new(writer)
        .include_header(true)
        .finish(&mut frame)?;
    Ok(())
}
