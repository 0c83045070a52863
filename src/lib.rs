//! # Tablewash - data quality checks and Tableau preparation for CSV files
//!
//! Tablewash loads a CSV file into an in-memory [`engine::Dataset`], reports
//! quality issues, repairs what it is told to repair, and reshapes the result
//! so it drops straight into Tableau.
//!
//! ## Quick Start
//!
//! ```no_run
//! use std::path::Path;
//! use tablewash::config::EngineConfig;
//! use tablewash::engine::{self, Cleaner, TableauPrep, Validator};
//!
//! # fn example() -> tablewash::error::Result<()> {
//! let config = EngineConfig::default();
//! let df = engine::load_csv(Path::new("orders.csv"), &config.load)?;
//!
//! let report = Validator::new(&df, config.validation.clone()).validate_all();
//! println!("{} issues", report.issues.len());
//!
//! let mut cleaner = Cleaner::new(&df);
//! cleaner.remove_duplicates()?;
//! cleaner.fill_missing_values(&engine::suggested_fill_plan(&df, &report))?;
//!
//! let mut prep = TableauPrep::new(cleaner.dataset(), config.tableau.clone());
//! prep.clean_column_names()?;
//! prep.enforce_data_types()?;
//! let guide = prep.create_dimension_measure_guide()?;
//! println!("measures: {:?}", guide.measures);
//! # Ok(())
//! # }
//! ```
//!
//! ## Core Modules
//!
//! - [`engine`]: dataset model, validation, cleaning and Tableau preparation
//!   - [`engine::validation`]: read-only checks producing a report
//!   - [`engine::cleaning`]: duplicate, missing value, outlier and value repair
//!   - [`engine::tableau`]: naming, type coercion, field roles and metadata
//! - [`config`]: JSON configuration for every stage
//! - [`export`]: the two CSV files handed to Tableau
//! - [`error`]: error type and context helpers
//! - [`logging`]: `tracing` subscriber setup

#![warn(clippy::all, rust_2018_idioms)]

pub mod config;
pub mod engine;
pub mod error;
pub mod export;
pub mod logging;
