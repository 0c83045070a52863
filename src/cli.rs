use anyhow::{Context as _, Result};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use tablewash::config::EngineConfig;
use tablewash::engine::report::render_text;
use tablewash::engine::{self, Cleaner, Dataset, TableauPrep, ValidationReport, Validator};
use tablewash::export::{export_for_tableau, file_stem};

#[derive(Parser)]
#[command(
    name = "tablewash",
    version,
    about = "Data quality checks, cleaning and Tableau preparation for CSV files"
)]
pub struct Cli {
    /// Also write logs to daily rolling files in this directory
    #[arg(long, global = true, env = "TABLEWASH_LOG_DIR")]
    pub log_dir: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Check a CSV file and print a data quality report
    Validate {
        /// Path to the CSV file
        file: PathBuf,

        /// Path to a JSON engine configuration file
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Print the report as JSON instead of text
        #[arg(long)]
        json: bool,
    },
    /// Clean a CSV file and save the result
    Clean {
        /// Path to the CSV file
        file: PathBuf,

        /// Path to a JSON engine configuration file
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Output file path. Defaults to `<stem>_cleaned.csv` next to the input.
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Validate, clean and export a CSV file for Tableau
    Prepare {
        /// Path to the CSV file
        file: PathBuf,

        /// Path to a JSON engine configuration file
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Directory for the exported files. Defaults to the input's directory.
        #[arg(short, long)]
        out_dir: Option<PathBuf>,

        /// Export the data as loaded, without the cleaning stage
        #[arg(long)]
        skip_clean: bool,

        /// Also write `<stem>_quality_report.txt` to the output directory
        #[arg(long)]
        report: bool,
    },
}

/// Dispatch a parsed subcommand.
///
/// # Errors
///
/// Fails when the input cannot be loaded or an output cannot be written.
pub fn run_command(command: Commands) -> Result<()> {
    match command {
        Commands::Validate { file, config, json } => handle_validate(&file, config.as_deref(), json),
        Commands::Clean {
            file,
            config,
            output,
        } => handle_clean(&file, config.as_deref(), output),
        Commands::Prepare {
            file,
            config,
            out_dir,
            skip_clean,
            report,
        } => handle_prepare(&file, config.as_deref(), out_dir, skip_clean, report),
    }
}

fn load_config(path: Option<&Path>) -> Result<EngineConfig> {
    match path {
        Some(path) => EngineConfig::from_file(path)
            .with_context(|| format!("Failed to load config {}", path.display())),
        None => Ok(EngineConfig::default()),
    }
}

fn load_and_validate(file: &Path, config: &EngineConfig) -> Result<(Dataset, ValidationReport)> {
    let df = engine::load_csv(file, &config.load).context("Failed to load dataset")?;
    let report = Validator::new(&df, config.validation.clone()).validate_all();
    Ok((df, report))
}

fn input_dir(file: &Path) -> PathBuf {
    file.parent()
        .filter(|p| !p.as_os_str().is_empty())
        .map_or_else(|| PathBuf::from("."), Path::to_path_buf)
}

/// Run the configured cleaning plan. Without configured fills, every column
/// the report flagged gets the suggested strategy.
fn clean(df: &Dataset, report: &ValidationReport, config: &EngineConfig) -> (Dataset, Vec<String>) {
    let mut plan = config.cleaning.clone();
    if plan.fill.is_empty() {
        plan.fill = engine::suggested_fill_plan(df, report);
    }

    let mut cleaner = Cleaner::new(df);
    if let Err(e) = cleaner.apply_plan(&plan) {
        tracing::warn!("Cleaning plan applied partially: {e}");
    }
    let log = cleaner.log().to_vec();
    (cleaner.into_dataset(), log)
}

fn handle_validate(file: &Path, config_path: Option<&Path>, json: bool) -> Result<()> {
    let config = load_config(config_path)?;
    let (_, report) = load_and_validate(file, &config)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print!("{}", render_text(&report, &[], &[]));
    }
    Ok(())
}

fn handle_clean(file: &Path, config_path: Option<&Path>, output: Option<PathBuf>) -> Result<()> {
    let config = load_config(config_path)?;
    let (df, report) = load_and_validate(file, &config)?;
    let (cleaned, log) = clean(&df, &report, &config);

    let output = match output {
        Some(path) => path,
        None => input_dir(file).join(format!("{}_cleaned.csv", file_stem(file)?)),
    };
    engine::save_csv(&cleaned, &output)?;

    println!(
        "Cleaned {} rows -> {} rows",
        df.height(),
        cleaned.height()
    );
    for entry in &log {
        println!("  - {entry}");
    }
    println!("Saved to {}", output.display());
    Ok(())
}

fn handle_prepare(
    file: &Path,
    config_path: Option<&Path>,
    out_dir: Option<PathBuf>,
    skip_clean: bool,
    write_report: bool,
) -> Result<()> {
    let config = load_config(config_path)?;
    let (df, report) = load_and_validate(file, &config)?;
    println!(
        "Found {} issues in {} rows and {} columns",
        report.issues.len(),
        df.height(),
        df.width()
    );

    let (cleaned, cleaning_log) = if skip_clean {
        (df, Vec::new())
    } else {
        clean(&df, &report, &config)
    };

    let mut prep = TableauPrep::new(&cleaned, config.tableau.clone());
    prep.clean_column_names()?;
    prep.enforce_data_types()?;
    let guide = prep.create_dimension_measure_guide()?;
    let metadata = prep.generate_metadata()?;

    let stem = file_stem(file)?;
    let out_dir = out_dir.unwrap_or_else(|| input_dir(file));
    let paths = export_for_tableau(prep.dataset(), &metadata, &out_dir, &stem)?;

    println!("Dimensions: {}", guide.dimensions.join(", "));
    println!("Measures: {}", guide.measures.join(", "));
    println!("Date fields: {}", guide.date_fields.join(", "));
    println!("Data saved to {}", paths.data.display());
    println!("Metadata saved to {}", paths.metadata.display());

    if write_report {
        let path = out_dir.join(format!("{stem}_quality_report.txt"));
        std::fs::write(&path, render_text(&report, &cleaning_log, prep.log()))
            .with_context(|| format!("Failed to write report {}", path.display()))?;
        println!("Report saved to {}", path.display());
    }
    Ok(())
}
