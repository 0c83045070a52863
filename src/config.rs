//! Engine configuration.
//!
//! A single JSON document configures loading, validation, cleaning and
//! Tableau preparation. Every section has defaults, so a file only needs to
//! name what it overrides:
//!
//! ```json
//! {
//!   "cleaning": {
//!     "fill": { "age": "median", "city": "Unknown", "email": "drop" },
//!     "outlier_threshold": 3.0,
//!     "corrections": { "state": { "Calif.": "CA" } }
//!   },
//!   "tableau": { "title_case_names": true }
//! }
//! ```
//!
//! Configuration is validated when it is built ([`EngineConfig::validate`]),
//! not when a value is first used.

use crate::error::{Result, ResultExt as _, TablewashError};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;
use std::str::FromStr;

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct EngineConfig {
    pub load: LoadOptions,
    pub validation: ValidationSettings,
    pub cleaning: CleaningPlan,
    pub tableau: PrepSettings,
}

impl EngineConfig {
    /// Load and validate a configuration file.
    ///
    /// # Errors
    ///
    /// Fails when the file cannot be read, is not valid JSON, or holds an
    /// out-of-range setting.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config {}", path.display()))?;
        Self::from_json(&content)
    }

    /// Parse and validate a configuration document.
    ///
    /// # Errors
    ///
    /// Fails on malformed JSON and on any setting [`Self::validate`] rejects.
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json).context("Failed to parse config JSON")?;
        config.validate()?;
        Ok(config)
    }

    /// # Errors
    ///
    /// Fails only if serialization itself fails.
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self).context("Failed to serialize config")
    }

    /// Check every threshold and ratio is in range.
    ///
    /// # Errors
    ///
    /// `Config` naming the first offending setting.
    pub fn validate(&self) -> Result<()> {
        let v = &self.validation;
        positive("validation.outlier_threshold", v.outlier_threshold)?;
        ratio("validation.email_content_ratio", v.email_content_ratio)?;
        ratio("validation.date_content_ratio", v.date_content_ratio)?;
        nonzero("validation.email_sample_size", v.email_sample_size)?;
        nonzero("validation.date_sample_size", v.date_sample_size)?;

        if let Some(threshold) = self.cleaning.outlier_threshold {
            positive("cleaning.outlier_threshold", threshold)?;
        }

        let t = &self.tableau;
        nonzero("tableau.sample_size", t.sample_size)?;
        ratio("tableau.coercion_confidence", t.coercion_confidence)?;
        ratio("tableau.measure_min_unique_ratio", t.measure_min_unique_ratio)?;
        Ok(())
    }
}

fn positive(key: &str, value: f64) -> Result<()> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(TablewashError::Config(format!(
            "{key} must be a positive number, got {value}"
        )))
    }
}

fn ratio(key: &str, value: f64) -> Result<()> {
    if value > 0.0 && value <= 1.0 {
        Ok(())
    } else {
        Err(TablewashError::Config(format!(
            "{key} must be in (0, 1], got {value}"
        )))
    }
}

fn nonzero(key: &str, value: usize) -> Result<()> {
    if value == 0 {
        Err(TablewashError::Config(format!("{key} must be at least 1")))
    } else {
        Ok(())
    }
}

/// How raw CSV text becomes a dataset.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct LoadOptions {
    /// Field values (after trimming) treated as missing.
    pub null_tokens: Vec<String>,
    pub delimiter: char,
}

impl Default for LoadOptions {
    fn default() -> Self {
        Self {
            null_tokens: ["", "NA", "N/A", "NaN", "nan", "null", "NULL", "None"]
                .iter()
                .map(|s| (*s).to_owned())
                .collect(),
            delimiter: ',',
        }
    }
}

/// Tunables for the validator's heuristics.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ValidationSettings {
    /// Cells with |z| above this are outliers.
    pub outlier_threshold: f64,
    /// Non-missing values inspected when guessing whether a column holds emails.
    pub email_sample_size: usize,
    /// Share of sampled values containing '@' that marks a column as email.
    pub email_content_ratio: f64,
    /// Non-missing values inspected when guessing whether a column holds dates.
    pub date_sample_size: usize,
    /// Share of sampled values that must parse as dates.
    pub date_content_ratio: f64,
}

impl Default for ValidationSettings {
    fn default() -> Self {
        Self {
            outlier_threshold: 3.0,
            email_sample_size: 100,
            email_content_ratio: 0.5,
            date_sample_size: 100,
            date_content_ratio: 0.8,
        }
    }
}

/// Tunables for Tableau preparation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct PrepSettings {
    /// Non-missing values sampled when deciding a column's target type.
    pub sample_size: usize,
    /// Minimum parse rate over the sample for datetime/numeric coercion.
    pub coercion_confidence: f64,
    /// Numeric columns need more distinct values than this to be measures.
    pub measure_min_distinct: usize,
    /// Numeric columns need a distinct/row ratio above this to be measures.
    pub measure_min_unique_ratio: f64,
    /// Title_Case each word of a cleaned column name.
    pub title_case_names: bool,
}

impl Default for PrepSettings {
    fn default() -> Self {
        Self {
            sample_size: 1000,
            coercion_confidence: 0.95,
            measure_min_distinct: 2,
            measure_min_unique_ratio: 0.5,
            title_case_names: false,
        }
    }
}

/// What the cleaner should do when driven from configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct CleaningPlan {
    pub remove_duplicates: bool,
    pub fill: FillPlan,
    /// Remove rows with |z| above this in any numeric column.
    pub outlier_threshold: Option<f64>,
    /// Column name -> (bad value -> corrected value).
    pub corrections: BTreeMap<String, BTreeMap<String, String>>,
}

impl Default for CleaningPlan {
    fn default() -> Self {
        Self {
            remove_duplicates: true,
            fill: FillPlan::default(),
            outlier_threshold: None,
            corrections: BTreeMap::new(),
        }
    }
}

impl CleaningPlan {
    pub fn is_empty(&self) -> bool {
        !self.remove_duplicates
            && self.fill.is_empty()
            && self.outlier_threshold.is_none()
            && self.corrections.is_empty()
    }
}

/// Column name -> fill strategy, applied in column-name order.
pub type FillPlan = BTreeMap<String, FillStrategy>;

/// How missing cells in one column are filled.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FillStrategy {
    Mean,
    Median,
    Mode,
    /// Drop rows where the column is missing.
    Drop,
    /// Fill with this value, converted to the column's type.
    Literal(String),
}

impl FillStrategy {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Mean => "mean",
            Self::Median => "median",
            Self::Mode => "mode",
            Self::Drop => "drop",
            Self::Literal(value) => value,
        }
    }
}

impl fmt::Display for FillStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Literal(value) => write!(f, "literal '{value}'"),
            other => f.write_str(other.as_str()),
        }
    }
}

impl FromStr for FillStrategy {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Ok(match s {
            "mean" => Self::Mean,
            "median" => Self::Median,
            "mode" => Self::Mode,
            "drop" => Self::Drop,
            other => Self::Literal(other.to_owned()),
        })
    }
}

// Strategies are written as bare strings ("mean", "Unknown"), numbers or
// booleans. `{"literal": "mean"}` fills with the word "mean" itself.
#[derive(Deserialize, Serialize)]
#[serde(untagged)]
enum RawStrategy {
    Keyword(String),
    Number(f64),
    Flag(bool),
    Literal { literal: serde_json::Value },
}

impl<'de> Deserialize<'de> for FillStrategy {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let strategy = match RawStrategy::deserialize(deserializer)? {
            RawStrategy::Keyword(s) => s.parse().unwrap_or(Self::Literal(s)),
            RawStrategy::Number(n) => Self::Literal(crate::engine::types::Value::Number(n).to_string()),
            RawStrategy::Flag(b) => Self::Literal(b.to_string()),
            RawStrategy::Literal { literal } => Self::Literal(match literal {
                serde_json::Value::String(s) => s,
                other => other.to_string(),
            }),
        };
        Ok(strategy)
    }
}

impl Serialize for FillStrategy {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match self {
            Self::Literal(value) if value.parse::<Self>().ok() != Some(self.clone()) => {
                RawStrategy::Literal {
                    literal: serde_json::Value::String(value.clone()),
                }
                .serialize(serializer)
            }
            other => serializer.serialize_str(other.as_str()),
        }
    }
}
