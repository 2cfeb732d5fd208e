//! Training request schema and validation.
//!
//! Mirrors the connector's submission contract: a `data` block describing
//! the dataset and a `modelConfig` block with the training budgets. Wire
//! field names are camelCase.

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

/// Ensemble size used when the request omits `ensembleSize`.
pub const DEFAULT_ENSEMBLE_SIZE: u32 = 50;

/// Supported dataset file formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DataType {
    Csv,
    Arff,
}

impl DataType {
    /// File extension used when saving the downloaded dataset.
    pub fn file_extension(self) -> &'static str {
        match self {
            Self::Csv => "csv",
            Self::Arff => "arff",
        }
    }
}

/// Kind of model to fit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ModelType {
    Classification,
    Regression,
}

/// Dataset location and shape.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DataConfig {
    /// URL the training data is downloaded from.
    pub training_data: String,
    pub data_type: DataType,
    /// Name of the target column.
    pub target_field: String,
    pub model_type: ModelType,
    /// Columns excluded from the feature set.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub ignore_columns: Vec<String>,
}

/// Training budgets, in seconds and megabytes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelConfig {
    /// Total wall-clock budget for the whole fit, in seconds.
    pub total_time: u64,
    /// Budget per candidate run, in seconds.
    pub time_per_run: u64,
    /// Memory limit for the fit, in MB.
    pub memory_limit: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ensemble_size: Option<u32>,
}

impl ModelConfig {
    /// Requested ensemble size, defaulting to [`DEFAULT_ENSEMBLE_SIZE`].
    pub fn ensemble_size(&self) -> u32 {
        self.ensemble_size.unwrap_or(DEFAULT_ENSEMBLE_SIZE)
    }
}

/// Full submission payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrainRequest {
    pub data: DataConfig,
    #[serde(rename = "modelConfig")]
    pub model_config: ModelConfig,
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

/// Validate a submission before any job is created.
pub fn validate_request(request: &TrainRequest) -> Result<(), CoreError> {
    validate_data_config(&request.data)?;
    validate_model_config(&request.model_config)?;
    Ok(())
}

/// Validate the dataset block: URL scheme, non-empty target field, and
/// that the target is not also listed in `ignoreColumns`.
pub fn validate_data_config(data: &DataConfig) -> Result<(), CoreError> {
    let url = data.training_data.trim();
    if !(url.starts_with("http://") || url.starts_with("https://")) {
        return Err(CoreError::Validation(format!(
            "trainingData must be an http(s) URL, got '{}'",
            data.training_data
        )));
    }

    if data.target_field.trim().is_empty() {
        return Err(CoreError::Validation(
            "targetField must be a non-empty column name".into(),
        ));
    }

    if data.ignore_columns.contains(&data.target_field) {
        return Err(CoreError::Validation(format!(
            "targetField '{}' must not appear in ignoreColumns",
            data.target_field
        )));
    }

    Ok(())
}

/// Validate the budgets: all strictly positive.
pub fn validate_model_config(config: &ModelConfig) -> Result<(), CoreError> {
    if config.total_time == 0 {
        return Err(CoreError::Validation(
            "totalTime must be a positive number of seconds".into(),
        ));
    }
    if config.time_per_run == 0 {
        return Err(CoreError::Validation(
            "timePerRun must be a positive number of seconds".into(),
        ));
    }
    if config.memory_limit == 0 {
        return Err(CoreError::Validation(
            "memoryLimit must be a positive number of MB".into(),
        ));
    }
    if config.ensemble_size == Some(0) {
        return Err(CoreError::Validation(
            "ensembleSize must be positive when provided".into(),
        ));
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
