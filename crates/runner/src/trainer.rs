//! The concrete training work function.
//!
//! Runs entirely inside the worker process, on a blocking thread, under
//! the executor's fault boundary: any error returned here ends up
//! verbatim in the job's `failureReason`.

use std::path::{Path, PathBuf};

use anyhow::Context;
use chrono::Utc;

use autofit_core::training::TrainRequest;

use crate::dataset::{self, TargetValues};
use crate::model::{self, ModelArtifact};

/// File name of the saved model artifact inside the job directory.
pub const MODEL_FILE: &str = "model.json";

/// Where the downloaded dataset lands inside the job directory.
fn data_path(job_dir: &Path, request: &TrainRequest) -> PathBuf {
    job_dir
        .join("data")
        .join(format!("file.{}", request.data.data_type.file_extension()))
}

/// Download, parse, fit, and save a model for `request`.
pub fn train_job(job_dir: &Path, request: &TrainRequest) -> anyhow::Result<()> {
    let data_file = data_path(job_dir, request);
    dataset::download(&request.data.training_data, &data_file)?;
    fit_and_save(job_dir, request, &data_file)
}

/// The post-download stages: parse, extract, fit, persist.
fn fit_and_save(job_dir: &Path, request: &TrainRequest, data_file: &Path) -> anyhow::Result<()> {
    let data = &request.data;
    let config = &request.model_config;

    tracing::info!("loading data");
    let table = dataset::load(data_file, data.data_type)?;

    let training = dataset::features_and_target(&table, data)?;

    tracing::info!(
        rows = training.target.len(),
        features = training.feature_columns.len(),
        "model fit started"
    );
    let (fitted, training_score) = match &training.target {
        TargetValues::Labels(labels) => model::fit_classifier(labels)?,
        TargetValues::Numbers(targets) => {
            model::fit_regressor(&training.features, targets, config)?
        }
    };

    let artifact = ModelArtifact {
        model_type: data.model_type,
        target_field: data.target_field.clone(),
        feature_columns: training.feature_columns,
        trained_at: Utc::now(),
        model_config: config.clone(),
        training_score,
        model: fitted,
    };

    tracing::info!(score = training_score, "saving model to file");
    model::save_artifact(&job_dir.join(MODEL_FILE), &artifact)
        .context("persisting trained model")?;

    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
