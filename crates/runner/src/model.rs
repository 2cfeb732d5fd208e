//! Baseline model fitting and the persisted model artifact.
//!
//! Classification fits a majority-class predictor; regression fits a
//! ridge-regularized least-squares linear model, sweeping a small
//! lambda grid against a holdout split until the configured time budget
//! runs out. The fitted model is saved as JSON next to the job's status
//! record.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use std::time::Instant;

use anyhow::{bail, Context};
use serde::{Deserialize, Serialize};

use autofit_core::training::{ModelConfig, ModelType};
use autofit_core::types::Timestamp;

/// Ridge lambda grid swept during regression fitting, weakest first.
const LAMBDA_GRID: &[f64] = &[0.0, 1e-4, 1e-2, 1.0, 10.0];

/// Fraction of rows held out for lambda selection.
const HOLDOUT_FRACTION: f64 = 0.2;

/// A fitted model, serializable as the saved artifact body.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FittedModel {
    /// Predicts the most frequent training label.
    MajorityClass {
        class: String,
        class_counts: BTreeMap<String, usize>,
    },
    /// Linear model: `prediction = intercept + weights . features`.
    LinearRegression {
        weights: Vec<f64>,
        intercept: f64,
        lambda: f64,
    },
}

impl FittedModel {
    /// Predict a numeric value for one feature row (regression models).
    pub fn predict(&self, features: &[f64]) -> Option<f64> {
        match self {
            Self::LinearRegression {
                weights, intercept, ..
            } => {
                let dot: f64 = weights.iter().zip(features).map(|(w, x)| w * x).sum();
                Some(intercept + dot)
            }
            Self::MajorityClass { .. } => None,
        }
    }

    /// Predicted label (classification models).
    pub fn predict_label(&self) -> Option<&str> {
        match self {
            Self::MajorityClass { class, .. } => Some(class),
            Self::LinearRegression { .. } => None,
        }
    }
}

/// Everything persisted for a trained model.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelArtifact {
    pub model_type: ModelType,
    pub target_field: String,
    pub feature_columns: Vec<String>,
    pub trained_at: Timestamp,
    pub model_config: ModelConfig,
    /// Fit quality on the training data: accuracy for classification,
    /// R-squared for regression.
    pub training_score: f64,
    pub model: FittedModel,
}

/// Serialize the artifact to `path` as pretty JSON.
pub fn save_artifact(path: &Path, artifact: &ModelArtifact) -> anyhow::Result<()> {
    let bytes = serde_json::to_vec_pretty(artifact).context("serializing model artifact")?;
    fs::write(path, bytes)
        .with_context(|| format!("writing model artifact to {}", path.display()))?;
    Ok(())
}

// ---------------------------------------------------------------------------
// Classification
// ---------------------------------------------------------------------------

/// Fit the majority-class baseline. Returns the model and its training
/// accuracy (frequency of the majority label).
pub fn fit_classifier(labels: &[String]) -> anyhow::Result<(FittedModel, f64)> {
    if labels.is_empty() {
        bail!("cannot fit a classifier on zero labels");
    }

    let mut class_counts: BTreeMap<String, usize> = BTreeMap::new();
    for label in labels {
        *class_counts.entry(label.clone()).or_default() += 1;
    }

    // BTreeMap iteration makes ties deterministic (first label wins).
    let (class, count) = class_counts
        .iter()
        .max_by_key(|(_, count)| *count)
        .map(|(class, count)| (class.clone(), *count))
        .context("class counts cannot be empty here")?;

    let accuracy = count as f64 / labels.len() as f64;
    Ok((FittedModel::MajorityClass { class, class_counts }, accuracy))
}

// ---------------------------------------------------------------------------
// Regression
// ---------------------------------------------------------------------------

/// Fit a ridge regression, selecting lambda on a holdout split.
///
/// Candidates are evaluated in [`LAMBDA_GRID`] order; the sweep stops
/// early once `total_time` from `config` has elapsed, keeping the best
/// candidate found so far. Returns the refit model (on all rows) and
/// its R-squared on the full training data.
pub fn fit_regressor(
    features: &[Vec<f64>],
    targets: &[f64],
    config: &ModelConfig,
) -> anyhow::Result<(FittedModel, f64)> {
    if features.is_empty() || targets.is_empty() {
        bail!("cannot fit a regressor on zero rows");
    }
    if features.len() != targets.len() {
        bail!(
            "feature/target row mismatch: {} vs {}",
            features.len(),
            targets.len()
        );
    }

    let deadline = Instant::now() + std::time::Duration::from_secs(config.total_time);

    let holdout = ((features.len() as f64) * HOLDOUT_FRACTION).floor() as usize;
    let split = features.len() - holdout;

    let mut best: Option<(f64, f64)> = None; // (lambda, holdout mse)
    for &lambda in LAMBDA_GRID {
        if best.is_some() && Instant::now() >= deadline {
            tracing::warn!(lambda, "time budget exhausted, stopping lambda sweep");
            break;
        }

        let candidate = match solve_ridge(&features[..split], &targets[..split], lambda) {
            Ok(c) => c,
            // A singular system at this lambda just disqualifies it.
            Err(_) if lambda == 0.0 => continue,
            Err(e) => return Err(e),
        };

        let mse = if holdout > 0 {
            mean_squared_error(&candidate, &features[split..], &targets[split..])
        } else {
            mean_squared_error(&candidate, features, targets)
        };

        if best.is_none_or(|(_, best_mse)| mse < best_mse) {
            best = Some((lambda, mse));
        }
    }

    let (lambda, _) = best.context("no ridge candidate could be fit")?;

    // Refit the winning lambda on every row.
    let (weights, intercept) = solve_ridge(features, targets, lambda)?;
    let model = FittedModel::LinearRegression {
        weights,
        intercept,
        lambda,
    };
    let score = r_squared(&model, features, targets);
    Ok((model, score))
}

/// Solve `(X'X + lambda I) w = X'y` with an intercept column, by
/// Gaussian elimination with partial pivoting. Returns (weights,
/// intercept).
fn solve_ridge(
    features: &[Vec<f64>],
    targets: &[f64],
    lambda: f64,
) -> anyhow::Result<(Vec<f64>, f64)> {
    let n_features = features.first().map_or(0, Vec::len);
    let dim = n_features + 1; // trailing intercept column of ones

    // Normal-equation system: A = X'X + lambda I, b = X'y.
    let mut a = vec![vec![0.0; dim]; dim];
    let mut b = vec![0.0; dim];
    for (row, &y) in features.iter().zip(targets) {
        for i in 0..dim {
            let xi = if i < n_features { row[i] } else { 1.0 };
            b[i] += xi * y;
            for j in 0..dim {
                let xj = if j < n_features { row[j] } else { 1.0 };
                a[i][j] += xi * xj;
            }
        }
    }
    // The intercept is conventionally left unregularized.
    for (i, row) in a.iter_mut().enumerate().take(n_features) {
        row[i] += lambda;
    }

    // Forward elimination with partial pivoting.
    for col in 0..dim {
        let pivot_row = (col..dim)
            .max_by(|&x, &y| a[x][col].abs().total_cmp(&a[y][col].abs()))
            .context("empty elimination column")?;
        if a[pivot_row][col].abs() < 1e-12 {
            bail!("singular normal-equation system (lambda = {lambda})");
        }
        a.swap(col, pivot_row);
        b.swap(col, pivot_row);

        for row in (col + 1)..dim {
            let factor = a[row][col] / a[col][col];
            for k in col..dim {
                a[row][k] -= factor * a[col][k];
            }
            b[row] -= factor * b[col];
        }
    }

    // Back substitution.
    let mut solution = vec![0.0; dim];
    for row in (0..dim).rev() {
        let tail: f64 = ((row + 1)..dim).map(|k| a[row][k] * solution[k]).sum();
        solution[row] = (b[row] - tail) / a[row][row];
    }

    let intercept = solution.pop().unwrap_or(0.0);
    Ok((solution, intercept))
}

fn mean_squared_error(candidate: &(Vec<f64>, f64), features: &[Vec<f64>], targets: &[f64]) -> f64 {
    let (weights, intercept) = candidate;
    let n = targets.len().max(1) as f64;
    features
        .iter()
        .zip(targets)
        .map(|(row, &y)| {
            let dot: f64 = weights.iter().zip(row).map(|(w, x)| w * x).sum();
            let err = intercept + dot - y;
            err * err
        })
        .sum::<f64>()
        / n
}

fn r_squared(model: &FittedModel, features: &[Vec<f64>], targets: &[f64]) -> f64 {
    let n = targets.len() as f64;
    let mean = targets.iter().sum::<f64>() / n;
    let ss_tot: f64 = targets.iter().map(|&y| (y - mean) * (y - mean)).sum();
    let ss_res: f64 = features
        .iter()
        .zip(targets)
        .map(|(row, &y)| {
            let pred = model.predict(row).unwrap_or(mean);
            (pred - y) * (pred - y)
        })
        .sum();

    if ss_tot == 0.0 {
        // Constant target: perfect iff residuals are zero too.
        if ss_res == 0.0 {
            1.0
        } else {
            0.0
        }
    } else {
        1.0 - ss_res / ss_tot
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
