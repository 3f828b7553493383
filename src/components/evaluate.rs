//! Evaluation step: score the fitted model

use crate::components::{
    ensure_parent,
    forest::RandomForestRegressor,
    metrics::{mean_squared_error, r2_score},
    table::Table,
    train::TARGET_COLUMN,
    StepError,
};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::{error, info};

pub const MODEL_INPUT: &str = "model_path";
pub const DATA_INPUT: &str = "processed_data_path";
pub const OUTPUT: &str = "metrics_path";

/// Metrics written by the evaluation step
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EvaluationMetrics {
    pub mse: f64,
    pub r2_score: f64,
}

impl EvaluationMetrics {
    pub fn load(path: &Path) -> Result<Self, StepError> {
        if !path.exists() {
            return Err(StepError::InputNotFound(path.to_path_buf()));
        }
        Ok(serde_json::from_reader(File::open(path)?)?)
    }
}

/// Reload the model at `model_path`, predict on `processed_data_path` and
/// write MSE and R² to `metrics_path`. Returns the path written.
pub fn evaluate_model(
    model_path: &Path,
    processed_data_path: &Path,
    metrics_path: &Path,
) -> Result<PathBuf, StepError> {
    info!(
        "Evaluating model {} on {}",
        model_path.display(),
        processed_data_path.display()
    );

    let result = score(model_path, processed_data_path).and_then(|metrics| {
        ensure_parent(metrics_path)?;
        let mut writer = BufWriter::new(File::create(metrics_path)?);
        serde_json::to_writer_pretty(&mut writer, &metrics)?;
        writer.flush()?;
        info!("MSE: {}, R2: {}", metrics.mse, metrics.r2_score);
        Ok(metrics_path.to_path_buf())
    });

    if let Err(e) = &result {
        error!("Model evaluation failed: {}", e);
    }
    result
}

fn score(model_path: &Path, processed_data_path: &Path) -> Result<EvaluationMetrics, StepError> {
    let model = RandomForestRegressor::load(model_path)?;
    let table = Table::read_csv(processed_data_path)?;

    let features: Vec<&str> = model.feature_names.iter().map(String::as_str).collect();
    let x = table.feature_matrix(&features)?;
    let y_true = table.column_f64(TARGET_COLUMN)?;
    let y_pred = model.predict(&x)?;

    Ok(EvaluationMetrics {
        mse: mean_squared_error(&y_true, &y_pred)?,
        r2_score: r2_score(&y_true, &y_pred)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::components::{forest::ForestParams, train::train_model};

    const DATA: &str = "age,gender_Male,gender_Female,scaled_treatment_cost\n\
                        50,1,0,2.0\n\
                        30,0,1,1.5\n\
                        70,1,0,4.0\n\
                        45,0,1,2.5\n\
                        60,1,0,3.0\n";

    #[test]
    fn test_evaluate_writes_metrics_json() {
        let dir = tempfile::tempdir().unwrap();
        let data = dir.path().join("processed.csv");
        let model = dir.path().join("model.json");
        let metrics_path = dir.path().join("metrics.json");
        std::fs::write(&data, DATA).unwrap();

        train_model(&data, &model, &ForestParams::default()).unwrap();
        evaluate_model(&model, &data, &metrics_path).unwrap();

        let raw: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&metrics_path).unwrap()).unwrap();
        let object = raw.as_object().unwrap();
        assert_eq!(object.len(), 2);
        assert!(object["mse"].is_f64());
        assert!(object["r2_score"].is_f64());

        let metrics = EvaluationMetrics::load(&metrics_path).unwrap();
        assert!(metrics.mse >= 0.0);
        assert!(metrics.r2_score <= 1.0);
    }

    #[test]
    fn test_evaluation_is_reproducible() {
        let dir = tempfile::tempdir().unwrap();
        let data = dir.path().join("processed.csv");
        std::fs::write(&data, DATA).unwrap();

        let mut runs = Vec::new();
        for run in 0..2 {
            let model = dir.path().join(format!("model-{}.json", run));
            let metrics = dir.path().join(format!("metrics-{}.json", run));
            train_model(&data, &model, &ForestParams::default()).unwrap();
            evaluate_model(&model, &data, &metrics).unwrap();
            runs.push(EvaluationMetrics::load(&metrics).unwrap());
        }

        assert_eq!(runs[0].mse.to_bits(), runs[1].mse.to_bits());
        assert_eq!(runs[0].r2_score.to_bits(), runs[1].r2_score.to_bits());
    }

    #[test]
    fn test_missing_model_fails() {
        let dir = tempfile::tempdir().unwrap();
        let data = dir.path().join("processed.csv");
        std::fs::write(&data, DATA).unwrap();
        let metrics_path = dir.path().join("metrics.json");

        let err = evaluate_model(&dir.path().join("missing.json"), &data, &metrics_path).unwrap_err();
        assert!(matches!(err, StepError::InputNotFound(_)));
        assert!(!metrics_path.exists());
    }
}
