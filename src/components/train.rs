//! Training step: fit the forest on the processed table

use crate::components::{
    forest::{ForestParams, RandomForestRegressor},
    preprocess::SCALED_COST_COLUMN,
    table::Table,
    StepError,
};
use std::path::{Path, PathBuf};
use tracing::{debug, error, info};

pub const INPUT: &str = "processed_data_path";
pub const OUTPUT: &str = "model_path";

pub const FEATURE_COLUMNS: [&str; 3] = ["age", "gender_Male", "gender_Female"];
pub const TARGET_COLUMN: &str = SCALED_COST_COLUMN;

/// Columns a training or evaluation table must carry
pub const MODEL_COLUMNS: [&str; 4] = ["age", "gender_Male", "gender_Female", SCALED_COST_COLUMN];

/// Free-text column discarded before fitting
pub const DIAGNOSIS_COLUMN: &str = "diagnosis";

/// Fit a regressor on `processed_data_path` and serialize it to
/// `model_path`. Returns the path written.
///
/// The `diagnosis` column is dropped without being encoded, so the model
/// never sees diagnosis information.
pub fn train_model(
    processed_data_path: &Path,
    model_path: &Path,
    params: &ForestParams,
) -> Result<PathBuf, StepError> {
    info!("Training model on {}", processed_data_path.display());

    let result = Table::read_csv(processed_data_path)
        .and_then(|table| fit_table(table, params))
        .and_then(|model| {
            model.save(model_path)?;
            Ok(model_path.to_path_buf())
        });

    match &result {
        Ok(path) => info!("Saved model to {}", path.display()),
        Err(e) => error!("Model training failed: {}", e),
    }
    result
}

/// Fit the forest on an already loaded table
pub fn fit_table(mut table: Table, params: &ForestParams) -> Result<RandomForestRegressor, StepError> {
    if table.drop_column_if_present(DIAGNOSIS_COLUMN) {
        debug!("Dropped '{}' column before fitting", DIAGNOSIS_COLUMN);
    }

    for column in MODEL_COLUMNS {
        require_finite(&table, column)?;
    }

    let x = table.feature_matrix(&FEATURE_COLUMNS)?;
    let y = table.column_f64(TARGET_COLUMN)?;

    RandomForestRegressor::fit(
        &x,
        &y,
        FEATURE_COLUMNS.iter().map(|c| c.to_string()).collect(),
        params,
    )
}

/// Missing or infinite cells cannot be fitted on
fn require_finite(table: &Table, column: &str) -> Result<(), StepError> {
    let values = table.column_f64(column)?;
    match values.iter().position(|v| !v.is_finite()) {
        Some(row) => Err(StepError::InvalidValue {
            column: column.to_string(),
            row,
            value: table.column_str(column)?[row].to_string(),
        }),
        None => Ok(()),
    }
}
