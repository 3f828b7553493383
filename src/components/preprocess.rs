//! Preprocessing step: gender indicators and cost scaling

use crate::components::{table::Table, StepError};
use std::path::{Path, PathBuf};
use tracing::{error, info};

pub const INPUT: &str = "input_data_path";
pub const OUTPUT: &str = "processed_data_path";

pub const GENDER_COLUMN: &str = "gender";
pub const ID_COLUMN: &str = "patient_id";
pub const COST_COLUMN: &str = "treatment_cost";
pub const SCALED_COST_COLUMN: &str = "scaled_treatment_cost";

/// Categories one-hot encoded from the gender column
pub const GENDER_CATEGORIES: [&str; 2] = ["Male", "Female"];

pub const REQUIRED_COLUMNS: &[&str] = &["age", GENDER_COLUMN, COST_COLUMN, ID_COLUMN];
pub const PRODUCED_COLUMNS: &[&str] = &["age", "gender_Male", "gender_Female", SCALED_COST_COLUMN];

const COST_SCALE: f64 = 1000.0;

/// Name of the indicator column for a gender category
pub fn indicator_column(category: &str) -> String {
    format!("{}_{}", GENDER_COLUMN, category)
}

/// Encode gender, scale the treatment cost and drop `gender` and
/// `patient_id`. Returns the path written.
pub fn preprocess_data(input_data_path: &Path, output_path: &Path) -> Result<PathBuf, StepError> {
    info!("Preprocessing data from {}", input_data_path.display());

    let result = preprocess_table(input_data_path).and_then(|table| {
        table.write_csv(output_path)?;
        Ok(output_path.to_path_buf())
    });

    match &result {
        Ok(path) => info!("Saved preprocessed data to {}", path.display()),
        Err(e) => error!("Preprocessing failed: {}", e),
    }
    result
}

/// Apply the preprocessing transform to the table read from `input_data_path`
pub fn preprocess_table(input_data_path: &Path) -> Result<Table, StepError> {
    let mut table = Table::read_csv(input_data_path)?;

    let genders: Vec<String> = table
        .column_str(GENDER_COLUMN)?
        .into_iter()
        .map(str::to_string)
        .collect();
    for category in GENDER_CATEGORIES {
        let indicators = genders
            .iter()
            .map(|g| (if g == category { "1" } else { "0" }).to_string())
            .collect();
        table.set_column(&indicator_column(category), indicators)?;
    }

    let scaled: Vec<f64> = table
        .column_f64(COST_COLUMN)?
        .into_iter()
        .map(|cost| cost / COST_SCALE)
        .collect();
    table.set_f64_column(SCALED_COST_COLUMN, &scaled)?;

    table.drop_columns(&[GENDER_COLUMN, ID_COLUMN])?;

    Ok(table)
}
