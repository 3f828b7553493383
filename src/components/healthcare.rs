//! All-in-one processing step: risk scoring of patient records

use crate::components::{table::Table, StepError};
use std::path::Path;
use tracing::{error, info};

pub const INPUT_PATH: &str = "input_path";
pub const OUTPUT_PATH: &str = "output_path";

pub const RISK_SCORE_COLUMN: &str = "risk_score";

const AGE_WEIGHT: f64 = 0.1;
const HYPERTENSION_WEIGHT: f64 = 10.0;
const HEART_DISEASE_WEIGHT: f64 = 20.0;

/// Risk score of a single patient.
///
/// Both diagnosis terms are substring matches and add up when both occur.
pub fn risk_score(age: f64, diagnosis: &str) -> f64 {
    let hypertension = if diagnosis.contains("Hypertension") {
        HYPERTENSION_WEIGHT
    } else {
        0.0
    };
    let heart_disease = if diagnosis.contains("HeartDisease") {
        HEART_DISEASE_WEIGHT
    } else {
        0.0
    };

    (age * AGE_WEIGHT) + hypertension + heart_disease
}

/// Add a `risk_score` column to the patient table at `input_path` and write
/// the result to `output_path`.
///
/// Returns a status message with the number of processed records.
pub fn process_healthcare_data(input_path: &Path, output_path: &Path) -> Result<String, StepError> {
    info!("Processing healthcare data from {}", input_path.display());

    if !input_path.exists() {
        return Err(StepError::InputNotFound(input_path.to_path_buf()));
    }

    let result = score_records(input_path, output_path);
    if let Err(e) = &result {
        error!("Data processing failed: {}", e);
    }
    result
}

fn score_records(input_path: &Path, output_path: &Path) -> Result<String, StepError> {
    let mut table = Table::read_csv(input_path)?;
    info!("Loaded {} records", table.len());

    let ages = table.column_f64("age")?;
    let diagnoses = table.column_str("diagnosis")?;
    let mut scores = Vec::with_capacity(ages.len());
    for (row, (age, diagnosis)) in ages.iter().zip(diagnoses).enumerate() {
        // Blank cells would score silently, so they stop the step instead
        if !age.is_finite() {
            return Err(StepError::InvalidValue {
                column: "age".to_string(),
                row,
                value: table.column_str("age")?[row].to_string(),
            });
        }
        if diagnosis.trim().is_empty() {
            return Err(StepError::InvalidValue {
                column: "diagnosis".to_string(),
                row,
                value: diagnosis.to_string(),
            });
        }
        scores.push(risk_score(*age, diagnosis));
    }
    table.set_f64_column(RISK_SCORE_COLUMN, &scores)?;

    table.write_csv(output_path)?;
    info!("Saved processed data to {}", output_path.display());

    Ok(format!("Processed {} records successfully", table.len()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_risk_score_terms_are_additive() {
        assert_eq!(risk_score(50.0, "Hypertension"), 15.0);
        assert_eq!(risk_score(50.0, "HeartDisease"), 25.0);
        assert_eq!(risk_score(50.0, "Hypertension;HeartDisease"), 35.0);
        assert_eq!(risk_score(50.0, "Diabetes"), 5.0);
    }

    #[test]
    fn test_risk_score_is_case_sensitive() {
        assert_eq!(risk_score(10.0, "hypertension"), 1.0);
    }

    #[test]
    fn test_process_scores_every_row() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("patients.csv");
        let output = dir.path().join("out/processed.csv");
        std::fs::write(
            &input,
            "patient_id,age,gender,diagnosis,treatment_cost\n\
             1,50,Male,Hypertension,2000\n\
             2,30,Female,HeartDisease Hypertension,5000\n",
        )
        .unwrap();

        let message = process_healthcare_data(&input, &output).unwrap();
        assert_eq!(message, "Processed 2 records successfully");

        let table = Table::read_csv(&output).unwrap();
        assert_eq!(table.column_str(RISK_SCORE_COLUMN).unwrap(), vec!["15.0", "33.0"]);
        assert_eq!(table.column_str("patient_id").unwrap(), vec!["1", "2"]);
    }

    #[test]
    fn test_missing_input_creates_no_output() {
        let dir = tempfile::tempdir().unwrap();
        let output = dir.path().join("processed.csv");

        let err = process_healthcare_data(&dir.path().join("missing.csv"), &output).unwrap_err();
        assert!(matches!(err, StepError::InputNotFound(_)));
        assert!(!output.exists());
    }

    #[test]
    fn test_missing_diagnosis_column_fails() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("patients.csv");
        std::fs::write(&input, "age\n40\n").unwrap();

        let err = process_healthcare_data(&input, &dir.path().join("out.csv")).unwrap_err();
        assert!(matches!(err, StepError::MissingColumn(c) if c == "diagnosis"));
    }

    #[test]
    fn test_blank_diagnosis_fails_without_output() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("patients.csv");
        let output = dir.path().join("processed.csv");
        std::fs::write(
            &input,
            "patient_id,age,gender,diagnosis,treatment_cost\n\
             1,50,Male,Hypertension,2000\n\
             2,30,Female,,5000\n",
        )
        .unwrap();

        let err = process_healthcare_data(&input, &output).unwrap_err();
        assert!(matches!(
            err,
            StepError::InvalidValue { ref column, row: 1, .. } if column == "diagnosis"
        ));
        assert!(!output.exists());
    }

    #[test]
    fn test_blank_age_fails() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("patients.csv");
        std::fs::write(&input, "age,diagnosis\n,Flu\n").unwrap();

        let err = process_healthcare_data(&input, &dir.path().join("out.csv")).unwrap_err();
        assert!(matches!(
            err,
            StepError::InvalidValue { ref column, row: 0, .. } if column == "age"
        ));
    }
}
