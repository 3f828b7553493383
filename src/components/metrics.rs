//! Regression metrics

use crate::components::StepError;

fn check_inputs(y_true: &[f64], y_pred: &[f64]) -> Result<(), StepError> {
    if y_true.len() != y_pred.len() {
        return Err(StepError::Model(format!(
            "{} targets but {} predictions",
            y_true.len(),
            y_pred.len()
        )));
    }
    if y_true.is_empty() {
        return Err(StepError::EmptyData("no samples to score".to_string()));
    }
    Ok(())
}

/// Mean squared error: `mean((y_true - y_pred)^2)`
pub fn mean_squared_error(y_true: &[f64], y_pred: &[f64]) -> Result<f64, StepError> {
    check_inputs(y_true, y_pred)?;

    let sum_sq: f64 = y_true
        .iter()
        .zip(y_pred)
        .map(|(t, p)| (t - p).powi(2))
        .sum();

    Ok(sum_sq / y_true.len() as f64)
}

/// Coefficient of determination: `1 - SS_res / SS_tot`.
///
/// With a constant target (`SS_tot == 0`) the score is 1.0 for a perfect fit
/// and 0.0 otherwise. Can be negative when the model is worse than
/// predicting the mean.
pub fn r2_score(y_true: &[f64], y_pred: &[f64]) -> Result<f64, StepError> {
    check_inputs(y_true, y_pred)?;

    let mean = y_true.iter().sum::<f64>() / y_true.len() as f64;
    let ss_res: f64 = y_true
        .iter()
        .zip(y_pred)
        .map(|(t, p)| (t - p).powi(2))
        .sum();
    let ss_tot: f64 = y_true.iter().map(|t| (t - mean).powi(2)).sum();

    if ss_tot == 0.0 {
        return Ok(if ss_res == 0.0 { 1.0 } else { 0.0 });
    }

    Ok(1.0 - ss_res / ss_tot)
}
