//! In-memory CSV table used by the step functions

use crate::components::StepError;
use std::path::Path;
use tracing::debug;

/// A CSV file loaded fully into memory.
///
/// Cells are kept as the text read from disk so that columns a step does
/// not touch are written back unchanged.
#[derive(Debug, Clone, PartialEq)]
pub struct Table {
    headers: Vec<String>,
    rows: Vec<Vec<String>>,
}

impl Table {
    /// Create a table from headers and rows
    pub fn new(headers: Vec<String>, rows: Vec<Vec<String>>) -> Result<Self, StepError> {
        for (index, row) in rows.iter().enumerate() {
            if row.len() != headers.len() {
                return Err(StepError::InvalidValue {
                    column: "*".to_string(),
                    row: index,
                    value: format!("expected {} fields, found {}", headers.len(), row.len()),
                });
            }
        }
        Ok(Self { headers, rows })
    }

    /// Read a CSV file with a header row.
    ///
    /// Fails with [`StepError::InputNotFound`] before opening anything when
    /// the path does not exist.
    pub fn read_csv(path: &Path) -> Result<Self, StepError> {
        if !path.exists() {
            return Err(StepError::InputNotFound(path.to_path_buf()));
        }

        let mut reader = csv::ReaderBuilder::new().from_path(path)?;
        let headers = reader.headers()?.iter().map(str::to_string).collect();

        let mut rows = Vec::new();
        for record in reader.records() {
            let record = record?;
            rows.push(record.iter().map(str::to_string).collect());
        }

        debug!("Read {} rows from {}", rows.len(), path.display());
        Ok(Self { headers, rows })
    }

    /// Write the table as CSV, creating parent directories as needed
    pub fn write_csv(&self, path: &Path) -> Result<(), StepError> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }

        let mut writer = csv::Writer::from_path(path)?;
        writer.write_record(&self.headers)?;
        for row in &self.rows {
            writer.write_record(row)?;
        }
        writer.flush()?;

        debug!("Wrote {} rows to {}", self.rows.len(), path.display());
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.headers.iter().any(|h| h == name)
    }

    fn column_index(&self, name: &str) -> Result<usize, StepError> {
        self.headers
            .iter()
            .position(|h| h == name)
            .ok_or_else(|| StepError::MissingColumn(name.to_string()))
    }

    /// Get a column as text
    pub fn column_str(&self, name: &str) -> Result<Vec<&str>, StepError> {
        let index = self.column_index(name)?;
        Ok(self.rows.iter().map(|row| row[index].as_str()).collect())
    }

    /// Get a column as numbers. Empty cells read as NaN.
    pub fn column_f64(&self, name: &str) -> Result<Vec<f64>, StepError> {
        let index = self.column_index(name)?;
        self.rows
            .iter()
            .enumerate()
            .map(|(row, cells)| parse_number(&cells[index]).ok_or_else(|| StepError::InvalidValue {
                column: name.to_string(),
                row,
                value: cells[index].clone(),
            }))
            .collect()
    }

    /// Set a column, replacing it in place if it already exists
    pub fn set_column(&mut self, name: &str, values: Vec<String>) -> Result<(), StepError> {
        if values.len() != self.rows.len() {
            return Err(StepError::InvalidValue {
                column: name.to_string(),
                row: values.len().min(self.rows.len()),
                value: format!("{} values for {} rows", values.len(), self.rows.len()),
            });
        }

        match self.headers.iter().position(|h| h == name) {
            Some(index) => {
                for (row, value) in self.rows.iter_mut().zip(values) {
                    row[index] = value;
                }
            }
            None => {
                self.headers.push(name.to_string());
                for (row, value) in self.rows.iter_mut().zip(values) {
                    row.push(value);
                }
            }
        }

        Ok(())
    }

    /// Set a numeric column
    pub fn set_f64_column(&mut self, name: &str, values: &[f64]) -> Result<(), StepError> {
        self.set_column(name, values.iter().map(|v| format_number(*v)).collect())
    }

    /// Drop columns, failing if any of them is missing
    pub fn drop_columns(&mut self, names: &[&str]) -> Result<(), StepError> {
        let mut indices = names
            .iter()
            .map(|name| self.column_index(name))
            .collect::<Result<Vec<_>, _>>()?;
        indices.sort_unstable();
        indices.dedup();

        for index in indices.into_iter().rev() {
            self.headers.remove(index);
            for row in &mut self.rows {
                row.remove(index);
            }
        }

        Ok(())
    }

    /// Drop a column if it exists. Returns whether anything was dropped.
    pub fn drop_column_if_present(&mut self, name: &str) -> bool {
        if self.has_column(name) {
            // Existence checked above
            self.drop_columns(&[name]).is_ok()
        } else {
            false
        }
    }

    /// Build a row-major feature matrix from the named columns
    pub fn feature_matrix(&self, columns: &[&str]) -> Result<Vec<Vec<f64>>, StepError> {
        let features = columns
            .iter()
            .map(|c| self.column_f64(c))
            .collect::<Result<Vec<_>, _>>()?;

        Ok((0..self.len())
            .map(|row| features.iter().map(|column| column[row]).collect())
            .collect())
    }
}

fn parse_number(cell: &str) -> Option<f64> {
    let trimmed = cell.trim();
    if trimmed.is_empty() {
        Some(f64::NAN)
    } else {
        trimmed.parse().ok()
    }
}

/// Format a float the way the CSV writer of the data library does: shortest
/// round-trip form that always carries a decimal point, empty for NaN.
pub fn format_number(value: f64) -> String {
    if value.is_nan() {
        String::new()
    } else {
        format!("{:?}", value)
    }
}
