//! Loads datasets from CSV text.
//!
//! - UTF-8, comma-separated
//! - the first row is skipped as a header if any cell is non-numeric
//! - double-quoted fields may contain commas and `""` escapes
//! - label columns, if any, are the trailing columns of each row

use crate::dataset::dataset::{Dataset, Target};
use crate::errors::{NetError, Result};
use crate::math::matrix::Matrix;

/// How the trailing columns of a row are interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LabelColumns {
    /// Every column is an input feature (autoencoder data).
    None,
    /// The last `n` columns are real-valued targets.
    Values(usize),
    /// The last column is a 0-based class index below `n_classes`.
    ClassIndex { n_classes: usize },
}

impl Dataset {
    pub fn from_csv(text: &str, labels: LabelColumns) -> Result<Dataset> {
        let mut lines = text.lines().peekable();
        if let Some(first) = lines.peek() {
            if is_header(first) {
                lines.next();
            }
        }

        let mut inputs: Vec<Vec<f64>> = Vec::new();
        let mut values: Vec<Vec<f64>> = Vec::new();
        let mut classes: Vec<usize> = Vec::new();

        for (row_idx, line) in lines.enumerate() {
            let row = row_idx + 1;
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            let cells = parse_csv_row(line);
            let n_label = match labels {
                LabelColumns::None => 0,
                LabelColumns::Values(n) => n,
                LabelColumns::ClassIndex { .. } => 1,
            };
            if cells.len() <= n_label {
                return Err(NetError::Csv(format!(
                    "Row {row}: expected more than {n_label} columns, got {}",
                    cells.len()
                )));
            }
            let split = cells.len() - n_label;
            inputs.push(parse_floats(&cells[..split], row)?);

            match labels {
                LabelColumns::None => {}
                LabelColumns::Values(_) => values.push(parse_floats(&cells[split..], row)?),
                LabelColumns::ClassIndex { n_classes } => {
                    let cell = cells[split].trim();
                    let class: usize = cell.parse().map_err(|_| {
                        NetError::Csv(format!("Row {row}: class index '{cell}' is not a non-negative integer"))
                    })?;
                    if class >= n_classes {
                        return Err(NetError::Csv(format!(
                            "Row {row}: class index {class} >= n_classes {n_classes}"
                        )));
                    }
                    classes.push(class);
                }
            }
        }

        if inputs.is_empty() {
            return Err(NetError::Csv("CSV contains no data rows".into()));
        }
        let width = inputs[0].len();
        if let Some(i) = inputs.iter().position(|r| r.len() != width) {
            return Err(NetError::Csv(format!(
                "Row {}: feature count {} does not match first row's {width}",
                i + 1,
                inputs[i].len()
            )));
        }

        let target = match labels {
            LabelColumns::None => Target::None,
            LabelColumns::Values(_) => Target::Values(Matrix::from_data(values)),
            LabelColumns::ClassIndex { .. } => Target::Labels(classes),
        };
        Dataset::new(Matrix::from_data(inputs), target, None)
    }
}

/// Returns `true` if the row looks like a header (any cell non-numeric).
fn is_header(line: &str) -> bool {
    parse_csv_row(line).iter().any(|c| {
        let t = c.trim();
        !t.is_empty() && t.parse::<f64>().is_err()
    })
}

/// Splits one CSV row, honouring double-quoted fields.
fn parse_csv_row(line: &str) -> Vec<String> {
    let mut fields = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;
    let mut chars = line.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '"' if in_quotes && chars.peek() == Some(&'"') => {
                current.push('"');
                chars.next();
            }
            '"' => in_quotes = !in_quotes,
            ',' if !in_quotes => fields.push(std::mem::take(&mut current)),
            c => current.push(c),
        }
    }
    fields.push(current);
    fields
}

fn parse_floats(cells: &[String], row: usize) -> Result<Vec<f64>> {
    cells
        .iter()
        .map(|c| {
            c.trim()
                .parse::<f64>()
                .map_err(|_| NetError::Csv(format!("Row {row}: '{}' is not a valid number", c.trim())))
        })
        .collect()
}
