use crate::loss::loss::weighted_mean;
use crate::math::matrix::Matrix;

/// Categorical cross-entropy against integer labels, for a softmax output.
pub struct CrossEntropyLoss;

/// Keeps log() finite when a class probability is exactly zero.
const EPS: f64 = 1e-12;

impl CrossEntropyLoss {
    /// Mean over samples of -log(predicted[i][label_i] + ε).
    ///
    /// `weights`, if given, holds one weight per sample in its first column.
    pub fn loss(predicted: &Matrix, labels: &[usize], weights: Option<&Matrix>) -> f64 {
        let errors: Vec<Vec<f64>> = predicted
            .data
            .iter()
            .zip(labels)
            .map(|(row, &label)| vec![-(row[label] + EPS).ln()])
            .collect();
        weighted_mean(&Matrix::from_data(errors), weights)
    }
}
