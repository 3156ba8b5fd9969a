use crate::loss::loss::weighted_mean;
use crate::math::matrix::Matrix;

/// Multiclass hinge loss against integer labels.
pub struct HingeLoss;

impl HingeLoss {
    /// Mean over samples of Σ_{j ≠ label} max(0, 1 + p_j - p_label).
    pub fn loss(predicted: &Matrix, labels: &[usize], weights: Option<&Matrix>) -> f64 {
        let errors: Vec<Vec<f64>> = predicted
            .data
            .iter()
            .zip(labels)
            .map(|(row, &label)| {
                let correct = row[label];
                let margin: f64 = row
                    .iter()
                    .enumerate()
                    .filter(|(j, _)| *j != label)
                    .map(|(_, p)| (1.0 + p - correct).max(0.0))
                    .sum();
                vec![margin]
            })
            .collect();
        weighted_mean(&Matrix::from_data(errors), weights)
    }
}
