use crate::loss::loss::weighted_mean;
use crate::math::matrix::Matrix;

pub struct KlLoss;

const EPS: f64 = 1e-12;

impl KlLoss {
    /// Mean over rows of Σ_j t_j·log(t_j / p_j). Zero target entries add
    /// nothing.
    pub fn loss(predicted: &Matrix, expected: &Matrix, weights: Option<&Matrix>) -> f64 {
        let data = predicted
            .data
            .iter()
            .zip(&expected.data)
            .map(|(ps, ts)| {
                ps.iter()
                    .zip(ts)
                    .map(|(p, t)| if *t > 0.0 { t * ((t + EPS) / (p + EPS)).ln() } else { 0.0 })
                    .collect()
            })
            .collect();
        // Per-element mean times width is the mean of the row sums.
        weighted_mean(&Matrix::from_data(data), weights) * predicted.cols as f64
    }
}
