use crate::loss::loss::weighted_mean;
use crate::math::matrix::Matrix;

pub struct BceLoss;

const EPS: f64 = 1e-12;

impl BceLoss {
    /// Mean of -(y·log(p+ε) + (1-y)·log(1-p+ε)).
    pub fn loss(predicted: &Matrix, expected: &Matrix, weights: Option<&Matrix>) -> f64 {
        let data = predicted
            .data
            .iter()
            .zip(&expected.data)
            .map(|(ps, ys)| {
                ps.iter()
                    .zip(ys)
                    .map(|(p, y)| -(y * (p + EPS).ln() + (1.0 - y) * (1.0 - p + EPS).ln()))
                    .collect()
            })
            .collect();
        weighted_mean(&Matrix::from_data(data), weights)
    }
}
