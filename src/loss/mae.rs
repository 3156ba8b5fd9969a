use crate::loss::loss::weighted_mean;
use crate::math::matrix::Matrix;

pub struct MaeLoss;

impl MaeLoss {
    /// Mean of |predicted - expected|.
    pub fn loss(predicted: &Matrix, expected: &Matrix, weights: Option<&Matrix>) -> f64 {
        let err = predicted.clone() - expected.clone();
        weighted_mean(&err.map(f64::abs), weights)
    }
}
