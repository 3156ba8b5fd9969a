use crate::loss::loss::weighted_mean;
use crate::math::matrix::Matrix;

pub struct MseLoss;

impl MseLoss {
    /// Mean of (predicted - expected)², weighted if `weights` is given.
    pub fn loss(predicted: &Matrix, expected: &Matrix, weights: Option<&Matrix>) -> f64 {
        let err = predicted.clone() - expected.clone();
        weighted_mean(&err.map(|x| x * x), weights)
    }
}
