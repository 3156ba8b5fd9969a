use crate::loss::loss::weighted_mean;
use crate::math::matrix::Matrix;

pub struct HuberLoss;

const DELTA: f64 = 1.0;

impl HuberLoss {
    /// Mean of h(predicted - expected)
    /// where h(x) = 0.5·x²  if |x| ≤ δ
    ///              δ·(|x| - 0.5·δ)  otherwise
    pub fn loss(predicted: &Matrix, expected: &Matrix, weights: Option<&Matrix>) -> f64 {
        let err = predicted.clone() - expected.clone();
        let h = err.map(|x| {
            if x.abs() <= DELTA {
                0.5 * x * x
            } else {
                DELTA * (x.abs() - 0.5 * DELTA)
            }
        });
        weighted_mean(&h, weights)
    }
}
