use rand::rngs::StdRng;
use rand::Rng;

use crate::errors::{NetError, Result};
use crate::math::matrix::Matrix;
use crate::regularizers::regularizer::{Regularizer, Scope};

/// Adds N(0, σ²) noise to matched outputs; the coefficient is σ.
pub struct GaussianNoise {
    name: String,
    scope: Scope,
    pattern: Option<String>,
    sigma: f64,
}

impl GaussianNoise {
    pub fn new(name: &str, scope: Scope, pattern: Option<String>, sigma: f64) -> Result<GaussianNoise> {
        if sigma < 0.0 {
            return Err(NetError::Config(format!("{name} must be non-negative, got {sigma}")));
        }
        Ok(GaussianNoise { name: name.to_string(), scope, pattern, sigma })
    }
}

impl Regularizer for GaussianNoise {
    fn name(&self) -> &str {
        &self.name
    }

    fn weight(&self) -> f64 {
        self.sigma
    }

    fn pattern(&self) -> Option<&str> {
        self.pattern.as_deref()
    }

    fn scope(&self) -> Scope {
        self.scope
    }

    fn modifies_graph(&self) -> bool {
        true
    }

    fn modify(&self, value: &mut Matrix, rng: &mut StdRng) {
        let noise = Matrix::gaussian(value.rows, value.cols, 0.0, self.sigma, 0.0, rng);
        *value = value.clone() + noise;
    }
}

/// Zeroes each matched unit with probability p and scales survivors by
/// 1/(1-p); the coefficient is p.
pub struct BernoulliDropout {
    name: String,
    scope: Scope,
    pattern: Option<String>,
    p: f64,
}

impl BernoulliDropout {
    pub fn new(name: &str, scope: Scope, pattern: Option<String>, p: f64) -> Result<BernoulliDropout> {
        if !(0.0..1.0).contains(&p) {
            return Err(NetError::Config(format!("{name} must be in [0, 1), got {p}")));
        }
        Ok(BernoulliDropout { name: name.to_string(), scope, pattern, p })
    }
}

impl Regularizer for BernoulliDropout {
    fn name(&self) -> &str {
        &self.name
    }

    fn weight(&self) -> f64 {
        self.p
    }

    fn pattern(&self) -> Option<&str> {
        self.pattern.as_deref()
    }

    fn scope(&self) -> Scope {
        self.scope
    }

    fn modifies_graph(&self) -> bool {
        true
    }

    fn modify(&self, value: &mut Matrix, rng: &mut StdRng) {
        let keep = 1.0 - self.p;
        for row in value.data.iter_mut() {
            for x in row.iter_mut() {
                *x = if rng.gen::<f64>() < self.p { 0.0 } else { *x / keep };
            }
        }
    }
}
