use crate::dataset::dataset::Batch;
use crate::errors::Result;
use crate::layers::layer::Outputs;
use crate::network::network::Network;
use crate::regularizers::regularizer::{Regularizer, Scope};

/// Σ over matched parameters of mean |w|.
pub struct WeightL1 {
    pattern: Option<String>,
    weight: f64,
}

impl WeightL1 {
    pub fn new(pattern: Option<String>, weight: f64) -> WeightL1 {
        WeightL1 { pattern, weight }
    }
}

impl Regularizer for WeightL1 {
    fn name(&self) -> &str {
        "weight_l1"
    }

    fn weight(&self) -> f64 {
        self.weight
    }

    fn pattern(&self) -> Option<&str> {
        self.pattern.as_deref()
    }

    fn scope(&self) -> Scope {
        Scope::Weights
    }

    fn penalty(&self, network: &Network, _outputs: &Outputs, _batch: &Batch) -> Result<f64> {
        Ok(network
            .params()
            .filter(|p| self.matches_param(&p.name))
            .map(|p| p.value.map(f64::abs).mean())
            .sum())
    }
}

/// Σ over matched parameters of mean w².
pub struct WeightL2 {
    pattern: Option<String>,
    weight: f64,
}

impl WeightL2 {
    pub fn new(pattern: Option<String>, weight: f64) -> WeightL2 {
        WeightL2 { pattern, weight }
    }
}

impl Regularizer for WeightL2 {
    fn name(&self) -> &str {
        "weight_l2"
    }

    fn weight(&self) -> f64 {
        self.weight
    }

    fn pattern(&self) -> Option<&str> {
        self.pattern.as_deref()
    }

    fn scope(&self) -> Scope {
        Scope::Weights
    }

    fn penalty(&self, network: &Network, _outputs: &Outputs, _batch: &Batch) -> Result<f64> {
        Ok(network
            .params()
            .filter(|p| self.matches_param(&p.name))
            .map(|p| p.value.map(|w| w * w).mean())
            .sum())
    }
}
