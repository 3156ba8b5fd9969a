use crate::dataset::dataset::Batch;
use crate::errors::Result;
use crate::layers::layer::Outputs;
use crate::network::network::Network;
use crate::regularizers::regularizer::{matched_outputs, Regularizer, Scope};

/// Sparsity penalty: Σ over matched outputs of mean |h|.
pub struct HiddenL1 {
    pattern: Option<String>,
    weight: f64,
}

impl HiddenL1 {
    pub fn new(pattern: Option<String>, weight: f64) -> HiddenL1 {
        HiddenL1 { pattern, weight }
    }
}

impl Regularizer for HiddenL1 {
    fn name(&self) -> &str {
        "hidden_l1"
    }

    fn weight(&self) -> f64 {
        self.weight
    }

    fn pattern(&self) -> Option<&str> {
        self.pattern.as_deref()
    }

    fn scope(&self) -> Scope {
        Scope::Hidden
    }

    fn penalty(&self, network: &Network, outputs: &Outputs, _batch: &Batch) -> Result<f64> {
        Ok(matched_outputs(self, network, outputs)
            .iter()
            .map(|name| outputs[name].map(f64::abs).mean())
            .sum())
    }
}

/// Σ over matched outputs of mean h².
pub struct HiddenL2 {
    pattern: Option<String>,
    weight: f64,
}

impl HiddenL2 {
    pub fn new(pattern: Option<String>, weight: f64) -> HiddenL2 {
        HiddenL2 { pattern, weight }
    }
}

impl Regularizer for HiddenL2 {
    fn name(&self) -> &str {
        "hidden_l2"
    }

    fn weight(&self) -> f64 {
        self.weight
    }

    fn pattern(&self) -> Option<&str> {
        self.pattern.as_deref()
    }

    fn scope(&self) -> Scope {
        Scope::Hidden
    }

    fn penalty(&self, network: &Network, outputs: &Outputs, _batch: &Batch) -> Result<f64> {
        Ok(matched_outputs(self, network, outputs)
            .iter()
            .map(|name| outputs[name].map(|h| h * h).mean())
            .sum())
    }
}
