use serde::{Serialize, Deserialize};

/// Result of one `Experiment::evaluate` pass over a dataset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvalStats {
    /// Number of batches evaluated.
    pub batches: usize,
    /// Number of samples evaluated.
    pub samples: usize,
    /// Monitor values averaged over batches, weighted by batch size, in the
    /// order the network reports them (`loss`, `err`, ...).
    pub values: Vec<(String, f64)>,
    /// Wall-clock duration of the pass in milliseconds.
    pub elapsed_ms: u64,
}

impl EvalStats {
    pub fn get(&self, name: &str) -> Option<f64> {
        self.values.iter().find(|(n, _)| n == name).map(|(_, v)| *v)
    }

    /// `loss=0.1234 err=0.1200 ...`
    pub fn summary(&self) -> String {
        self.values
            .iter()
            .map(|(name, value)| format!("{name}={value:.4}"))
            .collect::<Vec<_>>()
            .join(" ")
    }
}
