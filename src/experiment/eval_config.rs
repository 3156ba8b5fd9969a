use serde::{Serialize, Deserialize};

use crate::errors::Result;
use crate::regularizers::regularizer::RegularizerConfig;

/// Settings for an `Experiment::evaluate` pass.
///
/// - `batch_size`   — samples per batch; `None` evaluates everything at once
/// - `shuffle`      — shuffle samples before batching
/// - `seed`         — seed for shuffling and for noise/dropout regularizers
/// - `regularizers` — overrides the network's own regularizers when set
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvalConfig {
    #[serde(default)]
    pub batch_size: Option<usize>,
    #[serde(default)]
    pub shuffle: bool,
    #[serde(default = "default_seed")]
    pub seed: u64,
    #[serde(default)]
    pub regularizers: Option<RegularizerConfig>,
}

fn default_seed() -> u64 {
    13
}

impl Default for EvalConfig {
    fn default() -> Self {
        EvalConfig {
            batch_size: None,
            shuffle: false,
            seed: default_seed(),
            regularizers: None,
        }
    }
}

impl EvalConfig {
    pub fn new(batch_size: usize) -> Self {
        EvalConfig { batch_size: Some(batch_size), ..EvalConfig::default() }
    }

    pub fn load_json(path: &str) -> Result<EvalConfig> {
        let file = std::fs::File::open(path)?;
        let reader = std::io::BufReader::new(file);
        Ok(serde_json::from_reader(reader)?)
    }
}
