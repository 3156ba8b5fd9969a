use serde::{Serialize, Deserialize};
use std::collections::BTreeMap;

use crate::errors::Result;
use crate::layers::spec::LayerSpec;
use crate::loss::loss_type::LossType;
use crate::network::metadata::ModelMetadata;
use crate::regularizers::regularizer::RegularizerConfig;

/// The task a network is built for. Decides default output activation,
/// default loss and how `score` is computed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NetworkKind {
    /// Reconstructs its input.
    Autoencoder,
    /// Predicts real-valued targets.
    #[default]
    Regressor,
    /// Predicts integer class labels.
    Classifier,
}

impl NetworkKind {
    pub fn default_output_activation(&self) -> &'static str {
        match self {
            NetworkKind::Classifier => "softmax",
            _ => "linear",
        }
    }

    pub fn default_loss(&self) -> LossType {
        match self {
            NetworkKind::Classifier => LossType::CrossEntropy,
            _ => LossType::Mse,
        }
    }
}

pub const DEFAULT_HIDDEN_ACTIVATION: &str = "relu";
pub const DEFAULT_SEED: u64 = 13;

fn default_seed() -> u64 {
    DEFAULT_SEED
}

/// A fully serializable description of a network: its layers, task, loss,
/// regularizers and monitors.
///
/// `NetworkSpec` can be saved to / loaded from JSON independently of any
/// parameter values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NetworkSpec {
    /// Human-readable name used as the model file stem.
    pub name: String,
    #[serde(default)]
    pub kind: NetworkKind,
    /// Ordered layer descriptions, input first.
    pub layers: Vec<LayerSpec>,
    /// Loss name; the kind's default when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub loss: Option<String>,
    /// Losses read per-sample weights from every batch.
    #[serde(default)]
    pub weighted: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hidden_activation: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_activation: Option<String>,
    /// Seed for parameter initialization and regularizer noise.
    #[serde(default = "default_seed")]
    pub seed: u64,
    #[serde(default, skip_serializing_if = "RegularizerConfig::is_empty")]
    pub regularizers: RegularizerConfig,
    /// Threshold monitors: output glob pattern → tests like `"<0.1"`.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub monitors: BTreeMap<String, Vec<String>>,
    #[serde(default)]
    pub metadata: Option<ModelMetadata>,
}

impl NetworkSpec {
    pub fn new(name: &str, kind: NetworkKind, layers: Vec<LayerSpec>) -> NetworkSpec {
        NetworkSpec {
            name: name.to_string(),
            kind,
            layers,
            loss: None,
            weighted: false,
            hidden_activation: None,
            output_activation: None,
            seed: DEFAULT_SEED,
            regularizers: RegularizerConfig::default(),
            monitors: BTreeMap::new(),
            metadata: None,
        }
    }

    /// Serializes the spec to a pretty-printed JSON file.
    pub fn save_json(&self, path: &str) -> Result<()> {
        let file = std::fs::File::create(path)?;
        let writer = std::io::BufWriter::new(file);
        serde_json::to_writer_pretty(writer, self)?;
        Ok(())
    }

    /// Deserializes a `NetworkSpec` from a JSON file.
    pub fn load_json(path: &str) -> Result<NetworkSpec> {
        let file = std::fs::File::open(path)?;
        let reader = std::io::BufReader::new(file);
        Ok(serde_json::from_reader(reader)?)
    }
}
