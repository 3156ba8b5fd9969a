use serde::{Serialize, Deserialize};

/// The built-in losses.
///
/// - `Mse`, `Mae`, `Huber` — compare outputs with target values (or the
///   input, for autoencoders).
/// - `BinaryCrossEntropy` — target values in [0, 1]; pair with a logistic output.
/// - `KullbackLeibler` — target rows are probability distributions.
/// - `CrossEntropy`, `Hinge` — integer class labels; cross-entropy expects a
///   softmax output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LossType {
    #[serde(rename = "mse")]
    Mse,
    #[serde(rename = "mae")]
    Mae,
    #[serde(rename = "huber")]
    Huber,
    #[serde(rename = "xe", alias = "cross_entropy")]
    CrossEntropy,
    #[serde(rename = "bxe", alias = "binary_cross_entropy")]
    BinaryCrossEntropy,
    #[serde(rename = "hinge")]
    Hinge,
    #[serde(rename = "kl")]
    KullbackLeibler,
}

impl LossType {
    pub fn from_name(name: &str) -> Option<LossType> {
        let found = match name.to_lowercase().as_str() {
            "mse" => LossType::Mse,
            "mae" => LossType::Mae,
            "huber" => LossType::Huber,
            "xe" | "cross_entropy" => LossType::CrossEntropy,
            "bxe" | "binary_cross_entropy" => LossType::BinaryCrossEntropy,
            "hinge" => LossType::Hinge,
            "kl" => LossType::KullbackLeibler,
            _ => return None,
        };
        Some(found)
    }

    pub fn name(&self) -> &'static str {
        match self {
            LossType::Mse => "mse",
            LossType::Mae => "mae",
            LossType::Huber => "huber",
            LossType::CrossEntropy => "xe",
            LossType::BinaryCrossEntropy => "bxe",
            LossType::Hinge => "hinge",
            LossType::KullbackLeibler => "kl",
        }
    }

    /// True for losses computed against integer labels.
    pub fn uses_labels(&self) -> bool {
        matches!(self, LossType::CrossEntropy | LossType::Hinge)
    }
}
