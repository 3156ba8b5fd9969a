use serde::{Serialize, Deserialize};
use std::collections::HashMap;
use std::sync::{Arc, OnceLock, RwLock};

use crate::dataset::dataset::Batch;
use crate::errors::{NetError, Result};
use crate::layers::layer::Outputs;
use crate::loss::{
    bce::BceLoss, cross_entropy::CrossEntropyLoss, hinge::HingeLoss, huber::HuberLoss,
    kl::KlLoss, loss_type::LossType, mae::MaeLoss, mse::MseLoss,
};
use crate::math::matrix::Matrix;

/// A term of the network loss. Implement this for a custom error measure
/// and install it with [`register_loss`].
pub trait Loss: Send + Sync {
    fn name(&self) -> &str;

    /// Output the loss reads, e.g. `out:out`.
    fn output_name(&self) -> &str;

    /// Weighted losses require per-sample weights in every batch.
    fn weighted(&self) -> bool;

    fn evaluate(&self, outputs: &Outputs, batch: &Batch) -> Result<f64>;
}

/// Serializable description of one loss term.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LossConfig {
    pub name: String,
    #[serde(default = "default_weight")]
    pub weight: f64,
    #[serde(default = "default_output")]
    pub output: String,
    #[serde(default)]
    pub weighted: bool,
}

fn default_weight() -> f64 {
    1.0
}

fn default_output() -> String {
    "out:out".to_string()
}

impl LossConfig {
    pub fn new(name: &str) -> LossConfig {
        LossConfig {
            name: name.to_string(),
            weight: default_weight(),
            output: default_output(),
            weighted: false,
        }
    }
}

/// Σ w·e / Σ w, or the plain mean when `weights` is `None`.
///
/// Label losses pass one error per row; their weights are read from the
/// first column of `weights`.
pub fn weighted_mean(errors: &Matrix, weights: Option<&Matrix>) -> f64 {
    let Some(weights) = weights else {
        return errors.mean();
    };
    let mut total = 0.0;
    let mut norm = 0.0;
    for (e_row, w_row) in errors.data.iter().zip(&weights.data) {
        for (e, w) in e_row.iter().zip(w_row) {
            total += w * e;
            norm += w;
        }
    }
    if norm == 0.0 {
        0.0
    } else {
        total / norm
    }
}

/// One of the built-in losses bound to an output.
#[derive(Debug, Clone)]
pub struct TaskLoss {
    kind: LossType,
    output: String,
    weighted: bool,
}

impl TaskLoss {
    pub fn new(kind: LossType, output: &str, weighted: bool) -> TaskLoss {
        TaskLoss { kind, output: output.to_string(), weighted }
    }

    pub fn kind(&self) -> LossType {
        self.kind
    }

    fn weights<'a>(&self, batch: &'a Batch, rows: usize, cols: usize) -> Result<Option<&'a Matrix>> {
        if !self.weighted {
            return Ok(None);
        }
        let weights = batch.weights.as_ref().ok_or_else(|| NetError::MissingTarget {
            loss: self.kind.name().to_string(),
            what: "weights".to_string(),
        })?;
        if weights.rows != rows {
            return Err(NetError::shape("weight rows", rows, weights.rows));
        }
        if weights.cols < cols {
            return Err(NetError::shape("weight columns", cols, weights.cols));
        }
        Ok(Some(weights))
    }
}

impl Loss for TaskLoss {
    fn name(&self) -> &str {
        self.kind.name()
    }

    fn output_name(&self) -> &str {
        &self.output
    }

    fn weighted(&self) -> bool {
        self.weighted
    }

    fn evaluate(&self, outputs: &Outputs, batch: &Batch) -> Result<f64> {
        let predicted = outputs
            .get(&self.output)
            .ok_or_else(|| NetError::MissingOutput { name: self.output.clone() })?;

        if self.kind.uses_labels() {
            let labels = batch.labels().ok_or_else(|| NetError::MissingTarget {
                loss: self.kind.name().to_string(),
                what: "class labels".to_string(),
            })?;
            if labels.len() != predicted.rows {
                return Err(NetError::shape("label count", predicted.rows, labels.len()));
            }
            if let Some(&bad) = labels.iter().find(|&&l| l >= predicted.cols) {
                return Err(NetError::shape("class label bound", predicted.cols, bad + 1));
            }
            let weights = self.weights(batch, predicted.rows, 1)?;
            return Ok(match self.kind {
                LossType::Hinge => HingeLoss::loss(predicted, labels, weights),
                _ => CrossEntropyLoss::loss(predicted, labels, weights),
            });
        }

        let expected = batch.target_values().ok_or_else(|| NetError::MissingTarget {
            loss: self.kind.name().to_string(),
            what: "target values".to_string(),
        })?;
        if expected.rows != predicted.rows {
            return Err(NetError::shape("target rows", predicted.rows, expected.rows));
        }
        if expected.cols != predicted.cols {
            return Err(NetError::shape("target columns", predicted.cols, expected.cols));
        }
        let weights = self.weights(batch, predicted.rows, predicted.cols)?;
        Ok(match self.kind {
            LossType::Mse => MseLoss::loss(predicted, expected, weights),
            LossType::Mae => MaeLoss::loss(predicted, expected, weights),
            LossType::Huber => HuberLoss::loss(predicted, expected, weights),
            LossType::BinaryCrossEntropy => BceLoss::loss(predicted, expected, weights),
            LossType::KullbackLeibler => KlLoss::loss(predicted, expected, weights),
            LossType::CrossEntropy | LossType::Hinge => unreachable!("label losses handled above"),
        })
    }
}

/// Builds a custom loss from (output name, weighted).
pub type LossConstructor = Arc<dyn Fn(&str, bool) -> Box<dyn Loss> + Send + Sync>;

fn custom_losses() -> &'static RwLock<HashMap<String, LossConstructor>> {
    static TABLE: OnceLock<RwLock<HashMap<String, LossConstructor>>> = OnceLock::new();
    TABLE.get_or_init(|| RwLock::new(HashMap::new()))
}

/// Installs a custom loss under `name`. Built-in names are rejected.
pub fn register_loss<F>(name: &str, constructor: F) -> Result<()>
where
    F: Fn(&str, bool) -> Box<dyn Loss> + Send + Sync + 'static,
{
    if LossType::from_name(name).is_some() {
        return Err(NetError::Config(format!("cannot register loss {name:?}: reserved name")));
    }
    let mut guard = custom_losses().write().unwrap_or_else(|e| e.into_inner());
    guard.insert(name.to_string(), Arc::new(constructor));
    Ok(())
}

/// Dispatches a loss name to a built-in or registered loss.
pub fn build(name: &str, output: &str, weighted: bool) -> Result<Box<dyn Loss>> {
    if let Some(kind) = LossType::from_name(name) {
        return Ok(Box::new(TaskLoss::new(kind, output, weighted)));
    }
    let guard = custom_losses().read().unwrap_or_else(|e| e.into_inner());
    match guard.get(name) {
        Some(constructor) => Ok(constructor(output, weighted)),
        None => Err(NetError::UnknownLoss { name: name.to_string() }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::dataset::Target;

    fn outputs(rows: Vec<Vec<f64>>) -> Outputs {
        let mut out = Outputs::new();
        out.insert("out:out".to_string(), Matrix::from_data(rows));
        out
    }

    #[test]
    fn weighted_mse_ignores_zero_weights() {
        let out = outputs(vec![vec![1.0], vec![5.0]]);
        let batch = Batch::new(
            Matrix::zeros(2, 3),
            Target::Values(Matrix::from_data(vec![vec![0.0], vec![0.0]])),
        )
        .with_weights(Matrix::from_data(vec![vec![1.0], vec![0.0]]));
        let loss = build("mse", "out:out", true).unwrap();
        assert_eq!(loss.evaluate(&out, &batch).unwrap(), 1.0);
    }

    #[test]
    fn weighted_loss_without_weights_fails() {
        let out = outputs(vec![vec![1.0]]);
        let batch = Batch::new(Matrix::zeros(1, 1), Target::None);
        let loss = build("mae", "out:out", true).unwrap();
        assert!(matches!(loss.evaluate(&out, &batch), Err(NetError::MissingTarget { .. })));
    }

    #[test]
    fn unknown_loss_name() {
        assert!(matches!(build("nope", "out:out", false), Err(NetError::UnknownLoss { .. })));
    }
}
