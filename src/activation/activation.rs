use serde::{Serialize, Deserialize};
use std::f64::consts::PI;
use std::fmt;

use crate::activation::registry::{self, CustomFn};
use crate::errors::{NetError, Result};
use crate::math::matrix::Matrix;

/// Floor for divisors in the row normalizations.
const NORM_EPS: f64 = 1e-7;

const SELU_ALPHA: f64 = 1.673_263_242_354_377_2;
const SELU_SCALE: f64 = 1.050_700_987_355_480_5;

/// Built-in activation stages.
///
/// Most are element-wise. `Softmax` and the `Norm*` variants work on a whole
/// row at a time.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ActivationFunction {
    Identity,
    Sigmoid,
    Tanh,
    Softplus,
    Softmax,
    ReLU,
    /// min(1, z)
    RectMax,
    /// clip(z, 0, 1)
    RectMinMax,
    /// Truncated rectifier: z clipped to [0, 1] for positive z.
    Trel,
    /// Thresholded rectifier: z where z > 1, else 0.
    Trec,
    /// Thresholded linear: z where |z| > 1, else 0.
    Tlin,
    NormMean,
    NormMax,
    NormStd,
    NormZ,
    LeakyReLU { alpha: f64 },
    Elu { alpha: f64 },
    Selu,
    Gelu,
    Swish,
}

impl ActivationFunction {
    /// Looks up a built-in stage by name.
    pub fn from_name(name: &str) -> Option<ActivationFunction> {
        use ActivationFunction::*;
        let found = match name {
            "linear" | "identity" => Identity,
            "logistic" | "sigmoid" => Sigmoid,
            "tanh" => Tanh,
            "softplus" => Softplus,
            "softmax" => Softmax,
            "relu" | "rect:min" => ReLU,
            "rect:max" => RectMax,
            "rect:minmax" => RectMinMax,
            "trel" => Trel,
            "trec" => Trec,
            "tlin" => Tlin,
            "norm:mean" | "norm:dc" => NormMean,
            "norm:max" => NormMax,
            "norm:std" => NormStd,
            "norm:z" => NormZ,
            "leaky_relu" => LeakyReLU { alpha: 0.01 },
            "elu" => Elu { alpha: 1.0 },
            "selu" => Selu,
            "gelu" => Gelu,
            "swish" => Swish,
            _ => return None,
        };
        Some(found)
    }

    /// True if the stage needs the whole row rather than one value.
    pub fn is_row_wise(&self) -> bool {
        use ActivationFunction::*;
        matches!(self, Softmax | NormMean | NormMax | NormStd | NormZ)
    }

    /// Element-wise activation. Row-wise stages pass `x` through here; use
    /// `apply_row` for them.
    pub fn function(&self, x: f64) -> f64 {
        match self {
            ActivationFunction::Identity => x,
            ActivationFunction::Sigmoid => 1.0 / (1.0 + (-x).exp()),
            ActivationFunction::Tanh => x.tanh(),
            ActivationFunction::Softplus => x.max(0.0) + (1.0 + (-x.abs()).exp()).ln(),
            ActivationFunction::ReLU => if x > 0.0 { x } else { 0.0 },
            ActivationFunction::RectMax => x.min(1.0),
            ActivationFunction::RectMinMax => x.clamp(0.0, 1.0),
            ActivationFunction::Trel => if x > 0.0 { x.min(1.0) } else { 0.0 },
            ActivationFunction::Trec => if x > 1.0 { x } else { 0.0 },
            ActivationFunction::Tlin => if x.abs() > 1.0 { x } else { 0.0 },
            ActivationFunction::LeakyReLU { alpha } => if x > 0.0 { x } else { alpha * x },
            ActivationFunction::Elu { alpha } => {
                if x > 0.0 { x } else { alpha * (x.exp() - 1.0) }
            }
            ActivationFunction::Selu => {
                SELU_SCALE * if x > 0.0 { x } else { SELU_ALPHA * (x.exp() - 1.0) }
            }
            ActivationFunction::Gelu => {
                let c = (2.0_f64 / PI).sqrt();
                0.5 * x * (1.0 + (c * (x + 0.044715 * x.powi(3))).tanh())
            }
            ActivationFunction::Swish => x / (1.0 + (-x).exp()),
            ActivationFunction::Softmax
            | ActivationFunction::NormMean
            | ActivationFunction::NormMax
            | ActivationFunction::NormStd
            | ActivationFunction::NormZ => x,
        }
    }

    /// Applies the stage to one row.
    pub fn apply_row(&self, row: &[f64]) -> Vec<f64> {
        match self {
            ActivationFunction::Softmax => softmax(row),
            ActivationFunction::NormMean => {
                let m = row_mean(row);
                row.iter().map(|x| x - m).collect()
            }
            ActivationFunction::NormMax => {
                let peak = row.iter().fold(0.0_f64, |acc, x| acc.max(x.abs())).max(NORM_EPS);
                row.iter().map(|x| x / peak).collect()
            }
            ActivationFunction::NormStd => {
                let s = row_std(row).max(NORM_EPS);
                row.iter().map(|x| x / s).collect()
            }
            ActivationFunction::NormZ => {
                let m = row_mean(row);
                let s = row_std(row).max(NORM_EPS);
                row.iter().map(|x| (x - m) / s).collect()
            }
            _ => row.iter().map(|&x| self.function(x)).collect(),
        }
    }
}

fn softmax(row: &[f64]) -> Vec<f64> {
    let max = row.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
    let exps: Vec<f64> = row.iter().map(|x| (x - max).exp()).collect();
    let total: f64 = exps.iter().sum();
    exps.into_iter().map(|e| e / total).collect()
}

fn row_mean(row: &[f64]) -> f64 {
    if row.is_empty() {
        0.0
    } else {
        row.iter().sum::<f64>() / row.len() as f64
    }
}

fn row_std(row: &[f64]) -> f64 {
    let m = row_mean(row);
    let n = row.len().max(1) as f64;
    (row.iter().map(|x| (x - m).powi(2)).sum::<f64>() / n).sqrt()
}

#[derive(Clone)]
enum Stage {
    Builtin(ActivationFunction),
    Custom(CustomFn),
}

/// A parsed activation expression such as `"relu"` or `"relu+norm:z"`.
///
/// Stages joined by `+` run left to right. The expression string is what
/// gets serialized; deserializing rebuilds the stages, so custom names must
/// be registered before a saved model is loaded.
#[derive(Clone, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Activation {
    expr: String,
    stages: Vec<Stage>,
}

impl Activation {
    pub fn build(expr: &str) -> Result<Activation> {
        let expr = expr.trim();
        let mut stages = Vec::new();
        for name in expr.split('+').map(str::trim) {
            let stage = match ActivationFunction::from_name(name) {
                Some(builtin) => Stage::Builtin(builtin),
                None => match registry::lookup(name) {
                    Some(custom) => Stage::Custom(custom),
                    None => {
                        return Err(NetError::UnknownActivation {
                            name: name.to_string(),
                        })
                    }
                },
            };
            stages.push(stage);
        }
        Ok(Activation {
            expr: expr.to_string(),
            stages,
        })
    }

    pub fn linear() -> Activation {
        Activation {
            expr: "linear".to_string(),
            stages: vec![Stage::Builtin(ActivationFunction::Identity)],
        }
    }

    pub fn expr(&self) -> &str {
        &self.expr
    }

    pub fn apply(&self, z: &Matrix) -> Matrix {
        let mut current = z.clone();
        for stage in &self.stages {
            current = match stage {
                Stage::Builtin(f) if f.is_row_wise() => current.map_rows(|row| f.apply_row(row)),
                Stage::Builtin(f) => current.map(|x| f.function(x)),
                Stage::Custom(f) => f(&current),
            };
        }
        current
    }
}

impl TryFrom<String> for Activation {
    type Error = NetError;

    fn try_from(expr: String) -> Result<Activation> {
        Activation::build(&expr)
    }
}

impl From<Activation> for String {
    fn from(activation: Activation) -> String {
        activation.expr
    }
}

impl PartialEq for Activation {
    fn eq(&self, other: &Self) -> bool {
        self.expr == other.expr
    }
}

impl fmt::Debug for Activation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Activation({})", self.expr)
    }
}

impl fmt::Display for Activation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.expr)
    }
}
