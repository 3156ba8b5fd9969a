use rand::rngs::StdRng;
use serde::{Serialize, Deserialize};
use std::collections::BTreeMap;

use crate::dataset::dataset::Batch;
use crate::errors::{NetError, Result};
use crate::layers::layer::Outputs;
use crate::math::matrix::Matrix;
use crate::network::network::Network;
use crate::regularizers::{
    contractive::Contractive,
    hidden::{HiddenL1, HiddenL2},
    noise::{BernoulliDropout, GaussianNoise},
    weight::{WeightL1, WeightL2},
};

/// Which part of the network a regularizer reads or rewrites when no
/// pattern is given.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scope {
    /// Weight parameters (`*.w*`).
    Weights,
    /// The input layer's output.
    Input,
    /// Outputs of every layer between input and output.
    Hidden,
}

/// A penalty added to the loss, or a perturbation applied to outputs while
/// the loss is computed.
pub trait Regularizer: Send + Sync {
    fn name(&self) -> &str;

    fn weight(&self) -> f64;

    fn pattern(&self) -> Option<&str>;

    fn scope(&self) -> Scope;

    /// Rewrites an output in place during the forward pass. Only called for
    /// outputs this regularizer [`matches_output`](Self::matches_output).
    fn modify(&self, _value: &mut Matrix, _rng: &mut StdRng) {}

    /// True if the regularizer rewrites outputs rather than adding a penalty.
    fn modifies_graph(&self) -> bool {
        false
    }

    /// Unweighted penalty; the network scales it by [`weight`](Self::weight).
    fn penalty(&self, _network: &Network, _outputs: &Outputs, _batch: &Batch) -> Result<f64> {
        Ok(0.0)
    }

    fn matches_output(&self, network: &Network, output: &str) -> bool {
        match self.pattern() {
            Some(pattern) => glob_match(pattern, output),
            None => match self.scope() {
                Scope::Input => network.input_output() == output,
                Scope::Hidden => network.hidden_outputs().iter().any(|o| o == output),
                Scope::Weights => false,
            },
        }
    }

    fn matches_param(&self, param: &str) -> bool {
        match self.pattern() {
            Some(pattern) => glob_match(pattern, param),
            None => self.scope() == Scope::Weights && glob_match("*.w*", param),
        }
    }

    fn log(&self) {
        log::info!(
            "regularizer {} = {} ({})",
            self.name(),
            self.weight(),
            self.pattern().unwrap_or("default pattern")
        );
    }
}

/// Output names a regularizer applies to, sorted by name.
pub(crate) fn matched_outputs(reg: &dyn Regularizer, network: &Network, outputs: &Outputs) -> Vec<String> {
    outputs
        .keys()
        .filter(|name| reg.matches_output(network, name))
        .cloned()
        .collect()
}

/// Matches `*` (any run of characters) and `?` (any single character).
pub fn glob_match(pattern: &str, text: &str) -> bool {
    let p: Vec<char> = pattern.chars().collect();
    let t: Vec<char> = text.chars().collect();
    let (mut pi, mut ti) = (0, 0);
    let mut star: Option<(usize, usize)> = None;
    while ti < t.len() {
        if pi < p.len() && (p[pi] == '?' || p[pi] == t[ti]) {
            pi += 1;
            ti += 1;
        } else if pi < p.len() && p[pi] == '*' {
            star = Some((pi, ti));
            pi += 1;
        } else if let Some((sp, st)) = star {
            pi = sp + 1;
            ti = st + 1;
            star = Some((sp, st + 1));
        } else {
            return false;
        }
    }
    p[pi..].iter().all(|&c| c == '*')
}

/// A coefficient is a single weight, or a map from glob pattern to weight.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Coefficient {
    Value(f64),
    Patterns(BTreeMap<String, f64>),
}

impl From<f64> for Coefficient {
    fn from(value: f64) -> Coefficient {
        Coefficient::Value(value)
    }
}

/// Regularization coefficients by name. Absent or zero coefficients attach
/// nothing.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RegularizerConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub weight_l1: Option<Coefficient>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub weight_l2: Option<Coefficient>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hidden_l1: Option<Coefficient>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hidden_l2: Option<Coefficient>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contractive: Option<Coefficient>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub input_noise: Option<Coefficient>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub input_dropout: Option<Coefficient>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hidden_noise: Option<Coefficient>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hidden_dropout: Option<Coefficient>,
}

impl RegularizerConfig {
    fn entries(&self) -> [(&'static str, &Option<Coefficient>); 9] {
        [
            ("weight_l1", &self.weight_l1),
            ("weight_l2", &self.weight_l2),
            ("hidden_l1", &self.hidden_l1),
            ("hidden_l2", &self.hidden_l2),
            ("contractive", &self.contractive),
            ("input_noise", &self.input_noise),
            ("input_dropout", &self.input_dropout),
            ("hidden_noise", &self.hidden_noise),
            ("hidden_dropout", &self.hidden_dropout),
        ]
    }

    pub fn is_empty(&self) -> bool {
        self.entries().iter().all(|(_, c)| c.is_none())
    }
}

/// Dispatches one regularizer name.
pub fn build(name: &str, pattern: Option<&str>, weight: f64) -> Result<Box<dyn Regularizer>> {
    let pattern = pattern.map(str::to_string);
    let reg: Box<dyn Regularizer> = match name {
        "weight_l1" => Box::new(WeightL1::new(pattern, weight)),
        "weight_l2" => Box::new(WeightL2::new(pattern, weight)),
        "hidden_l1" => Box::new(HiddenL1::new(pattern, weight)),
        "hidden_l2" => Box::new(HiddenL2::new(pattern, weight)),
        "contractive" => Box::new(Contractive::new(pattern, weight)),
        "input_noise" => Box::new(GaussianNoise::new(name, Scope::Input, pattern, weight)?),
        "hidden_noise" => Box::new(GaussianNoise::new(name, Scope::Hidden, pattern, weight)?),
        "input_dropout" => Box::new(BernoulliDropout::new(name, Scope::Input, pattern, weight)?),
        "hidden_dropout" => Box::new(BernoulliDropout::new(name, Scope::Hidden, pattern, weight)?),
        _ => return Err(NetError::UnknownRegularizer { name: name.to_string() }),
    };
    Ok(reg)
}

/// Turns coefficients into regularizers, skipping zeros.
pub fn from_config(config: &RegularizerConfig) -> Result<Vec<Box<dyn Regularizer>>> {
    let mut regs = Vec::new();
    for (name, coefficient) in config.entries() {
        match coefficient {
            None => {}
            Some(Coefficient::Value(weight)) => {
                if *weight != 0.0 {
                    regs.push(build(name, None, *weight)?);
                }
            }
            Some(Coefficient::Patterns(patterns)) => {
                for (pattern, weight) in patterns {
                    if *weight != 0.0 {
                        regs.push(build(name, Some(pattern), *weight)?);
                    }
                }
            }
        }
    }
    for reg in &regs {
        reg.log();
    }
    Ok(regs)
}
