use serde::{Serialize, Deserialize};
use serde_json::{Map, Value};

use crate::errors::{NetError, Result};
use crate::layers::layer;

/// One entry of a `layers` list.
///
/// The JSON forms mirror what a user would write by hand:
///
/// - `64` — a layer with 64 units and default settings
/// - `[64, "tanh"]`, `["tied", 32]`, `[10, {"name": "code"}]` — elements are
///   read in order: integers set the size, registered form names set the
///   form, other strings are activation expressions and objects merge options
/// - `{"size": 64, "activation": "relu+norm:z", "inputs": ["in", "hid1"]}`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum LayerSpec {
    Size(usize),
    Options(LayerOptions),
    Sequence(Vec<SpecElement>),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SpecElement {
    Size(usize),
    Word(String),
    Options(LayerOptions),
}

/// Keyword options for a layer. Unrecognized keys land in `extra` and are
/// handed to the layer constructor (`mean`, `std`, `sparsity`, ...).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LayerOptions {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub activation: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub form: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub inputs: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub partner: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl LayerOptions {
    pub fn new(size: usize) -> LayerOptions {
        LayerOptions { size: Some(size), ..LayerOptions::default() }
    }

    pub fn activation(mut self, activation: &str) -> LayerOptions {
        self.activation = Some(activation.to_string());
        self
    }

    pub fn form(mut self, form: &str) -> LayerOptions {
        self.form = Some(form.to_string());
        self
    }

    pub fn name(mut self, name: &str) -> LayerOptions {
        self.name = Some(name.to_string());
        self
    }

    pub fn inputs(mut self, inputs: &[&str]) -> LayerOptions {
        self.inputs = Some(inputs.iter().map(|s| s.to_string()).collect());
        self
    }

    pub fn partner(mut self, partner: &str) -> LayerOptions {
        self.partner = Some(partner.to_string());
        self
    }

    pub fn option(mut self, key: &str, value: impl Into<Value>) -> LayerOptions {
        self.extra.insert(key.to_string(), value.into());
        self
    }

    /// Later options win, except that conflicting sizes are an error.
    fn merge(&mut self, other: LayerOptions) -> Result<()> {
        if let Some(size) = other.size {
            self.set_size(size)?;
        }
        if other.activation.is_some() {
            self.activation = other.activation;
        }
        if other.form.is_some() {
            self.form = other.form;
        }
        if other.name.is_some() {
            self.name = other.name;
        }
        if other.inputs.is_some() {
            self.inputs = other.inputs;
        }
        if other.partner.is_some() {
            self.partner = other.partner;
        }
        self.extra.extend(other.extra);
        Ok(())
    }

    fn set_size(&mut self, size: usize) -> Result<()> {
        match self.size {
            Some(existing) if existing != size => Err(NetError::layer(format!(
                "layer spec gives two sizes ({existing} and {size})"
            ))),
            _ => {
                self.size = Some(size);
                Ok(())
            }
        }
    }
}

impl LayerSpec {
    /// Flattens any of the spec forms into plain options.
    pub fn resolve(&self) -> Result<LayerOptions> {
        match self {
            LayerSpec::Size(size) => Ok(LayerOptions::new(*size)),
            LayerSpec::Options(options) => Ok(options.clone()),
            LayerSpec::Sequence(elements) => {
                let mut options = LayerOptions::default();
                for element in elements {
                    match element {
                        SpecElement::Size(size) => options.set_size(*size)?,
                        SpecElement::Word(word) if layer::is_registered(word) => {
                            options.form = Some(word.clone());
                        }
                        SpecElement::Word(word) => {
                            if let Some(previous) = &options.activation {
                                return Err(NetError::layer(format!(
                                    "layer spec gives two activations ({previous} and {word})"
                                )));
                            }
                            options.activation = Some(word.clone());
                        }
                        SpecElement::Options(extra) => options.merge(extra.clone())?,
                    }
                }
                Ok(options)
            }
        }
    }
}

impl From<usize> for LayerSpec {
    fn from(size: usize) -> LayerSpec {
        LayerSpec::Size(size)
    }
}

impl From<(usize, &str)> for LayerSpec {
    fn from((size, word): (usize, &str)) -> LayerSpec {
        LayerSpec::Sequence(vec![SpecElement::Size(size), SpecElement::Word(word.to_string())])
    }
}

impl From<(&str, usize)> for LayerSpec {
    fn from((word, size): (&str, usize)) -> LayerSpec {
        LayerSpec::Sequence(vec![SpecElement::Word(word.to_string()), SpecElement::Size(size)])
    }
}

impl From<LayerOptions> for LayerSpec {
    fn from(options: LayerOptions) -> LayerSpec {
        LayerSpec::Options(options)
    }
}

/// A fully resolved layer description: what the constructors receive and
/// what gets saved next to the parameter values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LayerConfig {
    pub name: String,
    pub form: String,
    pub size: usize,
    pub activation: String,
    /// Ordered (output name, width) pairs this layer reads.
    pub inputs: Vec<(String, usize)>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub partner: Option<String>,
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub extra: Map<String, Value>,
}

impl LayerConfig {
    /// Reads a numeric option, falling back to `default` when absent.
    pub fn extra_f64(&self, key: &str, default: f64) -> Result<f64> {
        match self.extra.get(key) {
            None => Ok(default),
            Some(value) => value.as_f64().ok_or_else(|| {
                NetError::layer(format!(
                    "option {key:?} of layer {:?} must be a number, got {value}",
                    self.name
                ))
            }),
        }
    }

    pub fn input_size(&self) -> usize {
        self.inputs.iter().map(|(_, size)| size).sum()
    }
}
