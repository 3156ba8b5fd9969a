use rand::rngs::StdRng;
use serde::{Serialize, Deserialize};
use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, OnceLock, RwLock};

use crate::activation::activation::Activation;
use crate::errors::{NetError, Result};
use crate::layers::spec::LayerConfig;
use crate::layers::{dense::Feedforward, input::Input, tied::Tied};
use crate::math::matrix::Matrix;

/// Every named output of a forward pass, keyed `<layer>:<suffix>`. The raw
/// network input sits under [`INPUT_KEY`].
pub type Outputs = BTreeMap<String, Matrix>;

pub const INPUT_KEY: &str = "x";

/// A named parameter matrix, e.g. `hid1.w`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Param {
    pub name: String,
    pub value: Matrix,
}

impl Param {
    pub fn new(name: impl Into<String>, value: Matrix) -> Param {
        Param { name: name.into(), value }
    }
}

/// What a layer sees while it connects: outputs computed so far and every
/// layer built before it.
pub struct Context<'a> {
    pub outputs: &'a Outputs,
    pub layers: &'a [Box<dyn Layer>],
}

impl<'a> Context<'a> {
    pub fn output(&self, name: &str) -> Result<&'a Matrix> {
        self.outputs
            .get(name)
            .ok_or_else(|| NetError::MissingOutput { name: name.to_string() })
    }

    /// Looks up a parameter by its full name (`hid1.w`).
    pub fn param(&self, name: &str) -> Result<&'a Matrix> {
        self.layers
            .iter()
            .flat_map(|layer| layer.params().iter())
            .find(|p| p.name == name)
            .map(|p| &p.value)
            .ok_or_else(|| NetError::MissingParam { name: name.to_string() })
    }
}

/// A stage of a network. Implement this to add a custom layer form and
/// install it with [`register_layer`].
pub trait Layer: Send + Sync {
    fn config(&self) -> &LayerConfig;

    fn activation(&self) -> &Activation;

    fn params(&self) -> &[Param];

    fn params_mut(&mut self) -> &mut [Param];

    /// Computes this layer's outputs as (suffix, value) pairs. The `out`
    /// suffix is required; `pre` is conventional for the pre-activation.
    fn connect(&self, ctx: &Context<'_>) -> Result<Vec<(String, Matrix)>>;

    fn name(&self) -> &str {
        &self.config().name
    }

    fn form(&self) -> &str {
        &self.config().form
    }

    fn size(&self) -> usize {
        self.config().size
    }

    fn inputs(&self) -> &[(String, usize)] {
        &self.config().inputs
    }

    fn input_size(&self) -> usize {
        self.config().input_size()
    }

    fn output_name(&self) -> String {
        format!("{}:out", self.name())
    }

    /// Finds a parameter by its short name (`w`, `b`).
    fn find(&self, param: &str) -> Option<&Param> {
        let full = format!("{}.{}", self.name(), param);
        self.params().iter().find(|p| p.name == full)
    }

    fn num_params(&self) -> usize {
        self.params().iter().map(|p| p.value.len()).sum()
    }

    fn describe(&self) -> String {
        let inputs: Vec<String> = self
            .inputs()
            .iter()
            .map(|(name, size)| format!("{name} {size}"))
            .collect();
        format!(
            "{} \"{}\" ({}) -> {}, {}, {} parameters",
            self.form(),
            self.name(),
            inputs.join(", "),
            self.size(),
            self.activation(),
            self.num_params()
        )
    }
}

/// Builds a layer from its resolved config. `previous` holds the layers that
/// come before it in the stack.
pub type LayerConstructor =
    Arc<dyn Fn(LayerConfig, &[Box<dyn Layer>], &mut StdRng) -> Result<Box<dyn Layer>> + Send + Sync>;

fn forms() -> &'static RwLock<HashMap<String, LayerConstructor>> {
    static FORMS: OnceLock<RwLock<HashMap<String, LayerConstructor>>> = OnceLock::new();
    FORMS.get_or_init(|| {
        let mut table: HashMap<String, LayerConstructor> = HashMap::new();
        table.insert("input".into(), Arc::new(Input::build));
        table.insert("feedforward".into(), Arc::new(Feedforward::build));
        table.insert("tied".into(), Arc::new(Tied::build));
        RwLock::new(table)
    })
}

/// Maps form aliases onto their registered name.
pub fn canonical_form(form: &str) -> String {
    let lower = form.to_lowercase();
    match lower.as_str() {
        "ff" | "dense" => "feedforward".to_string(),
        _ => lower,
    }
}

pub fn is_registered(form: &str) -> bool {
    let guard = forms().read().unwrap_or_else(|e| e.into_inner());
    guard.contains_key(&canonical_form(form))
}

const BUILTIN_FORMS: [&str; 3] = ["input", "feedforward", "tied"];

/// Installs a custom layer form. Re-registering a custom form replaces it;
/// built-in forms and their aliases are rejected.
pub fn register_layer<F>(form: &str, constructor: F) -> Result<()>
where
    F: Fn(LayerConfig, &[Box<dyn Layer>], &mut StdRng) -> Result<Box<dyn Layer>> + Send + Sync + 'static,
{
    let name = canonical_form(form);
    if BUILTIN_FORMS.contains(&name.as_str()) {
        return Err(NetError::Config(format!(
            "cannot register layer form {form:?}: reserved name"
        )));
    }
    let mut guard = forms().write().unwrap_or_else(|e| e.into_inner());
    guard.insert(name, Arc::new(constructor));
    log::debug!("registered layer form {form}");
    Ok(())
}

/// Dispatches a config to the constructor of its form.
pub fn build_layer(
    config: LayerConfig,
    previous: &[Box<dyn Layer>],
    rng: &mut StdRng,
) -> Result<Box<dyn Layer>> {
    let constructor = {
        let guard = forms().read().unwrap_or_else(|e| e.into_inner());
        guard
            .get(&config.form)
            .cloned()
            .ok_or_else(|| NetError::UnknownLayerForm { form: config.form.clone() })?
    };
    constructor(config, previous, rng)
}

/// Overwrites a layer's parameters with saved values, checking names and
/// shapes.
pub fn restore_params(layer: &mut dyn Layer, saved: Vec<Param>) -> Result<()> {
    let name = layer.name().to_string();
    let params = layer.params_mut();
    if params.len() != saved.len() {
        return Err(NetError::shape(format!("parameter count of {name}"), params.len(), saved.len()));
    }
    for (param, value) in params.iter_mut().zip(saved) {
        if param.name != value.name {
            return Err(NetError::MissingParam { name: param.name.clone() });
        }
        if param.value.rows != value.value.rows {
            return Err(NetError::shape(format!("rows of {}", param.name), param.value.rows, value.value.rows));
        }
        if param.value.cols != value.value.cols {
            return Err(NetError::shape(format!("columns of {}", param.name), param.value.cols, value.value.cols));
        }
        param.value = value.value;
    }
    Ok(())
}
