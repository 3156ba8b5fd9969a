use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::{Serialize, Deserialize};
use std::collections::BTreeMap;

use crate::dataset::dataset::Batch;
use crate::errors::{NetError, Result};
use crate::layers::layer::{self, Context, Layer, Outputs, Param, INPUT_KEY};
use crate::layers::spec::{LayerConfig, LayerSpec};
use crate::loss::loss::{self, Loss, LossConfig};
use crate::math::matrix::Matrix;
use crate::network::metadata::ModelMetadata;
use crate::network::spec::{NetworkKind, NetworkSpec, DEFAULT_HIDDEN_ACTIVATION};
use crate::regularizers::regularizer::{self, glob_match, Regularizer, RegularizerConfig};

/// A stack of layers plus the losses that score its outputs.
pub struct Network {
    name: String,
    kind: NetworkKind,
    layers: Vec<Box<dyn Layer>>,
    losses: Vec<(LossConfig, Box<dyn Loss>)>,
    weighted: bool,
    hidden_activation: String,
    output_activation: String,
    seed: u64,
    rng: StdRng,
    regularizers: RegularizerConfig,
    monitors: BTreeMap<String, Vec<String>>,
    metadata: Option<ModelMetadata>,
}

/// On-disk form of a network: configs and parameter values, no closures.
#[derive(Serialize, Deserialize)]
struct SavedNetwork {
    name: String,
    kind: NetworkKind,
    weighted: bool,
    hidden_activation: String,
    output_activation: String,
    seed: u64,
    #[serde(default)]
    regularizers: RegularizerConfig,
    #[serde(default)]
    monitors: BTreeMap<String, Vec<String>>,
    #[serde(default)]
    metadata: Option<ModelMetadata>,
    losses: Vec<LossConfig>,
    layers: Vec<SavedLayer>,
}

#[derive(Serialize, Deserialize)]
struct SavedLayer {
    config: LayerConfig,
    params: Vec<Param>,
}

impl Network {
    /// An empty network. Add layers with [`add_layer`](Self::add_layer) and
    /// a loss with [`add_loss`](Self::add_loss).
    pub fn new(name: &str, kind: NetworkKind, seed: u64) -> Network {
        Network {
            name: name.to_string(),
            kind,
            layers: Vec::new(),
            losses: Vec::new(),
            weighted: false,
            hidden_activation: DEFAULT_HIDDEN_ACTIVATION.to_string(),
            output_activation: kind.default_output_activation().to_string(),
            seed,
            rng: StdRng::seed_from_u64(seed),
            regularizers: RegularizerConfig::default(),
            monitors: BTreeMap::new(),
            metadata: None,
        }
    }

    /// Builds every layer of `spec`, attaches its loss and validates the
    /// result.
    pub fn build(spec: &NetworkSpec) -> Result<Network> {
        let mut network = Network::new(&spec.name, spec.kind, spec.seed);
        network.weighted = spec.weighted;
        if let Some(act) = &spec.hidden_activation {
            network.hidden_activation = act.clone();
        }
        if let Some(act) = &spec.output_activation {
            network.output_activation = act.clone();
        }
        network.regularizers = spec.regularizers.clone();
        network.monitors = spec.monitors.clone();
        network.metadata = spec.metadata.clone();

        let last = spec.layers.len().saturating_sub(1);
        for (i, layer_spec) in spec.layers.iter().enumerate() {
            network.add_layer(layer_spec, i == last)?;
        }
        network.validate()?;

        let loss_name = spec
            .loss
            .clone()
            .unwrap_or_else(|| spec.kind.default_loss().name().to_string());
        network.set_loss(&loss_name)?;

        log::info!("network {:?}: {} parameters", network.name, network.num_params());
        Ok(network)
    }

    /// Resolves a layer spec against the layers built so far and appends
    /// the layer. The first layer must be an input layer.
    pub fn add_layer(&mut self, spec: &LayerSpec, is_output: bool) -> Result<()> {
        let options = spec.resolve()?;
        let index = self.layers.len();

        let form = match &options.form {
            Some(form) => layer::canonical_form(form),
            None if index == 0 => "input".to_string(),
            None => "feedforward".to_string(),
        };
        if index == 0 && form != "input" {
            return Err(NetError::layer(format!("first layer must be an input layer, got {form:?}")));
        }
        if index > 0 && form == "input" {
            return Err(NetError::layer("only the first layer can be an input layer"));
        }

        let name = match &options.name {
            Some(name) => name.clone(),
            None if index == 0 => "in".to_string(),
            None if is_output => "out".to_string(),
            None => format!("hid{index}"),
        };
        if name.contains(':') || name.contains('.') {
            return Err(NetError::layer(format!("layer name {name:?} may not contain ':' or '.'")));
        }
        if self.layer(&name).is_some() {
            return Err(NetError::layer(format!("duplicate layer name {name:?}")));
        }

        let inputs = if index == 0 {
            Vec::new()
        } else {
            match &options.inputs {
                Some(names) => names
                    .iter()
                    .map(|n| self.resolve_input(n))
                    .collect::<Result<Vec<_>>>()?,
                None => {
                    let previous = &self.layers[index - 1];
                    vec![(previous.output_name(), previous.size())]
                }
            }
        };

        let partner = if form == "tied" && options.partner.is_none() {
            Some(self.find_tied_partner()?)
        } else {
            options.partner.clone()
        };

        let size = match (options.size, &partner) {
            (Some(size), _) => size,
            (None, Some(partner)) => self
                .layer(partner)
                .map(|l| l.input_size())
                .ok_or_else(|| NetError::layer(format!("tied layer {name:?}: no layer named {partner:?}")))?,
            (None, None) => return Err(NetError::layer(format!("layer {name:?} has no size"))),
        };

        let activation = match &options.activation {
            Some(act) => act.clone(),
            None if index == 0 => "linear".to_string(),
            None if is_output => self.output_activation.clone(),
            None => self.hidden_activation.clone(),
        };

        let config = LayerConfig {
            name,
            form,
            size,
            activation,
            inputs,
            partner,
            extra: options.extra,
        };
        let built = layer::build_layer(config, &self.layers, &mut self.rng)?;
        log::info!("layer {}", built.describe());
        self.layers.push(built);
        Ok(())
    }

    /// `hid1` means `hid1:out`; `hid1:pre` names an output directly.
    fn resolve_input(&self, name: &str) -> Result<(String, usize)> {
        let (layer_name, full) = match name.split_once(':') {
            Some((layer_name, _)) => (layer_name, name.to_string()),
            None => (name, format!("{name}:out")),
        };
        self.layer(layer_name)
            .map(|l| (full, l.size()))
            .ok_or_else(|| NetError::layer(format!("no layer named {layer_name:?} to use as input")))
    }

    /// Walks back through the stack pairing tied layers with untied ones;
    /// the first unmatched untied layer is the partner.
    fn find_tied_partner(&self) -> Result<String> {
        let mut depth: i64 = 1;
        for layer in self.layers.iter().rev() {
            depth += if layer.form() == "tied" { 1 } else { -1 };
            if depth == 0 {
                if layer.form() == "input" {
                    break;
                }
                return Ok(layer.name().to_string());
            }
        }
        Err(NetError::layer("cannot find a partner for tied layer"))
    }

    pub fn validate(&self) -> Result<()> {
        if self.layers.len() < 2 {
            return Err(NetError::Config(format!(
                "network {:?} needs an input and an output layer, has {} layers",
                self.name,
                self.layers.len()
            )));
        }
        if self.kind == NetworkKind::Autoencoder {
            let input = self.layers[0].size();
            let output = self.layers[self.layers.len() - 1].size();
            if input != output {
                return Err(NetError::shape("autoencoder output size", input, output));
            }
        }
        Ok(())
    }

    pub fn add_loss(&mut self, name: &str, weight: f64) -> Result<()> {
        let config = LossConfig {
            name: name.to_string(),
            weight,
            output: self.output_name(),
            weighted: self.weighted,
        };
        let built = loss::build(&config.name, &config.output, config.weighted)?;
        self.losses.push((config, built));
        Ok(())
    }

    /// Replaces all losses with a single one of weight 1.
    pub fn set_loss(&mut self, name: &str) -> Result<()> {
        self.losses.clear();
        self.add_loss(name, 1.0)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> NetworkKind {
        self.kind
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    pub fn layers(&self) -> &[Box<dyn Layer>] {
        &self.layers
    }

    pub fn layer(&self, name: &str) -> Option<&dyn Layer> {
        self.layers.iter().find(|l| l.name() == name).map(|l| l.as_ref())
    }

    pub fn losses(&self) -> impl Iterator<Item = &LossConfig> {
        self.losses.iter().map(|(config, _)| config)
    }

    pub fn metadata(&self) -> Option<&ModelMetadata> {
        self.metadata.as_ref()
    }

    pub fn set_metadata(&mut self, metadata: ModelMetadata) {
        self.metadata = Some(metadata);
    }

    pub fn regularizer_config(&self) -> &RegularizerConfig {
        &self.regularizers
    }

    /// The regularizers configured for this network.
    pub fn regularizers(&self) -> Result<Vec<Box<dyn Regularizer>>> {
        regularizer::from_config(&self.regularizers)
    }

    pub fn input_size(&self) -> usize {
        self.layers.first().map_or(0, |l| l.size())
    }

    pub fn output_size(&self) -> usize {
        self.layers.last().map_or(0, |l| l.size())
    }

    /// Name of the network's final output, e.g. `out:out`.
    pub fn output_name(&self) -> String {
        self.layers
            .last()
            .map_or_else(|| "out:out".to_string(), |l| l.output_name())
    }

    /// Name of the input layer's output, e.g. `in:out`.
    pub fn input_output(&self) -> String {
        self.layers
            .first()
            .map_or_else(|| "in:out".to_string(), |l| l.output_name())
    }

    /// Outputs of the layers strictly between input and output.
    pub fn hidden_outputs(&self) -> Vec<String> {
        if self.layers.len() < 3 {
            return Vec::new();
        }
        self.layers[1..self.layers.len() - 1]
            .iter()
            .map(|l| l.output_name())
            .collect()
    }

    pub fn params(&self) -> impl Iterator<Item = &Param> {
        self.layers.iter().flat_map(|l| l.params().iter())
    }

    pub fn num_params(&self) -> usize {
        self.layers.iter().map(|l| l.num_params()).sum()
    }

    /// Finds parameter `param` (`w`, `b`, ...) of layer `layer`.
    pub fn find(&self, layer: &str, param: &str) -> Result<&Param> {
        self.layer(layer)
            .and_then(|l| l.find(param))
            .ok_or_else(|| NetError::MissingParam { name: format!("{layer}.{param}") })
    }

    /// Mutable access to a parameter, e.g. to load externally trained values.
    pub fn find_mut(&mut self, layer: &str, param: &str) -> Result<&mut Param> {
        let full = format!("{layer}.{param}");
        self.layers
            .iter_mut()
            .flat_map(|l| l.params_mut().iter_mut())
            .find(|p| p.name == full)
            .ok_or(NetError::MissingParam { name: full })
    }

    /// Computes every named output for input rows `x`.
    pub fn feed_forward(&self, x: &Matrix) -> Result<Outputs> {
        let mut seed = Outputs::new();
        seed.insert(INPUT_KEY.to_string(), x.clone());
        self.run_from(0, seed, &[], None)
    }

    /// Like [`feed_forward`](Self::feed_forward), letting graph-modifying
    /// regularizers (noise, dropout) rewrite outputs as they are produced.
    pub fn feed_forward_with(
        &self,
        x: &Matrix,
        regs: &[Box<dyn Regularizer>],
        rng: &mut StdRng,
    ) -> Result<Outputs> {
        let mut seed = Outputs::new();
        seed.insert(INPUT_KEY.to_string(), x.clone());
        self.run_from(0, seed, regs, Some(rng))
    }

    /// Feeds `value` in as output `name` and computes the layers after it.
    pub fn feed_from(&self, name: &str, value: &Matrix) -> Result<Outputs> {
        let index = self
            .layers
            .iter()
            .position(|l| name.starts_with(&format!("{}:", l.name())))
            .ok_or_else(|| NetError::MissingOutput { name: name.to_string() })?;
        let layer = &self.layers[index];
        if value.cols != layer.size() {
            return Err(NetError::shape(format!("value fed as {name}"), layer.size(), value.cols));
        }
        let mut seed = Outputs::new();
        seed.insert(name.to_string(), value.clone());
        self.run_from(index + 1, seed, &[], None)
    }

    fn run_from(
        &self,
        start: usize,
        mut outputs: Outputs,
        regs: &[Box<dyn Regularizer>],
        mut rng: Option<&mut StdRng>,
    ) -> Result<Outputs> {
        for layer in &self.layers[start..] {
            let produced = layer.connect(&Context { outputs: &outputs, layers: &self.layers })?;
            for (suffix, mut value) in produced {
                let full = format!("{}:{}", layer.name(), suffix);
                if let Some(rng) = rng.as_deref_mut() {
                    for reg in regs.iter().filter(|r| r.modifies_graph()) {
                        if reg.matches_output(self, &full) {
                            reg.modify(&mut value, rng);
                        }
                    }
                }
                outputs.insert(full, value);
            }
        }
        Ok(outputs)
    }

    /// The network's final output for input rows `x`.
    pub fn predict(&self, x: &Matrix) -> Result<Matrix> {
        let name = self.output_name();
        let mut outputs = self.feed_forward(x)?;
        outputs.remove(&name).ok_or(NetError::MissingOutput { name })
    }

    /// Σ weight·loss over the configured losses.
    fn error(&self, outputs: &Outputs, batch: &Batch) -> Result<f64> {
        if self.losses.is_empty() {
            return Err(NetError::Config(format!("network {:?} has no loss", self.name)));
        }
        self.losses
            .iter()
            .map(|(config, loss)| -> Result<f64> { Ok(config.weight * loss.evaluate(outputs, batch)?) })
            .sum()
    }

    fn penalties(&self, outputs: &Outputs, batch: &Batch, regs: &[Box<dyn Regularizer>]) -> Result<Vec<(String, f64)>> {
        regs.iter()
            .filter(|r| !r.modifies_graph())
            .map(|r| -> Result<(String, f64)> {
                Ok((r.name().to_string(), r.weight() * r.penalty(self, outputs, batch)?))
            })
            .collect()
    }

    /// Total loss of a batch: losses plus regularizer penalties, with
    /// noise and dropout applied on the way.
    pub fn loss(&self, batch: &Batch, regs: &[Box<dyn Regularizer>], rng: &mut StdRng) -> Result<f64> {
        let outputs = self.feed_forward_with(&batch.inputs, regs, rng)?;
        let error = self.error(&outputs, batch)?;
        let penalty: f64 = self.penalties(&outputs, batch, regs)?.iter().map(|(_, v)| v).sum();
        Ok(error + penalty)
    }

    /// Named values describing a batch, in order: `loss`, `err`, `acc`
    /// (classifiers), each penalty, then threshold monitors.
    pub fn monitors(
        &self,
        batch: &Batch,
        regs: &[Box<dyn Regularizer>],
        rng: &mut StdRng,
    ) -> Result<Vec<(String, f64)>> {
        let outputs = self.feed_forward_with(&batch.inputs, regs, rng)?;
        let error = self.error(&outputs, batch)?;
        let penalties = self.penalties(&outputs, batch, regs)?;
        let total = error + penalties.iter().map(|(_, v)| v).sum::<f64>();

        let mut values = vec![("loss".to_string(), total), ("err".to_string(), error)];
        if self.kind == NetworkKind::Classifier {
            if let Some(labels) = batch.labels() {
                let predicted = outputs
                    .get(&self.output_name())
                    .ok_or_else(|| NetError::MissingOutput { name: self.output_name() })?;
                values.push(("acc".to_string(), accuracy(predicted, labels, batch.weights.as_ref())?));
            }
        }
        values.extend(penalties);

        for (pattern, tests) in &self.monitors {
            for (name, value) in outputs.iter().filter(|(name, _)| glob_match(pattern, name)) {
                for test in tests {
                    values.push((format!("{name}{test}"), threshold_fraction(value, test)?));
                }
            }
        }
        Ok(values)
    }

    /// Accuracy for classifiers; coefficient of determination (R²)
    /// otherwise, weighted when the batch carries weights.
    pub fn score(&self, batch: &Batch) -> Result<f64> {
        let predicted = self.predict(&batch.inputs)?;
        if self.kind == NetworkKind::Classifier {
            let labels = batch.labels().ok_or_else(|| NetError::MissingTarget {
                loss: "score".to_string(),
                what: "class labels".to_string(),
            })?;
            let weights = checked_weights(batch, predicted.rows, 1)?;
            return accuracy(&predicted, labels, weights);
        }
        let expected = batch.target_values().ok_or_else(|| NetError::MissingTarget {
            loss: "score".to_string(),
            what: "target values".to_string(),
        })?;
        if expected.rows != predicted.rows {
            return Err(NetError::shape("target rows", predicted.rows, expected.rows));
        }
        if expected.cols != predicted.cols {
            return Err(NetError::shape("target columns", predicted.cols, expected.cols));
        }
        let weights = checked_weights(batch, predicted.rows, expected.cols)?;
        Ok(r_squared(&predicted, expected, weights))
    }

    pub fn describe(&self) -> String {
        let mut lines = vec![format!("{} ({:?}), {} parameters", self.name, self.kind, self.num_params())];
        for layer in &self.layers {
            lines.push(format!("  layer {}", layer.describe()));
        }
        for (config, _) in &self.losses {
            lines.push(format!("  loss {} x {} on {}", config.name, config.weight, config.output));
        }
        lines.join("\n")
    }

    /// Serializes configs and parameter values to a pretty-printed JSON file.
    pub fn save_json(&self, path: &str) -> Result<()> {
        let saved = SavedNetwork {
            name: self.name.clone(),
            kind: self.kind,
            weighted: self.weighted,
            hidden_activation: self.hidden_activation.clone(),
            output_activation: self.output_activation.clone(),
            seed: self.seed,
            regularizers: self.regularizers.clone(),
            monitors: self.monitors.clone(),
            metadata: self.metadata.clone(),
            losses: self.losses.iter().map(|(c, _)| c.clone()).collect(),
            layers: self
                .layers
                .iter()
                .map(|l| SavedLayer { config: l.config().clone(), params: l.params().to_vec() })
                .collect(),
        };
        let file = std::fs::File::create(path)?;
        let writer = std::io::BufWriter::new(file);
        serde_json::to_writer_pretty(writer, &saved)?;
        log::info!("saved network {:?} to {path}", self.name);
        Ok(())
    }

    /// Rebuilds a network written by `save_json`. Custom activations, layer
    /// forms and losses must be registered first.
    pub fn load_json(path: &str) -> Result<Network> {
        let file = std::fs::File::open(path)?;
        let reader = std::io::BufReader::new(file);
        let saved: SavedNetwork = serde_json::from_reader(reader)?;

        let mut network = Network::new(&saved.name, saved.kind, saved.seed);
        network.weighted = saved.weighted;
        network.hidden_activation = saved.hidden_activation;
        network.output_activation = saved.output_activation;
        network.regularizers = saved.regularizers;
        network.monitors = saved.monitors;
        network.metadata = saved.metadata;

        for saved_layer in saved.layers {
            let mut built = layer::build_layer(saved_layer.config, &network.layers, &mut network.rng)?;
            layer::restore_params(built.as_mut(), saved_layer.params)?;
            network.layers.push(built);
        }
        network.validate()?;
        for config in saved.losses {
            let built = loss::build(&config.name, &config.output, config.weighted)?;
            network.losses.push((config, built));
        }
        log::info!("loaded network {:?} from {path}", network.name);
        Ok(network)
    }
}

/// Index of the maximum element in a slice.
pub fn argmax(v: &[f64]) -> usize {
    v.iter()
        .enumerate()
        .max_by(|(_, a), (_, b)| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal))
        .map(|(i, _)| i)
        .unwrap_or(0)
}

/// The batch weights, if any, once they cover `rows` x `cols`.
fn checked_weights(batch: &Batch, rows: usize, cols: usize) -> Result<Option<&Matrix>> {
    let Some(weights) = batch.weights.as_ref() else {
        return Ok(None);
    };
    if weights.rows != rows {
        return Err(NetError::shape("weight rows", rows, weights.rows));
    }
    if weights.cols < cols {
        return Err(NetError::shape("weight columns", cols, weights.cols));
    }
    Ok(Some(weights))
}

/// (Weighted) fraction of rows whose argmax equals the label.
fn accuracy(predicted: &Matrix, labels: &[usize], weights: Option<&Matrix>) -> Result<f64> {
    if labels.len() != predicted.rows {
        return Err(NetError::shape("label count", predicted.rows, labels.len()));
    }
    let mut hits = 0.0;
    let mut total = 0.0;
    for (i, (row, &label)) in predicted.data.iter().zip(labels).enumerate() {
        let w = weights.map_or(1.0, |w| w.data[i][0]);
        if argmax(row) == label {
            hits += w;
        }
        total += w;
    }
    Ok(if total == 0.0 { 0.0 } else { hits / total })
}

fn r_squared(predicted: &Matrix, expected: &Matrix, weights: Option<&Matrix>) -> f64 {
    let weight_at = |i: usize, j: usize| weights.map_or(1.0, |w| w.data[i][j]);
    let mut norm = 0.0;
    let mut total = 0.0;
    for (i, row) in expected.data.iter().enumerate() {
        for (j, y) in row.iter().enumerate() {
            total += weight_at(i, j) * y;
            norm += weight_at(i, j);
        }
    }
    let mean = if norm == 0.0 { 0.0 } else { total / norm };

    let mut ss_res = 0.0;
    let mut ss_tot = 0.0;
    for (i, (p_row, y_row)) in predicted.data.iter().zip(&expected.data).enumerate() {
        for (j, (p, y)) in p_row.iter().zip(y_row).enumerate() {
            ss_res += weight_at(i, j) * (y - p).powi(2);
            ss_tot += weight_at(i, j) * (y - mean).powi(2);
        }
    }
    if ss_tot == 0.0 {
        return if ss_res == 0.0 { 1.0 } else { 0.0 };
    }
    1.0 - ss_res / ss_tot
}

/// Fraction of entries passing a test like `"<0.1"` or `">0.9"`.
fn threshold_fraction(value: &Matrix, test: &str) -> Result<f64> {
    let bad = || NetError::Config(format!("monitor test {test:?} must look like \"<0.1\" or \">0.9\""));
    let mut chars = test.trim().chars();
    let op = chars.next().ok_or_else(bad)?;
    let threshold: f64 = chars.as_str().trim().parse().map_err(|_| bad())?;
    if value.is_empty() {
        return Ok(0.0);
    }
    let hits = match op {
        '<' => value.iter().filter(|&&x| x < threshold).count(),
        '>' => value.iter().filter(|&&x| x > threshold).count(),
        _ => return Err(bad()),
    };
    Ok(hits as f64 / value.len() as f64)
}
