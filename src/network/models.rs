use std::ops::{Deref, DerefMut};

use crate::errors::{NetError, Result};
use crate::layers::spec::LayerSpec;
use crate::math::matrix::Matrix;
use crate::network::network::{argmax, Network};
use crate::network::spec::{NetworkKind, NetworkSpec};

fn checked(network: Network, kind: NetworkKind) -> Result<Network> {
    if network.kind() != kind {
        return Err(NetError::Config(format!(
            "expected a {kind:?} network, got {:?}",
            network.kind()
        )));
    }
    Ok(network)
}

macro_rules! task_network {
    ($(#[$doc:meta])* $name:ident, $kind:expr, $label:literal) => {
        $(#[$doc])*
        pub struct $name {
            network: Network,
        }

        impl $name {
            /// Builds a network with default settings from a list of layers.
            pub fn new(layers: Vec<LayerSpec>) -> Result<$name> {
                $name::from_spec(&NetworkSpec::new($label, $kind, layers))
            }

            pub fn from_spec(spec: &NetworkSpec) -> Result<$name> {
                let network = checked(Network::build(spec)?, $kind)?;
                Ok($name { network })
            }

            pub fn from_network(network: Network) -> Result<$name> {
                Ok($name { network: checked(network, $kind)? })
            }

            pub fn load_json(path: &str) -> Result<$name> {
                $name::from_network(Network::load_json(path)?)
            }

            pub fn into_inner(self) -> Network {
                self.network
            }
        }

        impl Deref for $name {
            type Target = Network;

            fn deref(&self) -> &Network {
                &self.network
            }
        }

        impl DerefMut for $name {
            fn deref_mut(&mut self) -> &mut Network {
                &mut self.network
            }
        }
    };
}

task_network!(
    /// Reconstructs its input. The output layer must match the input width.
    Autoencoder,
    NetworkKind::Autoencoder,
    "autoencoder"
);

task_network!(
    /// Maps inputs to real-valued targets.
    Regressor,
    NetworkKind::Regressor,
    "regressor"
);

task_network!(
    /// Maps inputs to class probabilities over integer labels.
    Classifier,
    NetworkKind::Classifier,
    "classifier"
);

impl Autoencoder {
    /// `None` means the middle layer of the stack; a bare layer name means
    /// its `:out` output.
    fn output_for(&self, layer: Option<&str>) -> String {
        match layer {
            Some(name) if name.contains(':') => name.to_string(),
            Some(name) => format!("{name}:out"),
            None => {
                let layers = self.network.layers();
                layers[layers.len() / 2].output_name()
            }
        }
    }

    /// The code an input produces at `layer`.
    pub fn encode(&self, x: &Matrix, layer: Option<&str>) -> Result<Matrix> {
        let name = self.output_for(layer);
        let mut outputs = self.network.feed_forward(x)?;
        outputs.remove(&name).ok_or(NetError::MissingOutput { name })
    }

    /// Runs a code fed in at `layer` through the rest of the network.
    pub fn decode(&self, z: &Matrix, layer: Option<&str>) -> Result<Matrix> {
        let name = self.output_for(layer);
        let output = self.network.output_name();
        let mut outputs = self.network.feed_from(&name, z)?;
        outputs.remove(&output).ok_or(NetError::MissingOutput { name: output })
    }
}

impl Classifier {
    /// Class probabilities, one row per sample.
    pub fn predict_proba(&self, x: &Matrix) -> Result<Matrix> {
        self.network.predict(x)
    }

    /// The most probable class of each sample.
    pub fn classify(&self, x: &Matrix) -> Result<Vec<usize>> {
        let probs = self.predict_proba(x)?;
        Ok(probs.data.iter().map(|row| argmax(row)).collect())
    }
}
