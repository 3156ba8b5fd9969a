pub mod errors;
pub mod math;
pub mod activation;
pub mod layers;
pub mod loss;
pub mod regularizers;
pub mod network;
pub mod dataset;
pub mod experiment;

// Convenience re-exports
pub use errors::{NetError, Result};
pub use math::matrix::Matrix;
pub use activation::activation::{Activation, ActivationFunction};
pub use activation::registry::{register_activation, register_elementwise};
pub use layers::layer::{register_layer, Layer};
pub use layers::spec::{LayerOptions, LayerSpec};
pub use loss::loss::{register_loss, Loss};
pub use regularizers::regularizer::{Regularizer, RegularizerConfig};
pub use network::{Autoencoder, Classifier, Network, NetworkKind, NetworkSpec, Regressor};
pub use dataset::dataset::{Batch, Dataset, Target};
pub use experiment::{EvalConfig, EvalStats, Experiment};
