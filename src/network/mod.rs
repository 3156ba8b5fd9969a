pub mod metadata;
pub mod models;
pub mod network;
pub mod spec;

pub use metadata::ModelMetadata;
pub use models::{Autoencoder, Classifier, Regressor};
pub use network::Network;
pub use spec::{NetworkKind, NetworkSpec};
