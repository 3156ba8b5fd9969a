pub mod activation;
pub mod registry;

pub use activation::{Activation, ActivationFunction};
pub use registry::{register_activation, register_elementwise};
