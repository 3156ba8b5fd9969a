//! Error types shared by every module of the crate.

use thiserror::Error;

/// Errors raised while building, persisting or evaluating a network.
#[derive(Debug, Error)]
pub enum NetError {
    #[error("Unknown activation: {name}")]
    UnknownActivation { name: String },

    #[error("Unknown layer form: {form}")]
    UnknownLayerForm { form: String },

    #[error("Unknown loss: {name}")]
    UnknownLoss { name: String },

    #[error("Unknown regularizer: {name}")]
    UnknownRegularizer { name: String },

    #[error("Invalid layer configuration: {message}")]
    InvalidLayerSpec { message: String },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Shape mismatch for {what}: expected {expected}, got {actual}")]
    ShapeMismatch {
        what: String,
        expected: usize,
        actual: usize,
    },

    #[error("No output named {name}")]
    MissingOutput { name: String },

    #[error("No parameter named {name}")]
    MissingParam { name: String },

    #[error("Loss {loss} needs {what} in the batch")]
    MissingTarget { loss: String, what: String },

    #[error("CSV error: {0}")]
    Csv(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, NetError>;

impl NetError {
    pub(crate) fn layer(message: impl Into<String>) -> NetError {
        NetError::InvalidLayerSpec {
            message: message.into(),
        }
    }

    pub(crate) fn shape(what: impl Into<String>, expected: usize, actual: usize) -> NetError {
        NetError::ShapeMismatch {
            what: what.into(),
            expected,
            actual,
        }
    }
}
