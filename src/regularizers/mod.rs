pub mod contractive;
pub mod hidden;
pub mod noise;
pub mod regularizer;
pub mod weight;

pub use regularizer::{build, from_config, glob_match, Coefficient, Regularizer, RegularizerConfig, Scope};
