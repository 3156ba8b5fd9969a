pub mod csv;
pub mod dataset;

pub use csv::LabelColumns;
pub use dataset::{Batch, Dataset, Target};
