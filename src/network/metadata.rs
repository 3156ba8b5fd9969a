use serde::{Deserialize, Serialize};

/// Optional annotations attached to a saved network.
/// All fields are Option<> so files without metadata deserialize cleanly.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct ModelMetadata {
    pub description: Option<String>,
    /// Names of the input columns, in order.
    pub input_names: Option<Vec<String>>,
    /// Human-readable class labels for a classifier's outputs.
    pub output_labels: Option<Vec<String>>,
}

impl ModelMetadata {
    /// The label for class `index`, falling back to the index itself.
    pub fn label(&self, index: usize) -> String {
        self.output_labels
            .as_ref()
            .and_then(|labels| labels.get(index))
            .cloned()
            .unwrap_or_else(|| index.to_string())
    }
}
