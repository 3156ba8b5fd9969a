use crate::dataset::dataset::Batch;
use crate::errors::Result;
use crate::layers::layer::Outputs;
use crate::network::network::Network;
use crate::regularizers::regularizer::{matched_outputs, Regularizer, Scope};

/// Step for the central differences.
const STEP: f64 = 1e-4;

/// Mean over samples of ‖∂h/∂x‖²_F for every matched output h.
///
/// The Jacobian is estimated by central finite differences on the network
/// input, so it works for any activation, custom ones included.
pub struct Contractive {
    pattern: Option<String>,
    weight: f64,
}

impl Contractive {
    pub fn new(pattern: Option<String>, weight: f64) -> Contractive {
        Contractive { pattern, weight }
    }
}

impl Regularizer for Contractive {
    fn name(&self) -> &str {
        "contractive"
    }

    fn weight(&self) -> f64 {
        self.weight
    }

    fn pattern(&self) -> Option<&str> {
        self.pattern.as_deref()
    }

    fn scope(&self) -> Scope {
        Scope::Hidden
    }

    fn penalty(&self, network: &Network, outputs: &Outputs, batch: &Batch) -> Result<f64> {
        let names = matched_outputs(self, network, outputs);
        if names.is_empty() || batch.is_empty() {
            return Ok(0.0);
        }
        let x = &batch.inputs;
        let mut total = 0.0;
        for k in 0..x.cols {
            let mut plus = x.clone();
            let mut minus = x.clone();
            for (p, m) in plus.data.iter_mut().zip(minus.data.iter_mut()) {
                p[k] += STEP;
                m[k] -= STEP;
            }
            let up = network.feed_forward(&plus)?;
            let down = network.feed_forward(&minus)?;
            for name in &names {
                let diff = up[name].clone() - down[name].clone();
                total += diff.map(|d| (d / (2.0 * STEP)).powi(2)).sum();
            }
        }
        Ok(total / x.rows as f64)
    }
}
