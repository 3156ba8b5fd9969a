use rand::rngs::StdRng;

use crate::activation::activation::Activation;
use crate::errors::{NetError, Result};
use crate::layers::layer::{Context, Layer, Param, INPUT_KEY};
use crate::layers::spec::LayerConfig;
use crate::math::matrix::Matrix;

/// First layer of every network. Checks the width of the raw input and
/// republishes it as `<name>:out`.
pub struct Input {
    config: LayerConfig,
    activation: Activation,
}

impl Input {
    pub fn build(
        mut config: LayerConfig,
        _previous: &[Box<dyn Layer>],
        _rng: &mut StdRng,
    ) -> Result<Box<dyn Layer>> {
        if config.size == 0 {
            return Err(NetError::layer("input layer has size 0"));
        }
        config.activation = "linear".to_string();
        config.inputs = vec![(INPUT_KEY.to_string(), config.size)];
        Ok(Box::new(Input { config, activation: Activation::linear() }))
    }
}

impl Layer for Input {
    fn config(&self) -> &LayerConfig {
        &self.config
    }

    fn activation(&self) -> &Activation {
        &self.activation
    }

    fn params(&self) -> &[Param] {
        &[]
    }

    fn params_mut(&mut self) -> &mut [Param] {
        &mut []
    }

    fn connect(&self, ctx: &Context<'_>) -> Result<Vec<(String, Matrix)>> {
        let x = ctx.output(INPUT_KEY)?;
        if x.cols != self.config.size {
            return Err(NetError::shape("network input", self.config.size, x.cols));
        }
        Ok(vec![("out".to_string(), x.clone())])
    }
}
