use rand::rngs::StdRng;

use crate::activation::activation::Activation;
use crate::errors::{NetError, Result};
use crate::layers::dense::check_shape;
use crate::layers::layer::{Context, Layer, Param};
use crate::layers::spec::LayerConfig;
use crate::math::matrix::Matrix;

/// Decoder layer that reuses the transposed weights of a partner layer.
/// Owns only its bias.
pub struct Tied {
    config: LayerConfig,
    activation: Activation,
    partner_weights: String,
    params: Vec<Param>,
}

impl Tied {
    pub fn build(
        config: LayerConfig,
        previous: &[Box<dyn Layer>],
        rng: &mut StdRng,
    ) -> Result<Box<dyn Layer>> {
        Ok(Box::new(Tied::new(config, previous, rng)?))
    }

    pub fn new(config: LayerConfig, previous: &[Box<dyn Layer>], rng: &mut StdRng) -> Result<Tied> {
        let partner_name = config
            .partner
            .clone()
            .ok_or_else(|| NetError::layer(format!("tied layer {:?} has no partner", config.name)))?;
        let partner = previous
            .iter()
            .find(|layer| layer.name() == partner_name)
            .ok_or_else(|| NetError::layer(format!("tied layer {:?}: no layer named {partner_name:?}", config.name)))?;
        let weights = partner
            .find("w")
            .ok_or_else(|| NetError::layer(format!(
                "tied layer {:?}: partner {partner_name:?} has no single weight matrix",
                config.name
            )))?;

        if config.inputs.len() != 1 {
            return Err(NetError::layer(format!("tied layer {:?} takes exactly one input", config.name)));
        }
        if config.input_size() != weights.value.cols {
            return Err(NetError::shape(format!("input of tied layer {}", config.name), weights.value.cols, config.input_size()));
        }
        if config.size != weights.value.rows {
            return Err(NetError::shape(format!("size of tied layer {}", config.name), weights.value.rows, config.size));
        }

        let activation = Activation::build(&config.activation)?;
        let mean_b = config.extra_f64("mean_b", 0.0)?;
        let std_b = config.extra_f64("std_b", 0.0)?;
        let biases = Matrix::gaussian(1, config.size, mean_b, std_b, 0.0, rng);
        let partner_weights = weights.name.clone();
        let params = vec![Param::new(format!("{}.b", config.name), biases)];
        Ok(Tied { config, activation, partner_weights, params })
    }
}

impl Layer for Tied {
    fn config(&self) -> &LayerConfig {
        &self.config
    }

    fn activation(&self) -> &Activation {
        &self.activation
    }

    fn params(&self) -> &[Param] {
        &self.params
    }

    fn params_mut(&mut self) -> &mut [Param] {
        &mut self.params
    }

    fn connect(&self, ctx: &Context<'_>) -> Result<Vec<(String, Matrix)>> {
        let (input, _) = &self.config.inputs[0];
        let x = ctx.output(input)?;
        let weights = ctx.param(&self.partner_weights)?;
        let width = self.config.input_size();
        if x.cols != width {
            return Err(NetError::shape(format!("input {input} of {}", self.config.name), width, x.cols));
        }
        check_shape(&self.partner_weights, weights, self.config.size, width)?;
        let bias = &self.params[0];
        check_shape(&bias.name, &bias.value, 1, self.config.size)?;
        let pre = (x * &weights.transpose()).add_row(&bias.value);
        let out = self.activation.apply(&pre);
        Ok(vec![("pre".to_string(), pre), ("out".to_string(), out)])
    }
}
