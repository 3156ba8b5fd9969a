use rand::rngs::StdRng;

use crate::activation::activation::Activation;
use crate::errors::{NetError, Result};
use crate::layers::layer::{Context, Layer, Param};
use crate::layers::spec::LayerConfig;
use crate::math::matrix::Matrix;

/// Fully connected layer: `pre = Σ x_i·W_i + b`, `out = act(pre)`.
///
/// One weight matrix per input. With a single input the weight is `<name>.w`,
/// otherwise `<name>.w_<input>`.
pub struct Feedforward {
    config: LayerConfig,
    activation: Activation,
    params: Vec<Param>,
}

impl Feedforward {
    pub fn build(
        config: LayerConfig,
        _previous: &[Box<dyn Layer>],
        rng: &mut StdRng,
    ) -> Result<Box<dyn Layer>> {
        Ok(Box::new(Feedforward::new(config, rng)?))
    }

    /// Weights are drawn from N(mean, std²) with `std` defaulting to
    /// 1/sqrt(fan_in + size); biases from N(mean_b, std_b²), zeros by default.
    pub fn new(config: LayerConfig, rng: &mut StdRng) -> Result<Feedforward> {
        if config.inputs.is_empty() {
            return Err(NetError::layer(format!("layer {:?} has no inputs", config.name)));
        }
        if config.size == 0 {
            return Err(NetError::layer(format!("layer {:?} has size 0", config.name)));
        }
        let activation = Activation::build(&config.activation)?;
        let mean = config.extra_f64("mean", 0.0)?;
        let sparsity = config.extra_f64("sparsity", 0.0)?;
        let mean_b = config.extra_f64("mean_b", 0.0)?;
        let std_b = config.extra_f64("std_b", 0.0)?;

        let mut params = Vec::with_capacity(config.inputs.len() + 1);
        for (input, fan_in) in &config.inputs {
            let default_std = 1.0 / ((fan_in + config.size) as f64).sqrt();
            let std = config.extra_f64("std", default_std)?;
            let weights = Matrix::gaussian(*fan_in, config.size, mean, std, sparsity, rng);
            params.push(Param::new(Feedforward::weight_name(&config, input), weights));
        }
        let biases = Matrix::gaussian(1, config.size, mean_b, std_b, 0.0, rng);
        params.push(Param::new(format!("{}.b", config.name), biases));

        Ok(Feedforward { config, activation, params })
    }

    fn weight_name(config: &LayerConfig, input: &str) -> String {
        if config.inputs.len() == 1 {
            format!("{}.w", config.name)
        } else {
            format!("{}.w_{}", config.name, input)
        }
    }
}

impl Layer for Feedforward {
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
        let mut pre: Option<Matrix> = None;
        for ((input, width), weights) in self.config.inputs.iter().zip(&self.params) {
            let x = ctx.output(input)?;
            if x.cols != *width {
                return Err(NetError::shape(format!("input {input} of {}", self.config.name), *width, x.cols));
            }
            check_shape(&weights.name, &weights.value, *width, self.config.size)?;
            let term = x * &weights.value;
            pre = Some(match pre {
                Some(acc) => acc + term,
                None => term,
            });
        }
        let bias = &self.params[self.params.len() - 1];
        check_shape(&bias.name, &bias.value, 1, self.config.size)?;
        let bias = &bias.value;
        let pre = pre
            .ok_or_else(|| NetError::layer(format!("layer {:?} has no inputs", self.config.name)))?
            .add_row(bias);
        let out = self.activation.apply(&pre);
        Ok(vec![("pre".to_string(), pre), ("out".to_string(), out)])
    }
}

/// Fails unless `value` is `rows` x `cols`. Parameter values can be
/// replaced through `Network::find_mut`.
pub(crate) fn check_shape(name: &str, value: &Matrix, rows: usize, cols: usize) -> Result<()> {
    if value.rows != rows {
        return Err(NetError::shape(format!("rows of {name}"), rows, value.rows));
    }
    if value.cols != cols {
        return Err(NetError::shape(format!("columns of {name}"), cols, value.cols));
    }
    Ok(())
}
