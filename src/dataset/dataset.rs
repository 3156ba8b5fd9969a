use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;

use crate::errors::{NetError, Result};
use crate::math::matrix::Matrix;

/// What a network is asked to reproduce for each sample.
#[derive(Debug, Clone, PartialEq)]
pub enum Target {
    /// Autoencoders compare against their own input.
    None,
    /// Real-valued targets, one row per sample.
    Values(Matrix),
    /// Integer class labels, one per sample.
    Labels(Vec<usize>),
}

impl Target {
    fn rows(&self) -> Option<usize> {
        match self {
            Target::None => None,
            Target::Values(m) => Some(m.rows),
            Target::Labels(labels) => Some(labels.len()),
        }
    }

    fn select(&self, indices: &[usize]) -> Target {
        match self {
            Target::None => Target::None,
            Target::Values(m) => Target::Values(m.select_rows(indices)),
            Target::Labels(labels) => Target::Labels(indices.iter().map(|&i| labels[i]).collect()),
        }
    }
}

/// A group of samples evaluated together.
///
/// `weights` is optional. For value targets it has the target's shape (the
/// input's shape for autoencoders); for labels it is one column.
#[derive(Debug, Clone, PartialEq)]
pub struct Batch {
    pub inputs: Matrix,
    pub target: Target,
    pub weights: Option<Matrix>,
}

impl Batch {
    pub fn new(inputs: Matrix, target: Target) -> Batch {
        Batch { inputs, target, weights: None }
    }

    pub fn with_weights(mut self, weights: Matrix) -> Batch {
        self.weights = Some(weights);
        self
    }

    pub fn len(&self) -> usize {
        self.inputs.rows
    }

    pub fn is_empty(&self) -> bool {
        self.inputs.rows == 0
    }

    /// The matrix a value loss compares against: the target values, or the
    /// input itself when there is no target.
    pub fn target_values(&self) -> Option<&Matrix> {
        match &self.target {
            Target::None => Some(&self.inputs),
            Target::Values(m) => Some(m),
            Target::Labels(_) => None,
        }
    }

    pub fn labels(&self) -> Option<&[usize]> {
        match &self.target {
            Target::Labels(labels) => Some(labels),
            _ => None,
        }
    }
}

/// A full set of samples that can be cut into batches.
#[derive(Debug, Clone)]
pub struct Dataset {
    data: Batch,
    batch_size: usize,
    shuffle: bool,
    seed: u64,
}

impl Dataset {
    pub fn new(inputs: Matrix, target: Target, weights: Option<Matrix>) -> Result<Dataset> {
        let n = inputs.rows;
        if let Some(rows) = target.rows() {
            if rows != n {
                return Err(NetError::shape("target rows", n, rows));
            }
        }
        if let Some(w) = &weights {
            if w.rows != n {
                return Err(NetError::shape("weight rows", n, w.rows));
            }
        }
        Ok(Dataset {
            data: Batch { inputs, target, weights },
            batch_size: n.max(1),
            shuffle: false,
            seed: 13,
        })
    }

    pub fn batch_size(mut self, batch_size: usize) -> Dataset {
        self.batch_size = batch_size.max(1);
        self
    }

    /// Shuffles sample order before batching, reproducibly from `seed`.
    pub fn shuffled(mut self, seed: u64) -> Dataset {
        self.shuffle = true;
        self.seed = seed;
        self
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn as_batch(&self) -> &Batch {
        &self.data
    }

    fn select(&self, indices: &[usize]) -> Batch {
        Batch {
            inputs: self.data.inputs.select_rows(indices),
            target: self.data.target.select(indices),
            weights: self.data.weights.as_ref().map(|w| w.select_rows(indices)),
        }
    }

    pub fn batches(&self) -> Vec<Batch> {
        let mut indices: Vec<usize> = (0..self.len()).collect();
        if self.shuffle {
            indices.shuffle(&mut StdRng::seed_from_u64(self.seed));
        }
        indices
            .chunks(self.batch_size)
            .map(|chunk| self.select(chunk))
            .collect()
    }

    /// Splits off the trailing `fraction` of samples, e.g. for validation.
    pub fn split(&self, fraction: f64) -> Result<(Dataset, Dataset)> {
        if !(0.0..=1.0).contains(&fraction) {
            return Err(NetError::Config(format!("split fraction {fraction} is outside [0, 1]")));
        }
        let n = self.len();
        let cut = n - (n as f64 * fraction).round() as usize;
        let head: Vec<usize> = (0..cut).collect();
        let tail: Vec<usize> = (cut..n).collect();
        let make = |indices: &[usize]| {
            let batch = self.select(indices);
            Dataset {
                data: batch,
                batch_size: self.batch_size,
                shuffle: self.shuffle,
                seed: self.seed,
            }
        };
        Ok((make(&head), make(&tail)))
    }
}
