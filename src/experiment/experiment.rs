use rand::rngs::StdRng;
use rand::SeedableRng;
use std::time::Instant;

use crate::dataset::dataset::Dataset;
use crate::errors::{NetError, Result};
use crate::experiment::eval_config::EvalConfig;
use crate::experiment::eval_stats::EvalStats;
use crate::network::network::Network;
use crate::network::spec::NetworkSpec;
use crate::regularizers::regularizer;

/// Owns a network and runs it over datasets.
pub struct Experiment {
    network: Network,
}

impl Experiment {
    pub fn new(spec: &NetworkSpec) -> Result<Experiment> {
        Ok(Experiment { network: Network::build(spec)? })
    }

    pub fn from_network(network: Network) -> Experiment {
        Experiment { network }
    }

    pub fn load(path: &str) -> Result<Experiment> {
        Ok(Experiment { network: Network::load_json(path)? })
    }

    pub fn save(&self, path: &str) -> Result<()> {
        self.network.save_json(path)
    }

    pub fn network(&self) -> &Network {
        &self.network
    }

    pub fn network_mut(&mut self) -> &mut Network {
        &mut self.network
    }

    pub fn into_network(self) -> Network {
        self.network
    }

    /// Evaluates every monitor on each batch and averages them, weighting
    /// each batch by its sample count.
    ///
    /// Fails if the dataset is empty or a batch reports a different set of
    /// monitors than the first.
    pub fn evaluate(&self, dataset: &Dataset, config: &EvalConfig) -> Result<EvalStats> {
        if dataset.is_empty() {
            return Err(NetError::Config("cannot evaluate an empty dataset".into()));
        }
        let t_start = Instant::now();

        let regs = match &config.regularizers {
            Some(custom) => regularizer::from_config(custom)?,
            None => self.network.regularizers()?,
        };
        let mut rng = StdRng::seed_from_u64(config.seed);

        let mut data = dataset.clone().batch_size(config.batch_size.unwrap_or(dataset.len()));
        if config.shuffle {
            data = data.shuffled(config.seed);
        }

        let mut totals: Vec<(String, f64)> = Vec::new();
        let mut samples = 0;
        let batches = data.batches();
        for (i, batch) in batches.iter().enumerate() {
            let values = self.network.monitors(batch, &regs, &mut rng)?;
            let n = batch.len() as f64;
            if totals.is_empty() {
                totals = values.iter().map(|(name, _)| (name.clone(), 0.0)).collect();
            }
            if values.len() != totals.len() {
                return Err(NetError::shape("monitor count", totals.len(), values.len()));
            }
            for ((_, total), (_, value)) in totals.iter_mut().zip(&values) {
                *total += value * n;
            }
            samples += batch.len();
            log::debug!("batch {}/{}: {} samples", i + 1, batches.len(), batch.len());
        }

        let values = totals
            .into_iter()
            .map(|(name, total)| (name, total / samples as f64))
            .collect();
        let stats = EvalStats {
            batches: batches.len(),
            samples,
            values,
            elapsed_ms: t_start.elapsed().as_millis() as u64,
        };
        log::info!("evaluated {:?}: {}", self.network.name(), stats.summary());
        Ok(stats)
    }
}
