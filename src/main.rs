//! Command-line front end for the library.
//!
//! ```text
//! laminar describe <spec.json>
//! laminar init     <spec.json> <model.json>
//! laminar predict  <model.json> <inputs.csv>
//! laminar evaluate <model.json> <data.csv> [batch_size]
//! ```
//!
//! Evaluation data carries labels in its trailing columns: one class index
//! for classifiers, one column per output for regressors, none for
//! autoencoders.

use laminar::dataset::LabelColumns;
use laminar::network::network::argmax;
use laminar::{Dataset, EvalConfig, Experiment, Network, NetworkKind, NetworkSpec, NetError};

const USAGE: &str = "usage: laminar <describe|init|predict|evaluate> ...";

fn main() {
    let args: Vec<String> = std::env::args().skip(1).collect();
    if let Err(e) = run(&args) {
        eprintln!("laminar: {e}");
        std::process::exit(1);
    }
}

fn run(args: &[String]) -> laminar::Result<()> {
    let arg = |i: usize| {
        args.get(i)
            .map(String::as_str)
            .ok_or_else(|| NetError::Config(USAGE.to_string()))
    };

    match arg(0)? {
        "describe" => {
            let spec = NetworkSpec::load_json(arg(1)?)?;
            let network = Network::build(&spec)?;
            println!("{}", network.describe());
        }
        "init" => {
            let spec = NetworkSpec::load_json(arg(1)?)?;
            let network = Network::build(&spec)?;
            network.save_json(arg(2)?)?;
            println!("wrote {} ({} parameters)", arg(2)?, network.num_params());
        }
        "predict" => {
            let network = Network::load_json(arg(1)?)?;
            let text = std::fs::read_to_string(arg(2)?)?;
            let data = Dataset::from_csv(&text, LabelColumns::None)?;
            let predicted = network.predict(&data.as_batch().inputs)?;
            for row in &predicted.data {
                if network.kind() == NetworkKind::Classifier {
                    let best = argmax(row);
                    let label = network.metadata().map_or_else(|| best.to_string(), |m| m.label(best));
                    println!("{label}");
                } else {
                    let cells: Vec<String> = row.iter().map(|x| format!("{x:.6}")).collect();
                    println!("{}", cells.join(","));
                }
            }
        }
        "evaluate" => {
            let experiment = Experiment::load(arg(1)?)?;
            let text = std::fs::read_to_string(arg(2)?)?;
            let network = experiment.network();
            let labels = match network.kind() {
                NetworkKind::Autoencoder => LabelColumns::None,
                NetworkKind::Regressor => LabelColumns::Values(network.output_size()),
                NetworkKind::Classifier => LabelColumns::ClassIndex { n_classes: network.output_size() },
            };
            let data = Dataset::from_csv(&text, labels)?;
            let mut config = EvalConfig::default();
            if let Some(size) = args.get(3) {
                let size = size
                    .parse()
                    .map_err(|_| NetError::Config(format!("batch size {size:?} is not a number")))?;
                config.batch_size = Some(size);
            }
            let stats = experiment.evaluate(&data, &config)?;
            println!("{} samples, {} batches, {} ms", stats.samples, stats.batches, stats.elapsed_ms);
            for (name, value) in &stats.values {
                println!("{name:>16}  {value:.6}");
            }
            println!("{:>16}  {:.6}", "score", network.score(data.as_batch())?);
        }
        other => return Err(NetError::Config(format!("unknown command {other:?}; {USAGE}"))),
    }
    Ok(())
}
