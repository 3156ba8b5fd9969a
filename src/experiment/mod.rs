pub mod eval_config;
pub mod eval_stats;
pub mod experiment;

pub use eval_config::EvalConfig;
pub use eval_stats::EvalStats;
pub use experiment::Experiment;
