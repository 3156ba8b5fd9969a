pub mod bce;
pub mod cross_entropy;
pub mod hinge;
pub mod huber;
pub mod kl;
pub mod loss;
pub mod loss_type;
pub mod mae;
pub mod mse;

pub use loss::{build, register_loss, Loss, LossConfig, TaskLoss};
pub use loss_type::LossType;
