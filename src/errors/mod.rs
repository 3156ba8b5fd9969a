pub mod net_error;

pub use net_error::{NetError, Result};
