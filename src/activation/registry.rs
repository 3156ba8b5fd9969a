//! Process-wide table of user-supplied activations.

use std::collections::HashMap;
use std::sync::{Arc, OnceLock, RwLock};

use crate::activation::activation::ActivationFunction;
use crate::errors::{NetError, Result};
use crate::math::matrix::Matrix;

/// A custom activation stage. Receives the whole batch so row-wise functions
/// are possible.
pub type CustomFn = Arc<dyn Fn(&Matrix) -> Matrix + Send + Sync>;

fn table() -> &'static RwLock<HashMap<String, CustomFn>> {
    static TABLE: OnceLock<RwLock<HashMap<String, CustomFn>>> = OnceLock::new();
    TABLE.get_or_init(|| RwLock::new(HashMap::new()))
}

/// Registers a batch-level activation under `name`. Re-registering a custom
/// name replaces it; built-in names are rejected.
pub fn register_activation<F>(name: &str, f: F) -> Result<()>
where
    F: Fn(&Matrix) -> Matrix + Send + Sync + 'static,
{
    if name.contains('+') || ActivationFunction::from_name(name).is_some() {
        return Err(NetError::Config(format!(
            "cannot register activation {name:?}: reserved name"
        )));
    }
    let mut guard = table().write().unwrap_or_else(|e| e.into_inner());
    guard.insert(name.to_string(), Arc::new(f));
    log::debug!("registered activation {name}");
    Ok(())
}

/// Registers an element-wise activation under `name`.
pub fn register_elementwise(name: &str, f: fn(f64) -> f64) -> Result<()> {
    register_activation(name, move |z: &Matrix| z.map(f))
}

pub(crate) fn lookup(name: &str) -> Option<CustomFn> {
    let guard = table().read().unwrap_or_else(|e| e.into_inner());
    guard.get(name).cloned()
}
