pub mod dense;
pub mod input;
pub mod layer;
pub mod spec;
pub mod tied;

pub use dense::Feedforward;
pub use input::Input;
pub use layer::{register_layer, Context, Layer, LayerConstructor, Outputs, Param};
pub use spec::{LayerConfig, LayerOptions, LayerSpec, SpecElement};
pub use tied::Tied;
