pub mod fit_value;
pub mod layer;
pub mod stack;

pub use fit_value::{Bound, FitValue};
pub use layer::{Layer, GAUSSIAN_ROUGHNESS_SHAPE};
pub use stack::{LayerStack, GLOBAL_PARAMETERS};
