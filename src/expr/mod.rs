pub mod expr;
pub mod expr_fn;
pub mod scalar;
pub mod window;
pub mod aggregate;
pub mod generator;
pub mod string;
pub mod conditional;
pub mod complex_type_extractor;
pub mod misc;
mod tree_node;

pub use expr::*;
pub use expr_fn::*;
pub use scalar::*;
pub use window::*;
pub use aggregate::*;
pub use generator::*;
pub use string::*;
pub use conditional::*;
pub use complex_type_extractor::*;
pub use misc::*;
