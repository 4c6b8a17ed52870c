pub mod aggregate;
mod sum;
mod count;
mod min;
mod max;
mod average;
mod first;
mod last;

pub use aggregate::*;
pub use sum::*;
pub use count::*;
pub use min::*;
pub use max::*;
pub use average::*;
pub use first::*;
pub use last::*;
