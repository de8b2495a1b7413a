pub mod metadata;
pub mod observations;
pub mod position;

pub use metadata::*;
pub use observations::*;
pub use position::*;
