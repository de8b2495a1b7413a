mod assemble;
mod payload;
mod variables;

pub use assemble::*;
pub use payload::*;
pub use variables::*;
