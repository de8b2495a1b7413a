mod dataset;
mod domains;
mod error;
mod netcdf_handler;
mod pipeline;
mod stations;
mod utils;

pub use dataset::*;
pub use domains::*;
pub use error::*;
pub use netcdf_handler::*;
pub use pipeline::*;
pub use stations::*;
pub use utils::*;
