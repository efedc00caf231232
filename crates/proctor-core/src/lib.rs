pub mod error;
pub mod model;
pub mod runner;
pub mod statement;

pub use error::*;
pub use model::*;
pub use runner::*;
pub use statement::*;
