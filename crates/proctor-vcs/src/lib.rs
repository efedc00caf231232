pub mod fixture;
pub mod locator;
pub mod types;
pub mod version;

pub use locator::*;
pub use types::*;
pub use version::*;
