pub mod config;
pub mod doctor;
pub mod launcher;
pub mod pack;
pub mod util;

pub use config::*;
pub use doctor::*;
pub use launcher::*;
pub use pack::*;
pub use util::*;
