pub mod golang;
pub mod shell;
pub mod test2json;

pub use golang::*;
pub use shell::*;
pub use test2json::*;
