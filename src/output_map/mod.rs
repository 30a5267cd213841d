pub mod engine;
pub mod entry;

pub use engine::*;
pub use entry::*;
