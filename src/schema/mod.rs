pub mod document;
pub mod fragment;

pub use document::*;
pub use fragment::*;
