pub mod backend;
pub mod strategy;

pub use backend::*;
pub use strategy::*;
