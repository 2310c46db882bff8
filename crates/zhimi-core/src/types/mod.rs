//! Core types for zhimi.

mod chunk;
mod message;

pub use chunk::*;
pub use message::*;
