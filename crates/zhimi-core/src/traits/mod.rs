//! Core traits for zhimi providers.

mod embedder;
mod index;
mod llm;

pub use embedder::*;
pub use index::*;
pub use llm::*;
