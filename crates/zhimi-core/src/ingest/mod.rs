//! Document ingestion: load a directory, cut it into chunks.

mod loader;
mod splitter;

pub use loader::{load_documents, Document};
pub use splitter::{split_documents, TextSplitter, DEFAULT_SEPARATORS};
