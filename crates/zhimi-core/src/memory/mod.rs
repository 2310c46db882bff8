//! User memory: extraction, merge, persistence and per-user caching.

mod extractor;
mod json_parser;
mod manager;
mod merge;
mod profile;
mod prompts;
mod storage;
mod user_memory;

pub use extractor::{ExtractorConfig, MemoryExtractor};
pub use json_parser::{extract_json, parse_structured_info, remove_code_blocks};
pub use manager::UserMemoryManager;
pub use merge::deep_merge;
pub use profile::{Background, Preferences, StructuredInfo, UserProfile};
pub use prompts::*;
pub use storage::UserMemoryStorage;
pub use user_memory::{render_summary, UserMemory};
