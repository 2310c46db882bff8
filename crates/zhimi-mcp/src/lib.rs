//! MCP server for zhimi.
//!
//! Exposes the retrieval strategies and per-user memory as MCP tools so an
//! agent orchestrator can call them over stdio.
//!
//! # Tools
//!
//! - `simple_keyword_search` - Exact-term lookup over the document index
//! - `hybrid_search` - Semantic plus BM25 retrieval, deduplicated
//! - `memory_summary` - Markdown summary of what is known about a user
//! - `memory_update` - Extract from recent turns and merge into memory
//! - `memory_get` - The stored profile as JSON
//! - `memory_clear` - Reset a user's profile
//!
//! # Configuration
//!
//! Read via `ZhimiConfig::from_env` after loading `.env`:
//!
//! - `ZHIMI_CONFIG` - Optional config file (toml, json or yaml)
//! - `ZHIMI_DATA_DIR` - Directory for the index and memory table (default: ./memory)
//! - `SILICONFLOW_API_KEY` / `OPENAI_API_KEY` - Provider key
//! - `LLM_MODEL`, `EMBED_MODEL` - Model overrides

pub mod bootstrap;
pub mod server;
pub mod tools;

pub use bootstrap::{build_index, build_server, init_tracing};
pub use server::ZhimiServer;
