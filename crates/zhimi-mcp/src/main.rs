//! zhimi MCP server - retrieval and user memory over stdio.
//!
//! # Configuration
//!
//! A `.env` file in the working directory is loaded first. Then:
//!
//! - `SILICONFLOW_API_KEY` - Required for the default providers
//! - `ZHIMI_DATA_DIR` - Optional, defaults to `./memory`
//! - `ZHIMI_CONFIG` - Optional config file
//!
//! # Usage
//!
//! ```json
//! {
//!   "mcpServers": {
//!     "zhimi": {
//!       "command": "/path/to/zhimi-mcp"
//!     }
//!   }
//! }
//! ```

use anyhow::Result;
use rmcp::{transport::stdio, ServiceExt};
use zhimi_core::ZhimiConfig;
use zhimi_mcp::{build_server, init_tracing};

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    init_tracing();

    tracing::info!("Starting zhimi MCP server");

    let config = ZhimiConfig::from_env()?;
    let server = build_server(&config).await?;

    let service = server.serve(stdio()).await.inspect_err(|e| {
        tracing::error!("Server error: {:?}", e);
    })?;

    tracing::info!("MCP server running on stdio");

    service.waiting().await?;
    Ok(())
}
