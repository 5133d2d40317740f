//! Theme MCP Server - Entry Point
//!
//! REST API for confined theme template editing with automatic backups.

use log::{error, info};
use std::process::ExitCode;

use theme_mcp_server::Server;
use theme_mcp_server::config::ServerConfig;
use theme_mcp_server::utils::setup_logging;

#[tokio::main]
async fn main() -> ExitCode {
    setup_logging();

    let config = match ServerConfig::load() {
        Ok(config) => config,
        Err(e) => {
            error!("Configuration error: {}", e);
            return ExitCode::FAILURE;
        }
    };

    info!("Launching theme MCP server...");

    let server = match Server::new(config).await {
        Ok(server) => server,
        Err(e) => {
            error!("Server startup failed: {}", e);
            return ExitCode::FAILURE;
        }
    };

    match server.start().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("Server error: {}", e);
            ExitCode::FAILURE
        }
    }
}
