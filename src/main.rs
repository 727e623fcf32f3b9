//! MCP tool servers - main entry point.
//!
//! Runs one tool server (database, filesystem or knowledge) over stdio until
//! the input closes or a shutdown signal arrives.

use clap::Parser;
use mcp_tool_servers::config::{Config, ServerCommand};
use mcp_tool_servers::mcp::Dispatcher;
use mcp_tool_servers::tools::path_guard::AllowedRoots;
use mcp_tool_servers::tools::{DatabaseService, FilesystemService, KnowledgeService, ToolService};
use mcp_tool_servers::transport::{StdioTransport, Transport};
use tracing::{error, info};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

/// Initialize the tracing subscriber. Logs always go to stderr.
fn init_tracing(config: &Config) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level));

    let subscriber = tracing_subscriber::registry().with(filter);

    if config.json_logs {
        subscriber
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        subscriber
            .with(
                fmt::layer()
                    .with_target(true)
                    .with_ansi(false)
                    .with_writer(std::io::stderr),
            )
            .init();
    }
}

async fn run_stdio<S: ToolService>(service: S, config: &Config) -> std::io::Result<()> {
    let dispatcher = Dispatcher::new(service).with_call_timeout(config.call_timeout_duration());
    let transport = StdioTransport::new(dispatcher);
    info!(transport = transport.name(), "Using stdio transport");
    transport.run().await
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::parse();

    if config.enable_logs {
        init_tracing(&config);
    }

    info!(
        server = config.server.name(),
        "Starting MCP tool server v{}",
        env!("CARGO_PKG_VERSION")
    );

    let result = match &config.server {
        ServerCommand::Database(args) => {
            let db_config = args.resolve(config.call_timeout_duration())?;
            info!(
                url = %db_config.masked_url(),
                db_type = %db_config.db_type,
                schema = %db_config.schema,
                "Database configured"
            );
            run_stdio(DatabaseService::new(db_config), &config).await
        }
        ServerCommand::Filesystem(args) => {
            let roots = AllowedRoots::new(&args.roots)?;
            info!(roots = ?roots.roots(), "Allowed directories configured");
            let service = FilesystemService::new(roots).with_max_read_bytes(args.max_file_size);
            run_stdio(service, &config).await
        }
        ServerCommand::Knowledge => run_stdio(KnowledgeService::new(), &config).await,
    };

    if let Err(e) = result {
        error!(error = %e, "Server error");
        return Err(e.into());
    }

    info!("Server shutdown complete");
    Ok(())
}
