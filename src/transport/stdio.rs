//! Stdio transport.
//!
//! One JSON-RPC message per line on stdin, one response per line on stdout.
//! Requests are handled strictly in order; the next line is not read until the
//! previous response has been flushed.

use crate::mcp::dispatcher::Dispatcher;
use crate::tools::ToolService;
use crate::transport::Transport;
use std::io;
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::signal;
use tracing::{debug, info, warn};

/// Stdio transport implementation.
pub struct StdioTransport<S> {
    dispatcher: Dispatcher<S>,
}

impl<S: ToolService> StdioTransport<S> {
    pub fn new(dispatcher: Dispatcher<S>) -> Self {
        Self { dispatcher }
    }

    pub fn dispatcher(&self) -> &Dispatcher<S> {
        &self.dispatcher
    }
}

impl<S: ToolService> Transport for StdioTransport<S> {
    async fn run(&self) -> io::Result<()> {
        info!(
            server = self.dispatcher.service().server_name(),
            "Starting MCP server with stdio transport"
        );

        tokio::select! {
            result = serve(&self.dispatcher, tokio::io::stdin(), tokio::io::stdout()) => {
                match &result {
                    Ok(()) => info!("Input closed, stdio transport completed normally"),
                    Err(e) => warn!(error = %e, "Stdio transport error"),
                }
                result
            }
            _ = wait_for_signal() => {
                info!("Shutdown signal received");
                Ok(())
            }
        }
    }

    fn name(&self) -> &'static str {
        "stdio"
    }
}

/// Run the line loop until `reader` reaches EOF.
///
/// Undecodable lines (including invalid UTF-8) get an error response and the
/// loop continues. Only read and write failures end it with an error.
pub async fn serve<S, R, W>(dispatcher: &Dispatcher<S>, reader: R, mut writer: W) -> io::Result<()>
where
    S: ToolService,
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut reader = BufReader::new(reader);
    let mut buf = Vec::new();

    loop {
        buf.clear();
        if reader.read_until(b'\n', &mut buf).await? == 0 {
            return Ok(());
        }

        let line = String::from_utf8_lossy(&buf);
        let Some(response) = dispatcher.handle_line(&line).await else {
            continue;
        };

        let mut encoded = response.to_line().map_err(io::Error::other)?;
        encoded.push('\n');
        writer.write_all(encoded.as_bytes()).await?;
        writer.flush().await?;
        debug!(bytes = encoded.len(), is_error = response.is_error(), "Response written");
    }
}

/// Wait for a shutdown signal (SIGINT or SIGTERM).
///
/// A handler that cannot be installed never fires, leaving EOF as the only way out.
async fn wait_for_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received SIGINT");
        }
        _ = terminate => {
            info!("Received SIGTERM");
        }
    }
}
