//! Transport layer for the tool servers.
//!
//! Only newline-framed stdio is provided; the framing loop itself is generic
//! over any `AsyncRead`/`AsyncWrite` pair so it can be driven in-process.

pub mod stdio;

pub use stdio::{StdioTransport, serve};

use std::future::Future;
use std::io;

/// Trait for MCP transport implementations.
pub trait Transport: Send + Sync {
    /// Serve requests until the input closes or a shutdown signal arrives.
    fn run(&self) -> impl Future<Output = io::Result<()>> + Send;

    /// Get the name of this transport for logging.
    fn name(&self) -> &'static str;
}
