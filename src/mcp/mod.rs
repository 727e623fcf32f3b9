//! MCP protocol plumbing: wire types, tool registry and request dispatch.

pub mod dispatcher;
pub mod protocol;
pub mod registry;

pub use dispatcher::Dispatcher;
pub use protocol::{Request, Response, RpcError};
pub use registry::{ParamSpec, ParamType, ToolDescriptor, ToolRegistry};
