//! SQLBook JSON-RPC
//!
//! Transport-agnostic JSON-RPC 2.0 front end for a query session:
//! - Request, response and fault wire types
//! - Parameter decoding (positional or named)
//! - The dispatcher that maps methods onto session calls

mod dispatcher;
mod error;
mod params;
mod protocol;

pub use dispatcher::Dispatcher;
pub use error::{RpcError, RpcResult};
pub use protocol::*;
