//! LSP message framing and JSON-RPC types layered on the raw transport.
//!
//! LSP frames each message with headers over the byte stream:
//! ```text
//! Content-Length: <length>\r\n
//! \r\n
//! <payload>
//! ```

mod framing;
mod jsonrpc;

pub use framing::{FramingError, MAX_HEADER_BYTES, read_message, write_message};
pub use jsonrpc::{
    INVALID_REQUEST, IncomingMessage, JsonRpcError, JsonRpcResponse, METHOD_NOT_FOUND,
    PARSE_ERROR, SERVER_NOT_INITIALIZED,
};
