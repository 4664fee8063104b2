//! Minimal in-process language server hosted on the worker thread.
//!
//! Speaks just enough LSP to exercise a session end to end: it answers
//! `initialize` and `shutdown`, treats the `exit` notification as a
//! termination request, and rejects everything else with a JSON-RPC error.

use std::path::{Path, PathBuf};

use lsp_types::{
    InitializeResult, ServerCapabilities, ServerInfo, TextDocumentSyncCapability,
    TextDocumentSyncKind,
};
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::protocol::{
    FramingError, INVALID_REQUEST, IncomingMessage, JsonRpcResponse, METHOD_NOT_FOUND,
    PARSE_ERROR, SERVER_NOT_INITIALIZED, read_message, write_message,
};
use crate::worker::{EmbeddedServer, Flow, ServerError, ServerIo};

/// Log target for the stub server.
const SERVER_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::server");

/// Name of the flag locating the server's resource directory.
pub const RESOURCE_DIR_FLAG: &str = "--resource-dir";

/// Name reported in `InitializeResult.serverInfo`.
const SERVER_NAME: &str = "lualsp";

/// Returns the value of `--resource-dir` in either `--flag value` or
/// `--flag=value` form.
#[must_use]
pub fn find_resource_dir<S: AsRef<str>>(args: &[S]) -> Option<&str> {
    let mut iter = args.iter().map(AsRef::as_ref);
    while let Some(arg) = iter.next() {
        if arg == RESOURCE_DIR_FLAG {
            return iter.next();
        }
        if let Some(value) = arg
            .strip_prefix(RESOURCE_DIR_FLAG)
            .and_then(|rest| rest.strip_prefix('='))
        {
            return Some(value);
        }
    }
    None
}

/// Lifecycle position within the LSP handshake.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
enum Phase {
    #[default]
    AwaitingInitialize,
    Serving,
    ShuttingDown,
}

/// In-process language server used by the CLI and the C ABI.
#[derive(Debug, Default)]
pub struct StubLanguageServer {
    resource_dir: Option<PathBuf>,
    phase: Phase,
}

impl StubLanguageServer {
    /// Creates a server that has not booted yet.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Resource directory recorded during boot.
    #[must_use]
    pub fn resource_dir(&self) -> Option<&Path> {
        self.resource_dir.as_deref()
    }

    fn handle(&mut self, io: &ServerIo<'_>, body: &[u8]) -> Result<(), ServerError> {
        let message: IncomingMessage = match serde_json::from_slice(body) {
            Ok(message) => message,
            Err(error) => {
                warn!(
                    target: SERVER_TARGET,
                    error = %error,
                    "discarding message that is not valid JSON-RPC"
                );
                return respond(
                    io,
                    &JsonRpcResponse::failure(Value::Null, PARSE_ERROR, "parse error"),
                );
            }
        };

        if !message.has_valid_version() {
            let id = message.id.clone().unwrap_or(Value::Null);
            return respond(
                io,
                &JsonRpcResponse::failure(id, INVALID_REQUEST, "unsupported jsonrpc version"),
            );
        }

        let Some(method) = message.method() else {
            debug!(
                target: SERVER_TARGET,
                id = ?message.id,
                "ignoring client response"
            );
            return Ok(());
        };

        match message.id.clone() {
            Some(id) => self.handle_request(io, id, method),
            None => {
                self.handle_notification(io, method);
                Ok(())
            }
        }
    }

    fn handle_request(
        &mut self,
        io: &ServerIo<'_>,
        id: Value,
        method: &str,
    ) -> Result<(), ServerError> {
        debug!(target: SERVER_TARGET, method, "request received");
        let response = match (self.phase, method) {
            (Phase::AwaitingInitialize, "initialize") => {
                self.phase = Phase::Serving;
                JsonRpcResponse::success(id, initialize_result()?)
            }
            (Phase::AwaitingInitialize, _) => {
                JsonRpcResponse::failure(id, SERVER_NOT_INITIALIZED, "server not initialized")
            }
            (Phase::ShuttingDown, _) => {
                JsonRpcResponse::failure(id, INVALID_REQUEST, "server is shutting down")
            }
            (Phase::Serving, "initialize") => {
                JsonRpcResponse::failure(id, INVALID_REQUEST, "server already initialized")
            }
            (Phase::Serving, "shutdown") => {
                self.phase = Phase::ShuttingDown;
                JsonRpcResponse::success(id, Value::Null)
            }
            (Phase::Serving, _) => JsonRpcResponse::failure(
                id,
                METHOD_NOT_FOUND,
                format!("method not found: {method}"),
            ),
        };
        respond(io, &response)
    }

    fn handle_notification(&self, io: &ServerIo<'_>, method: &str) {
        match method {
            "exit" => {
                info!(
                    target: SERVER_TARGET,
                    clean = self.phase == Phase::ShuttingDown,
                    "exit notification received"
                );
                io.request_shutdown();
            }
            _ => debug!(target: SERVER_TARGET, method, "notification ignored"),
        }
    }
}

impl EmbeddedServer for StubLanguageServer {
    fn boot(&mut self, args: &[String]) -> Result<(), ServerError> {
        if let Some(dir) = find_resource_dir(args) {
            let path = PathBuf::from(dir);
            if !path.is_dir() {
                return Err(ServerError::new(format!(
                    "resource directory '{}' does not exist",
                    path.display()
                )));
            }
            self.resource_dir = Some(path);
        }
        info!(
            target: SERVER_TARGET,
            resource_dir = ?self.resource_dir,
            "language server ready"
        );
        Ok(())
    }

    fn serve_one(&mut self, io: &ServerIo<'_>) -> Result<Flow, ServerError> {
        match read_message(io) {
            Ok(Some(body)) => {
                self.handle(io, &body)?;
                Ok(Flow::Continue)
            }
            Ok(None) => Ok(Flow::EndOfInput),
            Err(FramingError::Truncated { received }) => {
                warn!(
                    target: SERVER_TARGET,
                    received,
                    "input ended mid-message"
                );
                Ok(Flow::EndOfInput)
            }
            Err(error) => Err(ServerError::with_source("malformed message frame", error)),
        }
    }
}

fn initialize_result() -> Result<Value, ServerError> {
    let result = InitializeResult {
        capabilities: ServerCapabilities {
            text_document_sync: Some(TextDocumentSyncCapability::Kind(TextDocumentSyncKind::FULL)),
            ..ServerCapabilities::default()
        },
        server_info: Some(ServerInfo {
            name: SERVER_NAME.to_owned(),
            version: Some(env!("CARGO_PKG_VERSION").to_owned()),
        }),
    };
    serde_json::to_value(result)
        .map_err(|error| ServerError::with_source("failed to encode initialize result", error))
}

fn respond(io: &ServerIo<'_>, response: &JsonRpcResponse) -> Result<(), ServerError> {
    let payload = serde_json::to_vec(response)
        .map_err(|error| ServerError::with_source("failed to encode response", error))?;
    write_message(io, &payload)
        .map_err(|error| ServerError::with_source("failed to write response", error))
}
