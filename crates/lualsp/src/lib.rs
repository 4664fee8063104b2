//! Embedded language server host.
#![deny(missing_docs)]
//!
//! The crate lets a single-threaded language server run either as a normal
//! stdio process or as an in-process worker fed by a host application. The
//! [`Transport`] gives the server one blocking byte stream regardless of
//! backend; the [`WorkerController`] owns the worker thread and its
//! lifecycle; the pump drains a host input source into the session and
//! signals disconnect so the worker terminates cleanly.
//!
//! The C ABI in [`ffi`] wraps one process-wide session for hosts that cannot
//! hold a Rust value.

mod channel;
pub mod ffi;
pub mod protocol;
mod pump;
mod sink;
mod stub_server;
pub mod telemetry;
mod transport;
mod worker;

pub use channel::{ByteChannel, ReadOutcome};
pub use pump::{HostInput, PUMP_THREAD_NAME, PumpSummary, pump_input, spawn_pump};
pub use sink::{OutputSink, WriterSink};
pub use stub_server::{RESOURCE_DIR_FLAG, StubLanguageServer, find_resource_dir};
pub use transport::{Transport, TransportError, TransportMode};
pub use worker::{
    EmbeddedServer, Flow, InputHandle, ServerError, ServerIo, ShutdownRequest, WORKER_THREAD_NAME,
    WorkerController, WorkerError, WorkerExit, WorkerState,
};

#[cfg(test)]
mod tests;
