//! C ABI over a single process-wide session.
//!
//! Hosts written in C drive the same lifecycle as [`WorkerController`]:
//! `LSPInit → LSPStartWorker → LSPWriteInput* → LSPDisconnect → LSPJoin`.
//! `LSPMain` starts the worker and joins it on the calling thread.
//! Contract violations are logged and the call returns without effect.

use std::ffi::{CStr, c_char, c_int};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use lualsp_config::Config;
use ortho_config::OrthoConfig;
use tracing::{debug, error, warn};

use crate::sink::OutputSink;
use crate::stub_server::StubLanguageServer;
use crate::telemetry;
use crate::transport::Transport;
use crate::worker::{WorkerController, WorkerState};

/// Log target for C ABI calls.
const FFI_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::ffi");

/// Output callback receiving `len` bytes at `data`.
///
/// The pointer is valid only for the duration of the call.
pub type LspOutputCallback = Option<unsafe extern "C" fn(data: *const c_char, len: usize)>;

static SESSION: Mutex<Option<Arc<WorkerController>>> = Mutex::new(None);

fn slot() -> MutexGuard<'static, Option<Arc<WorkerController>>> {
    SESSION.lock().unwrap_or_else(PoisonError::into_inner)
}

fn current(call: &str) -> Option<Arc<WorkerController>> {
    let session = slot().clone();
    if session.is_none() {
        error!(target: FFI_TARGET, call, "called before LSPInit");
    }
    session
}

struct CallbackSink(unsafe extern "C" fn(*const c_char, usize));

impl OutputSink for CallbackSink {
    fn emit(&self, bytes: &[u8]) {
        // SAFETY: the host registered this callback for exactly this
        // signature; the buffer outlives the call.
        unsafe { (self.0)(bytes.as_ptr().cast(), bytes.len()) };
    }
}

/// Copies `argv` into owned strings, replacing invalid UTF-8.
///
/// # Safety
///
/// `argv` must be null or point to `argc` readable pointers, each null or a
/// NUL-terminated string.
unsafe fn collect_args(argc: c_int, argv: *const *const c_char) -> Vec<String> {
    if argv.is_null() {
        return Vec::new();
    }
    let count = usize::try_from(argc).unwrap_or(0);
    (0..count)
        .filter_map(|index| {
            // SAFETY: the caller guarantees `argc` readable entries.
            let entry = unsafe { *argv.add(index) };
            if entry.is_null() {
                return None;
            }
            // SAFETY: non-null entries are NUL-terminated strings.
            let text = unsafe { CStr::from_ptr(entry) };
            Some(text.to_string_lossy().into_owned())
        })
        .collect()
}

fn load_config() -> Config {
    // Only the environment and configuration files apply; argv belongs to
    // the embedded server.
    let config = match Config::load_from_iter([env!("CARGO_PKG_NAME")]) {
        Ok(config) => config,
        Err(error) => {
            warn!(target: FFI_TARGET, error = %error, "ignoring invalid configuration");
            Config::default()
        }
    };
    if let Err(error) = config.validate() {
        warn!(target: FFI_TARGET, error = %error, "ignoring invalid configuration");
        return Config::default();
    }
    config
}

/// Records startup arguments and activates the queue backend.
///
/// Replaces a previous session unless its worker is still running. Does not
/// start the worker.
///
/// # Safety
///
/// `argv` must be null or point to `argc` readable pointers, each null or a
/// NUL-terminated string. `output_cb`, when set, must remain callable until
/// the session ends and may be invoked from the worker thread.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn LSPInit(
    argc: c_int,
    argv: *const *const c_char,
    output_cb: LspOutputCallback,
) {
    let config = load_config();
    if let Err(error) = telemetry::initialise(&config) {
        debug!(target: FFI_TARGET, error = %error, "host telemetry left in place");
    }

    // SAFETY: forwarded from this function's contract.
    let args = unsafe { collect_args(argc, argv) };
    let sink = output_cb.map(|callback| Arc::new(CallbackSink(callback)) as Arc<dyn OutputSink>);

    let mut session = slot();
    if let Some(existing) = session.as_ref()
        && existing.state() == WorkerState::Running
    {
        error!(
            target: FFI_TARGET,
            "LSPInit called while a worker is running; ignoring"
        );
        return;
    }

    let transport = Transport::new(config.max_read_len());
    transport.activate_queue(sink);
    *session = Some(Arc::new(WorkerController::with_transport(
        args,
        Arc::new(transport),
    )));
}

/// Spawns the worker thread and returns immediately.
///
/// Returns 0 on success and -1 when there is no session, the worker was
/// already started, or the thread could not be spawned.
#[unsafe(no_mangle)]
pub extern "C" fn LSPStartWorker() -> c_int {
    let Some(session) = current("LSPStartWorker") else {
        return -1;
    };
    match session.start(StubLanguageServer::new()) {
        Ok(()) => 0,
        Err(_) => -1,
    }
}

/// Appends `len` bytes at `data` to the session input.
///
/// Returns 1 when the bytes were kept and 0 when they were discarded.
///
/// # Safety
///
/// `data` must point to `len` readable bytes, or be null when `len` is 0.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn LSPWriteInput(data: *const c_char, len: usize) -> c_int {
    let Some(session) = current("LSPWriteInput") else {
        return 0;
    };
    if data.is_null() || len == 0 {
        return 1;
    }
    // SAFETY: the caller guarantees `len` readable bytes at `data`.
    let bytes = unsafe { std::slice::from_raw_parts(data.cast::<u8>(), len) };
    c_int::from(session.feed_input(bytes))
}

/// Signals end-of-input. Idempotent and safe from any thread.
#[unsafe(no_mangle)]
pub extern "C" fn LSPDisconnect() {
    if let Some(session) = current("LSPDisconnect") {
        session.disconnect();
    }
}

/// Blocks until the worker has finished and returns its exit status.
///
/// Returns 0 when there is no session.
#[unsafe(no_mangle)]
pub extern "C" fn LSPJoin() -> c_int {
    current("LSPJoin").map_or(0, |session| session.join().exit_code())
}

/// Starts the worker and joins it on the calling thread.
#[unsafe(no_mangle)]
pub extern "C" fn LSPMain() -> c_int {
    if LSPStartWorker() != 0 {
        return -1;
    }
    LSPJoin()
}
