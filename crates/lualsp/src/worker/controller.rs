//! Worker lifecycle controller: owns the embedded-server thread.

use std::any::Any;
use std::error::Error;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::thread;

use lualsp_config::DEFAULT_MAX_READ_LEN;
use tracing::{debug, error, info, warn};

use super::error::WorkerError;
use super::panic_trace;
use super::server::{EmbeddedServer, Flow, ServerError, ServerIo, ShutdownRequest};
use super::state::{Session, WorkerExit, WorkerState};
use super::{WORKER_TARGET, WORKER_THREAD_NAME};
use crate::pump::HostInput;
use crate::sink::OutputSink;
use crate::transport::Transport;

/// Exit slot filled by the worker thread when its entry routine returns.
#[derive(Debug, Default)]
struct Completion {
    exit: Mutex<Option<WorkerExit>>,
    done: Condvar,
}

impl Completion {
    fn lock(&self) -> MutexGuard<'_, Option<WorkerExit>> {
        self.exit.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn finish(&self, exit: WorkerExit) {
        *self.lock() = Some(exit);
        self.done.notify_all();
    }

    fn peek(&self) -> Option<WorkerExit> {
        *self.lock()
    }

    fn wait(&self) -> WorkerExit {
        let slot = self
            .done
            .wait_while(self.lock(), |exit| exit.is_none())
            .unwrap_or_else(PoisonError::into_inner);
        slot.unwrap_or(WorkerExit::Panicked)
    }
}

/// Owns one embedded-server session and the thread that runs it.
///
/// The controller is shared by reference: the owning thread calls
/// [`Self::start`] and [`Self::join`] while a pump thread feeds input through
/// [`Self::feed_input`] and [`Self::disconnect`], or through a cloned
/// [`InputHandle`].
pub struct WorkerController {
    args: Vec<String>,
    transport: Arc<Transport>,
    shutdown: ShutdownRequest,
    completion: Arc<Completion>,
    session: Mutex<Session>,
}

impl WorkerController {
    /// Records startup arguments and activates the queue backend.
    ///
    /// No thread is spawned until [`Self::start`].
    #[must_use]
    pub fn init<I, A>(args: I, sink: Option<Arc<dyn OutputSink>>) -> Self
    where
        I: IntoIterator<Item = A>,
        A: Into<String>,
    {
        let transport = Transport::new(DEFAULT_MAX_READ_LEN);
        transport.activate_queue(sink);
        Self::with_transport(args, Arc::new(transport))
    }

    /// Builds a controller over a transport the caller has already activated.
    #[must_use]
    pub fn with_transport<I, A>(args: I, transport: Arc<Transport>) -> Self
    where
        I: IntoIterator<Item = A>,
        A: Into<String>,
    {
        Self {
            args: args.into_iter().map(Into::into).collect(),
            transport,
            shutdown: ShutdownRequest::new(),
            completion: Arc::new(Completion::default()),
            session: Mutex::new(Session::NotStarted),
        }
    }

    /// Startup arguments handed to the server's bootstrap.
    #[must_use]
    pub fn args(&self) -> &[String] {
        &self.args
    }

    /// Transport shared with the worker.
    #[must_use]
    pub fn transport(&self) -> &Arc<Transport> {
        &self.transport
    }

    fn session(&self) -> MutexGuard<'_, Session> {
        self.session.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Current lifecycle state.
    #[must_use]
    pub fn state(&self) -> WorkerState {
        if matches!(*self.session(), Session::NotStarted) {
            return WorkerState::NotStarted;
        }
        match self.completion.peek() {
            Some(_) => WorkerState::Finished,
            None => WorkerState::Running,
        }
    }

    /// Spawns the worker thread that boots `server` and runs its loop.
    ///
    /// Returns as soon as the thread exists.
    ///
    /// # Errors
    ///
    /// Returns [`WorkerError::AlreadyStarted`] on a second call and
    /// [`WorkerError::Spawn`] when the thread cannot be created.
    pub fn start<S>(&self, server: S) -> Result<(), WorkerError>
    where
        S: EmbeddedServer + 'static,
    {
        let mut session = self.session();
        if !matches!(*session, Session::NotStarted) {
            error!(
                target: WORKER_TARGET,
                "worker start requested twice; ignoring the second request"
            );
            return Err(WorkerError::AlreadyStarted);
        }

        let context = WorkerContext {
            args: self.args.clone(),
            transport: Arc::clone(&self.transport),
            shutdown: self.shutdown.clone(),
            completion: Arc::clone(&self.completion),
        };
        panic_trace::install_hook();
        let handle = thread::Builder::new()
            .name(WORKER_THREAD_NAME.to_owned())
            .spawn(move || context.run(server))
            .map_err(|source| {
                error!(
                    target: WORKER_TARGET,
                    error = %source,
                    "failed to spawn worker thread"
                );
                WorkerError::Spawn { source }
            })?;

        *session = Session::Started(Some(handle));
        info!(
            target: WORKER_TARGET,
            args = ?self.args,
            "worker started"
        );
        Ok(())
    }

    /// Forwards host input to the worker.
    ///
    /// Before `start` the bytes are buffered; after the worker finished they
    /// are discarded. Returns whether the bytes were kept.
    pub fn feed_input(&self, bytes: &[u8]) -> bool {
        self.transport.feed(bytes)
    }

    /// Signals end-of-input, releasing a worker blocked in a read.
    ///
    /// Idempotent and safe from any thread.
    pub fn disconnect(&self) {
        self.transport.disconnect();
    }

    /// Handle the pump thread uses to feed input and disconnect.
    #[must_use]
    pub fn input(&self) -> InputHandle {
        InputHandle {
            transport: Arc::clone(&self.transport),
        }
    }

    /// Blocks until the worker thread has finished and reports how it ended.
    ///
    /// Idempotent. Returns [`WorkerExit::NeverStarted`] immediately when the
    /// worker was never started.
    pub fn join(&self) -> WorkerExit {
        let handle = match &mut *self.session() {
            Session::NotStarted => return WorkerExit::NeverStarted,
            Session::Started(handle) => handle.take(),
        };

        let exit = self.completion.wait();
        if let Some(handle) = handle
            && handle.join().is_err()
        {
            warn!(
                target: WORKER_TARGET,
                "worker thread unwound past its boundary"
            );
        }
        debug!(
            target: WORKER_TARGET,
            %exit,
            "worker joined"
        );
        exit
    }
}

impl HostInput for WorkerController {
    fn feed_input(&self, bytes: &[u8]) -> bool {
        Self::feed_input(self, bytes)
    }

    fn disconnect(&self) {
        Self::disconnect(self);
    }
}

impl fmt::Debug for WorkerController {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("WorkerController")
            .field("args", &self.args)
            .field("state", &self.state())
            .field("transport", &self.transport)
            .finish()
    }
}

/// Cloneable input side of a session, for use on the pump thread.
#[derive(Debug, Clone)]
pub struct InputHandle {
    transport: Arc<Transport>,
}

impl HostInput for InputHandle {
    fn feed_input(&self, bytes: &[u8]) -> bool {
        self.transport.feed(bytes)
    }

    fn disconnect(&self) {
        self.transport.disconnect();
    }
}

/// Everything the worker thread owns.
struct WorkerContext {
    args: Vec<String>,
    transport: Arc<Transport>,
    shutdown: ShutdownRequest,
    completion: Arc<Completion>,
}

impl WorkerContext {
    fn run<S: EmbeddedServer>(self, mut server: S) {
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| self.drive(&mut server)));
        let exit = outcome.unwrap_or_else(|payload| {
            let backtrace = panic_trace::take()
                .map_or_else(|| String::from("not captured"), |trace| trace.to_string());
            error!(
                target: WORKER_TARGET,
                panic = %panic_message(payload.as_ref()),
                %backtrace,
                "embedded server panicked"
            );
            WorkerExit::Panicked
        });

        // Late host input has nowhere to go once the loop is gone.
        self.transport.close_input();
        if exit.is_clean() {
            info!(target: WORKER_TARGET, %exit, "worker finished");
        } else {
            warn!(target: WORKER_TARGET, %exit, "worker finished abnormally");
        }
        self.completion.finish(exit);
    }

    fn drive<S: EmbeddedServer>(&self, server: &mut S) -> WorkerExit {
        if let Err(error) = server.boot(&self.args) {
            error!(
                target: WORKER_TARGET,
                error = %describe(&error),
                "embedded server failed to start"
            );
            return WorkerExit::StartupFailed;
        }
        debug!(target: WORKER_TARGET, "embedded server booted");

        let io = ServerIo::new(&self.transport, &self.shutdown);
        loop {
            match server.serve_one(&io) {
                Ok(Flow::Continue) => {
                    if self.shutdown.is_raised() {
                        info!(
                            target: WORKER_TARGET,
                            "embedded server requested shutdown"
                        );
                        return WorkerExit::ShutdownRequested;
                    }
                }
                Ok(Flow::EndOfInput) => {
                    debug!(target: WORKER_TARGET, "embedded server reached end of input");
                    return WorkerExit::EndOfInput;
                }
                Err(error) => {
                    error!(
                        target: WORKER_TARGET,
                        error = %describe(&error),
                        "embedded server failed"
                    );
                    return WorkerExit::Failed;
                }
            }
        }
    }
}

/// Renders an error with its full source chain.
fn describe(error: &ServerError) -> String {
    let mut rendered = error.to_string();
    let mut source = error.source();
    while let Some(cause) = source {
        rendered.push_str(": ");
        rendered.push_str(&cause.to_string());
        source = cause.source();
    }
    rendered
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        return (*message).to_owned();
    }
    if let Some(message) = payload.downcast_ref::<String>() {
        return message.clone();
    }
    String::from("non-string panic payload")
}
