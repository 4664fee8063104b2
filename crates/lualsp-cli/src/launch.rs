//! Runs one embedded session over the host's streams.

use std::io::{self, Read};
use std::sync::Arc;

use lualsp::{
    OutputSink, PumpSummary, StubLanguageServer, Transport, WorkerController, WorkerExit,
    WriterSink, spawn_pump,
};
use lualsp_config::{Config, TransportKind};
use tracing::{debug, info, warn};

use crate::{AppError, CLI_TARGET};

/// Streams the session reads requests from and writes responses to.
pub(crate) enum HostStreams {
    /// The process stdin and stdout.
    Process,
    /// Caller-provided streams.
    #[cfg(test)]
    Custom {
        input: Box<dyn Read + Send>,
        output: Box<dyn io::Write + Send>,
    },
}

impl HostStreams {
    fn into_parts(self) -> (Box<dyn Read + Send>, Arc<dyn OutputSink>) {
        match self {
            Self::Process => (Box::new(io::stdin()), Arc::new(WriterSink::stdout())),
            #[cfg(test)]
            Self::Custom { input, output } => (input, Arc::new(WriterSink::new(output))),
        }
    }
}

/// Serves one session with the configured transport and reports how the
/// worker ended.
pub(crate) fn run_session(
    config: &Config,
    args: Vec<String>,
    streams: HostStreams,
) -> Result<WorkerExit, AppError> {
    info!(
        target: CLI_TARGET,
        transport = %config.transport(),
        args = ?args,
        "starting language server"
    );
    match config.transport() {
        TransportKind::Queue => run_queue(config, args, streams),
        TransportKind::Stdio => run_stdio(config, args, streams),
    }
}

fn run_queue(
    config: &Config,
    args: Vec<String>,
    streams: HostStreams,
) -> Result<WorkerExit, AppError> {
    let (input, sink) = streams.into_parts();
    let transport = Transport::new(config.max_read_len());
    transport.activate_queue(Some(sink));
    let controller = WorkerController::with_transport(args, Arc::new(transport));
    controller.start(StubLanguageServer::new())?;

    let pump = match spawn_pump(input, controller.input(), config.input_chunk_size()) {
        Ok(pump) => pump,
        Err(error) => {
            controller.disconnect();
            controller.join();
            return Err(AppError::SpawnPump(error));
        }
    };

    let exit = controller.join();
    // A pump still blocked on an open stdin is left behind; process exit
    // reclaims it.
    if pump.is_finished() {
        match pump.join() {
            Ok(Ok(summary)) => log_summary(summary),
            Ok(Err(error)) => warn!(target: CLI_TARGET, error = %error, "input pump failed"),
            Err(_) => warn!(target: CLI_TARGET, "input pump panicked"),
        }
    } else {
        debug!(target: CLI_TARGET, "input pump still waiting on stdin");
    }
    Ok(exit)
}

fn run_stdio(
    config: &Config,
    args: Vec<String>,
    streams: HostStreams,
) -> Result<WorkerExit, AppError> {
    let transport = Transport::new(config.max_read_len());
    match streams {
        HostStreams::Process => transport.activate_stdio(),
        #[cfg(test)]
        HostStreams::Custom { input, output } => transport.activate_streams(input, output),
    }
    let controller = WorkerController::with_transport(args, Arc::new(transport));
    controller.start(StubLanguageServer::new())?;
    Ok(controller.join())
}

fn log_summary(summary: PumpSummary) {
    debug!(
        target: CLI_TARGET,
        forwarded = summary.forwarded,
        refused = summary.refused,
        "input pump joined"
    );
}
