//! Runtime for the `lualsp` binary.
//!
//! Splits leading configuration flags from the server arguments, loads the
//! layered configuration, installs telemetry on stderr, injects the resource
//! directory, and serves LSP over the process streams until the client
//! disconnects or asks the server to exit.

use std::env;
use std::ffi::OsString;
use std::io::Write;
use std::process::ExitCode;

use lualsp::{WorkerExit, telemetry};

mod config;
mod errors;
mod launch;
mod resource;

use config::{ConfigLoader, OrthoConfigLoader, split_config_arguments};
pub(crate) use errors::AppError;
use launch::{HostStreams, run_session};
use resource::inject_resource_dir;

/// Log target for binary-level events.
pub(crate) const CLI_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::cli");

/// Runs the binary with the provided arguments, serving stdin and stdout.
///
/// Configuration errors are reported on `stderr`. The process fails only
/// when the configuration is unusable or the server cannot start.
#[must_use]
pub fn run<I, E>(args: I, stderr: &mut E) -> ExitCode
where
    I: IntoIterator<Item = OsString>,
    E: Write,
{
    run_with(args, stderr, &OrthoConfigLoader, HostStreams::Process)
}

fn run_with<I, E, L>(args: I, stderr: &mut E, loader: &L, streams: HostStreams) -> ExitCode
where
    I: IntoIterator<Item = OsString>,
    E: Write,
    L: ConfigLoader,
{
    let arguments: Vec<OsString> = args.into_iter().collect();
    match serve(&arguments, loader, streams) {
        Ok(exit) => exit_code(exit),
        Err(error) => {
            let _ = writeln!(stderr, "lualsp: {error}");
            ExitCode::FAILURE
        }
    }
}

fn serve<L: ConfigLoader>(
    args: &[OsString],
    loader: &L,
    streams: HostStreams,
) -> Result<WorkerExit, AppError> {
    let split = split_config_arguments(args);
    let config = loader.load(&split.config_arguments)?;
    config.validate()?;
    telemetry::initialise(&config)?;

    let mut server_args: Vec<String> = split
        .server_arguments
        .iter()
        .map(|argument| argument.to_string_lossy().into_owned())
        .collect();
    inject_resource_dir(
        &mut server_args,
        config.resource_dir_override(),
        env::current_exe(),
    );
    run_session(&config, server_args, streams)
}

fn exit_code(exit: WorkerExit) -> ExitCode {
    u8::try_from(exit.exit_code()).map_or(ExitCode::FAILURE, ExitCode::from)
}
