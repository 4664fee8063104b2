//! Entrypoint for the `lualsp` language server.
//!
//! The binary delegates to [`lualsp_cli::run`], which loads configuration,
//! injects the resource directory, and serves LSP over stdin and stdout.

use std::io;
use std::process::ExitCode;

fn main() -> ExitCode {
    // Not locked: worker threads log to stderr while `run` blocks.
    let mut stderr = io::stderr();
    lualsp_cli::run(std::env::args_os(), &mut stderr)
}
