//! Resource directory injection for the embedded server.
//!
//! The server needs `--resource-dir` to locate its scripts. When the caller
//! does not pass one, the binary derives it from its own location: the
//! executable's directory when it holds `script/`, else its parent when that
//! holds `script/` (the `bin/` layout), else the executable's directory.

use std::io;
use std::path::{Path, PathBuf};

use camino::Utf8Path;
use lualsp::{RESOURCE_DIR_FLAG, find_resource_dir};
use tracing::{debug, warn};

use crate::CLI_TARGET;

/// Directory whose presence marks a resource root.
const SCRIPT_DIR: &str = "script";

/// Resource directory for an executable installed at `exe`.
pub(crate) fn resource_dir_for_exe(exe: &Path) -> PathBuf {
    let parent = match exe.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => return PathBuf::from("."),
    };
    if parent.join(SCRIPT_DIR).exists() {
        return parent.to_path_buf();
    }
    if let Some(grandparent) = parent.parent()
        && grandparent.join(SCRIPT_DIR).exists()
    {
        return grandparent.to_path_buf();
    }
    parent.to_path_buf()
}

/// Adds `--resource-dir=<dir>` right after the program name unless the
/// arguments already carry one.
///
/// A configured override wins over the location of `exe`.
pub(crate) fn inject_resource_dir(
    args: &mut Vec<String>,
    override_dir: Option<&Utf8Path>,
    exe: io::Result<PathBuf>,
) {
    if let Some(existing) = find_resource_dir(args.as_slice()) {
        debug!(target: CLI_TARGET, resource_dir = existing, "resource directory supplied");
        return;
    }

    let dir = match (override_dir, exe) {
        (Some(dir), _) => dir.as_std_path().to_path_buf(),
        (None, Ok(path)) => resource_dir_for_exe(&path),
        (None, Err(error)) => {
            warn!(
                target: CLI_TARGET,
                error = %error,
                "cannot locate the executable; using the working directory"
            );
            PathBuf::from(".")
        }
    };

    let flag = format!("{RESOURCE_DIR_FLAG}={}", dir.display());
    debug!(target: CLI_TARGET, argument = %flag, "injecting resource directory");
    let position = args.len().min(1);
    args.insert(position, flag);
}
