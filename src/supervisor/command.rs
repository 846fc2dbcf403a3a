//! Worker command building and binary resolution

use std::env;
use std::path::{Path, PathBuf};
use std::process::Stdio;

use tokio::process::Command;

use crate::error::{Result, ScanError};
use crate::types::ScanConfig;

/// Name of the worker executable
pub const WORKER_BIN: &str = "strix";

/// Binary search paths prepended for the worker (Docker and common tooling)
const EXTRA_PATHS: &str =
    "/Applications/Docker.app/Contents/Resources/bin:/usr/local/bin:/opt/homebrew/bin";

/// Resolve the worker executable
///
/// Checks the fixed pipx-style install location first, then falls back to a
/// system-wide `PATH` lookup.
///
/// # Errors
/// Returns [`ScanError::WorkerNotFound`] if the worker cannot be resolved.
pub fn resolve_worker() -> Result<PathBuf> {
    let home = env::var("HOME").unwrap_or_else(|_| String::from("/root"));
    let installed = PathBuf::from(home).join(".local/bin").join(WORKER_BIN);
    if installed.is_file() {
        return Ok(installed);
    }

    which::which(WORKER_BIN).map_err(|_| ScanError::worker_not_found())
}

/// Build the worker command line and environment for one session
///
/// One `--target` flag per configured target, the non-interactive flag, and
/// an optional `--instruction`. The environment propagates the ambient
/// process env and injects the model selector, an API credential sourced from
/// the first available ambient variable, the extended binary search path, and
/// unbuffered-output mode so lines arrive in real time.
pub fn build_worker_command(worker: &Path, config: &ScanConfig, workdir: &Path) -> Command {
    let mut cmd = Command::new(worker);

    for target in &config.targets {
        cmd.arg("--target").arg(&target.value);
    }
    cmd.arg("-n");

    if !config.user_instructions.is_empty() {
        cmd.arg("--instruction").arg(&config.user_instructions);
    }

    cmd.env("STRIX_LLM", &config.llm_model);
    if let Some(api_key) = env::var("LLM_API_KEY")
        .ok()
        .or_else(|| env::var("OPENAI_API_KEY").ok())
    {
        cmd.env("LLM_API_KEY", api_key);
    }

    let current_path = env::var("PATH").unwrap_or_else(|_| String::from("/usr/bin:/bin"));
    cmd.env("PATH", format!("{EXTRA_PATHS}:{current_path}"));
    cmd.env("PYTHONUNBUFFERED", "1");

    cmd.current_dir(workdir)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    cmd
}
