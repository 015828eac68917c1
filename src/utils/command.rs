//! Utilities for running commands with proper error handling and timeouts

use anyhow::{Context, Result};
use std::collections::HashMap;
use std::process::{Command, Output, Stdio};
use std::sync::OnceLock;
use std::time::Duration;
use tracing::{debug, error};

static RUNTIME: OnceLock<tokio::runtime::Runtime> = OnceLock::new();

/// Runtime used only to enforce subprocess timeouts. Built on first use so
/// callers (and unit tests) don't need an ambient tokio runtime.
fn runtime() -> Result<&'static tokio::runtime::Runtime> {
    if let Some(rt) = RUNTIME.get() {
        return Ok(rt);
    }
    let rt = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("Failed to build runtime for command timeouts")?;
    Ok(RUNTIME.get_or_init(|| rt))
}

/// Run a command with the given environment and optional timeout
pub fn run_command(
    program: &str,
    args: &[&str],
    envs: &HashMap<String, String>,
    timeout: Option<Duration>,
) -> Result<Output> {
    let mut cmd = Command::new(program);
    cmd.args(args);
    cmd.envs(envs);
    cmd.stdout(Stdio::piped());
    cmd.stderr(Stdio::piped());

    debug!("Running command: {} {}", program, args.join(" "));

    let output = if let Some(timeout_duration) = timeout {
        runtime()?.block_on(async {
            let result =
                tokio::time::timeout(timeout_duration, tokio::process::Command::from(cmd).output())
                    .await;

            match result {
                Ok(output) => output.context(format!("Failed to execute {}", program)),
                Err(_) => Err(anyhow::anyhow!(
                    "Command timed out after {:?}",
                    timeout_duration
                )),
            }
        })?
    } else {
        cmd.output()
            .context(format!("Failed to execute {}", program))?
    };

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        error!("Command failed: {} {}", program, args.join(" "));
        error!("Stderr: {}", stderr);
        anyhow::bail!(
            "Command failed with exit code {:?}: {}",
            output.status.code(),
            stderr.trim()
        );
    }

    Ok(output)
}

/// Run a command and return stdout as string
pub fn run_command_stdout(
    program: &str,
    args: &[&str],
    envs: &HashMap<String, String>,
    timeout: Option<Duration>,
) -> Result<String> {
    let output = run_command(program, args, envs, timeout)?;
    Ok(String::from_utf8_lossy(&output.stdout).to_string())
}
