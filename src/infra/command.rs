//! # Command Execution Module / 命令执行模块
//!
//! Builds step processes from their command lines and captures their output.
//!
//! 根据命令行构建步骤进程并捕获其输出。

use std::collections::BTreeMap;
use std::convert::Infallible;
use std::path::Path;
use std::process::{ExitStatus, Stdio};
use std::sync::Arc;

use anyhow::{Context, Result, anyhow};
use tokio::io::{AsyncBufReadExt, BufReader};

/// Expands `$VAR` / `${VAR}` references against `env` only. Unknown variables
/// expand to the empty string; the process environment is never consulted.
///
/// 仅根据 `env` 展开 `$VAR` / `${VAR}` 引用。未知变量展开为空字符串；
/// 从不读取进程环境。
pub fn expand_vars(input: &str, env: &BTreeMap<String, String>) -> Result<String> {
    let expanded = shellexpand::env_with_context(input, |var| -> Result<Option<String>, Infallible> {
        Ok(Some(env.get(var).cloned().unwrap_or_default()))
    })
    .with_context(|| format!("Failed to expand command: {input}"))?;
    Ok(expanded.into_owned())
}

/// Builds the process for a command line.
///
/// With `shell` set the line is handed to the platform shell verbatim;
/// otherwise it is split with shell-word rules and run directly.
///
/// # Arguments
/// * `command_line` - The already-expanded command line
/// * `shell` - Whether to run through `sh -c` / `cmd /C`
/// * `cwd` - Working directory of the process
/// * `env` - Variables added on top of the inherited environment
pub fn build_command(
    command_line: &str,
    shell: bool,
    cwd: &Path,
    env: &BTreeMap<String, String>,
) -> Result<tokio::process::Command> {
    let mut cmd = if shell {
        let (program, flag) = if cfg!(windows) { ("cmd", "/C") } else { ("sh", "-c") };
        let mut cmd = tokio::process::Command::new(program);
        cmd.arg(flag).arg(command_line);
        cmd
    } else {
        let parts = shlex::split(command_line)
            .ok_or_else(|| anyhow!("Failed to parse command: {}", command_line))?;
        let (program, args) = parts
            .split_first()
            .ok_or_else(|| anyhow!("Empty command after parsing."))?;
        let mut cmd = tokio::process::Command::new(program);
        cmd.args(args);
        cmd
    };

    cmd.envs(env).current_dir(cwd).kill_on_drop(true);
    Ok(cmd)
}

/// Spawns a command, captures its stdout and stderr.
/// The output streams are read concurrently and combined into a single string.
///
/// The child is spawned with `kill_on_drop`, so dropping the returned future
/// (e.g. on timeout) terminates the process.
///
/// # Returns
/// A tuple containing:
/// - The `ExitStatus` of the process wrapped in an `io::Result`.
/// - The combined stdout and stderr as a `String`.
///
/// 派生一个命令，捕获其 stdout 和 stderr。输出流被并发读取并合并到一个字符串中。
pub async fn spawn_and_capture(
    mut cmd: tokio::process::Command,
) -> (std::io::Result<ExitStatus>, String) {
    let mut child = match cmd
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
    {
        Ok(child) => child,
        Err(e) => return (Err(e), String::new()),
    };

    let (Some(stdout), Some(stderr)) = (child.stdout.take(), child.stderr.take()) else {
        return (
            Err(std::io::Error::other("Failed to capture child output")),
            String::new(),
        );
    };

    // Both readers append into the same buffer so the log keeps interleaving.
    let output = Arc::new(tokio::sync::Mutex::new(String::new()));

    let stdout_output = Arc::clone(&output);
    let stdout_handle = tokio::spawn(async move {
        let mut lines = BufReader::new(stdout).lines();
        while let Ok(Some(line)) = lines.next_line().await {
            let mut output = stdout_output.lock().await;
            output.push_str(&line);
            output.push('\n');
        }
    });

    let stderr_output = Arc::clone(&output);
    let stderr_handle = tokio::spawn(async move {
        let mut lines = BufReader::new(stderr).lines();
        while let Ok(Some(line)) = lines.next_line().await {
            let mut output = stderr_output.lock().await;
            output.push_str(&line);
            output.push('\n');
        }
    });

    let status = child.wait().await;

    if let Err(e) = stdout_handle.await {
        tracing::warn!("Failed to join stdout task: {}", e);
    }
    if let Err(e) = stderr_handle.await {
        tracing::warn!("Failed to join stderr task: {}", e);
    }

    let output = output.lock().await.clone();
    (status, output)
}
