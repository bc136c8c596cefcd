//! # File System Operations Module / 文件系统操作模块
//!
//! Gives every job its own temporary workspace and materializes the checkout
//! into it. Workspaces are deleted when their `TempDir` guard is dropped.
//!
//! 为每个作业提供独立的临时工作区并将检出内容放入其中。
//! 当 `TempDir` guard 被丢弃时工作区会被删除。

use std::path::Path;

use anyhow::{Context, Result, bail};
use fs_extra::dir::{CopyOptions, copy};
use tempfile::TempDir;

use crate::core::config::CheckoutConfig;
use crate::infra::command;

/// Creates a fresh, empty workspace directory for one job.
///
/// # Arguments
/// * `job_slug` - Filesystem-safe job identifier, used as the directory prefix
pub fn create_job_workspace(job_slug: &str) -> Result<TempDir> {
    tempfile::Builder::new()
        .prefix(&format!("ci_matrix_{}_", job_slug))
        .tempdir()
        .with_context(|| format!("Failed to create workspace for job {}", job_slug))
}

/// Creates a workspace and fills it according to `checkout`.
///
/// A local `path` is copied; a `repository` is cloned with `git`, honoring
/// `depth`. Without a checkout the workspace stays empty.
pub async fn prepare_workspace(job_slug: &str, checkout: Option<&CheckoutConfig>) -> Result<TempDir> {
    let workspace = create_job_workspace(job_slug)?;
    let Some(checkout) = checkout else {
        return Ok(workspace);
    };

    if let Some(source) = &checkout.path {
        let source = source.clone();
        let target = workspace.path().to_path_buf();
        tokio::task::spawn_blocking(move || copy_dir_contents(&source, &target))
            .await
            .context("Checkout copy task panicked")??;
    } else if let Some(repository) = &checkout.repository {
        clone_repository(repository, checkout.depth, workspace.path()).await?;
    }

    Ok(workspace)
}

/// Copies everything inside `from` into the existing directory `to`.
pub fn copy_dir_contents(from: &Path, to: &Path) -> Result<()> {
    if !from.is_dir() {
        bail!("Checkout source is not a directory: {}", from.display());
    }
    let mut options = CopyOptions::new();
    options.overwrite = true;
    options.content_only = true;
    copy(from, to, &options)
        .with_context(|| format!("Failed to copy {} into {}", from.display(), to.display()))?;
    Ok(())
}

async fn clone_repository(repository: &str, depth: Option<u32>, target: &Path) -> Result<()> {
    let mut cmd = tokio::process::Command::new("git");
    cmd.arg("clone").arg("--quiet");
    if let Some(depth) = depth {
        cmd.arg("--depth").arg(depth.to_string());
    }
    cmd.arg(repository).arg(target).kill_on_drop(true);

    let (status, output) = command::spawn_and_capture(cmd).await;
    let status = status.context("Failed to run 'git clone'")?;
    if !status.success() {
        bail!("'git clone {}' failed ({}): {}", repository, status, output.trim());
    }
    Ok(())
}
