//! # Coverage Forwarding Module / 覆盖率转发模块
//!
//! Implementations of the coverage reporting collaborator. Both are
//! stateless apart from their configuration, so concurrent uploads from
//! several jobs need no coordination.
//!
//! 覆盖率报告协作方的实现。除配置外均无状态，
//! 因此多个作业的并发上传无需协调。

use std::path::PathBuf;

use async_trait::async_trait;

use crate::core::aggregator::CoverageReporter;
use crate::core::config::CoverageConfig;
use crate::core::error::ReportingError;
use crate::core::models::CoverageArtifact;
use crate::core::trigger::TriggerContext;
use crate::infra::command;

/// Copies each artifact into a directory as `<job-slug>-<file>`.
/// 将每个产物以 `<job-slug>-<file>` 的形式复制到一个目录中。
#[derive(Debug, Clone)]
pub struct DirectoryReporter {
    pub dir: PathBuf,
}

#[async_trait]
impl CoverageReporter for DirectoryReporter {
    async fn upload(
        &self,
        artifact: &CoverageArtifact,
        _trigger: &TriggerContext,
    ) -> Result<(), ReportingError> {
        tokio::fs::create_dir_all(&self.dir).await?;
        let target = self
            .dir
            .join(format!("{}-{}", artifact.job_slug, artifact.file_name));
        tokio::fs::write(&target, &artifact.contents).await?;
        tracing::debug!(path = %target.display(), "coverage artifact stored");
        Ok(())
    }
}

/// Runs an upload command once per artifact. The artifact is written to a
/// temporary file exposed as `COVERAGE_FILE`; the push secret, when present,
/// is exported under its own name.
///
/// 每个产物运行一次上传命令。产物被写入一个临时文件并通过
/// `COVERAGE_FILE` 暴露；push 密钥（如有）以其自身名称导出。
#[derive(Debug, Clone)]
pub struct CommandReporter {
    pub command: String,
}

#[async_trait]
impl CoverageReporter for CommandReporter {
    async fn upload(
        &self,
        artifact: &CoverageArtifact,
        trigger: &TriggerContext,
    ) -> Result<(), ReportingError> {
        let staging = tempfile::Builder::new()
            .prefix(&format!("ci_matrix_coverage_{}_", artifact.job_slug))
            .tempdir()?;
        let file = staging.path().join(&artifact.file_name);
        tokio::fs::write(&file, &artifact.contents).await?;

        let mut env = std::collections::BTreeMap::new();
        env.insert("COVERAGE_FILE".to_string(), file.to_string_lossy().into_owned());
        env.insert("CI_JOB".to_string(), artifact.job_slug.clone());
        if let Some(secret) = trigger.secret() {
            env.insert(secret.env_name.clone(), secret.expose().to_string());
        }

        let cmd = command::build_command(&self.command, true, staging.path(), &env)
            .map_err(|_| ReportingError::InvalidCommand)?;
        let (status, output) = command::spawn_and_capture(cmd).await;
        let status = status?;
        if status.success() {
            Ok(())
        } else {
            Err(ReportingError::UploadFailed {
                status: status.to_string(),
                output: output.trim().to_string(),
            })
        }
    }
}

/// Picks the reporter described by `[coverage]`: the upload command when
/// set, otherwise the output directory. `None` when neither is configured.
pub fn reporter_from_config(config: &CoverageConfig) -> Option<Box<dyn CoverageReporter>> {
    if let Some(command) = &config.upload_command {
        if command.trim().is_empty() {
            return None;
        }
        return Some(Box::new(CommandReporter {
            command: command.clone(),
        }));
    }
    config
        .output_dir
        .as_ref()
        .map(|dir| Box::new(DirectoryReporter { dir: dir.clone() }) as Box<dyn CoverageReporter>)
}
