//! # Result Aggregation Module / 结果汇总模块
//!
//! Rolls per-job reports up into the run's single status and, on push,
//! forwards coverage artifacts to the reporting collaborator. Forwarding
//! happens after the status is fixed and its failures are only recorded.
//!
//! 将各作业报告汇总为运行的唯一状态，并在 push 时将覆盖率产物
//! 转发给报告协作方。转发发生在状态确定之后，其失败只会被记录。

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures::future::join_all;

use crate::core::error::ReportingError;
use crate::core::models::{CoverageArtifact, JobReport, RunReport, RunStatus};
use crate::core::trigger::{TriggerContext, TriggerEvent};

/// External collaborator accepting coverage uploads. It is called
/// concurrently for several jobs and must not require coordination.
///
/// 接收覆盖率上传的外部协作方。会针对多个作业并发调用，不得要求外部协调。
#[async_trait]
pub trait CoverageReporter: Send + Sync {
    async fn upload(
        &self,
        artifact: &CoverageArtifact,
        trigger: &TriggerContext,
    ) -> Result<(), ReportingError>;
}

/// `Success` only if every job passed.
pub fn overall_status(jobs: &[JobReport]) -> RunStatus {
    if jobs.iter().all(|j| !j.is_failure()) {
        RunStatus::Success
    } else {
        RunStatus::Failure
    }
}

/// Builds the run report and performs the push-only coverage forwarding.
///
/// # Arguments
/// * `trigger` - The run's trigger context; forwarding happens only on push
/// * `jobs` - Reports of every job in the matrix
/// * `reporter` - Where coverage goes, if anywhere
/// * `started_at` - When the run started, for the report
/// * `duration` - Wall-clock time spent running the jobs
pub async fn aggregate(
    trigger: &TriggerContext,
    jobs: Vec<JobReport>,
    reporter: Option<&dyn CoverageReporter>,
    started_at: DateTime<Utc>,
    duration: Duration,
) -> RunReport {
    let status = overall_status(&jobs);
    let mut reporting_failures = Vec::new();

    if trigger.event == TriggerEvent::Push {
        for job in &jobs {
            if let Some(error) = &job.coverage_error {
                tracing::warn!(job = %job.job, "coverage not collected: {}", error);
                reporting_failures.push(format!("{}: {}", job.job.label(), error));
            }
        }

        if let Some(reporter) = reporter {
            let uploads = jobs
                .iter()
                .filter_map(|job| job.coverage.as_ref().map(|artifact| (job, artifact)))
                .map(|(job, artifact)| async move {
                    (job, reporter.upload(artifact, trigger).await)
                });

            for (job, result) in join_all(uploads).await {
                if let Err(e) = result {
                    tracing::warn!(job = %job.job, "coverage upload failed: {}", e);
                    reporting_failures.push(format!("{}: {}", job.job.label(), e));
                }
            }
        }
    }

    RunReport {
        event: trigger.event,
        status,
        jobs,
        reporting_failures,
        started_at,
        duration,
    }
}
