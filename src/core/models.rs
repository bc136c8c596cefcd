//! # Data Models Module / 数据模型模块
//!
//! This module defines the core data structures shared by the engine: matrix
//! axes, job instances, per-step records and the per-job and per-run reports.
//!
//! 此模块定义了引擎共享的核心数据结构：矩阵轴、作业实例、
//! 单步骤记录以及单作业和整次运行的报告。

use std::fmt;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::core::error::{JobFailure, duration_secs};
use crate::core::trigger::TriggerEvent;

/// A named dimension of the matrix with an ordered list of values.
/// 矩阵中的一个具名维度，带有有序的取值列表。
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Axis {
    /// The axis name, e.g. `platform` or `python-version`.
    /// 轴名称，例如 `platform` 或 `python-version`。
    pub name: String,
    /// Values in declaration order. Order is preserved by expansion.
    /// 按声明顺序排列的值。展开时保持此顺序。
    pub values: Vec<String>,
}

impl Axis {
    pub fn new<S: Into<String>>(name: impl Into<String>, values: impl IntoIterator<Item = S>) -> Self {
        Self {
            name: name.into(),
            values: values.into_iter().map(Into::into).collect(),
        }
    }
}

/// One concrete combination of axis values. Immutable once created: fields
/// are private and only read accessors are exposed.
///
/// 轴取值的一个具体组合。创建后不可变：字段私有，只暴露读取方法。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobInstance {
    /// Position of this job in the expanded matrix.
    /// 此作业在展开矩阵中的位置。
    pub index: usize,
    values: Vec<(String, String)>,
}

impl JobInstance {
    pub fn new(index: usize, values: Vec<(String, String)>) -> Self {
        Self { index, values }
    }

    /// The value this job carries for `axis`, if the axis exists.
    pub fn value(&self, axis: &str) -> Option<&str> {
        self.values
            .iter()
            .find(|(name, _)| name == axis)
            .map(|(_, value)| value.as_str())
    }

    /// `(axis, value)` pairs in axis declaration order.
    pub fn values(&self) -> &[(String, String)] {
        &self.values
    }

    /// Human-readable identifier, e.g. `(ubuntu-latest, 3.9)`.
    pub fn label(&self) -> String {
        let parts: Vec<&str> = self.values.iter().map(|(_, v)| v.as_str()).collect();
        format!("({})", parts.join(", "))
    }

    /// A filesystem-safe identifier, e.g. `ubuntu-latest_3.9`.
    pub fn slug(&self) -> String {
        self.values
            .iter()
            .map(|(_, v)| {
                v.chars()
                    .map(|c| if c.is_alphanumeric() || c == '.' || c == '-' { c } else { '_' })
                    .collect::<String>()
            })
            .collect::<Vec<_>>()
            .join("_")
    }
}

impl fmt::Display for JobInstance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.label())
    }
}

/// The outcome of one step inside one job.
/// 单个作业中单个步骤的结果。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StepOutcome {
    Skipped,
    Passed,
    Failed,
}

/// What happened when a step was considered for a job.
/// 某个步骤在作业中被处理时发生的情况。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StepRecord {
    pub name: String,
    pub outcome: StepOutcome,
    /// Captured stdout and stderr, or the reason the step was skipped or failed.
    /// 捕获的 stdout 和 stderr，或步骤被跳过、失败的原因。
    pub output: String,
    #[serde(with = "duration_secs")]
    pub duration: Duration,
    pub exit_code: Option<i32>,
}

impl StepRecord {
    pub fn skipped(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            outcome: StepOutcome::Skipped,
            output: String::new(),
            duration: Duration::ZERO,
            exit_code: None,
        }
    }

    pub fn is_failure(&self) -> bool {
        self.outcome == StepOutcome::Failed
    }
}

/// Per-job rolled-up status.
/// 单个作业汇总后的状态。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Passed,
    Failed,
}

/// A coverage file collected from a job workspace, ready to be forwarded.
/// 从作业工作区收集的覆盖率文件，准备转发。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CoverageArtifact {
    pub job_slug: String,
    pub file_name: String,
    #[serde(skip)]
    pub contents: Vec<u8>,
}

/// Everything recorded for one job instance.
/// 为单个作业实例记录的全部内容。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobReport {
    pub job: JobInstance,
    pub steps: Vec<StepRecord>,
    pub status: JobStatus,
    pub failure: Option<JobFailure>,
    #[serde(with = "duration_secs")]
    pub duration: Duration,
    #[serde(skip)]
    pub coverage: Option<CoverageArtifact>,
    /// Why the coverage artifact could not be collected, if it was expected.
    /// 预期的覆盖率产物无法收集的原因（如有）。
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub coverage_error: Option<String>,
}

impl JobReport {
    /// Builds a report from step records, deriving the status: the job fails
    /// if any executed step failed. Skipped steps never count.
    pub fn from_steps(job: JobInstance, steps: Vec<StepRecord>, duration: Duration) -> Self {
        let failed: Vec<String> = steps
            .iter()
            .filter(|s| s.is_failure())
            .map(|s| s.name.clone())
            .collect();
        let failure = (!failed.is_empty()).then_some(JobFailure::StepFailure { steps: failed });
        Self::with_failure(job, steps, duration, failure)
    }

    /// Builds a report whose status is dictated by `failure`, keeping the
    /// already-collected steps for diagnostics.
    pub fn with_failure(
        job: JobInstance,
        steps: Vec<StepRecord>,
        duration: Duration,
        failure: Option<JobFailure>,
    ) -> Self {
        let status = if failure.is_some() {
            JobStatus::Failed
        } else {
            JobStatus::Passed
        };
        Self {
            job,
            steps,
            status,
            failure,
            duration,
            coverage: None,
            coverage_error: None,
        }
    }

    pub fn is_failure(&self) -> bool {
        self.status == JobStatus::Failed
    }

    pub fn failed_steps(&self) -> impl Iterator<Item = &StepRecord> {
        self.steps.iter().filter(|s| s.is_failure())
    }
}

/// The single externally visible outcome of a run.
/// 一次运行唯一对外可见的结果。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunStatus {
    Success,
    Failure,
}

/// The aggregated result of a whole run.
/// 整次运行的汇总结果。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunReport {
    pub event: TriggerEvent,
    pub status: RunStatus,
    pub jobs: Vec<JobReport>,
    /// Best-effort reporting problems. They never affect `status`.
    /// 尽力而为的报告问题。它们从不影响 `status`。
    pub reporting_failures: Vec<String>,
    pub started_at: DateTime<Utc>,
    #[serde(with = "duration_secs")]
    pub duration: Duration,
}

impl RunReport {
    pub fn passed_count(&self) -> usize {
        self.jobs.iter().filter(|j| !j.is_failure()).count()
    }

    pub fn failed_jobs(&self) -> impl Iterator<Item = &JobReport> {
        self.jobs.iter().filter(|j| j.is_failure())
    }
}
