//! # Error Taxonomy / 错误分类
//!
//! Configuration errors abort a run before any job is scheduled. Everything
//! else (step failures, timeouts, reporting problems) stays local to a job
//! and is surfaced only through the aggregated run report.
//!
//! 配置错误会在调度任何作业之前中止运行。其他所有错误
//! （步骤失败、超时、报告问题）都局限于单个作业，仅通过汇总的运行报告呈现。

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors detected while loading and validating a matrix configuration.
/// 加载和校验矩阵配置时检测到的错误。
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("axis '{axis}' has no values; the matrix would be empty")]
    EmptyAxis { axis: String },

    #[error("the matrix declares no axes")]
    NoAxes,

    #[error("axis '{axis}' is declared more than once")]
    DuplicateAxis { axis: String },

    #[error("axes '{other}' and '{axis}' would both be exported as {env}")]
    AxisEnvCollision {
        axis: String,
        other: String,
        env: String,
    },

    #[error("axis '{axis}' lists value '{value}' more than once")]
    DuplicateValue { axis: String, value: String },

    #[error("'{axis}' is a reserved name and cannot be used as an axis")]
    ReservedAxis { axis: String },

    #[error("{context}: unknown axis '{axis}'")]
    UnknownAxis { context: String, axis: String },

    #[error("{context}: unrecognized predicate '{predicate}'")]
    UnknownPredicate { context: String, predicate: String },

    #[error("{context}: malformed condition '{expr}': {reason}")]
    MalformedCondition {
        context: String,
        expr: String,
        reason: String,
    },

    #[error("unknown trigger event '{0}' (expected push, pull-request, manual-dispatch or scheduled)")]
    UnknownEvent(String),

    #[error("invalid schedule '{expr}': {reason}")]
    InvalidSchedule { expr: String, reason: String },

    #[error("timeout_secs must be greater than zero")]
    InvalidTimeout,

    #[error("the configuration defines no steps")]
    NoSteps,

    #[error("failed to read configuration file {path}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse configuration file {path}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

/// Why a job ended up `Failed`.
/// 作业最终状态为 `Failed` 的原因。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum JobFailure {
    /// One or more executed steps reported failure.
    /// 一个或多个已执行的步骤报告失败。
    StepFailure { steps: Vec<String> },
    /// The job exceeded the global per-job timeout.
    /// 作业超出了全局的单作业超时时间。
    TimeoutFailure {
        #[serde(with = "duration_secs")]
        after: Duration,
        step: Option<String>,
    },
    /// The job was cancelled by fail-fast or a global abort before finishing.
    /// 作业在完成之前被 fail-fast 或全局中止取消。
    Cancelled,
    /// Workspace checkout or runtime provisioning failed; no step was run.
    /// 工作区检出或运行时准备失败；未运行任何步骤。
    SetupFailure { reason: String },
}

impl JobFailure {
    /// Short machine-friendly label used by reports.
    pub fn kind(&self) -> &'static str {
        match self {
            JobFailure::StepFailure { .. } => "StepFailure",
            JobFailure::TimeoutFailure { .. } => "TimeoutFailure",
            JobFailure::Cancelled => "Cancelled",
            JobFailure::SetupFailure { .. } => "SetupFailure",
        }
    }
}

impl std::fmt::Display for JobFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            JobFailure::StepFailure { steps } => {
                write!(f, "failed steps: {}", steps.join(", "))
            }
            JobFailure::TimeoutFailure { after, step } => match step {
                Some(step) => write!(f, "timed out after {:?} during '{}'", after, step),
                None => write!(f, "timed out after {:?}", after),
            },
            JobFailure::Cancelled => write!(f, "cancelled"),
            JobFailure::SetupFailure { reason } => write!(f, "setup failed: {}", reason),
        }
    }
}

/// Failures of the best-effort coverage forwarding side effect.
/// 尽力而为的覆盖率转发副作用的失败。
#[derive(Debug, Error)]
pub enum ReportingError {
    #[error("coverage artifact '{path}' was not produced")]
    MissingArtifact { path: PathBuf },

    #[error("i/o error while forwarding coverage: {0}")]
    Io(#[from] std::io::Error),

    #[error("coverage upload command is empty or cannot be parsed")]
    InvalidCommand,

    #[error("coverage upload command exited with {status}: {output}")]
    UploadFailed { status: String, output: String },
}

pub(crate) mod duration_secs {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_f64(d.as_secs_f64())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        let secs = f64::deserialize(d)?;
        Ok(Duration::from_secs_f64(secs.max(0.0)))
    }
}
