//! # Job Scheduler Module / 作业调度模块
//!
//! Dispatches every job instance as an independent task with a bounded level
//! of concurrency. Each job owns its workspace, environment and cancellation
//! token; the only thing jobs share is the read-only workflow.
//!
//! 以有界并发度将每个作业实例作为独立任务分派。每个作业拥有自己的工作区、
//! 环境和取消令牌；作业之间唯一共享的是只读的工作流配置。
//!
//! ## Cancellation / 取消
//!
//! ```text
//! stop token (Ctrl-C)
//!   └── run token   (cancelled by fail-fast when enabled)
//!         ├── job 0 token
//!         ├── job 1 token
//!         └── ...
//! ```
//!
//! The per-job timeout is enforced around the job's own future only.

use std::sync::Arc;
use std::time::{Duration, Instant};

use colored::*;
use futures::{StreamExt, stream};
use tokio_util::sync::CancellationToken;

use crate::core::config::Workflow;
use crate::core::error::{JobFailure, ReportingError};
use crate::core::models::{CoverageArtifact, JobInstance, JobReport, StepOutcome, StepRecord};
use crate::core::steps::{ActionExecutor, JobContext, StepLog, job_environment, run_steps};
use crate::core::trigger::{TriggerContext, TriggerEvent};
use crate::infra::{fs, t};

/// How the scheduler runs a batch of jobs.
/// 调度器运行一批作业的方式。
#[derive(Debug, Clone, Copy)]
pub struct SchedulerOptions {
    /// Maximum number of jobs running at the same time.
    pub max_parallel: usize,
    /// Cancel every other job once one fails.
    pub fail_fast: bool,
    /// Ceiling for a single job.
    pub timeout: Duration,
}

impl SchedulerOptions {
    /// Options taken from the workflow, with an optional `-j` override.
    pub fn from_workflow(workflow: &Workflow, jobs_override: Option<usize>) -> Self {
        let max_parallel = jobs_override
            .or(workflow.max_parallel)
            .unwrap_or(num_cpus::get() / 2 + 1)
            .max(1);
        Self {
            max_parallel,
            fail_fast: workflow.fail_fast,
            timeout: workflow.timeout,
        }
    }
}

/// Runs every job and returns their reports ordered by job index.
///
/// Jobs complete in any order. With `fail_fast` off a failing job never
/// influences another; with it on, the first failure cancels the rest.
/// Cancelling `stop` aborts every in-flight and pending job.
pub async fn run_matrix(
    jobs: Vec<JobInstance>,
    workflow: Arc<Workflow>,
    trigger: Arc<TriggerContext>,
    executor: Arc<dyn ActionExecutor>,
    options: SchedulerOptions,
    stop: CancellationToken,
) -> Vec<JobReport> {
    let run_token = stop.child_token();

    let mut reports: Vec<JobReport> = stream::iter(jobs.into_iter().map(|job| {
        let workflow = Arc::clone(&workflow);
        let trigger = Arc::clone(&trigger);
        let executor = Arc::clone(&executor);
        let run_token = run_token.clone();
        let job_for_error = job.clone();

        async move {
            let handle = tokio::spawn(async move {
                if run_token.is_cancelled() {
                    return JobReport::with_failure(job, vec![], Duration::ZERO, Some(JobFailure::Cancelled));
                }
                let report = run_job(
                    job,
                    &workflow,
                    &trigger,
                    executor.as_ref(),
                    options.timeout,
                    run_token.child_token(),
                )
                .await;
                if options.fail_fast && report.is_failure() {
                    tracing::debug!(job = %report.job, "fail-fast: cancelling remaining jobs");
                    run_token.cancel();
                }
                report
            });

            match handle.await {
                Ok(report) => report,
                Err(e) => JobReport::with_failure(
                    job_for_error,
                    vec![],
                    Duration::ZERO,
                    Some(JobFailure::SetupFailure {
                        reason: format!("job task did not complete: {e}"),
                    }),
                ),
            }
        }
    }))
    .buffer_unordered(options.max_parallel.max(1))
    .collect()
    .await;

    reports.sort_by_key(|r| r.job.index);
    reports
}

enum Interruption {
    Cancelled,
    TimedOut,
}

/// Runs a single job to completion, timeout or cancellation.
///
/// On interruption, steps already finished are kept, the in-flight step is
/// recorded as failed and later steps are never started.
///
/// 运行单个作业直到完成、超时或被取消。
pub async fn run_job(
    job: JobInstance,
    workflow: &Workflow,
    trigger: &TriggerContext,
    executor: &dyn ActionExecutor,
    timeout: Duration,
    cancel: CancellationToken,
) -> JobReport {
    let label = job.label();
    let started = Instant::now();
    println!("{}", t!("run.job_started", job = &label).bold());
    tracing::debug!(job = %label, index = job.index, "job dispatched");

    let mut log = StepLog::default();
    let result = tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(Interruption::Cancelled),
        r = tokio::time::timeout(timeout, execute_job(&job, workflow, trigger, executor, &mut log)) => {
            r.map_err(|_| Interruption::TimedOut)
        }
    };

    let duration = started.elapsed();
    let mut steps = log.records;
    let interrupted_step = log.in_flight.map(|(name, step_started)| {
        let reason = match &result {
            Err(Interruption::TimedOut) => t!("run.step_timed_out").to_string(),
            _ => t!("run.step_cancelled").to_string(),
        };
        steps.push(StepRecord {
            name: name.clone(),
            outcome: StepOutcome::Failed,
            output: reason,
            duration: step_started.elapsed(),
            exit_code: None,
        });
        name
    });

    let report = match result {
        Ok(Ok(coverage)) => {
            let mut report = JobReport::from_steps(job, steps, duration);
            match coverage {
                Some(Ok(artifact)) => report.coverage = Some(artifact),
                Some(Err(e)) => report.coverage_error = Some(e.to_string()),
                None => {}
            }
            report
        }
        Ok(Err(failure)) => JobReport::with_failure(job, steps, duration, Some(failure)),
        Err(Interruption::TimedOut) => {
            println!(
                "{}",
                t!(
                    "run.job_timeout",
                    job = &label,
                    timeout = format!("{:.2}", timeout.as_secs_f64())
                )
                .red()
            );
            JobReport::with_failure(
                job,
                steps,
                duration,
                Some(JobFailure::TimeoutFailure {
                    after: timeout,
                    step: interrupted_step,
                }),
            )
        }
        Err(Interruption::Cancelled) => {
            println!("{}", t!("run.job_cancelled", job = &label).yellow());
            JobReport::with_failure(job, steps, duration, Some(JobFailure::Cancelled))
        }
    };

    let secs = format!("{:.2}", duration.as_secs_f64());
    if report.is_failure() {
        println!("{}", t!("run.job_failed", job = &label, duration = &secs).red().bold());
    } else {
        println!("{}", t!("run.job_passed", job = &label, duration = &secs).green().bold());
    }
    report
}

type CollectedCoverage = Option<Result<CoverageArtifact, ReportingError>>;

/// Prepares the workspace and environment, runs the steps and, on push,
/// collects the coverage artifact before the workspace is deleted.
async fn execute_job(
    job: &JobInstance,
    workflow: &Workflow,
    trigger: &TriggerContext,
    executor: &dyn ActionExecutor,
    log: &mut StepLog,
) -> Result<CollectedCoverage, JobFailure> {
    let setup_failure = |reason: String| JobFailure::SetupFailure { reason };

    let workspace = fs::prepare_workspace(&job.slug(), workflow.checkout.as_ref())
        .await
        .map_err(|e| setup_failure(format!("{e:#}")))?;
    let env = job_environment(job, trigger, workflow.runtime.as_ref()).map_err(setup_failure)?;

    let ctx = JobContext {
        job: job.clone(),
        workspace: workspace.path().to_path_buf(),
        env,
    };
    run_steps(&workflow.steps, &ctx, trigger, executor, log).await;

    let coverage = match (&workflow.coverage, trigger.event) {
        (Some(coverage), TriggerEvent::Push) => {
            let path = workspace.path().join(&coverage.artifact);
            Some(collect_artifact(job, &path).await)
        }
        _ => None,
    };
    Ok(coverage)
}

async fn collect_artifact(
    job: &JobInstance,
    path: &std::path::Path,
) -> Result<CoverageArtifact, ReportingError> {
    let contents = match tokio::fs::read(path).await {
        Ok(contents) => contents,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(ReportingError::MissingArtifact {
                path: path.to_path_buf(),
            });
        }
        Err(e) => return Err(e.into()),
    };
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "coverage".to_string());
    Ok(CoverageArtifact {
        job_slug: job.slug(),
        file_name,
        contents,
    })
}
