//! # Step Runner Module / 步骤运行模块
//!
//! Runs the ordered steps of one job. Each step is first checked against its
//! condition; a false condition records `Skipped` without side effects. A
//! failed step does not stop the job: later steps still run, and the job's
//! status is derived from all records at the end.
//!
//! 运行单个作业的有序步骤。每个步骤先根据其条件检查；条件为假时记录
//! `Skipped` 且没有副作用。失败的步骤不会终止作业：后续步骤仍会运行，
//! 作业状态在最后根据所有记录得出。

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Instant;

use async_trait::async_trait;
use colored::*;

use crate::core::condition::{Condition, evaluate};
use crate::core::config::RuntimeConfig;
use crate::core::models::{JobInstance, StepOutcome, StepRecord};
use crate::core::trigger::TriggerContext;
use crate::infra::{command, t};

/// A compiled step template, shared read-only by every job.
/// 已编译的步骤模板，由所有作业只读共享。
#[derive(Debug, Clone)]
pub struct Step {
    pub name: String,
    /// Position in the declared step list; steps run in this order.
    /// 在声明的步骤列表中的位置；步骤按此顺序运行。
    pub ordinal: usize,
    pub command: String,
    pub shell: bool,
    pub env: BTreeMap<String, String>,
    pub condition: Option<Condition>,
}

impl Step {
    /// A minimal unconditional step, mostly useful for tests and tooling.
    pub fn new(ordinal: usize, name: impl Into<String>, command: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ordinal,
            command: command.into(),
            shell: false,
            env: BTreeMap::new(),
            condition: None,
        }
    }

    pub fn with_condition(mut self, condition: Condition) -> Self {
        self.condition = Some(condition);
        self
    }
}

/// Everything a step action can see about the job it belongs to. Owned by
/// exactly one job.
/// 步骤动作能看到的其所属作业的全部信息。只属于一个作业。
#[derive(Debug, Clone)]
pub struct JobContext {
    pub job: JobInstance,
    pub workspace: PathBuf,
    pub env: BTreeMap<String, String>,
}

/// The exit signal of an executed action.
/// 已执行动作的退出信号。
#[derive(Debug, Clone)]
pub struct ActionOutcome {
    pub success: bool,
    pub exit_code: Option<i32>,
    pub output: String,
}

impl ActionOutcome {
    pub fn error(output: impl Into<String>) -> Self {
        Self {
            success: false,
            exit_code: None,
            output: output.into(),
        }
    }
}

/// Executes the action behind a step. Implementations are shared by all
/// concurrently running jobs and must not keep per-job state.
///
/// 执行步骤背后的动作。实现由所有并发运行的作业共享，不得保存单个作业的状态。
#[async_trait]
pub trait ActionExecutor: Send + Sync {
    async fn execute(&self, step: &Step, ctx: &JobContext) -> ActionOutcome;
}

/// Runs step commands as child processes inside the job workspace.
/// 在作业工作区中以子进程形式运行步骤命令。
#[derive(Debug, Default, Clone, Copy)]
pub struct CommandExecutor;

#[async_trait]
impl ActionExecutor for CommandExecutor {
    async fn execute(&self, step: &Step, ctx: &JobContext) -> ActionOutcome {
        let mut env = ctx.env.clone();
        for (key, value) in &step.env {
            match command::expand_vars(value, &ctx.env) {
                Ok(value) => env.insert(key.clone(), value),
                Err(e) => return ActionOutcome::error(format!("{e:#}")),
            };
        }

        let line = match command::expand_vars(&step.command, &env) {
            Ok(line) => line,
            Err(e) => return ActionOutcome::error(format!("{e:#}")),
        };
        let cmd = match command::build_command(&line, step.shell, &ctx.workspace, &env) {
            Ok(cmd) => cmd,
            Err(e) => return ActionOutcome::error(format!("{e:#}")),
        };

        let (status, output) = command::spawn_and_capture(cmd).await;
        let output = format!("{} {}\n{}", t!("run.command_prefix"), line, output);
        match status {
            Ok(status) => ActionOutcome {
                success: status.success(),
                exit_code: status.code(),
                output,
            },
            Err(e) => ActionOutcome::error(format!("{output}Failed to start process: {e}")),
        }
    }
}

/// Builds the private environment of one job.
///
/// Contains `MATRIX_<AXIS>` for every axis value, `CI_EVENT`, `CI_JOB`, the
/// secret when the trigger provides one, and `PATH` prefixed with the
/// provisioned runtime directory.
///
/// # Errors
/// Returns a description when the runtime axis value has no mapped directory.
pub fn job_environment(
    job: &JobInstance,
    trigger: &TriggerContext,
    runtime: Option<&RuntimeConfig>,
) -> Result<BTreeMap<String, String>, String> {
    let mut env = BTreeMap::new();
    for (axis, value) in job.values() {
        env.insert(axis_env_name(axis), value.clone());
    }
    env.insert("CI_EVENT".to_string(), trigger.event.to_string());
    env.insert("CI_JOB".to_string(), job.label());
    if let Some(branch) = &trigger.branch {
        env.insert("CI_BRANCH".to_string(), branch.clone());
    }
    if let Some(secret) = trigger.secret() {
        env.insert(secret.env_name.clone(), secret.expose().to_string());
    }

    if let Some(runtime) = runtime {
        let value = job.value(&runtime.axis).unwrap_or_default();
        let dir = runtime
            .paths
            .get(value)
            .ok_or_else(|| format!("no runtime directory configured for {} = {}", runtime.axis, value))?;
        let inherited = std::env::var_os("PATH").unwrap_or_default();
        let path = std::env::join_paths(
            std::iter::once(dir.clone()).chain(std::env::split_paths(&inherited)),
        )
        .map_err(|e| format!("cannot build PATH for runtime {}: {}", dir.display(), e))?;
        env.insert("PATH".to_string(), path.to_string_lossy().into_owned());
        env.insert("CI_RUNTIME_DIR".to_string(), dir.to_string_lossy().into_owned());
    }

    Ok(env)
}

/// `python-version` -> `MATRIX_PYTHON_VERSION`.
pub fn axis_env_name(axis: &str) -> String {
    let name: String = axis
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c.to_ascii_uppercase() } else { '_' })
        .collect();
    format!("MATRIX_{name}")
}

/// Progress of a job's step sequence. Kept outside the running future so the
/// records survive when the job is interrupted by a timeout or cancellation.
///
/// 作业步骤序列的进度。保存在运行中的 future 之外，
/// 以便作业因超时或取消被中断时记录仍然保留。
#[derive(Debug, Default)]
pub struct StepLog {
    pub records: Vec<StepRecord>,
    /// The step currently executing and when it started.
    pub in_flight: Option<(String, Instant)>,
}

/// Runs `steps` in order for the job in `ctx`, appending one record per step.
pub async fn run_steps(
    steps: &[Step],
    ctx: &JobContext,
    trigger: &TriggerContext,
    executor: &dyn ActionExecutor,
    log: &mut StepLog,
) {
    let label = ctx.job.label();

    for step in steps {
        if let Some(condition) = &step.condition {
            match evaluate(condition, &ctx.job, trigger) {
                Ok(true) => {}
                Ok(false) => {
                    tracing::debug!(job = %label, step = %step.name, %condition, "condition false, skipping");
                    println!(
                        "{}",
                        t!("run.step_skipped", job = &label, step = &step.name).dimmed()
                    );
                    log.records.push(StepRecord::skipped(&step.name));
                    continue;
                }
                Err(e) => {
                    log.records.push(StepRecord {
                        name: step.name.clone(),
                        outcome: StepOutcome::Failed,
                        output: e.to_string(),
                        duration: std::time::Duration::ZERO,
                        exit_code: None,
                    });
                    continue;
                }
            }
        }

        println!(
            "{}",
            t!("run.step_started", job = &label, step = &step.name).blue()
        );
        let started = Instant::now();
        log.in_flight = Some((step.name.clone(), started));

        let outcome = executor.execute(step, ctx).await;

        log.in_flight = None;
        let duration = started.elapsed();
        let secs = format!("{:.2}", duration.as_secs_f64());
        let record_outcome = if outcome.success {
            println!(
                "{}",
                t!("run.step_passed", job = &label, step = &step.name, duration = &secs).green()
            );
            StepOutcome::Passed
        } else {
            println!(
                "{}",
                t!("run.step_failed", job = &label, step = &step.name, duration = &secs).red()
            );
            StepOutcome::Failed
        };

        log.records.push(StepRecord {
            name: step.name.clone(),
            outcome: record_outcome,
            output: outcome.output,
            duration,
            exit_code: outcome.exit_code,
        });
    }
}
