//! # Run Command Module / 运行命令模块
//!
//! This module implements the `run` command, which expands the matrix,
//! executes every job and reports a single success or failure.
//!
//! 此模块实现 `run` 命令：展开矩阵、执行所有作业并报告唯一的成功或失败结果。

use anyhow::{Context, Result};
use chrono::Utc;
use colored::*;
use std::{path::PathBuf, sync::Arc, time::Instant};
use tokio::signal;
use tokio_util::sync::CancellationToken;

use crate::{
    core::{
        aggregator,
        config::{self, Workflow},
        matrix,
        models::{RunReport, RunStatus},
        scheduler::{self, SchedulerOptions},
        steps::CommandExecutor,
        trigger::{Secret, TriggerContext, TriggerEvent},
    },
    infra::t,
    reporting::{
        coverage::reporter_from_config, generate_html_report, print_failure_details,
        print_summary, print_verdict, write_json_report,
    },
};

/// Arguments of the `run` subcommand.
/// `run` 子命令的参数。
#[derive(Debug, Clone)]
pub struct RunArgs {
    pub config: PathBuf,
    pub event: TriggerEvent,
    pub branch: Option<String>,
    /// Overrides `max_parallel` from the configuration.
    pub jobs: Option<usize>,
    pub html: Option<PathBuf>,
    pub json: Option<PathBuf>,
    /// Language given with `--lang`; wins over the configuration's `language`.
    pub language: Option<String>,
}

/// Executes the run command.
///
/// # Returns
/// `Ok(())` when the run succeeded or was not triggered; an error for
/// configuration problems and for a run whose status is `failure`.
pub async fn execute(args: RunArgs) -> Result<()> {
    let workflow = config::load_workflow(&args.config).with_context(|| {
        t!("run.config_load_failed", path = args.config.display()).to_string()
    })?;
    let locale = args
        .language
        .clone()
        .unwrap_or_else(|| workflow.language.clone());
    rust_i18n::set_locale(&locale);

    println!(
        "{}",
        t!("run.loaded_config", path = args.config.display())
    );

    if !workflow.triggers.admits(args.event, args.branch.as_deref()) {
        println!(
            "{}",
            t!(
                "run.not_triggered",
                event = args.event,
                branch = args.branch.as_deref().unwrap_or("-")
            )
            .yellow()
        );
        return Ok(());
    }

    let jobs = matrix::expand(&workflow.axes)?;
    let trigger = build_trigger_context(&workflow, args.event, args.branch.clone());
    let options = SchedulerOptions::from_workflow(&workflow, args.jobs);

    println!(
        "{}",
        t!(
            "run.matrix_expanded",
            count = jobs.len(),
            axes = workflow.axes.len(),
            event = trigger.event
        )
        .cyan()
    );
    println!(
        "{}",
        t!(
            "run.scheduler_settings",
            parallel = options.max_parallel,
            timeout = options.timeout.as_secs(),
            fail_fast = options.fail_fast
        )
        .cyan()
    );
    if trigger.secrets_available() {
        println!("{}", t!("run.secrets_available").cyan());
    }

    let report = run_workflow(workflow, jobs, trigger, options).await;

    print_summary(&report, &locale);
    print_failure_details(&report, &locale);

    if let Some(path) = &args.html {
        println!("\n{}", t!("run.writing_html", path = path.display()));
        if let Err(e) = generate_html_report(&report, path, &locale) {
            eprintln!("{} {:#}", t!("run.report_write_failed").red(), e);
        }
    }
    if let Some(path) = &args.json {
        println!("{}", t!("run.writing_json", path = path.display()));
        if let Err(e) = write_json_report(&report, path) {
            eprintln!("{} {:#}", t!("run.report_write_failed").red(), e);
        }
    }

    print_verdict(&report, &locale);

    match report.status {
        RunStatus::Success => Ok(()),
        RunStatus::Failure => anyhow::bail!(t!("run.matrix_failed").to_string()),
    }
}

/// The secret named by `[coverage] token_env` is read once here and handed to
/// the trigger context, which keeps it only for push events.
fn build_trigger_context(
    workflow: &Workflow,
    event: TriggerEvent,
    branch: Option<String>,
) -> TriggerContext {
    let secret = workflow
        .coverage
        .as_ref()
        .and_then(|c| c.token_env.as_deref())
        .and_then(|name| std::env::var(name).ok().map(|value| Secret::new(name, value)));
    TriggerContext::new(event, branch, secret)
}

/// Schedules every job, then aggregates and forwards coverage.
async fn run_workflow(
    workflow: Workflow,
    jobs: Vec<crate::core::models::JobInstance>,
    trigger: TriggerContext,
    options: SchedulerOptions,
) -> RunReport {
    let started_at = Utc::now();
    let clock = Instant::now();
    let stop = setup_signal_handler();

    let reporter = workflow.coverage.as_ref().and_then(reporter_from_config);
    let workflow = Arc::new(workflow);
    let trigger = Arc::new(trigger);

    let reports = scheduler::run_matrix(
        jobs,
        Arc::clone(&workflow),
        Arc::clone(&trigger),
        Arc::new(CommandExecutor),
        options,
        stop,
    )
    .await;

    aggregator::aggregate(
        &trigger,
        reports,
        reporter.as_deref(),
        started_at,
        clock.elapsed(),
    )
    .await
}

/// Sets up a signal handler for graceful shutdown.
fn setup_signal_handler() -> CancellationToken {
    let token = CancellationToken::new();
    let token_clone = token.clone();

    tokio::spawn(async move {
        if signal::ctrl_c().await.is_ok() {
            println!("\n{}", t!("run.shutdown_signal").yellow());
            token_clone.cancel();
        }
    });

    token
}
