//! # Step Runner Unit Tests / 步骤运行单元测试
//!
//! Step gating, ordering, failure handling and the per-job environment.
//!
//! 步骤条件控制、顺序、失败处理以及单作业环境。

mod common;

use std::collections::BTreeMap;
use std::path::PathBuf;

use ci_matrix::core::condition::Condition;
use ci_matrix::core::config::RuntimeConfig;
use ci_matrix::core::models::{JobInstance, StepOutcome};
use ci_matrix::core::steps::{JobContext, Step, StepLog, axis_env_name, job_environment, run_steps};
use ci_matrix::core::trigger::{Secret, TriggerContext, TriggerEvent};
use common::{Scripted, ScriptedExecutor};

fn context(platform: &str, version: &str) -> JobContext {
    JobContext {
        job: JobInstance::new(
            0,
            vec![
                ("platform".to_string(), platform.to_string()),
                ("python-version".to_string(), version.to_string()),
            ],
        ),
        workspace: std::env::temp_dir(),
        env: BTreeMap::new(),
    }
}

fn gated(ordinal: usize, name: &str, expr: &str) -> Step {
    Step::new(ordinal, name, "true").with_condition(Condition::parse(expr, name).unwrap())
}

fn outcomes(log: &StepLog) -> Vec<(String, StepOutcome)> {
    log.records
        .iter()
        .map(|r| (r.name.clone(), r.outcome))
        .collect()
}

#[tokio::test]
async fn test_false_condition_skips_without_invoking_the_action() {
    let steps = vec![
        Step::new(0, "Install", "true"),
        gated(1, "Linux extras", "platform contains ubuntu && python-version !starts-with alt-"),
        Step::new(2, "Test", "true"),
    ];
    let executor = ScriptedExecutor::new();
    let ctx = context("ubuntu-foo", "alt-9");
    let mut log = StepLog::default();

    run_steps(&steps, &ctx, &common::trigger(TriggerEvent::PullRequest), &executor, &mut log).await;

    assert_eq!(
        outcomes(&log),
        vec![
            ("Install".to_string(), StepOutcome::Passed),
            ("Linux extras".to_string(), StepOutcome::Skipped),
            ("Test".to_string(), StepOutcome::Passed),
        ]
    );
    assert_eq!(
        executor.calls(),
        vec!["(ubuntu-foo, alt-9)/Install", "(ubuntu-foo, alt-9)/Test"]
    );
}

#[tokio::test]
async fn test_true_condition_runs_the_step() {
    let steps = vec![gated(0, "Linux extras", "platform contains ubuntu && python-version !starts-with alt-")];
    let executor = ScriptedExecutor::new();
    let ctx = context("ubuntu-foo", "3.9");
    let mut log = StepLog::default();

    run_steps(&steps, &ctx, &common::trigger(TriggerEvent::PullRequest), &executor, &mut log).await;

    assert_eq!(log.records[0].outcome, StepOutcome::Passed);
    assert_eq!(executor.calls(), vec!["(ubuntu-foo, 3.9)/Linux extras"]);
}

#[tokio::test]
async fn test_push_only_step_is_skipped_on_pull_request() {
    let steps = vec![Step::new(0, "Test", "true"), gated(1, "Upload", "event == push")];
    let executor = ScriptedExecutor::new();
    let ctx = context("ubuntu-latest", "3.9");

    let mut pr_log = StepLog::default();
    run_steps(&steps, &ctx, &common::trigger(TriggerEvent::PullRequest), &executor, &mut pr_log).await;
    assert_eq!(pr_log.records[1].outcome, StepOutcome::Skipped);

    let mut push_log = StepLog::default();
    run_steps(&steps, &ctx, &common::trigger(TriggerEvent::Push), &executor, &mut push_log).await;
    assert_eq!(push_log.records[1].outcome, StepOutcome::Passed);
}

#[tokio::test]
async fn test_later_steps_still_run_after_a_failure() {
    let steps = vec![
        Step::new(0, "Install", "true"),
        Step::new(1, "Test", "true"),
        Step::new(2, "Cleanup", "true"),
    ];
    let executor = ScriptedExecutor::new().on("(ubuntu-latest, 3.9)", "Test", Scripted::Fail);
    let ctx = context("ubuntu-latest", "3.9");
    let mut log = StepLog::default();

    run_steps(&steps, &ctx, &common::trigger(TriggerEvent::Push), &executor, &mut log).await;

    assert_eq!(
        executor.calls(),
        vec![
            "(ubuntu-latest, 3.9)/Install",
            "(ubuntu-latest, 3.9)/Test",
            "(ubuntu-latest, 3.9)/Cleanup",
        ]
    );
    assert_eq!(log.records[1].outcome, StepOutcome::Failed);
    assert_eq!(log.records[1].exit_code, Some(1));
    assert_eq!(log.records[2].outcome, StepOutcome::Passed);
    assert!(log.in_flight.is_none());
}

#[tokio::test]
async fn test_condition_on_missing_axis_fails_the_step() {
    let steps = vec![gated(0, "Arch", "arch == x64")];
    let executor = ScriptedExecutor::new();
    let ctx = context("ubuntu-latest", "3.9");
    let mut log = StepLog::default();

    run_steps(&steps, &ctx, &common::trigger(TriggerEvent::Push), &executor, &mut log).await;

    assert_eq!(log.records[0].outcome, StepOutcome::Failed);
    assert!(log.records[0].output.contains("arch"));
    assert!(executor.calls().is_empty());
}

#[test]
fn test_axis_env_name() {
    assert_eq!(axis_env_name("python-version"), "MATRIX_PYTHON_VERSION");
    assert_eq!(axis_env_name("platform"), "MATRIX_PLATFORM");
}

#[test]
fn test_job_environment_contents() {
    let ctx = context("ubuntu-latest", "3.9");
    let trigger = TriggerContext::new(
        TriggerEvent::Push,
        Some("main".to_string()),
        Some(Secret::new("CODECOV_TOKEN", "t0k3n")),
    );
    let env = job_environment(&ctx.job, &trigger, None).unwrap();

    assert_eq!(env["MATRIX_PLATFORM"], "ubuntu-latest");
    assert_eq!(env["MATRIX_PYTHON_VERSION"], "3.9");
    assert_eq!(env["CI_EVENT"], "push");
    assert_eq!(env["CI_BRANCH"], "main");
    assert_eq!(env["CI_JOB"], "(ubuntu-latest, 3.9)");
    assert_eq!(env["CODECOV_TOKEN"], "t0k3n");
    assert!(!env.contains_key("PATH"));
}

#[test]
fn test_job_environment_without_secret_on_pull_request() {
    let ctx = context("ubuntu-latest", "3.9");
    let trigger = TriggerContext::new(
        TriggerEvent::PullRequest,
        None,
        Some(Secret::new("CODECOV_TOKEN", "t0k3n")),
    );
    let env = job_environment(&ctx.job, &trigger, None).unwrap();
    assert!(!env.contains_key("CODECOV_TOKEN"));
}

#[test]
fn test_runtime_directory_is_prepended_to_path() {
    let ctx = context("ubuntu-latest", "3.9");
    let runtime = RuntimeConfig {
        axis: "python-version".to_string(),
        paths: BTreeMap::from([("3.9".to_string(), PathBuf::from("/opt/python/3.9/bin"))]),
    };
    let env = job_environment(&ctx.job, &common::trigger(TriggerEvent::Push), Some(&runtime)).unwrap();
    assert!(env["PATH"].starts_with("/opt/python/3.9/bin"));
    assert_eq!(env["CI_RUNTIME_DIR"], "/opt/python/3.9/bin");

    let missing = context("ubuntu-latest", "3.12");
    let err = job_environment(&missing.job, &common::trigger(TriggerEvent::Push), Some(&runtime)).unwrap_err();
    assert!(err.contains("3.12"));
}
