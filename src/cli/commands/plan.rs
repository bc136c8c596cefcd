//! # Plan Command Module / 计划命令模块
//!
//! Dry run: expands the matrix and shows, per job, which steps would run or
//! be skipped under the given trigger, without executing anything.
//!
//! 试运行：展开矩阵，并针对每个作业显示在给定触发下哪些步骤会运行、
//! 哪些会被跳过，而不执行任何内容。

use anyhow::{Context, Result};
use chrono::Utc;
use colored::*;
use std::path::Path;

use crate::core::{
    condition::evaluate,
    config::{self, Workflow},
    matrix,
    models::JobInstance,
    trigger::{TriggerContext, TriggerEvent},
};
use crate::infra::t;

/// A step as it would be treated for one job.
/// 某个步骤在某个作业中将被如何处理。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannedStep {
    pub name: String,
    pub runs: bool,
}

/// Decides, for every job, which steps would run under `trigger`.
/// Secrets play no part in gating, so the context built here carries none.
pub fn plan_jobs(
    workflow: &Workflow,
    trigger: &TriggerContext,
) -> Result<Vec<(JobInstance, Vec<PlannedStep>)>> {
    let jobs = matrix::expand(&workflow.axes)?;
    jobs.into_iter()
        .map(|job| {
            let steps = workflow
                .steps
                .iter()
                .map(|step| {
                    let runs = match &step.condition {
                        Some(condition) => evaluate(condition, &job, trigger)?,
                        None => true,
                    };
                    Ok(PlannedStep {
                        name: step.name.clone(),
                        runs,
                    })
                })
                .collect::<Result<Vec<_>>>()?;
            Ok((job, steps))
        })
        .collect()
}

/// Executes the plan command.
pub fn execute(
    config_path: &Path,
    event: TriggerEvent,
    branch: Option<String>,
    language: Option<String>,
) -> Result<()> {
    let workflow = config::load_workflow(config_path).with_context(|| {
        t!("run.config_load_failed", path = config_path.display()).to_string()
    })?;
    let locale = language.unwrap_or_else(|| workflow.language.clone());
    rust_i18n::set_locale(&locale);

    let admitted = workflow.triggers.admits(event, branch.as_deref());
    let trigger = TriggerContext::new(event, branch, None);
    let planned = plan_jobs(&workflow, &trigger)?;

    println!(
        "{}",
        t!(
            "plan.header",
            count = planned.len(),
            event = event,
            timeout = workflow.timeout.as_secs(),
            fail_fast = workflow.fail_fast
        )
        .bold()
    );
    if !admitted {
        println!("{}", t!("plan.not_admitted", event = event).yellow());
    }

    for (job, steps) in &planned {
        println!("\n{}", job.label().cyan());
        for step in steps {
            if step.runs {
                println!("  {} {}", "▶".green(), step.name);
            } else {
                println!(
                    "  {} {}",
                    "-".dimmed(),
                    t!("plan.step_skipped", step = &step.name).dimmed()
                );
            }
        }
    }

    if let Some(schedule) = workflow.triggers.weekly_schedule()? {
        let next = schedule.next_after(Utc::now());
        println!(
            "\n{}",
            t!("plan.next_scheduled", time = next.format("%Y-%m-%d %H:%M UTC"))
        );
    }

    Ok(())
}
