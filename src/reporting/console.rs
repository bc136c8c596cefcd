//! # Console Reporting Module / 控制台报告模块
//!
//! This module prints the run summary and the logs of failed steps to the
//! console, colored and localized.
//!
//! 此模块将运行摘要和失败步骤的日志以彩色、本地化的形式打印到控制台。

use colored::*;

use crate::core::models::{JobReport, JobStatus, RunReport, RunStatus, StepOutcome};
use crate::core::error::JobFailure;
use crate::infra::t;

/// Localized status text for a job.
/// 作业状态的本地化文本。
pub fn job_status_str(job: &JobReport, locale: &str) -> String {
    match (&job.status, &job.failure) {
        (JobStatus::Passed, _) => t!("report.status_passed", locale = locale).to_string(),
        (JobStatus::Failed, Some(JobFailure::TimeoutFailure { .. })) => {
            t!("report.status_timeout", locale = locale).to_string()
        }
        (JobStatus::Failed, Some(JobFailure::Cancelled)) => {
            t!("report.status_cancelled", locale = locale).to_string()
        }
        (JobStatus::Failed, _) => t!("report.status_failed", locale = locale).to_string(),
    }
}

/// Localized status text for a step outcome.
pub fn step_status_str(outcome: StepOutcome, locale: &str) -> String {
    match outcome {
        StepOutcome::Passed => t!("report.status_passed", locale = locale).to_string(),
        StepOutcome::Failed => t!("report.status_failed", locale = locale).to_string(),
        StepOutcome::Skipped => t!("report.status_skipped", locale = locale).to_string(),
    }
}

/// Prints a formatted summary of the run to the console.
/// Displays one row per job with status, duration and the failed steps.
///
/// 在控制台打印格式化的运行摘要。每个作业一行，包含状态、持续时间和失败的步骤。
///
/// # Output Format / 输出格式
/// ```text
/// --- Matrix Summary ---
///   - Passed     | (ubuntu-latest, 3.9)                     |      1.23s
///   - Failed     | (windows-latest, 3.9)                    |      0.45s  Run tests
///   - Timed Out  | (macos-latest, pypy-3.9)                 |     60.00s  Run tests
/// ```
pub fn print_summary(report: &RunReport, locale: &str) {
    println!("\n{}", t!("report.summary_banner", locale = locale).bold());

    for job in &report.jobs {
        let status_str = job_status_str(job, locale);
        let status_colored = match job.status {
            JobStatus::Passed => status_str.green(),
            JobStatus::Failed => status_str.red(),
        };
        let failed: Vec<&str> = job.failed_steps().map(|s| s.name.as_str()).collect();

        println!(
            "  - {:<12} | {:<40} | {:>10}  {}",
            status_colored,
            job.job.label(),
            format!("{:.2}s", job.duration.as_secs_f64()),
            failed.join(", ").dimmed()
        );
    }

    println!(
        "\n{}",
        t!(
            "report.totals",
            locale = locale,
            passed = report.passed_count(),
            total = report.jobs.len()
        )
    );

    if !report.reporting_failures.is_empty() {
        println!("{}", t!("report.reporting_failures", locale = locale).yellow());
        for failure in &report.reporting_failures {
            println!("  - {}", failure.yellow());
        }
    }
}

/// Prints the logs of every failed job and step, so the exact
/// (job, step) combination and the reason are visible.
///
/// 打印每个失败作业和步骤的日志，以便看到确切的（作业，步骤）组合及原因。
pub fn print_failure_details(report: &RunReport, locale: &str) {
    let failed: Vec<&JobReport> = report.failed_jobs().collect();
    if failed.is_empty() {
        return;
    }

    println!("\n{}", t!("report.failure_banner", locale = locale).red().bold());
    println!("{}", "-".repeat(80));

    for (i, job) in failed.iter().enumerate() {
        let reason = job
            .failure
            .as_ref()
            .map(|f| format!("{} ({})", f.kind(), f))
            .unwrap_or_default();
        println!(
            "[{}/{}] {} {} {}",
            i + 1,
            failed.len(),
            t!("report.failure_header", locale = locale).red(),
            job.job.label().cyan(),
            reason
        );

        for step in job.failed_steps() {
            println!(
                "\n--- {} ---\n",
                t!("report.step_log", locale = locale, step = &step.name).yellow()
            );
            println!("{}", step.output.trim_end());
        }
        println!("\n{}", "-".repeat(80));
    }
}

/// Prints the final one-line verdict.
pub fn print_verdict(report: &RunReport, locale: &str) {
    match report.status {
        RunStatus::Success => {
            println!("\n{}", t!("report.run_success", locale = locale).green().bold())
        }
        RunStatus::Failure => {
            println!("\n{}", t!("report.run_failure", locale = locale).red().bold())
        }
    }
}
