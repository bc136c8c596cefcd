//! # HTML Reporting Module / HTML 报告模块
//!
//! This module renders the run report as a self-contained HTML page with a
//! summary, one row per job and collapsible per-step logs.
//!
//! 此模块将运行报告渲染为独立的 HTML 页面，包含摘要、每个作业一行
//! 以及可折叠的单步骤日志。

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use maud::{DOCTYPE, Markup, PreEscaped, html};

use crate::core::models::{JobReport, JobStatus, RunReport, StepOutcome};
use crate::infra::t;
use crate::reporting::console::{job_status_str, step_status_str};

/// Embedded CSS styles for HTML reports / HTML 报告的嵌入式 CSS 样式
const HTML_STYLE: &str = include_str!("assets/report.css");

/// Embedded JavaScript for HTML report interactivity / HTML 报告交互性的嵌入式 JavaScript
const HTML_SCRIPT: &str = include_str!("assets/report.js");

/// Renders the report to an HTML string.
/// 将报告渲染为 HTML 字符串。
pub fn render_html_report(report: &RunReport, locale: &str) -> String {
    let failed = report.jobs.len() - report.passed_count();
    let markup = html! {
        (DOCTYPE)
        html {
            head {
                meta charset="utf-8";
                title { (t!("html_report.title", locale = locale)) }
                style { (PreEscaped(HTML_STYLE)) }
            }
            body {
                h1 { (t!("html_report.main_header", locale = locale)) }
                p.meta {
                    (t!("html_report.event", locale = locale)) ": " strong { (report.event.to_string()) }
                    " · "
                    (t!("html_report.started", locale = locale)) ": "
                    (report.started_at.format("%Y-%m-%d %H:%M:%S UTC").to_string())
                }
                div.summary-container {
                    (summary_item(report.jobs.len(), "", &t!("html_report.summary.total", locale = locale)))
                    (summary_item(report.passed_count(), "passed-text", &t!("html_report.summary.passed", locale = locale)))
                    (summary_item(failed, "failed-text", &t!("html_report.summary.failed", locale = locale)))
                }
                table {
                    thead {
                        tr {
                            th { (t!("html_report.table.header.job", locale = locale)) }
                            th.status-col { (t!("html_report.table.header.status", locale = locale)) }
                            th.duration-cell { (t!("html_report.table.header.duration", locale = locale)) }
                        }
                    }
                    tbody {
                        @for job in &report.jobs {
                            (job_rows(job, locale))
                        }
                    }
                }
                @if !report.reporting_failures.is_empty() {
                    h2 { (t!("report.reporting_failures", locale = locale)) }
                    ul.reporting-failures {
                        @for failure in &report.reporting_failures {
                            li { (failure) }
                        }
                    }
                }
                script { (PreEscaped(HTML_SCRIPT)) }
            }
        }
    };
    markup.into_string()
}

fn summary_item(count: usize, class: &str, label: &str) -> Markup {
    html! {
        div.summary-item {
            span class=(format!("count {}", class)) { (count) }
            span.label { (label) }
        }
    }
}

fn job_rows(job: &JobReport, locale: &str) -> Markup {
    let output_id = format!("output-{}", job.job.index);
    let status_class = match job.status {
        JobStatus::Passed => "status-Passed",
        JobStatus::Failed => "status-Failed",
    };
    html! {
        tr {
            td { (job.job.label()) }
            td.status-col {
                div class=(format!("status-cell {}", status_class)) { (job_status_str(job, locale)) }
                @if !job.steps.is_empty() {
                    div.output-toggle onclick=(format!("toggleOutput('{}')", output_id)) {
                        (t!("html_report.toggle_output", locale = locale))
                    }
                }
            }
            td.duration-cell { (format!("{:.2}s", job.duration.as_secs_f64())) }
        }
        tr id=(output_id) style="display:none;" {
            td colspan="3" {
                @if let Some(failure) = &job.failure {
                    p.failure-reason { (failure.kind()) ": " (failure.to_string()) }
                }
                @for step in &job.steps {
                    details open[step.outcome == StepOutcome::Failed] {
                        summary {
                            (step.name) " - " (step_status_str(step.outcome, locale))
                        }
                        @if !step.output.is_empty() {
                            pre.output-content { (step.output) }
                        }
                    }
                }
            }
        }
    }
}

/// Writes the HTML report to `output_path`.
/// 将 HTML 报告写入 `output_path`。
pub fn generate_html_report(report: &RunReport, output_path: &Path, locale: &str) -> Result<()> {
    fs::write(output_path, render_html_report(report, locale))
        .with_context(|| format!("Failed to write HTML report to {}", output_path.display()))
}
