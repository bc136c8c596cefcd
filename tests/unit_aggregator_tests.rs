//! # Aggregator Unit Tests / 汇总器单元测试
//!
//! Run status reduction and the push-only, best-effort coverage forwarding.
//!
//! 运行状态归约以及仅在 push 时进行的尽力而为的覆盖率转发。

mod common;

use std::time::Duration;

use chrono::Utc;
use ci_matrix::core::aggregator::{aggregate, overall_status};
use ci_matrix::core::error::JobFailure;
use ci_matrix::core::matrix::expand;
use ci_matrix::core::models::{CoverageArtifact, JobReport, RunStatus, StepOutcome, StepRecord};
use ci_matrix::core::trigger::TriggerEvent;
use common::RecordingReporter;

fn passed_step(name: &str) -> StepRecord {
    StepRecord {
        name: name.to_string(),
        outcome: StepOutcome::Passed,
        output: String::new(),
        duration: Duration::from_millis(5),
        exit_code: Some(0),
    }
}

/// Four passing jobs, each carrying a coverage artifact.
fn passing_reports() -> Vec<JobReport> {
    expand(&common::axes_ab_xy())
        .unwrap()
        .into_iter()
        .map(|job| {
            let slug = job.slug();
            let mut report = JobReport::from_steps(job, vec![passed_step("Test")], Duration::from_secs(1));
            report.coverage = Some(CoverageArtifact {
                job_slug: slug,
                file_name: "coverage.xml".to_string(),
                contents: b"<coverage/>".to_vec(),
            });
            report
        })
        .collect()
}

#[test]
fn test_status_is_success_only_when_every_job_passed() {
    let mut reports = passing_reports();
    assert_eq!(overall_status(&reports), RunStatus::Success);

    let job = reports[2].job.clone();
    reports[2] = JobReport::with_failure(job, vec![], Duration::ZERO, Some(JobFailure::Cancelled));
    assert_eq!(overall_status(&reports), RunStatus::Failure);
}

#[test]
fn test_skipped_steps_do_not_fail_a_job() {
    let job = expand(&common::axes_ab_xy()).unwrap().remove(0);
    let report = JobReport::from_steps(
        job,
        vec![passed_step("Test"), StepRecord::skipped("Upload")],
        Duration::from_secs(1),
    );
    assert!(!report.is_failure());
    assert!(report.failure.is_none());
}

#[tokio::test]
async fn test_reporter_is_invoked_on_push() {
    let reporter = RecordingReporter::default();
    let report = aggregate(
        &common::trigger(TriggerEvent::Push),
        passing_reports(),
        Some(&reporter),
        Utc::now(),
        Duration::from_secs(4),
    )
    .await;

    assert_eq!(report.status, RunStatus::Success);
    let mut uploads = reporter.uploads.lock().unwrap().clone();
    uploads.sort();
    assert_eq!(uploads, vec!["A_X", "A_Y", "B_X", "B_Y"]);
    assert!(report.reporting_failures.is_empty());
}

#[tokio::test]
async fn test_reporter_is_never_invoked_for_other_events() {
    for event in [
        TriggerEvent::PullRequest,
        TriggerEvent::ManualDispatch,
        TriggerEvent::Scheduled,
    ] {
        let reporter = RecordingReporter::default();
        let report = aggregate(
            &common::trigger(event),
            passing_reports(),
            Some(&reporter),
            Utc::now(),
            Duration::from_secs(4),
        )
        .await;

        assert_eq!(report.event, event);
        assert!(reporter.uploads.lock().unwrap().is_empty(), "{event} uploaded coverage");
    }
}

#[tokio::test]
async fn test_upload_failure_does_not_change_status() {
    let reporter = RecordingReporter {
        fail: true,
        ..Default::default()
    };
    let report = aggregate(
        &common::trigger(TriggerEvent::Push),
        passing_reports(),
        Some(&reporter),
        Utc::now(),
        Duration::from_secs(4),
    )
    .await;

    assert_eq!(report.status, RunStatus::Success);
    assert_eq!(report.reporting_failures.len(), 4);
    assert!(report.reporting_failures[0].contains("service unavailable"));
}

#[tokio::test]
async fn test_missing_artifact_is_a_reporting_failure() {
    let mut reports = passing_reports();
    reports[1].coverage = None;
    reports[1].coverage_error = Some("coverage artifact 'coverage.xml' was not produced".to_string());

    let reporter = RecordingReporter::default();
    let report = aggregate(
        &common::trigger(TriggerEvent::Push),
        reports,
        Some(&reporter),
        Utc::now(),
        Duration::from_secs(4),
    )
    .await;

    assert_eq!(report.status, RunStatus::Success);
    assert_eq!(report.reporting_failures.len(), 1);
    assert!(report.reporting_failures[0].starts_with("(A, Y)"));
    assert_eq!(reporter.uploads.lock().unwrap().len(), 3);
}

#[tokio::test]
async fn test_failed_run_still_forwards_coverage() {
    let mut reports = passing_reports();
    let job = reports[0].job.clone();
    let coverage = reports[0].coverage.take();
    reports[0] = JobReport::with_failure(
        job,
        vec![],
        Duration::ZERO,
        Some(JobFailure::StepFailure {
            steps: vec!["Test".to_string()],
        }),
    );
    reports[0].coverage = coverage;

    let reporter = RecordingReporter::default();
    let report = aggregate(
        &common::trigger(TriggerEvent::Push),
        reports,
        Some(&reporter),
        Utc::now(),
        Duration::from_secs(4),
    )
    .await;

    assert_eq!(report.status, RunStatus::Failure);
    assert_eq!(report.passed_count(), 3);
    assert_eq!(report.failed_jobs().count(), 1);
    assert_eq!(reporter.uploads.lock().unwrap().len(), 4);
}

#[test]
fn test_run_report_serializes_without_artifact_bytes() {
    let report = ci_matrix::RunReport {
        event: TriggerEvent::Push,
        status: RunStatus::Success,
        jobs: passing_reports(),
        reporting_failures: vec![],
        started_at: Utc::now(),
        duration: Duration::from_millis(1500),
    };
    let json = serde_json::to_value(&report).unwrap();
    assert_eq!(json["event"], "push");
    assert_eq!(json["status"], "success");
    assert_eq!(json["duration"], 1.5);
    assert!(json["jobs"][0].get("coverage").is_none());
}
