//! # Trigger Unit Tests / 触发器单元测试
//!
//! Event parsing, trigger admission, secret handling and the weekly schedule.
//!
//! 事件解析、触发准入、密钥处理以及每周计划。

use chrono::{TimeZone, Utc, Weekday};
use ci_matrix::core::trigger::{Secret, TriggerConfig, TriggerContext, TriggerEvent, WeeklySchedule};

#[test]
fn test_event_parsing_and_display() {
    for (text, event) in [
        ("push", TriggerEvent::Push),
        ("pull-request", TriggerEvent::PullRequest),
        ("pull_request", TriggerEvent::PullRequest),
        ("manual-dispatch", TriggerEvent::ManualDispatch),
        ("workflow_dispatch", TriggerEvent::ManualDispatch),
        ("scheduled", TriggerEvent::Scheduled),
        ("schedule", TriggerEvent::Scheduled),
    ] {
        assert_eq!(text.parse::<TriggerEvent>().unwrap(), event);
    }
    assert_eq!(TriggerEvent::PullRequest.to_string(), "pull-request");
    assert!("release".parse::<TriggerEvent>().is_err());
}

#[test]
fn test_secret_is_only_kept_for_push() {
    let secret = || Some(Secret::new("CODECOV_TOKEN", "s3cr3t"));

    let push = TriggerContext::new(TriggerEvent::Push, None, secret());
    assert!(push.secrets_available());
    assert_eq!(push.secret().map(Secret::expose), Some("s3cr3t"));

    for event in [
        TriggerEvent::PullRequest,
        TriggerEvent::ManualDispatch,
        TriggerEvent::Scheduled,
    ] {
        let ctx = TriggerContext::new(event, None, secret());
        assert!(!ctx.secrets_available(), "{event} must not carry secrets");
    }
}

#[test]
fn test_secret_debug_is_redacted() {
    let ctx = TriggerContext::new(
        TriggerEvent::Push,
        None,
        Some(Secret::new("CODECOV_TOKEN", "s3cr3t")),
    );
    let debug = format!("{:?}", ctx);
    assert!(debug.contains("CODECOV_TOKEN"));
    assert!(!debug.contains("s3cr3t"));
}

#[test]
fn test_admission() {
    let config = TriggerConfig {
        push_branches: vec!["main".to_string()],
        pull_request: true,
        manual_dispatch: false,
        schedule: None,
    };
    assert!(config.admits(TriggerEvent::Push, Some("main")));
    assert!(!config.admits(TriggerEvent::Push, Some("feature")));
    assert!(!config.admits(TriggerEvent::Push, None));
    assert!(config.admits(TriggerEvent::PullRequest, None));
    assert!(!config.admits(TriggerEvent::ManualDispatch, None));
    assert!(!config.admits(TriggerEvent::Scheduled, None));

    let open = TriggerConfig::default();
    assert!(open.admits(TriggerEvent::Push, Some("anything")));
    assert!(open.admits(TriggerEvent::Push, None));
}

#[test]
fn test_weekly_schedule_parsing() {
    let schedule = WeeklySchedule::parse("0 0 * * 0").unwrap();
    assert_eq!(schedule.weekday, Weekday::Sun);
    assert_eq!((schedule.hour, schedule.minute), (0, 0));

    assert_eq!(WeeklySchedule::parse("15 6 * * fri").unwrap().weekday, Weekday::Fri);

    for bad in ["0 0 * *", "60 0 * * 0", "0 24 * * 0", "0 0 1 * 0", "0 0 * * 8"] {
        assert!(WeeklySchedule::parse(bad).is_err(), "{bad} should be rejected");
    }
}

#[test]
fn test_next_scheduled_run() {
    let schedule = WeeklySchedule::parse("0 0 * * 0").unwrap();

    // Wednesday 2024-05-15 -> Sunday 2024-05-19 00:00.
    let wednesday = Utc.with_ymd_and_hms(2024, 5, 15, 10, 30, 0).unwrap();
    assert_eq!(
        schedule.next_after(wednesday),
        Utc.with_ymd_and_hms(2024, 5, 19, 0, 0, 0).unwrap()
    );

    // Exactly at the scheduled instant, the next one is a week later.
    let sunday = Utc.with_ymd_and_hms(2024, 5, 19, 0, 0, 0).unwrap();
    assert_eq!(
        schedule.next_after(sunday),
        Utc.with_ymd_and_hms(2024, 5, 26, 0, 0, 0).unwrap()
    );
}
