//! # Trigger Module / 触发器模块
//!
//! Describes the event that started a run and which events the configuration
//! admits. The trigger context is built once per invocation and threaded
//! explicitly through condition evaluation and step execution.
//!
//! 描述启动运行的事件以及配置接受哪些事件。
//! 触发上下文在每次调用时构建一次，并显式传递给条件求值和步骤执行。

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Datelike, Days, Utc, Weekday};
use serde::{Deserialize, Serialize};

use crate::core::error::ConfigError;

/// The event classification that initiated the run.
/// 启动本次运行的事件分类。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TriggerEvent {
    Push,
    PullRequest,
    ManualDispatch,
    Scheduled,
}

impl TriggerEvent {
    pub fn as_str(&self) -> &'static str {
        match self {
            TriggerEvent::Push => "push",
            TriggerEvent::PullRequest => "pull-request",
            TriggerEvent::ManualDispatch => "manual-dispatch",
            TriggerEvent::Scheduled => "scheduled",
        }
    }
}

impl fmt::Display for TriggerEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TriggerEvent {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        // Accept the workflow-file spellings as well.
        match s.trim().to_ascii_lowercase().as_str() {
            "push" => Ok(TriggerEvent::Push),
            "pull-request" | "pull_request" => Ok(TriggerEvent::PullRequest),
            "manual-dispatch" | "workflow_dispatch" => Ok(TriggerEvent::ManualDispatch),
            "scheduled" | "schedule" => Ok(TriggerEvent::Scheduled),
            _ => Err(ConfigError::UnknownEvent(s.to_string())),
        }
    }
}

/// A secret credential. Its value never appears in `Debug` output or reports.
/// 秘密凭据。其值永远不会出现在 `Debug` 输出或报告中。
#[derive(Clone, PartialEq, Eq)]
pub struct Secret {
    /// Name of the environment variable the secret is exported as.
    pub env_name: String,
    value: String,
}

impl Secret {
    pub fn new(env_name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            env_name: env_name.into(),
            value: value.into(),
        }
    }

    pub fn expose(&self) -> &str {
        &self.value
    }
}

impl fmt::Debug for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Secret")
            .field("env_name", &self.env_name)
            .field("value", &"***")
            .finish()
    }
}

/// Immutable, per-invocation description of what triggered the run.
/// 本次运行触发信息的不可变描述，每次调用创建一次。
#[derive(Debug, Clone)]
pub struct TriggerContext {
    pub event: TriggerEvent,
    pub branch: Option<String>,
    secret: Option<Secret>,
}

impl TriggerContext {
    /// Builds the context. The candidate secret is only retained for push
    /// events; every other trigger runs without credentials.
    pub fn new(event: TriggerEvent, branch: Option<String>, secret: Option<Secret>) -> Self {
        let secret = if event == TriggerEvent::Push { secret } else { None };
        Self {
            event,
            branch,
            secret,
        }
    }

    pub fn secrets_available(&self) -> bool {
        self.secret.is_some()
    }

    pub fn secret(&self) -> Option<&Secret> {
        self.secret.as_ref()
    }
}

/// The `[triggers]` section: which events may start a run.
/// `[triggers]` 配置节：哪些事件可以启动运行。
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TriggerConfig {
    /// Branches that trigger a run on push. Empty means every branch.
    #[serde(default)]
    pub push_branches: Vec<String>,
    #[serde(default = "enabled")]
    pub pull_request: bool,
    #[serde(default = "enabled")]
    pub manual_dispatch: bool,
    /// Weekly cron expression, e.g. `"0 0 * * 0"` (minute hour * * weekday, UTC).
    #[serde(default)]
    pub schedule: Option<String>,
}

fn enabled() -> bool {
    true
}

impl Default for TriggerConfig {
    fn default() -> Self {
        Self {
            push_branches: vec![],
            pull_request: true,
            manual_dispatch: true,
            schedule: None,
        }
    }
}

impl TriggerConfig {
    /// Returns whether a run for `event` (on `branch`, for pushes) should start.
    pub fn admits(&self, event: TriggerEvent, branch: Option<&str>) -> bool {
        match event {
            TriggerEvent::Push => {
                self.push_branches.is_empty()
                    || branch.is_some_and(|b| self.push_branches.iter().any(|p| p == b))
            }
            TriggerEvent::PullRequest => self.pull_request,
            TriggerEvent::ManualDispatch => self.manual_dispatch,
            TriggerEvent::Scheduled => self.schedule.is_some(),
        }
    }

    pub fn weekly_schedule(&self) -> Result<Option<WeeklySchedule>, ConfigError> {
        self.schedule.as_deref().map(WeeklySchedule::parse).transpose()
    }
}

/// A weekly schedule at a fixed UTC time on a fixed weekday.
/// 每周固定星期、固定 UTC 时间的计划。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WeeklySchedule {
    pub minute: u32,
    pub hour: u32,
    pub weekday: Weekday,
}

impl WeeklySchedule {
    /// Parses a five-field cron expression whose minute, hour and weekday are
    /// fixed and whose day-of-month and month are `*`.
    pub fn parse(expr: &str) -> Result<Self, ConfigError> {
        let invalid = |reason: &str| ConfigError::InvalidSchedule {
            expr: expr.to_string(),
            reason: reason.to_string(),
        };

        let fields: Vec<&str> = expr.split_whitespace().collect();
        let [minute, hour, dom, month, dow] = fields.as_slice() else {
            return Err(invalid("expected five fields"));
        };
        if *dom != "*" || *month != "*" {
            return Err(invalid("day-of-month and month must be '*'"));
        }

        let minute: u32 = minute
            .parse()
            .ok()
            .filter(|m| *m < 60)
            .ok_or_else(|| invalid("minute must be 0-59"))?;
        let hour: u32 = hour
            .parse()
            .ok()
            .filter(|h| *h < 24)
            .ok_or_else(|| invalid("hour must be 0-23"))?;
        let weekday = parse_weekday(dow).ok_or_else(|| invalid("weekday must be 0-7 or sun-sat"))?;

        Ok(Self {
            minute,
            hour,
            weekday,
        })
    }

    /// The first scheduled instant strictly after `now`.
    pub fn next_after(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        let today = now.date_naive();
        (0..=7u64)
            .filter_map(|offset| today.checked_add_days(Days::new(offset)))
            .filter(|date| date.weekday() == self.weekday)
            .filter_map(|date| date.and_hms_opt(self.hour, self.minute, 0))
            .map(|naive| naive.and_utc())
            .find(|candidate| *candidate > now)
            // Eight consecutive days always contain a later match.
            .unwrap_or(now)
    }
}

fn parse_weekday(field: &str) -> Option<Weekday> {
    match field.to_ascii_lowercase().as_str() {
        "0" | "7" | "sun" => Some(Weekday::Sun),
        "1" | "mon" => Some(Weekday::Mon),
        "2" | "tue" => Some(Weekday::Tue),
        "3" | "wed" => Some(Weekday::Wed),
        "4" | "thu" => Some(Weekday::Thu),
        "5" | "fri" => Some(Weekday::Fri),
        "6" | "sat" => Some(Weekday::Sat),
        _ => None,
    }
}
