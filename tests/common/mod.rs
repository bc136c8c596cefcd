// Shared test helpers for unit and integration tests
#![allow(dead_code)]

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use ci_matrix::core::aggregator::CoverageReporter;
use ci_matrix::core::config::{MatrixConfig, Workflow};
use ci_matrix::core::error::ReportingError;
use ci_matrix::core::models::{Axis, CoverageArtifact};
use ci_matrix::core::steps::{ActionExecutor, ActionOutcome, JobContext, Step};
use ci_matrix::core::trigger::{TriggerContext, TriggerEvent};
use tempfile::TempDir;

/// What the scripted executor does for a `(job label, step name)` pair.
#[derive(Debug, Clone, Copy)]
pub enum Scripted {
    Pass,
    Fail,
    Sleep(Duration),
}

/// An executor that never spawns processes. Unscripted steps pass.
/// Every call is recorded as `"<job label>/<step name>"`.
#[derive(Default)]
pub struct ScriptedExecutor {
    script: HashMap<(String, String), Scripted>,
    pub calls: Mutex<Vec<String>>,
}

impl ScriptedExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on(mut self, job_label: &str, step: &str, action: Scripted) -> Self {
        self.script
            .insert((job_label.to_string(), step.to_string()), action);
        self
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl ActionExecutor for ScriptedExecutor {
    async fn execute(&self, step: &Step, ctx: &JobContext) -> ActionOutcome {
        let label = ctx.job.label();
        self.calls
            .lock()
            .unwrap()
            .push(format!("{}/{}", label, step.name));
        let action = self
            .script
            .get(&(label, step.name.clone()))
            .copied()
            .unwrap_or(Scripted::Pass);
        match action {
            Scripted::Pass => ActionOutcome {
                success: true,
                exit_code: Some(0),
                output: format!("ran {}", step.name),
            },
            Scripted::Fail => ActionOutcome {
                success: false,
                exit_code: Some(1),
                output: format!("{} failed", step.name),
            },
            Scripted::Sleep(d) => {
                tokio::time::sleep(d).await;
                ActionOutcome {
                    success: true,
                    exit_code: Some(0),
                    output: String::new(),
                }
            }
        }
    }
}

/// Records every upload; optionally fails all of them.
#[derive(Default)]
pub struct RecordingReporter {
    pub uploads: Mutex<Vec<String>>,
    pub fail: bool,
}

#[async_trait]
impl CoverageReporter for RecordingReporter {
    async fn upload(
        &self,
        artifact: &CoverageArtifact,
        _trigger: &TriggerContext,
    ) -> Result<(), ReportingError> {
        self.uploads.lock().unwrap().push(artifact.job_slug.clone());
        if self.fail {
            Err(ReportingError::UploadFailed {
                status: "exit status: 1".to_string(),
                output: "service unavailable".to_string(),
            })
        } else {
            Ok(())
        }
    }
}

pub fn axes_ab_xy() -> Vec<Axis> {
    vec![Axis::new("first", ["A", "B"]), Axis::new("second", ["X", "Y"])]
}

pub fn trigger(event: TriggerEvent) -> TriggerContext {
    TriggerContext::new(event, Some("main".to_string()), None)
}

/// Parses and validates an inline TOML configuration.
pub fn workflow_from_toml(content: &str) -> Workflow {
    MatrixConfig::from_toml(content, &PathBuf::from("inline.toml"))
        .expect("test configuration should parse")
        .validate()
        .expect("test configuration should validate")
}

/// Writes `content` to `CiMatrix.toml` inside a fresh temporary directory.
pub fn write_config(content: &str) -> (TempDir, PathBuf) {
    let dir = tempfile::tempdir().expect("Failed to create temporary directory");
    let path = dir.path().join("CiMatrix.toml");
    std::fs::write(&path, content).expect("Failed to write config");
    (dir, path)
}

/// A two-by-two matrix whose steps are plain shell commands.
pub fn shell_matrix(steps: &str) -> String {
    format!(
        r#"
language = "en"
timeout_secs = 30
max_parallel = 2

[[axes]]
name = "platform"
values = ["ubuntu-latest", "macos-latest"]

[[axes]]
name = "python-version"
values = ["3.11", "pypy-3.9"]

{steps}
"#
    )
}
