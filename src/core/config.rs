//! # Configuration Module / 配置模块
//!
//! Parses the TOML matrix file and validates it into a `Workflow`: axes,
//! compiled steps with parsed conditions, and the job-level settings. All
//! validation happens here, before any job is scheduled.
//!
//! 解析 TOML 矩阵文件并将其校验为 `Workflow`：轴、带已解析条件的步骤
//! 以及作业级设置。所有校验都在此处完成，早于任何作业的调度。

use std::collections::{BTreeMap, HashMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::core::condition::{Condition, EVENT_OPERAND};
use crate::core::error::ConfigError;
use crate::core::models::Axis;
use crate::core::steps::{Step, axis_env_name};
use crate::core::trigger::TriggerConfig;

/// Default per-job timeout when the file does not set one: six hours.
pub const DEFAULT_TIMEOUT_SECS: u64 = 6 * 60 * 60;

/// A single step as written in the configuration file.
/// 配置文件中书写的单个步骤。
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StepConfig {
    /// The step name, shown in logs and reports.
    /// 步骤名称，显示在日志和报告中。
    pub name: String,
    /// The command line to run.
    /// 要运行的命令行。
    pub run: String,
    /// Optional condition expression, e.g. `"event == push"`.
    /// 可选的条件表达式，例如 `"event == push"`。
    #[serde(default, rename = "if", skip_serializing_if = "Option::is_none")]
    pub condition: Option<String>,
    /// Run through the platform shell instead of splitting into words.
    /// 通过平台 shell 运行，而不是拆分为单词。
    #[serde(default)]
    pub shell: bool,
    /// Extra environment variables for this step only.
    /// 仅用于此步骤的额外环境变量。
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub env: BTreeMap<String, String>,
}

/// `[checkout]`: how each job's private workspace is materialized.
/// `[checkout]`：如何为每个作业生成私有工作区。
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct CheckoutConfig {
    /// A local directory copied into every job workspace.
    #[serde(default)]
    pub path: Option<PathBuf>,
    /// A git repository cloned into every job workspace.
    #[serde(default)]
    pub repository: Option<String>,
    /// History depth for `repository` clones.
    #[serde(default)]
    pub depth: Option<u32>,
}

/// `[runtime]`: maps the values of one axis to runtime install directories.
/// `[runtime]`：将某个轴的取值映射到运行时安装目录。
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RuntimeConfig {
    pub axis: String,
    #[serde(default)]
    pub paths: BTreeMap<String, PathBuf>,
}

/// `[coverage]`: the artifact forwarded on push, and where it goes.
/// `[coverage]`：push 时转发的产物及其目的地。
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CoverageConfig {
    /// Path of the artifact relative to the job workspace.
    pub artifact: PathBuf,
    /// Environment variable holding the upload credential.
    #[serde(default)]
    pub token_env: Option<String>,
    /// Command invoked once per artifact, with `COVERAGE_FILE` set.
    #[serde(default)]
    pub upload_command: Option<String>,
    /// Directory artifacts are copied into when no upload command is given.
    #[serde(default)]
    pub output_dir: Option<PathBuf>,
}

/// The whole configuration file as written by an operator.
/// 运维人员编写的完整配置文件。
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct MatrixConfig {
    /// The language for console messages (e.g., "en", "zh-CN").
    /// 控制台消息的语言（例如 "en", "zh-CN"）。
    #[serde(default = "default_language")]
    pub language: String,
    /// Ceiling for a single job, in seconds.
    /// 单个作业的时间上限（秒）。
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
    /// Cancel every other job as soon as one fails.
    /// 一旦某个作业失败就取消其余所有作业。
    #[serde(default)]
    pub fail_fast: bool,
    /// Upper bound on concurrently running jobs.
    /// 并发运行作业数的上限。
    #[serde(default)]
    pub max_parallel: Option<usize>,
    pub axes: Vec<Axis>,
    pub steps: Vec<StepConfig>,
    #[serde(default)]
    pub triggers: TriggerConfig,
    #[serde(default)]
    pub checkout: Option<CheckoutConfig>,
    #[serde(default)]
    pub runtime: Option<RuntimeConfig>,
    #[serde(default)]
    pub coverage: Option<CoverageConfig>,
}

fn default_language() -> String {
    "en".to_string()
}

fn default_timeout() -> u64 {
    DEFAULT_TIMEOUT_SECS
}

/// A validated configuration, fixed for the duration of a run.
/// 校验后的配置，在整个运行期间保持不变。
#[derive(Debug, Clone)]
pub struct Workflow {
    pub language: String,
    pub axes: Vec<Axis>,
    pub steps: Vec<Step>,
    pub timeout: Duration,
    pub fail_fast: bool,
    pub max_parallel: Option<usize>,
    pub triggers: TriggerConfig,
    pub checkout: Option<CheckoutConfig>,
    pub runtime: Option<RuntimeConfig>,
    pub coverage: Option<CoverageConfig>,
}

impl MatrixConfig {
    /// Parses TOML text without validating it.
    pub fn from_toml(content: &str, path: &Path) -> Result<Self, ConfigError> {
        toml::from_str(content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Validates the configuration and compiles its steps.
    ///
    /// # Errors
    /// Any malformed axis, unparsable condition, condition referencing an
    /// undeclared axis, bad schedule or zero timeout.
    pub fn validate(self) -> Result<Workflow, ConfigError> {
        if self.axes.is_empty() {
            return Err(ConfigError::NoAxes);
        }
        let mut axis_names = HashSet::new();
        let mut env_names: HashMap<String, &str> = HashMap::new();
        for axis in &self.axes {
            if axis.name == EVENT_OPERAND {
                return Err(ConfigError::ReservedAxis {
                    axis: axis.name.clone(),
                });
            }
            if !axis_names.insert(axis.name.as_str()) {
                return Err(ConfigError::DuplicateAxis {
                    axis: axis.name.clone(),
                });
            }
            let env = axis_env_name(&axis.name);
            if let Some(other) = env_names.insert(env.clone(), axis.name.as_str()) {
                return Err(ConfigError::AxisEnvCollision {
                    axis: axis.name.clone(),
                    other: other.to_string(),
                    env,
                });
            }
            if axis.values.is_empty() {
                return Err(ConfigError::EmptyAxis {
                    axis: axis.name.clone(),
                });
            }
            let mut seen = HashSet::new();
            if let Some(dup) = axis.values.iter().find(|v| !seen.insert(v.as_str())) {
                return Err(ConfigError::DuplicateValue {
                    axis: axis.name.clone(),
                    value: dup.clone(),
                });
            }
        }

        if self.steps.is_empty() {
            return Err(ConfigError::NoSteps);
        }
        if self.timeout_secs == 0 {
            return Err(ConfigError::InvalidTimeout);
        }
        self.triggers.weekly_schedule()?;

        if let Some(runtime) = &self.runtime {
            if !axis_names.contains(runtime.axis.as_str()) {
                return Err(ConfigError::UnknownAxis {
                    context: "[runtime]".to_string(),
                    axis: runtime.axis.clone(),
                });
            }
        }

        let mut steps = Vec::with_capacity(self.steps.len());
        for (ordinal, step) in self.steps.into_iter().enumerate() {
            let context = format!("step '{}'", step.name);
            let condition = step
                .condition
                .as_deref()
                .map(|expr| Condition::parse(expr, &context))
                .transpose()?;

            if let Some(condition) = &condition {
                if let Some(axis) = condition
                    .referenced_axes()
                    .into_iter()
                    .find(|a| !axis_names.contains(a))
                {
                    return Err(ConfigError::UnknownAxis {
                        context,
                        axis: axis.to_string(),
                    });
                }
            }

            steps.push(Step {
                name: step.name,
                ordinal,
                command: step.run,
                shell: step.shell,
                env: step.env,
                condition,
            });
        }

        Ok(Workflow {
            language: self.language,
            axes: self.axes,
            steps,
            timeout: Duration::from_secs(self.timeout_secs),
            fail_fast: self.fail_fast,
            max_parallel: self.max_parallel,
            triggers: self.triggers,
            checkout: self.checkout,
            runtime: self.runtime,
            coverage: self.coverage,
        })
    }
}

/// Reads, parses and validates the configuration file at `path`.
/// 读取、解析并校验位于 `path` 的配置文件。
pub fn load_workflow(path: &Path) -> Result<Workflow, ConfigError> {
    let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    MatrixConfig::from_toml(&content, path)?.validate()
}
