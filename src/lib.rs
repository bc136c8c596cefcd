//! # CI Matrix Library / CI Matrix 库
//!
//! A test-matrix execution engine: expands configuration axes into jobs,
//! gates steps on conditions, schedules jobs in parallel with a timeout and
//! optional fail-fast, and reduces the results to one run status.
//!
//! 测试矩阵执行引擎：将配置轴展开为作业，按条件控制步骤，
//! 以带超时和可选快速失败的方式并行调度作业，并将结果归约为唯一的运行状态。
//!
//! ## Modules / 模块
//!
//! - `core` - Matrix expansion, conditions, step runner, scheduler, aggregator
//! - `infra` - Process spawning, workspaces, logging
//! - `reporting` - Console, HTML and JSON reports; coverage reporters
//! - `cli` - Command-line interface and commands
//!
//! - `core` - 矩阵展开、条件、步骤执行器、调度器、聚合器
//! - `infra` - 进程启动、工作区、日志
//! - `reporting` - 控制台、HTML 与 JSON 报告；覆盖率报告器
//! - `cli` - 命令行接口和命令

pub mod cli;
pub mod core;
pub mod infra;
pub mod reporting;

pub use crate::core::{
    ConfigError, JobFailure, JobReport, ReportingError, RunReport, RunStatus, Workflow,
};

rust_i18n::i18n!("locales", fallback = "en");
