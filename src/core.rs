//! # Core Module / 核心模块
//!
//! This module contains the engine itself: configuration, matrix expansion,
//! condition evaluation, step running, job scheduling and result aggregation.
//!
//! 此模块包含引擎本身：配置、矩阵展开、条件求值、步骤运行、
//! 作业调度和结果汇总。

pub mod aggregator;
pub mod condition;
pub mod config;
pub mod error;
pub mod matrix;
pub mod models;
pub mod scheduler;
pub mod steps;
pub mod trigger;

// Re-exports
pub use config::Workflow;
pub use error::{ConfigError, JobFailure, ReportingError};
pub use models::{JobReport, RunReport, RunStatus};
