//! # Infrastructure Module / 基础设施模块
//!
//! This module provides infrastructure services for the engine: process
//! execution, job workspaces, diagnostic logging and i18n.
//!
//! 此模块为引擎提供基础设施服务：进程执行、作业工作区、诊断日志和国际化。

pub mod command;
pub mod fs;
pub mod logging;

// Re-export i18n functions for easier access
pub use rust_i18n::t;
