//! # Reporting Module / 报告模块
//!
//! This module handles the presentation of run results (console summary,
//! HTML and JSON reports) and the coverage reporting collaborators.
//!
//! 此模块处理运行结果的呈现（控制台摘要、HTML 和 JSON 报告）
//! 以及覆盖率报告协作方。

pub mod console;
pub mod coverage;
pub mod html;
pub mod json;

// Re-export common reporting functions
pub use console::{print_failure_details, print_summary, print_verdict};
pub use coverage::reporter_from_config;
pub use html::generate_html_report;
pub use json::write_json_report;
