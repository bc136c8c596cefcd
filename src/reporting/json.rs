//! Machine-readable run report.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};

use crate::core::models::RunReport;

/// Writes the full run report as pretty-printed JSON.
/// 以格式化 JSON 写出完整的运行报告。
pub fn write_json_report(report: &RunReport, output_path: &Path) -> Result<()> {
    let json = serde_json::to_string_pretty(report).context("Failed to serialize run report")?;
    fs::write(output_path, json)
        .with_context(|| format!("Failed to write JSON report to {}", output_path.display()))
}
