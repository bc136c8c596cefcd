//! # Matrix Expansion Module / 矩阵展开模块
//!
//! Expands an ordered list of axes into the full cross product of job
//! instances. The first axis varies slowest and every axis keeps its declared
//! value order, so identical input always yields an identically ordered plan.
//!
//! 将有序的轴列表展开为作业实例的完整笛卡尔积。
//! 第一个轴变化最慢，每个轴保持其声明的取值顺序，
//! 因此相同的输入总是产生顺序完全相同的计划。

use crate::core::error::ConfigError;
use crate::core::models::{Axis, JobInstance};

/// Produces every combination of axis values as a `JobInstance`.
///
/// # Errors
/// * `ConfigError::NoAxes` if `axes` is empty
/// * `ConfigError::EmptyAxis` if any axis has no values
///
/// 以 `JobInstance` 的形式生成所有轴取值组合。
pub fn expand(axes: &[Axis]) -> Result<Vec<JobInstance>, ConfigError> {
    if axes.is_empty() {
        return Err(ConfigError::NoAxes);
    }
    if let Some(axis) = axes.iter().find(|a| a.values.is_empty()) {
        return Err(ConfigError::EmptyAxis {
            axis: axis.name.clone(),
        });
    }

    let total = job_count(axes);
    let mut combinations: Vec<Vec<(String, String)>> = vec![Vec::with_capacity(axes.len())];

    for axis in axes {
        combinations = combinations
            .into_iter()
            .flat_map(|prefix| {
                axis.values.iter().map(move |value| {
                    let mut combo = prefix.clone();
                    combo.push((axis.name.clone(), value.clone()));
                    combo
                })
            })
            .collect();
    }

    debug_assert_eq!(combinations.len(), total);

    Ok(combinations
        .into_iter()
        .enumerate()
        .map(|(index, values)| JobInstance::new(index, values))
        .collect())
}

/// The number of jobs `axes` expands to: the product of axis cardinalities.
/// `axes` 展开后的作业数量：各轴基数之积。
pub fn job_count(axes: &[Axis]) -> usize {
    axes.iter().map(|a| a.values.len()).product()
}
