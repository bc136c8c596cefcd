//! # Init Command Module / 初始化命令模块
//!
//! Creates a starter `CiMatrix.toml`, either straight from the built-in
//! template or through a short interactive wizard.
//!
//! 创建初始的 `CiMatrix.toml`，可以直接使用内置模板，也可以通过简短的交互式向导。

use anyhow::{Context, Result};
use colored::*;
use dialoguer::{Confirm, Input, theme::ColorfulTheme};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use crate::core::config::{CoverageConfig, DEFAULT_TIMEOUT_SECS, MatrixConfig, StepConfig};
use crate::core::models::Axis;
use crate::core::trigger::TriggerConfig;
use crate::infra::t;

fn step(name: &str, run: &str, condition: Option<&str>) -> StepConfig {
    StepConfig {
        name: name.to_string(),
        run: run.to_string(),
        condition: condition.map(str::to_string),
        shell: false,
        env: BTreeMap::new(),
    }
}

/// The template written by `init --non-interactive`.
/// `init --non-interactive` 写出的模板。
pub fn default_matrix(language: &str) -> MatrixConfig {
    build_matrix(
        language,
        vec!["ubuntu-latest", "windows-latest", "macos-latest"],
        vec!["3.9", "3.10", "3.11", "pypy-3.9"],
        "tox",
        false,
    )
}

fn build_matrix(
    language: &str,
    platforms: Vec<&str>,
    versions: Vec<&str>,
    test_command: &str,
    fail_fast: bool,
) -> MatrixConfig {
    MatrixConfig {
        language: language.to_string(),
        timeout_secs: DEFAULT_TIMEOUT_SECS,
        fail_fast,
        max_parallel: None,
        axes: vec![
            Axis::new("platform", platforms),
            Axis::new("runtime-version", versions),
        ],
        steps: vec![
            step("Install dependencies", "python -m pip install --upgrade pip tox", None),
            step(
                "Install Linux extras",
                "python -m pip install tox-gh-actions",
                Some("platform contains ubuntu && runtime-version !starts-with pypy"),
            ),
            step("Run tests", test_command, None),
            step(
                "Upload coverage",
                "python -m coverage xml",
                Some("event == push"),
            ),
        ],
        triggers: TriggerConfig {
            push_branches: vec!["main".to_string()],
            pull_request: true,
            manual_dispatch: true,
            schedule: Some("0 0 * * 0".to_string()),
        },
        checkout: None,
        runtime: None,
        coverage: Some(CoverageConfig {
            artifact: PathBuf::from("coverage.xml"),
            token_env: Some("CODECOV_TOKEN".to_string()),
            upload_command: None,
            output_dir: Some(PathBuf::from("coverage-reports")),
        }),
    }
}

fn split_list(input: &str) -> Vec<&str> {
    input
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .collect()
}

/// Runs the init command: writes `path`, asking before overwriting unless
/// `non_interactive` is set (then an existing file is left untouched).
pub fn run_init(path: &Path, language: &str, non_interactive: bool) -> Result<()> {
    if non_interactive {
        if path.exists() {
            println!(
                "{}",
                t!("init.file_exists", path = path.display()).yellow()
            );
            return Ok(());
        }
        return write_config(path, &default_matrix(language));
    }

    let theme = ColorfulTheme::default();
    println!("\n{}", t!("init.welcome").cyan().bold());

    if path.exists() {
        let overwrite = Confirm::with_theme(&theme)
            .with_prompt(t!("init.overwrite_prompt", path = path.display()).to_string())
            .default(false)
            .interact()
            .context(t!("init.prompt_failed").to_string())?;
        if !overwrite {
            println!("{}", t!("init.aborted"));
            return Ok(());
        }
    }

    let platforms: String = Input::with_theme(&theme)
        .with_prompt(t!("init.platforms_prompt").to_string())
        .default("ubuntu-latest, windows-latest, macos-latest".to_string())
        .interact_text()
        .context(t!("init.prompt_failed").to_string())?;
    let versions: String = Input::with_theme(&theme)
        .with_prompt(t!("init.versions_prompt").to_string())
        .default("3.9, 3.10, 3.11, pypy-3.9".to_string())
        .interact_text()
        .context(t!("init.prompt_failed").to_string())?;
    let test_command: String = Input::with_theme(&theme)
        .with_prompt(t!("init.test_command_prompt").to_string())
        .default("tox".to_string())
        .interact_text()
        .context(t!("init.prompt_failed").to_string())?;
    let fail_fast = Confirm::with_theme(&theme)
        .with_prompt(t!("init.fail_fast_prompt").to_string())
        .default(false)
        .interact()
        .context(t!("init.prompt_failed").to_string())?;

    let matrix = build_matrix(
        language,
        split_list(&platforms),
        split_list(&versions),
        &test_command,
        fail_fast,
    );
    write_config(path, &matrix)
}

fn write_config(path: &Path, matrix: &MatrixConfig) -> Result<()> {
    // The written file must load back cleanly.
    matrix.clone().validate()?;

    let toml_string =
        toml::to_string_pretty(matrix).context(t!("init.serialize_failed").to_string())?;

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| t!("init.write_failed", path = parent.display()).to_string())?;
    }
    fs::write(path, toml_string)
        .with_context(|| t!("init.write_failed", path = path.display()).to_string())?;

    println!(
        "\n{} {}",
        "✔".green(),
        t!("init.success", path = path.display()).bold()
    );
    println!("{}", t!("init.usage_hint", path = path.display()));
    Ok(())
}
