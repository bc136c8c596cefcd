//! # Command-Line Interface / 命令行接口
//!
//! Builds the `ci-matrix` command tree and dispatches to the subcommands.
//!
//! 构建 `ci-matrix` 命令树并分派到各个子命令。

use anyhow::Result;
use clap::{Arg, ArgAction, Command};
use std::{env, path::PathBuf};

use crate::core::trigger::TriggerEvent;
use crate::infra::{logging, t};

pub mod commands;

/// Default configuration file name.
pub const DEFAULT_CONFIG: &str = "CiMatrix.toml";

/// Pre-parses the command line arguments to find the language setting.
/// This allows i18n to be initialized before the full CLI is built.
/// It looks for a `--lang <VALUE>` argument.
fn pre_parse_language() -> Option<String> {
    let args: Vec<String> = env::args().collect();
    args.iter()
        .position(|arg| arg == "--lang")
        .and_then(|pos| args.get(pos + 1))
        .cloned()
}

/// Picks the UI language from the system locale, falling back to English.
pub fn detect_system_language() -> String {
    let locale = sys_locale::get_locale().unwrap_or_else(|| "en".to_string());
    let available = rust_i18n::available_locales!();
    if available.contains(&locale.as_str()) {
        return locale;
    }
    locale
        .split('-')
        .next()
        .filter(|lang| available.contains(lang))
        .unwrap_or("en")
        .to_string()
}

fn config_arg(locale: &str) -> Arg {
    Arg::new("config")
        .short('c')
        .long("config")
        .help(t!("cli.arg_config", locale = locale).to_string())
        .value_name("CONFIG")
        .default_value(DEFAULT_CONFIG)
        .value_parser(clap::value_parser!(PathBuf))
        .action(ArgAction::Set)
}

fn event_arg(locale: &str) -> Arg {
    Arg::new("event")
        .short('e')
        .long("event")
        .help(t!("cli.arg_event", locale = locale).to_string())
        .value_name("EVENT")
        .default_value("manual-dispatch")
        .value_parser(clap::value_parser!(TriggerEvent))
        .action(ArgAction::Set)
}

fn branch_arg(locale: &str) -> Arg {
    Arg::new("branch")
        .short('b')
        .long("branch")
        .help(t!("cli.arg_branch", locale = locale).to_string())
        .value_name("BRANCH")
        .action(ArgAction::Set)
}

pub fn build_cli(locale: &str) -> Command {
    Command::new("ci-matrix")
        .version(env!("CARGO_PKG_VERSION"))
        .about(t!("cli.about", locale = locale).to_string())
        .subcommand_required(true)
        .arg(
            Arg::new("lang")
                .long("lang")
                .help(t!("cli.arg_lang", locale = locale).to_string())
                .value_name("LANGUAGE")
                .global(true)
                .action(ArgAction::Set),
        )
        .arg(
            Arg::new("verbose")
                .short('v')
                .long("verbose")
                .help(t!("cli.arg_verbose", locale = locale).to_string())
                .global(true)
                .action(ArgAction::SetTrue),
        )
        .subcommand(
            Command::new("run")
                .about(t!("cli.cmd_run_about", locale = locale).to_string())
                .arg(config_arg(locale))
                .arg(event_arg(locale))
                .arg(branch_arg(locale))
                .arg(
                    Arg::new("jobs")
                        .short('j')
                        .long("jobs")
                        .help(t!("cli.arg_jobs", locale = locale).to_string())
                        .value_name("JOBS")
                        .value_parser(clap::value_parser!(usize))
                        .action(ArgAction::Set),
                )
                .arg(
                    Arg::new("html")
                        .long("html")
                        .help(t!("cli.arg_html", locale = locale).to_string())
                        .value_name("HTML")
                        .value_parser(clap::value_parser!(PathBuf))
                        .action(ArgAction::Set),
                )
                .arg(
                    Arg::new("json")
                        .long("json")
                        .help(t!("cli.arg_json", locale = locale).to_string())
                        .value_name("JSON")
                        .value_parser(clap::value_parser!(PathBuf))
                        .action(ArgAction::Set),
                ),
        )
        .subcommand(
            Command::new("plan")
                .about(t!("cli.cmd_plan_about", locale = locale).to_string())
                .arg(config_arg(locale))
                .arg(event_arg(locale))
                .arg(branch_arg(locale)),
        )
        .subcommand(
            Command::new("init")
                .about(t!("cli.cmd_init_about", locale = locale).to_string())
                .arg(
                    Arg::new("output")
                        .short('o')
                        .long("output")
                        .help(t!("cli.arg_output", locale = locale).to_string())
                        .value_name("OUTPUT")
                        .default_value(DEFAULT_CONFIG)
                        .value_parser(clap::value_parser!(PathBuf))
                        .action(ArgAction::Set),
                )
                .arg(
                    Arg::new("non-interactive")
                        .long("non-interactive")
                        .help(t!("cli.arg_non_interactive", locale = locale).to_string())
                        .action(ArgAction::SetTrue),
                ),
        )
}

/// Parses the command line and runs the selected subcommand.
pub async fn run() -> Result<()> {
    // Pre-parse language and initialize i18n first.
    let explicit_language = pre_parse_language();
    let language = explicit_language
        .clone()
        .unwrap_or_else(detect_system_language);
    rust_i18n::set_locale(&language);

    let matches = build_cli(&language).get_matches();
    logging::init(matches.get_flag("verbose"));

    match matches.subcommand() {
        Some(("run", run_matches)) => {
            let args = commands::run::RunArgs {
                config: run_matches
                    .get_one::<PathBuf>("config")
                    .cloned()
                    .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG)),
                event: run_matches
                    .get_one::<TriggerEvent>("event")
                    .copied()
                    .unwrap_or(TriggerEvent::ManualDispatch),
                branch: run_matches.get_one::<String>("branch").cloned(),
                jobs: run_matches.get_one::<usize>("jobs").copied(),
                html: run_matches.get_one::<PathBuf>("html").cloned(),
                json: run_matches.get_one::<PathBuf>("json").cloned(),
                language: explicit_language,
            };
            commands::run::execute(args).await?;
        }
        Some(("plan", plan_matches)) => {
            let config = plan_matches
                .get_one::<PathBuf>("config")
                .cloned()
                .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG));
            let event = plan_matches
                .get_one::<TriggerEvent>("event")
                .copied()
                .unwrap_or(TriggerEvent::ManualDispatch);
            let branch = plan_matches.get_one::<String>("branch").cloned();
            commands::plan::execute(&config, event, branch, explicit_language)?;
        }
        Some(("init", init_matches)) => {
            let output = init_matches
                .get_one::<PathBuf>("output")
                .cloned()
                .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG));
            let non_interactive = init_matches.get_flag("non-interactive");
            commands::init::run_init(&output, &language, non_interactive)?;
        }
        _ => {
            // `subcommand_required` makes clap print usage before we get here.
        }
    }
    Ok(())
}
