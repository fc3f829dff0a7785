use anyhow::{Context, Result};
use clap::{value_parser, Arg, ArgAction, ArgMatches, Command};
use std::path::PathBuf;

use strmsync::commands;
use strmsync::core::config::{Config, CONFIG_ENV};
use strmsync::logging;

fn build_cli() -> Command {
    Command::new("strmsync")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Keeps a .strm media library in sync with an M3U playlist")
        .subcommand_required(true)
        .arg_required_else_help(true)
        .arg(
            Arg::new("config")
                .short('c')
                .long("config")
                .value_name("FILE")
                .help(format!("Config file (default: ${} or the user config dir)", CONFIG_ENV))
                .value_parser(value_parser!(PathBuf))
                .global(true),
        )
        .arg(
            Arg::new("verbose")
                .short('v')
                .long("verbose")
                .help("Enable debug logging")
                .action(ArgAction::SetTrue)
                .global(true),
        )
        .subcommand(
            Command::new("sync")
                .about("Probe the playlist and reconcile both target roots")
                .arg(
                    Arg::new("manifest")
                        .short('m')
                        .long("manifest")
                        .value_name("FILE")
                        .help("Playlist to read instead of the configured one")
                        .value_parser(value_parser!(PathBuf)),
                )
                .arg(
                    Arg::new("dry-run")
                        .long("dry-run")
                        .help("Show what would change without touching the filesystem")
                        .action(ArgAction::SetTrue),
                )
                .arg(
                    Arg::new("concurrency")
                        .short('j')
                        .long("concurrency")
                        .value_name("N")
                        .help("Maximum number of concurrent probes")
                        .value_parser(value_parser!(usize)),
                ),
        )
        .subcommand(
            Command::new("prune")
                .about("Remove directories that contain no .strm files")
                .arg(
                    Arg::new("dry-run")
                        .long("dry-run")
                        .help("Show what would be removed without removing it")
                        .action(ArgAction::SetTrue),
                ),
        )
        .subcommand(
            Command::new("block")
                .about("Add titles to the exclusion list")
                .arg(
                    Arg::new("titles")
                        .value_name("TITLE")
                        .help("Movie, series or episode title to exclude")
                        .required(true)
                        .num_args(1..),
                ),
        )
        .subcommand(
            Command::new("completions")
                .about("Generate shell completion scripts")
                .arg(
                    Arg::new("shell")
                        .value_name("SHELL")
                        .help("bash, zsh, fish, powershell or elvish")
                        .required(true),
                ),
        )
        .subcommand(Command::new("version").about("Shows version information"))
}

fn main() {
    if let Err(e) = run() {
        strmsync::ui::error(&format!("Error: {:#}", e));
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let matches = build_cli().get_matches();

    match matches.subcommand() {
        Some(("completions", sub_matches)) => {
            commands::completions::execute(sub_matches, &mut build_cli())
        }
        Some(("version", _)) => commands::version(),
        Some((name, sub_matches)) => {
            // Global flags are propagated into the subcommand's matches
            let verbose = sub_matches.get_flag("verbose");
            let config = load_config(sub_matches)?;
            if let Some(log_file) = logging::init(verbose, config.log_dir.as_deref())? {
                log::debug!("Logging to {}", log_file.display());
            }

            match name {
                "sync" => commands::sync::execute(sub_matches, config),
                "prune" => commands::prune::execute(sub_matches, &config),
                "block" => commands::block::execute(sub_matches, &config),
                other => anyhow::bail!("Unknown command: {}", other),
            }
        }
        None => {
            println!("Use 'strmsync --help' for more information.");
            Ok(())
        }
    }
}

fn load_config(matches: &ArgMatches) -> Result<Config> {
    let path = matches.get_one::<PathBuf>("config");
    Config::load(path.map(PathBuf::as_path)).context("Failed to load configuration")
}
