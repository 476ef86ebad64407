//! vw-flash - Command-line tool for preparing and flashing ECU firmware blocks
//!
//! Pairs each `--infile` with the `--block` given at the same position,
//! runs one `--action` over the resulting block set and optionally writes
//! the transformed blocks next to their inputs.

mod commands;
mod config;
mod output;

use anyhow::{Context, Result};
use clap::{ArgAction, CommandFactory, FromArgMatches, Parser, ValueEnum};
use std::path::PathBuf;
use tracing::subscriber::DefaultGuard;
use tracing::{error, info};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};
use vwflash_core::{
    Action, BlockInput, BlockRegistry, BlockSet, DispatchOptions, LoopbackToolchain,
    Orchestrator, PipelineResult,
};

use crate::config::{Config, MergedConfig};
use crate::output::{OutputContext, OutputFormat};

#[derive(Parser)]
#[command(name = "vw-flash")]
#[command(author, version, about = "VW_Flash CLI")]
#[command(after_help = "The MAIN CLI interface for using the tools herein")]
struct Cli {
    /// The action you want to take
    #[arg(long, value_enum)]
    action: ActionArg,

    /// The absolute path of an input file (repeat once per block)
    #[arg(long, action = ArgAction::Append)]
    infile: Vec<PathBuf>,

    /// Write transformed blocks next to their input files
    #[arg(long)]
    outfile: bool,

    /// The block name or number (repeat once per infile, in the same order)
    #[arg(long, required = true, action = ArgAction::Append)]
    block: Vec<String>,

    /// Specify simos12, available for checksumming
    #[arg(long)]
    simos12: bool,

    /// Configuration file path
    #[arg(short, long, env = "VW_FLASH_CONFIG")]
    config: Option<PathBuf>,

    /// Output format
    #[arg(short, long, value_enum)]
    output: Option<OutputFormat>,

    /// Disable colored output
    #[arg(long)]
    no_color: bool,

    /// Minimal output (for scripting)
    #[arg(short, long)]
    quiet: bool,

    /// Verbose logging
    #[arg(short, long)]
    verbose: bool,
}

/// Command-line names for [`Action`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum ActionArg {
    #[value(name = "checksum", alias = "checksum-inspect")]
    Checksum,
    #[value(name = "checksum_fix", alias = "checksum-repair")]
    ChecksumFix,
    #[value(name = "checksum_ecm3", alias = "checksum-inspect-variant")]
    ChecksumEcm3,
    #[value(name = "checksum_fix_ecm3", alias = "checksum-repair-variant")]
    ChecksumFixEcm3,
    #[value(name = "lzss", alias = "compress")]
    Lzss,
    #[value(name = "encrypt")]
    Encrypt,
    #[value(name = "prepare")]
    Prepare,
    #[value(name = "flash_bin", alias = "transfer-raw")]
    FlashBin,
    #[value(name = "flash_prepared", alias = "transfer-prepared")]
    FlashPrepared,
}

impl From<ActionArg> for Action {
    fn from(arg: ActionArg) -> Self {
        match arg {
            ActionArg::Checksum => Action::Checksum,
            ActionArg::ChecksumFix => Action::ChecksumFix,
            ActionArg::ChecksumEcm3 => Action::ChecksumEcm3,
            ActionArg::ChecksumFixEcm3 => Action::ChecksumFixEcm3,
            ActionArg::Lzss => Action::Lzss,
            ActionArg::Encrypt => Action::Encrypt,
            ActionArg::Prepare => Action::Prepare,
            ActionArg::FlashBin => Action::FlashBin,
            ActionArg::FlashPrepared => Action::FlashPrepared,
        }
    }
}

/// Process-wide handles created once at startup
struct Runtime {
    registry: BlockRegistry,
    config: MergedConfig,
    _log_guard: DefaultGuard,
}

fn main() -> Result<()> {
    let registry = BlockRegistry::simos18().context("Invalid block table")?;
    let cli = parse_cli(&registry);

    // A bad config file is reported through the log subscriber like any
    // other failure, so logging starts on fallback settings.
    let (merged, config_error) = match load_config(&cli) {
        Ok(merged) => (merged, None),
        Err(e) => (MergedConfig::fallback(cli.verbose), Some(e)),
    };

    let runtime = initialize(registry, merged);
    info!("Starting vw-flash");

    let result = match config_error {
        Some(e) => Err(e),
        None => {
            let ctx =
                OutputContext::new(runtime.config.output, runtime.config.no_color, cli.quiet);
            run(&cli, &runtime, &ctx)
        }
    };

    if let Err(e) = result {
        error!("{:#}", e);
        std::process::exit(1);
    }

    Ok(())
}

fn load_config(cli: &Cli) -> Result<MergedConfig> {
    let config = if let Some(config_path) = &cli.config {
        Config::load_from(config_path)?
    } else {
        Config::load().unwrap_or_default()
    };
    config.merge_with_args(cli.output, cli.no_color, cli.simos12, cli.verbose)
}

/// Parse arguments, listing every accepted block identifier in `--block` help
fn parse_cli(registry: &BlockRegistry) -> Cli {
    let block_help = format!(
        "The block name or number (repeat once per infile, in the same order) [possible values: {}]",
        registry.identifiers().join(", ")
    );
    let matches = Cli::command()
        .mut_arg("block", |arg| arg.help(block_help))
        .get_matches();

    Cli::from_arg_matches(&matches).unwrap_or_else(|e| e.exit())
}

/// Install the log subscriber and take ownership of the registry
fn initialize(registry: BlockRegistry, config: MergedConfig) -> Runtime {
    let filter = match &config.log_filter {
        Some(directive) => EnvFilter::new(directive),
        None => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
    };

    let subscriber = tracing_subscriber::registry()
        .with(fmt::layer().with_target(false).with_writer(std::io::stderr))
        .with(filter);
    let log_guard = tracing::subscriber::set_default(subscriber);

    Runtime {
        registry,
        config,
        _log_guard: log_guard,
    }
}

fn run(cli: &Cli, runtime: &Runtime, ctx: &OutputContext) -> Result<()> {
    let action = Action::from(cli.action);
    let registry = &runtime.registry;

    let inputs = BlockInput::pair(cli.infile.clone(), cli.block.clone())?;
    let blocks = BlockSet::build(registry, inputs)?;

    let options = DispatchOptions::new(runtime.config.family);
    let mut toolchain = LoopbackToolchain::new(options.family);
    if let Some(cipher) = &runtime.config.cipher {
        toolchain = toolchain.with_cipher(cipher.clone());
    }
    let orchestrator = Orchestrator::new(registry, toolchain);

    let result = if action.is_transfer() {
        PipelineResult::Transfer(commands::flash(
            &orchestrator,
            action,
            &blocks,
            &options,
            ctx,
        )?)
    } else {
        orchestrator.dispatch(action, &blocks, &options, None)?
    };

    match result {
        PipelineResult::Report(report) => commands::checksum_report(&report, registry, ctx),
        PipelineResult::Transformed(transformed) => {
            commands::save(&transformed, action, cli.outfile, ctx);
        }
        PipelineResult::Transfer(_) => {}
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_repeated_pairs_keep_order() {
        let cli = Cli::try_parse_from([
            "vw-flash",
            "--action",
            "checksum_fix",
            "--block",
            "CAL",
            "--infile",
            "/tmp/a.bin",
            "--block",
            "2",
            "--infile",
            "/tmp/b.bin",
            "--outfile",
        ])
        .unwrap();

        assert_eq!(Action::from(cli.action), Action::ChecksumFix);
        assert_eq!(cli.block, vec!["CAL", "2"]);
        assert_eq!(
            cli.infile,
            vec![PathBuf::from("/tmp/a.bin"), PathBuf::from("/tmp/b.bin")]
        );
        assert!(cli.outfile);
        assert!(!cli.simos12);
    }

    #[test]
    fn test_action_aliases() {
        let cli = Cli::try_parse_from([
            "vw-flash",
            "--action",
            "transfer-prepared",
            "--block",
            "CAL",
        ])
        .unwrap();
        assert_eq!(Action::from(cli.action), Action::FlashPrepared);
    }

    #[test]
    fn test_action_names_match_core() {
        for arg in ActionArg::value_variants() {
            let name = arg.to_possible_value().unwrap().get_name().to_string();
            assert_eq!(Action::from(*arg).as_str(), name);
        }
    }

    #[test]
    fn test_unreadable_config_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("missing.toml");
        let cli = Cli::try_parse_from([
            "vw-flash",
            "--action",
            "checksum",
            "--block",
            "CAL",
            "--config",
            missing.to_str().unwrap(),
        ])
        .unwrap();
        let err = load_config(&cli).unwrap_err();
        assert!(format!("{:#}", err).contains("Failed to read config file"));
    }

    #[test]
    fn test_block_required() {
        assert!(Cli::try_parse_from(["vw-flash", "--action", "checksum"]).is_err());
        assert!(Cli::try_parse_from(["vw-flash", "--action", "flash", "--block", "1"]).is_err());
    }
}
