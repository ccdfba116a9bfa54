use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use promo_condition::{evaluate_quantity, self_promotion_met, Watermark};
use promo_config::{load_layered_yaml, ValidatedCondition, ValidatedProcess};
use promo_ledger::ChainVerdict;
use promo_schemas::{BuildResult, WindowEntry};
use std::fs;

#[derive(Parser)]
#[command(name = "promogate")]
#[command(about = "Build promotion gate CLI", long_about = None)]
struct Cli {
    #[command(subcommand)]
    cmd: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Configuration commands
    Config {
        #[command(subcommand)]
        cmd: ConfigCmd,
    },

    /// Dry-run one process's conditions against a history file.
    /// Never writes a ledger.
    Evaluate {
        /// Layered config paths in merge order
        #[arg(long = "config", required = true)]
        config_paths: Vec<String>,

        /// Process name to evaluate
        #[arg(long)]
        process: String,

        /// JSON file holding the history window, newest-first
        #[arg(long)]
        history: String,

        /// Result of the triggering build
        /// (success | unstable | failure | aborted | not_built)
        #[arg(long)]
        result: String,

        /// Triggering build number
        #[arg(long, default_value_t = 0)]
        build: u32,

        /// Optional watermark JSON file (already-consumed build numbers)
        #[arg(long)]
        watermark: Option<String>,
    },

    /// Ledger utilities
    Ledger {
        #[command(subcommand)]
        cmd: LedgerCmd,
    },
}

#[derive(Subcommand)]
enum ConfigCmd {
    /// Validate layered configuration and print the resolved processes
    Check {
        /// Paths in merge order (base -> overlay -> ...)
        #[arg(required = true)]
        paths: Vec<String>,
    },

    /// Compute layered config hash + print canonical JSON
    Hash {
        #[arg(required = true)]
        paths: Vec<String>,
    },
}

#[derive(Subcommand)]
enum LedgerCmd {
    /// Verify the hash chain of a ledger file
    Verify { path: String },

    /// Print the most recent records, newest-first
    Tail {
        path: String,

        #[arg(long, default_value_t = 10)]
        limit: usize,
    },
}

fn main() -> Result<()> {
    init_tracing();

    let cli = Cli::parse();
    match cli.cmd {
        Commands::Config { cmd } => match cmd {
            ConfigCmd::Check { paths } => cmd_config_check(&paths),
            ConfigCmd::Hash { paths } => cmd_config_hash(&paths),
        },
        Commands::Evaluate {
            config_paths,
            process,
            history,
            result,
            build,
            watermark,
        } => cmd_evaluate(&config_paths, &process, &history, &result, build, watermark.as_deref()),
        Commands::Ledger { cmd } => match cmd {
            LedgerCmd::Verify { path } => cmd_ledger_verify(&path),
            LedgerCmd::Tail { path, limit } => cmd_ledger_tail(&path, limit),
        },
    }
}

fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()),
        )
        .init();
}

fn load(paths: &[String]) -> Result<promo_config::LoadedConfig> {
    let refs: Vec<&str> = paths.iter().map(|s| s.as_str()).collect();
    let loaded = load_layered_yaml(&refs)?;
    tracing::debug!(hash = %loaded.config_hash, "configuration loaded");
    Ok(loaded)
}

fn cmd_config_check(paths: &[String]) -> Result<()> {
    let loaded = load(paths)?;
    let hash = loaded.config_hash.clone();
    let project = loaded.into_project()?;

    println!("config OK");
    println!("config_hash: {hash}");
    println!("project: {}", project.project);
    for process in &project.processes {
        println!(
            "  process {} history={:?} conditions={} window_limit={}",
            process.name,
            process.history,
            process.conditions.len(),
            process.window_limit()
        );
    }
    Ok(())
}

fn cmd_config_hash(paths: &[String]) -> Result<()> {
    let loaded = load(paths)?;
    println!("config_hash: {}", loaded.config_hash);
    println!("{}", loaded.canonical_json);
    Ok(())
}

fn cmd_evaluate(
    config_paths: &[String],
    process_name: &str,
    history_path: &str,
    result: &str,
    build: u32,
    watermark_path: Option<&str>,
) -> Result<()> {
    let project = load(config_paths)?.into_project()?;
    let process = project
        .processes
        .iter()
        .find(|p| p.name == process_name)
        .with_context(|| format!("unknown process {process_name:?}"))?;

    let current = parse_result(result)?;

    let raw = fs::read_to_string(history_path)
        .with_context(|| format!("failed to read history file: {history_path}"))?;
    let window: Vec<WindowEntry> =
        serde_json::from_str(&raw).context("history file must be a JSON array of window entries")?;

    let watermark: Option<Watermark> = match watermark_path {
        Some(path) => {
            let raw = fs::read_to_string(path)
                .with_context(|| format!("failed to read watermark file: {path}"))?;
            Some(serde_json::from_str(&raw).context("watermark file must be watermark JSON")?)
        }
        None => None,
    };

    let promote = print_conditions(process, &window, current, watermark.as_ref())?;
    println!(
        "decision: {} (process={}, build={})",
        if promote { "promote" } else { "skip" },
        process.name,
        build
    );
    Ok(())
}

/// Print each condition's verdict; true when all of them are met.
fn print_conditions(
    process: &ValidatedProcess,
    window: &[WindowEntry],
    current: BuildResult,
    watermark: Option<&Watermark>,
) -> Result<bool> {
    let mut all_met = true;
    for condition in &process.conditions {
        match condition {
            ValidatedCondition::BuildQuantity(cfg) => {
                let decision = evaluate_quantity(cfg, window, current, watermark)?;
                println!(
                    "  build_quantity(threshold={}): {}",
                    cfg.threshold,
                    serde_json::to_string(&decision)?
                );
                all_met &= decision.promote;
            }
            ValidatedCondition::SelfPromotion(cfg) => {
                let met = self_promotion_met(cfg, current);
                println!(
                    "  self_promotion(even_if_unstable={}): met={met}",
                    cfg.even_if_unstable
                );
                all_met &= met;
            }
        }
    }
    Ok(all_met)
}

fn parse_result(raw: &str) -> Result<BuildResult> {
    Ok(match raw {
        "success" => BuildResult::Success,
        "unstable" => BuildResult::Unstable,
        "failure" => BuildResult::Failure,
        "aborted" => BuildResult::Aborted,
        "not_built" => BuildResult::NotBuilt,
        other => bail!(
            "unknown build result {other:?} (expected success|unstable|failure|aborted|not_built)"
        ),
    })
}

fn cmd_ledger_verify(path: &str) -> Result<()> {
    match promo_ledger::verify_chain(path)? {
        ChainVerdict::Valid { records } => {
            println!("chain OK ({records} records)");
            Ok(())
        }
        ChainVerdict::Broken { line, reason } => {
            bail!("chain broken at line {line}: {reason}")
        }
    }
}

fn cmd_ledger_tail(path: &str, limit: usize) -> Result<()> {
    let records = promo_ledger::read_newest_first(path, None, limit)?;
    if records.is_empty() {
        println!("(empty ledger)");
        return Ok(());
    }
    for r in records {
        println!(
            "#{} {} build={} result={} badges={} ts={}",
            r.seq,
            r.process,
            r.target_build,
            r.result.as_str(),
            r.badges.len(),
            r.ts_utc.to_rfc3339()
        );
    }
    Ok(())
}
