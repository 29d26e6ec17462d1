#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Command-line adapter for inspecting and reconciling spawn populations.
//!
//! The world lives in a JSON snapshot file; every verb loads it, runs one
//! reconciliation lifecycle against it, and writes it back only after a
//! successful commit. `plan` and the default `wipe` form are dry runs and
//! never touch the snapshot.

mod config;
mod snapshot;

use std::path::PathBuf;

use anyhow::Context as _;
use clap::{Args, Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;

use config::CliConfig;
use spawn_warden_core::{CellBounds, Epoch, ShardId};
use spawn_warden_reconcile::{ReconcileRequest, Reconciler, WipeRequest};
use spawn_warden_system_planner::derive_stream_seed;
use spawn_warden_world::CountingCache;

/// Spawn population reconciliation tool.
#[derive(Parser)]
#[command(name = "spawn-warden", version, about)]
struct Cli {
    /// Path to the operator TOML config; defaults apply when omitted.
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    /// Path to the JSON world snapshot.
    #[arg(long, global = true, default_value = "world.json")]
    snapshot: PathBuf,
    /// Emit debug-level progress for every reconcile phase.
    #[arg(long, global = true)]
    verbose: bool,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Stages a reconciliation and prints the diff without persisting it.
    Plan(WaveArgs),
    /// Applies a reconciliation and writes the snapshot back.
    Apply(ApplyArgs),
    /// Selects system-owned records for deletion; destructive only with
    /// `--commit`.
    Wipe(WipeArgs),
    /// Prints the deterministic stream seed derived for a wave.
    SeedPreview(SeedPreviewArgs),
}

#[derive(Args)]
struct WaveArgs {
    /// Shard to reconcile against.
    #[arg(long, default_value = "default")]
    shard: String,
    /// World seed string.
    #[arg(long)]
    seed: String,
    /// Epoch counter of the wave.
    #[arg(long)]
    epoch: u32,
    /// Theme governing the prototype pool.
    #[arg(long)]
    theme: String,
    /// Cell region in `<minX>..<maxX>,<minZ>..<maxZ>` notation.
    #[arg(long, value_parser = parse_bounds)]
    bounds: CellBounds,
    /// Desired number of placements.
    #[arg(long)]
    count: u32,
    /// Delete the existing in-box population before placing.
    #[arg(long)]
    replace: bool,
    /// Overwrite records whose identifier a new placement reproduces.
    #[arg(long)]
    update_existing: bool,
    /// Allow mutation of locked or operator-owned records.
    #[arg(long)]
    override_protected: bool,
}

#[derive(Args)]
struct ApplyArgs {
    #[command(flatten)]
    wave: WaveArgs,
    /// Confirm token echoed from a prior `plan`; required when the commit
    /// would delete.
    #[arg(long)]
    confirm: Option<String>,
}

#[derive(Args)]
struct WipeArgs {
    /// Shard to wipe in.
    #[arg(long, default_value = "default")]
    shard: String,
    /// Cell region in `<minX>..<maxX>,<minZ>..<maxZ>` notation.
    #[arg(long, value_parser = parse_bounds)]
    bounds: CellBounds,
    /// Restrict the selection to one theme.
    #[arg(long)]
    theme: Option<String>,
    /// Restrict the selection to one epoch.
    #[arg(long)]
    epoch: Option<u32>,
    /// Allow deletion of locked records.
    #[arg(long)]
    override_protected: bool,
    /// Actually delete; without this flag the selection is only reported.
    #[arg(long)]
    commit: bool,
    /// Confirm token echoed from a prior dry run.
    #[arg(long)]
    confirm: Option<String>,
}

#[derive(Args)]
struct SeedPreviewArgs {
    /// World seed string.
    #[arg(long)]
    seed: String,
    /// Epoch counter of the wave.
    #[arg(long)]
    epoch: u32,
    /// Theme governing the prototype pool.
    #[arg(long)]
    theme: String,
}

fn parse_bounds(value: &str) -> Result<CellBounds, String> {
    CellBounds::parse(value).map_err(|err| err.to_string())
}

fn wave_request(args: &WaveArgs, config: &CliConfig) -> ReconcileRequest {
    ReconcileRequest {
        shard: ShardId::new(args.shard.clone()),
        seed: args.seed.clone(),
        epoch: Epoch::new(args.epoch),
        theme: args.theme.clone(),
        bounds: args.bounds,
        cell_size: config.cell_size,
        border_inset: config.border_inset,
        margin: config.margin,
        count: args.count,
        append: !args.replace,
        update_existing: args.update_existing,
        override_protected: args.override_protected,
        caps: config.cap_set(),
        kind: config.kind.clone(),
        archetype: config.archetype.clone(),
        region: None,
        tier: None,
    }
}

fn wipe_request(args: &WipeArgs, config: &CliConfig) -> WipeRequest {
    WipeRequest {
        shard: ShardId::new(args.shard.clone()),
        bounds: args.bounds,
        cell_size: config.cell_size,
        margin: config.margin,
        theme: args.theme.clone(),
        epoch: args.epoch.map(Epoch::new),
        override_protected: args.override_protected,
    }
}

fn init_tracing(verbose: bool) {
    let fallback = if verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(fallback));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

/// Entry point for the spawn-warden command-line interface.
fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);
    let config = CliConfig::load(cli.config.as_deref())?;
    let themes = config.theme_table();

    match &cli.command {
        Command::Plan(args) => {
            let mut world = snapshot::load_world(&cli.snapshot)?;
            let mut cache = CountingCache::new();
            let request = wave_request(args, &config);
            let plan = Reconciler::new(&mut world, &mut cache, &themes).dry_run(&request)?;
            println!(
                "{}",
                serde_json::to_string_pretty(&plan).context("encoding plan")?
            );
        }
        Command::Apply(args) => {
            let mut world = snapshot::load_world(&cli.snapshot)?;
            let mut cache = CountingCache::new();
            let request = wave_request(&args.wave, &config);
            let applied = Reconciler::new(&mut world, &mut cache, &themes)
                .commit(&request, args.confirm.as_deref())?;
            snapshot::save_world(&cli.snapshot, &world)?;
            info!(snapshot = %cli.snapshot.display(), "snapshot updated");
            println!(
                "{}",
                serde_json::to_string_pretty(&applied).context("encoding result")?
            );
        }
        Command::Wipe(args) => {
            let mut world = snapshot::load_world(&cli.snapshot)?;
            let mut cache = CountingCache::new();
            let request = wipe_request(args, &config);
            if args.commit {
                let applied = Reconciler::new(&mut world, &mut cache, &themes)
                    .wipe_commit(&request, args.confirm.as_deref())?;
                snapshot::save_world(&cli.snapshot, &world)?;
                info!(snapshot = %cli.snapshot.display(), "snapshot updated");
                println!(
                    "{}",
                    serde_json::to_string_pretty(&applied).context("encoding result")?
                );
            } else {
                let plan =
                    Reconciler::new(&mut world, &mut cache, &themes).wipe_dry_run(&request)?;
                println!(
                    "{}",
                    serde_json::to_string_pretty(&plan).context("encoding plan")?
                );
            }
        }
        Command::SeedPreview(args) => {
            let stream = derive_stream_seed(&args.seed, Epoch::new(args.epoch), &args.theme);
            println!("{stream}");
        }
    }
    Ok(())
}
