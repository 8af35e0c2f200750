use std::fs;
use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use fpl_picker::config::AppConfig;
use fpl_picker::enrich::enrich_players;
use fpl_picker::error::OptimizeError;
use fpl_picker::stats_cache::{CacheSnapshot, StatsCache};
use fpl_picker::stats_provider::ChainProvider;
use fpl_picker::{fpl_feed, optimize, report};

struct CliArgs {
    offline: bool,
    xlsx: Option<PathBuf>,
    feed: Option<PathBuf>,
}

fn main() -> ExitCode {
    let _ = dotenvy::from_filename(".env.local");
    let _ = dotenvy::from_filename(".env");
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {err:#}");
            ExitCode::FAILURE
        }
    }
}

fn run() -> Result<()> {
    let args = parse_args();
    let mut config = AppConfig::from_env();
    config.offline |= args.offline;

    println!("Loading FPL data...");
    let players = match &args.feed {
        Some(path) => {
            let raw = fs::read_to_string(path)
                .with_context(|| format!("read feed {}", path.display()))?;
            fpl_feed::parse_bootstrap_json(&raw)?
        }
        None => fpl_feed::fetch_fpl_players(config.http_attempts)?,
    };
    println!("Loaded {} players.", players.len());

    let mut cache = match &config.cache_path {
        Some(path) => StatsCache::open(path)?,
        None => {
            warn!("no cache directory available, scraped stats will not persist");
            StatsCache::open_in_memory()?
        }
    };
    let snapshot: CacheSnapshot = cache.snapshot()?;
    info!(records = snapshot.len(), "loaded stats cache");

    let provider = if config.offline {
        ChainProvider::default()
    } else {
        ChainProvider::web(&config.season, config.page_fetcher())
    };

    println!("Enriching missing players...");
    let outcome = enrich_players(players, &snapshot, &provider, &config.enrich_options());
    if provider.is_empty() {
        info!(
            skipped = outcome.new_records.len(),
            "offline run, unresolved players not cached"
        );
    } else {
        cache.append(&outcome.new_records)?;
    }

    println!("Selecting squad...");
    let squad = match optimize(&outcome.players, &config.squad_constraints()) {
        Ok(squad) => squad,
        Err(err @ OptimizeError::Infeasible(_)) => {
            return Err(err).context("relax the budget, squad structure or team cap");
        }
        Err(err) => return Err(err.into()),
    };

    println!("{}", report::summary_line(&squad));
    if let Some(warning) = report::status_warning(&squad) {
        println!("{warning}");
    }
    print!("{}", report::render_table(&squad));

    if let Some(path) = args.xlsx {
        report::export_squad_xlsx(&path, &squad)?;
        println!("Wrote {}", path.display());
    }
    Ok(())
}

fn parse_args() -> CliArgs {
    let args = std::env::args().skip(1).collect::<Vec<_>>();
    CliArgs {
        offline: args.iter().any(|a| a == "--offline"),
        xlsx: path_arg(&args, "--xlsx"),
        feed: path_arg(&args, "--feed"),
    }
}

fn path_arg(args: &[String], flag: &str) -> Option<PathBuf> {
    let prefix = format!("{flag}=");
    for (idx, arg) in args.iter().enumerate() {
        if let Some(path) = arg.strip_prefix(&prefix) {
            let trimmed = path.trim();
            if !trimmed.is_empty() {
                return Some(PathBuf::from(trimmed));
            }
        }
        if arg == flag {
            let Some(next) = args.get(idx + 1) else {
                continue;
            };
            if !next.trim().is_empty() {
                return Some(PathBuf::from(next));
            }
        }
    }
    None
}
