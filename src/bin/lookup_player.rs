use anyhow::{Result, bail};

use fpl_picker::config::AppConfig;
use fpl_picker::player::{PlayerIdentity, Position};
use fpl_picker::points::estimate;
use fpl_picker::stats_cache::StatsCache;
use fpl_picker::stats_provider::ChainProvider;

// Usage: lookup_player "Full Name" [web_name] [GK|DEF|MID|FWD]
fn main() -> Result<()> {
    let _ = dotenvy::from_filename(".env.local");
    let _ = dotenvy::from_filename(".env");

    let args = std::env::args().skip(1).collect::<Vec<_>>();
    let Some(name) = args.first() else {
        bail!("usage: lookup_player \"Full Name\" [web_name] [GK|DEF|MID|FWD]");
    };
    let identity = PlayerIdentity {
        name: name.clone(),
        web_name: args.get(1).cloned().unwrap_or_else(|| name.clone()),
    };
    let position = args
        .get(2)
        .and_then(|raw| Position::from_code(raw))
        .unwrap_or(Position::Midfielder);

    let config = AppConfig::from_env();
    if let Some(path) = &config.cache_path {
        let cache = StatsCache::open(path)?;
        match cache.snapshot()?.lookup(&identity) {
            Some(hit) => println!(
                "cache: {} ({}) goals={} assists={} minutes={} notes={}",
                hit.league, hit.season, hit.goals, hit.assists, hit.minutes, hit.notes
            ),
            None => println!("cache: miss"),
        }
    }

    let provider = ChainProvider::web(&config.season, config.page_fetcher());
    match provider.resolve(&identity) {
        Some(found) => {
            let s = &found.stats;
            println!(
                "{}: {} goals={} assists={} minutes={} -> {:.1} pts as {}",
                found.source,
                s.league,
                s.goals,
                s.assists,
                s.minutes,
                estimate(s.goals, s.assists, Some(&s.league), position),
                position
            );
        }
        None => println!("no source had stats for {}", identity.search_name()),
    }
    Ok(())
}
