use rayon::prelude::*;
use tracing::{debug, info};

use crate::player::{ExternalStats, Player};
use crate::points::estimate_record;
use crate::stats_cache::{CacheSnapshot, StatsRecord};
use crate::stats_provider::ChainProvider;

#[derive(Debug, Clone)]
pub struct EnrichOptions {
    pub season: String,
    /// Re-estimate every player, not only those without official data.
    pub enrich_all: bool,
    pub parallelism: usize,
}

impl Default for EnrichOptions {
    fn default() -> Self {
        Self {
            season: "2025/2026".to_string(),
            enrich_all: false,
            parallelism: 10,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct EnrichOutcome {
    /// Same players, same order, with estimates filled in.
    pub players: Vec<Player>,
    /// Lookups not yet in the cache, in player order. No two share a name.
    pub new_records: Vec<StatsRecord>,
    pub enriched: usize,
    pub cache_hits: usize,
}

enum Source {
    Untouched,
    Cached,
    Fresh(StatsRecord),
}

/// Fills projected points for players lacking official data. Lookups run in
/// parallel against a read-only snapshot; nothing is written here, the caller
/// persists `new_records` once afterwards.
pub fn enrich_players(
    players: Vec<Player>,
    snapshot: &CacheSnapshot,
    provider: &ChainProvider,
    opts: &EnrichOptions,
) -> EnrichOutcome {
    let results: Vec<(Player, Source)> = with_fetch_pool(opts.parallelism, || {
        players
            .into_par_iter()
            .map(|player| enrich_single(player, snapshot, provider, opts))
            .collect()
    });

    let mut outcome = EnrichOutcome {
        players: Vec::with_capacity(results.len()),
        ..Default::default()
    };
    for (player, source) in results {
        match source {
            Source::Untouched => {}
            Source::Cached => {
                outcome.enriched += 1;
                outcome.cache_hits += 1;
            }
            Source::Fresh(record) => {
                outcome.enriched += 1;
                // A record sharing either name with an earlier one would never be read back.
                let identity = record.identity();
                if !outcome.new_records.iter().any(|r| r.matches(&identity)) {
                    outcome.new_records.push(record);
                }
            }
        }
        outcome.players.push(player);
    }

    info!(
        players = outcome.players.len(),
        enriched = outcome.enriched,
        cache_hits = outcome.cache_hits,
        new_records = outcome.new_records.len(),
        "enrichment finished"
    );
    outcome
}

fn enrich_single(
    mut player: Player,
    snapshot: &CacheSnapshot,
    provider: &ChainProvider,
    opts: &EnrichOptions,
) -> (Player, Source) {
    if !opts.enrich_all && !player.lacks_official_data() {
        return (player, Source::Untouched);
    }

    let identity = player.identity();
    let (record, source) = match snapshot.lookup(&identity) {
        Some(hit) => (hit.clone(), Source::Cached),
        None => {
            let record = match provider.resolve(&identity) {
                Some(found) => StatsRecord::new(&identity, found.stats, &opts.season, &found.source),
                None => StatsRecord::new(
                    &identity,
                    ExternalStats::unknown(),
                    &opts.season,
                    StatsRecord::NO_SOURCE,
                ),
            };
            (record.clone(), Source::Fresh(record))
        }
    };

    let points = estimate_record(&record, player.position);
    debug!(
        player = identity.search_name(),
        league = %record.league,
        goals = record.goals,
        assists = record.assists,
        points,
        "estimated"
    );
    player.projected_points = points;
    player.ext_league = Some(record.league.clone());
    player.ext_stats = Some(record.stats());
    (player, source)
}

fn with_fetch_pool<T>(threads: usize, action: impl FnOnce() -> T + Send) -> T
where
    T: Send,
{
    match rayon::ThreadPoolBuilder::new()
        .num_threads(threads.clamp(1, 32))
        .build()
    {
        Ok(pool) => pool.install(action),
        Err(_) => action(),
    }
}
