use std::env;
use std::path::PathBuf;
use std::time::Duration;

use crate::enrich::EnrichOptions;
use crate::http_client::PageFetcher;
use crate::player::Position;
use crate::squad::SquadConstraints;
use crate::stats_cache::default_cache_path;

const DEFAULT_SOLVE_TIMEOUT_SECS: u64 = 60;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub budget: f64,
    pub min_spend_fraction: f64,
    pub quotas: [usize; 4],
    pub max_per_team: usize,
    pub season: String,
    pub cache_path: Option<PathBuf>,
    pub fetch_parallelism: usize,
    pub solve_timeout: Option<Duration>,
    pub http_attempts: u32,
    pub enrich_all: bool,
    pub offline: bool,
}

impl Default for AppConfig {
    fn default() -> Self {
        let squad = SquadConstraints::default();
        Self {
            budget: squad.budget,
            min_spend_fraction: squad.min_spend_fraction,
            quotas: squad.quotas,
            max_per_team: squad.max_per_team,
            season: "2025/2026".to_string(),
            cache_path: default_cache_path(),
            fetch_parallelism: 10,
            solve_timeout: Some(Duration::from_secs(DEFAULT_SOLVE_TIMEOUT_SECS)),
            http_attempts: 3,
            enrich_all: false,
            offline: false,
        }
    }
}

impl AppConfig {
    pub fn from_env() -> Self {
        let d = Self::default();
        Self {
            budget: env_parse("FPL_BUDGET")
                .filter(|b: &f64| *b > 0.0)
                .unwrap_or(d.budget),
            min_spend_fraction: env_parse("FPL_MIN_SPEND")
                .filter(|f: &f64| *f > 0.0 && *f <= 1.0)
                .unwrap_or(d.min_spend_fraction),
            quotas: opt_env("FPL_SQUAD")
                .and_then(|raw| parse_quotas(&raw))
                .unwrap_or(d.quotas),
            max_per_team: env_parse("FPL_MAX_PER_TEAM")
                .unwrap_or(d.max_per_team)
                .max(1),
            season: opt_env("FPL_SEASON").unwrap_or(d.season),
            cache_path: opt_env("FPL_CACHE_PATH")
                .map(|p| PathBuf::from(p.trim()))
                .or(d.cache_path),
            fetch_parallelism: env_parse("FETCH_PARALLELISM")
                .unwrap_or(d.fetch_parallelism)
                .clamp(1, 32),
            solve_timeout: match env_parse::<u64>("FPL_SOLVE_TIMEOUT_SECS") {
                Some(secs) => solve_timeout_from_secs(secs),
                None => d.solve_timeout,
            },
            http_attempts: env_parse("FPL_HTTP_RETRIES")
                .unwrap_or(d.http_attempts)
                .clamp(1, 10),
            enrich_all: env_flag("FPL_ENRICH_ALL"),
            offline: env_flag("FPL_OFFLINE"),
        }
    }

    pub fn squad_constraints(&self) -> SquadConstraints {
        SquadConstraints {
            budget: self.budget,
            min_spend_fraction: self.min_spend_fraction,
            quotas: self.quotas,
            max_per_team: self.max_per_team,
            time_limit: self.solve_timeout,
            ..SquadConstraints::default()
        }
    }

    pub fn enrich_options(&self) -> EnrichOptions {
        EnrichOptions {
            season: self.season.clone(),
            enrich_all: self.enrich_all,
            parallelism: self.fetch_parallelism,
        }
    }

    pub fn page_fetcher(&self) -> PageFetcher {
        PageFetcher {
            attempts: self.http_attempts,
            ..PageFetcher::default()
        }
    }
}

/// "GK=2,DEF=5,MID=5,FWD=3"; positions left out get a quota of zero.
pub fn parse_quotas(raw: &str) -> Option<[usize; 4]> {
    let mut quotas = [0usize; 4];
    let mut any = false;
    for part in raw.split(',').map(str::trim).filter(|s| !s.is_empty()) {
        let (code, count) = part.split_once('=')?;
        let pos = Position::from_code(code)?;
        quotas[pos.index()] = count.trim().parse().ok()?;
        any = true;
    }
    any.then_some(quotas)
}

/// Zero lifts the limit.
fn solve_timeout_from_secs(secs: u64) -> Option<Duration> {
    (secs > 0).then_some(Duration::from_secs(secs))
}

fn opt_env(key: &str) -> Option<String> {
    env::var(key)
        .ok()
        .and_then(|val| if val.trim().is_empty() { None } else { Some(val) })
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    opt_env(key).and_then(|val| val.trim().parse::<T>().ok())
}

fn env_flag(key: &str) -> bool {
    opt_env(key)
        .map(|raw| {
            matches!(
                raw.trim().to_ascii_lowercase().as_str(),
                "1" | "true" | "yes" | "on"
            )
        })
        .unwrap_or(false)
}
