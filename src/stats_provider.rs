use anyhow::{Context, Result};
use reqwest::Url;
use tracing::{debug, warn};

use crate::html::{attr, has_class, open_tag, row_cells, strip_tags, tag_blocks};
use crate::http_client::PageFetcher;
use crate::player::{ExternalStats, PlayerIdentity};

const TRANSFERMARKT_BASE: &str = "https://www.transfermarkt.com";
const TRANSFERMARKT_SEARCH: &str =
    "https://www.transfermarkt.com/schnellsuche/ergebnis/schnellsuche";
const FBREF_BASE: &str = "https://fbref.com";
const FBREF_SEARCH: &str = "https://fbref.com/en/search/search.fcgi";

pub const FBREF_LEAGUE: &str = "Unknown (FBref)";

/// A source of per-season player stats.
pub trait StatsProvider: Send + Sync {
    fn name(&self) -> &str;

    /// `Ok(None)` when the source has no line for this player.
    fn lookup(&self, identity: &PlayerIdentity) -> Result<Option<ExternalStats>>;
}

#[derive(Debug, Clone, PartialEq)]
pub struct Resolved {
    pub stats: ExternalStats,
    pub source: String,
}

/// Tries each provider in order; provider errors count as a miss.
#[derive(Default)]
pub struct ChainProvider {
    providers: Vec<Box<dyn StatsProvider>>,
}

impl ChainProvider {
    pub fn new(providers: Vec<Box<dyn StatsProvider>>) -> Self {
        Self { providers }
    }

    pub fn web(season: &str, fetcher: PageFetcher) -> Self {
        Self::new(vec![
            Box::new(TransfermarktProvider::new(season, fetcher.clone())),
            Box::new(FbrefProvider::new(season, fetcher)),
        ])
    }

    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }

    pub fn resolve(&self, identity: &PlayerIdentity) -> Option<Resolved> {
        for provider in &self.providers {
            debug!(player = identity.search_name(), source = provider.name(), "lookup");
            match provider.lookup(identity) {
                Ok(Some(stats)) => {
                    return Some(Resolved {
                        stats,
                        source: provider.name().to_string(),
                    });
                }
                Ok(None) => {}
                Err(err) => warn!(
                    player = identity.search_name(),
                    source = provider.name(),
                    error = %err,
                    "lookup failed"
                ),
            }
        }
        None
    }
}

pub struct TransfermarktProvider {
    season: String,
    fetcher: PageFetcher,
}

impl TransfermarktProvider {
    pub fn new(season: &str, fetcher: PageFetcher) -> Self {
        Self {
            season: season.to_string(),
            fetcher,
        }
    }
}

impl StatsProvider for TransfermarktProvider {
    fn name(&self) -> &str {
        "Transfermarkt"
    }

    fn lookup(&self, identity: &PlayerIdentity) -> Result<Option<ExternalStats>> {
        let url = Url::parse_with_params(TRANSFERMARKT_SEARCH, &[("query", identity.search_name())])
            .context("build transfermarkt search url")?;
        let Some(search) = self.fetcher.get(url.as_str())? else {
            return Ok(None);
        };
        let Some(profile) = parse_transfermarkt_search(&search) else {
            return Ok(None);
        };
        let Some(page) = self.fetcher.get(&profile)? else {
            return Ok(None);
        };
        Ok(parse_transfermarkt_profile(&page, &self.season))
    }
}

pub struct FbrefProvider {
    season: String,
    fetcher: PageFetcher,
}

impl FbrefProvider {
    pub fn new(season: &str, fetcher: PageFetcher) -> Self {
        Self {
            season: season.to_string(),
            fetcher,
        }
    }
}

impl StatsProvider for FbrefProvider {
    fn name(&self) -> &str {
        "FBref"
    }

    fn lookup(&self, identity: &PlayerIdentity) -> Result<Option<ExternalStats>> {
        let url = Url::parse_with_params(FBREF_SEARCH, &[("search", identity.search_name())])
            .context("build fbref search url")?;
        let Some(search) = self.fetcher.get(url.as_str())? else {
            return Ok(None);
        };
        let Some(profile) = parse_fbref_search(&search) else {
            return Ok(None);
        };
        let Some(page) = self.fetcher.get(&profile)? else {
            return Ok(None);
        };
        Ok(parse_fbref_profile(&page, season_start_year(&self.season)))
    }
}

/// "2025/2026" -> "2025".
pub fn season_start_year(season: &str) -> &str {
    season.split('/').next().unwrap_or(season).trim()
}

/// Absolute profile URL of the first player hit on a quick-search page.
pub fn parse_transfermarkt_search(html: &str) -> Option<String> {
    tag_blocks(html, "a")
        .into_iter()
        .map(open_tag)
        .filter(|tag| has_class(tag, "spielprofil_tooltip"))
        .find_map(|tag| attr(tag, "href"))
        .map(|href| absolute(TRANSFERMARKT_BASE, href))
}

/// Goals, assists and minutes are the last three numeric cells of the
/// season's row; the league is the row's first link.
pub fn parse_transfermarkt_profile(html: &str, season: &str) -> Option<ExternalStats> {
    let table = tag_blocks(html, "table")
        .into_iter()
        .find(|t| has_class(open_tag(t), "items"));
    let rows = match table {
        Some(table) => tag_blocks(table, "tr"),
        None => tag_blocks(html, "tr"),
    };
    for row in rows {
        if !strip_tags(row).contains(season) {
            continue;
        }
        let nums: Vec<u32> = row_cells(row)
            .iter()
            .filter_map(|cell| parse_count(cell, true))
            .collect();
        let from_end = |k: usize| {
            nums.len()
                .checked_sub(k)
                .and_then(|i| nums.get(i))
                .copied()
                .unwrap_or(0)
        };
        let league = tag_blocks(row, "a")
            .first()
            .map(|a| strip_tags(a))
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| ExternalStats::UNKNOWN_LEAGUE.to_string());
        return Some(ExternalStats {
            league,
            goals: from_end(3),
            assists: from_end(2),
            minutes: from_end(1),
        });
    }
    None
}

pub fn parse_fbref_search(html: &str) -> Option<String> {
    tag_blocks(html, "div")
        .into_iter()
        .filter(|d| has_class(open_tag(d), "search-item-name"))
        .find_map(|d| {
            tag_blocks(d, "a")
                .first()
                .copied()
                .and_then(|a| attr(open_tag(a), "href"))
        })
        .map(|href| absolute(FBREF_BASE, href))
}

/// Goals and assists are the 4th- and 3rd-from-last numeric cells of the first
/// "Standard" table row mentioning the season's start year. FBref carries no
/// league or minutes we trust here.
pub fn parse_fbref_profile(html: &str, season_year: &str) -> Option<ExternalStats> {
    for table in tag_blocks(html, "table") {
        if !strip_tags(table).contains("Standard") {
            continue;
        }
        for row in tag_blocks(table, "tr") {
            if !strip_tags(row).contains(season_year) {
                continue;
            }
            let nums: Vec<u32> = row_cells(row)
                .iter()
                .filter_map(|cell| parse_count(cell, false))
                .collect();
            let from_end = |k: usize| {
                nums.len()
                    .checked_sub(k)
                    .and_then(|i| nums.get(i))
                    .copied()
                    .unwrap_or(0)
            };
            return Some(ExternalStats {
                league: FBREF_LEAGUE.to_string(),
                goals: from_end(4),
                assists: from_end(3),
                minutes: 0,
            });
        }
    }
    None
}

/// Whole-number cell; `thousands_dots` accepts "1.234" as 1234.
fn parse_count(cell: &str, thousands_dots: bool) -> Option<u32> {
    let cell = cell.trim();
    let digits: String = if thousands_dots {
        cell.chars().filter(|c| *c != '.').collect()
    } else {
        cell.to_string()
    };
    if digits.is_empty() || !digits.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    digits.parse().ok()
}

fn absolute(base: &str, href: &str) -> String {
    if href.starts_with("http://") || href.starts_with("https://") {
        href.to_string()
    } else {
        format!("{base}{href}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transfermarkt_search_takes_first_profile_link() {
        let html = r#"<div><a href="/verein/1">Club</a>
            <a class="spielprofil_tooltip" href="/joao/profil/spieler/42">Joao</a>
            <a class="spielprofil_tooltip" href="/other/profil/spieler/7">Other</a></div>"#;
        assert_eq!(
            parse_transfermarkt_search(html).as_deref(),
            Some("https://www.transfermarkt.com/joao/profil/spieler/42")
        );
        assert!(parse_transfermarkt_search("<a href='/x'>x</a>").is_none());
    }

    #[test]
    fn transfermarkt_profile_reads_season_row() {
        let html = r#"<table class="items">
            <tr><th>Season</th><th>Comp</th><th>Apps</th><th>G</th><th>A</th><th>Min</th></tr>
            <tr><td>2024/2025</td><td><a href="/x">Ligue 1</a></td><td>30</td><td>3</td><td>2</td><td>2.400'</td></tr>
            <tr><td>2025/2026</td><td><a href="/y">Eredivisie</a></td><td>31</td><td>12</td><td>7</td><td>2.612</td></tr>
            </table>"#;
        let stats = parse_transfermarkt_profile(html, "2025/2026").unwrap();
        assert_eq!(stats.league, "Eredivisie");
        assert_eq!((stats.goals, stats.assists, stats.minutes), (12, 7, 2612));
        assert!(parse_transfermarkt_profile(html, "2019/2020").is_none());
    }

    #[test]
    fn fbref_profile_uses_standard_table() {
        let html = r#"<table><tr><td>2025-2026</td><td>99</td></tr></table>
            <table><caption>Standard Stats</caption>
            <tr><th>2025-2026</th><td>21</td><td>28</td><td>9</td><td>4</td><td>13</td><td>1</td></tr>
            </table>"#;
        let stats = parse_fbref_profile(html, "2025").unwrap();
        assert_eq!(stats.league, FBREF_LEAGUE);
        assert_eq!((stats.goals, stats.assists, stats.minutes), (9, 4, 0));
    }

    #[test]
    fn fbref_search_prefixes_host() {
        let html = r#"<div class="search-item-name"><strong><a href="/en/players/abc/Name">Name</a></strong></div>"#;
        assert_eq!(
            parse_fbref_search(html).as_deref(),
            Some("https://fbref.com/en/players/abc/Name")
        );
    }

    struct Fixed(&'static str, Option<ExternalStats>);

    impl StatsProvider for Fixed {
        fn name(&self) -> &str {
            self.0
        }

        fn lookup(&self, _identity: &PlayerIdentity) -> Result<Option<ExternalStats>> {
            if self.0 == "broken" {
                anyhow::bail!("boom");
            }
            Ok(self.1.clone())
        }
    }

    #[test]
    fn chain_skips_misses_and_errors() {
        let hit = ExternalStats {
            league: "MLS".into(),
            goals: 5,
            assists: 1,
            minutes: 900,
        };
        let chain = ChainProvider::new(vec![
            Box::new(Fixed("broken", None)),
            Box::new(Fixed("empty", None)),
            Box::new(Fixed("good", Some(hit.clone()))),
        ]);
        let id = PlayerIdentity {
            name: "A B".into(),
            web_name: "B".into(),
        };
        assert_eq!(
            chain.resolve(&id),
            Some(Resolved {
                stats: hit,
                source: "good".into()
            })
        );
        assert!(ChainProvider::default().resolve(&id).is_none());
    }
}
