use std::collections::HashMap;

use anyhow::{Context, Result, anyhow};
use serde::Deserialize;

use crate::http_cache::fetch_text_cached;
use crate::http_client::{http_client, linear_backoff, with_retries};
use crate::player::{Player, Position};

const FPL_BOOTSTRAP_URL: &str = "https://fantasy.premierleague.com/api/bootstrap-static/";

#[derive(Debug, Deserialize)]
struct BootstrapResponse {
    elements: Vec<Element>,
    teams: Vec<TeamRow>,
}

#[derive(Debug, Deserialize)]
struct TeamRow {
    id: u32,
    name: String,
}

#[derive(Debug, Deserialize)]
struct Element {
    id: u32,
    #[serde(default)]
    first_name: Option<String>,
    #[serde(default)]
    second_name: Option<String>,
    web_name: String,
    element_type: u8,
    team: u32,
    now_cost: i64,
    #[serde(default)]
    total_points: i32,
    #[serde(default)]
    minutes: u32,
}

/// Downloads the bootstrap feed, trying up to `attempts` times.
pub fn fetch_fpl_players(attempts: u32) -> Result<Vec<Player>> {
    let client = http_client()?;
    let raw = with_retries(attempts, linear_backoff, |_| {
        fetch_text_cached(client, FPL_BOOTSTRAP_URL)
    })
    .context("fetch fpl bootstrap")?;
    parse_bootstrap_json(&raw)
}

/// Players from a `bootstrap-static` payload, costs in £m and official
/// season points as the initial projection.
pub fn parse_bootstrap_json(raw: &str) -> Result<Vec<Player>> {
    let payload: BootstrapResponse =
        serde_json::from_str(raw).context("invalid fpl bootstrap json")?;
    let teams: HashMap<u32, String> = payload.teams.into_iter().map(|t| (t.id, t.name)).collect();

    let mut players = Vec::with_capacity(payload.elements.len());
    for el in payload.elements {
        let position = Position::from_element_type(el.element_type).ok_or_else(|| {
            anyhow!(
                "player {} ({}) has unknown element_type {}",
                el.id,
                el.web_name,
                el.element_type
            )
        })?;
        let team = teams
            .get(&el.team)
            .cloned()
            .ok_or_else(|| anyhow!("player {} references unknown team {}", el.id, el.team))?;
        if el.now_cost < 0 {
            return Err(anyhow!("player {} has negative cost {}", el.id, el.now_cost));
        }
        let name = format!(
            "{} {}",
            el.first_name.unwrap_or_default(),
            el.second_name.unwrap_or_default()
        );
        players.push(Player {
            id: el.id,
            name: name.trim().to_string(),
            web_name: el.web_name,
            position,
            team,
            cost: el.now_cost as f64 / 10.0,
            projected_points: f64::from(el.total_points),
            official_points: el.total_points,
            minutes: el.minutes,
            ext_league: None,
            ext_stats: None,
        });
    }
    Ok(players)
}
