use std::collections::BTreeMap;
use std::time::Duration;

use crate::player::{Player, Position};

#[derive(Debug, Clone, PartialEq)]
pub struct SquadConstraints {
    pub budget: f64,
    /// Share of the budget that must be spent (0.99 means at least 99%).
    pub min_spend_fraction: f64,
    /// Required players per position, indexed by `Position::index`.
    pub quotas: [usize; 4],
    pub max_per_team: usize,
    /// Price granularity; every cost must be a whole multiple of it.
    pub cost_unit: f64,
    pub expected_squad_size: Option<usize>,
    pub time_limit: Option<Duration>,
    pub node_limit: Option<u64>,
}

impl Default for SquadConstraints {
    fn default() -> Self {
        Self {
            budget: 100.0,
            min_spend_fraction: 0.99,
            quotas: [2, 5, 5, 3],
            max_per_team: 3,
            cost_unit: 0.1,
            expected_squad_size: None,
            time_limit: None,
            node_limit: None,
        }
    }
}

impl SquadConstraints {
    pub fn quota(&self, position: Position) -> usize {
        self.quotas[position.index()]
    }

    pub fn with_quota(mut self, position: Position, count: usize) -> Self {
        self.quotas[position.index()] = count;
        self
    }

    pub fn squad_size(&self) -> usize {
        self.quotas.iter().sum()
    }

    pub fn budget_floor(&self) -> f64 {
        self.budget * self.min_spend_fraction
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SolveStatus {
    /// The search completed; no feasible squad scores higher.
    Optimal,
    /// A limit stopped the search; `best_bound` caps what any squad could score.
    Feasible { best_bound: f64 },
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct SolveStats {
    pub nodes: u64,
    pub elapsed: Duration,
}

/// A selected squad, held in listing order: GK, DEF, MID, FWD, then
/// descending projected points within each group.
#[derive(Debug, Clone)]
pub struct Squad {
    players: Vec<Player>,
    status: SolveStatus,
    stats: SolveStats,
}

impl Squad {
    pub(crate) fn new(mut players: Vec<Player>, status: SolveStatus, stats: SolveStats) -> Self {
        sort_for_listing(&mut players);
        Self {
            players,
            status,
            stats,
        }
    }

    pub fn players(&self) -> &[Player] {
        &self.players
    }

    pub fn status(&self) -> SolveStatus {
        self.status
    }

    pub fn is_optimal(&self) -> bool {
        matches!(self.status, SolveStatus::Optimal)
    }

    pub fn stats(&self) -> SolveStats {
        self.stats
    }

    pub fn len(&self) -> usize {
        self.players.len()
    }

    pub fn is_empty(&self) -> bool {
        self.players.is_empty()
    }

    pub fn total_cost(&self) -> f64 {
        self.players.iter().map(|p| p.cost).sum()
    }

    pub fn total_points(&self) -> f64 {
        self.players.iter().map(|p| p.projected_points).sum()
    }

    pub fn count(&self, position: Position) -> usize {
        self.players.iter().filter(|p| p.position == position).count()
    }

    pub fn team_counts(&self) -> BTreeMap<&str, usize> {
        let mut out = BTreeMap::new();
        for p in &self.players {
            *out.entry(p.team.as_str()).or_insert(0) += 1;
        }
        out
    }

    pub fn into_players(self) -> Vec<Player> {
        self.players
    }
}

pub fn sort_for_listing(players: &mut [Player]) {
    players.sort_by(|a, b| {
        a.position
            .index()
            .cmp(&b.position.index())
            .then(b.projected_points.total_cmp(&a.projected_points))
            .then_with(|| a.web_name.cmp(&b.web_name))
    });
}
