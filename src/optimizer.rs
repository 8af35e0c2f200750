//! Exact squad selection by branch-and-bound.
//!
//! The problem is a 0/1 program: one inclusion flag per player, maximize total
//! projected points, subject to a budget window, exact per-position counts and
//! a per-team cap. Each search node fixes some flags to in or out and is
//! bounded by a Lagrangian relaxation: the team caps move into the objective
//! as per-team penalties, and what is left (quotas plus budget window) is
//! solved exactly by a per-position knapsack over integer cost units merged
//! across positions. Penalties are tuned by projected subgradient steps.
//!
//! Players whose best completion cannot beat the incumbent are fixed out, and
//! a node whose relaxed pick still breaks a cap branches on one offending
//! player (excluded / forced in). Nodes are expanded best bound first once a
//! squad is known, so a completed search is optimal.

use std::cmp::Ordering;
use std::collections::{BinaryHeap, HashMap};
use std::time::Instant;

use tracing::{debug, info, warn};

use crate::error::{OptimizeError, OptimizeResult};
use crate::player::{Player, Position};
use crate::squad::{SolveStats, SolveStatus, Squad, SquadConstraints};

const EPS: f64 = 1e-7;
const COST_GRID_TOLERANCE: f64 = 1e-6;
const ROOT_ITERATIONS: usize = 80;
const NODE_ITERATIONS: usize = 20;
const MIN_STEP_SCALE: f64 = 1e-3;

pub fn optimize(players: &[Player], constraints: &SquadConstraints) -> OptimizeResult<Squad> {
    let problem = Problem::build(players, constraints)?;
    problem.check_position_supply()?;

    let started = Instant::now();
    let mut search = Search::new(&problem);
    let outcome = search.run(constraints, started);
    let stats = SolveStats {
        nodes: search.nodes,
        elapsed: started.elapsed(),
    };

    let selected_players = |picks: &[usize]| -> Vec<Player> {
        picks
            .iter()
            .map(|&c| players[problem.candidates[c].player].clone())
            .collect()
    };

    match (outcome, search.incumbent) {
        (SearchOutcome::Completed, Some(best)) => {
            info!(
                points = best.value,
                nodes = stats.nodes,
                elapsed_ms = stats.elapsed.as_millis() as u64,
                "optimal squad found"
            );
            Ok(Squad::new(
                selected_players(&best.picks),
                SolveStatus::Optimal,
                stats,
            ))
        }
        (SearchOutcome::Completed, None) => Err(OptimizeError::Infeasible(format!(
            "no selection of {} players fits budget {:.1} (floor {:.1}) with at most {} per team",
            constraints.squad_size(),
            constraints.budget,
            constraints.budget_floor(),
            constraints.max_per_team
        ))),
        (SearchOutcome::Stopped { best_bound }, Some(best)) => {
            warn!(
                points = best.value,
                best_bound,
                nodes = stats.nodes,
                "search stopped early, squad is not proven optimal"
            );
            Ok(Squad::new(
                selected_players(&best.picks),
                SolveStatus::Feasible {
                    best_bound: best_bound.max(best.value),
                },
                stats,
            ))
        }
        (SearchOutcome::Stopped { .. }, None) => Err(OptimizeError::Solver(format!(
            "search stopped after {} nodes ({} ms) before finding a feasible squad",
            stats.nodes,
            stats.elapsed.as_millis()
        ))),
    }
}

#[derive(Debug, Clone)]
struct Candidate {
    player: usize,
    position: usize,
    team: usize,
    cost: usize,
    points: f64,
}

#[derive(Debug)]
struct Problem {
    candidates: Vec<Candidate>,
    by_position: [Vec<usize>; 4],
    team_names: Vec<String>,
    quotas: [usize; 4],
    max_per_team: usize,
    floor: usize,
    ceiling: usize,
    /// Every projection is a whole number, so bounds can be rounded down.
    integral: bool,
}

impl Problem {
    fn build(players: &[Player], constraints: &SquadConstraints) -> OptimizeResult<Self> {
        validate_constraints(constraints)?;
        if players.is_empty() {
            return Err(OptimizeError::InvalidInput("no players supplied".into()));
        }

        let unit = constraints.cost_unit;
        let mut team_index: HashMap<&str, usize> = HashMap::new();
        let mut team_names = Vec::new();
        let mut candidates = Vec::with_capacity(players.len());
        let mut by_position: [Vec<usize>; 4] = Default::default();

        for (idx, p) in players.iter().enumerate() {
            if !p.cost.is_finite() || p.cost < 0.0 {
                return Err(OptimizeError::InvalidInput(format!(
                    "player {} ({}) has invalid cost {}",
                    p.id, p.web_name, p.cost
                )));
            }
            if !p.projected_points.is_finite() {
                return Err(OptimizeError::InvalidInput(format!(
                    "player {} ({}) has non-finite projected points",
                    p.id, p.web_name
                )));
            }
            let units = (p.cost / unit).round();
            if (units * unit - p.cost).abs() > COST_GRID_TOLERANCE * p.cost.max(1.0) {
                return Err(OptimizeError::InvalidInput(format!(
                    "player {} ({}) cost {} is not a multiple of {}",
                    p.id, p.web_name, p.cost, unit
                )));
            }
            let team = *team_index.entry(p.team.as_str()).or_insert_with(|| {
                team_names.push(p.team.clone());
                team_names.len() - 1
            });
            let position = p.position.index();
            by_position[position].push(candidates.len());
            candidates.push(Candidate {
                player: idx,
                position,
                team,
                cost: units as usize,
                points: p.projected_points,
            });
        }

        let ceiling = ((constraints.budget + EPS) / unit).floor() as usize;
        let floor = ((constraints.budget_floor() - EPS) / unit).ceil().max(0.0) as usize;
        let integral = candidates.iter().all(|c| c.points.fract() == 0.0);

        Ok(Self {
            candidates,
            by_position,
            team_names,
            quotas: constraints.quotas,
            max_per_team: constraints.max_per_team,
            floor,
            ceiling,
            integral,
        })
    }

    fn check_position_supply(&self) -> OptimizeResult<()> {
        for pos in Position::ALL {
            let have = self.by_position[pos.index()].len();
            let need = self.quotas[pos.index()];
            if have < need {
                return Err(OptimizeError::Infeasible(format!(
                    "only {have} {pos} available, {need} required"
                )));
            }
        }
        if self.floor > self.ceiling {
            return Err(OptimizeError::Infeasible(
                "budget floor exceeds budget ceiling on the cost grid".into(),
            ));
        }
        Ok(())
    }
}

fn validate_constraints(c: &SquadConstraints) -> OptimizeResult<()> {
    if !c.budget.is_finite() || c.budget <= 0.0 {
        return Err(OptimizeError::InvalidInput(format!(
            "budget must be positive, got {}",
            c.budget
        )));
    }
    if !(c.min_spend_fraction > 0.0 && c.min_spend_fraction <= 1.0) {
        return Err(OptimizeError::InvalidInput(format!(
            "min spend fraction must be in (0, 1], got {}",
            c.min_spend_fraction
        )));
    }
    if !c.cost_unit.is_finite() || c.cost_unit <= 0.0 {
        return Err(OptimizeError::InvalidInput(format!(
            "cost unit must be positive, got {}",
            c.cost_unit
        )));
    }
    if c.max_per_team == 0 {
        return Err(OptimizeError::InvalidInput(
            "max players per team must be at least 1".into(),
        ));
    }
    let size = c.squad_size();
    if size == 0 {
        return Err(OptimizeError::InvalidInput(
            "position quotas sum to zero".into(),
        ));
    }
    if let Some(expected) = c.expected_squad_size
        && expected != size
    {
        return Err(OptimizeError::InvalidInput(format!(
            "position quotas sum to {size} but squad size is {expected}"
        )));
    }
    Ok(())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Fix {
    Free,
    In,
    Out,
}

#[derive(Debug)]
struct Node {
    fixes: Vec<Fix>,
    /// Relaxation value of the parent; no descendant can score more.
    bound: f64,
    /// Team penalties the parent ended on, reused as a warm start.
    lambda: Vec<f64>,
    depth: usize,
}

impl PartialEq for Node {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Node {}

impl PartialOrd for Node {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Node {
    fn cmp(&self, other: &Self) -> Ordering {
        self.bound
            .total_cmp(&other.bound)
            .then(self.depth.cmp(&other.depth))
    }
}

/// Depth-first until a squad is known, best bound first afterwards.
#[derive(Default)]
struct OpenNodes {
    dive: Vec<Node>,
    ranked: BinaryHeap<Node>,
    best_first: bool,
}

impl OpenNodes {
    fn push(&mut self, node: Node) {
        if self.best_first {
            self.ranked.push(node);
        } else {
            self.dive.push(node);
        }
    }

    fn pop(&mut self) -> Option<Node> {
        if self.best_first {
            self.ranked.pop()
        } else {
            self.dive.pop()
        }
    }

    fn switch_to_best_first(&mut self) {
        if !self.best_first {
            self.best_first = true;
            self.ranked.extend(self.dive.drain(..));
        }
    }

    fn len(&self) -> usize {
        self.dive.len() + self.ranked.len()
    }

    fn max_bound(&self) -> f64 {
        self.dive
            .iter()
            .chain(self.ranked.iter())
            .map(|n| n.bound)
            .fold(f64::NEG_INFINITY, f64::max)
    }
}

#[derive(Debug)]
struct Incumbent {
    value: f64,
    picks: Vec<usize>,
}

/// What a node's fixes pin down before relaxing.
#[derive(Debug)]
struct NodeBase {
    fixed: Vec<usize>,
    fixed_points: f64,
    remaining: [usize; 4],
    /// Free slots per team under the cap.
    room: Vec<usize>,
    /// Free candidates per position from teams with room left.
    pools: [Vec<usize>; 4],
    capacity: usize,
    floor: usize,
}

impl NodeBase {
    fn new(problem: &Problem, fixes: &[Fix]) -> Option<Self> {
        let mut fixed = Vec::new();
        let mut fixed_points = 0.0;
        let mut fixed_cost = 0usize;
        let mut fixed_count = [0usize; 4];
        let mut team_fixed = vec![0usize; problem.team_names.len()];

        for (c, fix) in fixes.iter().enumerate() {
            if *fix != Fix::In {
                continue;
            }
            let cand = &problem.candidates[c];
            fixed_count[cand.position] += 1;
            fixed_cost += cand.cost;
            fixed_points += cand.points;
            team_fixed[cand.team] += 1;
            fixed.push(c);
        }

        if fixed_cost > problem.ceiling {
            return None;
        }
        let room = team_fixed
            .iter()
            .map(|&n| problem.max_per_team.checked_sub(n))
            .collect::<Option<Vec<usize>>>()?;
        let mut remaining = [0usize; 4];
        for (pos, slot) in remaining.iter_mut().enumerate() {
            *slot = problem.quotas[pos].checked_sub(fixed_count[pos])?;
        }
        let pools: [Vec<usize>; 4] = std::array::from_fn(|pos| {
            problem.by_position[pos]
                .iter()
                .copied()
                .filter(|&c| fixes[c] == Fix::Free && room[problem.candidates[c].team] > 0)
                .collect()
        });
        if pools.iter().zip(&remaining).any(|(pool, &need)| pool.len() < need) {
            return None;
        }

        Some(Self {
            fixed,
            fixed_points,
            remaining,
            room,
            pools,
            capacity: problem.ceiling - fixed_cost,
            floor: problem.floor.saturating_sub(fixed_cost),
        })
    }
}

/// Knapsack optimum under one set of team penalties.
struct Relaxation {
    /// Upper bound on any squad completing this node.
    bound: f64,
    lambda: Vec<f64>,
    /// Sum of penalty times room; the constant part of the bound.
    credit: f64,
    /// Free candidates picked by the knapsack.
    picks: Vec<usize>,
    team_counts: Vec<usize>,
    tables: Vec<PositionTable>,
}

impl Relaxation {
    fn respects_caps(&self, base: &NodeBase) -> bool {
        self.team_counts
            .iter()
            .zip(&base.room)
            .all(|(count, room)| count <= room)
    }
}

enum SearchOutcome {
    Completed,
    Stopped { best_bound: f64 },
}

struct Search<'a> {
    problem: &'a Problem,
    incumbent: Option<Incumbent>,
    nodes: u64,
}

impl<'a> Search<'a> {
    fn new(problem: &'a Problem) -> Self {
        Self {
            problem,
            incumbent: None,
            nodes: 0,
        }
    }

    fn run(&mut self, constraints: &SquadConstraints, started: Instant) -> SearchOutcome {
        let mut open = OpenNodes::default();
        open.push(Node {
            fixes: vec![Fix::Free; self.problem.candidates.len()],
            bound: f64::INFINITY,
            lambda: vec![0.0; self.problem.team_names.len()],
            depth: 0,
        });

        while let Some(node) = open.pop() {
            if self.cannot_improve(node.bound) {
                continue;
            }
            let out_of_nodes = constraints.node_limit.is_some_and(|max| self.nodes >= max);
            let out_of_time = constraints
                .time_limit
                .is_some_and(|limit| started.elapsed() >= limit);
            if out_of_nodes || out_of_time {
                open.push(node);
                return SearchOutcome::Stopped {
                    best_bound: open.max_bound(),
                };
            }

            self.nodes += 1;
            if self.nodes % 100 == 0 {
                debug!(
                    nodes = self.nodes,
                    open = open.len(),
                    best = ?self.incumbent.as_ref().map(|i| i.value),
                    "branch-and-bound progress"
                );
            }

            self.expand(node, &mut open);
            if self.incumbent.is_some() {
                open.switch_to_best_first();
            }
        }

        SearchOutcome::Completed
    }

    fn expand(&mut self, node: Node, open: &mut OpenNodes) {
        let Some(base) = NodeBase::new(self.problem, &node.fixes) else {
            return;
        };
        let iterations = if node.depth == 0 {
            ROOT_ITERATIONS
        } else {
            NODE_ITERATIONS
        };
        let Some(relaxed) = self.lagrangian_bound(&base, node.lambda, iterations) else {
            return;
        };
        if self.cannot_improve(relaxed.bound) {
            return;
        }
        if !relaxed.respects_caps(&base) {
            if let Some(picks) = self.repair(&base, &relaxed.picks) {
                self.offer(&base, picks);
            }
            if self.cannot_improve(relaxed.bound) {
                return;
            }
        }

        let mut fixes = node.fixes;
        if self.fix_hopeless(&base, &relaxed, &mut fixes) > 0
            && relaxed.picks.iter().any(|&c| fixes[c] == Fix::Out)
        {
            // The relaxed pick lost a player; re-bound before branching.
            open.push(Node {
                fixes,
                bound: relaxed.bound,
                lambda: relaxed.lambda,
                depth: node.depth,
            });
            return;
        }

        let Some(pick) = self.branch_player(&base, &relaxed) else {
            return;
        };
        let mut forced_in = fixes.clone();
        forced_in[pick] = Fix::In;
        let mut excluded = fixes;
        excluded[pick] = Fix::Out;
        // Exclusion is popped first while diving; it tends to reach a feasible squad sooner.
        open.push(Node {
            fixes: forced_in,
            bound: relaxed.bound,
            lambda: relaxed.lambda.clone(),
            depth: node.depth + 1,
        });
        open.push(Node {
            fixes: excluded,
            bound: relaxed.bound,
            lambda: relaxed.lambda,
            depth: node.depth + 1,
        });
    }

    fn cannot_improve(&self, bound: f64) -> bool {
        let bound = if self.problem.integral {
            (bound + 1e-6).floor()
        } else {
            bound
        };
        self.incumbent
            .as_ref()
            .is_some_and(|best| bound <= best.value + EPS)
    }

    fn offer(&mut self, base: &NodeBase, free_picks: Vec<usize>) {
        let mut picks = base.fixed.clone();
        picks.extend(free_picks);
        let value: f64 = picks
            .iter()
            .map(|&c| self.problem.candidates[c].points)
            .sum();
        if self
            .incumbent
            .as_ref()
            .is_none_or(|best| value > best.value + EPS)
        {
            debug!(value, nodes = self.nodes, "new incumbent");
            self.incumbent = Some(Incumbent { value, picks });
        }
    }

    /// Minimizes the penalised bound over team penalties, starting from
    /// `lambda`. Returns the tightest relaxation seen, or `None` when no
    /// completion fits the quotas and budget window at all.
    fn lagrangian_bound(
        &mut self,
        base: &NodeBase,
        mut lambda: Vec<f64>,
        iterations: usize,
    ) -> Option<Relaxation> {
        let mut best: Option<Relaxation> = None;
        let mut scale = 2.0;
        let mut stalled = 0;

        for _ in 0..iterations {
            let relaxed = self.evaluate(base, &lambda)?;
            if relaxed.respects_caps(base) {
                self.offer(base, relaxed.picks.clone());
            }

            // Projected subgradient: room minus picks per team.
            let gradient: Vec<f64> = relaxed
                .team_counts
                .iter()
                .zip(&base.room)
                .zip(&lambda)
                .map(|((&count, &room), &penalty)| {
                    let g = room as f64 - count as f64;
                    if penalty <= 0.0 && g > 0.0 { 0.0 } else { g }
                })
                .collect();
            let norm: f64 = gradient.iter().map(|g| g * g).sum();
            let value = relaxed.bound;

            if best.as_ref().is_none_or(|b| value < b.bound) {
                stalled = 0;
                best = Some(relaxed);
            } else {
                stalled += 1;
            }
            let best_bound = best.as_ref().map_or(value, |b| b.bound);
            if self.cannot_improve(best_bound) || norm == 0.0 {
                break;
            }
            if stalled >= 4 {
                scale /= 2.0;
                stalled = 0;
                if scale < MIN_STEP_SCALE {
                    break;
                }
            }

            let target = match &self.incumbent {
                Some(inc) => inc.value,
                None => best_bound - (0.01 * best_bound.abs()).max(1.0),
            };
            let step = scale * (value - target).max(EPS) / norm;
            for (penalty, g) in lambda.iter_mut().zip(&gradient) {
                *penalty = (*penalty - step * g).max(0.0);
            }
        }
        best
    }

    fn evaluate(&self, base: &NodeBase, lambda: &[f64]) -> Option<Relaxation> {
        let candidates = &self.problem.candidates;
        let weight = |c: usize| candidates[c].points - lambda[candidates[c].team];
        let tables: Vec<PositionTable> = (0..4)
            .map(|pos| {
                PositionTable::solve(
                    candidates,
                    base.pools[pos].clone(),
                    base.remaining[pos],
                    base.capacity,
                    &weight,
                )
            })
            .collect();

        // merged[c]: best weight over all positions at exact total cost c.
        let mut merged = tables[0].best_row().to_vec();
        let mut splits: Vec<Vec<usize>> = Vec::with_capacity(3);
        for table in &tables[1..] {
            let (row, split) = convolve(&merged, table.best_row(), base.capacity);
            merged = row;
            splits.push(split);
        }

        let (mut cost, best) = merged
            .iter()
            .copied()
            .enumerate()
            .skip(base.floor)
            .filter(|(_, v)| v.is_finite())
            .max_by(|a, b| a.1.total_cmp(&b.1))?;

        let mut picks = Vec::with_capacity(base.remaining.iter().sum());
        for pos in (1..4).rev() {
            let spent = splits[pos - 1][cost];
            picks.extend(tables[pos].picks_at(candidates, spent));
            cost -= spent;
        }
        picks.extend(tables[0].picks_at(candidates, cost));

        let mut team_counts = vec![0usize; base.room.len()];
        for &c in &picks {
            team_counts[candidates[c].team] += 1;
        }
        let credit: f64 = lambda
            .iter()
            .zip(&base.room)
            .map(|(penalty, &room)| penalty * room as f64)
            .sum();

        Some(Relaxation {
            bound: base.fixed_points + credit + best,
            lambda: lambda.to_vec(),
            credit,
            picks,
            team_counts,
            tables,
        })
    }

    /// Swaps players out of over-cap teams for the cheapest loss in points,
    /// staying inside the budget window. `None` when some team cannot be fixed.
    fn repair(&self, base: &NodeBase, picks: &[usize]) -> Option<Vec<usize>> {
        let candidates = &self.problem.candidates;
        let mut picks = picks.to_vec();
        let mut chosen = vec![false; candidates.len()];
        let mut counts = vec![0usize; base.room.len()];
        let mut spent = 0usize;
        for &c in &picks {
            chosen[c] = true;
            counts[candidates[c].team] += 1;
            spent += candidates[c].cost;
        }

        while let Some(team) = (0..counts.len()).find(|&t| counts[t] > base.room[t]) {
            let mut swap: Option<(usize, usize, f64)> = None;
            for (slot, &out) in picks.iter().enumerate() {
                let leaving = &candidates[out];
                if leaving.team != team {
                    continue;
                }
                for &inc in &base.pools[leaving.position] {
                    let arriving = &candidates[inc];
                    if chosen[inc]
                        || arriving.team == team
                        || counts[arriving.team] >= base.room[arriving.team]
                    {
                        continue;
                    }
                    let cost = spent - leaving.cost + arriving.cost;
                    if cost < base.floor || cost > base.capacity {
                        continue;
                    }
                    let loss = leaving.points - arriving.points;
                    if swap.is_none_or(|(_, _, least)| loss < least) {
                        swap = Some((slot, inc, loss));
                    }
                }
            }

            let (slot, inc, _) = swap?;
            let out = picks[slot];
            chosen[out] = false;
            chosen[inc] = true;
            counts[candidates[out].team] -= 1;
            counts[candidates[inc].team] += 1;
            spent = spent - candidates[out].cost + candidates[inc].cost;
            picks[slot] = inc;
        }
        Some(picks)
    }

    /// Fixes out every free candidate whose best penalised completion cannot
    /// beat the incumbent. Returns how many were fixed.
    fn fix_hopeless(&self, base: &NodeBase, relaxed: &Relaxation, fixes: &mut [Fix]) -> usize {
        if self.incumbent.is_none() {
            return 0;
        }
        let candidates = &self.problem.candidates;
        let capacity = base.capacity;
        let rows: Vec<&[f64]> = relaxed.tables.iter().map(PositionTable::best_row).collect();
        let others = leave_one_out(&rows, capacity);
        let offset = base.fixed_points + relaxed.credit;

        let mut fixed = 0;
        for (pos, table) in relaxed.tables.iter().enumerate() {
            if table.count == 0 {
                continue;
            }
            // Best over the rest of the squad with one slot of `pos` held open.
            let (partial, _) = convolve(table.row(table.count - 1), &others[pos], capacity);
            for &c in &table.pool {
                let cand = &candidates[c];
                let rest = if cand.cost > capacity {
                    f64::NEG_INFINITY
                } else {
                    let lo = base.floor.saturating_sub(cand.cost);
                    partial[lo..=capacity - cand.cost]
                        .iter()
                        .copied()
                        .fold(f64::NEG_INFINITY, f64::max)
                };
                let reach = offset + cand.points - relaxed.lambda[cand.team] + rest;
                if self.cannot_improve(reach) {
                    fixes[c] = Fix::Out;
                    fixed += 1;
                }
            }
        }
        fixed
    }

    /// Weakest pick of the team furthest over its cap; with every cap met,
    /// the pick from the most heavily penalised team.
    fn branch_player(&self, base: &NodeBase, relaxed: &Relaxation) -> Option<usize> {
        let candidates = &self.problem.candidates;
        let over = relaxed
            .team_counts
            .iter()
            .zip(&base.room)
            .enumerate()
            .filter(|(_, (count, room))| count > room)
            .max_by_key(|(_, (count, room))| **count - **room)
            .map(|(team, _)| team);

        match over {
            Some(team) => relaxed
                .picks
                .iter()
                .copied()
                .filter(|&c| candidates[c].team == team)
                .min_by(|&a, &b| candidates[a].points.total_cmp(&candidates[b].points)),
            None => relaxed.picks.iter().copied().max_by(|&a, &b| {
                relaxed.lambda[candidates[a].team].total_cmp(&relaxed.lambda[candidates[b].team])
            }),
        }
    }
}

/// Max-plus convolution of two cost-indexed rows, cut at `capacity`. The
/// second vector records how much of each total came from `b`.
fn convolve(a: &[f64], b: &[f64], capacity: usize) -> (Vec<f64>, Vec<usize>) {
    let reachable: Vec<usize> = (0..=capacity).filter(|&c| b[c].is_finite()).collect();
    let mut out = vec![f64::NEG_INFINITY; capacity + 1];
    let mut split = vec![0usize; capacity + 1];
    for (from_a, &va) in a.iter().enumerate().take(capacity + 1) {
        if !va.is_finite() {
            continue;
        }
        for &from_b in &reachable {
            let total = from_a + from_b;
            if total > capacity {
                break;
            }
            let value = va + b[from_b];
            if value > out[total] {
                out[total] = value;
                split[total] = from_b;
            }
        }
    }
    (out, split)
}

/// For each row, the merge of every other row.
fn leave_one_out(rows: &[&[f64]], capacity: usize) -> Vec<Vec<f64>> {
    let mut empty = vec![f64::NEG_INFINITY; capacity + 1];
    empty[0] = 0.0;

    let mut prefix = vec![empty.clone()];
    for (k, row) in rows.iter().enumerate() {
        let (merged, _) = convolve(&prefix[k], row, capacity);
        prefix.push(merged);
    }
    let mut suffix = vec![empty; rows.len() + 1];
    for k in (0..rows.len()).rev() {
        suffix[k] = convolve(rows[k], &suffix[k + 1], capacity).0;
    }
    (0..rows.len())
        .map(|k| convolve(&prefix[k], &suffix[k + 1], capacity).0)
        .collect()
}

/// Exact-count knapsack over one position's free candidates.
struct PositionTable {
    pool: Vec<usize>,
    count: usize,
    width: usize,
    /// best[j * width + c]: max weight picking j candidates at exact cost c.
    best: Vec<f64>,
    /// took[(i * (count + 1) + j) * width + c]: pool[i] raised that state.
    took: Vec<bool>,
}

impl PositionTable {
    fn solve(
        candidates: &[Candidate],
        pool: Vec<usize>,
        count: usize,
        capacity: usize,
        weight: impl Fn(usize) -> f64,
    ) -> Self {
        let width = capacity + 1;
        let layers = count + 1;
        let mut best = vec![f64::NEG_INFINITY; layers * width];
        best[0] = 0.0;
        let mut took = vec![false; pool.len() * layers * width];
        // reach[j]: cost span layer j has reached so far.
        let mut reach: Vec<Option<(usize, usize)>> = vec![None; layers];
        reach[0] = Some((0, 0));

        for (i, &c) in pool.iter().enumerate() {
            let cost = candidates[c].cost;
            if cost > capacity {
                continue;
            }
            let w = weight(c);
            for j in (1..layers).rev() {
                let Some((lo, hi)) = reach[j - 1] else {
                    continue;
                };
                let start = lo + cost;
                if start > capacity {
                    continue;
                }
                let end = (hi + cost).min(capacity);
                for total in start..=end {
                    let from = best[(j - 1) * width + total - cost];
                    if !from.is_finite() {
                        continue;
                    }
                    let value = from + w;
                    let slot = j * width + total;
                    if value > best[slot] {
                        best[slot] = value;
                        took[(i * layers + j) * width + total] = true;
                    }
                }
                reach[j] = Some(match reach[j] {
                    Some((a, b)) => (a.min(start), b.max(end)),
                    None => (start, end),
                });
            }
        }

        Self {
            pool,
            count,
            width,
            best,
            took,
        }
    }

    fn row(&self, j: usize) -> &[f64] {
        &self.best[j * self.width..(j + 1) * self.width]
    }

    fn best_row(&self) -> &[f64] {
        self.row(self.count)
    }

    fn picks_at(&self, candidates: &[Candidate], mut cost: usize) -> Vec<usize> {
        let layers = self.count + 1;
        let mut j = self.count;
        let mut out = Vec::with_capacity(self.count);
        for i in (0..self.pool.len()).rev() {
            if j == 0 {
                break;
            }
            if self.took[(i * layers + j) * self.width + cost] {
                let c = self.pool[i];
                out.push(c);
                cost -= candidates[c].cost;
                j -= 1;
            }
        }
        out
    }
}
