use std::collections::HashMap;
use std::time::Duration;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use fpl_picker::{OptimizeError, Player, Position, SolveStatus, Squad, SquadConstraints, optimize};

fn player(id: u32, pos: Position, team: &str, cost: f64, pts: f64) -> Player {
    Player {
        id,
        name: format!("Player {id}"),
        web_name: format!("P{id}"),
        position: pos,
        team: team.to_string(),
        cost,
        projected_points: pts,
        official_points: pts as i32,
        minutes: 900,
        ext_league: None,
        ext_stats: None,
    }
}

fn only(position: Position, count: usize, budget: f64, min_spend: f64, per_team: usize) -> SquadConstraints {
    SquadConstraints {
        budget,
        min_spend_fraction: min_spend,
        quotas: [0; 4],
        max_per_team: per_team,
        ..SquadConstraints::default()
    }
    .with_quota(position, count)
}

fn ids(squad: &Squad) -> Vec<u32> {
    let mut ids: Vec<u32> = squad.players().iter().map(|p| p.id).collect();
    ids.sort_unstable();
    ids
}

fn assert_invariants(squad: &Squad, c: &SquadConstraints) {
    assert_eq!(squad.len(), c.squad_size());
    for pos in Position::ALL {
        assert_eq!(squad.count(pos), c.quota(pos), "count for {pos}");
    }
    for (team, n) in squad.team_counts() {
        assert!(n <= c.max_per_team, "{team} has {n}");
    }
    let cost = squad.total_cost();
    assert!(cost <= c.budget + 1e-6, "cost {cost} over budget");
    assert!(cost >= c.budget_floor() - 1e-6, "cost {cost} under floor");
}

/// Best total over every subset; `None` when nothing is feasible.
fn brute_force(players: &[Player], c: &SquadConstraints) -> Option<f64> {
    let n = players.len();
    let size = c.squad_size();
    let ceiling = (c.budget * 10.0).round() as i64;
    let floor = (c.budget_floor() * 10.0 - 1e-9).ceil() as i64;
    let mut best: Option<f64> = None;
    for mask in 0u32..(1 << n) {
        if mask.count_ones() as usize != size {
            continue;
        }
        let mut counts = [0usize; 4];
        let mut teams: HashMap<&str, usize> = HashMap::new();
        let mut cost = 0i64;
        let mut points = 0.0;
        for (i, p) in players.iter().enumerate() {
            if mask & (1 << i) == 0 {
                continue;
            }
            counts[p.position.index()] += 1;
            *teams.entry(p.team.as_str()).or_insert(0) += 1;
            cost += (p.cost * 10.0).round() as i64;
            points += p.projected_points;
        }
        if counts != c.quotas || cost > ceiling || cost < floor {
            continue;
        }
        if teams.values().any(|&t| t > c.max_per_team) {
            continue;
        }
        if best.is_none_or(|b| points > b) {
            best = Some(points);
        }
    }
    best
}

#[test]
fn picks_unique_best_goalkeeper() {
    let players = vec![
        player(1, Position::Goalkeeper, "A", 4.0, 40.0),
        player(2, Position::Goalkeeper, "B", 4.0, 45.0),
        player(3, Position::Goalkeeper, "C", 5.0, 50.0),
    ];
    let c = only(Position::Goalkeeper, 1, 10.0, 0.1, 3);
    let squad = optimize(&players, &c).unwrap();
    assert_eq!(ids(&squad), vec![3]);
    assert!(squad.is_optimal());
    assert_eq!(squad.status(), SolveStatus::Optimal);
}

#[test]
fn team_cap_forces_substitute_from_elsewhere() {
    let players = vec![
        player(1, Position::Defender, "A", 5.0, 10.0),
        player(2, Position::Defender, "A", 5.0, 8.0),
        player(3, Position::Defender, "B", 5.0, 5.0),
        player(4, Position::Defender, "C", 5.0, 3.0),
    ];
    let c = only(Position::Defender, 2, 10.0, 0.5, 1);
    let squad = optimize(&players, &c).unwrap();
    assert_eq!(ids(&squad), vec![1, 3]);
    assert_eq!(squad.total_points(), 15.0);
    assert_invariants(&squad, &c);
}

#[test]
fn budget_floor_can_override_points() {
    let players = vec![
        player(1, Position::Goalkeeper, "A", 4.0, 60.0),
        player(2, Position::Goalkeeper, "B", 5.0, 10.0),
    ];
    let c = only(Position::Goalkeeper, 1, 5.0, 0.99, 3);
    let squad = optimize(&players, &c).unwrap();
    assert_eq!(ids(&squad), vec![2]);
}

#[test]
fn short_position_is_infeasible() {
    let players = vec![
        player(1, Position::Goalkeeper, "A", 4.5, 30.0),
        player(2, Position::Defender, "B", 4.5, 30.0),
    ];
    let c = SquadConstraints {
        budget: 20.0,
        min_spend_fraction: 0.1,
        quotas: [2, 1, 0, 0],
        ..SquadConstraints::default()
    };
    let err = optimize(&players, &c).unwrap_err();
    assert!(matches!(err, OptimizeError::Infeasible(_)), "{err}");
}

#[test]
fn team_caps_can_make_it_infeasible() {
    let players = vec![
        player(1, Position::Defender, "A", 4.0, 1.0),
        player(2, Position::Defender, "A", 4.0, 1.0),
        player(3, Position::Defender, "A", 4.0, 1.0),
    ];
    let c = only(Position::Defender, 3, 12.0, 0.5, 2);
    let err = optimize(&players, &c).unwrap_err();
    assert!(matches!(err, OptimizeError::Infeasible(_)), "{err}");
}

#[test]
fn budget_window_can_make_it_infeasible() {
    let players = vec![
        player(1, Position::Forward, "A", 4.0, 1.0),
        player(2, Position::Forward, "B", 9.0, 1.0),
    ];
    let c = only(Position::Forward, 1, 8.0, 0.99, 3);
    let err = optimize(&players, &c).unwrap_err();
    assert!(matches!(err, OptimizeError::Infeasible(_)), "{err}");
}

#[test]
fn invalid_players_rejected_before_solving() {
    let mut bad = player(1, Position::Forward, "A", 5.0, 1.0);
    bad.cost = -1.0;
    let c = only(Position::Forward, 1, 10.0, 0.1, 3);
    assert!(matches!(
        optimize(&[bad], &c),
        Err(OptimizeError::InvalidInput(_))
    ));
    assert!(matches!(
        optimize(&[], &c),
        Err(OptimizeError::InvalidInput(_))
    ));

    let mut nan = player(2, Position::Forward, "A", 5.0, 1.0);
    nan.projected_points = f64::NAN;
    assert!(matches!(
        optimize(&[nan], &c),
        Err(OptimizeError::InvalidInput(_))
    ));
}

#[test]
fn matches_brute_force_on_small_instances() {
    let c = SquadConstraints {
        budget: 33.0,
        min_spend_fraction: 0.9,
        quotas: [1, 2, 2, 1],
        max_per_team: 2,
        ..SquadConstraints::default()
    };
    let mut solved = 0;
    for seed in 0..40u64 {
        let mut rng = StdRng::seed_from_u64(seed);
        let players: Vec<Player> = (0..14u32)
            .map(|i| {
                let pos = Position::ALL[(i as usize) % 4];
                let team = ["A", "B", "C"][rng.gen_range(0..3)];
                let cost = rng.gen_range(8..=16) as f64 * 0.5;
                let pts = rng.gen_range(0..120) as f64;
                player(i, pos, team, cost, pts)
            })
            .collect();

        let expected = brute_force(&players, &c);
        match (optimize(&players, &c), expected) {
            (Ok(squad), Some(best)) => {
                assert_invariants(&squad, &c);
                assert!(squad.is_optimal());
                assert!(
                    (squad.total_points() - best).abs() < 1e-6,
                    "seed {seed}: got {} expected {best}",
                    squad.total_points()
                );
                solved += 1;
            }
            (Err(OptimizeError::Infeasible(_)), None) => {}
            (got, want) => panic!("seed {seed}: got {got:?}, brute force {want:?}"),
        }
    }
    assert!(solved > 0, "generator produced no feasible instance");
}

#[test]
fn full_squad_respects_every_constraint() {
    let mut rng = StdRng::seed_from_u64(7);
    let mut players = Vec::new();
    let mut id = 0u32;
    for team in 0..10 {
        for slot in 0..12 {
            let pos = match slot {
                0 | 1 => Position::Goalkeeper,
                2..=5 => Position::Defender,
                6..=9 => Position::Midfielder,
                _ => Position::Forward,
            };
            let cost = rng.gen_range(40..=120) as f64 / 10.0;
            // Points loosely track price so the budget actually binds.
            let pts = (cost * 15.0 + rng.gen_range(-40.0..40.0)).max(0.0).round();
            players.push(player(id, pos, &format!("Team {team}"), cost, pts));
            id += 1;
        }
    }

    let c = SquadConstraints::default();
    let squad = optimize(&players, &c).unwrap();
    assert_invariants(&squad, &c);
    assert!(squad.is_optimal());

    let order: Vec<usize> = squad.players().iter().map(|p| p.position.index()).collect();
    assert!(order.windows(2).all(|w| w[0] <= w[1]));
}

#[test]
fn node_limit_after_first_squad_reports_bound() {
    // Only B+C fits the exact budget under the cap. Dropping the cap lets the
    // bound blend in the A pair, so the root alone cannot close the gap.
    let players = vec![
        player(1, Position::Defender, "A", 3.0, 10.0),
        player(2, Position::Defender, "A", 7.0, 10.0),
        player(3, Position::Defender, "B", 2.0, 1.0),
        player(4, Position::Defender, "C", 8.0, 1.0),
    ];
    let complete = only(Position::Defender, 2, 10.0, 1.0, 1);
    let best = optimize(&players, &complete).unwrap();
    assert_eq!(ids(&best), vec![3, 4]);
    assert!(best.is_optimal());

    let limited = SquadConstraints {
        node_limit: Some(1),
        ..complete
    };
    let squad = optimize(&players, &limited).unwrap();
    assert_eq!(ids(&squad), vec![3, 4]);
    assert!(!squad.is_optimal());
    match squad.status() {
        SolveStatus::Feasible { best_bound } => {
            assert!(best_bound >= squad.total_points());
            assert!(best_bound >= 11.0 - 1e-6, "bound {best_bound}");
        }
        SolveStatus::Optimal => panic!("node limit should leave the search open"),
    }
    assert_eq!(squad.stats().nodes, 1);
}

/// 20 clubs of 35; stronger clubs field pricier, higher-scoring players, so
/// the team cap binds hard at the top.
fn club_pool(seed: u64) -> Vec<Player> {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut players = Vec::new();
    let mut id = 0u32;
    for club in 0..20 {
        let strength = 1.0 - f64::from(club) / 20.0;
        for slot in 0..35 {
            let (pos, base, spread) = match slot {
                0..=3 => (Position::Goalkeeper, 40.0, 20.0),
                4..=14 => (Position::Defender, 40.0, 35.0),
                15..=26 => (Position::Midfielder, 45.0, 90.0),
                _ => (Position::Forward, 45.0, 100.0),
            };
            let quality: f64 = rng.gen_range(0.0..1.0);
            let tenths = (base + spread * quality * (0.4 + 0.6 * strength)).round();
            let cost = tenths / 10.0;
            let pts = (tenths * (1.2 + 0.8 * strength) + rng.gen_range(-20.0..20.0))
                .max(0.0)
                .round();
            players.push(player(id, pos, &format!("Club {club}"), cost, pts));
            id += 1;
        }
    }
    players
}

#[test]
fn fpl_sized_pool_is_solved_to_optimality() {
    let c = SquadConstraints {
        time_limit: Some(Duration::from_secs(300)),
        ..SquadConstraints::default()
    };
    for seed in 0..2 {
        let players = club_pool(seed);
        assert_eq!(players.len(), 700);
        let squad = optimize(&players, &c).unwrap();
        assert_eq!(squad.status(), SolveStatus::Optimal, "seed {seed}");
        assert_invariants(&squad, &c);
    }
}
