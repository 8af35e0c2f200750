use criterion::{Criterion, criterion_group, criterion_main};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::hint::black_box;

use fpl_picker::player::{Player, Position};
use fpl_picker::points::estimate;
use fpl_picker::stats_provider::parse_transfermarkt_profile;
use fpl_picker::{SquadConstraints, optimize};

fn sample_pool(teams: u32, per_team: u32) -> Vec<Player> {
    let mut rng = StdRng::seed_from_u64(0x2545_f491);
    let mut players = Vec::new();
    for team in 0..teams {
        for slot in 0..per_team {
            let position = Position::ALL[(slot % 4) as usize];
            let cost = f64::from(rng.gen_range(40..=130u32)) / 10.0;
            let points = cost * 14.0 + rng.gen_range(-30.0..30.0);
            players.push(Player {
                id: team * per_team + slot,
                name: format!("Player {team}-{slot}"),
                web_name: format!("P{team}-{slot}"),
                position,
                team: format!("Team {team}"),
                cost,
                projected_points: points.max(0.0).round(),
                official_points: 0,
                minutes: 0,
                ext_league: None,
                ext_stats: None,
            });
        }
    }
    players
}

fn bench_optimize(c: &mut Criterion) {
    let players = sample_pool(20, 30);
    let constraints = SquadConstraints::default();
    c.bench_function("optimize_600_players", |b| {
        b.iter(|| {
            let squad = optimize(black_box(&players), &constraints).unwrap();
            black_box(squad.total_points());
        })
    });
}

fn bench_estimate(c: &mut Criterion) {
    c.bench_function("estimate_points", |b| {
        b.iter(|| {
            black_box(estimate(
                black_box(12),
                black_box(7),
                Some(black_box("Eredivisie")),
                Position::Midfielder,
            ))
        })
    });
}

fn bench_profile_parse(c: &mut Criterion) {
    c.bench_function("transfermarkt_profile_parse", |b| {
        b.iter(|| black_box(parse_transfermarkt_profile(black_box(PROFILE_HTML), "2025/2026")))
    });
}

criterion_group!(benches, bench_optimize, bench_estimate, bench_profile_parse);
criterion_main!(benches);

const PROFILE_HTML: &str = r#"<html><body>
<table class="items">
<tr><th>Season</th><th>Competition</th><th>Apps</th><th>Goals</th><th>Assists</th><th>Minutes</th></tr>
<tr><td>2023/2024</td><td><a href="/a">Primeira Liga</a></td><td>33</td><td>29</td><td>10</td><td>2.890</td></tr>
<tr><td>2024/2025</td><td><a href="/b">Primeira Liga</a></td><td>33</td><td>39</td><td>6</td><td>2.805</td></tr>
<tr><td>2025/2026</td><td><a href="/c">Premier League</a></td><td>12</td><td>6</td><td>2</td><td>980</td></tr>
</table>
</body></html>"#;
