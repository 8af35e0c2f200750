use crate::league_strength::league_factor;
use crate::player::Position;
use crate::stats_cache::StatsRecord;

pub const ASSIST_POINTS: f64 = 3.0;

pub fn goal_points(position: Position) -> f64 {
    match position {
        Position::Goalkeeper => 10.0,
        Position::Defender => 6.0,
        Position::Midfielder => 5.0,
        Position::Forward => 4.0,
    }
}

/// Goals and assists scaled by the strength of the league they came from.
pub fn weight_stats(goals: u32, assists: u32, league: Option<&str>) -> (f64, f64) {
    let factor = league_factor(league);
    (goals as f64 * factor, assists as f64 * factor)
}

pub fn estimate(goals: u32, assists: u32, league: Option<&str>, position: Position) -> f64 {
    let (weighted_goals, weighted_assists) = weight_stats(goals, assists, league);
    weighted_goals * goal_points(position) + weighted_assists * ASSIST_POINTS
}

pub fn estimate_record(record: &StatsRecord, position: Position) -> f64 {
    estimate(
        record.goals,
        record.assists,
        Some(record.league.as_str()),
        position,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_output_scores_zero() {
        for pos in Position::ALL {
            assert_eq!(estimate(0, 0, Some("La Liga"), pos), 0.0);
        }
    }

    #[test]
    fn reference_league_uses_raw_weights() {
        assert_eq!(estimate(2, 1, Some("Premier League"), Position::Goalkeeper), 23.0);
        assert_eq!(estimate(2, 1, None, Position::Defender), 15.0);
        assert_eq!(estimate(2, 1, Some("nowhere"), Position::Midfielder), 13.0);
        assert_eq!(estimate(2, 1, Some("Premier League"), Position::Forward), 11.0);
    }

    #[test]
    fn league_factor_scales_both_terms() {
        let pts = estimate(10, 5, Some("Eredivisie"), Position::Forward);
        let factor = 77.2 / 90.6;
        assert!((pts - (10.0 * factor * 4.0 + 5.0 * factor * 3.0)).abs() < 1e-9);
    }

    #[test]
    fn estimate_is_deterministic() {
        let a = estimate(7, 3, Some("Serie A"), Position::Midfielder);
        let b = estimate(7, 3, Some("Serie A"), Position::Midfielder);
        assert_eq!(a.to_bits(), b.to_bits());
    }
}
