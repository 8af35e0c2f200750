/// League used as the 1.0 reference when weighting external stats.
pub const REFERENCE_LEAGUE: &str = "Premier League";

const LEAGUE_STRENGTH: [(&str, f64); 19] = [
    ("Premier League", 90.6),
    ("La Liga", 84.8),
    ("Serie A", 84.8),
    ("Bundesliga", 84.2),
    ("Ligue 1", 84.3),
    ("Eredivisie", 77.2),
    ("Primeira Liga", 78.8),
    ("Belgian Pro League", 80.0),
    ("Championship", 79.5),
    ("Scottish Premiership", 74.0),
    ("Brazil Serie A", 80.8),
    ("MLS", 74.8),
    ("Argentine Primera", 77.5),
    ("Russian Premier League", 75.0),
    ("Turkish Super Lig", 75.0),
    ("Austrian Bundesliga", 75.0),
    ("Swiss Super League", 75.7),
    ("Mexican Liga MX", 73.5),
    ("Japanese J1 League", 70.0),
];

pub fn reference_strength() -> f64 {
    strength_of(REFERENCE_LEAGUE).unwrap_or(90.6)
}

/// Exact-name lookup; `None` for leagues outside the table.
pub fn strength_of(league: &str) -> Option<f64> {
    let league = league.trim();
    LEAGUE_STRENGTH
        .iter()
        .find(|(name, _)| *name == league)
        .map(|(_, score)| *score)
}

/// Strength for weighting, unknown leagues count as the reference.
pub fn league_strength(league: Option<&str>) -> f64 {
    league
        .and_then(strength_of)
        .unwrap_or_else(reference_strength)
}

pub fn league_factor(league: Option<&str>) -> f64 {
    league_strength(league) / reference_strength()
}

pub fn known_leagues() -> impl Iterator<Item = &'static str> {
    LEAGUE_STRENGTH.iter().map(|(name, _)| *name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reference_is_strongest_league() {
        let max = LEAGUE_STRENGTH
            .iter()
            .map(|(_, s)| *s)
            .fold(f64::MIN, f64::max);
        assert_eq!(reference_strength(), max);
    }

    #[test]
    fn unknown_league_is_neutral() {
        assert_eq!(league_factor(Some("Unknown (FBref)")), 1.0);
        assert_eq!(league_factor(None), 1.0);
        assert_eq!(league_factor(Some("Premier League")), 1.0);
    }

    #[test]
    fn weaker_league_discounts() {
        let f = league_factor(Some("Japanese J1 League"));
        assert!((f - 70.0 / 90.6).abs() < 1e-12);
        assert_eq!(known_leagues().count(), 19);
    }
}
