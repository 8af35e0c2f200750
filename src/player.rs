use std::fmt;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Position {
    Goalkeeper,
    Defender,
    Midfielder,
    Forward,
}

impl Position {
    /// Display order of a squad listing.
    pub const ALL: [Position; 4] = [
        Position::Goalkeeper,
        Position::Defender,
        Position::Midfielder,
        Position::Forward,
    ];

    /// FPL `element_type` ids are 1..=4 in role order.
    pub fn from_element_type(element_type: u8) -> Option<Self> {
        match element_type {
            1 => Some(Position::Goalkeeper),
            2 => Some(Position::Defender),
            3 => Some(Position::Midfielder),
            4 => Some(Position::Forward),
            _ => None,
        }
    }

    pub fn from_code(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_uppercase().as_str() {
            "GK" | "GKP" | "GOALKEEPER" => Some(Position::Goalkeeper),
            "DEF" | "DEFENDER" => Some(Position::Defender),
            "MID" | "MIDFIELDER" => Some(Position::Midfielder),
            "FWD" | "FW" | "FORWARD" => Some(Position::Forward),
            _ => None,
        }
    }

    pub fn code(self) -> &'static str {
        match self {
            Position::Goalkeeper => "GK",
            Position::Defender => "DEF",
            Position::Midfielder => "MID",
            Position::Forward => "FWD",
        }
    }

    pub fn index(self) -> usize {
        match self {
            Position::Goalkeeper => 0,
            Position::Defender => 1,
            Position::Midfielder => 2,
            Position::Forward => 3,
        }
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// Raw per-season numbers supplied by an external stats source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExternalStats {
    pub league: String,
    pub goals: u32,
    pub assists: u32,
    pub minutes: u32,
}

impl ExternalStats {
    pub const UNKNOWN_LEAGUE: &'static str = "Unknown";

    /// Stand-in for a player no source could resolve.
    pub fn unknown() -> Self {
        Self {
            league: Self::UNKNOWN_LEAGUE.to_string(),
            goals: 0,
            assists: 0,
            minutes: 0,
        }
    }
}

/// Names used to match a player against external sources and the cache.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PlayerIdentity {
    pub name: String,
    pub web_name: String,
}

impl PlayerIdentity {
    /// Full name when present, otherwise the short display name.
    pub fn search_name(&self) -> &str {
        let name = self.name.trim();
        if name.is_empty() {
            self.web_name.trim()
        } else {
            name
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Player {
    pub id: u32,
    pub name: String,
    pub web_name: String,
    pub position: Position,
    pub team: String,
    pub cost: f64,
    pub projected_points: f64,
    #[serde(default)]
    pub official_points: i32,
    #[serde(default)]
    pub minutes: u32,
    #[serde(default)]
    pub ext_league: Option<String>,
    #[serde(default)]
    pub ext_stats: Option<ExternalStats>,
}

impl Player {
    pub fn identity(&self) -> PlayerIdentity {
        PlayerIdentity {
            name: self.name.clone(),
            web_name: self.web_name.clone(),
        }
    }

    /// No official record this season and not enriched yet.
    pub fn lacks_official_data(&self) -> bool {
        self.ext_league.is_none() && self.minutes == 0 && self.official_points == 0
    }
}
