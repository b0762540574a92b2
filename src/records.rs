use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Venue {
    Home,
    Away,
}

impl Venue {
    pub fn as_str(self) -> &'static str {
        match self {
            Venue::Home => "home",
            Venue::Away => "away",
        }
    }

    pub fn opposite(self) -> Venue {
        match self {
            Venue::Home => Venue::Away,
            Venue::Away => Venue::Home,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoundMeta {
    pub game_id: u64,
    pub game_timestamp: String,
    pub venue: Venue,
    #[serde(rename = "mp")]
    pub matches_played: u32,
}

impl RoundMeta {
    pub fn new(game_id: u64, game_timestamp: &str, venue: Venue) -> Self {
        Self {
            game_id,
            game_timestamp: game_timestamp.to_string(),
            venue,
            matches_played: 1,
        }
    }
}

pub trait RoundRecord {
    fn meta(&self) -> &RoundMeta;

    fn venue(&self) -> Venue {
        self.meta().venue
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerRound {
    #[serde(flatten)]
    pub meta: RoundMeta,
    #[serde(rename = "g")]
    pub goals: f64,
    pub xg: f64,
    pub npxg: f64,
    pub xa: f64,
    #[serde(rename = "a")]
    pub assists: f64,
    #[serde(rename = "ps")]
    pub penalties_scored: u32,
    #[serde(rename = "pm")]
    pub penalties_missed: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GoalkeeperRound {
    #[serde(flatten)]
    pub meta: RoundMeta,
    #[serde(rename = "cs")]
    pub clean_sheet: u32,
    #[serde(rename = "s")]
    pub saves: f64,
    #[serde(rename = "xgp")]
    pub xg_prevented: f64,
    #[serde(rename = "ps")]
    pub penalties_saved: u32,
    #[serde(rename = "pf")]
    pub penalties_faced: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TeamRound {
    #[serde(flatten)]
    pub meta: RoundMeta,
    #[serde(rename = "gf")]
    pub goals_for: i32,
    #[serde(rename = "ga")]
    pub goals_against: i32,
    #[serde(rename = "ps")]
    pub penalties_scored: u32,
    #[serde(rename = "pm")]
    pub penalties_missed: u32,
    #[serde(rename = "pc")]
    pub penalties_conceded: u32,
    pub xg: f64,
    pub npxg: f64,
    #[serde(rename = "xgc")]
    pub xg_conceded: f64,
    #[serde(rename = "npxgc")]
    pub npxg_conceded: f64,
    /// Always "home-away", whichever side owns the record.
    pub score_str: String,
    pub npscore_str: String,
}

impl TeamRound {
    pub fn non_penalty_goals(&self) -> i32 {
        self.goals_for - self.penalties_scored as i32
    }
}

impl RoundRecord for PlayerRound {
    fn meta(&self) -> &RoundMeta {
        &self.meta
    }
}

impl RoundRecord for GoalkeeperRound {
    fn meta(&self) -> &RoundMeta {
        &self.meta
    }
}

impl RoundRecord for TeamRound {
    fn meta(&self) -> &RoundMeta {
        &self.meta
    }
}
