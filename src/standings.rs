use std::collections::HashMap;

use anyhow::{Context, Result};
use serde::Deserialize;
use tracing::info;

use crate::aggregate::Standings;
use crate::error::StatsError;
use crate::match_feed::MatchSource;

pub type RankTable = HashMap<String, u32>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StandingsKind {
    Overall,
    Home,
    Away,
}

impl StandingsKind {
    pub const ALL: [StandingsKind; 3] = [
        StandingsKind::Overall,
        StandingsKind::Home,
        StandingsKind::Away,
    ];

    pub const fn code(self) -> u8 {
        match self {
            StandingsKind::Overall => 1,
            StandingsKind::Home => 2,
            StandingsKind::Away => 3,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct LeagueStandings {
    pub overall: RankTable,
    pub home: RankTable,
    pub away: RankTable,
}

impl LeagueStandings {
    pub fn for_team(&self, name: &str) -> Standings {
        let rank = |table: &RankTable| table.get(name).copied().unwrap_or(0);
        Standings {
            overall: rank(&self.overall),
            home: rank(&self.home),
            away: rank(&self.away),
        }
    }
}

pub fn fetch_league_standings(source: &dyn MatchSource) -> Result<LeagueStandings, StatsError> {
    let mut out = LeagueStandings::default();
    for kind in StandingsKind::ALL {
        let table = source.standings(kind)?;
        info!(kind = kind.code(), teams = table.len(), "fetched standings");
        match kind {
            StandingsKind::Overall => out.overall = table,
            StandingsKind::Home => out.home = table,
            StandingsKind::Away => out.away = table,
        }
    }
    Ok(out)
}

#[derive(Debug, Deserialize)]
struct StandingsResponse {
    #[serde(default)]
    standings: Vec<StandingsGroup>,
}

#[derive(Debug, Deserialize)]
struct StandingsGroup {
    #[serde(default)]
    rows: Vec<StandingsRow>,
}

#[derive(Debug, Deserialize)]
struct StandingsRow {
    competitor: RowCompetitor,
    position: u32,
}

#[derive(Debug, Deserialize)]
struct RowCompetitor {
    name: String,
}

pub fn parse_standings_json(raw: &str) -> Result<RankTable> {
    let resp: StandingsResponse =
        serde_json::from_str(raw.trim()).context("invalid standings json")?;
    let group = resp
        .standings
        .into_iter()
        .next()
        .context("standings response has no groups")?;
    Ok(group
        .rows
        .into_iter()
        .map(|row| (row.competitor.name, row.position))
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_first_group_only() {
        let raw = r#"{"standings": [
            {"rows": [{"competitor": {"name": "Al Ittihad"}, "position": 1},
                      {"competitor": {"name": "Al Hilal"}, "position": 2}]},
            {"rows": [{"competitor": {"name": "Other"}, "position": 1}]}
        ]}"#;
        let table = parse_standings_json(raw).unwrap();
        assert_eq!(table.len(), 2);
        assert_eq!(table["Al Hilal"], 2);
    }

    #[test]
    fn empty_standings_is_error() {
        assert!(parse_standings_json(r#"{"standings": []}"#).is_err());
        assert!(parse_standings_json("not json").is_err());
    }

    #[test]
    fn unranked_team_reads_zero() {
        let standings = LeagueStandings {
            overall: RankTable::from([("Al Nassr".to_string(), 3)]),
            home: RankTable::new(),
            away: RankTable::from([("Al Nassr".to_string(), 5)]),
        };
        assert_eq!(
            standings.for_team("Al Nassr"),
            Standings {
                overall: 3,
                home: 0,
                away: 5
            }
        );
        assert_eq!(standings.for_team("Damac"), Standings::default());
    }
}
