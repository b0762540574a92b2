use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};

use crate::records::{GoalkeeperRound, PlayerRound, TeamRound};
use crate::round_builder::{MatchRounds, NamedRound};
use crate::standings::LeagueStandings;

pub trait Entity {
    type Round;

    fn name(&self) -> &str;
    fn rounds(&self) -> &BTreeMap<u32, Self::Round>;

    fn round(&self, round_num: u32) -> Option<&Self::Round> {
        self.rounds().get(&round_num)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(bound(deserialize = "R: Deserialize<'de>"))]
pub struct PlayerAggregate<R> {
    pub player_name: String,
    pub team_name: String,
    #[serde(default)]
    pub rounds: BTreeMap<u32, R>,
}

impl<R> PlayerAggregate<R> {
    pub fn new(player_name: &str, team_name: &str) -> Self {
        Self {
            player_name: player_name.to_string(),
            team_name: team_name.to_string(),
            rounds: BTreeMap::new(),
        }
    }
}

impl<R> Entity for PlayerAggregate<R> {
    type Round = R;

    fn name(&self) -> &str {
        &self.player_name
    }

    fn rounds(&self) -> &BTreeMap<u32, R> {
        &self.rounds
    }
}

/// League rank overall and in the home / away tables; 0 means unranked.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Standings {
    #[serde(default)]
    pub overall: u32,
    #[serde(default)]
    pub home: u32,
    #[serde(default)]
    pub away: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TeamAggregate {
    pub team_name: String,
    #[serde(default)]
    pub standings: Standings,
    #[serde(default)]
    pub rounds: BTreeMap<u32, TeamRound>,
}

impl TeamAggregate {
    pub fn new(team_name: &str) -> Self {
        Self {
            team_name: team_name.to_string(),
            standings: Standings::default(),
            rounds: BTreeMap::new(),
        }
    }
}

impl Entity for TeamAggregate {
    type Round = TeamRound;

    fn name(&self) -> &str {
        &self.team_name
    }

    fn rounds(&self) -> &BTreeMap<u32, TeamRound> {
        &self.rounds
    }
}

pub type PlayerMap = HashMap<String, PlayerAggregate<PlayerRound>>;
pub type GoalkeeperMap = HashMap<String, PlayerAggregate<GoalkeeperRound>>;
pub type TeamMap = HashMap<String, TeamAggregate>;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct AggregateStore {
    players: PlayerMap,
    goalkeepers: GoalkeeperMap,
    teams: TeamMap,
}

impl AggregateStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Later duplicates of a name replace earlier ones.
    pub fn from_parts(
        players: Vec<PlayerAggregate<PlayerRound>>,
        goalkeepers: Vec<PlayerAggregate<GoalkeeperRound>>,
        teams: Vec<TeamAggregate>,
    ) -> Self {
        Self {
            players: players
                .into_iter()
                .map(|p| (p.player_name.clone(), p))
                .collect(),
            goalkeepers: goalkeepers
                .into_iter()
                .map(|g| (g.player_name.clone(), g))
                .collect(),
            teams: teams.into_iter().map(|t| (t.team_name.clone(), t)).collect(),
        }
    }

    pub fn merge(&mut self, rounds: MatchRounds) {
        let round_num = rounds.round_num;
        for entry in rounds.players {
            merge_player(&mut self.players, round_num, entry);
        }
        for entry in rounds.goalkeepers {
            merge_player(&mut self.goalkeepers, round_num, entry);
        }
        for entry in rounds.teams {
            let team = self
                .teams
                .entry(entry.name.clone())
                .or_insert_with(|| TeamAggregate::new(&entry.name));
            team.rounds.insert(round_num, entry.round);
        }
    }

    pub fn apply_standings(&mut self, standings: &LeagueStandings) {
        for (name, team) in self.teams.iter_mut() {
            team.standings = standings.for_team(name);
        }
    }

    pub fn player(&self, name: &str) -> Option<&PlayerAggregate<PlayerRound>> {
        self.players.get(name)
    }

    pub fn goalkeeper(&self, name: &str) -> Option<&PlayerAggregate<GoalkeeperRound>> {
        self.goalkeepers.get(name)
    }

    pub fn team(&self, name: &str) -> Option<&TeamAggregate> {
        self.teams.get(name)
    }

    pub fn players(&self) -> &PlayerMap {
        &self.players
    }

    pub fn goalkeepers(&self) -> &GoalkeeperMap {
        &self.goalkeepers
    }

    pub fn teams(&self) -> &TeamMap {
        &self.teams
    }

    pub fn is_empty(&self) -> bool {
        self.players.is_empty() && self.goalkeepers.is_empty() && self.teams.is_empty()
    }

    pub fn sorted_players(&self) -> Vec<PlayerAggregate<PlayerRound>> {
        sorted_values(&self.players)
    }

    pub fn sorted_goalkeepers(&self) -> Vec<PlayerAggregate<GoalkeeperRound>> {
        sorted_values(&self.goalkeepers)
    }

    pub fn sorted_teams(&self) -> Vec<TeamAggregate> {
        sorted_values(&self.teams)
    }
}

fn merge_player<R>(
    map: &mut HashMap<String, PlayerAggregate<R>>,
    round_num: u32,
    entry: NamedRound<R>,
) {
    let current = map
        .entry(entry.name.clone())
        .or_insert_with(|| PlayerAggregate::new(&entry.name, &entry.team_name));
    // Last processed match decides the club, so transfers show up.
    current.team_name = entry.team_name;
    current.rounds.insert(round_num, entry.round);
}

fn sorted_values<V: Clone>(map: &HashMap<String, V>) -> Vec<V> {
    let mut names: Vec<&String> = map.keys().collect();
    names.sort();
    names.into_iter().map(|name| map[name].clone()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::records::{RoundMeta, Venue};

    fn team_round(game_id: u64, gf: i32, ga: i32) -> TeamRound {
        TeamRound {
            meta: RoundMeta::new(game_id, "2025-10-01T17:00:00+00:00", Venue::Home),
            goals_for: gf,
            goals_against: ga,
            penalties_scored: 0,
            penalties_missed: 0,
            penalties_conceded: 0,
            xg: 1.2,
            npxg: 1.2,
            xg_conceded: 0.4,
            npxg_conceded: 0.4,
            score_str: format!("{gf}-{ga}"),
            npscore_str: format!("{gf}-{ga}"),
        }
    }

    fn player_round(game_id: u64, goals: f64) -> PlayerRound {
        PlayerRound {
            meta: RoundMeta::new(game_id, "t", Venue::Away),
            goals,
            xg: 0.3,
            npxg: 0.3,
            xa: 0.0,
            assists: 0.0,
            penalties_scored: 0,
            penalties_missed: 0,
        }
    }

    fn rounds(round_num: u32) -> MatchRounds {
        MatchRounds {
            round_num,
            players: Vec::new(),
            goalkeepers: Vec::new(),
            teams: Vec::new(),
        }
    }

    #[test]
    fn same_round_overwrites_instead_of_appending() {
        let mut store = AggregateStore::new();

        let mut first = rounds(7);
        first.teams.push(NamedRound::team("Al Fateh", team_round(100, 1, 0)));
        store.merge(first);

        let mut second = rounds(7);
        second.teams.push(NamedRound::team("Al Fateh", team_round(200, 3, 2)));
        store.merge(second);

        let team = store.team("Al Fateh").expect("team exists");
        assert_eq!(team.rounds.len(), 1);
        let r7 = team.round(7).expect("round 7");
        assert_eq!(r7.meta.game_id, 200);
        assert_eq!(r7.goals_for, 3);
        assert!(team.round(8).is_none());
        assert!(store.team("Al Taawoun").is_none());
    }

    #[test]
    fn player_without_rounds_key_reads_empty() {
        let raw = r#"{"player_name": "Firmino", "team_name": "Al Ahli"}"#;
        let player: PlayerAggregate<PlayerRound> = serde_json::from_str(raw).unwrap();
        assert_eq!(player.team_name, "Al Ahli");
        assert!(player.rounds.is_empty());

        let keeper: PlayerAggregate<GoalkeeperRound> =
            serde_json::from_str(r#"{"player_name": "Bounou", "team_name": "Al Hilal"}"#)
                .unwrap();
        assert!(keeper.rounds.is_empty());
    }

    #[test]
    fn merge_refreshes_team_name() {
        let mut store = AggregateStore::new();
        let mut r1 = rounds(1);
        r1.players.push(NamedRound::new("Firmino", "Al Ahli", player_round(1, 1.0)));
        store.merge(r1);

        let mut r2 = rounds(2);
        r2.players.push(NamedRound::new("Firmino", "Al Qadsiah", player_round(2, 0.0)));
        store.merge(r2);

        let player = store.player("Firmino").unwrap();
        assert_eq!(player.team_name, "Al Qadsiah");
        assert_eq!(player.rounds.len(), 2);
    }

    #[test]
    fn from_parts_and_sorted_output() {
        let store = AggregateStore::from_parts(
            vec![
                PlayerAggregate::new("Zed", "A"),
                PlayerAggregate::new("Abe", "B"),
            ],
            Vec::new(),
            vec![TeamAggregate::new("B"), TeamAggregate::new("A")],
        );
        let names: Vec<_> = store
            .sorted_players()
            .into_iter()
            .map(|p| p.player_name)
            .collect();
        assert_eq!(names, vec!["Abe", "Zed"]);
        let teams: Vec<_> = store.sorted_teams().into_iter().map(|t| t.team_name).collect();
        assert_eq!(teams, vec!["A", "B"]);
        assert!(store.goalkeepers().is_empty());
    }

    #[test]
    fn rounds_serialize_with_string_keys() {
        let mut team = TeamAggregate::new("Al Hilal");
        team.rounds.insert(12, team_round(5, 2, 2));
        let value = serde_json::to_value(&team).unwrap();
        assert!(value["rounds"]["12"].is_object());
        let back: TeamAggregate = serde_json::from_value(value).unwrap();
        assert_eq!(back, team);
    }
}
