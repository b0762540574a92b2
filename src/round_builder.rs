use std::collections::HashMap;

use crate::build_report::BuildReport;
use crate::error::StatsError;
use crate::match_feed::{MatchRecord, RosterMember};
use crate::records::{GoalkeeperRound, PlayerRound, RoundMeta, TeamRound, Venue};
use crate::stat_extract::{MissingPolicy, PENALTY_KICK_SUBTYPE, StatExtractor, StatType};

const UNKNOWN_PLAYER: &str = "Unknown Player";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuildMode {
    Build,
    Audit,
}

impl BuildMode {
    fn reports_missing(self) -> bool {
        self == BuildMode::Build
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct NamedRound<R> {
    pub name: String,
    pub team_name: String,
    pub round: R,
}

impl<R> NamedRound<R> {
    pub fn new(name: &str, team_name: &str, round: R) -> Self {
        Self {
            name: name.to_string(),
            team_name: team_name.to_string(),
            round,
        }
    }

    pub fn team(name: &str, round: R) -> Self {
        Self::new(name, name, round)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct MatchRounds {
    pub round_num: u32,
    pub players: Vec<NamedRound<PlayerRound>>,
    pub goalkeepers: Vec<NamedRound<GoalkeeperRound>>,
    pub teams: Vec<NamedRound<TeamRound>>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct VenueTotals {
    pub xg: f64,
    pub npxg: f64,
    pub penalties_scored: u32,
    pub penalties_missed: u32,
}

impl VenueTotals {
    fn add(&mut self, round: &PlayerRound) {
        self.xg += round.xg;
        self.npxg += round.npxg;
        self.penalties_scored += round.penalties_scored;
        self.penalties_missed += round.penalties_missed;
    }
}

#[derive(Debug, Clone, Default)]
pub struct SideRounds {
    pub players: Vec<NamedRound<PlayerRound>>,
    pub goalkeepers: Vec<NamedRound<GoalkeeperRound>>,
    pub totals: VenueTotals,
}

#[derive(Debug, Clone, Default)]
pub struct PenaltyLedger {
    xg: HashMap<i64, f64>,
    missed: HashMap<i64, u32>,
}

impl PenaltyLedger {
    pub fn from_match(game: &MatchRecord) -> Self {
        let mut ledger = Self::default();
        for event in game
            .chart_events()
            .iter()
            .filter(|e| e.sub_type == Some(PENALTY_KICK_SUBTYPE))
        {
            let Some(player_id) = event.player() else {
                continue;
            };
            *ledger.xg.entry(player_id).or_default() += event.xg();
            if !event.is_goal() {
                *ledger.missed.entry(player_id).or_default() += 1;
            }
        }
        ledger
    }

    pub fn xg(&self, player_id: i64) -> f64 {
        self.xg.get(&player_id).copied().unwrap_or(0.0)
    }

    pub fn missed(&self, player_id: i64) -> u32 {
        self.missed.get(&player_id).copied().unwrap_or(0)
    }
}

pub fn build_match(
    game: &MatchRecord,
    mode: BuildMode,
    report: &mut BuildReport,
) -> Result<MatchRounds, StatsError> {
    let round_num = game
        .round_num
        .ok_or_else(|| StatsError::match_processing(game.id, "missing round number"))?;

    let names = game.member_names();
    let penalties = PenaltyLedger::from_match(game);

    let home = build_side(game, Venue::Home, &names, &penalties, mode, report);
    let away = build_side(game, Venue::Away, &names, &penalties, mode, report);
    let teams = build_teams(game, &home.totals, &away.totals);

    let mut players = home.players;
    players.extend(away.players);
    let mut goalkeepers = home.goalkeepers;
    goalkeepers.extend(away.goalkeepers);

    Ok(MatchRounds {
        round_num,
        players,
        goalkeepers,
        teams: teams.into(),
    })
}

pub fn build_side(
    game: &MatchRecord,
    venue: Venue,
    names: &HashMap<i64, &str>,
    penalties: &PenaltyLedger,
    mode: BuildMode,
    report: &mut BuildReport,
) -> SideRounds {
    let team_name = game.competitor(venue).name.as_str();
    let opponent = game.competitor(venue.opposite()).name.as_str();
    let mut side = SideRounds::default();

    for member in game.roster(venue) {
        let name = names.get(&member.id).copied().unwrap_or(UNKNOWN_PLAYER);
        let stats = StatExtractor::new(&member.stats, name, opponent);
        if stats.minutes_played() == 0 {
            continue;
        }
        let meta = RoundMeta::new(game.id, &game.start_time, venue);

        if member.is_goalkeeper() {
            let round = goalkeeper_round(meta, &stats, mode, report);
            side.goalkeepers.push(NamedRound::new(name, team_name, round));
        } else {
            let round = player_round(meta, member, &stats, penalties, mode, report);
            side.totals.add(&round);
            side.players.push(NamedRound::new(name, team_name, round));
        }
    }
    side
}

fn goalkeeper_round(
    meta: RoundMeta,
    stats: &StatExtractor<'_>,
    mode: BuildMode,
    report: &mut BuildReport,
) -> GoalkeeperRound {
    let volatile = MissingPolicy::log_if(mode.reports_missing());
    let penalties = stats.paired(StatType::PenaltiesSaved, MissingPolicy::Silent, report);
    let conceded = stats.numeric(StatType::GoalsConceded, volatile, report);

    GoalkeeperRound {
        meta,
        clean_sheet: u32::from(conceded == 0.0),
        saves: stats.numeric(StatType::Saves, volatile, report),
        xg_prevented: stats.numeric(
            StatType::ExpectedGoalsPrevented,
            MissingPolicy::Silent,
            report,
        ),
        penalties_saved: penalties.made,
        penalties_faced: penalties.attempted,
    }
}

fn player_round(
    meta: RoundMeta,
    member: &RosterMember,
    stats: &StatExtractor<'_>,
    penalties: &PenaltyLedger,
    mode: BuildMode,
    report: &mut BuildReport,
) -> PlayerRound {
    let xg = stats.numeric(StatType::ExpectedGoals, MissingPolicy::Silent, report);

    PlayerRound {
        meta,
        goals: stats.numeric(StatType::Goals, MissingPolicy::Silent, report),
        xg,
        npxg: xg - penalties.xg(member.id),
        xa: stats.numeric(
            StatType::ExpectedAssists,
            MissingPolicy::log_if(mode.reports_missing()),
            report,
        ),
        assists: stats.numeric(StatType::Assists, MissingPolicy::Silent, report),
        penalties_scored: stats.penalty_goals(),
        penalties_missed: penalties.missed(member.id),
    }
}

pub fn build_teams(
    game: &MatchRecord,
    home: &VenueTotals,
    away: &VenueTotals,
) -> [NamedRound<TeamRound>; 2] {
    let home_score = game.home_competitor.score;
    let away_score = game.away_competitor.score;
    let home_np = home_score - home.penalties_scored as i32;
    let away_np = away_score - away.penalties_scored as i32;
    let score_str = format!("{home_score}-{away_score}");
    let npscore_str = format!("{home_np}-{away_np}");

    let team = |venue: Venue, own: &VenueTotals, opp: &VenueTotals| {
        let (goals_for, goals_against) = match venue {
            Venue::Home => (home_score, away_score),
            Venue::Away => (away_score, home_score),
        };
        let round = TeamRound {
            meta: RoundMeta::new(game.id, &game.start_time, venue),
            goals_for,
            goals_against,
            penalties_scored: own.penalties_scored,
            penalties_missed: own.penalties_missed,
            penalties_conceded: opp.penalties_scored,
            xg: own.xg,
            npxg: own.npxg,
            xg_conceded: opp.xg,
            npxg_conceded: opp.npxg,
            score_str: score_str.clone(),
            npscore_str: npscore_str.clone(),
        };
        NamedRound::team(&game.competitor(venue).name, round)
    };

    [
        team(Venue::Home, home, away),
        team(Venue::Away, away, home),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn game(json: &str) -> MatchRecord {
        serde_json::from_str(json).expect("valid match json")
    }

    const SMALL_MATCH: &str = r#"{
        "id": 501, "roundNum": 3, "startTime": "2025-09-20T16:00:00+00:00",
        "homeCompetitor": {"name": "Home FC", "score": 2, "lineups": {"members": [
            {"id": 1, "position": {"id": 1}, "stats": [
                {"type": 30, "value": "90"}, {"type": 35, "value": "1"},
                {"type": 23, "value": "4"}, {"type": 44, "value": "0/1"}]},
            {"id": 2, "position": {"id": 4}, "stats": [
                {"type": 30, "value": "90"}, {"type": 76, "value": "1.30"},
                {"type": 27, "value": "2 (1Pk)"}, {"type": 78, "value": "0.1"},
                {"type": 26, "value": "0"}]},
            {"id": 3, "position": {"id": 3}, "stats": [{"type": 30, "value": "0"}]}
        ]}},
        "awayCompetitor": {"name": "Away FC", "score": 1, "lineups": {"members": [
            {"id": 4, "position": {"id": 1}, "stats": [
                {"type": 30, "value": "90"}, {"type": 35, "value": "2"},
                {"type": 23, "value": "1"}]},
            {"id": 5, "position": {"id": 2}, "stats": [
                {"type": 30, "value": "45"}, {"type": 76, "value": "0.40"},
                {"type": 27, "value": "1"}, {"type": 78, "value": "0"}, {"type": 26, "value": "0"}]}
        ]}},
        "members": [{"id": 1, "name": "Keeper H"}, {"id": 2, "name": "Striker H"},
                    {"id": 3, "name": "Bench H"}, {"id": 4, "name": "Keeper A"},
                    {"id": 5, "name": "Striker A"}],
        "chartEvents": {"events": [
            {"subType": 9, "playerId": 2, "xg": 0.79, "outcome": {"name": "Goal"}},
            {"subType": 1, "playerId": 5, "xg": 0.40, "outcome": {"name": "Goal"}}
        ]}
    }"#;

    #[test]
    fn builds_players_keepers_and_teams() {
        let record = game(SMALL_MATCH);
        let mut report = BuildReport::new();
        let rounds = build_match(&record, BuildMode::Build, &mut report).unwrap();

        assert_eq!(rounds.round_num, 3);
        assert_eq!(rounds.players.len(), 2);
        assert_eq!(rounds.goalkeepers.len(), 2);
        assert!(rounds.players.iter().all(|p| p.name != "Bench H"));

        let striker = &rounds.players[0];
        assert_eq!(striker.name, "Striker H");
        assert_eq!(striker.team_name, "Home FC");
        assert_eq!(striker.round.goals, 2.0);
        assert_eq!(striker.round.penalties_scored, 1);
        assert!((striker.round.npxg - 0.51).abs() < 1e-9);

        let keeper_h = &rounds.goalkeepers[0].round;
        assert_eq!(keeper_h.clean_sheet, 0);
        assert_eq!(keeper_h.penalties_faced, 1);

        let [home, away] = [&rounds.teams[0], &rounds.teams[1]];
        assert_eq!(home.name, "Home FC");
        assert_eq!(home.round.npscore_str, "1-1");
        assert_eq!(away.round.npscore_str, "1-1");
        assert_eq!(away.round.penalties_conceded, 1);
        assert!(report.is_empty());
    }

    #[test]
    fn missing_round_number_is_processing_error() {
        let mut record = game(SMALL_MATCH);
        record.round_num = None;
        let err = build_match(&record, BuildMode::Build, &mut BuildReport::new()).unwrap_err();
        assert!(matches!(err, StatsError::MatchProcessing { game_id: 501, .. }));
    }

    #[test]
    fn unknown_member_falls_back_to_placeholder_name() {
        let mut record = game(SMALL_MATCH);
        record.members.retain(|m| m.id != 5);
        let rounds = build_match(&record, BuildMode::Build, &mut BuildReport::new()).unwrap();
        assert!(rounds.players.iter().any(|p| p.name == UNKNOWN_PLAYER));
    }

    #[test]
    fn audit_mode_silences_keeper_warnings() {
        let mut record = game(SMALL_MATCH);
        for member in record.away_competitor.lineups.as_mut().unwrap().members.iter_mut() {
            member.stats.retain(|s| s.kind == 30 || s.kind == 76);
        }

        let mut build_report = BuildReport::new();
        build_match(&record, BuildMode::Build, &mut build_report).unwrap();
        // keeper: goals conceded + saves; outfield: xA
        assert_eq!(build_report.warning_count(), 3);

        let mut audit_report = BuildReport::new();
        build_match(&record, BuildMode::Audit, &mut audit_report).unwrap();
        assert!(audit_report.is_empty());
    }
}
