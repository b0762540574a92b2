use serde::Serialize;

use crate::aggregate::{AggregateStore, PlayerAggregate, TeamAggregate};
use crate::records::{GoalkeeperRound, PlayerRound, RoundRecord, Venue};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum View {
    Overall,
    Home,
    Away,
}

impl View {
    pub fn includes(self, venue: Venue) -> bool {
        match self {
            View::Overall => true,
            View::Home => venue == Venue::Home,
            View::Away => venue == Venue::Away,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            View::Overall => "overall",
            View::Home => "home",
            View::Away => "away",
        }
    }

    pub fn parse(raw: &str) -> Option<View> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "overall" | "all" => Some(View::Overall),
            "home" => Some(View::Home),
            "away" => Some(View::Away),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PlayerTotals {
    pub player_name: String,
    pub team_name: String,
    pub mp: u32,
    pub g: f64,
    pub ps: u32,
    pub pm: u32,
    pub xg: f64,
    pub npxg: f64,
    pub xa: f64,
    pub a: f64,
    pub xg_delta: f64,
    pub npxg_delta: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct GoalkeeperTotals {
    pub player_name: String,
    pub team_name: String,
    pub mp: u32,
    pub cs: u32,
    pub s: f64,
    pub xgp: f64,
    pub ps: u32,
    pub pf: u32,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TeamTotals {
    pub team_name: String,
    pub standing: Option<u32>,
    pub mp: u32,
    pub gf: i32,
    pub ga: i32,
    pub ps: u32,
    pub pm: u32,
    pub pc: u32,
    pub xg: f64,
    pub npxg: f64,
    pub xgc: f64,
    pub npxgc: f64,
    pub xg_delta: f64,
    pub npxg_delta: f64,
}

fn in_view<'a, R: RoundRecord + 'a>(
    rounds: impl IntoIterator<Item = &'a R>,
    view: View,
) -> impl Iterator<Item = &'a R> {
    rounds.into_iter().filter(move |r| view.includes(r.venue()))
}

pub fn player_totals(player: &PlayerAggregate<PlayerRound>, view: View) -> PlayerTotals {
    let mut t = PlayerTotals {
        player_name: player.player_name.clone(),
        team_name: player.team_name.clone(),
        ..PlayerTotals::default()
    };
    for round in in_view(player.rounds.values(), view) {
        t.mp += 1;
        t.g += round.goals;
        t.ps += round.penalties_scored;
        t.pm += round.penalties_missed;
        t.xg += round.xg;
        t.npxg += round.npxg;
        t.xa += round.xa;
        t.a += round.assists;
    }
    t.xg_delta = t.g - t.xg;
    t.npxg_delta = t.g - f64::from(t.ps) - t.npxg;
    t
}

pub fn goalkeeper_totals(
    keeper: &PlayerAggregate<GoalkeeperRound>,
    view: View,
) -> GoalkeeperTotals {
    let mut t = GoalkeeperTotals {
        player_name: keeper.player_name.clone(),
        team_name: keeper.team_name.clone(),
        ..GoalkeeperTotals::default()
    };
    for round in in_view(keeper.rounds.values(), view) {
        t.mp += 1;
        t.cs += round.clean_sheet;
        t.s += round.saves;
        t.xgp += round.xg_prevented;
        t.ps += round.penalties_saved;
        t.pf += round.penalties_faced;
    }
    t
}

pub fn team_totals(team: &TeamAggregate, view: View) -> TeamTotals {
    let rank = match view {
        View::Overall => team.standings.overall,
        View::Home => team.standings.home,
        View::Away => team.standings.away,
    };
    let mut t = TeamTotals {
        team_name: team.team_name.clone(),
        standing: (rank > 0).then_some(rank),
        ..TeamTotals::default()
    };
    for round in in_view(team.rounds.values(), view) {
        t.mp += 1;
        t.gf += round.goals_for;
        t.ga += round.goals_against;
        t.ps += round.penalties_scored;
        t.pm += round.penalties_missed;
        t.pc += round.penalties_conceded;
        t.xg += round.xg;
        t.npxg += round.npxg;
        t.xgc += round.xg_conceded;
        t.npxgc += round.npxg_conceded;
    }
    t.xg_delta = f64::from(t.gf) - t.xg;
    t.npxg_delta = f64::from(t.gf) - f64::from(t.ps) - t.npxg;
    t
}

pub struct ViewTables {
    pub players: Vec<PlayerTotals>,
    pub goalkeepers: Vec<GoalkeeperTotals>,
    pub teams: Vec<TeamTotals>,
}

pub fn view_tables(store: &AggregateStore, view: View) -> ViewTables {
    ViewTables {
        players: store
            .sorted_players()
            .iter()
            .map(|p| player_totals(p, view))
            .filter(|t| t.mp > 0)
            .collect(),
        goalkeepers: store
            .sorted_goalkeepers()
            .iter()
            .map(|k| goalkeeper_totals(k, view))
            .filter(|t| t.mp > 0)
            .collect(),
        teams: store
            .sorted_teams()
            .iter()
            .map(|t| team_totals(t, view))
            .filter(|t| t.mp > 0)
            .collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregate::Standings;
    use crate::records::{RoundMeta, TeamRound};

    fn player_round(venue: Venue, goals: f64, ps: u32, xg: f64, npxg: f64) -> PlayerRound {
        PlayerRound {
            meta: RoundMeta::new(1, "t", venue),
            goals,
            xg,
            npxg,
            xa: 0.2,
            assists: 0.0,
            penalties_scored: ps,
            penalties_missed: 0,
        }
    }

    #[test]
    fn player_views_split_by_venue() {
        let mut p = PlayerAggregate::new("Salem", "Al Hilal");
        p.rounds.insert(1, player_round(Venue::Home, 2.0, 1, 1.5, 0.71));
        p.rounds.insert(2, player_round(Venue::Away, 0.0, 0, 0.3, 0.3));
        p.rounds.insert(3, player_round(Venue::Home, 1.0, 0, 0.5, 0.5));

        let overall = player_totals(&p, View::Overall);
        assert_eq!(overall.mp, 3);
        assert_eq!(overall.g, 3.0);
        assert!((overall.xg_delta - (3.0 - 2.3)).abs() < 1e-9);
        assert!((overall.npxg_delta - (3.0 - 1.0 - 1.51)).abs() < 1e-9);

        let away = player_totals(&p, View::Away);
        assert_eq!(away.mp, 1);
        assert_eq!(away.g, 0.0);
        assert_eq!(player_totals(&p, View::Home).mp, 2);
    }

    #[test]
    fn team_view_carries_standing() {
        let mut team = TeamAggregate::new("Al Nassr");
        team.standings = Standings {
            overall: 2,
            home: 0,
            away: 4,
        };
        team.rounds.insert(
            7,
            TeamRound {
                meta: RoundMeta::new(9, "t", Venue::Away),
                goals_for: 3,
                goals_against: 1,
                penalties_scored: 1,
                penalties_missed: 0,
                penalties_conceded: 0,
                xg: 2.5,
                npxg: 1.71,
                xg_conceded: 0.9,
                npxg_conceded: 0.9,
                score_str: "1-3".into(),
                npscore_str: "1-2".into(),
            },
        );

        let away = team_totals(&team, View::Away);
        assert_eq!(away.standing, Some(4));
        assert_eq!(away.gf, 3);
        assert!((away.npxg_delta - (3.0 - 1.0 - 1.71)).abs() < 1e-9);

        let home = team_totals(&team, View::Home);
        assert_eq!(home.standing, None);
        assert_eq!(home.mp, 0);
    }

    #[test]
    fn view_names_parse() {
        assert_eq!(View::parse("HOME"), Some(View::Home));
        assert_eq!(View::parse("overall"), Some(View::Overall));
        assert_eq!(View::parse("neutral"), None);
    }
}
