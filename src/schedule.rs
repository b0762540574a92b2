use serde::{Deserialize, Serialize};

use crate::match_feed::GameSummary;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScheduleEntry {
    pub round_num: u32,
    pub home_team: String,
    pub away_team: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduleDocument {
    #[serde(default)]
    pub schedule: Vec<ScheduleEntry>,
}

pub fn build_schedule<'a>(
    games: impl IntoIterator<Item = &'a GameSummary>,
    season_num: u32,
) -> ScheduleDocument {
    let mut schedule: Vec<ScheduleEntry> = games
        .into_iter()
        .filter(|g| g.season_num == Some(season_num))
        .filter_map(|g| {
            Some(ScheduleEntry {
                round_num: g.round_num?,
                home_team: g.home_competitor.name.clone(),
                away_team: g.away_competitor.name.clone(),
            })
        })
        .collect();
    schedule.sort_by_key(|e| e.round_num);
    ScheduleDocument { schedule }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::match_feed::parse_games_page_json;

    #[test]
    fn filters_season_and_sorts_by_round() {
        let raw = r#"{"games": [
            {"id": 1, "roundNum": 3, "seasonNum": 53, "statusText": "Scheduled",
             "homeCompetitor": {"name": "C"}, "awayCompetitor": {"name": "D"}},
            {"id": 2, "roundNum": 1, "seasonNum": 53, "statusText": "Ended",
             "homeCompetitor": {"name": "A"}, "awayCompetitor": {"name": "B"}},
            {"id": 4, "seasonNum": 53, "statusText": "Scheduled",
             "homeCompetitor": {"name": "TBD"}, "awayCompetitor": {"name": "TBD"}},
            {"id": 3, "roundNum": 1, "seasonNum": 52, "statusText": "Ended",
             "homeCompetitor": {"name": "Old"}, "awayCompetitor": {"name": "Older"}}
        ]}"#;
        let page = parse_games_page_json(raw).unwrap();
        let doc = build_schedule(&page.games, 53);
        let rounds: Vec<u32> = doc.schedule.iter().map(|e| e.round_num).collect();
        assert_eq!(rounds, vec![1, 3]);
        assert_eq!(doc.schedule[0].home_team, "A");

        let json = serde_json::to_value(&doc).unwrap();
        assert_eq!(json["schedule"][1]["awayTeam"], "D");
    }
}
