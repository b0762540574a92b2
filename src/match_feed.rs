use std::borrow::Cow;
use std::collections::{HashMap, HashSet};

use anyhow::{Context, Result};
use reqwest::blocking::Client;
use reqwest::header::USER_AGENT;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use tracing::{debug, warn};

use crate::config::ApiSettings;
use crate::error::StatsError;
use crate::http_client::{BROWSER_USER_AGENT, http_client};
use crate::records::Venue;
use crate::standings::{RankTable, StandingsKind, parse_standings_json};

const COMMON_QUERY: &str = "appTypeId=5&langId=1&timezoneName=UTC&userCountryId=1";
const MAX_PAGES: usize = 200;

pub const GOALKEEPER_POSITION_ID: i64 = 1;
pub const STATUS_ENDED: &str = "Ended";

pub trait MatchSource: Sync {
    fn results(&self) -> Result<Vec<GameSummary>>;

    fn fixtures(&self) -> Result<Vec<GameSummary>>;

    fn match_detail(&self, game_id: u64) -> Result<MatchRecord, StatsError>;

    fn standings(&self, kind: StandingsKind) -> Result<RankTable, StatsError>;
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameSummary {
    pub id: u64,
    #[serde(default)]
    pub round_num: Option<u32>,
    #[serde(default)]
    pub season_num: Option<u32>,
    #[serde(default)]
    pub start_time: String,
    #[serde(default)]
    pub status_text: String,
    pub home_competitor: CompetitorRef,
    pub away_competitor: CompetitorRef,
}

impl GameSummary {
    pub fn is_ended(&self) -> bool {
        self.status_text == STATUS_ENDED
    }

    pub fn label(&self) -> String {
        format!(
            "{} vs {}",
            self.home_competitor.name, self.away_competitor.name
        )
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompetitorRef {
    pub name: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchRecord {
    pub id: u64,
    #[serde(default)]
    pub round_num: Option<u32>,
    #[serde(default)]
    pub start_time: String,
    #[serde(default)]
    pub status_text: String,
    pub home_competitor: Competitor,
    pub away_competitor: Competitor,
    #[serde(default)]
    pub members: Vec<Member>,
    #[serde(default)]
    pub chart_events: Option<ChartEvents>,
}

impl MatchRecord {
    pub fn competitor(&self, venue: Venue) -> &Competitor {
        match venue {
            Venue::Home => &self.home_competitor,
            Venue::Away => &self.away_competitor,
        }
    }

    pub fn roster(&self, venue: Venue) -> &[RosterMember] {
        self.competitor(venue)
            .lineups
            .as_ref()
            .map(|l| l.members.as_slice())
            .unwrap_or_default()
    }

    pub fn member_names(&self) -> HashMap<i64, &str> {
        self.members
            .iter()
            .map(|m| (m.id, m.name.as_str()))
            .collect()
    }

    pub fn chart_events(&self) -> &[ChartEvent] {
        self.chart_events
            .as_ref()
            .map(|c| c.events.as_slice())
            .unwrap_or_default()
    }

    /// The list endpoint is authoritative for round and kickoff; the detail
    /// payload is only used for lineups and events.
    pub fn with_summary(mut self, summary: &GameSummary) -> Self {
        self.id = summary.id;
        if summary.round_num.is_some() {
            self.round_num = summary.round_num;
        }
        if !summary.start_time.is_empty() {
            self.start_time = summary.start_time.clone();
        }
        self
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Competitor {
    pub name: String,
    #[serde(default, deserialize_with = "lenient_i32")]
    pub score: i32,
    #[serde(default)]
    pub lineups: Option<Lineups>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Lineups {
    #[serde(default)]
    pub members: Vec<RosterMember>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Member {
    #[serde(deserialize_with = "lenient_i64")]
    pub id: i64,
    #[serde(default)]
    pub name: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RosterMember {
    #[serde(deserialize_with = "lenient_i64")]
    pub id: i64,
    #[serde(default)]
    pub position: Option<Position>,
    #[serde(default)]
    pub stats: Vec<RawStat>,
}

impl RosterMember {
    pub fn is_goalkeeper(&self) -> bool {
        self.position
            .as_ref()
            .is_some_and(|p| p.id == GOALKEEPER_POSITION_ID)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Position {
    #[serde(deserialize_with = "lenient_i64")]
    pub id: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RawStat {
    #[serde(rename = "type")]
    pub kind: i64,
    #[serde(default)]
    pub value: Value,
}

impl RawStat {
    /// Stat values arrive as strings ("0.42", "1/2", "1 (1Pk)"), occasionally as numbers.
    pub fn text(&self) -> Option<Cow<'_, str>> {
        match &self.value {
            Value::String(s) => Some(Cow::Borrowed(s.as_str())),
            Value::Number(n) => Some(Cow::Owned(n.to_string())),
            Value::Bool(b) => Some(Cow::Owned(b.to_string())),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ChartEvents {
    #[serde(default)]
    pub events: Vec<ChartEvent>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChartEvent {
    #[serde(default)]
    pub sub_type: Option<i64>,
    #[serde(default)]
    pub player_id: Value,
    #[serde(default)]
    pub xg: Value,
    #[serde(default)]
    pub outcome: Option<Outcome>,
}

impl ChartEvent {
    pub fn player(&self) -> Option<i64> {
        as_i64_any(&self.player_id)
    }

    pub fn xg(&self) -> f64 {
        as_f64_any(&self.xg).unwrap_or(0.0)
    }

    pub fn is_goal(&self) -> bool {
        self.outcome.as_ref().is_some_and(|o| o.name == "Goal")
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Outcome {
    #[serde(default)]
    pub name: String,
}

#[derive(Debug, Deserialize)]
struct GamesPage {
    #[serde(default)]
    games: Vec<Value>,
    #[serde(default)]
    paging: Option<Paging>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Paging {
    previous_page: Option<String>,
    next_page: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PageDirection {
    Previous,
    Next,
}

#[derive(Debug, Clone)]
pub struct ParsedPage {
    pub games: Vec<GameSummary>,
    pub previous_page: Option<String>,
    pub next_page: Option<String>,
}

pub fn parse_games_page_json(raw: &str) -> Result<ParsedPage> {
    let trimmed = raw.trim();
    if trimmed.is_empty() || trimmed == "null" {
        return Ok(ParsedPage {
            games: Vec::new(),
            previous_page: None,
            next_page: None,
        });
    }
    let page: GamesPage = serde_json::from_str(trimmed).context("invalid games page json")?;
    let games = page
        .games
        .into_iter()
        .filter_map(|v| serde_json::from_value::<GameSummary>(v).ok())
        .collect();
    let paging = page.paging.unwrap_or_default();
    Ok(ParsedPage {
        games,
        previous_page: paging.previous_page.and_then(non_empty),
        next_page: paging.next_page.and_then(non_empty),
    })
}

pub fn parse_match_detail_json(raw: &str, game_id: u64) -> Result<MatchRecord, StatsError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() || trimmed == "null" {
        return Err(StatsError::match_fetch(game_id, "empty response"));
    }
    let root: Value = serde_json::from_str(trimmed)
        .map_err(|err| StatsError::match_fetch(game_id, format!("invalid game json: {err}")))?;
    let game = match root.get("game") {
        Some(game) if !game.is_null() => game.clone(),
        _ => return Err(StatsError::match_fetch(game_id, "no game data in response")),
    };
    serde_json::from_value(game)
        .map_err(|err| StatsError::match_fetch(game_id, format!("unexpected game payload: {err}")))
}

pub struct ScoresApi {
    client: &'static Client,
    base_url: String,
    competition_id: u32,
}

impl ScoresApi {
    pub fn new(settings: &ApiSettings) -> Result<Self> {
        Ok(Self {
            client: http_client()?,
            base_url: settings.base_url.trim_end_matches('/').to_string(),
            competition_id: settings.competition_id,
        })
    }

    fn results_path(&self) -> String {
        format!(
            "/web/games/results/?{COMMON_QUERY}&competitions={}",
            self.competition_id
        )
    }

    fn fixtures_path(&self) -> String {
        format!(
            "/web/games/fixtures/?{COMMON_QUERY}&competitions={}",
            self.competition_id
        )
    }

    fn url_for(&self, path: &str) -> String {
        if path.starts_with("http") {
            path.to_string()
        } else {
            format!("{}{path}", self.base_url)
        }
    }

    fn get_text(&self, url: &str) -> Result<Option<String>> {
        let resp = self
            .client
            .get(url)
            .header(USER_AGENT, BROWSER_USER_AGENT)
            .send()
            .context("request failed")?;
        let status = resp.status();
        if !status.is_success() {
            warn!(%url, %status, "upstream returned non-success status");
            return Ok(None);
        }
        resp.text().map(Some).context("failed reading body")
    }

    fn collect_pages(
        &self,
        first_path: String,
        direction: PageDirection,
    ) -> Result<Vec<GameSummary>> {
        let mut out = Vec::new();
        let mut seen = HashSet::new();
        let mut next = Some(first_path);
        while let Some(path) = next.take() {
            if seen.len() >= MAX_PAGES || !seen.insert(path.clone()) {
                break;
            }
            let Some(body) = self.get_text(&self.url_for(&path))? else {
                break;
            };
            let page = parse_games_page_json(&body)?;
            debug!(%path, games = page.games.len(), "fetched games page");
            out.extend(page.games);
            next = match direction {
                PageDirection::Previous => page.previous_page,
                PageDirection::Next => page.next_page,
            };
        }
        Ok(out)
    }
}

impl MatchSource for ScoresApi {
    fn results(&self) -> Result<Vec<GameSummary>> {
        self.collect_pages(self.results_path(), PageDirection::Previous)
    }

    fn fixtures(&self) -> Result<Vec<GameSummary>> {
        self.collect_pages(self.fixtures_path(), PageDirection::Next)
    }

    fn match_detail(&self, game_id: u64) -> Result<MatchRecord, StatsError> {
        let url = self.url_for(&format!("/web/game/?{COMMON_QUERY}&gameId={game_id}"));
        let body = self
            .get_text(&url)
            .map_err(|err| StatsError::match_fetch(game_id, format!("{err:#}")))?
            .ok_or_else(|| StatsError::match_fetch(game_id, "non-success status"))?;
        parse_match_detail_json(&body, game_id)
    }

    fn standings(&self, kind: StandingsKind) -> Result<RankTable, StatsError> {
        let url = self.url_for(&format!(
            "/web/standings/?{COMMON_QUERY}&competitions={}&type={}",
            self.competition_id,
            kind.code()
        ));
        let fail = |reason: String| StatsError::StandingsFetch {
            kind: kind.code(),
            reason,
        };
        let body = self
            .get_text(&url)
            .map_err(|err| fail(format!("{err:#}")))?
            .ok_or_else(|| fail("non-success status".to_string()))?;
        parse_standings_json(&body).map_err(|err| fail(format!("{err:#}")))
    }
}

pub(crate) fn as_i64_any(v: &Value) -> Option<i64> {
    if let Some(n) = v.as_i64() {
        return Some(n);
    }
    if let Some(f) = v.as_f64() {
        return (f.fract() == 0.0).then_some(f as i64);
    }
    v.as_str()?.trim().parse::<i64>().ok()
}

/// Non-finite values ("NaN", "inf") read as absent.
pub(crate) fn as_f64_any(v: &Value) -> Option<f64> {
    let n = match v.as_f64() {
        Some(n) => n,
        None => v.as_str()?.trim().parse::<f64>().ok()?,
    };
    n.is_finite().then_some(n)
}

fn lenient_i64<'de, D>(deserializer: D) -> Result<i64, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    as_i64_any(&value)
        .ok_or_else(|| serde::de::Error::custom(format!("expected integer id, got {value}")))
}

fn lenient_i32<'de, D>(deserializer: D) -> Result<i32, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(as_i64_any(&value)
        .and_then(|n| i32::try_from(n).ok())
        .unwrap_or_default())
}

fn non_empty(raw: String) -> Option<String> {
    if raw.trim().is_empty() { None } else { Some(raw) }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn games_page_skips_malformed_games_and_reads_paging() {
        let raw = r#"{
            "games": [
                {"id": 1, "roundNum": 4, "seasonNum": 53, "startTime": "2025-09-01T18:00:00+00:00",
                 "statusText": "Ended", "homeCompetitor": {"name": "Al Hilal"},
                 "awayCompetitor": {"name": "Al Nassr"}},
                {"roundNum": 4}
            ],
            "paging": {"previousPage": "/web/games/results/?page=2", "nextPage": ""}
        }"#;
        let page = parse_games_page_json(raw).unwrap();
        assert_eq!(page.games.len(), 1);
        assert!(page.games[0].is_ended());
        assert_eq!(page.games[0].label(), "Al Hilal vs Al Nassr");
        assert_eq!(page.previous_page.as_deref(), Some("/web/games/results/?page=2"));
        assert!(page.next_page.is_none());
    }

    #[test]
    fn detail_without_game_is_fetch_error() {
        let err = parse_match_detail_json(r#"{"game": null}"#, 9).unwrap_err();
        assert!(matches!(err, StatsError::MatchFetch { game_id: 9, .. }));
        assert_eq!(err.game_id(), Some(9));
        assert!(parse_match_detail_json("null", 9).is_err());
    }

    #[test]
    fn lenient_numbers_accept_strings() {
        assert_eq!(as_i64_any(&Value::from("17")), Some(17));
        assert_eq!(as_i64_any(&Value::from(3.0)), Some(3));
        assert_eq!(as_i64_any(&Value::from(3.5)), None);
        assert_eq!(as_f64_any(&Value::from("0.76")), Some(0.76));
        assert_eq!(as_f64_any(&Value::Null), None);
    }

    #[test]
    fn non_finite_floats_read_as_absent() {
        assert_eq!(as_f64_any(&Value::from("NaN")), None);
        assert_eq!(as_f64_any(&Value::from("inf")), None);
        assert_eq!(as_f64_any(&Value::from("-infinity")), None);
        assert_eq!(as_f64_any(&Value::from(" 1e2 ")), Some(100.0));
    }
}
