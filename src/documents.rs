use std::collections::HashSet;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::{debug, info};

use crate::aggregate::{AggregateStore, PlayerAggregate, TeamAggregate};
use crate::build_report::BuildReport;
use crate::records::{GoalkeeperRound, PlayerRound};
use crate::schedule::ScheduleDocument;
use crate::store::DocumentStore;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentKind {
    Players,
    Teams,
    Schedule,
}

impl DocumentKind {
    pub fn file_name(self) -> &'static str {
        match self {
            DocumentKind::Players => "player-stats.json",
            DocumentKind::Teams => "team-stats.json",
            DocumentKind::Schedule => "schedule.json",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentRef {
    pub id: String,
    pub kind: DocumentKind,
}

impl DocumentRef {
    pub fn new(id: impl Into<String>, kind: DocumentKind) -> Self {
        Self {
            id: id.into(),
            kind,
        }
    }

    pub fn file_name(&self) -> &'static str {
        self.kind.file_name()
    }
}

#[derive(Debug, Clone)]
pub struct DocumentIds {
    pub players: DocumentRef,
    pub teams: DocumentRef,
    pub schedule: DocumentRef,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerDocument {
    #[serde(default)]
    pub processed_game_ids: Vec<u64>,
    #[serde(default)]
    pub players: Vec<PlayerAggregate<PlayerRound>>,
    #[serde(default)]
    pub goalkeepers: Vec<PlayerAggregate<GoalkeeperRound>>,
    #[serde(default)]
    pub build_report: BuildReport,
    /// Top-level keys this crate does not own; written back untouched.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TeamDocument {
    #[serde(default)]
    pub teams: Vec<TeamAggregate>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Default)]
pub struct RunState {
    pub aggregates: AggregateStore,
    pub report: BuildReport,
    processed_game_ids: Vec<u64>,
    processed_lookup: HashSet<u64>,
    player_extra: Map<String, Value>,
    team_extra: Map<String, Value>,
}

impl RunState {
    pub fn fresh() -> Self {
        Self::default()
    }

    pub fn from_documents(player: PlayerDocument, team: TeamDocument) -> Self {
        let processed_lookup = player.processed_game_ids.iter().copied().collect();
        Self {
            aggregates: AggregateStore::from_parts(player.players, player.goalkeepers, team.teams),
            report: player.build_report,
            processed_game_ids: player.processed_game_ids,
            processed_lookup,
            player_extra: player.extra,
            team_extra: team.extra,
        }
    }

    pub fn to_documents(&self) -> (PlayerDocument, TeamDocument) {
        let player = PlayerDocument {
            processed_game_ids: self.processed_game_ids.clone(),
            players: self.aggregates.sorted_players(),
            goalkeepers: self.aggregates.sorted_goalkeepers(),
            build_report: self.report.clone(),
            extra: self.player_extra.clone(),
        };
        let team = TeamDocument {
            teams: self.aggregates.sorted_teams(),
            extra: self.team_extra.clone(),
        };
        (player, team)
    }

    pub fn processed_game_ids(&self) -> &[u64] {
        &self.processed_game_ids
    }

    pub fn is_processed(&self, game_id: u64) -> bool {
        self.processed_lookup.contains(&game_id)
    }

    pub fn mark_processed(&mut self, game_id: u64) {
        if self.processed_lookup.insert(game_id) {
            self.processed_game_ids.push(game_id);
        }
    }
}

/// A missing document reads as empty, the state of a brand-new season.
pub fn load_state(store: &dyn DocumentStore, ids: &DocumentIds) -> Result<RunState> {
    let player: PlayerDocument = load_document(store, &ids.players)?.unwrap_or_default();
    let team: TeamDocument = load_document(store, &ids.teams)?.unwrap_or_default();
    info!(
        processed = player.processed_game_ids.len(),
        players = player.players.len(),
        goalkeepers = player.goalkeepers.len(),
        teams = team.teams.len(),
        "loaded aggregate documents"
    );
    Ok(RunState::from_documents(player, team))
}

pub fn save_state(store: &dyn DocumentStore, ids: &DocumentIds, state: &RunState) -> Result<()> {
    let (player, team) = state.to_documents();
    save_document(store, &ids.players, &player)?;
    save_document(store, &ids.teams, &team)?;
    info!(
        players = player.players.len(),
        teams = team.teams.len(),
        report_entries = player.build_report.len(),
        "saved aggregate documents"
    );
    Ok(())
}

pub fn save_schedule(
    store: &dyn DocumentStore,
    ids: &DocumentIds,
    schedule: &ScheduleDocument,
) -> Result<()> {
    save_document(store, &ids.schedule, schedule)
}

pub fn load_document<T>(store: &dyn DocumentStore, doc: &DocumentRef) -> Result<Option<T>>
where
    T: for<'de> Deserialize<'de>,
{
    let Some(value) = store.get(doc)? else {
        debug!(id = %doc.id, file = doc.file_name(), "document not found");
        return Ok(None);
    };
    let parsed = serde_json::from_value(value)
        .with_context(|| format!("decode {} ({})", doc.file_name(), doc.id))?;
    Ok(Some(parsed))
}

pub fn save_document<T: Serialize>(
    store: &dyn DocumentStore,
    doc: &DocumentRef,
    body: &T,
) -> Result<()> {
    let value = serde_json::to_value(body)
        .with_context(|| format!("encode {}", doc.file_name()))?;
    store.put(doc, &value)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_top_level_fields_survive_round_trip() {
        let raw = r#"{"processedGameIds": [3, 1], "players": [], "goalkeepers": [],
                      "buildReport": [{"type": "error", "message": "boom"}],
                      "lastUpdated": "2025-10-01"}"#;
        let doc: PlayerDocument = serde_json::from_str(raw).unwrap();
        let state = RunState::from_documents(doc, TeamDocument::default());
        assert!(state.is_processed(3));
        assert!(!state.is_processed(2));
        assert_eq!(state.report.error_count(), 1);

        let (player, _) = state.to_documents();
        let value = serde_json::to_value(&player).unwrap();
        assert_eq!(value["lastUpdated"], "2025-10-01");
        assert_eq!(value["processedGameIds"], serde_json::json!([3, 1]));
    }

    #[test]
    fn mark_processed_keeps_order_without_duplicates() {
        let mut state = RunState::fresh();
        state.mark_processed(9);
        state.mark_processed(4);
        state.mark_processed(9);
        assert_eq!(state.processed_game_ids(), &[9, 4]);
    }

    #[test]
    fn empty_object_reads_as_default_documents() {
        let player: PlayerDocument = serde_json::from_str("{}").unwrap();
        let team: TeamDocument = serde_json::from_str("{}").unwrap();
        assert!(player.players.is_empty());
        assert!(player.build_report.is_empty());
        assert!(team.teams.is_empty());
    }
}
