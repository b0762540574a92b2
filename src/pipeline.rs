use std::fmt;

use anyhow::{Context, Result};
use chrono::{DateTime, Duration, Utc};
use rayon::prelude::*;
use tracing::{debug, error, info, warn};

use crate::audit::audit_match;
use crate::build_report::BuildReport;
use crate::config::{AuditWindow, Settings};
use crate::documents::{RunState, load_state, save_schedule, save_state};
use crate::error::StatsError;
use crate::match_feed::{GameSummary, MatchRecord, MatchSource};
use crate::round_builder::{BuildMode, build_match};
use crate::schedule::build_schedule;
use crate::standings::fetch_league_standings;
use crate::store::DocumentStore;

const PREFETCH_PER_THREAD: usize = 4;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub considered: usize,
    pub processed: usize,
    pub failed: usize,
    pub corrections: usize,
    pub warnings: usize,
    pub written: bool,
}

impl fmt::Display for RunSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "considered={} processed={} failed={} corrections={} warnings={} written={}",
            self.considered,
            self.processed,
            self.failed,
            self.corrections,
            self.warnings,
            self.written
        )
    }
}

#[derive(Debug, Clone, Copy)]
enum FailureNote {
    Retry,
    Rebuild,
}

impl FailureNote {
    fn message(self, game_id: u64) -> String {
        match self {
            FailureNote::Retry => {
                format!("Failed to process gameId {game_id}. It will be retried later.")
            }
            FailureNote::Rebuild => format!("Failed to process gameId {game_id} during rebuild."),
        }
    }
}

pub fn select_new_games(
    games: &[GameSummary],
    season_num: u32,
    state: &RunState,
) -> Vec<GameSummary> {
    games
        .iter()
        .filter(|game| {
            let in_season = game.season_num == Some(season_num);
            let ended = game.is_ended();
            let fresh = !state.is_processed(game.id);
            debug!(
                game_id = game.id,
                round = ?game.round_num,
                fixture = %game.label(),
                in_season,
                ended,
                fresh,
                "evaluated game"
            );
            in_season && ended && fresh
        })
        .cloned()
        .collect()
}

pub fn select_season_games(games: &[GameSummary], season_num: u32) -> Vec<GameSummary> {
    games
        .iter()
        .filter(|game| game.season_num == Some(season_num) && game.is_ended())
        .cloned()
        .collect()
}

/// Finished games that kicked off strictly inside the audit window. Games
/// with an unreadable start time are skipped.
pub fn select_audit_games(
    games: &[GameSummary],
    window: AuditWindow,
    now: DateTime<Utc>,
) -> Vec<GameSummary> {
    let start = now - Duration::hours(window.start_hours);
    let end = now - Duration::hours(window.end_hours);
    games
        .iter()
        .filter(|game| game.is_ended())
        .filter(|game| match parse_start_time(&game.start_time) {
            Some(kickoff) => kickoff > start && kickoff < end,
            None => {
                debug!(game_id = game.id, start_time = %game.start_time, "unreadable start time");
                false
            }
        })
        .cloned()
        .collect()
}

fn parse_start_time(raw: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw.trim())
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

pub fn run_update(
    source: &dyn MatchSource,
    store: &dyn DocumentStore,
    settings: &Settings,
) -> Result<RunSummary> {
    info!(season = settings.season_num, "starting update run");
    let mut state = load_state(store, &settings.documents)?;
    let results = source.results().context("fetch results list")?;
    info!(games = results.len(), "fetched results list");

    let games = select_new_games(&results, settings.season_num, &state);
    let mut summary = RunSummary {
        considered: games.len(),
        ..RunSummary::default()
    };
    if games.is_empty() {
        info!("no new games to process");
        return Ok(summary);
    }
    info!(
        games = games.len(),
        ids = ?games.iter().map(|g| g.id).collect::<Vec<_>>(),
        "processing new games"
    );

    let warnings_before = state.report.warning_count();
    let (processed, failed) = process_games(
        &mut state,
        source,
        &games,
        settings.fetch_parallelism,
        FailureNote::Retry,
    );
    summary.processed = processed;
    summary.failed = failed;
    summary.warnings = state.report.warning_count() - warnings_before;

    finish_build(&mut state, source, store, settings)?;
    summary.written = true;
    info!(%summary, "update run complete");
    Ok(summary)
}

pub fn run_rebuild(
    source: &dyn MatchSource,
    store: &dyn DocumentStore,
    settings: &Settings,
) -> Result<RunSummary> {
    info!(season = settings.season_num, "starting rebuild run");
    let results = source.results().context("fetch results list")?;
    let games = select_season_games(&results, settings.season_num);
    let mut summary = RunSummary {
        considered: games.len(),
        ..RunSummary::default()
    };
    if games.is_empty() {
        warn!("no finished games found, nothing to rebuild");
        return Ok(summary);
    }

    let mut state = RunState::fresh();
    let (processed, failed) = process_games(
        &mut state,
        source,
        &games,
        settings.fetch_parallelism,
        FailureNote::Rebuild,
    );
    summary.processed = processed;
    summary.failed = failed;
    summary.warnings = state.report.warning_count();

    finish_build(&mut state, source, store, settings)?;
    summary.written = true;
    info!(%summary, "rebuild run complete");
    Ok(summary)
}

pub fn run_audit(
    source: &dyn MatchSource,
    store: &dyn DocumentStore,
    settings: &Settings,
) -> Result<RunSummary> {
    run_audit_at(source, store, settings, Utc::now())
}

pub fn run_audit_at(
    source: &dyn MatchSource,
    store: &dyn DocumentStore,
    settings: &Settings,
    now: DateTime<Utc>,
) -> Result<RunSummary> {
    let results = source.results().context("fetch results list")?;
    let games = select_audit_games(&results, settings.audit_window, now);
    let mut summary = RunSummary {
        considered: games.len(),
        ..RunSummary::default()
    };
    if games.is_empty() {
        info!("no games in the audit window");
        return Ok(summary);
    }
    info!(games = games.len(), "auditing recent games");

    let mut state = load_state(store, &settings.documents)?;
    let mut corrections = Vec::new();
    // Audit-mode warnings are never persisted.
    let mut scratch = BuildReport::new();

    for_each_fetched(source, &games, settings.fetch_parallelism, |game, fetched| {
        let outcome =
            fetched.and_then(|record| audit_match(&mut state.aggregates, &record, &mut scratch));
        match outcome {
            Ok(found) => {
                summary.processed += 1;
                if !found.is_empty() {
                    info!(game_id = game.id, corrections = found.len(), "values revised upstream");
                }
                corrections.extend(found);
            }
            Err(err) => {
                summary.failed += 1;
                error!(game_id = game.id, error = %err, "could not audit game");
            }
        }
    });

    summary.corrections = corrections.len();
    if corrections.is_empty() {
        info!("audit complete, no corrections needed");
        return Ok(summary);
    }

    state.report.replace_corrections(corrections);
    save_state(store, &settings.documents, &state)?;
    summary.written = true;
    info!(%summary, "audit run complete");
    Ok(summary)
}

pub fn run_schedule(
    source: &dyn MatchSource,
    store: &dyn DocumentStore,
    settings: &Settings,
) -> Result<RunSummary> {
    let mut games = source.results().context("fetch results list")?;
    games.extend(source.fixtures().context("fetch fixtures list")?);
    let schedule = build_schedule(&games, settings.season_num);
    save_schedule(store, &settings.documents, &schedule)?;
    info!(entries = schedule.schedule.len(), "schedule written");
    Ok(RunSummary {
        considered: games.len(),
        processed: schedule.schedule.len(),
        written: true,
        ..RunSummary::default()
    })
}

fn finish_build(
    state: &mut RunState,
    source: &dyn MatchSource,
    store: &dyn DocumentStore,
    settings: &Settings,
) -> Result<()> {
    let standings = fetch_league_standings(source)?;
    state.aggregates.apply_standings(&standings);
    save_state(store, &settings.documents, state)
}

fn process_games(
    state: &mut RunState,
    source: &dyn MatchSource,
    games: &[GameSummary],
    threads: usize,
    note: FailureNote,
) -> (usize, usize) {
    let mut processed = 0;
    let mut failed = 0;
    for_each_fetched(source, games, threads, |game, fetched| {
        let built =
            fetched.and_then(|record| build_match(&record, BuildMode::Build, &mut state.report));
        match built {
            Ok(rounds) => {
                let round_num = rounds.round_num;
                state.aggregates.merge(rounds);
                state.mark_processed(game.id);
                processed += 1;
                info!(game_id = game.id, round = round_num, fixture = %game.label(), "merged game");
            }
            Err(err) => {
                failed += 1;
                error!(game_id = game.id, error = %err, "could not process game");
                state.report.error(note.message(game.id));
            }
        }
    });
    (processed, failed)
}

/// Fetches details chunk by chunk on the fetch pool and hands each result to
/// `handle` in the original list order.
fn for_each_fetched<F>(
    source: &dyn MatchSource,
    games: &[GameSummary],
    threads: usize,
    mut handle: F,
) where
    F: FnMut(&GameSummary, Result<MatchRecord, StatsError>),
{
    let threads = threads.max(1);
    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(threads)
        .build()
        .map_err(|err| warn!(error = %err, "fetch pool unavailable, using global pool"))
        .ok();

    for chunk in games.chunks(threads * PREFETCH_PER_THREAD) {
        let fetch = || -> Vec<Result<MatchRecord, StatsError>> {
            chunk
                .par_iter()
                .map(|game| {
                    source
                        .match_detail(game.id)
                        .map(|record| record.with_summary(game))
                })
                .collect()
        };
        let fetched = match &pool {
            Some(pool) => pool.install(fetch),
            None => fetch(),
        };
        for (game, result) in chunk.iter().zip(fetched) {
            handle(game, result);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::match_feed::parse_games_page_json;

    fn games() -> Vec<GameSummary> {
        let raw = r#"{"games": [
            {"id": 10, "roundNum": 1, "seasonNum": 53, "statusText": "Ended",
             "startTime": "2025-09-01T18:00:00+00:00",
             "homeCompetitor": {"name": "A"}, "awayCompetitor": {"name": "B"}},
            {"id": 11, "roundNum": 2, "seasonNum": 53, "statusText": "Ended",
             "startTime": "2025-09-09T18:00:00+00:00",
             "homeCompetitor": {"name": "C"}, "awayCompetitor": {"name": "D"}},
            {"id": 12, "roundNum": 2, "seasonNum": 53, "statusText": "Scheduled",
             "startTime": "2025-09-09T21:00:00+00:00",
             "homeCompetitor": {"name": "E"}, "awayCompetitor": {"name": "F"}},
            {"id": 13, "roundNum": 30, "seasonNum": 52, "statusText": "Ended",
             "startTime": "2025-05-01T18:00:00+00:00",
             "homeCompetitor": {"name": "G"}, "awayCompetitor": {"name": "H"}}
        ]}"#;
        parse_games_page_json(raw).unwrap().games
    }

    fn ids(games: &[GameSummary]) -> Vec<u64> {
        games.iter().map(|g| g.id).collect()
    }

    #[test]
    fn new_games_skip_processed_unfinished_and_other_seasons() {
        let mut state = RunState::fresh();
        state.mark_processed(10);
        assert_eq!(ids(&select_new_games(&games(), 53, &state)), vec![11]);
        assert_eq!(ids(&select_season_games(&games(), 53)), vec![10, 11]);
    }

    #[test]
    fn audit_window_is_exclusive_on_both_ends() {
        let window = AuditWindow {
            start_hours: 48,
            end_hours: 24,
        };
        let now = DateTime::parse_from_rfc3339("2025-09-10T20:00:00+00:00")
            .unwrap()
            .with_timezone(&Utc);
        assert_eq!(ids(&select_audit_games(&games(), window, now)), vec![11]);

        // Kick-off exactly 24h ago is outside.
        let edge = DateTime::parse_from_rfc3339("2025-09-10T18:00:00+00:00")
            .unwrap()
            .with_timezone(&Utc);
        assert!(select_audit_games(&games(), window, edge).is_empty());
    }

    #[test]
    fn failure_messages_name_the_game() {
        assert_eq!(
            FailureNote::Retry.message(7),
            "Failed to process gameId 7. It will be retried later."
        );
        assert_eq!(
            FailureNote::Rebuild.message(7),
            "Failed to process gameId 7 during rebuild."
        );
    }
}
