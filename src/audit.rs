use std::collections::HashMap;

use crate::aggregate::{AggregateStore, Entity};
use crate::build_report::{BuildReport, Correction};
use crate::error::StatsError;
use crate::match_feed::MatchRecord;
use crate::records::{GoalkeeperRound, PlayerRound, TeamRound};
use crate::round_builder::{BuildMode, build_match};

pub struct TrackedStat<R> {
    pub name: &'static str,
    pub read: fn(&R) -> f64,
}

const fn stat<R>(name: &'static str, read: fn(&R) -> f64) -> TrackedStat<R> {
    TrackedStat { name, read }
}

pub trait Tracked: Sized + 'static {
    const TRACKED: &'static [TrackedStat<Self>];
}

impl Tracked for PlayerRound {
    const TRACKED: &'static [TrackedStat<Self>] = &[
        stat("GOALS", |r: &PlayerRound| r.goals),
        stat("PENALTIES_SCORED", |r: &PlayerRound| f64::from(r.penalties_scored)),
        stat("PENALTIES_MISSED", |r: &PlayerRound| f64::from(r.penalties_missed)),
        stat("XG", |r: &PlayerRound| r.xg),
        stat("NPXG", |r: &PlayerRound| r.npxg),
        stat("XA", |r: &PlayerRound| r.xa),
        stat("ASSISTS", |r: &PlayerRound| r.assists),
        stat("MATCHES_PLAYED", |r: &PlayerRound| f64::from(r.meta.matches_played)),
    ];
}

impl Tracked for GoalkeeperRound {
    const TRACKED: &'static [TrackedStat<Self>] = &[
        stat("CLEAN_SHEETS", |r: &GoalkeeperRound| f64::from(r.clean_sheet)),
        stat("SAVES", |r: &GoalkeeperRound| r.saves),
        stat("XG_PREVENTED", |r: &GoalkeeperRound| r.xg_prevented),
        stat("PENALTIES_SAVED", |r: &GoalkeeperRound| f64::from(r.penalties_saved)),
        stat("PENALTIES_FACED", |r: &GoalkeeperRound| f64::from(r.penalties_faced)),
        stat("MATCHES_PLAYED", |r: &GoalkeeperRound| f64::from(r.meta.matches_played)),
    ];
}

impl Tracked for TeamRound {
    const TRACKED: &'static [TrackedStat<Self>] = &[
        stat("XG", |r: &TeamRound| r.xg),
        stat("NPXG", |r: &TeamRound| r.npxg),
        stat("XGC", |r: &TeamRound| r.xg_conceded),
        stat("NPXGC", |r: &TeamRound| r.npxg_conceded),
        stat("GOALS_FOR", |r: &TeamRound| f64::from(r.goals_for)),
        stat("PENALTIES_SCORED", |r: &TeamRound| f64::from(r.penalties_scored)),
        stat("PENALTIES_MISSED", |r: &TeamRound| f64::from(r.penalties_missed)),
        stat("MATCHES_PLAYED", |r: &TeamRound| f64::from(r.meta.matches_played)),
    ];
}

/// Rebuilds `game` in audit mode, merges it, and diffs its round against the
/// pre-merge snapshot. On error the store is left untouched.
pub fn audit_match(
    store: &mut AggregateStore,
    game: &MatchRecord,
    scratch: &mut BuildReport,
) -> Result<Vec<Correction>, StatsError> {
    let rounds = build_match(game, BuildMode::Audit, scratch)?;
    let round_num = rounds.round_num;
    let before = store.clone();
    store.merge(rounds);

    let mut out = Vec::new();
    diff_collection(before.players(), store.players(), round_num, &mut out);
    diff_collection(before.goalkeepers(), store.goalkeepers(), round_num, &mut out);
    diff_collection(before.teams(), store.teams(), round_num, &mut out);
    Ok(out)
}

pub fn diff_collection<E>(
    before: &HashMap<String, E>,
    after: &HashMap<String, E>,
    round_num: u32,
    out: &mut Vec<Correction>,
) where
    E: Entity,
    E::Round: Tracked,
{
    let mut names: Vec<&String> = after.keys().collect();
    names.sort();

    for name in names {
        let Some(stored) = before.get(name) else {
            continue;
        };
        let (Some(old), Some(new)) = (stored.round(round_num), after[name].round(round_num))
        else {
            continue;
        };
        for tracked in <E::Round as Tracked>::TRACKED {
            let old_value = (tracked.read)(old);
            let new_value = (tracked.read)(new);
            if old_value != new_value {
                out.push(Correction {
                    name: name.clone(),
                    stat_name: tracked.name.to_string(),
                    old_value,
                    new_value,
                    round_num,
                });
            }
        }
    }
}
