use thiserror::Error;

/// Failures that callers match on. Everything else travels as `anyhow::Error`.
#[derive(Debug, Error)]
pub enum StatsError {
    #[error("failed to fetch details for gameId {game_id}: {reason}")]
    MatchFetch { game_id: u64, reason: String },

    #[error("failed to process gameId {game_id}: {reason}")]
    MatchProcessing { game_id: u64, reason: String },

    #[error("failed to fetch standings type {kind}: {reason}")]
    StandingsFetch { kind: u8, reason: String },

    #[error("document store error for `{id}`: {reason}")]
    Store { id: String, reason: String },
}

impl StatsError {
    pub fn match_fetch(game_id: u64, reason: impl ToString) -> Self {
        Self::MatchFetch {
            game_id,
            reason: reason.to_string(),
        }
    }

    pub fn match_processing(game_id: u64, reason: impl ToString) -> Self {
        Self::MatchProcessing {
            game_id,
            reason: reason.to_string(),
        }
    }

    pub fn store(id: &str, reason: impl ToString) -> Self {
        Self::Store {
            id: id.to_string(),
            reason: reason.to_string(),
        }
    }

    pub fn game_id(&self) -> Option<u64> {
        match self {
            Self::MatchFetch { game_id, .. } | Self::MatchProcessing { game_id, .. } => {
                Some(*game_id)
            }
            _ => None,
        }
    }
}
