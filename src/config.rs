use std::env;
use std::path::PathBuf;
use std::str::FromStr;

use thiserror::Error;

use crate::documents::{DocumentIds, DocumentKind, DocumentRef};
use crate::store::default_db_path;

pub const DEFAULT_API_BASE: &str = "https://webws.365scores.com";
pub const DEFAULT_GITHUB_API_BASE: &str = "https://api.github.com";
pub const DEFAULT_COMPETITION_ID: u32 = 649;
pub const DEFAULT_SEASON_NUM: u32 = 53;
pub const DEFAULT_FETCH_PARALLELISM: usize = 6;
pub const DEFAULT_AUDIT_WINDOW_START_HOURS: i64 = 48;
pub const DEFAULT_AUDIT_WINDOW_END_HOURS: i64 = 24;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required setting `{key}`")]
    MissingVar { key: &'static str },

    #[error("validation error for `{key}`: {message}")]
    ValidationError { key: &'static str, message: String },
}

#[derive(Debug, Clone)]
pub struct ApiSettings {
    pub base_url: String,
    pub competition_id: u32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreBackend {
    Sqlite { path: PathBuf },
    Gist { api_base: String, token: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AuditWindow {
    pub start_hours: i64,
    pub end_hours: i64,
}

#[derive(Debug, Clone)]
pub struct Settings {
    pub api: ApiSettings,
    pub season_num: u32,
    pub fetch_parallelism: usize,
    pub audit_window: AuditWindow,
    pub backend: StoreBackend,
    pub documents: DocumentIds,
}

impl Settings {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let api = ApiSettings {
            base_url: get("SPL_API_BASE").unwrap_or_else(|| DEFAULT_API_BASE.to_string()),
            competition_id: parse_or(get("SPL_COMPETITION_ID"), DEFAULT_COMPETITION_ID),
        };
        let season_num = parse_or(get("SPL_SEASON_NUM"), DEFAULT_SEASON_NUM);
        let fetch_parallelism =
            parse_or(get("FETCH_PARALLELISM"), DEFAULT_FETCH_PARALLELISM).clamp(1, 32);

        let audit_window = AuditWindow {
            start_hours: parse_or(
                get("AUDIT_WINDOW_START_HOURS"),
                DEFAULT_AUDIT_WINDOW_START_HOURS,
            )
            .clamp(1, 24 * 30),
            end_hours: parse_or(get("AUDIT_WINDOW_END_HOURS"), DEFAULT_AUDIT_WINDOW_END_HOURS)
                .clamp(0, 24 * 30),
        };
        if audit_window.start_hours <= audit_window.end_hours {
            return Err(ConfigError::ValidationError {
                key: "AUDIT_WINDOW_START_HOURS",
                message: format!(
                    "window start ({}h) must be further back than its end ({}h)",
                    audit_window.start_hours, audit_window.end_hours
                ),
            });
        }

        let backend_name = get("STORE_BACKEND").unwrap_or_else(|| "sqlite".to_string());
        let (backend, documents) = match backend_name.to_ascii_lowercase().as_str() {
            "sqlite" => {
                let path = get("STORE_DB_PATH")
                    .map(PathBuf::from)
                    .or_else(default_db_path)
                    .ok_or(ConfigError::MissingVar {
                        key: "STORE_DB_PATH",
                    })?;
                let fallback = format!("season-{season_num}");
                let players = get("PLAYER_DOC_ID").unwrap_or_else(|| fallback.clone());
                let documents = document_ids(&get, players);
                (StoreBackend::Sqlite { path }, documents)
            }
            "gist" => {
                let token = get("GITHUB_GIST_TOKEN").ok_or(ConfigError::MissingVar {
                    key: "GITHUB_GIST_TOKEN",
                })?;
                let players = get("PLAYER_DOC_ID").ok_or(ConfigError::MissingVar {
                    key: "PLAYER_DOC_ID",
                })?;
                let api_base = get("GITHUB_API_BASE")
                    .unwrap_or_else(|| DEFAULT_GITHUB_API_BASE.to_string());
                let documents = document_ids(&get, players);
                (StoreBackend::Gist { api_base, token }, documents)
            }
            other => {
                return Err(ConfigError::ValidationError {
                    key: "STORE_BACKEND",
                    message: format!("unknown backend `{other}` (expected sqlite or gist)"),
                });
            }
        };

        Ok(Self {
            api,
            season_num,
            fetch_parallelism,
            audit_window,
            backend,
            documents,
        })
    }

    pub fn with_db_override(mut self, path: Option<PathBuf>) -> Self {
        if let (Some(path), StoreBackend::Sqlite { .. }) = (path, &self.backend) {
            self.backend = StoreBackend::Sqlite { path };
        }
        self
    }
}

/// Team and schedule documents default to the player document's id; the
/// file name keeps them apart.
fn document_ids<G>(get: &G, players: String) -> DocumentIds
where
    G: Fn(&str) -> Option<String>,
{
    let teams = get("TEAM_DOC_ID").unwrap_or_else(|| players.clone());
    let schedule = get("SCHEDULE_DOC_ID").unwrap_or_else(|| players.clone());
    DocumentIds {
        players: DocumentRef::new(players, DocumentKind::Players),
        teams: DocumentRef::new(teams, DocumentKind::Teams),
        schedule: DocumentRef::new(schedule, DocumentKind::Schedule),
    }
}

fn parse_or<T: FromStr>(raw: Option<String>, default: T) -> T {
    raw.and_then(|v| v.parse::<T>().ok()).unwrap_or(default)
}
