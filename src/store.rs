use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::Utc;
use reqwest::blocking::Client;
use reqwest::header::{ACCEPT, AUTHORIZATION, USER_AGENT};
use rusqlite::{Connection, OptionalExtension, params};
use serde_json::{Value, json};
use tracing::debug;

use crate::documents::DocumentRef;
use crate::error::StatsError;
use crate::http_client::{APP_USER_AGENT, http_client};

pub trait DocumentStore {
    fn get(&self, doc: &DocumentRef) -> Result<Option<Value>, StatsError>;
    fn put(&self, doc: &DocumentRef, body: &Value) -> Result<(), StatsError>;
}

pub struct SqliteStore {
    conn: Connection,
}

impl SqliteStore {
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).ok();
        }
        let conn =
            Connection::open(path).with_context(|| format!("open sqlite db {}", path.display()))?;
        init_schema(&conn)?;
        Ok(Self { conn })
    }

    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().context("open in-memory sqlite db")?;
        init_schema(&conn)?;
        Ok(Self { conn })
    }
}

pub fn default_db_path() -> Option<PathBuf> {
    if let Ok(base) = std::env::var("XDG_CACHE_HOME")
        && !base.trim().is_empty()
    {
        return Some(PathBuf::from(base).join("spl_stats").join("documents.sqlite"));
    }
    let home = std::env::var("HOME").ok()?;
    if home.trim().is_empty() {
        return None;
    }
    Some(
        PathBuf::from(home)
            .join(".cache")
            .join("spl_stats")
            .join("documents.sqlite"),
    )
}

fn init_schema(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        r#"
        CREATE TABLE IF NOT EXISTS documents (
            id TEXT NOT NULL,
            file TEXT NOT NULL,
            body TEXT NOT NULL,
            updated_at TEXT NOT NULL,
            PRIMARY KEY (id, file)
        );
        "#,
    )
    .context("create sqlite schema")?;
    Ok(())
}

impl DocumentStore for SqliteStore {
    fn get(&self, doc: &DocumentRef) -> Result<Option<Value>, StatsError> {
        let body = self
            .conn
            .query_row(
                "SELECT body FROM documents WHERE id = ?1 AND file = ?2",
                params![doc.id, doc.file_name()],
                |row| row.get::<_, String>(0),
            )
            .optional()
            .map_err(|err| StatsError::store(&doc.id, err))?;
        let Some(body) = body else {
            return Ok(None);
        };
        serde_json::from_str(&body)
            .map(Some)
            .map_err(|err| StatsError::store(&doc.id, format!("stored body is not json: {err}")))
    }

    fn put(&self, doc: &DocumentRef, body: &Value) -> Result<(), StatsError> {
        let text = serde_json::to_string(body).map_err(|err| StatsError::store(&doc.id, err))?;
        self.conn
            .execute(
                r#"
                INSERT INTO documents (id, file, body, updated_at)
                VALUES (?1, ?2, ?3, ?4)
                ON CONFLICT(id, file) DO UPDATE SET
                    body = excluded.body,
                    updated_at = excluded.updated_at
                "#,
                params![doc.id, doc.file_name(), text, Utc::now().to_rfc3339()],
            )
            .map_err(|err| StatsError::store(&doc.id, err))?;
        debug!(id = %doc.id, file = doc.file_name(), bytes = text.len(), "stored document");
        Ok(())
    }
}

pub struct GistStore {
    client: &'static Client,
    api_base: String,
    token: String,
}

impl GistStore {
    pub fn new(api_base: &str, token: &str) -> Result<Self> {
        Ok(Self {
            client: http_client()?,
            api_base: api_base.trim_end_matches('/').to_string(),
            token: token.to_string(),
        })
    }

    fn gist_url(&self, id: &str) -> String {
        format!("{}/gists/{id}", self.api_base)
    }
}

impl DocumentStore for GistStore {
    fn get(&self, doc: &DocumentRef) -> Result<Option<Value>, StatsError> {
        let resp = self
            .client
            .get(self.gist_url(&doc.id))
            .header(AUTHORIZATION, format!("token {}", self.token))
            .header(ACCEPT, "application/vnd.github+json")
            .header(USER_AGENT, APP_USER_AGENT)
            .send()
            .map_err(|err| StatsError::store(&doc.id, err))?;
        let status = resp.status();
        if !status.is_success() {
            return Err(StatsError::store(&doc.id, format!("http {status}")));
        }
        let gist: Value = resp.json().map_err(|err| StatsError::store(&doc.id, err))?;
        let Some(content) = gist
            .get("files")
            .and_then(|files| files.get(doc.file_name()))
            .and_then(|file| file.get("content"))
            .and_then(|c| c.as_str())
        else {
            return Ok(None);
        };
        serde_json::from_str(content)
            .map(Some)
            .map_err(|err| StatsError::store(&doc.id, format!("gist file is not json: {err}")))
    }

    fn put(&self, doc: &DocumentRef, body: &Value) -> Result<(), StatsError> {
        let content =
            serde_json::to_string_pretty(body).map_err(|err| StatsError::store(&doc.id, err))?;
        let payload = json!({ "files": { doc.file_name(): { "content": content } } });
        let resp = self
            .client
            .patch(self.gist_url(&doc.id))
            .header(AUTHORIZATION, format!("token {}", self.token))
            .header(ACCEPT, "application/vnd.github+json")
            .header(USER_AGENT, APP_USER_AGENT)
            .json(&payload)
            .send()
            .map_err(|err| StatsError::store(&doc.id, err))?;
        let status = resp.status();
        if !status.is_success() {
            return Err(StatsError::store(&doc.id, format!("http {status}")));
        }
        debug!(id = %doc.id, file = doc.file_name(), "patched gist");
        Ok(())
    }
}
