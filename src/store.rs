//! Session state store
//!
//! One record per session, addressed by `SESSION#<key>` / `STATE` inside a
//! configured namespace. Writes are unconditional full overwrites: the last
//! write wins and no version check is made.

mod schema;

pub use schema::*;

use crate::session_key::SessionKey;
use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use thiserror::Error;
use tokio::sync::OnceCell;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("Session not found: {0}")]
    NotFound(String),
    #[error("Failed to prepare database directory: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to encode or decode session fields: {0}")]
    Encode(#[from] serde_json::Error),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Key/value persistence of per-session state
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Get the stored session, `None` if it was never written
    async fn get(&self, key: &SessionKey) -> StoreResult<Option<Session>>;

    /// Overwrite stage and metadata for the session
    async fn put(
        &self,
        key: &SessionKey,
        stage: &str,
        extra: &BTreeMap<String, String>,
    ) -> StoreResult<()>;
}

#[derive(Debug, Clone)]
enum Location {
    File(PathBuf),
    Memory,
}

/// SQLite-backed session store.
///
/// The connection is opened (and migrated) on first use and then shared by
/// every request.
#[derive(Clone)]
pub struct SqliteStore {
    location: Location,
    namespace: String,
    environment: String,
    conn: Arc<OnceCell<Mutex<Connection>>>,
}

impl SqliteStore {
    /// Store backed by the database file at `path`
    pub fn open(path: impl Into<PathBuf>, namespace: &str, environment: &str) -> Self {
        Self::with_location(Location::File(path.into()), namespace, environment)
    }

    /// In-memory store (for testing)
    pub fn open_in_memory(namespace: &str, environment: &str) -> Self {
        Self::with_location(Location::Memory, namespace, environment)
    }

    fn with_location(location: Location, namespace: &str, environment: &str) -> Self {
        Self {
            location,
            namespace: namespace.to_string(),
            environment: environment.to_string(),
            conn: Arc::new(OnceCell::new()),
        }
    }

    async fn conn(&self) -> StoreResult<&Mutex<Connection>> {
        self.conn
            .get_or_try_init(|| async {
                let conn = match &self.location {
                    Location::File(path) => {
                        if let Some(parent) = path.parent() {
                            std::fs::create_dir_all(parent)?;
                        }
                        tracing::info!(path = %path.display(), namespace = %self.namespace, "Opening state store");
                        Connection::open(path)?
                    }
                    Location::Memory => Connection::open_in_memory()?,
                };
                conn.execute_batch(SCHEMA)?;
                Ok::<_, StoreError>(Mutex::new(conn))
            })
            .await
    }

    /// Eagerly open the database so configuration problems surface at startup
    pub async fn warm(&self) -> StoreResult<()> {
        self.conn().await.map(|_| ())
    }

    fn read(conn: &Connection, namespace: &str, key: &SessionKey) -> StoreResult<Option<Session>> {
        let row = conn
            .query_row(
                "SELECT stage, extra, env, updated_at FROM session_state
                 WHERE namespace = ?1 AND pk = ?2 AND sk = ?3",
                params![namespace, partition_key(key.as_str()), STATE_SORT_KEY],
                |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, String>(2)?,
                        row.get::<_, String>(3)?,
                    ))
                },
            )
            .optional()?;

        let Some((stage, extra, environment, updated_at)) = row else {
            return Ok(None);
        };

        Ok(Some(Session {
            key: key.as_str().to_string(),
            stage: Session::stage_or_initial(stage),
            extra: serde_json::from_str(&extra)?,
            updated_at: parse_datetime(&updated_at),
            environment,
        }))
    }
}

#[async_trait]
impl SessionStore for SqliteStore {
    async fn get(&self, key: &SessionKey) -> StoreResult<Option<Session>> {
        let conn = self.conn().await?.lock().unwrap();
        Self::read(&conn, &self.namespace, key)
    }

    async fn put(
        &self,
        key: &SessionKey,
        stage: &str,
        extra: &BTreeMap<String, String>,
    ) -> StoreResult<()> {
        let extra_json = serde_json::to_string(extra)?;
        let now = Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true);

        let conn = self.conn().await?.lock().unwrap();
        conn.execute(
            "INSERT OR REPLACE INTO session_state (namespace, pk, sk, stage, extra, env, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                self.namespace,
                partition_key(key.as_str()),
                STATE_SORT_KEY,
                stage,
                extra_json,
                self.environment,
                now,
            ],
        )?;
        Ok(())
    }
}

#[async_trait]
impl<T: SessionStore + ?Sized> SessionStore for Arc<T> {
    async fn get(&self, key: &SessionKey) -> StoreResult<Option<Session>> {
        (**self).get(key).await
    }

    async fn put(
        &self,
        key: &SessionKey,
        stage: &str,
        extra: &BTreeMap<String, String>,
    ) -> StoreResult<()> {
        (**self).put(key, stage, extra).await
    }
}

fn parse_datetime(s: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(s).map_or_else(|_| Utc::now(), |dt| dt.with_timezone(&Utc))
}
