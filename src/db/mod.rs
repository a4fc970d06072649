pub mod memory;
pub mod operations;
pub mod schema;

use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
use sqlx::SqlitePool;
use thiserror::Error;

use crate::proficiency::types::ProficiencyState;

pub use memory::MemoryStore;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Sqlx(#[from] sqlx::Error),
    #[error("store unavailable: {0}")]
    Unavailable(String),
    #[error("corrupt record: {0}")]
    Corrupt(String),
}

/// Durable home of one `ProficiencyState` per (learner, skill).
/// Writes are whole-record upserts.
#[allow(async_fn_in_trait)]
pub trait ProficiencyStore {
    async fn load(
        &self,
        learner_id: &str,
        skill_name: &str,
    ) -> Result<Option<ProficiencyState>, StoreError>;

    async fn upsert(
        &self,
        learner_id: &str,
        skill_name: &str,
        state: &ProficiencyState,
    ) -> Result<(), StoreError>;

    async fn list_for_learner(
        &self,
        learner_id: &str,
    ) -> Result<Vec<(String, ProficiencyState)>, StoreError>;
}

#[derive(Clone)]
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    pub async fn connect(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)
                    .map_err(|e| StoreError::Unavailable(format!("create {}: {e}", parent.display())))?;
            }
        }

        let url = format!("sqlite:{}?mode=rwc", path.display());
        let options = SqliteConnectOptions::from_str(&url)?
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .busy_timeout(Duration::from_secs(5));

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await?;

        Self::from_pool(pool).await
    }

    /// Single-connection in-memory database; every connection to
    /// `sqlite::memory:` would otherwise see its own empty schema.
    pub async fn in_memory() -> Result<Self, StoreError> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await?;
        Self::from_pool(pool).await
    }

    pub async fn from_pool(pool: SqlitePool) -> Result<Self, StoreError> {
        schema::apply_schema(&pool).await?;
        Ok(Self { pool })
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }
}

impl ProficiencyStore for SqliteStore {
    async fn load(
        &self,
        learner_id: &str,
        skill_name: &str,
    ) -> Result<Option<ProficiencyState>, StoreError> {
        operations::get_proficiency_state(&self.pool, learner_id, skill_name).await
    }

    async fn upsert(
        &self,
        learner_id: &str,
        skill_name: &str,
        state: &ProficiencyState,
    ) -> Result<(), StoreError> {
        operations::upsert_proficiency_state(&self.pool, learner_id, skill_name, state).await
    }

    async fn list_for_learner(
        &self,
        learner_id: &str,
    ) -> Result<Vec<(String, ProficiencyState)>, StoreError> {
        operations::list_proficiency_states(&self.pool, learner_id).await
    }
}
