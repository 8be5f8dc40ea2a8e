// SPDX-FileCopyrightText: 2026 Threadline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! SQLite implementation of the ThreadStore trait.

use async_trait::async_trait;
use tokio::sync::OnceCell;
use tracing::debug;

use threadline_config::model::StorageConfig;
use threadline_core::types::{
    ConversationMessage, ConversationThread, MessageDirection, MessageQuery, NewThread,
    ScopeFilter, ThreadKey, ThreadUpsert, TopicSummary,
};
use threadline_core::{AdapterType, HealthStatus, PluginAdapter, ThreadStore, ThreadlineError};

use crate::database::{Database, map_tr_err};
use crate::queries;

/// SQLite-backed thread store.
///
/// The database is opened on [`ThreadStore::initialize`]; every other call
/// fails until then.
pub struct SqliteStorage {
    config: StorageConfig,
    db: OnceCell<Database>,
}

impl SqliteStorage {
    pub fn new(config: StorageConfig) -> Self {
        Self {
            config,
            db: OnceCell::new(),
        }
    }

    fn db(&self) -> Result<&Database, ThreadlineError> {
        self.db.get().ok_or_else(|| {
            ThreadlineError::storage("storage not initialized -- call initialize() first")
        })
    }

    async fn checkpoint(&self, db: &Database) -> Result<(), ThreadlineError> {
        if !self.config.wal_mode {
            return Ok(());
        }
        db.connection()
            .call(|conn| -> Result<(), rusqlite::Error> {
                conn.execute_batch("PRAGMA wal_checkpoint(TRUNCATE);")?;
                Ok(())
            })
            .await
            .map_err(map_tr_err)?;
        debug!("WAL checkpoint complete");
        Ok(())
    }
}

#[async_trait]
impl PluginAdapter for SqliteStorage {
    fn name(&self) -> &str {
        "sqlite"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Storage
    }

    async fn health_check(&self) -> Result<HealthStatus, ThreadlineError> {
        let db = self.db()?;
        db.connection()
            .call(|conn| -> Result<(), rusqlite::Error> {
                conn.execute_batch("SELECT 1;")?;
                Ok(())
            })
            .await
            .map_err(map_tr_err)?;
        Ok(HealthStatus::Healthy)
    }

    async fn shutdown(&self) -> Result<(), ThreadlineError> {
        match self.db.get() {
            Some(db) => self.checkpoint(db).await,
            None => Ok(()),
        }
    }
}

#[async_trait]
impl ThreadStore for SqliteStorage {
    async fn initialize(&self) -> Result<(), ThreadlineError> {
        let db = Database::open_with(&self.config.database_path, self.config.wal_mode).await?;
        self.db
            .set(db)
            .map_err(|_| ThreadlineError::storage("storage already initialized"))?;
        debug!(path = %self.config.database_path, "SQLite storage initialized");
        Ok(())
    }

    async fn close(&self) -> Result<(), ThreadlineError> {
        let db = self.db()?;
        self.checkpoint(db).await
    }

    async fn upsert_thread(&self, new: &NewThread) -> Result<ThreadUpsert, ThreadlineError> {
        queries::threads::upsert_thread(self.db()?, new).await
    }

    async fn get_thread(
        &self,
        thread_id: &str,
    ) -> Result<Option<ConversationThread>, ThreadlineError> {
        queries::threads::get_thread(self.db()?, thread_id).await
    }

    async fn find_thread(
        &self,
        key: &ThreadKey,
    ) -> Result<Option<ConversationThread>, ThreadlineError> {
        queries::threads::find_thread(self.db()?, key).await
    }

    async fn archive_thread(&self, thread_id: &str) -> Result<bool, ThreadlineError> {
        queries::threads::archive_thread(self.db()?, thread_id).await
    }

    async fn append_message(&self, message: &ConversationMessage) -> Result<(), ThreadlineError> {
        queries::messages::append_message(self.db()?, message).await
    }

    async fn query_messages(
        &self,
        query: &MessageQuery,
    ) -> Result<Vec<ConversationMessage>, ThreadlineError> {
        queries::messages::query_messages(self.db()?, query).await
    }

    async fn latest_message(
        &self,
        thread_id: &str,
        direction: MessageDirection,
    ) -> Result<Option<ConversationMessage>, ThreadlineError> {
        queries::messages::latest_message(self.db()?, thread_id, direction).await
    }

    async fn topics(
        &self,
        thread_id: &str,
        page: u32,
        page_size: u32,
    ) -> Result<Vec<TopicSummary>, ThreadlineError> {
        queries::messages::topics(self.db()?, thread_id, page, page_size).await
    }

    async fn delete_messages_by_thread(&self, thread_id: &str) -> Result<u64, ThreadlineError> {
        queries::messages::delete_messages_by_thread(self.db()?, thread_id).await
    }

    async fn delete_thread(&self, thread_id: &str) -> Result<bool, ThreadlineError> {
        queries::threads::delete_thread(self.db()?, thread_id).await
    }

    async fn delete_messages_by_scope(
        &self,
        thread_id: &str,
        scope: &ScopeFilter,
    ) -> Result<u64, ThreadlineError> {
        queries::messages::delete_messages_by_scope(self.db()?, thread_id, scope).await
    }
}
