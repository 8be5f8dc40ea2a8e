// SPDX-FileCopyrightText: 2026 Threadline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test harness for end-to-end conversation tests.
//!
//! `TestHarness` wires a temp-file SQLite store and a [`MockEngine`] into a
//! real [`ConversationService`].

use std::sync::Arc;

use threadline_config::ThreadlineConfig;
use threadline_config::model::{HandoffDelivery, StorageConfig};
use threadline_conversation::ConversationService;
use threadline_core::{RequestContext, ThreadStore, ThreadlineError};
use threadline_storage::SqliteStorage;

use crate::mock_engine::MockEngine;

/// Builder for test environments.
pub struct TestHarnessBuilder {
    config: ThreadlineConfig,
    running: Vec<String>,
}

impl TestHarnessBuilder {
    fn new() -> Self {
        Self {
            config: ThreadlineConfig::default(),
            running: Vec::new(),
        }
    }

    pub fn with_handoff_delivery(mut self, delivery: HandoffDelivery) -> Self {
        self.config.conversation.handoff_delivery = delivery;
        self
    }

    pub fn with_page_limits(mut self, default_page_size: u32, max_page_size: u32) -> Self {
        self.config.conversation.default_page_size = default_page_size;
        self.config.conversation.max_page_size = max_page_size;
        self
    }

    /// Marks processes as already running in the mock engine.
    pub fn with_running_process(mut self, process_id: impl Into<String>) -> Self {
        self.running.push(process_id.into());
        self
    }

    pub async fn build(mut self) -> Result<TestHarness, ThreadlineError> {
        let temp_dir = tempfile::TempDir::new().map_err(ThreadlineError::storage)?;
        let db_path = temp_dir.path().join("test.db");
        self.config.storage = StorageConfig {
            database_path: db_path.to_string_lossy().to_string(),
            wal_mode: true,
        };

        let storage = SqliteStorage::new(self.config.storage.clone());
        storage.initialize().await?;
        let storage: Arc<dyn ThreadStore> = Arc::new(storage);

        let engine = Arc::new(MockEngine::with_running(self.running));
        let service = ConversationService::new(Arc::clone(&storage), engine.clone(), &self.config);

        Ok(TestHarness {
            service,
            storage,
            engine,
            config: self.config,
            _temp_dir: temp_dir,
        })
    }
}

/// A conversation service over temp storage and a mock engine.
pub struct TestHarness {
    pub service: ConversationService,
    /// Direct store access for assertions.
    pub storage: Arc<dyn ThreadStore>,
    pub engine: Arc<MockEngine>,
    pub config: ThreadlineConfig,
    /// Keeps the database directory alive until the harness drops.
    _temp_dir: tempfile::TempDir,
}

impl TestHarness {
    pub fn builder() -> TestHarnessBuilder {
        TestHarnessBuilder::new()
    }

    pub async fn new() -> Result<Self, ThreadlineError> {
        Self::builder().build().await
    }

    /// Context for `tenant_id` acting as `actor`.
    pub fn ctx(&self, tenant_id: &str, actor: &str) -> RequestContext {
        RequestContext::new(tenant_id).with_actor(actor)
    }
}
